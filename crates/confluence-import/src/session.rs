//! Import session state
//!
//! One session owns the module being populated and the memoization of
//! library-function imports. There is no ambient global state: recursive
//! sub-imports borrow the same session, which is what makes repeated and
//! mutually recursive function references cheap and terminating.

use indexmap::{IndexMap, IndexSet};

use confluence_ir::Module;

/// Shared state for one import: the module under construction and the
/// function-name memoization table.
#[derive(Debug, Default)]
pub struct ImportSession {
    pub module: Module,
    /// graph function name -> IR symbol, populated before the function
    /// body is imported so recursion terminates.
    name_map: IndexMap<String, String>,
    used_symbols: IndexSet<String>,
}

impl ImportSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// The IR symbol already assigned to a graph function name, if any.
    pub fn symbol_for(&self, name: &str) -> Option<&str> {
        self.name_map.get(name).map(String::as_str)
    }

    /// Reserves a fresh unique symbol for `name` and records the mapping.
    /// Called before the function body is imported, so a recursive
    /// reference finds the mapping instead of re-importing.
    pub fn reserve_symbol(&mut self, name: &str) -> String {
        let symbol = self.unique_symbol(name);
        self.name_map.insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Claims a symbol that is not a library function (the entry function).
    pub fn claim_symbol(&mut self, name: &str) -> String {
        self.unique_symbol(name)
    }

    fn unique_symbol(&mut self, base: &str) -> String {
        if self.used_symbols.insert(base.to_string()) {
            return base.to_string();
        }
        let mut i = 0usize;
        loop {
            let candidate = format!("{}_{}", base, i);
            if self.used_symbols.insert(candidate.clone()) {
                return candidate;
            }
            i += 1;
        }
    }

    pub fn into_module(self) -> Module {
        self.module
    }
}
