//! Functions and the module

use indexmap::IndexMap;

use crate::attr::Attribute;
use crate::ops::Region;
use crate::types::Type;

/// Signature of an IR function.
#[derive(Debug, Clone, Default)]
pub struct FunctionType {
    pub inputs: Vec<Type>,
    pub results: Vec<Type>,
}

/// A named function: signature, attributes, and a single body region.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub ty: FunctionType,
    pub attrs: IndexMap<String, Attribute>,
    pub body: Region,
}

impl Function {
    pub fn new(name: impl Into<String>, ty: FunctionType) -> Self {
        Self {
            name: name.into(),
            ty,
            attrs: IndexMap::new(),
            body: Region::new(),
        }
    }
}

/// The import artifact: module attributes plus named functions.
///
/// Function names are unique; insertion order is the order functions were
/// finished, which the printer preserves.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub attrs: IndexMap<String, Attribute>,
    functions: IndexMap<String, Function>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a function under its own name. A duplicate symbol is an
    /// importer bug.
    pub fn push_function(&mut self, function: Function) {
        let previous = self.functions.insert(function.name.clone(), function);
        debug_assert!(previous.is_none(), "duplicate function symbol");
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn contains_symbol(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.values()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
