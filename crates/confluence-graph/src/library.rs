//! Function library
//!
//! Name-keyed table of callable sub-graphs. Read-only from the importer's
//! perspective; the importer keeps its own memoization of which entries
//! have been materialized into IR.

use indexmap::IndexMap;

use crate::attr::AttrValue;
use crate::graph::Graph;
use crate::types::ElementType;

/// One typed argument or result of a function signature.
#[derive(Debug, Clone)]
pub struct ArgDef {
    pub name: String,
    pub dtype: ElementType,
}

/// Declared signature of a library function.
#[derive(Debug, Clone)]
pub struct FunctionSignature {
    pub name: String,
    pub inputs: Vec<ArgDef>,
    pub outputs: Vec<ArgDef>,
    pub is_stateful: bool,
}

/// A callable sub-graph: signature, body, and definition-time attributes.
///
/// The body graph contains one single-output `_Arg` node per input and one
/// single-input `_Retval` node per output, each carrying an `index`
/// attribute.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub signature: FunctionSignature,
    pub body: Graph,
    pub attrs: IndexMap<String, AttrValue>,
    /// Names of nodes whose completion is an observable effect of the
    /// function; exported as control-only results.
    pub control_outputs: Vec<String>,
}

/// The set of named callable sub-graphs available to an import.
#[derive(Debug, Clone, Default)]
pub struct FunctionLibrary {
    functions: IndexMap<String, FunctionDef>,
    /// function name -> name of its custom gradient function
    gradients: IndexMap<String, String>,
}

impl FunctionLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, def: FunctionDef) {
        self.functions.insert(def.signature.name.clone(), def);
    }

    pub fn set_gradient(&mut self, function: impl Into<String>, gradient: impl Into<String>) {
        self.gradients.insert(function.into(), gradient.into());
    }

    pub fn find(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name)
    }

    /// Name of the custom gradient registered for `name`, if any.
    pub fn gradient(&self, name: &str) -> Option<&str> {
        self.gradients.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
