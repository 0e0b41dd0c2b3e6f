//! Operations, values, and regions
//!
//! A region owns its operations in an arena keyed by [`OpId`]; the program
//! order is a separate id vector. Values reference `(OpId, result index)`
//! or a function argument, so reordering and front insertion never
//! invalidate uses, and splicing an operand into an existing operation
//! leaves every use of its results intact.

use std::fmt;

use indexmap::IndexMap;

use crate::attr::Attribute;
use crate::location::Location;
use crate::types::Type;

/// Names of the executor-dialect operations.
pub mod exec {
    pub const ISLAND: &str = "exec.island";
    pub const SWITCH: &str = "exec.switch";
    pub const SWITCH_N: &str = "exec.switch_n";
    pub const MERGE: &str = "exec.merge";
    pub const NEXT_ITERATION_SOURCE: &str = "exec.next_iteration.source";
    pub const NEXT_ITERATION_SINK: &str = "exec.next_iteration.sink";
    pub const LOOP_COND: &str = "exec.loop_cond";
    pub const ENTER: &str = "exec.enter";
    pub const EXIT: &str = "exec.exit";
    pub const CONTROL_TRIGGER: &str = "exec.control_trigger";
    /// Region terminator returning the fetched values.
    pub const FETCH: &str = "exec.fetch";
}

/// Dialect prefix for operations wrapped inside islands.
pub const INNER_OP_PREFIX: &str = "flow.";

/// Stable identity of an operation within one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpId(pub u32);

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op{}", self.0)
    }
}

/// A single-assignment value: a function argument or an operation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    Arg(usize),
    Result { op: OpId, index: usize },
}

impl Value {
    pub fn result(op: OpId, index: usize) -> Self {
        Value::Result { op, index }
    }
}

/// One IR operation.
///
/// Islands carry their wrapped operation in `inner`; the island's operands
/// are its control operands, the data operands belong to the inner
/// operation, and the island's results mirror the inner results plus one
/// trailing control token.
#[derive(Debug, Clone)]
pub struct Operation {
    pub name: String,
    pub operands: Vec<Value>,
    pub result_types: Vec<Type>,
    pub attrs: IndexMap<String, Attribute>,
    pub location: Location,
    pub inner: Option<Box<Operation>>,
}

impl Operation {
    pub fn new(name: impl Into<String>, location: Location) -> Self {
        Self {
            name: name.into(),
            operands: Vec::new(),
            result_types: Vec::new(),
            attrs: IndexMap::new(),
            location,
            inner: None,
        }
    }

    pub fn num_results(&self) -> usize {
        self.result_types.len()
    }

    /// Index of the trailing control result. Every island and executor
    /// operation produces one.
    pub fn control_result_index(&self) -> usize {
        debug_assert!(!self.result_types.is_empty());
        self.result_types.len() - 1
    }

    pub fn attr(&self, name: &str) -> Option<&Attribute> {
        self.attrs.get(name)
    }

    fn replace_uses_in(&mut self, from: Value, to: Value) {
        for operand in &mut self.operands {
            if *operand == from {
                *operand = to;
            }
        }
        if let Some(inner) = &mut self.inner {
            inner.replace_uses_in(from, to);
        }
    }
}

/// A region: the single body of a function.
#[derive(Debug, Clone, Default)]
pub struct Region {
    ops: IndexMap<OpId, Operation>,
    order: Vec<OpId>,
    next_id: u32,
}

impl Region {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self, op: Operation) -> OpId {
        let id = OpId(self.next_id);
        self.next_id += 1;
        self.ops.insert(id, op);
        id
    }

    /// Appends an operation at the end of the program order.
    pub fn append(&mut self, op: Operation) -> OpId {
        let id = self.allocate(op);
        self.order.push(id);
        id
    }

    /// Inserts an operation at the very start of the program order.
    pub fn prepend(&mut self, op: Operation) -> OpId {
        let id = self.allocate(op);
        self.order.insert(0, id);
        id
    }

    pub fn op(&self, id: OpId) -> &Operation {
        self.ops.get(&id).expect("stale op id")
    }

    pub fn op_mut(&mut self, id: OpId) -> &mut Operation {
        self.ops.get_mut(&id).expect("stale op id")
    }

    pub fn contains(&self, id: OpId) -> bool {
        self.ops.contains_key(&id)
    }

    /// Removes an operation from the arena and the program order. Any
    /// remaining uses of its results become dangling; callers replace uses
    /// first.
    pub fn erase(&mut self, id: OpId) {
        self.ops.shift_remove(&id);
        self.order.retain(|&o| o != id);
    }

    /// Rewrites every use of `from` (including inside island bodies) to
    /// `to`.
    pub fn replace_uses(&mut self, from: Value, to: Value) {
        for op in self.ops.values_mut() {
            op.replace_uses_in(from, to);
        }
    }

    /// Operation ids in program order.
    pub fn order(&self) -> &[OpId] {
        &self.order
    }

    /// Operations in program order.
    pub fn ops_in_order(&self) -> impl Iterator<Item = (OpId, &Operation)> {
        self.order.iter().map(move |&id| (id, self.op(id)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
