//! Graph nodes and their classification
//!
//! A node's behavior class is derived from its operation-type name once per
//! query; the importer matches on the closed [`NodeKind`] enum instead of
//! string-comparing operation names at every site.

use std::fmt;

use indexmap::IndexMap;

use crate::attr::AttrValue;

/// Operation-type names with structural meaning to the importer.
pub mod ops {
    /// The pseudo source node present in every graph; never imported.
    pub const SOURCE: &str = "_Source";
    pub const SWITCH: &str = "Switch";
    pub const SWITCH_N: &str = "_SwitchN";
    pub const MERGE: &str = "Merge";
    pub const NEXT_ITERATION: &str = "NextIteration";
    pub const LOOP_COND: &str = "LoopCond";
    pub const ENTER: &str = "Enter";
    pub const EXIT: &str = "Exit";
    pub const CONTROL_TRIGGER: &str = "ControlTrigger";
    pub const PLACEHOLDER: &str = "Placeholder";
    pub const LEGACY_FED_INPUT: &str = "LegacyFedInput";
    pub const ARG: &str = "_Arg";
    pub const RETVAL: &str = "_Retval";
    pub const IF: &str = "If";
    pub const STATELESS_IF: &str = "StatelessIf";
    pub const WHILE: &str = "While";
    pub const STATELESS_WHILE: &str = "StatelessWhile";
}

/// Stable node identity within one graph. Ids are never reused, so a
/// removed node's id stays dangling rather than aliasing a newer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Closed behavior classification of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// The pseudo source node.
    Source,
    /// Any ordinary operation; imported wrapped in an island.
    DataOp,
    Switch,
    SwitchN,
    Merge,
    /// Loop-carried update ("NextIteration"); the source end of backedges.
    LoopUpdate,
    LoopCondition,
    Enter,
    Exit,
    ControlTrigger,
    /// Function body argument.
    Arg,
    /// Function body return value.
    Retval,
}

/// One node of the computation graph.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    /// Operation-type name; may also name a library function.
    pub op: String,
    pub attrs: IndexMap<String, AttrValue>,
    pub device: String,
    /// Declared number of outputs.
    pub num_outputs: usize,
    /// Names of the nodes this one originated from, recorded by a prior
    /// transformation pass. Empty for untouched nodes.
    pub original_node_names: Vec<String>,
}

impl Node {
    /// Behavior class, derived from the operation-type name.
    pub fn kind(&self) -> NodeKind {
        match self.op.as_str() {
            ops::SOURCE => NodeKind::Source,
            ops::SWITCH => NodeKind::Switch,
            ops::SWITCH_N => NodeKind::SwitchN,
            ops::MERGE => NodeKind::Merge,
            ops::NEXT_ITERATION => NodeKind::LoopUpdate,
            ops::LOOP_COND => NodeKind::LoopCondition,
            ops::ENTER => NodeKind::Enter,
            ops::EXIT => NodeKind::Exit,
            ops::CONTROL_TRIGGER => NodeKind::ControlTrigger,
            ops::ARG => NodeKind::Arg,
            ops::RETVAL => NodeKind::Retval,
            _ => NodeKind::DataOp,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    /// Whether this node is one of the recognized input kinds that can
    /// carry a caller-declared type/shape directly.
    pub fn is_input_kind(&self) -> bool {
        matches!(
            self.op.as_str(),
            ops::PLACEHOLDER | ops::LEGACY_FED_INPUT | ops::ARG
        )
    }

    /// Whether this node is a conditional-branch construct (either
    /// statefulness variant).
    pub fn is_if(&self) -> bool {
        matches!(self.op.as_str(), ops::IF | ops::STATELESS_IF)
    }

    /// Whether this node is a loop construct (either statefulness variant).
    pub fn is_while(&self) -> bool {
        matches!(self.op.as_str(), ops::WHILE | ops::STATELESS_WHILE)
    }
}

/// Everything needed to create a node; the graph assigns the id.
#[derive(Debug, Clone)]
pub struct NodeInit {
    pub name: String,
    pub op: String,
    pub attrs: IndexMap<String, AttrValue>,
    pub device: String,
    pub num_outputs: usize,
    pub original_node_names: Vec<String>,
}

impl NodeInit {
    pub fn new(name: impl Into<String>, op: impl Into<String>, num_outputs: usize) -> Self {
        Self {
            name: name.into(),
            op: op.into(),
            attrs: IndexMap::new(),
            device: String::new(),
            num_outputs,
            original_node_names: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: AttrValue) -> Self {
        self.attrs.insert(name.into(), value);
        self
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    pub fn with_original_names(mut self, names: Vec<String>) -> Self {
        self.original_node_names = names;
        self
    }
}
