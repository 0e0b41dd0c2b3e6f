//! Source locations
//!
//! Provenance attached to every operation. Locations compose: a name can
//! carry a child position, call sites chain, and several locations fuse
//! into one when a node was produced by merging others.

use std::fmt;

/// Provenance of an IR operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Unknown,
    /// A node name, optionally anchored at a concrete position.
    Name {
        name: String,
        child: Option<Box<Location>>,
    },
    FileLineCol {
        file: String,
        line: u32,
        col: u32,
    },
    /// `callee` invoked from `caller`.
    CallSite {
        callee: Box<Location>,
        caller: Box<Location>,
    },
    /// Several origins merged by a prior transformation.
    Fused(Vec<Location>),
}

impl Location {
    pub fn name(name: impl Into<String>) -> Self {
        Location::Name {
            name: name.into(),
            child: None,
        }
    }

    pub fn name_at(name: impl Into<String>, child: Location) -> Self {
        Location::Name {
            name: name.into(),
            child: Some(Box::new(child)),
        }
    }

    pub fn file_line_col(file: impl Into<String>, line: u32, col: u32) -> Self {
        Location::FileLineCol {
            file: file.into(),
            line,
            col,
        }
    }

    pub fn call_site(callee: Location, caller: Location) -> Self {
        Location::CallSite {
            callee: Box::new(callee),
            caller: Box::new(caller),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Unknown => write!(f, "loc(unknown)"),
            Location::Name { name, child } => match child {
                None => write!(f, "loc({:?})", name),
                Some(child) => write!(f, "loc({:?} at {})", name, child),
            },
            Location::FileLineCol { file, line, col } => {
                write!(f, "loc({:?}:{}:{})", file, line, col)
            }
            Location::CallSite { callee, caller } => {
                write!(f, "callsite({} from {})", callee, caller)
            }
            Location::Fused(parts) => {
                write!(f, "fused[")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", part)?;
                }
                write!(f, "]")
            }
        }
    }
}
