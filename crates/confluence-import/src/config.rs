//! Import configuration
//!
//! Caller-declared bindings for the entry function plus the behavior flags.
//! Input binding order and output specifier order are signature order, so
//! both are kept in insertion-ordered containers.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use confluence_graph::{ElementType, TensorShape};

use crate::error::{ImportError, Result};

/// Declared type and shape for one named graph input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputBinding {
    pub dtype: ElementType,
    pub shape: TensorShape,
}

/// One declared output: a node name and an output port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpec {
    pub node: String,
    pub port: usize,
}

impl OutputSpec {
    /// Parses the `name` or `name:index` text form.
    pub fn parse(spec: &str) -> Result<Self> {
        match spec.split_once(':') {
            None => Ok(Self {
                node: spec.to_string(),
                port: 0,
            }),
            Some((node, port)) => {
                let port = port.parse::<usize>().map_err(|_| {
                    ImportError::InvalidConfig(format!("invalid port specification '{}'", spec))
                })?;
                Ok(Self {
                    node: node.to_string(),
                    port,
                })
            }
        }
    }
}

impl std::fmt::Display for OutputSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.port == 0 {
            write!(f, "{}", self.node)
        } else {
            write!(f, "{}:{}", self.node, self.port)
        }
    }
}

/// Everything the caller controls about one import.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Named input bindings, in signature order.
    pub inputs: IndexMap<String, InputBinding>,
    /// Output specifiers, in signature order.
    pub outputs: Vec<OutputSpec>,
    /// Drop nodes unreachable from the declared inputs/outputs. Skipped
    /// when nothing was declared.
    pub prune_unused_nodes: bool,
    /// Treat the whole graph as a function body (arguments and results
    /// come from its `_Arg`/`_Retval` nodes).
    pub graph_as_function: bool,
    /// Rewrite `LegacyFedInput` input nodes to placeholders.
    pub upgrade_legacy_inputs: bool,
}

impl ImportConfig {
    /// Adds an input binding, keeping declaration order.
    pub fn with_input(
        mut self,
        name: impl Into<String>,
        dtype: ElementType,
        shape: TensorShape,
    ) -> Self {
        self.inputs.insert(name.into(), InputBinding { dtype, shape });
        self
    }

    /// Adds an output specifier in `name[:index]` text form.
    pub fn with_output(mut self, spec: &str) -> Result<Self> {
        self.outputs.push(OutputSpec::parse(spec)?);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_spec_parse() {
        assert_eq!(
            OutputSpec::parse("node").unwrap(),
            OutputSpec {
                node: "node".to_string(),
                port: 0
            }
        );
        assert_eq!(
            OutputSpec::parse("node:5").unwrap(),
            OutputSpec {
                node: "node".to_string(),
                port: 5
            }
        );
        assert!(OutputSpec::parse("node:x").is_err());
    }

    #[test]
    fn test_output_spec_display_roundtrip() {
        for spec in ["plain", "ported:3"] {
            assert_eq!(OutputSpec::parse(spec).unwrap().to_string(), spec);
        }
    }
}
