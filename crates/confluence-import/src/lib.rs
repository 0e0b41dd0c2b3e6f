//! Graph import
//!
//! Converts a mutable, possibly-cyclic computation graph plus its function
//! library into a [`confluence_ir::Module`]: one entry function named
//! `main` and one IR function per referenced library function.
//!
//! Pipeline per graph: backedge removal -> deterministic ordering -> shape
//! refinement to a fixpoint -> per-node conversion -> backedge reinsertion
//! -> entry point binding. Library functions recurse through the same
//! pipeline, memoized by name for the whole import session.
//!
//! Import is single-threaded and all-or-nothing: any fatal error discards
//! the partial module.

mod attrs;
mod backedge;
mod config;
mod entry;
mod error;
mod functions;
mod importer;
mod location;
mod order;
mod rules;
mod session;
mod shapes;

pub use config::{ImportConfig, InputBinding, OutputSpec};
pub use error::{ImportError, Result};

use indexmap::IndexMap;
use tracing::debug;

use confluence_graph::{DebugInfo, FunctionLibrary, Graph, VersionInfo};
use confluence_ir::{Attribute, Module};

use importer::Importer;
use session::ImportSession;

/// Name of the entry function.
const ENTRY_FUNCTION: &str = "main";

/// Imports `graph` into a fresh IR module.
///
/// The graph, library, and debug info are borrowed unchanged; the importer
/// works on its own copy. On any error the partial module is discarded.
pub fn import_graph(
    graph: &Graph,
    library: &FunctionLibrary,
    debug_info: &DebugInfo,
    config: &ImportConfig,
) -> Result<Module> {
    if config.graph_as_function
        && (config.prune_unused_nodes || !config.inputs.is_empty() || !config.outputs.is_empty())
    {
        return Err(ImportError::InvalidConfig(
            "pruning and explicit inputs/outputs are unsupported when the graph itself is \
             converted as a function"
                .to_string(),
        ));
    }

    let mut working = graph.clone();
    if config.upgrade_legacy_inputs {
        importer::upgrade_legacy_inputs(&mut working, config)?;
    }

    let mut session = ImportSession::new();
    let symbol = session.claim_symbol(ENTRY_FUNCTION);
    session
        .module
        .attrs
        .insert("versions".to_string(), versions_attribute(graph.versions()));

    if config.graph_as_function {
        // Arguments and results come from the graph's own arg/ret nodes;
        // record their names for external tooling before the graph moves.
        let (args, rets) = entry::function_args_and_rets(&working);
        let mut attrs = IndexMap::new();
        if !args.is_empty() || !rets.is_empty() {
            let names = |refs: &[entry::OutputRef]| {
                refs.iter()
                    .map(|&(id, _)| working.node(id).name.clone())
                    .collect::<Vec<_>>()
                    .join(",")
            };
            attrs.insert(
                "entry_function".to_string(),
                entry_function_attribute(&names(&args), &names(&rets)),
            );
        }

        let function = functions::import_function_body(
            &mut session,
            library,
            debug_info,
            config.clone(),
            working,
            &symbol,
            attrs,
            &[],
        )?;
        session.module.push_function(function);
    } else {
        let mut importer = Importer::new(
            &mut session,
            library,
            debug_info,
            config.clone(),
            working,
        );
        importer.prepare()?;

        let (args, rets, ty) = entry::resolve_main(&importer.graph, &importer.oracle, config)?;

        let mut attrs = IndexMap::new();
        if !config.inputs.is_empty() || !config.outputs.is_empty() {
            let inputs = config
                .inputs
                .keys()
                .cloned()
                .collect::<Vec<_>>()
                .join(",");
            let outputs = config
                .outputs
                .iter()
                .map(OutputSpec::to_string)
                .collect::<Vec<_>>()
                .join(",");
            attrs.insert(
                "entry_function".to_string(),
                entry_function_attribute(&inputs, &outputs),
            );
        }

        let function = importer.convert(&symbol, ty, args, rets, Vec::new(), attrs)?;
        session.module.push_function(function);
    }

    debug!(functions = session.module.len(), "import finished");
    Ok(session.into_module())
}

fn entry_function_attribute(inputs: &str, outputs: &str) -> Attribute {
    let mut dict = IndexMap::new();
    dict.insert("inputs".to_string(), Attribute::Str(inputs.to_string()));
    dict.insert("outputs".to_string(), Attribute::Str(outputs.to_string()));
    Attribute::Dict(dict)
}

fn versions_attribute(versions: &VersionInfo) -> Attribute {
    let mut dict = IndexMap::new();
    dict.insert(
        "producer".to_string(),
        Attribute::I64(i64::from(versions.producer)),
    );
    dict.insert(
        "min_consumer".to_string(),
        Attribute::I64(i64::from(versions.min_consumer)),
    );
    dict.insert(
        "bad_consumers".to_string(),
        Attribute::Array(
            versions
                .bad_consumers
                .iter()
                .map(|&v| Attribute::I64(i64::from(v)))
                .collect(),
        ),
    );
    Attribute::Dict(dict)
}
