//! Library function import
//!
//! Memoized, recursive materialization of the function library into the
//! module. The symbol is reserved *before* the body is imported, so
//! mutually recursive functions resolve each other through the memoization
//! table instead of recursing forever. Memoization is by name only;
//! per-call-site attribute specialization is deliberately not performed.

use indexmap::IndexMap;
use tracing::debug;

use confluence_graph::{AttrValue, DebugInfo, FunctionLibrary, Graph};
use confluence_ir::{Attribute, Function, mangle_attr_name};

use crate::attrs;
use crate::config::{ImportConfig, InputBinding};
use crate::entry;
use crate::error::{ImportError, Result};
use crate::importer::Importer;
use crate::session::ImportSession;

/// Imports one library function (and transitively everything it
/// references), returning its IR symbol. Repeated calls with the same name
/// return the memoized symbol without re-importing.
pub fn import_function(
    session: &mut ImportSession,
    library: &FunctionLibrary,
    debug_info: &DebugInfo,
    name: &str,
) -> Result<String> {
    if let Some(symbol) = session.symbol_for(name) {
        return Ok(symbol.to_string());
    }
    // Reserve first: a recursive reference from the body below must find
    // the mapping instead of descending again.
    let symbol = session.reserve_symbol(name);

    let Some(def) = library.find(name) else {
        return Err(ImportError::UndefinedFunction(name.to_string()));
    };
    debug!(function = name, symbol = %symbol, "importing library function");
    let def = def.clone();

    // Definition-time attributes; these are plain values, a function
    // reference here is rejected by the converter.
    let mut attrs: IndexMap<String, Attribute> = IndexMap::new();
    for (key, value) in &def.attrs {
        let converted = attrs::convert_attribute(session, library, debug_info, value)?;
        attrs.insert(mangle_attr_name(key), converted);
    }
    if def.signature.is_stateful {
        attrs.insert("stateful".to_string(), Attribute::Unit);
    }
    if let Some(gradient) = library.gradient(name) {
        let gradient = gradient.to_string();
        let grad_symbol = import_function(session, library, debug_info, &gradient)?;
        attrs.insert("gradient".to_string(), Attribute::SymbolRef(grad_symbol));
    }

    // An `_input_shapes` annotation on the definition seeds the argument
    // bindings of the sub-import, one per signature input in order.
    let mut config = ImportConfig::default();
    if let Some(AttrValue::List(shapes)) = def.attrs.get("_input_shapes") {
        for (arg, item) in def.signature.inputs.iter().zip(shapes) {
            if let Some(shape) = item.as_shape() {
                config.inputs.insert(
                    arg.name.clone(),
                    InputBinding {
                        dtype: arg.dtype,
                        shape: shape.clone(),
                    },
                );
            }
        }
    }

    let function = import_function_body(
        session,
        library,
        debug_info,
        config,
        def.body,
        &symbol,
        attrs,
        &def.control_outputs,
    )?;
    session.module.push_function(function);
    Ok(symbol)
}

/// Imports a function-body graph through the full pipeline as an
/// independent sub-import sharing the session. Arguments and results come
/// from the body's `_Arg`/`_Retval` nodes.
#[allow(clippy::too_many_arguments)]
pub(crate) fn import_function_body(
    session: &mut ImportSession,
    library: &FunctionLibrary,
    debug_info: &DebugInfo,
    config: ImportConfig,
    graph: Graph,
    symbol: &str,
    attrs: IndexMap<String, Attribute>,
    control_outputs: &[String],
) -> Result<Function> {
    let mut importer = Importer::new(session, library, debug_info, config, graph);
    importer.prepare()?;

    let (args, rets) = entry::function_args_and_rets(&importer.graph);
    let control_rets = control_outputs
        .iter()
        .map(|name| {
            importer
                .graph
                .find_node(name)
                .ok_or_else(|| ImportError::UndefinedInputOutput(name.clone()))
        })
        .collect::<Result<Vec<_>>>()?;
    let ty = entry::infer_function_type(&importer.graph, &importer.oracle, &args, &rets)?;

    importer.convert(symbol, ty, args, rets, control_rets, attrs)
}
