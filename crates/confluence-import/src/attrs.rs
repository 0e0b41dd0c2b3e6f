//! Attribute conversion
//!
//! Maps typed graph attribute values to IR attributes. Type and shape
//! identifiers survive as mangled strings. Function references pull the
//! callee into the module through the (memoized) function importer, so
//! conversion of one attribute can materialize whole functions.

use indexmap::IndexMap;

use confluence_graph::{AttrValue, DebugInfo, FunctionLibrary, FunctionRef};
use confluence_ir::{Attribute, mangle_element_type, mangle_shape};

use crate::error::{ImportError, Result};
use crate::functions;
use crate::session::ImportSession;

/// Converts one non-function attribute value.
///
/// A function reference is rejected here: it expands to several attributes
/// and must go through [`convert_function_attribute`].
pub fn convert_attribute(
    session: &mut ImportSession,
    library: &FunctionLibrary,
    debug_info: &DebugInfo,
    value: &AttrValue,
) -> Result<Attribute> {
    match value {
        AttrValue::I64(v) => Ok(Attribute::I64(*v)),
        AttrValue::Str(s) => Ok(Attribute::Str(s.clone())),
        AttrValue::F32(v) => Ok(Attribute::F32(*v)),
        AttrValue::Bool(b) => Ok(Attribute::Bool(*b)),
        AttrValue::Type(t) => Ok(Attribute::Str(mangle_element_type(*t))),
        AttrValue::Shape(s) => Ok(Attribute::Str(mangle_shape(s))),
        AttrValue::Tensor(t) => Ok(Attribute::Elements(t.clone())),
        AttrValue::List(items) => {
            let mut converted = Vec::with_capacity(items.len());
            for item in items {
                converted.push(convert_list_item(session, library, debug_info, item)?);
            }
            Ok(Attribute::Array(converted))
        }
        AttrValue::Unset => Ok(Attribute::Unit),
        AttrValue::Func(f) => Err(ImportError::UnsupportedAttribute(format!(
            "function reference '{}' outside a function-attribute position",
            f.name
        ))),
        AttrValue::Placeholder(name) => Err(ImportError::UnsupportedAttribute(format!(
            "placeholder-valued attribute '{}'",
            name
        ))),
    }
}

fn convert_list_item(
    session: &mut ImportSession,
    library: &FunctionLibrary,
    debug_info: &DebugInfo,
    item: &AttrValue,
) -> Result<Attribute> {
    match item {
        // A bare callee reference is representable inside a list; one that
        // carries call-time attributes would need the dotted expansion,
        // which has no list form.
        AttrValue::Func(f) if f.attrs.is_empty() => {
            let symbol = functions::import_function(session, library, debug_info, &f.name)?;
            Ok(Attribute::SymbolRef(symbol))
        }
        AttrValue::Func(f) => Err(ImportError::Unimplemented(format!(
            "function attribute '{}' with call-time attributes inside a list",
            f.name
        ))),
        AttrValue::List(_) => Err(ImportError::UnsupportedAttribute(
            "nested list attribute".to_string(),
        )),
        other => convert_attribute(session, library, debug_info, other),
    }
}

/// Expands a function-valued attribute: the callee symbol lands under
/// `base_name`, and every call-time attribute lands under
/// `base_name.<key>`.
pub fn convert_function_attribute(
    session: &mut ImportSession,
    library: &FunctionLibrary,
    debug_info: &DebugInfo,
    base_name: &str,
    func: &FunctionRef,
    out: &mut IndexMap<String, Attribute>,
) -> Result<()> {
    let symbol = functions::import_function(session, library, debug_info, &func.name)?;
    out.insert(base_name.to_string(), Attribute::SymbolRef(symbol));

    for (key, value) in &func.attrs {
        let converted = convert_attribute(session, library, debug_info, value)?;
        out.insert(format!("{}.{}", base_name, key), converted);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use confluence_graph::{ElementType, TensorShape, TensorValue};

    fn convert(value: &AttrValue) -> Result<Attribute> {
        let mut session = ImportSession::new();
        convert_attribute(
            &mut session,
            &FunctionLibrary::new(),
            &DebugInfo::new(),
            value,
        )
    }

    #[test]
    fn test_scalar_kinds() {
        assert_eq!(convert(&AttrValue::I64(7)).unwrap(), Attribute::I64(7));
        assert_eq!(
            convert(&AttrValue::Bool(true)).unwrap(),
            Attribute::Bool(true)
        );
        assert_eq!(convert(&AttrValue::Unset).unwrap(), Attribute::Unit);
    }

    #[test]
    fn test_type_and_shape_mangle_to_strings() {
        assert_eq!(
            convert(&AttrValue::Type(ElementType::I32)).unwrap(),
            Attribute::Str("dtype$i32".to_string())
        );
        assert_eq!(
            convert(&AttrValue::Shape(TensorShape::ranked(vec![1, 2]))).unwrap(),
            Attribute::Str("shape$[1x2]".to_string())
        );
    }

    #[test]
    fn test_tensor_attribute() {
        let tensor = TensorValue::scalar_f32(1.5);
        assert_eq!(
            convert(&AttrValue::Tensor(tensor.clone())).unwrap(),
            Attribute::Elements(tensor)
        );
    }

    #[test]
    fn test_placeholder_is_unsupported() {
        let err = convert(&AttrValue::Placeholder("T".to_string())).unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedAttribute(_)));
    }

    #[test]
    fn test_list_of_functions_with_attrs_is_unimplemented() {
        let value = AttrValue::List(vec![AttrValue::Func(
            FunctionRef::new("f").with_attr("k", AttrValue::I64(1)),
        )]);
        let err = convert(&value).unwrap_err();
        assert!(matches!(err, ImportError::Unimplemented(_)));
    }
}
