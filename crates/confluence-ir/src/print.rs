//! Plain-text module dump
//!
//! A deterministic rendering used by tests and debugging. Not a parseable
//! exchange format; the IR itself is the artifact.

use std::collections::HashMap;
use std::fmt::Write;

use crate::function::{Function, Module};
use crate::ops::{OpId, Operation, Value};

/// Renders the whole module as text.
pub fn print_module(module: &Module) -> String {
    let mut out = String::new();
    let _ = write!(out, "module");
    if !module.attrs.is_empty() {
        let _ = write!(out, " attributes {{");
        for (i, (name, value)) in module.attrs.iter().enumerate() {
            if i > 0 {
                let _ = write!(out, ", ");
            }
            let _ = write!(out, "{} = {}", name, value);
        }
        let _ = write!(out, "}}");
    }
    let _ = writeln!(out, " {{");
    for function in module.functions() {
        print_function(&mut out, function);
    }
    let _ = writeln!(out, "}}");
    out
}

fn print_function(out: &mut String, function: &Function) {
    let _ = write!(out, "  func @{}(", function.name);
    for (i, ty) in function.ty.inputs.iter().enumerate() {
        if i > 0 {
            let _ = write!(out, ", ");
        }
        let _ = write!(out, "%arg{}: {}", i, ty);
    }
    let _ = write!(out, ") -> (");
    for (i, ty) in function.ty.results.iter().enumerate() {
        if i > 0 {
            let _ = write!(out, ", ");
        }
        let _ = write!(out, "{}", ty);
    }
    let _ = write!(out, ")");
    if !function.attrs.is_empty() {
        let _ = write!(out, " attributes {{");
        for (i, (name, value)) in function.attrs.iter().enumerate() {
            if i > 0 {
                let _ = write!(out, ", ");
            }
            let _ = write!(out, "{} = {}", name, value);
        }
        let _ = write!(out, "}}");
    }
    let _ = writeln!(out, " {{");

    // Stable value names from program order.
    let numbering: HashMap<OpId, usize> = function
        .body
        .order()
        .iter()
        .enumerate()
        .map(|(i, &id)| (id, i))
        .collect();

    for (id, op) in function.body.ops_in_order() {
        let _ = write!(out, "    ");
        if op.num_results() > 0 {
            let _ = write!(out, "%{}:{} = ", numbering[&id], op.num_results());
        }
        print_operation(out, op, &numbering);
        let _ = writeln!(out, " {}", op.location);
    }
    let _ = writeln!(out, "  }}");
}

fn print_operation(out: &mut String, op: &Operation, numbering: &HashMap<OpId, usize>) {
    let _ = write!(out, "{}(", op.name);
    for (i, operand) in op.operands.iter().enumerate() {
        if i > 0 {
            let _ = write!(out, ", ");
        }
        print_value(out, operand, numbering);
    }
    let _ = write!(out, ")");
    if !op.attrs.is_empty() {
        let _ = write!(out, " {{");
        for (i, (name, value)) in op.attrs.iter().enumerate() {
            if i > 0 {
                let _ = write!(out, ", ");
            }
            let _ = write!(out, "{} = {}", name, value);
        }
        let _ = write!(out, "}}");
    }
    if !op.result_types.is_empty() {
        let _ = write!(out, " : (");
        for (i, ty) in op.result_types.iter().enumerate() {
            if i > 0 {
                let _ = write!(out, ", ");
            }
            let _ = write!(out, "{}", ty);
        }
        let _ = write!(out, ")");
    }
    if let Some(inner) = &op.inner {
        let _ = write!(out, " wraps ");
        print_operation(out, inner, numbering);
    }
}

fn print_value(out: &mut String, value: &Value, numbering: &HashMap<OpId, usize>) {
    match value {
        Value::Arg(i) => {
            let _ = write!(out, "%arg{}", i);
        }
        Value::Result { op, index } => match numbering.get(op) {
            Some(n) => {
                let _ = write!(out, "%{}#{}", n, index);
            }
            None => {
                let _ = write!(out, "%<dangling>#{}", index);
            }
        },
    }
}
