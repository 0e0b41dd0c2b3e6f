//! End-to-end import scenarios

use indexmap::IndexMap;

use confluence_graph::{
    ArgDef, AttrValue, DebugInfo, ElementType, FunctionDef, FunctionLibrary, FunctionRef,
    FunctionSignature, Graph, NodeId, NodeInit, TensorShape, TensorValue, VersionInfo, ops,
};
use confluence_import::{ImportConfig, ImportError, import_graph};
use confluence_ir::{Attribute, Function, OpId, Operation, Type, Value, exec, print_module};

fn empty_graph() -> Graph {
    Graph::new(VersionInfo::default())
}

fn const_node(g: &mut Graph, name: &str, dims: Vec<i64>) -> NodeId {
    let len: i64 = dims.iter().product();
    g.add_node(NodeInit::new(name, "Const", 1).with_attr(
        "value",
        AttrValue::Tensor(TensorValue::f32(dims, vec![0.0; len as usize])),
    ))
}

fn import(graph: &Graph) -> confluence_ir::Module {
    import_graph(
        graph,
        &FunctionLibrary::new(),
        &DebugInfo::new(),
        &ImportConfig::default(),
    )
    .expect("import failed")
}

/// The operation registered for the node with the given `name` attribute.
fn op_named<'a>(function: &'a Function, name: &str) -> (OpId, &'a Operation) {
    function
        .body
        .ops_in_order()
        .find(|(_, op)| {
            let attrs = op.inner.as_ref().map(|inner| &inner.attrs).unwrap_or(&op.attrs);
            attrs.get("name").and_then(Attribute::as_str) == Some(name)
        })
        .unwrap_or_else(|| panic!("no operation for node '{}'", name))
}

fn fetch_op(function: &Function) -> &Operation {
    function
        .body
        .ops_in_order()
        .map(|(_, op)| op)
        .find(|op| op.name == exec::FETCH)
        .expect("function has no fetch terminator")
}

// Graph: a(const, [2,3]) -> b(identity) -> c(retval), nothing declared.
// The entry function has zero arguments and one result, and b is a generic
// wrapped operation with a's constant as sole operand.
#[test]
fn test_const_identity_output_scenario() {
    let mut g = empty_graph();
    let a = const_node(&mut g, "a", vec![2, 3]);
    let b = g.add_node(NodeInit::new("b", "Identity", 1));
    let c = g.add_node(NodeInit::new("c", ops::RETVAL, 0));
    g.add_data_edge(a, 0, b, 0);
    g.add_data_edge(b, 0, c, 0);

    let module = import(&g);
    let main = module.function("main").expect("entry function missing");

    assert!(main.ty.inputs.is_empty());
    assert_eq!(
        main.ty.results,
        vec![Type::tensor(ElementType::F32, TensorShape::ranked(vec![2, 3]))]
    );

    let (a_op, _) = op_named(main, "a");
    let (_, b_island) = op_named(main, "b");
    assert_eq!(b_island.name, exec::ISLAND);
    let inner = b_island.inner.as_ref().expect("islands wrap an inner op");
    assert_eq!(inner.name, "flow.Identity");
    assert_eq!(inner.operands, vec![Value::result(a_op, 0)]);

    // The return node itself is erased; its operand is fetched.
    assert_eq!(fetch_op(main).operands.len(), 1);
}

#[test]
fn test_undeclared_input_fails() {
    let mut g = empty_graph();
    const_node(&mut g, "a", vec![2]);

    let config = ImportConfig::default().with_input(
        "missing",
        ElementType::F32,
        TensorShape::unranked(),
    );
    let err = import_graph(&g, &FunctionLibrary::new(), &DebugInfo::new(), &config).unwrap_err();
    assert!(matches!(err, ImportError::UndefinedInputOutput(_)));
}

#[test]
fn test_output_port_out_of_range_fails() {
    let mut g = empty_graph();
    let node = g.add_node(NodeInit::new("node", "TwoOutputs", 2));
    let c = const_node(&mut g, "c", vec![1]);
    g.add_data_edge(c, 0, node, 0);

    let config = ImportConfig::default().with_output("node:5").unwrap();
    let err = import_graph(&g, &FunctionLibrary::new(), &DebugInfo::new(), &config).unwrap_err();
    match err {
        ImportError::InvalidPort {
            node,
            port,
            num_outputs,
        } => {
            assert_eq!(node, "node");
            assert_eq!(port, 5);
            assert_eq!(num_outputs, 2);
        }
        other => panic!("expected InvalidPort, got {}", other),
    }
}

// One loop: enter -> merge <- next_iteration, with next fed from merge.
// After import the merge must consume the loop source's token result at
// the original input position.
#[test]
fn test_single_loop_reconnects_backedge() {
    let mut g = empty_graph();
    let c = const_node(&mut g, "c", vec![1]);
    let enter = g.add_node(NodeInit::new("enter", ops::ENTER, 1));
    let merge = g.add_node(NodeInit::new("merge", ops::MERGE, 2));
    let next = g.add_node(NodeInit::new("next", ops::NEXT_ITERATION, 1));
    g.add_data_edge(c, 0, enter, 0);
    g.add_data_edge(enter, 0, merge, 0);
    g.add_data_edge(merge, 0, next, 0);
    g.add_data_edge(next, 0, merge, 1);

    let module = import(&g);
    let main = module.function("main").unwrap();

    // The paired source sits at the very start of the region.
    let (first_id, first) = main.body.ops_in_order().next().unwrap();
    assert_eq!(first.name, exec::NEXT_ITERATION_SOURCE);
    assert_eq!(first.result_types, vec![Type::Token]);

    let (_, merge_op) = op_named(main, "merge");
    assert_eq!(merge_op.name, exec::MERGE);
    assert_eq!(merge_op.operands.len(), 2);
    assert_eq!(merge_op.operands[1], Value::result(first_id, 0));

    let (_, sink) = main
        .body
        .ops_in_order()
        .find(|(_, op)| op.name == exec::NEXT_ITERATION_SINK)
        .expect("loop sink missing");
    assert_eq!(sink.operands[0], Value::result(first_id, 0));
}

#[test]
fn test_import_is_deterministic_under_insertion_order() {
    let build = |names: &[&str]| {
        let mut g = empty_graph();
        for name in names {
            const_node(&mut g, name, vec![2]);
        }
        let sum = g.add_node(NodeInit::new("sum", "AddN", 1));
        // Inputs wired by name so only the storage order varies.
        let mut sorted = names.to_vec();
        sorted.sort_unstable();
        for (i, name) in sorted.iter().enumerate() {
            let id = g.find_node(name).unwrap();
            g.add_data_edge(id, 0, sum, i);
        }
        print_module(&import(&g))
    };

    assert_eq!(build(&["x", "y", "z"]), build(&["z", "x", "y"]));
}

fn passthrough_function(name: &str) -> FunctionDef {
    let mut body = Graph::new(VersionInfo::default());
    let arg = body.add_node(
        NodeInit::new("arg0", ops::ARG, 1)
            .with_attr("index", AttrValue::I64(0))
            .with_attr("dtype", AttrValue::Type(ElementType::F32)),
    );
    let ret = body.add_node(
        NodeInit::new("ret0", ops::RETVAL, 0).with_attr("index", AttrValue::I64(0)),
    );
    body.add_data_edge(arg, 0, ret, 0);

    FunctionDef {
        signature: FunctionSignature {
            name: name.to_string(),
            inputs: vec![ArgDef {
                name: "arg0".to_string(),
                dtype: ElementType::F32,
            }],
            outputs: vec![ArgDef {
                name: "ret0".to_string(),
                dtype: ElementType::F32,
            }],
            is_stateful: false,
        },
        body,
        attrs: IndexMap::new(),
        control_outputs: Vec::new(),
    }
}

#[test]
fn test_two_call_sites_share_one_symbol() {
    let mut lib = FunctionLibrary::new();
    lib.insert(passthrough_function("f"));

    let mut g = empty_graph();
    let c = const_node(&mut g, "c", vec![2]);
    let call1 = g.add_node(NodeInit::new("call1", "f", 1));
    let call2 = g.add_node(NodeInit::new("call2", "f", 1));
    g.add_data_edge(c, 0, call1, 0);
    g.add_data_edge(c, 0, call2, 0);

    let module = import_graph(&g, &lib, &DebugInfo::new(), &ImportConfig::default()).unwrap();

    // main + exactly one materialization of f.
    assert_eq!(module.len(), 2);
    assert!(module.function("f").is_some());

    let main = module.function("main").unwrap();
    for call in ["call1", "call2"] {
        let (_, island) = op_named(main, call);
        assert_eq!(island.inner.as_ref().unwrap().name, "flow.f");
    }
}

#[test]
fn test_direct_recursion_terminates() {
    let mut def = passthrough_function("r");
    // Body calls itself: arg -> call(r) -> ret.
    let mut body = Graph::new(VersionInfo::default());
    let arg = body.add_node(
        NodeInit::new("arg0", ops::ARG, 1)
            .with_attr("index", AttrValue::I64(0))
            .with_attr("dtype", AttrValue::Type(ElementType::F32)),
    );
    let call = body.add_node(NodeInit::new("again", "r", 1));
    let ret = body.add_node(
        NodeInit::new("ret0", ops::RETVAL, 0).with_attr("index", AttrValue::I64(0)),
    );
    body.add_data_edge(arg, 0, call, 0);
    body.add_data_edge(call, 0, ret, 0);
    def.body = body;

    let mut lib = FunctionLibrary::new();
    lib.insert(def);

    let mut g = empty_graph();
    let c = const_node(&mut g, "c", vec![2]);
    let invoke = g.add_node(NodeInit::new("invoke", "r", 1));
    g.add_data_edge(c, 0, invoke, 0);

    let module = import_graph(&g, &lib, &DebugInfo::new(), &ImportConfig::default()).unwrap();
    assert_eq!(module.len(), 2);

    // The recursive call site resolves to the same symbol, not a copy.
    let r = module.function("r").unwrap();
    let (_, island) = op_named(r, "again");
    assert_eq!(island.inner.as_ref().unwrap().name, "flow.r");
}

#[test]
fn test_gradient_function_cross_reference() {
    let mut lib = FunctionLibrary::new();
    lib.insert(passthrough_function("f"));
    lib.insert(passthrough_function("f_grad"));
    lib.set_gradient("f", "f_grad");

    let mut g = empty_graph();
    let c = const_node(&mut g, "c", vec![2]);
    let call = g.add_node(NodeInit::new("call", "f", 1));
    g.add_data_edge(c, 0, call, 0);

    let module = import_graph(&g, &lib, &DebugInfo::new(), &ImportConfig::default()).unwrap();
    assert_eq!(module.len(), 3);
    let f = module.function("f").unwrap();
    assert_eq!(
        f.attrs.get("gradient"),
        Some(&Attribute::SymbolRef("f_grad".to_string()))
    );
}

#[test]
fn test_function_input_shapes_annotation_ranks_arguments() {
    let mut def = passthrough_function("g");
    def.attrs.insert(
        "_input_shapes".to_string(),
        AttrValue::List(vec![AttrValue::Shape(TensorShape::ranked(vec![4, 4]))]),
    );
    let mut lib = FunctionLibrary::new();
    lib.insert(def);

    let mut g = empty_graph();
    let c = const_node(&mut g, "c", vec![4, 4]);
    let call = g.add_node(NodeInit::new("call", "g", 1));
    g.add_data_edge(c, 0, call, 0);

    let module = import_graph(&g, &lib, &DebugInfo::new(), &ImportConfig::default()).unwrap();
    let g_fn = module.function("g").unwrap();
    assert_eq!(
        g_fn.ty.inputs,
        vec![Type::tensor(ElementType::F32, TensorShape::ranked(vec![4, 4]))]
    );
}

#[test]
fn test_branch_variants_collapse_with_marker() {
    let mut lib = FunctionLibrary::new();
    lib.insert(passthrough_function("then_fn"));
    lib.insert(passthrough_function("else_fn"));

    let mut g = empty_graph();
    let pred = const_node(&mut g, "pred", vec![]);
    let x = const_node(&mut g, "x", vec![2]);
    let cond = g.add_node(
        NodeInit::new("cond", ops::STATELESS_IF, 1)
            .with_attr("then_branch", AttrValue::Func(FunctionRef::new("then_fn")))
            .with_attr("else_branch", AttrValue::Func(FunctionRef::new("else_fn"))),
    );
    g.add_data_edge(pred, 0, cond, 0);
    g.add_data_edge(x, 0, cond, 1);

    let module = import_graph(&g, &lib, &DebugInfo::new(), &ImportConfig::default()).unwrap();
    let main = module.function("main").unwrap();
    let (_, island) = op_named(main, "cond");
    let inner = island.inner.as_ref().unwrap();

    assert_eq!(inner.name, "flow.If");
    assert_eq!(inner.attrs.get("is_stateless"), Some(&Attribute::Bool(true)));
    assert_eq!(
        inner.attrs.get("then_branch"),
        Some(&Attribute::SymbolRef("then_fn".to_string()))
    );
    assert_eq!(
        inner.attrs.get("else_branch"),
        Some(&Attribute::SymbolRef("else_fn".to_string()))
    );
    assert_eq!(module.len(), 3);
}

#[test]
fn test_list_of_function_with_nested_attrs_is_unimplemented() {
    let mut lib = FunctionLibrary::new();
    lib.insert(passthrough_function("f"));

    let mut g = empty_graph();
    g.add_node(NodeInit::new("bad", "CustomOp", 1).with_attr(
        "branches",
        AttrValue::List(vec![AttrValue::Func(
            FunctionRef::new("f").with_attr("k", AttrValue::I64(1)),
        )]),
    ));

    let err = import_graph(&g, &lib, &DebugInfo::new(), &ImportConfig::default()).unwrap_err();
    assert!(matches!(err, ImportError::Unimplemented(_)));
}

#[test]
fn test_declared_input_becomes_function_argument() {
    let mut g = empty_graph();
    let x = g.add_node(NodeInit::new("x", "ReadVariableOp", 1));
    let out = g.add_node(NodeInit::new("out", "Identity", 1));
    g.add_data_edge(x, 0, out, 0);

    let config = ImportConfig::default()
        .with_input("x", ElementType::F32, TensorShape::ranked(vec![8]))
        .with_output("out")
        .unwrap();
    let module = import_graph(&g, &FunctionLibrary::new(), &DebugInfo::new(), &config).unwrap();
    let main = module.function("main").unwrap();

    assert_eq!(
        main.ty.inputs,
        vec![Type::tensor(ElementType::F32, TensorShape::ranked(vec![8]))]
    );
    assert_eq!(
        main.ty.results,
        vec![Type::tensor(ElementType::F32, TensorShape::ranked(vec![8]))]
    );

    // The substituted input keeps its island; the inner op consumes the
    // function argument through the `.input` form.
    let (_, island) = op_named(main, "x");
    let inner = island.inner.as_ref().unwrap();
    assert_eq!(inner.name, "flow.Placeholder.input");
    assert_eq!(inner.operands.last(), Some(&Value::Arg(0)));

    // Declared names are recorded for external tooling.
    match main.attrs.get("entry_function") {
        Some(Attribute::Dict(dict)) => {
            assert_eq!(dict.get("inputs"), Some(&Attribute::Str("x".to_string())));
            assert_eq!(dict.get("outputs"), Some(&Attribute::Str("out".to_string())));
        }
        other => panic!("expected entry_function dict, got {:?}", other),
    }
}

#[test]
fn test_graph_as_function_uses_arg_and_retval_nodes() {
    let mut g = empty_graph();
    let arg = g.add_node(
        NodeInit::new("in0", ops::ARG, 1)
            .with_attr("index", AttrValue::I64(0))
            .with_attr("dtype", AttrValue::Type(ElementType::I32))
            .with_attr("shape", AttrValue::Shape(TensorShape::ranked(vec![3]))),
    );
    let ret = g.add_node(
        NodeInit::new("out0", ops::RETVAL, 0).with_attr("index", AttrValue::I64(0)),
    );
    g.add_data_edge(arg, 0, ret, 0);

    let mut config = ImportConfig::default();
    config.graph_as_function = true;
    let module = import_graph(&g, &FunctionLibrary::new(), &DebugInfo::new(), &config).unwrap();
    let main = module.function("main").unwrap();

    assert_eq!(
        main.ty.inputs,
        vec![Type::tensor(ElementType::I32, TensorShape::ranked(vec![3]))]
    );
    assert_eq!(main.ty.results.len(), 1);
    // arg and retval islands are both erased; the argument flows straight
    // to the fetch.
    assert_eq!(fetch_op(main).operands, vec![Value::Arg(0)]);
}

#[test]
fn test_graph_as_function_rejects_declared_bindings() {
    let mut g = empty_graph();
    const_node(&mut g, "c", vec![1]);

    let mut config = ImportConfig::default().with_output("c").unwrap();
    config.graph_as_function = true;
    let err = import_graph(&g, &FunctionLibrary::new(), &DebugInfo::new(), &config).unwrap_err();
    assert!(matches!(err, ImportError::InvalidConfig(_)));
}

#[test]
fn test_source_edge_besides_sole_input_is_malformed() {
    let mut g = empty_graph();
    let source = g.source_id();
    let c = const_node(&mut g, "c", vec![1]);
    let sink = g.add_node(NodeInit::new("sink", "Identity", 1));
    g.add_control_edge(source, sink);
    g.add_data_edge(c, 0, sink, 0);

    let err = import_graph(
        &g,
        &FunctionLibrary::new(),
        &DebugInfo::new(),
        &ImportConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ImportError::MalformedGraph(_)));
}

#[test]
fn test_sole_source_edge_is_dropped() {
    let mut g = empty_graph();
    let source = g.source_id();
    let lone = g.add_node(NodeInit::new("lone", "NoOp", 0));
    g.add_control_edge(source, lone);

    let module = import(&g);
    let main = module.function("main").unwrap();
    let (_, island) = op_named(main, "lone");
    assert!(island.operands.is_empty());
}

#[test]
fn test_versions_metadata_copied_to_module() {
    let g = Graph::new(VersionInfo {
        producer: 27,
        min_consumer: 12,
        bad_consumers: vec![19],
    });
    let module = import(&g);
    match module.attrs.get("versions") {
        Some(Attribute::Dict(dict)) => {
            assert_eq!(dict.get("producer"), Some(&Attribute::I64(27)));
            assert_eq!(dict.get("min_consumer"), Some(&Attribute::I64(12)));
            assert_eq!(
                dict.get("bad_consumers"),
                Some(&Attribute::Array(vec![Attribute::I64(19)]))
            );
        }
        other => panic!("expected versions dict, got {:?}", other),
    }
}

#[test]
fn test_legacy_input_upgrade() {
    let mut g = empty_graph();
    let legacy = g.add_node(NodeInit::new("x", ops::LEGACY_FED_INPUT, 1));
    let out = g.add_node(NodeInit::new("out", "Identity", 1));
    g.add_data_edge(legacy, 0, out, 0);

    let mut config = ImportConfig::default()
        .with_input("x", ElementType::F32, TensorShape::ranked(vec![2]))
        .with_output("out")
        .unwrap();
    config.upgrade_legacy_inputs = true;

    let module = import_graph(&g, &FunctionLibrary::new(), &DebugInfo::new(), &config).unwrap();
    let main = module.function("main").unwrap();
    let (_, island) = op_named(main, "x");
    assert_eq!(
        island.inner.as_ref().unwrap().name,
        "flow.Placeholder.input"
    );
}

#[test]
fn test_legacy_input_with_secondary_output_in_use_fails() {
    let mut g = empty_graph();
    let legacy = g.add_node(NodeInit::new("x", ops::LEGACY_FED_INPUT, 2));
    let out = g.add_node(NodeInit::new("out", "Identity", 1));
    g.add_data_edge(legacy, 1, out, 0);

    let mut config =
        ImportConfig::default().with_input("x", ElementType::F32, TensorShape::unranked());
    config.upgrade_legacy_inputs = true;

    let err = import_graph(&g, &FunctionLibrary::new(), &DebugInfo::new(), &config).unwrap_err();
    assert!(matches!(err, ImportError::InvalidConfig(_)));
}

#[test]
fn test_control_edges_sort_after_data_edges() {
    let mut g = empty_graph();
    let a = const_node(&mut g, "a", vec![1]);
    let b = const_node(&mut g, "b", vec![1]);
    let trigger = const_node(&mut g, "t", vec![1]);
    let sum = g.add_node(NodeInit::new("sum", "Add", 1));
    // Deliberately interleave control and data insertion.
    g.add_control_edge(trigger, sum);
    g.add_data_edge(b, 0, sum, 1);
    g.add_data_edge(a, 0, sum, 0);

    let module = import(&g);
    let main = module.function("main").unwrap();
    let (a_op, _) = op_named(main, "a");
    let (b_op, _) = op_named(main, "b");
    let (t_op, t_island) = op_named(main, "t");
    let (_, sum_island) = op_named(main, "sum");

    let inner = sum_island.inner.as_ref().unwrap();
    assert_eq!(
        inner.operands,
        vec![Value::result(a_op, 0), Value::result(b_op, 0)]
    );
    // The control operand rides on the island, referencing the producer's
    // trailing control token.
    assert_eq!(
        sum_island.operands,
        vec![Value::result(t_op, t_island.control_result_index())]
    );
}
