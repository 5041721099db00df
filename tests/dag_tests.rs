//! Integration tests for the pack DAG and the full pipeline.

use std::rc::Rc;

use slpvec::core::{IrAdaptor, SlpError};
use slpvec::slp::{NodeRef, Pack, PackDag, PackType, SlpAnalyzer};
use slpvec::test_ir::{InstRef, TestDependenceOracle, TestIR, TestIrAdaptor};

fn parse(src: &str) -> TestIR {
    TestIR::parse(src).unwrap_or_else(|e| panic!("failed to parse test IR: {e}"))
}

fn node_named<'d>(
    dag: &'d PackDag<InstRef>,
    adaptor: &TestIrAdaptor,
    name: &str,
) -> (NodeRef<InstRef>, usize) {
    let inst = adaptor
        .inst_by_name(name)
        .unwrap_or_else(|| panic!("no instruction %{name}"));
    dag.node_of(inst)
        .unwrap_or_else(|| panic!("%{name} is not packed"))
}

/// Every recorded producer edge must agree with the IR: the producing
/// lane is exactly the consumer lane's operand.
fn check_edges_match_ir(dag: &PackDag<InstRef>, adaptor: &TestIrAdaptor) {
    for node in dag.nodes() {
        let n = node.borrow();
        for op_idx in 0..n.num_operands() {
            for lane in 0..n.num_lanes() {
                let Some(info) = n.operand_producer(op_idx, lane) else {
                    continue;
                };
                let (producer, producer_lane) = info.upgraded().unwrap();
                let consumer_inst = n.pack().lanes()[lane];
                let operand_inst = adaptor
                    .value_as_inst(adaptor.operand(consumer_inst, op_idx))
                    .expect("producer edge for a non-instruction operand");
                assert_eq!(
                    producer.borrow().pack().lanes()[producer_lane],
                    operand_inst
                );
            }
        }
    }
}

/// No node may be its own producer or consumer.
fn check_no_self_edges(dag: &PackDag<InstRef>) {
    for node in dag.nodes() {
        for producer in node.borrow().producers() {
            assert!(!Rc::ptr_eq(&producer, node));
        }
        for consumer in node.borrow().consumers() {
            assert!(!Rc::ptr_eq(&consumer, node));
        }
    }
}

const VECADD: &str = "
vecadd(%s, %t) {
entry:
    %u0 = alloc 2
    %a0 = read %s[0]
    %a1 = read %s[1]
    %b0 = read %t[0]
    %b1 = read %t[1]
    %s0 = add %a0, %b0
    %s1 = add %a1, %b1
    %u1 = write %u0[0], %s0
    %u2 = write %u1[1], %s1
}
";

#[test]
fn full_pipeline_builds_four_nodes() {
    let ir = parse(VECADD);
    let adaptor = TestIrAdaptor::new(&ir);
    let oracle = TestDependenceOracle::from_function(&ir, adaptor.cur_func());

    let analyzer = SlpAnalyzer::with_oracle(&adaptor, &oracle);
    let result = analyzer.analyze_block(adaptor.entry_block()).unwrap();
    let dag = &result.dag;

    assert_eq!(dag.len(), 4);
    // Both read packs and the write pack are seeds; the add pack is not.
    assert_eq!(dag.seeds().len(), 3);

    let (a_node, _) = node_named(dag, &adaptor, "a0");
    let (b_node, _) = node_named(dag, &adaptor, "b0");
    let (s_node, _) = node_named(dag, &adaptor, "s0");
    let (w_node, _) = node_named(dag, &adaptor, "u1");

    assert_eq!(a_node.borrow().kind(), PackType::Load);
    assert_eq!(s_node.borrow().kind(), PackType::Add);
    assert_eq!(w_node.borrow().kind(), PackType::Store);
    assert!(!s_node.borrow().is_seed());

    // The add pack's first operand comes from the a reads, lane for
    // lane; the second from the b reads.
    for lane in 0..2 {
        let (producer, producer_lane) = s_node
            .borrow()
            .operand_producer(0, lane)
            .unwrap()
            .upgraded()
            .unwrap();
        assert!(Rc::ptr_eq(&producer, &a_node));
        assert_eq!(producer_lane, lane);

        let (producer, producer_lane) = s_node
            .borrow()
            .operand_producer(1, lane)
            .unwrap()
            .upgraded()
            .unwrap();
        assert!(Rc::ptr_eq(&producer, &b_node));
        assert_eq!(producer_lane, lane);
    }

    // The write pack's stored value comes from the add pack.
    for lane in 0..2 {
        let (producer, producer_lane) = w_node
            .borrow()
            .operand_producer(2, lane)
            .unwrap()
            .upgraded()
            .unwrap();
        assert!(Rc::ptr_eq(&producer, &s_node));
        assert_eq!(producer_lane, lane);
    }

    // Producer/consumer back-references line up.
    assert!(a_node
        .borrow()
        .consumers()
        .iter()
        .any(|c| Rc::ptr_eq(c, &s_node)));
    assert!(s_node
        .borrow()
        .producers()
        .iter()
        .any(|p| Rc::ptr_eq(p, &a_node)));
    assert!(w_node
        .borrow()
        .producers()
        .iter()
        .any(|p| Rc::ptr_eq(p, &s_node)));

    check_edges_match_ir(dag, &adaptor);
    check_no_self_edges(dag);
}

#[test]
fn chained_store_pack_skips_its_own_lane() {
    let ir = parse(VECADD);
    let adaptor = TestIrAdaptor::new(&ir);
    let oracle = TestDependenceOracle::from_function(&ir, adaptor.cur_func());

    let analyzer = SlpAnalyzer::with_oracle(&adaptor, &oracle);
    let result = analyzer.analyze_block(adaptor.entry_block()).unwrap();

    let (w_node, _) = node_named(&result.dag, &adaptor, "u1");
    let w = w_node.borrow();

    // Lane 0's object is the unpacked alloc; lane 1's object is lane 0
    // of this very pack. Both slots stay empty.
    assert!(w.operand_producer(0, 0).is_none());
    assert!(w.operand_producer(0, 1).is_none());
}

#[test]
fn self_referential_store_lanes_are_tolerated() {
    let ir = parse(
        "
f(%v) {
entry:
    %w0 = write %w0[0], %v
    %w1 = write %w1[1], %v
}
",
    );
    let adaptor = TestIrAdaptor::new(&ir);

    let w0 = adaptor.inst_by_name("w0").unwrap();
    let w1 = adaptor.inst_by_name("w1").unwrap();

    let mut dag = PackDag::new();
    let node = dag
        .add_node(Pack::pair(w0, w1, false), &adaptor)
        .expect("store self-operands must not be fatal");

    let n = node.borrow();
    assert_eq!(n.kind(), PackType::Store);
    for op_idx in 0..n.num_operands() {
        for lane in 0..n.num_lanes() {
            assert!(n.operand_producer(op_idx, lane).is_none());
        }
    }
    drop(n);
    check_no_self_edges(&dag);
}

#[test]
fn non_store_self_reference_is_fatal() {
    let ir = parse(
        "
f(%s) {
entry:
    %a = read %s[0]
    %b = read %s[1]
    %x = add %a, %b
    %y = add %x, %b
}
",
    );
    let adaptor = TestIrAdaptor::new(&ir);

    let x = adaptor.inst_by_name("x").unwrap();
    let y = adaptor.inst_by_name("y").unwrap();

    let mut dag = PackDag::new();
    let err = dag.add_node(Pack::pair(x, y, false), &adaptor).unwrap_err();
    assert!(matches!(err, SlpError::CyclicPack { .. }), "{err}");
}

#[test]
fn duplicate_instruction_is_fatal() {
    let ir = parse(
        "
f(%s) {
entry:
    %a = read %s[0]
    %b = read %s[1]
}
",
    );
    let adaptor = TestIrAdaptor::new(&ir);
    let a = adaptor.inst_by_name("a").unwrap();
    let b = adaptor.inst_by_name("b").unwrap();

    let mut dag = PackDag::new();
    dag.add_node(Pack::pair(a, b, true), &adaptor).unwrap();
    let err = dag.add_node(Pack::pair(a, b, true), &adaptor).unwrap_err();
    assert!(matches!(err, SlpError::DuplicateInst { .. }), "{err}");
}

#[test]
fn unknown_scalar_opcode_is_fatal() {
    let ir = parse(
        "
f(%s) {
entry:
    %a = read %s[0]
    %b = read %s[1]
    %x = sub %a, %a
    %y = sub %b, %b
}
",
    );
    let adaptor = TestIrAdaptor::new(&ir);
    let x = adaptor.inst_by_name("x").unwrap();
    let y = adaptor.inst_by_name("y").unwrap();

    let mut dag = PackDag::new();
    let err = dag.add_node(Pack::pair(x, y, false), &adaptor).unwrap_err();
    assert!(matches!(err, SlpError::UnknownInstKind { .. }), "{err}");
}

#[test]
fn consumer_added_first_is_patched_when_producer_arrives() {
    let ir = parse(VECADD);
    let adaptor = TestIrAdaptor::new(&ir);

    let a0 = adaptor.inst_by_name("a0").unwrap();
    let a1 = adaptor.inst_by_name("a1").unwrap();
    let s0 = adaptor.inst_by_name("s0").unwrap();
    let s1 = adaptor.inst_by_name("s1").unwrap();

    let mut dag = PackDag::new();
    let s_node = dag.add_node(Pack::pair(s0, s1, false), &adaptor).unwrap();
    assert!(s_node.borrow().operand_producer(0, 0).is_none());

    let a_node = dag.add_node(Pack::pair(a0, a1, true), &adaptor).unwrap();

    for lane in 0..2 {
        let (producer, producer_lane) = s_node
            .borrow()
            .operand_producer(0, lane)
            .unwrap()
            .upgraded()
            .unwrap();
        assert!(Rc::ptr_eq(&producer, &a_node));
        assert_eq!(producer_lane, lane);
    }
    assert!(s_node
        .borrow()
        .producers()
        .iter()
        .any(|p| Rc::ptr_eq(p, &a_node)));
    assert!(a_node
        .borrow()
        .consumers()
        .iter()
        .any(|c| Rc::ptr_eq(c, &s_node)));

    check_edges_match_ir(&dag, &adaptor);
    check_no_self_edges(&dag);
}

#[test]
fn iteration_is_reverse_insertion_order() {
    let ir = parse(VECADD);
    let adaptor = TestIrAdaptor::new(&ir);
    let oracle = TestDependenceOracle::from_function(&ir, adaptor.cur_func());

    let analyzer = SlpAnalyzer::with_oracle(&adaptor, &oracle);
    let result = analyzer.analyze_block(adaptor.entry_block()).unwrap();
    let dag = &result.dag;

    let first = dag.iter().next().unwrap();
    assert!(Rc::ptr_eq(first, dag.nodes().last().unwrap()));
    assert_eq!(dag.iter().count(), dag.len());
}

#[test]
fn merged_read_run_becomes_one_wide_node() {
    let ir = parse(
        "
f(%s) {
entry:
    %a = read %s[0]
    %b = read %s[1]
    %c = read %s[2]
    %d = read %s[3]
}
",
    );
    let adaptor = TestIrAdaptor::new(&ir);
    let oracle = TestDependenceOracle::from_function(&ir, adaptor.cur_func());

    let analyzer = SlpAnalyzer::with_oracle(&adaptor, &oracle);
    let result = analyzer.analyze_block(adaptor.entry_block()).unwrap();

    assert_eq!(result.dag.len(), 1);
    let node = &result.dag.nodes()[0];
    assert_eq!(node.borrow().num_lanes(), 4);
    assert!(node.borrow().is_seed());
    assert_eq!(result.dag.seeds().len(), 1);
}

#[test]
fn unpackable_block_yields_empty_result() {
    let ir = parse(
        "
f(%s) {
entry:
    %x = add %s, %s
}
",
    );
    let adaptor = TestIrAdaptor::new(&ir);
    let oracle = TestDependenceOracle::from_function(&ir, adaptor.cur_func());

    let analyzer = SlpAnalyzer::with_oracle(&adaptor, &oracle);
    let result = analyzer.analyze_block(adaptor.entry_block()).unwrap();

    assert!(result.packs.is_empty());
    assert!(result.dag.is_empty());
}

#[test]
fn graphviz_renders_nodes_and_lane_edges() {
    let ir = parse(VECADD);
    let adaptor = TestIrAdaptor::new(&ir);
    let oracle = TestDependenceOracle::from_function(&ir, adaptor.cur_func());

    let analyzer = SlpAnalyzer::with_oracle(&adaptor, &oracle);
    let result = analyzer.analyze_block(adaptor.entry_block()).unwrap();

    let dot = result.dag.to_graphviz(&adaptor);
    for pattern in [
        "digraph G {",
        "(load)  %a0, %a1",
        "(load)  %b0, %b1",
        "(add)  %s0, %s1",
        "(store)  %u1, %u2",
        "color=green",
        "shape=box",
        "{(0, 0) (1, 1)}",
    ] {
        assert!(dot.contains(pattern), "missing '{pattern}' in:\n{dot}");
    }

    // The add pack is not a seed, so exactly three nodes are green.
    assert_eq!(dot.matches("color=green").count(), 3);
}

#[test]
fn analysis_is_deterministic() {
    let ir = parse(VECADD);
    let adaptor = TestIrAdaptor::new(&ir);
    let oracle = TestDependenceOracle::from_function(&ir, adaptor.cur_func());
    let analyzer = SlpAnalyzer::with_oracle(&adaptor, &oracle);

    let first = analyzer.analyze_block(adaptor.entry_block()).unwrap();
    let second = analyzer.analyze_block(adaptor.entry_block()).unwrap();

    assert_eq!(first.packs, second.packs);
    assert_eq!(
        first.dag.to_graphviz(&adaptor),
        second.dag.to_graphviz(&adaptor)
    );
}
