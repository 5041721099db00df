//! Integration tests for the textual test IR and its adaptor.

use slpvec::core::{AccessClass, IrAdaptor, ScalarOp};
use slpvec::test_ir::{TestIR, TestIrAdaptor};

fn parse(src: &str) -> TestIR {
    TestIR::parse(src).unwrap_or_else(|e| panic!("failed to parse test IR: {e}"))
}

fn check_output_contains(output: &str, patterns: &[&str]) {
    for pattern in patterns {
        assert!(
            output.contains(pattern),
            "Output missing expected pattern: '{pattern}'\nFull output:\n{output}"
        );
    }
}

const VECADD: &str = "
; element-wise add of two sequences
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
fn print_dumps_structure() {
    let ir = parse(VECADD);
    let output = ir.print();

    check_output_contains(
        &output,
        &[
            "Printing IR",
            "Function vecadd",
            "Argument s",
            "Argument t",
            "Block entry",
            "Value u0 (alloc)",
            "Op $2",
            "Value a0 (read)",
            "Op s",
            "Op $0",
            "Value s0 (add)",
            "Op a0",
            "Op b0",
            "Value u1 (write)",
            "Op u0",
            "Op s0",
        ],
    );
}

#[test]
fn adaptor_enumerates_blocks_and_insts() {
    let ir = parse(VECADD);
    let adaptor = TestIrAdaptor::new(&ir);

    let blocks: Vec<_> = adaptor.blocks().collect();
    assert_eq!(blocks.len(), 1);
    assert_eq!(adaptor.block_name(blocks[0]), "entry");

    let insts: Vec<_> = adaptor.block_insts(blocks[0]).collect();
    assert_eq!(insts.len(), 9);
    assert_eq!(adaptor.inst_name(insts[0]), "%u0");
    assert_eq!(adaptor.inst_name(insts[8]), "%u2");
}

#[test]
fn adaptor_classifies_instructions() {
    let ir = parse(VECADD);
    let adaptor = TestIrAdaptor::new(&ir);

    let read = adaptor.inst_by_name("a0").unwrap();
    assert_eq!(adaptor.access_class(read), AccessClass::IndexedRead);
    assert_eq!(adaptor.num_dimensions(read), 1);
    assert_eq!(adaptor.num_operands(read), 2);

    let write = adaptor.inst_by_name("u1").unwrap();
    assert_eq!(adaptor.access_class(write), AccessClass::IndexedWrite);
    assert_eq!(adaptor.num_operands(write), 3);

    let alloc = adaptor.inst_by_name("u0").unwrap();
    assert_eq!(adaptor.access_class(alloc), AccessClass::Other);
    assert_eq!(adaptor.scalar_op(alloc), None);

    let add = adaptor.inst_by_name("s0").unwrap();
    assert_eq!(adaptor.access_class(add), AccessClass::Other);
    assert_eq!(adaptor.scalar_op(add), Some(ScalarOp::Add));
}

#[test]
fn adaptor_resolves_operands() {
    let ir = parse(VECADD);
    let adaptor = TestIrAdaptor::new(&ir);

    let read = adaptor.inst_by_name("a1").unwrap();

    // Object operand is the argument %s: a value but not an instruction.
    let object = adaptor.object_operand(read);
    assert_eq!(adaptor.value_as_inst(object), None);
    assert_eq!(adaptor.const_int_value(object), None);
    assert_eq!(adaptor.value_name(object), "s");

    // Index is the interned constant 1.
    let index = adaptor.index_of_dimension(read, 0);
    assert_eq!(adaptor.const_int_value(index), Some(1));
    assert_eq!(adaptor.value_as_inst(index), None);

    // The add consumes two reads.
    let add = adaptor.inst_by_name("s1").unwrap();
    let lhs = adaptor.value_as_inst(adaptor.operand(add, 0)).unwrap();
    assert_eq!(adaptor.inst_name(lhs), "%a1");
}

#[test]
fn adaptor_enumerates_users() {
    let ir = parse(VECADD);
    let adaptor = TestIrAdaptor::new(&ir);

    let a0 = adaptor.inst_by_name("a0").unwrap();
    let users: Vec<String> = adaptor
        .users(a0)
        .map(|(user, pos)| format!("{}:{}", adaptor.inst_name(user), pos))
        .collect();
    assert_eq!(users, vec!["%s0:0"]);

    // The chained write consumes the previous write as its object.
    let u1 = adaptor.inst_by_name("u1").unwrap();
    let users: Vec<String> = adaptor
        .users(u1)
        .map(|(user, pos)| format!("{}:{}", adaptor.inst_name(user), pos))
        .collect();
    assert_eq!(users, vec!["%u2:0"]);
}

#[test]
fn adaptor_switches_functions() {
    let ir = parse(
        "
first(%s) {
entry:
    %a = read %s[0]
}
second(%t) {
entry:
    %b = read %t[0]
    %c = read %t[1]
}
",
    );
    let mut adaptor = TestIrAdaptor::new(&ir);

    assert_eq!(adaptor.funcs().count(), 2);
    assert!(adaptor.inst_by_name("a").is_some());
    assert!(adaptor.inst_by_name("b").is_none());

    let second = ir.find_function("second").unwrap();
    assert!(adaptor.switch_func(slpvec::test_ir::FuncRef(second)));
    assert_eq!(adaptor.func_name(adaptor.cur_func()), "second");
    assert!(adaptor.inst_by_name("b").is_some());
    assert_eq!(adaptor.block_insts(adaptor.entry_block()).count(), 2);
}
