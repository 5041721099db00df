//! Dependence oracle over the test IR.
//!
//! Data edges come straight from the def-use chains of a function;
//! control and memory edges do not arise in the straight-line test IR
//! and are injected manually where a scenario needs them.

use rustc_hash::FxHashSet;

use crate::core::{DependenceKind, DependenceOracle};

use super::adaptor::{FuncRef, InstRef};
use super::{TestIR, ValueType, CONST_OPERAND_FLAG};

#[derive(Debug, Default, Clone)]
pub struct TestDependenceOracle {
    edges: FxHashSet<(u32, u32, DependenceKind)>,
}

impl TestDependenceOracle {
    /// Oracle with no edges at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Derive data edges (producer to consumer) from one function's
    /// def-use chains.
    pub fn from_function(ir: &TestIR, func: FuncRef) -> Self {
        let mut edges = FxHashSet::default();
        let func = &ir.functions[func.0 as usize];

        for block_idx in func.block_begin_idx..func.block_end_idx {
            let block = &ir.blocks[block_idx as usize];
            for inst_idx in block.inst_begin_idx..block.inst_end_idx {
                let inst = &ir.values[inst_idx as usize];
                for slot_idx in inst.op_begin_idx..inst.op_end_idx {
                    let slot = ir.value_operands[slot_idx as usize];
                    if slot & CONST_OPERAND_FLAG != 0 {
                        continue;
                    }
                    if ir.values[slot as usize].value_type == ValueType::Arg {
                        continue;
                    }
                    edges.insert((slot, inst_idx, DependenceKind::Data));
                }
            }
        }

        Self { edges }
    }

    /// Inject an edge, e.g. a memory dependence a real alias analysis
    /// would report.
    pub fn add_edge(&mut self, from: InstRef, to: InstRef, kind: DependenceKind) {
        self.edges.insert((from.0, to.0, kind));
    }
}

impl DependenceOracle for TestDependenceOracle {
    type InstRef = InstRef;

    fn has_edge_of_kind(&self, from: InstRef, to: InstRef, kind: DependenceKind) -> bool {
        self.edges.contains(&(from.0, to.0, kind))
    }
}
