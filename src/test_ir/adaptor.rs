//! IrAdaptor implementation for the test IR.

use crate::core::{AccessClass, IrAdaptor, ScalarOp};

use super::{Operation, TestIR, ValueType, CONST_OPERAND_FLAG};

/// Reference to any value: arguments and instruction results are plain
/// indices into `values`; flagged references point into `consts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueRef(pub u32);

/// Reference to an instruction (a non-argument value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstRef(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockRef(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncRef(pub u32);

/// Adaptor over a parsed [`TestIR`], positioned on one function at a
/// time.
pub struct TestIrAdaptor<'ir> {
    ir: &'ir TestIR,
    cur_func: u32,
}

impl<'ir> TestIrAdaptor<'ir> {
    pub fn new(ir: &'ir TestIR) -> Self {
        Self { ir, cur_func: 0 }
    }

    pub fn cur_func(&self) -> FuncRef {
        FuncRef(self.cur_func)
    }

    pub fn switch_func(&mut self, func: FuncRef) -> bool {
        if (func.0 as usize) < self.ir.functions.len() {
            self.cur_func = func.0;
            true
        } else {
            false
        }
    }

    pub fn funcs(&self) -> impl Iterator<Item = FuncRef> {
        (0..self.ir.functions.len()).map(|idx| FuncRef(idx as u32))
    }

    pub fn func_name(&self, func: FuncRef) -> &str {
        &self.ir.functions[func.0 as usize].name
    }

    /// Entry block of the current function.
    pub fn entry_block(&self) -> BlockRef {
        let func = &self.ir.functions[self.cur_func as usize];
        assert!(func.block_begin_idx != func.block_end_idx);
        BlockRef(func.block_begin_idx)
    }

    pub fn block_name(&self, block: BlockRef) -> &str {
        &self.ir.blocks[block.0 as usize].name
    }

    /// Look up an instruction of the current function by name.
    pub fn inst_by_name(&self, name: &str) -> Option<InstRef> {
        let func = &self.ir.functions[self.cur_func as usize];
        for block_idx in func.block_begin_idx..func.block_end_idx {
            let block = &self.ir.blocks[block_idx as usize];
            for inst_idx in block.inst_begin_idx..block.inst_end_idx {
                if self.ir.values[inst_idx as usize].name == name {
                    return Some(InstRef(inst_idx));
                }
            }
        }
        None
    }

    pub fn value_name(&self, val: ValueRef) -> String {
        if val.0 & CONST_OPERAND_FLAG != 0 {
            format!("${}", self.ir.consts[(val.0 & !CONST_OPERAND_FLAG) as usize])
        } else {
            self.ir.values[val.0 as usize].name.clone()
        }
    }

    fn value(&self, inst: InstRef) -> &super::Value {
        &self.ir.values[inst.0 as usize]
    }
}

impl<'ir> IrAdaptor for TestIrAdaptor<'ir> {
    type ValueRef = ValueRef;
    type InstRef = InstRef;
    type BlockRef = BlockRef;
    type Opcode = Operation;

    fn blocks(&self) -> Box<dyn Iterator<Item = BlockRef> + '_> {
        let func = &self.ir.functions[self.cur_func as usize];
        Box::new((func.block_begin_idx..func.block_end_idx).map(BlockRef))
    }

    fn block_insts(&self, block: BlockRef) -> Box<dyn Iterator<Item = InstRef> + '_> {
        let block = &self.ir.blocks[block.0 as usize];
        Box::new((block.inst_begin_idx..block.inst_end_idx).map(InstRef))
    }

    fn opcode(&self, inst: InstRef) -> Operation {
        self.value(inst).op
    }

    fn num_operands(&self, inst: InstRef) -> usize {
        self.value(inst).op_count() as usize
    }

    fn operand(&self, inst: InstRef, idx: usize) -> ValueRef {
        let value = self.value(inst);
        assert!((idx as u32) < value.op_count());
        ValueRef(self.ir.value_operands[value.op_begin_idx as usize + idx])
    }

    fn value_as_inst(&self, val: ValueRef) -> Option<InstRef> {
        if val.0 & CONST_OPERAND_FLAG != 0 {
            return None;
        }
        match self.ir.values[val.0 as usize].value_type {
            ValueType::Arg => None,
            ValueType::Normal => Some(InstRef(val.0)),
        }
    }

    fn const_int_value(&self, val: ValueRef) -> Option<i64> {
        if val.0 & CONST_OPERAND_FLAG != 0 {
            Some(self.ir.consts[(val.0 & !CONST_OPERAND_FLAG) as usize])
        } else {
            None
        }
    }

    fn users(&self, inst: InstRef) -> Box<dyn Iterator<Item = (InstRef, usize)> + '_> {
        let func = &self.ir.functions[self.cur_func as usize];
        let mut users = Vec::new();
        for block_idx in func.block_begin_idx..func.block_end_idx {
            let block = &self.ir.blocks[block_idx as usize];
            for inst_idx in block.inst_begin_idx..block.inst_end_idx {
                let candidate = &self.ir.values[inst_idx as usize];
                for (pos, slot_idx) in
                    (candidate.op_begin_idx..candidate.op_end_idx).enumerate()
                {
                    if self.ir.value_operands[slot_idx as usize] == inst.0 {
                        users.push((InstRef(inst_idx), pos));
                    }
                }
            }
        }
        Box::new(users.into_iter())
    }

    fn access_class(&self, inst: InstRef) -> AccessClass {
        match self.value(inst).op {
            Operation::Read => AccessClass::IndexedRead,
            Operation::Write => AccessClass::IndexedWrite,
            _ => AccessClass::Other,
        }
    }

    fn num_dimensions(&self, inst: InstRef) -> usize {
        self.value(inst).dims as usize
    }

    fn index_of_dimension(&self, inst: InstRef, dim: usize) -> ValueRef {
        let value = self.value(inst);
        assert!((dim as u32) < value.dims);
        // Index slots follow the object slot.
        ValueRef(self.ir.value_operands[value.op_begin_idx as usize + 1 + dim])
    }

    fn object_operand(&self, inst: InstRef) -> ValueRef {
        let value = self.value(inst);
        debug_assert!(matches!(value.op, Operation::Read | Operation::Write));
        ValueRef(self.ir.value_operands[value.op_begin_idx as usize])
    }

    fn scalar_op(&self, inst: InstRef) -> Option<ScalarOp> {
        match self.value(inst).op {
            Operation::Add => Some(ScalarOp::Add),
            _ => None,
        }
    }

    fn inst_name(&self, inst: InstRef) -> String {
        format!("%{}", self.value(inst).name)
    }
}
