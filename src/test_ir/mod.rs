//! Test IR: a small textual collection IR for exercising the analysis.
//!
//! The format is straight-line SSA with high-level sequence operations,
//! human-readable and easy to parse:
//!
//! ```text
//! ; comments start with semicolon
//! vecadd(%s, %t) {
//! entry:
//!     %u0 = alloc 4
//!     %a0 = read %s[0]
//!     %b0 = read %t[0]
//!     %s0 = add %a0, %b0
//!     %u1 = write %u0[0], %s0
//! }
//! ```
//!
//! `read` and `write` are indexed sequence accesses (`write` produces
//! the new sequence value), `alloc` allocates a sequence, `add`/`sub`
//! are scalar arithmetic. Integer literals are interned constants; reads
//! may carry several indices (`%m[0, 1]`).

use std::fmt;

pub mod adaptor;
pub mod deps;
pub mod parser;

pub use adaptor::{BlockRef, FuncRef, InstRef, TestIrAdaptor, ValueRef};
pub use deps::TestDependenceOracle;

/// Operand slots with this bit set reference the `consts` table instead
/// of the `values` table.
pub(crate) const CONST_OPERAND_FLAG: u32 = 1 << 31;

#[derive(Debug, Clone, PartialEq)]
pub struct TestIR {
    pub functions: Vec<Function>,
    pub blocks: Vec<Block>,
    pub values: Vec<Value>,
    /// Packed operand references: plain indices into `values`, or
    /// flagged indices into `consts`.
    pub value_operands: Vec<u32>,
    /// Interned integer constants.
    pub consts: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub arg_begin_idx: u32,
    pub arg_end_idx: u32,
    pub block_begin_idx: u32,
    pub block_end_idx: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: String,
    pub inst_begin_idx: u32,
    pub inst_end_idx: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub name: String,
    pub value_type: ValueType,
    pub op: Operation,
    /// Index dimensions for `read`/`write`, 0 otherwise.
    pub dims: u32,
    /// Operand slot range in `value_operands`.
    pub op_begin_idx: u32,
    pub op_end_idx: u32,
}

impl Value {
    pub fn op_count(&self) -> u32 {
        self.op_end_idx - self.op_begin_idx
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Arg,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    None,
    Alloc,
    Read,
    Write,
    Add,
    Sub,
}

impl Operation {
    pub const fn name(self) -> &'static str {
        match self {
            Operation::None => "<none>",
            Operation::Alloc => "alloc",
            Operation::Read => "read",
            Operation::Write => "write",
            Operation::Add => "add",
            Operation::Sub => "sub",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "alloc" => Some(Operation::Alloc),
            "read" => Some(Operation::Read),
            "write" => Some(Operation::Write),
            "add" => Some(Operation::Add),
            "sub" => Some(Operation::Sub),
            _ => None,
        }
    }
}

impl TestIR {
    pub fn new() -> Self {
        Self {
            functions: Vec::new(),
            blocks: Vec::new(),
            values: Vec::new(),
            value_operands: Vec::new(),
            consts: Vec::new(),
        }
    }

    pub fn parse(text: &str) -> Result<Self, String> {
        parser::parse_ir(text)
    }

    /// Index of the function named `name`.
    pub fn find_function(&self, name: &str) -> Option<u32> {
        self.functions
            .iter()
            .position(|func| func.name == name)
            .map(|idx| idx as u32)
    }

    fn operand_name(&self, slot: u32) -> String {
        if slot & CONST_OPERAND_FLAG != 0 {
            format!("${}", self.consts[(slot & !CONST_OPERAND_FLAG) as usize])
        } else {
            self.values[slot as usize].name.clone()
        }
    }

    /// Textual dump asserted on by tests.
    pub fn print(&self) -> String {
        let mut output = String::new();
        output.push_str("Printing IR\n");

        for func in &self.functions {
            output.push_str(&format!("Function {}", func.name));

            for arg_idx in func.arg_begin_idx..func.arg_end_idx {
                let arg = &self.values[arg_idx as usize];
                output.push_str(&format!("\nArgument {}", arg.name));
            }

            for block_idx in func.block_begin_idx..func.block_end_idx {
                let block = &self.blocks[block_idx as usize];
                output.push_str(&format!("\nBlock {}", block.name));

                for inst_idx in block.inst_begin_idx..block.inst_end_idx {
                    let inst = &self.values[inst_idx as usize];
                    output.push_str(&format!("\nValue {} ({})", inst.name, inst.op.name()));

                    for slot_idx in inst.op_begin_idx..inst.op_end_idx {
                        let slot = self.value_operands[slot_idx as usize];
                        output.push_str(&format!("\nOp {}", self.operand_name(slot)));
                    }
                }
            }
            output.push('\n');
        }

        output
    }
}

impl Default for TestIR {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TestIR {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.print())
    }
}
