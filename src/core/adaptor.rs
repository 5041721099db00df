//! IrAdaptor responsibilities.
//!
//! The adaptor is the glue between the pack analysis and the user's SSA
//! based IR. The analysis never owns or mutates instructions; it only
//! references them through the adaptor, which exposes the minimal set of
//! queries the pipeline needs:
//! - Associated reference types for values, instructions and blocks.
//! - Opcode tags, operand counts and random operand access.
//! - Constant inspection (adjacency is defined over signed integer
//!   constants only).
//! - Use enumeration as `(user, operand_no)` pairs.
//! - Classification of collection accesses (indexed read, indexed write,
//!   anything else) together with dimension, index and object queries.
//!
//! The framework assumes SSA form: a value is defined once and every use
//! is reachable through `users`. The analysis itself is per block; the
//! adaptor only has to enumerate a block's instructions in program order.

use std::fmt;
use std::hash::Hash;

/// Marker for opaque instruction handles.
///
/// A handle is a stable identity for one IR instruction: cheap to copy,
/// comparable for equality and usable as a hash key. Any type with those
/// properties qualifies.
pub trait InstId: Copy + Eq + Hash + fmt::Debug {}

impl<T: Copy + Eq + Hash + fmt::Debug> InstId for T {}

/// Classification of an instruction for seeding purposes.
///
/// The seeder switches on this tag instead of downcasting IR subtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessClass {
    /// Indexed read out of a collection value.
    IndexedRead,
    /// Indexed write producing a new collection value.
    IndexedWrite,
    /// Everything else: scalar ops, allocations, unclassified collection
    /// ops. Never a seed candidate.
    Other,
}

/// Scalar opcodes the pack typing recognizes.
///
/// Packs of any other scalar opcode are rejected as unknown when their
/// kind is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarOp {
    Add,
}

/// Bridge between an SSA IR and the pack analysis.
///
/// Reference types are opaque to the analysis. `ValueRef` covers every
/// SSA value (arguments, constants, instruction results) and supports
/// identity comparison; `InstRef` identifies instructions only and is
/// what packs are built from.
pub trait IrAdaptor {
    type ValueRef: Copy + Eq + Hash + fmt::Debug;
    type InstRef: InstId;
    type BlockRef: Copy + Eq;

    /// Opcode tag. Equal opcodes make two instructions isomorphic for
    /// packing, and the tag doubles as the kind bucketing collection
    /// accesses in the seeder.
    type Opcode: Copy + Eq + Hash + fmt::Debug;

    /// Blocks of the current function, in layout order.
    fn blocks(&self) -> Box<dyn Iterator<Item = Self::BlockRef> + '_>;

    /// Instructions of the given block, in program order.
    fn block_insts(&self, block: Self::BlockRef) -> Box<dyn Iterator<Item = Self::InstRef> + '_>;

    /// Opcode tag of an instruction.
    fn opcode(&self, inst: Self::InstRef) -> Self::Opcode;

    /// Operand count of an instruction.
    fn num_operands(&self, inst: Self::InstRef) -> usize;

    /// The `idx`-th operand.
    fn operand(&self, inst: Self::InstRef, idx: usize) -> Self::ValueRef;

    /// The instruction defining `val`, if `val` is an instruction result.
    fn value_as_inst(&self, val: Self::ValueRef) -> Option<Self::InstRef>;

    /// The value of `val` if it is a signed integer constant.
    fn const_int_value(&self, val: Self::ValueRef) -> Option<i64>;

    /// Uses of an instruction's result as `(user, operand_no)` pairs.
    fn users(&self, inst: Self::InstRef) -> Box<dyn Iterator<Item = (Self::InstRef, usize)> + '_>;

    /// Seeding classification of an instruction.
    fn access_class(&self, inst: Self::InstRef) -> AccessClass;

    /// Number of index dimensions of an indexed access.
    ///
    /// Only meaningful when [`access_class`](Self::access_class) is an
    /// indexed read or write.
    fn num_dimensions(&self, inst: Self::InstRef) -> usize;

    /// The value supplying the index of dimension `dim` of an indexed
    /// access.
    fn index_of_dimension(&self, inst: Self::InstRef, dim: usize) -> Self::ValueRef;

    /// The value of the collection being accessed or mutated.
    fn object_operand(&self, inst: Self::InstRef) -> Self::ValueRef;

    /// Scalar opcode mapping for pack typing, `None` for opcodes the
    /// packer does not recognize.
    fn scalar_op(&self, inst: Self::InstRef) -> Option<ScalarOp>;

    /// Printable name of an instruction, used in diagnostics and graph
    /// rendering.
    fn inst_name(&self, inst: Self::InstRef) -> String {
        format!("{:?}", inst)
    }
}
