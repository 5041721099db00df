//! Packs: ordered groups of scalar instructions fused into one SIMD op.
//!
//! A pack is a sequence of lanes; lane `l` produces element `l` of the
//! vector result. All lanes of a valid pack share one opcode and one
//! operand arity, and lane `i`'s `j`-th operand is parallel to lane
//! `k`'s `j`-th operand.

use std::fmt;
use std::hash::{Hash, Hasher};

use smallvec::SmallVec;

use crate::core::{AccessClass, InstId, IrAdaptor, ScalarOp, SlpError, SlpResult};

/// Kind of operation a pack fuses.
///
/// Derived lazily from the first lane: indexed collection reads and
/// writes map to `Load`/`Store`, recognized scalar opcodes map by
/// opcode. Anything else is a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackType {
    Load,
    Store,
    Add,
}

impl fmt::Display for PackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PackType::Load => "load",
            PackType::Store => "store",
            PackType::Add => "add",
        };
        f.write_str(s)
    }
}

/// An ordered group of scalar instructions.
///
/// Equality and hashing consider the lane sequence only; the seed flag
/// is an attribute, not part of the identity.
#[derive(Debug, Clone)]
pub struct Pack<I: InstId> {
    lanes: SmallVec<[I; 4]>,
    is_seed: bool,
}

impl<I: InstId> Pack<I> {
    /// A two-lane pack.
    pub fn pair(left: I, right: I, is_seed: bool) -> Self {
        let mut lanes = SmallVec::new();
        lanes.push(left);
        lanes.push(right);
        Self { lanes, is_seed }
    }

    pub fn lanes(&self) -> &[I] {
        &self.lanes
    }

    pub fn num_lanes(&self) -> usize {
        self.lanes.len()
    }

    pub fn first(&self) -> I {
        self.lanes[0]
    }

    pub fn last(&self) -> I {
        self.lanes[self.lanes.len() - 1]
    }

    /// True iff the seeder created this pack.
    pub fn is_seed(&self) -> bool {
        self.is_seed
    }

    pub fn set_seed(&mut self, is_seed: bool) {
        self.is_seed = is_seed;
    }

    /// Append a lane on the right.
    pub fn append_lane(&mut self, inst: I) {
        self.lanes.push(inst);
    }

    /// Position of `inst` within the lanes, if present.
    pub fn index_of(&self, inst: I) -> Option<usize> {
        self.lanes.iter().position(|&lane| lane == inst)
    }

    /// Operand arity of the pack, taken from lane 0.
    pub fn num_operands<A: IrAdaptor<InstRef = I>>(&self, adaptor: &A) -> usize {
        adaptor.num_operands(self.lanes[0])
    }

    /// Kind of this pack, inferred from lane 0.
    ///
    /// All lanes share one opcode, so lane 0 speaks for the pack.
    pub fn kind<A: IrAdaptor<InstRef = I>>(&self, adaptor: &A) -> SlpResult<PackType> {
        let inst = self.lanes[0];
        match adaptor.access_class(inst) {
            AccessClass::IndexedRead => Ok(PackType::Load),
            AccessClass::IndexedWrite => Ok(PackType::Store),
            AccessClass::Other => match adaptor.scalar_op(inst) {
                Some(ScalarOp::Add) => Ok(PackType::Add),
                None => Err(SlpError::UnknownInstKind {
                    inst: adaptor.inst_name(inst),
                }),
            },
        }
    }

    /// `(name0, name1, …)` listing for logs and diagnostics.
    pub fn dbg_string<A: IrAdaptor<InstRef = I>>(&self, adaptor: &A) -> String {
        let names: Vec<String> = self
            .lanes
            .iter()
            .map(|&inst| adaptor.inst_name(inst))
            .collect();
        format!("({})", names.join(", "))
    }
}

impl<I: InstId> PartialEq for Pack<I> {
    fn eq(&self, other: &Self) -> bool {
        self.lanes == other.lanes
    }
}

impl<I: InstId> Eq for Pack<I> {}

impl<I: InstId> Hash for Pack<I> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for lane in &self.lanes {
            lane.hash(state);
        }
    }
}
