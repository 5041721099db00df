//! Pack set extension along use-def and def-use chains.
//!
//! Starting from the seeded pairs, the extender keeps trying to pack the
//! operands of packed instructions (use-defs) and their users
//! (def-uses). An instruction can occupy at most one left lane and one
//! right lane across the whole set, tracked by the free sets. Inserting
//! a pack invalidates the iteration over the set, so every successful
//! extension restarts the scan; the free sets shrink monotonically, so
//! the loop terminates.

use rustc_hash::FxHashSet;

use crate::core::{DependenceOracle, IrAdaptor};

use super::pack::Pack;
use super::pack_set::PackSet;

/// Scores a candidate def-use pair; higher wins.
pub type SavingsRanker<'a, I> = &'a dyn Fn(I, I) -> i64;

/// Grows a pack set to a fixed point.
pub struct PacksetExtender<'a, A: IrAdaptor> {
    adaptor: &'a A,
    oracle: Option<&'a dyn DependenceOracle<InstRef = A::InstRef>>,
    pack_set: &'a mut PackSet<A::InstRef>,
    free_left: FxHashSet<A::InstRef>,
    free_right: FxHashSet<A::InstRef>,
    ranker: Option<SavingsRanker<'a, A::InstRef>>,
}

impl<'a, A: IrAdaptor> PacksetExtender<'a, A> {
    pub fn new(
        adaptor: &'a A,
        block: A::BlockRef,
        pack_set: &'a mut PackSet<A::InstRef>,
        oracle: Option<&'a dyn DependenceOracle<InstRef = A::InstRef>>,
    ) -> Self {
        let mut free_left: FxHashSet<A::InstRef> = adaptor.block_insts(block).collect();
        let mut free_right = free_left.clone();

        // Lanes already claimed by seed packs are not free.
        for pack in pack_set.iter() {
            free_left.remove(&pack.lanes()[0]);
            free_right.remove(&pack.lanes()[1]);
        }

        Self {
            adaptor,
            oracle,
            pack_set,
            free_left,
            free_right,
            ranker: None,
        }
    }

    /// Install a savings ranker; def-use extension then picks the
    /// highest-scoring candidate pair instead of the first fit.
    pub fn with_savings_ranker(mut self, ranker: SavingsRanker<'a, A::InstRef>) -> Self {
        self.ranker = Some(ranker);
        self
    }

    /// Run to a fixed point.
    pub fn extend(&mut self) {
        let mut changed = true;

        while changed {
            changed = false;

            let packs: Vec<Pack<A::InstRef>> = self.pack_set.iter().cloned().collect();
            for pack in packs {
                if self.follow_def_uses(&pack) || self.follow_use_defs(&pack) {
                    // The set changed under us; restart the scan.
                    changed = true;
                    break;
                }
            }
        }
    }

    /// Opcode and arity must agree; operand-order normalization is the
    /// producer's responsibility.
    fn is_isomorphic(&self, a: A::InstRef, b: A::InstRef) -> bool {
        self.adaptor.opcode(a) == self.adaptor.opcode(b)
            && self.adaptor.num_operands(a) == self.adaptor.num_operands(b)
    }

    /// No dependence edge in either direction. Without an oracle every
    /// pair counts as dependent.
    fn is_independent(&self, a: A::InstRef, b: A::InstRef) -> bool {
        match self.oracle {
            None => false,
            Some(oracle) => !oracle.has_edge(a, b) && !oracle.has_edge(b, a),
        }
    }

    fn can_pack(&self, a: A::InstRef, b: A::InstRef) -> bool {
        // Both lanes must still be free on their side.
        if !self.free_left.contains(&a) || !self.free_right.contains(&b) {
            return false;
        }
        self.is_isomorphic(a, b) && self.is_independent(a, b)
    }

    fn commit(&mut self, left: A::InstRef, right: A::InstRef) {
        log::trace!(
            "extend: {} / {}",
            self.adaptor.inst_name(left),
            self.adaptor.inst_name(right)
        );
        self.pack_set.insert_pair(left, right, false);
        self.free_left.remove(&left);
        self.free_right.remove(&right);
    }

    /// Try to pack the operand definitions of `pack`'s lanes, column by
    /// column. Several operand columns may pack in one invocation.
    fn follow_use_defs(&mut self, pack: &Pack<A::InstRef>) -> bool {
        let left = pack.lanes()[0];
        let right = pack.lanes()[1];
        debug_assert!(self.is_isomorphic(left, right));

        let mut changed = false;
        for i in 0..self.adaptor.num_operands(left) {
            // Definitions feeding the same operand position.
            let op_left = self.adaptor.value_as_inst(self.adaptor.operand(left, i));
            let op_right = self.adaptor.value_as_inst(self.adaptor.operand(right, i));
            let (Some(op_left), Some(op_right)) = (op_left, op_right) else {
                continue;
            };

            // Both lanes reading one collection present the same
            // definition in the same column; a pack cannot hold one
            // instruction twice.
            if op_left == op_right {
                continue;
            }

            if self.can_pack(op_left, op_right) {
                self.commit(op_left, op_right);
                changed = true;
            }
        }

        changed
    }

    /// Try to pack a pair of users consuming `pack`'s lanes at the same
    /// operand position.
    ///
    /// The SLP paper picks the candidate with the greatest savings;
    /// without a cost model the first fit wins, unless a ranker was
    /// installed.
    fn follow_def_uses(&mut self, pack: &Pack<A::InstRef>) -> bool {
        let left = pack.lanes()[0];
        let right = pack.lanes()[1];

        let left_users: Vec<(A::InstRef, usize)> = self.adaptor.users(left).collect();
        let right_users: Vec<(A::InstRef, usize)> = self.adaptor.users(right).collect();

        let mut candidates: Vec<(A::InstRef, A::InstRef)> = Vec::new();

        for &(left_user, _) in &left_users {
            for &(right_user, _) in &right_users {
                // A pack cannot hold one instruction twice.
                if left_user == right_user {
                    continue;
                }
                if self.adaptor.num_operands(left_user) != self.adaptor.num_operands(right_user) {
                    continue;
                }

                // The lanes must feed the same operand position of both
                // users.
                let arity = self.adaptor.num_operands(left_user);
                let position_match = (0..arity).any(|i| {
                    self.adaptor.value_as_inst(self.adaptor.operand(left_user, i)) == Some(left)
                        && self.adaptor.value_as_inst(self.adaptor.operand(right_user, i))
                            == Some(right)
                });
                if !position_match {
                    continue;
                }

                if !self.can_pack(left_user, right_user) {
                    continue;
                }

                if self.ranker.is_none() {
                    self.commit(left_user, right_user);
                    return true;
                }
                candidates.push((left_user, right_user));
            }
        }

        if let Some(ranker) = self.ranker {
            let mut best: Option<(i64, A::InstRef, A::InstRef)> = None;
            for &(l, r) in &candidates {
                let score = ranker(l, r);
                if best.map_or(true, |(best_score, _, _)| score > best_score) {
                    best = Some((score, l, r));
                }
            }
            if let Some((_, l, r)) = best {
                self.commit(l, r);
                return true;
            }
        }

        false
    }
}
