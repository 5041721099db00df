//! Seed discovery: adjacent indexed accesses become 2-lane packs.
//!
//! One forward pass buckets indexed reads and indexed writes into left
//! and right candidate maps keyed by their opcode kind. Pairing then
//! walks each kind's left candidates looking for a right candidate with
//! an adjacent index over the same collection; matched instructions
//! retire from the side they matched on, so every instruction occupies
//! at most one left lane and at most one right lane. An instruction
//! matched as a right may still seed as a left, which produces chained
//! pairs the merger later collapses into longer runs.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::core::{AccessClass, DependenceKind, DependenceOracle, IrAdaptor};

use super::pack_set::PackSet;

type CandidateMap<A> =
    FxHashMap<<A as IrAdaptor>::Opcode, FxHashSet<<A as IrAdaptor>::InstRef>>;

/// Finds the initial seeded pack set for one basic block.
pub struct PackSeeder<'a, A: IrAdaptor> {
    adaptor: &'a A,
    oracle: Option<&'a dyn DependenceOracle<InstRef = A::InstRef>>,

    read_left: CandidateMap<A>,
    read_right: CandidateMap<A>,
    write_left: CandidateMap<A>,
    write_right: CandidateMap<A>,
}

impl<'a, A: IrAdaptor> PackSeeder<'a, A> {
    pub fn new(
        adaptor: &'a A,
        oracle: Option<&'a dyn DependenceOracle<InstRef = A::InstRef>>,
    ) -> Self {
        Self {
            adaptor,
            oracle,
            read_left: FxHashMap::default(),
            read_right: FxHashMap::default(),
            write_left: FxHashMap::default(),
            write_right: FxHashMap::default(),
        }
    }

    /// Classify one instruction into the candidate maps.
    ///
    /// Instructions that are not indexed accesses are ignored; they are
    /// not seed candidates.
    pub fn visit(&mut self, inst: A::InstRef) {
        let kind = self.adaptor.opcode(inst);
        match self.adaptor.access_class(inst) {
            AccessClass::IndexedRead => {
                self.read_left.entry(kind).or_default().insert(inst);
                self.read_right.entry(kind).or_default().insert(inst);
            }
            AccessClass::IndexedWrite => {
                self.write_left.entry(kind).or_default().insert(inst);
                self.write_right.entry(kind).or_default().insert(inst);
            }
            AccessClass::Other => {}
        }
    }

    /// Visit every instruction of `block` in program order.
    pub fn visit_block(&mut self, block: A::BlockRef) {
        let insts: Vec<A::InstRef> = self.adaptor.block_insts(block).collect();
        for inst in insts {
            self.visit(inst);
        }
    }

    /// Pair up the candidates collected so far.
    pub fn create_seeded_pack_set(&mut self) -> PackSet<A::InstRef> {
        let mut packset = PackSet::new();
        self.process_read_seeds(&mut packset);
        self.process_write_seeds(&mut packset);
        packset
    }

    /// Adjacency over integer constants: right = left + 1.
    ///
    /// Non-constant or non-integer indices never qualify; scev style
    /// pattern matching is future work.
    fn indices_adjacent(&self, left: A::ValueRef, right: A::ValueRef) -> bool {
        match (
            self.adaptor.const_int_value(left),
            self.adaptor.const_int_value(right),
        ) {
            (Some(left_int), Some(right_int)) => left_int + 1 == right_int,
            _ => false,
        }
    }

    /// Independence for read pairs.
    ///
    /// Reads have no side effects, so a missing oracle does not block
    /// them; with an oracle, any edge in either direction suppresses the
    /// pair.
    fn reads_independent(&self, left: A::InstRef, right: A::InstRef) -> bool {
        match self.oracle {
            None => true,
            Some(oracle) => !oracle.has_edge(left, right) && !oracle.has_edge(right, left),
        }
    }

    /// Independence for write pairs.
    ///
    /// The chain requirement already fixes the data-flow order between
    /// the two writes, so only control and memory edges are checked.
    /// Without an oracle, write pairs are refused.
    fn writes_independent(&self, left: A::InstRef, right: A::InstRef) -> bool {
        let Some(oracle) = self.oracle else {
            return false;
        };
        for kind in [DependenceKind::Control, DependenceKind::Memory] {
            if oracle.has_edge_of_kind(left, right, kind)
                || oracle.has_edge_of_kind(right, left, kind)
            {
                return false;
            }
        }
        true
    }

    fn process_read_seeds(&mut self, packset: &mut PackSet<A::InstRef>) {
        let kinds: Vec<A::Opcode> = self.read_left.keys().copied().collect();

        for kind in kinds {
            let lefts: Vec<A::InstRef> = match self.read_left.get(&kind) {
                Some(set) if !set.is_empty() => set.iter().copied().collect(),
                _ => continue,
            };
            if self.read_right.get(&kind).map_or(true, |set| set.is_empty()) {
                continue;
            }

            for left in lefts {
                // Multi-dimensional accesses are not seed candidates.
                if self.adaptor.num_dimensions(left) != 1 {
                    continue;
                }
                let left_index = self.adaptor.index_of_dimension(left, 0);

                let rights: Vec<A::InstRef> =
                    self.read_right[&kind].iter().copied().collect();
                for right in rights {
                    if self.adaptor.num_dimensions(right) != self.adaptor.num_dimensions(left) {
                        continue;
                    }
                    let right_index = self.adaptor.index_of_dimension(right, 0);

                    // Indices must be adjacent and both accesses must
                    // read the same collection.
                    if self.indices_adjacent(left_index, right_index)
                        && self.adaptor.object_operand(left) == self.adaptor.object_operand(right)
                        && self.reads_independent(left, right)
                    {
                        log::trace!(
                            "read seed: {} / {}",
                            self.adaptor.inst_name(left),
                            self.adaptor.inst_name(right)
                        );
                        packset.insert_pair(left, right, true);

                        // Retire each matched instruction from the side
                        // it matched on.
                        self.read_left.get_mut(&kind).unwrap().remove(&left);
                        self.read_right.get_mut(&kind).unwrap().remove(&right);
                        break;
                    }
                }
            }
        }
    }

    fn process_write_seeds(&mut self, packset: &mut PackSet<A::InstRef>) {
        let kinds: Vec<A::Opcode> = self.write_left.keys().copied().collect();

        for kind in kinds {
            let lefts: Vec<A::InstRef> = match self.write_left.get(&kind) {
                Some(set) if !set.is_empty() => set.iter().copied().collect(),
                _ => continue,
            };
            if self.write_right.get(&kind).map_or(true, |set| set.is_empty()) {
                continue;
            }

            for left in lefts {
                if self.adaptor.num_dimensions(left) != 1 {
                    continue;
                }
                let left_index = self.adaptor.index_of_dimension(left, 0);

                let rights: Vec<A::InstRef> =
                    self.write_right[&kind].iter().copied().collect();
                for right in rights {
                    if self.adaptor.num_dimensions(right) != self.adaptor.num_dimensions(left) {
                        continue;
                    }
                    let right_index = self.adaptor.index_of_dimension(right, 0);

                    // The right write must store into the sequence value
                    // the left write produced, at the adjacent index.
                    let chained = self
                        .adaptor
                        .value_as_inst(self.adaptor.object_operand(right))
                        == Some(left);

                    if self.indices_adjacent(left_index, right_index)
                        && chained
                        && self.writes_independent(left, right)
                    {
                        log::trace!(
                            "write seed: {} / {}",
                            self.adaptor.inst_name(left),
                            self.adaptor.inst_name(right)
                        );
                        packset.insert_pair(left, right, true);

                        self.write_left.get_mut(&kind).unwrap().remove(&left);
                        self.write_right.get_mut(&kind).unwrap().remove(&right);
                        break;
                    }
                }
            }
        }
    }
}
