//! SLP pack analysis pipeline.
//!
//! Four stages run per basic block, strictly in sequence:
//!
//! 1. [`seeder`]: adjacent indexed reads and chained indexed writes
//!    become 2-lane seed packs.
//! 2. [`extender`]: the set grows along use-def and def-use chains,
//!    subject to isomorphism and independence.
//! 3. [`merging`]: packs sharing a boundary lane concatenate into
//!    longer runs.
//! 4. [`dag`]: the final packs become graph nodes with per-lane,
//!    per-operand producer edges, the contract handed to code
//!    generation.
//!
//! Everything is created fresh per block and dropped with the result;
//! nothing persists between blocks.

pub mod dag;
pub mod extender;
pub mod merging;
pub mod pack;
pub mod pack_set;
pub mod seeder;

pub use dag::{NodeRef, PackDag, PackDagNode, ProducerInfo};
pub use extender::PacksetExtender;
pub use merging::merge_packs;
pub use pack::{Pack, PackType};
pub use pack_set::PackSet;
pub use seeder::PackSeeder;

use rustc_hash::FxHashMap;

use crate::core::{DependenceOracle, InstId, IrAdaptor, SlpResult};

/// Outcome of analyzing one basic block: the merged pack set and the
/// pack DAG built from it.
pub struct SlpBlockResult<I: InstId> {
    pub packs: PackSet<I>,
    pub dag: PackDag<I>,
}

/// Drives the pipeline over basic blocks of the adaptor's current
/// function.
pub struct SlpAnalyzer<'a, A: IrAdaptor> {
    adaptor: &'a A,
    oracle: Option<&'a dyn DependenceOracle<InstRef = A::InstRef>>,
}

impl<'a, A: IrAdaptor> SlpAnalyzer<'a, A> {
    /// Analyzer without a dependence oracle: only read seeds can form,
    /// and the extender refuses every pair.
    pub fn new(adaptor: &'a A) -> Self {
        Self {
            adaptor,
            oracle: None,
        }
    }

    pub fn with_oracle(
        adaptor: &'a A,
        oracle: &'a dyn DependenceOracle<InstRef = A::InstRef>,
    ) -> Self {
        Self {
            adaptor,
            oracle: Some(oracle),
        }
    }

    /// Run seed, extend, merge and DAG construction over one block.
    ///
    /// A block with nothing packable yields an empty pack set and an
    /// empty DAG; that is the expected outcome for most blocks.
    pub fn analyze_block(&self, block: A::BlockRef) -> SlpResult<SlpBlockResult<A::InstRef>> {
        let mut seeder = PackSeeder::new(self.adaptor, self.oracle);
        seeder.visit_block(block);
        let mut packs = seeder.create_seeded_pack_set();
        log::debug!("seeded pack set: {}", packs.dbg_string(self.adaptor));

        {
            let mut extender =
                PacksetExtender::new(self.adaptor, block, &mut packs, self.oracle);
            extender.extend();
        }
        log::debug!("extended pack set: {}", packs.dbg_string(self.adaptor));

        let packs = merge_packs(packs);
        log::debug!("merged pack set: {}", packs.dbg_string(self.adaptor));

        // The builder expects producers before consumers. Defs precede
        // uses in a straight-line block, so ordering packs by the block
        // position of their first lane realizes that.
        let position: FxHashMap<A::InstRef, usize> = self
            .adaptor
            .block_insts(block)
            .enumerate()
            .map(|(idx, inst)| (inst, idx))
            .collect();
        let mut ordered: Vec<Pack<A::InstRef>> = packs.iter().cloned().collect();
        ordered.sort_by_key(|pack| position.get(&pack.first()).copied().unwrap_or(usize::MAX));

        let mut dag = PackDag::new();
        for pack in ordered {
            dag.add_node(pack, self.adaptor)?;
        }

        Ok(SlpBlockResult { packs, dag })
    }
}
