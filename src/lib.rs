//! slpvec - SLP pack analysis over a collection-aware SSA IR.
//!
//! Given one straight-line basic block, the analysis discovers groups of
//! scalar operations ("packs") that can fuse into one SIMD-width
//! operation: adjacent indexed collection accesses seed 2-lane packs,
//! the pack set grows along data-flow chains, chains of packs merge into
//! longer runs, and the result materializes as a DAG whose edges record,
//! per lane and per operand, which pack produces each value. The DAG is
//! the contract handed to a later code-generation step.
//!
//! The analysis is generic over the IR: implement
//! [`core::IrAdaptor`] for your IR (and [`core::DependenceOracle`] over
//! your program dependence graph) and drive [`slp::SlpAnalyzer`] per
//! block.
//!
//! ```
//! use slpvec::slp::SlpAnalyzer;
//! use slpvec::test_ir::{TestDependenceOracle, TestIR, TestIrAdaptor};
//!
//! let ir = TestIR::parse(
//!     "f(%s) {\n\
//!      entry:\n\
//!          %a = read %s[0]\n\
//!          %b = read %s[1]\n\
//!      }\n",
//! )
//! .unwrap();
//! let adaptor = TestIrAdaptor::new(&ir);
//! let oracle = TestDependenceOracle::from_function(&ir, adaptor.cur_func());
//!
//! let analyzer = SlpAnalyzer::with_oracle(&adaptor, &oracle);
//! let result = analyzer.analyze_block(adaptor.entry_block()).unwrap();
//! assert_eq!(result.dag.len(), 1);
//! ```
//!
//! # Architecture
//!
//! - [`core`] - IR adaptor trait, dependence oracle, error types
//! - [`slp`] - the four-stage pipeline (seed, extend, merge, DAG)
//! - [`test_ir`] - textual collection IR backing the test suite

pub mod core;
pub mod slp;
pub mod test_ir;

pub use crate::core::{
    AccessClass, DependenceKind, DependenceOracle, InstId, IrAdaptor, ScalarOp, SlpError,
    SlpResult,
};
pub use crate::slp::{
    merge_packs, Pack, PackDag, PackDagNode, PackSeeder, PackSet, PackType, PacksetExtender,
    SlpAnalyzer, SlpBlockResult,
};
