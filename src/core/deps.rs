//! Dependence oracle interface.
//!
//! The surrounding compiler owns the program dependence graph; the
//! analysis only asks directional yes/no questions about it. Packing two
//! instructions requires that no edge of any kind runs between them in
//! either direction.

use super::adaptor::InstId;

/// Kinds of dependence edges in the enclosing function's PDG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependenceKind {
    Data,
    Control,
    Memory,
}

impl DependenceKind {
    pub const ALL: [DependenceKind; 3] = [
        DependenceKind::Data,
        DependenceKind::Control,
        DependenceKind::Memory,
    ];
}

/// Query service over the program dependence graph.
///
/// Self-edges (`from == to`) are not meaningful to the analysis and are
/// never queried.
pub trait DependenceOracle {
    type InstRef: InstId;

    /// Whether a dependence edge of `kind` runs from `from` to `to`.
    fn has_edge_of_kind(
        &self,
        from: Self::InstRef,
        to: Self::InstRef,
        kind: DependenceKind,
    ) -> bool;

    /// Whether any dependence edge runs from `from` to `to`.
    fn has_edge(&self, from: Self::InstRef, to: Self::InstRef) -> bool {
        DependenceKind::ALL
            .iter()
            .any(|&kind| self.has_edge_of_kind(from, to, kind))
    }
}
