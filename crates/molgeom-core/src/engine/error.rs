use std::collections::BTreeSet;
use thiserror::Error;

use super::config::ConfigError;
use crate::core::models::graph::{BondKey, GraphError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Line search failed: {reason}")]
    LineSearch { reason: String },

    #[error("Shape mismatch for {what}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Volume constraint {idxs:?} references atoms beyond the {atoms} available")]
    ConstraintIndex { idxs: [usize; 4], atoms: usize },

    #[error("Unsupported finite-difference stencil of {points} points")]
    UnsupportedStencil { points: usize },

    #[error("Atom {0} is not in the graph")]
    UnknownAtom(usize),

    #[error("Atoms {atom} and {neighbor} are not bonded")]
    NotBonded { atom: usize, neighbor: usize },

    #[error("Graph has implicit hydrogens; an explicit graph is required")]
    NotExplicit,

    #[error("Unexpected topology at atom {atom}: {reason}")]
    Topology { atom: usize, reason: String },

    #[error(
        "Index-based to absolute stereo conversion failed: resolved atoms {resolved_atoms:?} and bonds {resolved_bonds:?}, expected atoms {expected_atoms:?} and bonds {expected_bonds:?}"
    )]
    StereoConversion {
        expected_atoms: BTreeSet<usize>,
        resolved_atoms: BTreeSet<usize>,
        expected_bonds: BTreeSet<BondKey>,
        resolved_bonds: BTreeSet<BondKey>,
    },

    #[error("Invalid graph: {source}")]
    Graph {
        #[from]
        source: GraphError,
    },

    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },
}
