//! # Core Models Module
//!
//! Value types describing molecules and reactions.
//!
//! - [`graph`] - Molecular graph with integer-keyed atoms, unordered-pair bonds and
//!   tri-state stereo parities on both
//! - [`reaction`] - Reaction-class taxonomy (reaction types, mechanism roles, spin
//!   designations)
//!
//! Graphs are treated as immutable values. Operations that assign parities or
//! change hydrogens return a new graph, and the derived total order on
//! [`graph::MolecularGraph`] serves as its canonical representation.
//!
//! ```ignore
//! use molgeom::core::models::graph::{Atom, Bond, BondKey, MolecularGraph};
//!
//! let ethene = MolecularGraph::from_parts(
//!     [(0, Atom::new("C", 2)), (1, Atom::new("C", 2))],
//!     [(BondKey::new(0, 1), Bond::new(2))],
//! )?;
//! ```

pub mod graph;
pub mod reaction;
