//! Stereochemistry on molecular graphs.
//!
//! - [`priority`]: comparable branch descriptors used to rank neighbors.
//! - [`assignment`]: detection of stereogenic atoms and bonds, and
//!   enumeration of every stereo assignment.
//! - [`parity`]: conversion between absolute and index-based parities.

pub mod assignment;
pub mod parity;
pub mod priority;

pub use assignment::{
    atom_stereo_keys, bond_stereo_keys, has_stereo, sp2_bond_keys, stereogenic_atom_keys,
    stereogenic_bond_keys, stereomers, substereomers,
};
pub use parity::{from_index_based_stereo, to_index_based_stereo};
pub use priority::{
    PriorityVector, atom_stereo_sorted_neighbor_keys, atoms_stereo_sorted_neighbor_keys,
    priority_vector,
};
