//! Conversion between absolute and index-based stereo parities.
//!
//! Absolute parities are defined relative to neighbor priority order, while
//! index-based parities are defined relative to ascending neighbor key order.
//! Index-based parities depend only on the atom numbering, so they can be read
//! off a geometry without ranking branches first.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, instrument};

use super::assignment::{
    atom_stereo_keys, bond_stereo_keys, has_stereo, stereogenic_atom_keys, stereogenic_bond_keys,
};
use super::priority::{PriorityContext, off_bond_neighbors};
use crate::core::models::graph::{BondKey, MolecularGraph};
use crate::core::utils::permutation::is_even_permutation;
use crate::engine::error::EngineError;

/// Index-based parities may depend on centers resolved in earlier passes.
pub const MAX_RESOLUTION_PASSES: usize = 10;

fn require_explicit(graph: &MolecularGraph) -> Result<(), EngineError> {
    if graph.is_explicit() {
        Ok(())
    } else {
        Err(EngineError::NotExplicit)
    }
}

/// Whether the parity of `atom` changes between the two conventions.
fn atom_parity_flips(ctx: &PriorityContext<'_>, atom: usize) -> Result<bool, EngineError> {
    let neighbors = ctx.graph().neighbors(atom);
    let by_priority = ctx.sorted_neighbor_keys(atom, &neighbors)?;
    let by_index: Vec<usize> = neighbors.into_iter().collect();
    let even = is_even_permutation(&by_index, &by_priority).ok_or_else(|| EngineError::Topology {
        atom,
        reason: "priority order is not a permutation of the neighbors".to_string(),
    })?;
    Ok(!even)
}

/// Whether the parity of `bond` changes between the two conventions.
///
/// Each end compares its lowest-priority neighbor to its lowest-key neighbor;
/// the parity flips when exactly one end disagrees.
fn bond_parity_flips(
    ctx: &PriorityContext<'_>,
    neighbors: &BTreeMap<usize, BTreeSet<usize>>,
    bond: BondKey,
) -> Result<bool, EngineError> {
    let (a, b) = bond.atoms();
    let end_disagrees = |end: usize| -> Result<bool, EngineError> {
        let others = off_bond_neighbors(neighbors, bond, end);
        let lowest_index = others.first().copied();
        let by_priority = ctx.sorted_neighbor_keys(end, &others)?;
        match (by_priority.first(), lowest_index) {
            (Some(&lowest_priority), Some(lowest_index)) => Ok(lowest_priority != lowest_index),
            _ => Err(EngineError::Topology {
                atom: end,
                reason: format!("stereo bond {bond} has no substituents at this end"),
            }),
        }
    };
    Ok(end_disagrees(a)? != end_disagrees(b)?)
}

/// Rewrites absolute parities as index-based parities.
///
/// # Errors
///
/// Returns [`EngineError::NotExplicit`] if the graph has implicit hydrogens.
#[instrument(skip_all, name = "to_index_based_stereo")]
pub fn to_index_based_stereo(graph: &MolecularGraph) -> Result<MolecularGraph, EngineError> {
    require_explicit(graph)?;
    let ctx = PriorityContext::new(graph);
    let neighbors = graph.neighbors_map();

    let mut atom_parities = BTreeMap::new();
    for (&key, atom) in graph.atoms() {
        if let Some(parity) = atom.stereo_parity {
            atom_parities.insert(key, parity ^ atom_parity_flips(&ctx, key)?);
        }
    }
    let mut bond_parities = BTreeMap::new();
    for (&key, bond) in graph.bonds() {
        if let Some(parity) = bond.stereo_parity {
            bond_parities.insert(key, parity ^ bond_parity_flips(&ctx, &neighbors, key)?);
        }
    }

    Ok(graph
        .with_atom_stereo_parities(&atom_parities)?
        .with_bond_stereo_parities(&bond_parities)?)
}

/// Rewrites index-based parities as absolute parities.
///
/// Priorities can depend on the absolute parities of other centers, so
/// conversion proceeds in passes: each pass converts the centers that are
/// stereogenic given everything resolved so far.
///
/// # Errors
///
/// Returns [`EngineError::NotExplicit`] if the graph has implicit hydrogens,
/// and [`EngineError::StereoConversion`] if some parities are still
/// unresolved after [`MAX_RESOLUTION_PASSES`] passes.
#[instrument(skip_all, name = "from_index_based_stereo")]
pub fn from_index_based_stereo(graph: &MolecularGraph) -> Result<MolecularGraph, EngineError> {
    require_explicit(graph)?;
    let mut resolved = graph.without_stereo_parities();
    if !has_stereo(graph) {
        return Ok(resolved);
    }

    let expected_atoms = atom_stereo_keys(graph);
    let expected_bonds = bond_stereo_keys(graph);
    let neighbors = graph.neighbors_map();

    for pass in 0..MAX_RESOLUTION_PASSES {
        let atom_keys: BTreeSet<usize> = stereogenic_atom_keys(&resolved)?
            .intersection(&expected_atoms)
            .copied()
            .collect();
        let bond_keys: BTreeSet<BondKey> = stereogenic_bond_keys(&resolved)?
            .intersection(&expected_bonds)
            .copied()
            .collect();

        let ctx = PriorityContext::new(&resolved);
        let mut atom_parities = BTreeMap::new();
        for &key in &atom_keys {
            if let Some(parity) = graph.atom(key).and_then(|a| a.stereo_parity) {
                atom_parities.insert(key, parity ^ atom_parity_flips(&ctx, key)?);
            }
        }
        let mut bond_parities = BTreeMap::new();
        for &key in &bond_keys {
            let (a, b) = key.atoms();
            if let Some(parity) = graph.bond(a, b).and_then(|bond| bond.stereo_parity) {
                bond_parities.insert(key, parity ^ bond_parity_flips(&ctx, &neighbors, key)?);
            }
        }
        debug!(
            pass,
            atoms = atom_parities.len(),
            bonds = bond_parities.len(),
            "Resolved stereo centers"
        );

        resolved = resolved
            .with_atom_stereo_parities(&atom_parities)?
            .with_bond_stereo_parities(&bond_parities)?;

        if atom_stereo_keys(&resolved) == expected_atoms
            && bond_stereo_keys(&resolved) == expected_bonds
        {
            return Ok(resolved);
        }
    }

    Err(EngineError::StereoConversion {
        resolved_atoms: atom_stereo_keys(&resolved),
        resolved_bonds: bond_stereo_keys(&resolved),
        expected_atoms,
        expected_bonds,
    })
}
