use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, instrument};

use super::priority::{PriorityContext, off_bond_neighbors};
use crate::core::models::graph::{BondKey, MolecularGraph};
use crate::core::topology::resonance::{
    resonance_dominant_atom_hybridizations, resonance_dominant_bond_orders,
};
use crate::core::topology::rings::bonds_in_rings_smaller_than;
use crate::engine::error::EngineError;

/// Rings with fewer atoms than this cannot hold a trans double bond.
const MIN_STEREO_RING_SIZE: usize = 8;

/// Whether any atom or bond carries a stereo parity.
pub fn has_stereo(graph: &MolecularGraph) -> bool {
    !atom_stereo_keys(graph).is_empty() || !bond_stereo_keys(graph).is_empty()
}

/// Atoms with an assigned parity.
pub fn atom_stereo_keys(graph: &MolecularGraph) -> BTreeSet<usize> {
    graph
        .atoms()
        .iter()
        .filter(|(_, atom)| atom.stereo_parity.is_some())
        .map(|(&key, _)| key)
        .collect()
}

/// Bonds with an assigned parity.
pub fn bond_stereo_keys(graph: &MolecularGraph) -> BTreeSet<BondKey> {
    graph
        .bonds()
        .iter()
        .filter(|(_, bond)| bond.stereo_parity.is_some())
        .map(|(&key, _)| key)
        .collect()
}

/// Bonds that are double in some resonance-dominant structure and join two
/// atoms of hybridization 2.
pub fn sp2_bond_keys(graph: &MolecularGraph) -> BTreeSet<BondKey> {
    let graph = graph.without_bond_orders();
    let orders = resonance_dominant_bond_orders(&graph);
    let hybridizations = resonance_dominant_atom_hybridizations(&graph);
    let is_sp2 = |key: &usize| hybridizations.get(key) == Some(&2);

    orders
        .into_iter()
        .filter(|(bond, orders)| {
            let (a, b) = bond.atoms();
            orders.contains(&2) && is_sp2(&a) && is_sp2(&b)
        })
        .map(|(bond, _)| bond)
        .collect()
}

/// Atoms that would become stereo centers if given a parity.
///
/// Candidates are unassigned atoms with four bonds in the explicit graph; a
/// candidate qualifies when its four branches all have different priorities.
pub fn stereogenic_atom_keys(graph: &MolecularGraph) -> Result<BTreeSet<usize>, EngineError> {
    let explicit = graph.without_bond_orders().explicit();
    let ctx = PriorityContext::new(&explicit);
    let neighbors = explicit.neighbors_map();
    let valences = explicit.atom_bond_valences();

    let mut keys = BTreeSet::new();
    for (&key, atom) in explicit.atoms() {
        if atom.stereo_parity.is_some() || valences.get(&key) != Some(&4) {
            continue;
        }
        let vectors = neighbors[&key]
            .iter()
            .map(|&n| ctx.priority_vector(key, n))
            .collect::<Result<BTreeSet<_>, _>>()?;
        if vectors.len() == neighbors[&key].len() {
            keys.insert(key);
        }
    }
    Ok(keys)
}

/// Bonds that would become stereo bonds if given a parity.
///
/// Candidates are unassigned sp2 bonds outside small rings. A candidate
/// qualifies when neither end carries two equivalent substituents.
///
/// # Errors
///
/// Returns [`EngineError::Topology`] if an end of a candidate bond has more
/// than two other neighbors.
pub fn stereogenic_bond_keys(graph: &MolecularGraph) -> Result<BTreeSet<BondKey>, EngineError> {
    let explicit = graph.without_bond_orders().explicit();
    let ctx = PriorityContext::new(&explicit);
    let neighbors = explicit.neighbors_map();

    let assigned = bond_stereo_keys(&explicit);
    let in_small_rings = bonds_in_rings_smaller_than(&explicit, MIN_STEREO_RING_SIZE);

    let mut keys = BTreeSet::new();
    for bond in sp2_bond_keys(&explicit) {
        if assigned.contains(&bond) || in_small_rings.contains(&bond) {
            continue;
        }
        let (a, b) = bond.atoms();
        if !is_symmetric_end(&ctx, &neighbors, bond, a)? && !is_symmetric_end(&ctx, &neighbors, bond, b)? {
            keys.insert(bond);
        }
    }
    Ok(keys)
}

fn is_symmetric_end(
    ctx: &PriorityContext<'_>,
    neighbors: &BTreeMap<usize, BTreeSet<usize>>,
    bond: BondKey,
    end: usize,
) -> Result<bool, EngineError> {
    let others: Vec<usize> = off_bond_neighbors(neighbors, bond, end).into_iter().collect();
    match others.as_slice() {
        [] => Ok(true),
        [_] => Ok(false),
        [first, second] => Ok(ctx.priority_vector(end, *first)? == ctx.priority_vector(end, *second)?),
        _ => Err(EngineError::Topology {
            atom: end,
            reason: format!(
                "double-bond end has {} substituents besides bond {bond}",
                others.len()
            ),
        }),
    }
}

/// Every parity assignment of `keys`, in lexicographic order with `false`
/// before `true`.
fn parity_assignments<K: Ord + Copy>(keys: &BTreeSet<K>) -> Vec<BTreeMap<K, bool>> {
    let mut assignments = vec![BTreeMap::new()];
    for &key in keys {
        assignments = assignments
            .into_iter()
            .flat_map(|assignment| {
                [false, true].map(|parity| {
                    let mut next = assignment.clone();
                    next.insert(key, parity);
                    next
                })
            })
            .collect();
    }
    assignments
}

fn expand_atom_stereo(graph: &MolecularGraph) -> Result<Vec<MolecularGraph>, EngineError> {
    let keys = stereogenic_atom_keys(graph)?;
    parity_assignments(&keys)
        .iter()
        .map(|parities| graph.with_atom_stereo_parities(parities).map_err(EngineError::from))
        .collect()
}

fn expand_bond_stereo(graph: &MolecularGraph) -> Result<Vec<MolecularGraph>, EngineError> {
    let keys = stereogenic_bond_keys(graph)?;
    parity_assignments(&keys)
        .iter()
        .map(|parities| graph.with_bond_stereo_parities(parities).map_err(EngineError::from))
        .collect()
}

/// All complete stereo assignments of `graph`, sorted and without duplicates.
///
/// Assigning some centers can make others stereogenic, so atom and bond
/// expansion repeat until the set of graphs stops changing. Existing parities
/// are discarded first.
#[instrument(skip_all, name = "stereomers", fields(atoms = graph.atom_count()))]
pub fn stereomers(graph: &MolecularGraph) -> Result<Vec<MolecularGraph>, EngineError> {
    let mut current = BTreeSet::from([graph.without_stereo_parities()]);
    let mut previous = BTreeSet::new();
    let mut rounds = 0;

    while current != previous {
        previous = current;
        current = BTreeSet::new();
        for candidate in &previous {
            for with_atoms in expand_atom_stereo(candidate)? {
                current.extend(expand_bond_stereo(&with_atoms)?);
            }
        }
        rounds += 1;
    }

    debug!("Found {} stereomers after {} rounds", current.len(), rounds);
    Ok(current.into_iter().collect())
}

/// The stereomers consistent with every parity already assigned in `graph`.
pub fn substereomers(graph: &MolecularGraph) -> Result<Vec<MolecularGraph>, EngineError> {
    let known_atoms: BTreeMap<usize, Option<bool>> = graph
        .atom_stereo_parities()
        .into_iter()
        .filter(|(_, parity)| parity.is_some())
        .collect();
    let known_bonds: BTreeMap<BondKey, Option<bool>> = graph
        .bond_stereo_parities()
        .into_iter()
        .filter(|(_, parity)| parity.is_some())
        .collect();

    Ok(stereomers(graph)?
        .into_iter()
        .filter(|candidate| {
            let atoms = candidate.atom_stereo_parities();
            let bonds = candidate.bond_stereo_parities();
            known_atoms.iter().all(|(key, parity)| atoms.get(key) == Some(parity))
                && known_bonds.iter().all(|(key, parity)| bonds.get(key) == Some(parity))
        })
        .collect())
}
