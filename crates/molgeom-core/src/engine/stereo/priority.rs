//! Priority vectors rank the branches hanging off a stereo center.
//!
//! A branch is described by walking the implicit-hydrogen graph depth first
//! away from the center. Every step records the bond taken and the atom
//! reached, then the sub-branches of that atom in ascending key order. Two
//! branches are compared by the derived lexicographic order of their vectors.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::models::graph::{BondKey, MolecularGraph};
use crate::engine::error::EngineError;

/// Bond order and stereo parity of the bond entering a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BondDescriptor {
    pub order: u8,
    pub parity: Option<bool>,
}

/// Element, implicit hydrogen count and stereo parity of a branch atom.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AtomDescriptor {
    pub symbol: String,
    pub implicit_hydrogens: u8,
    pub parity: Option<bool>,
}

/// The comparable description of one branch.
///
/// Variant and field order define the ranking: an explicit hydrogen
/// (`Empty`) ranks lowest, a ring closure (`atom: None`) ranks below the same
/// bond leading to a fresh atom, and a shorter list of sub-branches ranks
/// below a longer one with the same prefix. `None` parities rank below
/// assigned ones.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PriorityVector {
    Empty,
    Branch {
        bond: BondDescriptor,
        atom: Option<(AtomDescriptor, Vec<PriorityVector>)>,
    },
}

/// Lookup tables shared by every priority vector computed on one graph.
///
/// Building the implicit graph and the explicit hydrogen set once lets callers
/// rank all neighbors of all candidate atoms without repeating that work.
#[derive(Debug, Clone)]
pub struct PriorityContext<'a> {
    graph: &'a MolecularGraph,
    explicit_hydrogens: BTreeSet<usize>,
    implicit: MolecularGraph,
    neighbors: BTreeMap<usize, BTreeSet<usize>>,
}

impl<'a> PriorityContext<'a> {
    pub fn new(graph: &'a MolecularGraph) -> Self {
        let implicit = graph.implicit();
        let neighbors = implicit.neighbors_map();
        Self {
            graph,
            explicit_hydrogens: graph.explicit_hydrogen_keys(),
            implicit,
            neighbors,
        }
    }

    pub fn graph(&self) -> &MolecularGraph {
        self.graph
    }

    /// The priority vector of the branch from `atom` through `neighbor`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownAtom`] if either key is missing,
    /// [`EngineError::NotBonded`] if the atoms share no bond, and
    /// [`EngineError::Topology`] if `atom` is itself an explicit hydrogen.
    pub fn priority_vector(&self, atom: usize, neighbor: usize) -> Result<PriorityVector, EngineError> {
        for key in [atom, neighbor] {
            if !self.graph.contains_atom(key) {
                return Err(EngineError::UnknownAtom(key));
            }
        }
        if !self.graph.contains_bond(atom, neighbor) {
            return Err(EngineError::NotBonded { atom, neighbor });
        }
        if self.explicit_hydrogens.contains(&neighbor) {
            return Ok(PriorityVector::Empty);
        }
        if self.explicit_hydrogens.contains(&atom) {
            return Err(EngineError::Topology {
                atom,
                reason: "priorities are only defined from backbone atoms".to_string(),
            });
        }

        let (vector, _) = self.branch(atom, neighbor, BTreeSet::new())?;
        Ok(vector)
    }

    /// Walks one step into `to`, returning its vector and the visited set as
    /// it stands after the whole sub-tree.
    fn branch(
        &self,
        from: usize,
        to: usize,
        mut seen: BTreeSet<usize>,
    ) -> Result<(PriorityVector, BTreeSet<usize>), EngineError> {
        let bond = self
            .implicit
            .bond(from, to)
            .ok_or(EngineError::NotBonded {
                atom: from,
                neighbor: to,
            })?;
        let bond = BondDescriptor {
            order: bond.order,
            parity: bond.stereo_parity,
        };

        if seen.contains(&to) {
            return Ok((PriorityVector::Branch { bond, atom: None }, seen));
        }
        seen.insert(from);
        seen.insert(to);

        let atom = self.implicit.atom(to).ok_or(EngineError::UnknownAtom(to))?;
        let descriptor = AtomDescriptor {
            symbol: atom.symbol.clone(),
            implicit_hydrogens: atom.implicit_hydrogens,
            parity: atom.stereo_parity,
        };

        let mut sub_branches = Vec::new();
        if let Some(next_keys) = self.neighbors.get(&to) {
            for &next in next_keys.iter().filter(|&&k| k != from) {
                let (vector, after) = self.branch(to, next, seen)?;
                seen = after;
                sub_branches.push(vector);
            }
        }

        Ok((
            PriorityVector::Branch {
                bond,
                atom: Some((descriptor, sub_branches)),
            },
            seen,
        ))
    }

    /// `keys` sorted by ascending priority as seen from `atom`; ties keep
    /// ascending key order.
    pub fn sorted_neighbor_keys(
        &self,
        atom: usize,
        keys: &BTreeSet<usize>,
    ) -> Result<Vec<usize>, EngineError> {
        let mut ranked = keys
            .iter()
            .map(|&key| Ok((self.priority_vector(atom, key)?, key)))
            .collect::<Result<Vec<_>, EngineError>>()?;
        ranked.sort();
        Ok(ranked.into_iter().map(|(_, key)| key).collect())
    }
}

/// The priority vector of the branch from `atom` through `neighbor`.
///
/// See [`PriorityContext::priority_vector`] for the errors returned.
pub fn priority_vector(
    graph: &MolecularGraph,
    atom: usize,
    neighbor: usize,
) -> Result<PriorityVector, EngineError> {
    PriorityContext::new(graph).priority_vector(atom, neighbor)
}

/// The neighbors of `atom` in `keys`, sorted by ascending priority.
pub fn atom_stereo_sorted_neighbor_keys(
    graph: &MolecularGraph,
    atom: usize,
    keys: &BTreeSet<usize>,
) -> Result<Vec<usize>, EngineError> {
    PriorityContext::new(graph).sorted_neighbor_keys(atom, keys)
}

/// Priority-sorted neighbors for every atom that carries stereo information.
///
/// Atoms with a parity are listed with all their neighbors. Each end of a bond
/// with a parity is listed with its neighbors other than the opposite end.
pub fn atoms_stereo_sorted_neighbor_keys(
    graph: &MolecularGraph,
) -> Result<BTreeMap<usize, Vec<usize>>, EngineError> {
    let ctx = PriorityContext::new(graph);
    let neighbors = graph.neighbors_map();
    let mut sorted = BTreeMap::new();

    for (&key, atom) in graph.atoms() {
        if atom.stereo_parity.is_some() {
            sorted.insert(key, ctx.sorted_neighbor_keys(key, &neighbors[&key])?);
        }
    }
    for (&bond_key, bond) in graph.bonds() {
        if bond.stereo_parity.is_some() {
            let (a, b) = bond_key.atoms();
            sorted.insert(a, ctx.sorted_neighbor_keys(a, &off_bond_neighbors(&neighbors, bond_key, a))?);
            sorted.insert(b, ctx.sorted_neighbor_keys(b, &off_bond_neighbors(&neighbors, bond_key, b))?);
        }
    }
    Ok(sorted)
}

/// Neighbors of one end of a bond, excluding the other end.
pub(crate) fn off_bond_neighbors(
    neighbors: &BTreeMap<usize, BTreeSet<usize>>,
    bond: BondKey,
    end: usize,
) -> BTreeSet<usize> {
    let partner = bond.partner(end);
    neighbors
        .get(&end)
        .map(|keys| keys.iter().copied().filter(|&k| Some(k) != partner).collect())
        .unwrap_or_default()
}
