use crate::core::models::graph::{Atom, Bond, MolecularGraph};
use crate::core::utils::elements::is_hydrogen;
use std::collections::BTreeSet;

impl MolecularGraph {
    /// Hydrogen atoms that stand in for an implicit hydrogen count.
    ///
    /// A hydrogen qualifies when it carries no hydrogens of its own and has
    /// exactly one neighbor, which is not itself a hydrogen. Hydrogens in H2 or
    /// bridging positions are part of the backbone instead.
    pub fn explicit_hydrogen_keys(&self) -> BTreeSet<usize> {
        let neighbors = self.neighbors_map();
        self.atoms()
            .iter()
            .filter(|(key, atom)| {
                if !is_hydrogen(&atom.symbol) || atom.implicit_hydrogens != 0 {
                    return false;
                }
                let ngbs = &neighbors[*key];
                ngbs.len() == 1
                    && ngbs
                        .iter()
                        .all(|n| self.atom(*n).is_some_and(|a| !is_hydrogen(&a.symbol)))
            })
            .map(|(&key, _)| key)
            .collect()
    }

    /// Every atom that is not an explicit hydrogen.
    pub fn backbone_keys(&self) -> BTreeSet<usize> {
        let explicit = self.explicit_hydrogen_keys();
        self.atoms()
            .keys()
            .filter(|k| !explicit.contains(k))
            .copied()
            .collect()
    }

    /// Whether every hydrogen is represented as an atom.
    pub fn is_explicit(&self) -> bool {
        self.atoms().values().all(|a| a.implicit_hydrogens == 0)
    }

    /// Folds explicit hydrogens into their neighbors' implicit counts.
    pub fn implicit(&self) -> Self {
        let explicit = self.explicit_hydrogen_keys();
        if explicit.is_empty() {
            return self.clone();
        }
        let mut graph = self.without_atoms(&explicit);
        for &h_key in &explicit {
            for parent in self.neighbors(h_key) {
                if let Some(atom) = graph.atom_mut(parent) {
                    atom.implicit_hydrogens += 1;
                }
            }
        }
        graph
    }

    /// Expands implicit hydrogen counts into hydrogen atoms.
    ///
    /// New hydrogens take keys after the current maximum key, assigned in
    /// ascending order of their parent atom keys.
    pub fn explicit(&self) -> Self {
        if self.is_explicit() {
            return self.clone();
        }
        let mut graph = self.clone();
        let mut next_key = self.max_atom_key().map_or(0, |k| k + 1);
        for (&parent, atom) in self.atoms() {
            for _ in 0..atom.implicit_hydrogens {
                // The key is fresh and the parent exists, so neither insert can fail.
                let _ = graph.add_atom(next_key, Atom::new("H", 0));
                let _ = graph.add_bond(parent, next_key, Bond::new(1));
                next_key += 1;
            }
            if let Some(parent_atom) = graph.atom_mut(parent) {
                parent_atom.implicit_hydrogens = 0;
            }
        }
        graph
    }
}
