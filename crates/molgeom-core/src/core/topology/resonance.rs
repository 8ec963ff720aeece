use crate::core::models::graph::{BondKey, MolecularGraph};
use crate::core::utils::elements::valence;
use std::collections::{BTreeMap, BTreeSet};

const MAX_BOND_ORDER: u8 = 3;

/// Valence left over on each atom after its bonds and implicit hydrogens.
///
/// Elements without a tabulated valence are treated as saturated.
pub fn atom_unsaturated_valences(graph: &MolecularGraph) -> BTreeMap<usize, u8> {
    let bond_valences = graph.atom_bond_valences();
    graph
        .atoms()
        .iter()
        .map(|(&key, atom)| {
            let used = bond_valences.get(&key).copied().unwrap_or(0);
            let free = valence(&atom.symbol)
                .map(|v| u32::from(v).saturating_sub(used))
                .unwrap_or(0);
            (key, u8::try_from(free).unwrap_or(u8::MAX))
        })
        .collect()
}

/// All bond-order assignments that place the maximum number of pi bonds.
///
/// Starting from the graph's current bond orders, extra bond order is
/// distributed over bonds whose ends both have free valence. Structures that
/// saturate the most valence dominate; every dominant structure is returned as
/// a full bond-order table.
pub fn dominant_resonances(graph: &MolecularGraph) -> Vec<BTreeMap<BondKey, u8>> {
    let base: BTreeMap<BondKey, u8> = graph.bonds().iter().map(|(&k, b)| (k, b.order)).collect();
    let mut remaining = atom_unsaturated_valences(graph);
    let candidates: Vec<BondKey> = graph
        .bonds()
        .iter()
        .filter(|(key, bond)| {
            let (a, b) = key.atoms();
            bond.order < MAX_BOND_ORDER && remaining[&a] > 0 && remaining[&b] > 0
        })
        .map(|(&key, _)| key)
        .collect();

    let mut search = ResonanceSearch {
        base: &base,
        candidates: &candidates,
        extra: vec![0; candidates.len()],
        best_total: 0,
        best: Vec::new(),
    };
    search.explore(0, 0, &mut remaining);

    search
        .best
        .into_iter()
        .map(|extra| {
            let mut orders = base.clone();
            for (key, add) in candidates.iter().zip(extra) {
                if let Some(order) = orders.get_mut(key) {
                    *order += add;
                }
            }
            orders
        })
        .collect()
}

struct ResonanceSearch<'a> {
    base: &'a BTreeMap<BondKey, u8>,
    candidates: &'a [BondKey],
    extra: Vec<u8>,
    best_total: u32,
    best: Vec<Vec<u8>>,
}

impl ResonanceSearch<'_> {
    fn explore(&mut self, idx: usize, total: u32, remaining: &mut BTreeMap<usize, u8>) {
        let bound = total + remaining_pairs_bound(&self.candidates[idx..], remaining);
        if bound < self.best_total {
            return;
        }
        if idx == self.candidates.len() {
            if total > self.best_total {
                self.best_total = total;
                self.best.clear();
            }
            if total == self.best_total {
                self.best.push(self.extra.clone());
            }
            return;
        }

        let key = self.candidates[idx];
        let (a, b) = key.atoms();
        let headroom = MAX_BOND_ORDER - self.base[&key];
        let max_add = remaining[&a].min(remaining[&b]).min(headroom);

        for add in (0..=max_add).rev() {
            shift(remaining, [a, b], |free| free - add);
            self.extra[idx] = add;
            self.explore(idx + 1, total + u32::from(add), remaining);
            shift(remaining, [a, b], |free| free + add);
        }
        self.extra[idx] = 0;
    }
}

fn shift(remaining: &mut BTreeMap<usize, u8>, keys: [usize; 2], op: impl Fn(u8) -> u8) {
    for key in keys {
        if let Some(free) = remaining.get_mut(&key) {
            *free = op(*free);
        }
    }
}

/// Upper bound on the pi order still placeable among the remaining candidates.
fn remaining_pairs_bound(candidates: &[BondKey], remaining: &BTreeMap<usize, u8>) -> u32 {
    let atoms: BTreeSet<usize> = candidates
        .iter()
        .flat_map(|key| {
            let (a, b) = key.atoms();
            [a, b]
        })
        .collect();
    let free: u32 = atoms.iter().map(|k| u32::from(remaining[k])).sum();
    free / 2
}

/// For every bond, the set of orders it takes across dominant resonances.
pub fn resonance_dominant_bond_orders(graph: &MolecularGraph) -> BTreeMap<BondKey, BTreeSet<u8>> {
    let mut orders: BTreeMap<BondKey, BTreeSet<u8>> =
        graph.bonds().keys().map(|&k| (k, BTreeSet::new())).collect();
    for structure in dominant_resonances(graph) {
        for (key, order) in structure {
            orders.entry(key).or_default().insert(order);
        }
    }
    orders
}

/// For every atom, its lowest hybridization across dominant resonances.
///
/// Hybridization is `3 - n` for an atom carrying `n` units of pi bond order,
/// never less than 1 for an atom with neighbors. Isolated atoms report 0.
pub fn resonance_dominant_atom_hybridizations(graph: &MolecularGraph) -> BTreeMap<usize, u8> {
    let neighbors = graph.neighbors_map();
    let structures = dominant_resonances(graph);

    graph
        .atoms()
        .keys()
        .map(|&key| {
            let ngbs = &neighbors[&key];
            if ngbs.is_empty() {
                return (key, 0);
            }
            let hyb = structures
                .iter()
                .map(|orders| {
                    let pi: u8 = ngbs
                        .iter()
                        .map(|&n| orders[&BondKey::new(key, n)].saturating_sub(1))
                        .sum();
                    3u8.saturating_sub(pi).max(1)
                })
                .min()
                .unwrap_or(3);
            (key, hyb)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::graph::{Atom, Bond};

    fn graph(atoms: &[(&str, u8)], bonds: &[(usize, usize)]) -> MolecularGraph {
        MolecularGraph::from_parts(
            atoms
                .iter()
                .enumerate()
                .map(|(k, &(sym, h))| (k, Atom::new(sym, h))),
            bonds.iter().map(|&(a, b)| (BondKey::new(a, b), Bond::new(1))),
        )
        .unwrap()
    }

    #[test]
    fn ethene_has_a_double_bond() {
        let ethene = graph(&[("C", 2), ("C", 2)], &[(0, 1)]);
        let orders = resonance_dominant_bond_orders(&ethene);
        assert_eq!(orders[&BondKey::new(0, 1)], BTreeSet::from([2]));
        let hybs = resonance_dominant_atom_hybridizations(&ethene);
        assert_eq!(hybs[&0], 2);
        assert_eq!(hybs[&1], 2);
    }

    #[test]
    fn ethane_stays_single_bonded_and_sp3() {
        let ethane = graph(&[("C", 3), ("C", 3)], &[(0, 1)]);
        let orders = resonance_dominant_bond_orders(&ethane);
        assert_eq!(orders[&BondKey::new(0, 1)], BTreeSet::from([1]));
        assert_eq!(resonance_dominant_atom_hybridizations(&ethane)[&0], 3);
    }

    #[test]
    fn allyl_radical_has_two_dominant_structures() {
        let allyl = graph(&[("C", 2), ("C", 1), ("C", 2)], &[(0, 1), (1, 2)]);
        assert_eq!(dominant_resonances(&allyl).len(), 2);
        let orders = resonance_dominant_bond_orders(&allyl);
        assert_eq!(orders[&BondKey::new(0, 1)], BTreeSet::from([1, 2]));
        assert_eq!(orders[&BondKey::new(1, 2)], BTreeSet::from([1, 2]));
    }

    #[test]
    fn allene_center_is_sp() {
        let allene = graph(&[("C", 2), ("C", 0), ("C", 2)], &[(0, 1), (1, 2)]);
        let hybs = resonance_dominant_atom_hybridizations(&allene);
        assert_eq!(hybs[&0], 2);
        assert_eq!(hybs[&1], 1);
        assert_eq!(hybs[&2], 2);
    }

    #[test]
    fn acetylene_is_triple_bonded() {
        let acetylene = graph(&[("C", 1), ("C", 1)], &[(0, 1)]);
        let orders = resonance_dominant_bond_orders(&acetylene);
        assert_eq!(orders[&BondKey::new(0, 1)], BTreeSet::from([3]));
        assert_eq!(resonance_dominant_atom_hybridizations(&acetylene)[&0], 1);
    }

    #[test]
    fn unsaturated_valences_account_for_implicit_hydrogens() {
        let formaldehyde = graph(&[("C", 2), ("O", 0)], &[(0, 1)]);
        let unsat = atom_unsaturated_valences(&formaldehyde);
        assert_eq!(unsat[&0], 1);
        assert_eq!(unsat[&1], 1);
    }
}
