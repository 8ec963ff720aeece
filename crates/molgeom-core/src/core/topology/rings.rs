use crate::core::models::graph::{BondKey, MolecularGraph};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// The smallest rings of the graph, as cyclic sequences of atom keys.
///
/// For every bond, the shortest cycle through it is found by a breadth-first
/// search that avoids the bond itself. Each distinct cycle is reported once,
/// rotated to start at its smallest key, and the result is sorted by size.
pub fn rings(graph: &MolecularGraph) -> Vec<Vec<usize>> {
    let neighbors = graph.neighbors_map();
    let mut found: BTreeSet<Vec<usize>> = BTreeSet::new();

    for key in graph.bonds().keys() {
        let (a, b) = key.atoms();
        if let Some(path) = shortest_path_avoiding(&neighbors, a, b) {
            found.insert(normalize_ring(path));
        }
    }

    let mut rings: Vec<Vec<usize>> = found.into_iter().collect();
    rings.sort_by_key(Vec::len);
    rings
}

/// Bond keys of each ring returned by [`rings`].
pub fn rings_bond_keys(graph: &MolecularGraph) -> Vec<BTreeSet<BondKey>> {
    rings(graph).iter().map(|ring| ring_bond_keys(ring)).collect()
}

/// Bonds belonging to any ring with fewer than `size` atoms.
pub fn bonds_in_rings_smaller_than(graph: &MolecularGraph, size: usize) -> BTreeSet<BondKey> {
    rings(graph)
        .iter()
        .filter(|ring| ring.len() < size)
        .flat_map(|ring| ring_bond_keys(ring))
        .collect()
}

fn ring_bond_keys(ring: &[usize]) -> BTreeSet<BondKey> {
    ring.iter()
        .zip(ring.iter().cycle().skip(1))
        .map(|(&a, &b)| BondKey::new(a, b))
        .collect()
}

fn shortest_path_avoiding(
    neighbors: &BTreeMap<usize, BTreeSet<usize>>,
    start: usize,
    goal: usize,
) -> Option<Vec<usize>> {
    let mut parents: BTreeMap<usize, usize> = BTreeMap::new();
    let mut queue = VecDeque::from([start]);
    let mut visited = BTreeSet::from([start]);

    while let Some(current) = queue.pop_front() {
        for &next in neighbors.get(&current).into_iter().flatten() {
            if current == start && next == goal {
                continue;
            }
            if !visited.insert(next) {
                continue;
            }
            parents.insert(next, current);
            if next == goal {
                let mut path = vec![goal];
                let mut node = goal;
                while let Some(&parent) = parents.get(&node) {
                    path.push(parent);
                    node = parent;
                }
                path.reverse();
                return Some(path);
            }
            queue.push_back(next);
        }
    }
    None
}

fn normalize_ring(mut ring: Vec<usize>) -> Vec<usize> {
    if let Some(min_pos) = ring.iter().enumerate().min_by_key(|&(_, k)| k).map(|(i, _)| i) {
        ring.rotate_left(min_pos);
    }
    if ring.len() > 2 && ring[ring.len() - 1] < ring[1] {
        ring[1..].reverse();
    }
    ring
}
