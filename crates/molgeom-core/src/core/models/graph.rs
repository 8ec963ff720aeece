use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

/// An atom of a molecular graph.
///
/// Hydrogens may be carried either implicitly, as a count on their heavy-atom
/// neighbor, or explicitly as atoms of their own.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Atom {
    /// The element symbol (e.g., "C", "Cl").
    pub symbol: String,
    /// Number of hydrogens attached to this atom but not represented as atoms.
    pub implicit_hydrogens: u8,
    /// Stereo parity, or `None` if unassigned.
    pub stereo_parity: Option<bool>,
}

impl Atom {
    pub fn new(symbol: &str, implicit_hydrogens: u8) -> Self {
        Self {
            symbol: symbol.to_string(),
            implicit_hydrogens,
            stereo_parity: None,
        }
    }

    pub fn with_parity(mut self, parity: Option<bool>) -> Self {
        self.stereo_parity = parity;
        self
    }
}

/// An unordered pair of atom keys identifying a bond.
///
/// The pair is normalized so that the smaller key comes first, which makes
/// `BondKey::new(a, b) == BondKey::new(b, a)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BondKey(usize, usize);

impl BondKey {
    pub fn new(a: usize, b: usize) -> Self {
        if a <= b { Self(a, b) } else { Self(b, a) }
    }

    /// The two atom keys in ascending order.
    pub fn atoms(&self) -> (usize, usize) {
        (self.0, self.1)
    }

    pub fn contains(&self, key: usize) -> bool {
        self.0 == key || self.1 == key
    }

    /// The atom across the bond from `key`, if `key` is one of its ends.
    pub fn partner(&self, key: usize) -> Option<usize> {
        if key == self.0 {
            Some(self.1)
        } else if key == self.1 {
            Some(self.0)
        } else {
            None
        }
    }
}

impl fmt::Display for BondKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.0, self.1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bond {
    pub order: u8,
    pub stereo_parity: Option<bool>,
}

impl Bond {
    pub fn new(order: u8) -> Self {
        Self {
            order,
            stereo_parity: None,
        }
    }

    pub fn with_parity(mut self, parity: Option<bool>) -> Self {
        self.stereo_parity = parity;
        self
    }
}

impl Default for Bond {
    fn default() -> Self {
        Bond::new(1)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Atom {0} is not in the graph")]
    UnknownAtom(usize),
    #[error("Bond {0} is not in the graph")]
    UnknownBond(BondKey),
    #[error("Atom {0} cannot be bonded to itself")]
    SelfBond(usize),
    #[error("Atom {0} is already in the graph")]
    DuplicateAtom(usize),
}

/// A molecular graph with integer-keyed atoms and unordered-pair bonds.
///
/// Graphs behave as values: stereo assignments and other transformations
/// produce new graphs rather than editing in place. The derived ordering is a
/// canonical total order over the full content (atoms, then bonds), used to
/// sort and deduplicate collections of graphs.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MolecularGraph {
    atoms: BTreeMap<usize, Atom>,
    bonds: BTreeMap<BondKey, Bond>,
}

impl MolecularGraph {
    /// Creates a new, empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from atom and bond tables.
    ///
    /// # Errors
    ///
    /// Returns an error if a bond references a missing atom or joins an atom
    /// to itself.
    pub fn from_parts<A, B>(atoms: A, bonds: B) -> Result<Self, GraphError>
    where
        A: IntoIterator<Item = (usize, Atom)>,
        B: IntoIterator<Item = (BondKey, Bond)>,
    {
        let mut graph = Self {
            atoms: atoms.into_iter().collect(),
            bonds: BTreeMap::new(),
        };
        for (key, bond) in bonds {
            let (a, b) = key.atoms();
            graph.add_bond(a, b, bond)?;
        }
        Ok(graph)
    }

    /// Adds an atom under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateAtom`] if the key is taken.
    pub fn add_atom(&mut self, key: usize, atom: Atom) -> Result<(), GraphError> {
        if self.atoms.contains_key(&key) {
            return Err(GraphError::DuplicateAtom(key));
        }
        self.atoms.insert(key, atom);
        Ok(())
    }

    /// Adds a bond between two existing atoms, replacing any existing bond
    /// between them.
    pub fn add_bond(&mut self, a: usize, b: usize, bond: Bond) -> Result<(), GraphError> {
        if a == b {
            return Err(GraphError::SelfBond(a));
        }
        for key in [a, b] {
            if !self.atoms.contains_key(&key) {
                return Err(GraphError::UnknownAtom(key));
            }
        }
        self.bonds.insert(BondKey::new(a, b), bond);
        Ok(())
    }

    pub fn atoms(&self) -> &BTreeMap<usize, Atom> {
        &self.atoms
    }

    pub fn bonds(&self) -> &BTreeMap<BondKey, Bond> {
        &self.bonds
    }

    pub fn atom(&self, key: usize) -> Option<&Atom> {
        self.atoms.get(&key)
    }

    pub fn bond(&self, a: usize, b: usize) -> Option<&Bond> {
        self.bonds.get(&BondKey::new(a, b))
    }

    pub fn contains_atom(&self, key: usize) -> bool {
        self.atoms.contains_key(&key)
    }

    pub fn contains_bond(&self, a: usize, b: usize) -> bool {
        self.bonds.contains_key(&BondKey::new(a, b))
    }

    pub fn atom_keys(&self) -> BTreeSet<usize> {
        self.atoms.keys().copied().collect()
    }

    pub fn bond_keys(&self) -> BTreeSet<BondKey> {
        self.bonds.keys().copied().collect()
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn max_atom_key(&self) -> Option<usize> {
        self.atoms.keys().next_back().copied()
    }

    /// Keys of the atoms bonded to `key`, in ascending order.
    pub fn neighbors(&self, key: usize) -> BTreeSet<usize> {
        self.bonds
            .keys()
            .filter_map(|bond_key| bond_key.partner(key))
            .collect()
    }

    /// Neighbor keys for every atom, including atoms without bonds.
    pub fn neighbors_map(&self) -> BTreeMap<usize, BTreeSet<usize>> {
        let mut map: BTreeMap<usize, BTreeSet<usize>> =
            self.atoms.keys().map(|&k| (k, BTreeSet::new())).collect();
        for key in self.bonds.keys() {
            let (a, b) = key.atoms();
            map.entry(a).or_default().insert(b);
            map.entry(b).or_default().insert(a);
        }
        map
    }

    /// Sum of bond orders plus implicit hydrogens for every atom.
    pub fn atom_bond_valences(&self) -> BTreeMap<usize, u32> {
        let mut valences: BTreeMap<usize, u32> = self
            .atoms
            .iter()
            .map(|(&k, atom)| (k, u32::from(atom.implicit_hydrogens)))
            .collect();
        for (key, bond) in &self.bonds {
            let (a, b) = key.atoms();
            *valences.entry(a).or_default() += u32::from(bond.order);
            *valences.entry(b).or_default() += u32::from(bond.order);
        }
        valences
    }

    pub fn atom_stereo_parities(&self) -> BTreeMap<usize, Option<bool>> {
        self.atoms
            .iter()
            .map(|(&k, atom)| (k, atom.stereo_parity))
            .collect()
    }

    pub fn bond_stereo_parities(&self) -> BTreeMap<BondKey, Option<bool>> {
        self.bonds
            .iter()
            .map(|(&k, bond)| (k, bond.stereo_parity))
            .collect()
    }

    /// Returns a copy with the given atom parities assigned.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownAtom`] if a key is not in the graph.
    pub fn with_atom_stereo_parities(
        &self,
        parities: &BTreeMap<usize, bool>,
    ) -> Result<Self, GraphError> {
        let mut graph = self.clone();
        for (&key, &parity) in parities {
            let atom = graph
                .atoms
                .get_mut(&key)
                .ok_or(GraphError::UnknownAtom(key))?;
            atom.stereo_parity = Some(parity);
        }
        Ok(graph)
    }

    /// Returns a copy with the given bond parities assigned.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownBond`] if a key is not in the graph.
    pub fn with_bond_stereo_parities(
        &self,
        parities: &BTreeMap<BondKey, bool>,
    ) -> Result<Self, GraphError> {
        let mut graph = self.clone();
        for (&key, &parity) in parities {
            let bond = graph
                .bonds
                .get_mut(&key)
                .ok_or(GraphError::UnknownBond(key))?;
            bond.stereo_parity = Some(parity);
        }
        Ok(graph)
    }

    /// Returns a copy with every atom and bond parity cleared.
    pub fn without_stereo_parities(&self) -> Self {
        let mut graph = self.clone();
        graph
            .atoms
            .values_mut()
            .for_each(|atom| atom.stereo_parity = None);
        graph
            .bonds
            .values_mut()
            .for_each(|bond| bond.stereo_parity = None);
        graph
    }

    /// Returns a copy with every bond order reset to one.
    pub fn without_bond_orders(&self) -> Self {
        let mut graph = self.clone();
        graph.bonds.values_mut().for_each(|bond| bond.order = 1);
        graph
    }

    /// Returns a copy without the given atoms and their bonds.
    pub fn without_atoms(&self, keys: &BTreeSet<usize>) -> Self {
        Self {
            atoms: self
                .atoms
                .iter()
                .filter(|(k, _)| !keys.contains(k))
                .map(|(&k, a)| (k, a.clone()))
                .collect(),
            bonds: self
                .bonds
                .iter()
                .filter(|(k, _)| {
                    let (a, b) = k.atoms();
                    !keys.contains(&a) && !keys.contains(&b)
                })
                .map(|(&k, &b)| (k, b))
                .collect(),
        }
    }

    pub(crate) fn atom_mut(&mut self, key: usize) -> Option<&mut Atom> {
        self.atoms.get_mut(&key)
    }
}

fn parity_symbol(parity: Option<bool>) -> &'static str {
    match parity {
        Some(true) => "+",
        Some(false) => "-",
        None => "",
    }
}

impl fmt::Display for MolecularGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "atoms:")?;
        for (key, atom) in &self.atoms {
            writeln!(
                f,
                "  {}: {} H{} {}",
                key,
                atom.symbol,
                atom.implicit_hydrogens,
                parity_symbol(atom.stereo_parity)
            )?;
        }
        writeln!(f, "bonds:")?;
        for (key, bond) in &self.bonds {
            writeln!(
                f,
                "  {}: {} {}",
                key,
                bond.order,
                parity_symbol(bond.stereo_parity)
            )?;
        }
        Ok(())
    }
}
