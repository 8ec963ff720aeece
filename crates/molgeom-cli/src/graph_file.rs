use crate::error::{CliError, Result};
use molgeom::core::models::graph::{Atom, Bond, BondKey, MolecularGraph};
use molgeom::engine::error::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

fn default_order() -> u8 {
    1
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct AtomEntry {
    pub key: usize,
    pub symbol: String,
    #[serde(default)]
    pub implicit_hydrogens: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parity: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BondEntry {
    pub atoms: [usize; 2],
    #[serde(default = "default_order")]
    pub order: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parity: Option<bool>,
}

/// A molecular graph as `[[atoms]]` and `[[bonds]]` tables.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GraphDocument {
    #[serde(default)]
    pub atoms: Vec<AtomEntry>,
    #[serde(default)]
    pub bonds: Vec<BondEntry>,
}

impl GraphDocument {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading molecular graph from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn to_graph(&self) -> Result<MolecularGraph> {
        let mut graph = MolecularGraph::new();
        for entry in &self.atoms {
            let atom = Atom::new(&entry.symbol, entry.implicit_hydrogens).with_parity(entry.parity);
            graph
                .add_atom(entry.key, atom)
                .map_err(EngineError::from)?;
        }
        for entry in &self.bonds {
            let [a, b] = entry.atoms;
            graph
                .add_bond(a, b, Bond::new(entry.order).with_parity(entry.parity))
                .map_err(EngineError::from)?;
        }
        Ok(graph)
    }

    pub fn from_graph(graph: &MolecularGraph) -> Self {
        Self {
            atoms: graph
                .atoms()
                .iter()
                .map(|(&key, atom)| AtomEntry {
                    key,
                    symbol: atom.symbol.clone(),
                    implicit_hydrogens: atom.implicit_hydrogens,
                    parity: atom.stereo_parity,
                })
                .collect(),
            bonds: graph
                .bonds()
                .iter()
                .map(|(key, bond)| {
                    let (a, b) = key.atoms();
                    BondEntry {
                        atoms: [a, b],
                        order: bond.order,
                        parity: bond.stereo_parity,
                    }
                })
                .collect(),
        }
    }
}

/// Several graphs in one document, as `[[graphs]]` tables.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GraphCollection {
    pub graphs: Vec<GraphDocument>,
}

impl GraphCollection {
    pub fn from_graphs(graphs: &[MolecularGraph]) -> Self {
        Self {
            graphs: graphs.iter().map(GraphDocument::from_graph).collect(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct StereogenicReport {
    pub atoms: Vec<usize>,
    pub bonds: Vec<[usize; 2]>,
}

impl StereogenicReport {
    pub fn new(atoms: &BTreeSet<usize>, bonds: &BTreeSet<BondKey>) -> Self {
        Self {
            atoms: atoms.iter().copied().collect(),
            bonds: bonds
                .iter()
                .map(|key| {
                    let (a, b) = key.atoms();
                    [a, b]
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ETHANOL: &str = r#"
[[atoms]]
key = 0
symbol = "C"
implicit-hydrogens = 3

[[atoms]]
key = 1
symbol = "C"
implicit-hydrogens = 2
parity = true

[[atoms]]
key = 2
symbol = "O"
implicit-hydrogens = 1

[[bonds]]
atoms = [0, 1]

[[bonds]]
atoms = [2, 1]
order = 1
parity = false
"#;

    #[test]
    fn document_converts_to_graph() {
        let document: GraphDocument = toml::from_str(ETHANOL).unwrap();
        let graph = document.to_graph().unwrap();
        assert_eq!(graph.atom_count(), 3);
        assert_eq!(graph.atom(1).unwrap().stereo_parity, Some(true));
        assert_eq!(graph.atom(0).unwrap().implicit_hydrogens, 3);
        let bond = graph.bond(1, 2).unwrap();
        assert_eq!(bond.order, 1);
        assert_eq!(bond.stereo_parity, Some(false));
    }

    #[test]
    fn graph_converts_back_to_normalized_document() {
        let document: GraphDocument = toml::from_str(ETHANOL).unwrap();
        let restored = GraphDocument::from_graph(&document.to_graph().unwrap());
        assert_eq!(restored.atoms, document.atoms);
        assert_eq!(restored.bonds[1].atoms, [1, 2]);
        assert_eq!(restored.bonds[0].parity, None);
    }

    #[test]
    fn bond_to_missing_atom_is_an_engine_error() {
        let document: GraphDocument = toml::from_str(
            "[[atoms]]\nkey = 0\nsymbol = \"C\"\n\n[[bonds]]\natoms = [0, 5]\n",
        )
        .unwrap();
        assert!(matches!(document.to_graph(), Err(CliError::Engine(_))));
    }

    #[test]
    fn collections_serialize_as_arrays_of_tables() {
        let document: GraphDocument = toml::from_str(ETHANOL).unwrap();
        let graph = document.to_graph().unwrap();
        let rendered = toml::to_string(&GraphCollection::from_graphs(&[graph.clone(), graph])).unwrap();

        let parsed: toml::Table = toml::from_str(&rendered).unwrap();
        let graphs = parsed["graphs"].as_array().unwrap();
        assert_eq!(graphs.len(), 2);
        assert_eq!(graphs[0]["atoms"].as_array().unwrap().len(), 3);
        assert_eq!(graphs[1]["bonds"][1]["parity"].as_bool(), Some(false));
    }
}
