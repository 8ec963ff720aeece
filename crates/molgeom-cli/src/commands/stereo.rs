use crate::cli::{StereoAction, StereoArgs};
use crate::error::Result;
use crate::graph_file::{GraphCollection, GraphDocument, StereogenicReport};
use molgeom::core::models::graph::MolecularGraph;
use molgeom::engine::stereo;
use serde::Serialize;
use tracing::info;

pub fn run(args: StereoArgs) -> Result<()> {
    let graph = GraphDocument::from_file(&args.graph)?.to_graph()?;
    info!(
        "Loaded graph with {} atoms and {} bonds.",
        graph.atom_count(),
        graph.bonds().len()
    );

    let rendered = execute(&graph, args.action)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            println!("✓ Result written to: {}", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

/// Runs `action` on `graph` and renders the result as TOML.
pub fn execute(graph: &MolecularGraph, action: StereoAction) -> Result<String> {
    info!("Running stereo action {:?}.", action);
    match action {
        StereoAction::Stereomers => {
            let graphs = stereo::stereomers(graph)?;
            info!("Found {} stereomers.", graphs.len());
            render(&GraphCollection::from_graphs(&graphs))
        }
        StereoAction::Substereomers => {
            let graphs = stereo::substereomers(graph)?;
            info!("Found {} compatible stereomers.", graphs.len());
            render(&GraphCollection::from_graphs(&graphs))
        }
        StereoAction::Stereogenic => render(&StereogenicReport::new(
            &stereo::stereogenic_atom_keys(graph)?,
            &stereo::stereogenic_bond_keys(graph)?,
        )),
        StereoAction::ToIndex => render(&GraphDocument::from_graph(
            &stereo::to_index_based_stereo(graph)?,
        )),
        StereoAction::FromIndex => render(&GraphDocument::from_graph(
            &stereo::from_index_based_stereo(graph)?,
        )),
    }
}

fn render<T: Serialize>(value: &T) -> Result<String> {
    Ok(toml::to_string(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;

    /// 1-fluoroethanol with implicit hydrogens.
    const FLUOROETHANOL: &str = r#"
[[atoms]]
key = 0
symbol = "C"
implicit-hydrogens = 3

[[atoms]]
key = 1
symbol = "C"
implicit-hydrogens = 1

[[atoms]]
key = 2
symbol = "F"

[[atoms]]
key = 3
symbol = "O"
implicit-hydrogens = 1

[[bonds]]
atoms = [0, 1]

[[bonds]]
atoms = [1, 2]

[[bonds]]
atoms = [1, 3]
"#;

    fn graph() -> MolecularGraph {
        toml::from_str::<GraphDocument>(FLUOROETHANOL)
            .unwrap()
            .to_graph()
            .unwrap()
    }

    #[test]
    fn stereomers_are_rendered_as_graph_collection() {
        let rendered = execute(&graph(), StereoAction::Stereomers).unwrap();
        let parsed: toml::Table = toml::from_str(&rendered).unwrap();
        let graphs = parsed["graphs"].as_array().unwrap();
        assert_eq!(graphs.len(), 2);
        assert_eq!(graphs[0]["atoms"][1]["parity"].as_bool(), Some(false));
        assert_eq!(graphs[1]["atoms"][1]["parity"].as_bool(), Some(true));
    }

    #[test]
    fn stereogenic_lists_atoms_and_bonds() {
        let rendered = execute(&graph(), StereoAction::Stereogenic).unwrap();
        let parsed: toml::Table = toml::from_str(&rendered).unwrap();
        let atoms: Vec<i64> = parsed["atoms"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_integer().unwrap())
            .collect();
        assert_eq!(atoms, vec![1]);
        assert!(parsed["bonds"].as_array().unwrap().is_empty());
    }

    #[test]
    fn index_conversion_requires_explicit_hydrogens() {
        let result = execute(&graph(), StereoAction::ToIndex);
        assert!(matches!(result, Err(CliError::Engine(_))));
    }

    #[test]
    fn index_conversion_round_trips_through_documents() {
        let absolute = stereo::stereomers(&graph().explicit()).unwrap().remove(1);
        let index_based: GraphDocument =
            toml::from_str(&execute(&absolute, StereoAction::ToIndex).unwrap()).unwrap();
        let restored: GraphDocument = toml::from_str(
            &execute(&index_based.to_graph().unwrap(), StereoAction::FromIndex).unwrap(),
        )
        .unwrap();
        assert_eq!(restored.to_graph().unwrap(), absolute);
    }

    #[test]
    fn output_file_receives_rendered_result() {
        let dir = tempfile::tempdir().unwrap();
        let graph_path = dir.path().join("graph.toml");
        let output = dir.path().join("stereomers.toml");
        std::fs::write(&graph_path, FLUOROETHANOL).unwrap();

        run(StereoArgs {
            graph: graph_path,
            action: StereoAction::Substereomers,
            output: Some(output.clone()),
        })
        .unwrap();
        let content = std::fs::read_to_string(output).unwrap();
        assert!(content.contains("graphs"));
    }
}
