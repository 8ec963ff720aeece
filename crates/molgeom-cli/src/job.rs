use crate::cli::CleanupArgs;
use crate::error::{CliError, Result};
use molgeom::engine::config::{CleanupConfig, CleanupConfigBuilder, ErrorWeights};
use molgeom::engine::error_function::VolumeConstraints;
use molgeom::workflows::cleanup::{CleanupInput, CleanupResult};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// One `[[chirality]]` or `[[planarity]]` entry of a job file.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct VolumeConstraintEntry {
    pub atoms: [usize; 4],
    pub lower: f64,
    pub upper: f64,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialCleanupSettings {
    threshold: Option<f64>,
    max_iterations: Option<usize>,
    flip_check: Option<bool>,
    weights: Option<ErrorWeights>,
}

/// A cleanup job: starting coordinates, bounds matrices, volume constraints
/// and optional `[settings]`.
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct CleanupJob {
    coordinates: Vec<Vec<f64>>,
    lower: Vec<Vec<f64>>,
    upper: Vec<Vec<f64>>,
    #[serde(default)]
    chirality: Vec<VolumeConstraintEntry>,
    #[serde(default)]
    planarity: Vec<VolumeConstraintEntry>,
    #[serde(default)]
    settings: PartialCleanupSettings,
}

impl CleanupJob {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading cleanup job from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Combines the job's `[settings]` with command-line overrides. Arguments
    /// given on the command line win.
    pub fn merge_with_cli(&self, args: &CleanupArgs) -> Result<CleanupConfig> {
        let settings = &self.settings;
        let mut builder = CleanupConfigBuilder::new();

        if let Some(weights) = settings.weights {
            builder = builder.weights(weights);
        }
        if let Some(threshold) = args.threshold.or(settings.threshold) {
            builder = builder.threshold(threshold);
        }
        if let Some(max_iterations) = args.max_iterations.or(settings.max_iterations) {
            builder = builder.max_iterations(max_iterations);
        }
        if args.no_flip_check {
            builder = builder.flip_check(false);
        } else if let Some(flip_check) = settings.flip_check {
            builder = builder.flip_check(flip_check);
        }

        Ok(builder.build()?)
    }

    pub fn into_input(self) -> Result<CleanupInput> {
        let coordinates = matrix_from_rows("coordinates", &self.coordinates)?;
        let lower = matrix_from_rows("lower", &self.lower)?;
        let upper = matrix_from_rows("upper", &self.upper)?;
        Ok(CleanupInput::new(coordinates, lower, upper)
            .with_chirality(volume_constraints(&self.chirality))
            .with_planarity(volume_constraints(&self.planarity)))
    }
}

fn matrix_from_rows(name: &str, rows: &[Vec<f64>]) -> Result<DMatrix<f64>> {
    let ncols = rows.first().map_or(0, Vec::len);
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != ncols) {
        return Err(CliError::Job(format!(
            "row {i} of '{name}' has {} entries, expected {ncols}",
            row.len()
        )));
    }
    Ok(DMatrix::from_row_iterator(
        rows.len(),
        ncols,
        rows.iter().flatten().copied(),
    ))
}

/// Later entries for the same four atoms replace earlier ones.
fn volume_constraints(entries: &[VolumeConstraintEntry]) -> VolumeConstraints {
    entries
        .iter()
        .map(|entry| (entry.atoms, (entry.lower, entry.upper)))
        .collect()
}

/// The output document of a cleanup run.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CleanupReport {
    pub converged: bool,
    pub iterations: usize,
    pub flipped: bool,
    pub error: f64,
    pub coordinates: Vec<Vec<f64>>,
}

impl From<&CleanupResult> for CleanupReport {
    fn from(result: &CleanupResult) -> Self {
        Self {
            converged: result.converged,
            iterations: result.iterations,
            flipped: result.flipped,
            error: result.error,
            coordinates: result
                .coordinates
                .row_iter()
                .map(|row| row.iter().copied().collect())
                .collect(),
        }
    }
}

impl CleanupReport {
    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, toml::to_string(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const JOB: &str = r#"
coordinates = [[0.0, 0.0, 0.0], [3.0, 0.0, 0.0]]
lower = [[0.0, 1.0], [1.0, 0.0]]
upper = [[0.0, 1.5], [1.5, 0.0]]

[[chirality]]
atoms = [0, 1, 2, 3]
lower = -2.0
upper = -0.5

[settings]
threshold = 0.05
max-iterations = 20

[settings.weights]
chirality = 2.0
"#;

    fn args() -> CleanupArgs {
        CleanupArgs {
            job: PathBuf::from("job.toml"),
            output: PathBuf::from("out.toml"),
            threshold: None,
            max_iterations: None,
            no_flip_check: false,
        }
    }

    #[test]
    fn job_settings_become_cleanup_config() {
        let job: CleanupJob = toml::from_str(JOB).unwrap();
        let config = job.merge_with_cli(&args()).unwrap();
        assert_eq!(config.threshold, 0.05);
        assert_eq!(config.max_iterations, Some(20));
        assert!(config.flip_check);
        assert_eq!(config.weights.chirality, 2.0);
        assert_eq!(config.weights.distance, 1.0);
    }

    #[test]
    fn command_line_overrides_job_settings() {
        let job: CleanupJob = toml::from_str(JOB).unwrap();
        let config = job
            .merge_with_cli(&CleanupArgs {
                threshold: Some(0.001),
                no_flip_check: true,
                ..args()
            })
            .unwrap();
        assert_eq!(config.threshold, 0.001);
        assert_eq!(config.max_iterations, Some(20));
        assert!(!config.flip_check);
    }

    #[test]
    fn invalid_override_is_a_config_error() {
        let job: CleanupJob = toml::from_str(JOB).unwrap();
        let result = job.merge_with_cli(&CleanupArgs {
            threshold: Some(-1.0),
            ..args()
        });
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn job_becomes_cleanup_input() {
        let job: CleanupJob = toml::from_str(JOB).unwrap();
        let input = job.into_input().unwrap();
        assert_eq!(input.coordinates.shape(), (2, 3));
        assert_eq!(input.coordinates[(1, 0)], 3.0);
        assert_eq!(input.upper[(0, 1)], 1.5);
        assert_eq!(input.chirality.get(&[0, 1, 2, 3]), Some(&(-2.0, -0.5)));
        assert!(input.planarity.is_empty());
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let job: CleanupJob = toml::from_str(
            "coordinates = [[0.0, 0.0, 0.0], [1.0, 0.0]]\nlower = []\nupper = []\n",
        )
        .unwrap();
        assert!(matches!(job.into_input(), Err(CliError::Job(_))));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: std::result::Result<CleanupJob, _> =
            toml::from_str("coordinates = []\nlower = []\nupper = []\ncutoff = 3.0\n");
        assert!(result.is_err());
    }

    #[test]
    fn report_is_written_as_toml() {
        let result = CleanupResult {
            coordinates: DMatrix::from_row_slice(2, 3, &[0.0, 0.0, 0.0, 1.25, 0.0, 0.0]),
            converged: true,
            iterations: 4,
            flipped: false,
            error: 0.0,
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.toml");
        CleanupReport::from(&result).write_to(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("converged = true"));
        assert!(content.contains("iterations = 4"));
        assert!(content.contains("1.25"));
    }
}
