//! Convenience wiring for a full local sweep.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::backend::{OscillatorBackend, Simulator};
use crate::checkpoint::CheckpointStore;
use crate::error::PseError;
use crate::exec::{LocalExec, PostProcess, ProgressReporter};
use crate::grid::{ParamValue, ParameterGrid, ParameterSpec};
use crate::metrics::{metrics_from_names, MetricVector};
use crate::reduce::SaveDataToDisk;
use crate::sequence::{ConfigSequence, Sweepable};

/// Run a parameter space exploration locally, end to end: expand the grid,
/// sweep it on `n_threads` workers with the default backend, and persist the
/// result container to `file_name`.
///
/// When `update_progress` is `None` the engine falls back to the file-backed
/// progress counter.
#[allow(clippy::too_many_arguments)]
pub fn launch_local(
    simulator: Simulator,
    param1: &str,
    param2: &str,
    x_values: Vec<ParamValue>,
    y_values: Vec<ParamValue>,
    metrics: &[String],
    file_name: impl AsRef<Path>,
    checkpoint_dir: Option<PathBuf>,
    update_progress: Option<Arc<dyn ProgressReporter>>,
    n_threads: usize,
) -> Result<Vec<MetricVector>, PseError> {
    let template = if simulator.is_configured() {
        simulator
    } else {
        simulator.configure()?
    };
    let sample_period = template.sample_period;

    let grid = ParameterGrid::new(
        ParameterSpec::new(param1, x_values.clone()),
        ParameterSpec::new(param2, y_values.clone()),
    )?;
    let seq = ConfigSequence::new(template, grid)?;

    let post = PostProcess::new(
        metrics_from_names(metrics, sample_period)?,
        Some(Box::new(SaveDataToDisk {
            param1: param1.to_string(),
            param2: param2.to_string(),
            x_values,
            y_values,
            metrics: metrics.to_vec(),
            file_name: file_name.as_ref().to_path_buf(),
        })),
    );

    let exec = LocalExec {
        seq,
        post,
        backend: Arc::new(OscillatorBackend),
        checkpoint: checkpoint_dir.map(CheckpointStore::new),
        progress: update_progress,
    };
    exec.run(n_threads)
}
