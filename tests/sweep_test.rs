//! End-to-end sweep properties: idempotence, resumability, and failure
//! isolation, exercised through the public API.
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pse_engine::backend::{Backend, OscillatorBackend, Simulator};
use pse_engine::checkpoint::CheckpointStore;
use pse_engine::error::PseError;
use pse_engine::exec::{LocalExec, PostProcess, ProgressReporter};
use pse_engine::grid::{ParamValue, ParameterGrid, ParameterSpec};
use pse_engine::metrics::{metrics_from_names, Metric};
use pse_engine::reduce::{PseResult, SaveDataToDisk};
use pse_engine::sequence::ConfigSequence;
use pse_engine::series::SimulationOutput;
use tempfile::tempdir;

/// Counts executions, and yields a constant (phase-less) output whenever the
/// configured coupling matches `degenerate_coupling`.
#[derive(Debug)]
struct InstrumentedBackend {
    inner: OscillatorBackend,
    runs: AtomicUsize,
    degenerate_coupling: Option<f64>,
}

impl InstrumentedBackend {
    fn new(degenerate_coupling: Option<f64>) -> Self {
        InstrumentedBackend {
            inner: OscillatorBackend,
            runs: AtomicUsize::new(0),
            degenerate_coupling,
        }
    }
}

impl Backend<Simulator> for InstrumentedBackend {
    fn run(&self, config: &Simulator) -> Result<SimulationOutput, PseError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.degenerate_coupling == Some(config.coupling) {
            let num_steps = (config.simulation_length / config.sample_period) as usize;
            let times: Vec<f64> = (0..num_steps)
                .map(|t| t as f64 * config.sample_period)
                .collect();
            let data = vec![1.0; num_steps * config.num_nodes];
            return SimulationOutput::new(times, data, (num_steps, 1, config.num_nodes, 1));
        }
        self.inner.run(config)
    }
}

#[derive(Debug, Default)]
struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn advance(&self) {}
}

fn grid_2x3() -> ParameterGrid {
    ParameterGrid::new(
        ParameterSpec::scalars("coupling", &[0.1, 0.4]),
        ParameterSpec::scalars("conduction_speed", &[1.0, 2.0, 3.0]),
    )
    .unwrap()
}

fn sequence() -> ConfigSequence<Simulator> {
    let mut template = Simulator::default();
    template.num_nodes = 4;
    ConfigSequence::new(template.configure().unwrap(), grid_2x3()).unwrap()
}

fn metric_names() -> Vec<String> {
    vec!["GlobalVariance".to_string(), "KuramotoIndex".to_string()]
}

fn exec_with(
    backend: Arc<InstrumentedBackend>,
    checkpoint: Option<CheckpointStore>,
    reduction_file: Option<std::path::PathBuf>,
) -> LocalExec<Simulator, InstrumentedBackend> {
    let reduction = reduction_file.map(|file_name| {
        Box::new(SaveDataToDisk {
            param1: "coupling".to_string(),
            param2: "conduction_speed".to_string(),
            x_values: vec![ParamValue::Scalar(0.1), ParamValue::Scalar(0.4)],
            y_values: vec![
                ParamValue::Scalar(1.0),
                ParamValue::Scalar(2.0),
                ParamValue::Scalar(3.0),
            ],
            metrics: metric_names(),
            file_name,
        }) as Box<dyn pse_engine::reduce::Reduction>
    });
    LocalExec {
        seq: sequence(),
        post: PostProcess::new(metrics_from_names(&metric_names(), 1.0).unwrap(), reduction),
        backend,
        checkpoint,
        progress: Some(Arc::new(SilentProgress)),
    }
}

#[test]
fn rerun_with_same_checkpoint_is_idempotent_and_backend_free() {
    let dir = tempdir().unwrap();
    let store = CheckpointStore::new(dir.path().join("checkpoints"));
    let result_file = dir.path().join("pse_result.json");

    let backend = Arc::new(InstrumentedBackend::new(None));
    let exec = exec_with(backend.clone(), Some(store.clone()), Some(result_file.clone()));
    exec.run(2).unwrap();
    assert_eq!(backend.runs.load(Ordering::SeqCst), 6);
    let first = PseResult::load_from(&result_file).unwrap();

    let backend = Arc::new(InstrumentedBackend::new(None));
    let exec = exec_with(backend.clone(), Some(store), Some(result_file.clone()));
    exec.run(2).unwrap();
    assert_eq!(backend.runs.load(Ordering::SeqCst), 0);
    assert_eq!(PseResult::load_from(&result_file).unwrap(), first);
}

#[test]
fn interrupted_sweep_resumes_missing_indices_only() {
    let dir = tempdir().unwrap();
    let store = CheckpointStore::new(dir.path().join("checkpoints"));

    let backend = Arc::new(InstrumentedBackend::new(None));
    let exec = exec_with(backend, Some(store.clone()), None);
    let full = exec.run(2).unwrap();

    // Simulate an interruption after indices {0, 1, 2} completed.
    for index in 3..6 {
        fs::remove_file(store.dir().join(format!("{}.json", index))).unwrap();
    }

    let backend = Arc::new(InstrumentedBackend::new(None));
    let exec = exec_with(backend.clone(), Some(store), None);
    let resumed = exec.run(2).unwrap();
    assert_eq!(backend.runs.load(Ordering::SeqCst), 3);
    assert_eq!(resumed, full);
}

#[test]
fn degenerate_run_poisons_one_metric_slot_only() {
    let dir = tempdir().unwrap();
    let result_file = dir.path().join("pse_result.json");

    // Grid points with coupling 0.4 (indices 3..6) produce a constant signal;
    // phase estimation fails there while the variance stays well-defined.
    let backend = Arc::new(InstrumentedBackend::new(Some(0.4)));
    let exec = exec_with(backend, None, Some(result_file.clone()));
    let vectors = exec.run(2).unwrap();

    for (index, vector) in vectors.iter().enumerate() {
        assert_eq!(vector.len(), 2);
        if index < 3 {
            assert!(vector[0].is_finite());
            assert!(vector[1].is_finite());
        } else {
            // GlobalVariance of a constant signal is zero, KuramotoIndex fails.
            assert_eq!(vector[0], 0.0);
            assert!(vector[1].is_nan());
        }
    }

    // The NaN sentinel survives into the persisted cube.
    let result = PseResult::load_from(&result_file).unwrap();
    assert!(result.results[1][1][0].is_nan());
    assert!(result.results[1][0][0].is_finite());
}

#[test]
fn custom_metric_plugs_into_the_catalogued_ones() {
    // The metric set is extensible: anything implementing Metric slots in.
    struct SpikeCount;
    impl Metric for SpikeCount {
        fn name(&self) -> &str {
            "SpikeCount"
        }
        fn compute(&self, output: &SimulationOutput) -> Result<Vec<f64>, PseError> {
            let series = output.node_series(0, 0, 0);
            let count = series.windows(2).filter(|w| w[0] <= 0.0 && w[1] > 0.0).count();
            Ok(vec![count as f64])
        }
    }

    let mut metrics = metrics_from_names(&metric_names(), 1.0).unwrap();
    metrics.push(Box::new(SpikeCount));
    let exec = LocalExec {
        seq: sequence(),
        post: PostProcess::new(metrics, None),
        backend: Arc::new(InstrumentedBackend::new(None)),
        checkpoint: None,
        progress: Some(Arc::new(SilentProgress)),
    };
    let vectors = exec.run(2).unwrap();
    for vector in vectors {
        assert_eq!(vector.len(), 3);
        assert!(vector[2] >= 1.0);
    }
}
