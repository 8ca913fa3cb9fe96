//! Sweep execution: local thread-pool and distributed scheduling strategies.
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use derivative::Derivative;
use rayon::prelude::*;

use crate::backend::Backend;
use crate::checkpoint::CheckpointStore;
use crate::error::PseError;
use crate::metrics::{evaluate_metrics, Metric, MetricVector};
use crate::reduce::Reduction;
use crate::sequence::{ConfigSequence, Sweepable};

/// Well-known status file holding the completed-point count.
pub const PROGRESS_BAR_STATUS_FILE: &str = "progress_bar_status.txt";

/// A sink for per-point completion signals, safe to call from concurrent
/// workers.
pub trait ProgressReporter: Send + Sync {
    /// Record one more completed grid point.
    fn advance(&self);
}

/// The fallback reporter: a decimal counter in a status file, overwritten in
/// place on every update, with a lock serializing the read-modify-write.
///
/// Write failures are logged and never escalated; they do not affect the
/// sweep result.
#[derive(Debug)]
pub struct FileProgressReporter {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileProgressReporter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        FileProgressReporter {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    /// Reset the counter to zero.
    pub fn init(&self) -> Result<(), PseError> {
        fs::write(&self.path, "0").map_err(|e| {
            PseError::IoError(format!(
                "Failed to initialize progress file {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn try_advance(&self) -> Result<(), std::io::Error> {
        let status: u64 = match fs::read_to_string(&self.path) {
            Ok(content) => content
                .trim()
                .parse()
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e),
        };
        fs::write(&self.path, (status + 1).to_string())
    }
}

impl ProgressReporter for FileProgressReporter {
    fn advance(&self) {
        let _guard = match self.lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = self.try_advance() {
            log::error!("Could not update the progress bar status: {}", e);
        }
    }
}

/// What happens to each completed run: the metrics to evaluate and the final
/// reduction, if any.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct PostProcess {
    #[derivative(Debug = "ignore")]
    pub metrics: Arc<Vec<Box<dyn Metric>>>,
    #[derivative(Debug = "ignore")]
    pub reduction: Option<Box<dyn Reduction>>,
}

impl PostProcess {
    pub fn new(metrics: Vec<Box<dyn Metric>>, reduction: Option<Box<dyn Reduction>>) -> Self {
        PostProcess {
            metrics: Arc::new(metrics),
            reduction,
        }
    }
}

/// The local scheduling strategy: a bounded pool of OS threads works through
/// the grid points concurrently.
///
/// Threads are preferred over processes because backends are not assumed to
/// survive a process boundary without serialization support.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct LocalExec<C: Sweepable, B: Backend<C>> {
    pub seq: ConfigSequence<C>,
    pub post: PostProcess,
    #[derivative(Debug = "ignore")]
    pub backend: Arc<B>,
    pub checkpoint: Option<CheckpointStore>,
    #[derivative(Debug = "ignore")]
    pub progress: Option<Arc<dyn ProgressReporter>>,
}

impl<C, B> LocalExec<C, B>
where
    C: Sweepable + Send + Sync,
    B: Backend<C>,
{
    /// Run the full sweep on `n_threads` workers.
    ///
    /// Returns one metric vector per grid index, in ascending index order
    /// regardless of completion order. Points with a valid checkpoint record
    /// are served from it without touching the backend; backend failures
    /// propagate and abort the sweep, leaving completed checkpoints on disk.
    pub fn run(&self, n_threads: usize) -> Result<Vec<MetricVector>, PseError> {
        log::info!("Simulation starts");
        if let Some(store) = &self.checkpoint {
            store.init(self.seq.grid())?;
        }
        let progress: Arc<dyn ProgressReporter> = match &self.progress {
            Some(reporter) => reporter.clone(),
            None => Arc::new(FileProgressReporter::new(PROGRESS_BAR_STATUS_FILE)),
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .build()
            .map_err(|e| {
                PseError::BackendError(format!("Failed to build the worker pool: {}", e))
            })?;
        let results: Vec<MetricVector> = pool.install(|| {
            (0..self.seq.len())
                .into_par_iter()
                .map(|index| self.job(index, progress.as_ref()))
                .collect::<Result<_, _>>()
        })?;

        log::info!("Completed tasks: {}", results.len());
        if let Some(reduction) = &self.post.reduction {
            reduction.reduce(&results)?;
        }
        log::info!("Local launch finished");
        Ok(results)
    }

    fn job(&self, index: usize, progress: &dyn ProgressReporter) -> Result<MetricVector, PseError> {
        let cached = self.checkpoint.as_ref().and_then(|store| store.load(index));
        let vector = match cached {
            Some(vector) => vector,
            None => {
                let config = self.seq.configure_at(index)?;
                let output = self.backend.run(&config)?;
                let vector = evaluate_metrics(&self.post.metrics, &output);
                if let Some(store) = &self.checkpoint {
                    store.save(index, &vector)?;
                }
                vector
            }
        };
        log::info!("Task {} finished", index);
        progress.advance();
        Ok(vector)
    }
}

/// One grid point's work, ready to ship to a cluster.
pub type SweepJob = Box<dyn FnOnce() -> Result<MetricVector, PseError> + Send + 'static>;

/// An external task-execution cluster, treated as a collaborator: submit a
/// task, gather its result.
pub trait ClusterClient {
    type Handle;

    /// Submit one grid point's job; the index doubles as the task key.
    fn submit(&self, index: usize, job: SweepJob) -> Self::Handle;

    /// Resolve the submitted handles, in submission order.
    fn gather(&self, handles: Vec<Self::Handle>) -> Result<Vec<MetricVector>, PseError>;
}

/// The outcome of a distributed sweep: reduced results, or the unresolved
/// handles when no reduction was configured.
pub enum DistributedOutcome<H> {
    Reduced(Vec<MetricVector>),
    Pending(Vec<H>),
}

/// The distributed scheduling strategy: grid points are mapped onto a
/// [`ClusterClient`]; results are gathered and reduced cluster-side when a
/// reduction is configured.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct DistributedExec<C: Sweepable, B: Backend<C>> {
    pub seq: ConfigSequence<C>,
    pub post: PostProcess,
    #[derivative(Debug = "ignore")]
    pub backend: Arc<B>,
    pub checkpoint: Option<CheckpointStore>,
}

impl<C, B> DistributedExec<C, B>
where
    C: Sweepable + Send + Sync + 'static,
    B: Backend<C> + 'static,
{
    pub fn run<Cl: ClusterClient>(
        &self,
        client: &Cl,
    ) -> Result<DistributedOutcome<Cl::Handle>, PseError> {
        if let Some(store) = &self.checkpoint {
            store.init(self.seq.grid())?;
        }

        let mut handles = Vec::with_capacity(self.seq.len());
        for index in 0..self.seq.len() {
            let config = self.seq.configure_at(index)?;
            let backend = self.backend.clone();
            let metrics = self.post.metrics.clone();
            let store = self.checkpoint.clone();
            let job: SweepJob = Box::new(move || {
                if let Some(vector) = store.as_ref().and_then(|s| s.load(index)) {
                    return Ok(vector);
                }
                let output = backend.run(&config)?;
                let vector = evaluate_metrics(&metrics, &output);
                if let Some(store) = &store {
                    store.save(index, &vector)?;
                }
                Ok(vector)
            });
            handles.push(client.submit(index, job));
        }

        match &self.post.reduction {
            Some(reduction) => {
                let results = client.gather(handles)?;
                reduction.reduce(&results)?;
                Ok(DistributedOutcome::Reduced(results))
            }
            None => Ok(DistributedOutcome::Pending(handles)),
        }
    }
}

/// An in-process stand-in for a remote cluster: every submitted job runs on
/// its own OS thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadClusterClient;

impl ClusterClient for ThreadClusterClient {
    type Handle = std::thread::JoinHandle<Result<MetricVector, PseError>>;

    fn submit(&self, _index: usize, job: SweepJob) -> Self::Handle {
        std::thread::spawn(job)
    }

    fn gather(&self, handles: Vec<Self::Handle>) -> Result<Vec<MetricVector>, PseError> {
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .map_err(|_| PseError::BackendError("A sweep worker panicked".to_string()))?
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{OscillatorBackend, Simulator};
    use crate::grid::{ParameterGrid, ParameterSpec};
    use crate::metrics::metrics_from_names;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Counts backend executions so tests can assert on checkpoint reuse.
    #[derive(Debug, Default)]
    struct CountingBackend {
        inner: OscillatorBackend,
        runs: AtomicUsize,
    }

    impl Backend<Simulator> for CountingBackend {
        fn run(&self, config: &Simulator) -> Result<crate::series::SimulationOutput, PseError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            self.inner.run(config)
        }
    }

    #[derive(Debug, Default)]
    struct CountingProgress {
        count: AtomicUsize,
    }

    impl ProgressReporter for CountingProgress {
        fn advance(&self) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn toy_sequence() -> ConfigSequence<Simulator> {
        let grid = ParameterGrid::new(
            ParameterSpec::scalars("coupling", &[0.0, 0.5]),
            ParameterSpec::scalars("conduction_speed", &[1.0, 2.0, 3.0]),
        )
        .unwrap();
        let mut template = Simulator::default();
        template.num_nodes = 4;
        ConfigSequence::new(template.configure().unwrap(), grid).unwrap()
    }

    fn toy_metrics() -> Vec<Box<dyn Metric>> {
        metrics_from_names(
            &["GlobalVariance".to_string(), "KuramotoIndex".to_string()],
            1.0,
        )
        .unwrap()
    }

    fn local_exec(
        backend: Arc<CountingBackend>,
        checkpoint: Option<CheckpointStore>,
        progress: Arc<CountingProgress>,
    ) -> LocalExec<Simulator, CountingBackend> {
        LocalExec {
            seq: toy_sequence(),
            post: PostProcess::new(toy_metrics(), None),
            backend,
            checkpoint,
            progress: Some(progress),
        }
    }

    #[test]
    fn test_local_run_order_and_progress() {
        let backend = Arc::new(CountingBackend::default());
        let progress = Arc::new(CountingProgress::default());
        let exec = local_exec(backend.clone(), None, progress.clone());

        let results = exec.run(3).unwrap();
        assert_eq!(results.len(), 6);
        assert_eq!(backend.runs.load(Ordering::SeqCst), 6);
        assert_eq!(progress.count.load(Ordering::SeqCst), 6);
        for vector in &results {
            assert_eq!(vector.len(), 2);
        }

        // Same grid, serial execution: identical vectors in identical order.
        let serial_backend = Arc::new(CountingBackend::default());
        let serial = local_exec(serial_backend, None, Arc::new(CountingProgress::default()));
        assert_eq!(serial.run(1).unwrap(), results);
    }

    #[test]
    fn test_checkpoint_resume_skips_completed_points() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("sweep"));

        let backend = Arc::new(CountingBackend::default());
        let exec = local_exec(
            backend.clone(),
            Some(store.clone()),
            Arc::new(CountingProgress::default()),
        );
        let first = exec.run(2).unwrap();
        assert_eq!(backend.runs.load(Ordering::SeqCst), 6);

        // Second run with the same checkpoint dir: zero backend executions.
        let resumed_backend = Arc::new(CountingBackend::default());
        let progress = Arc::new(CountingProgress::default());
        let resumed = local_exec(resumed_backend.clone(), Some(store), progress.clone());
        let second = resumed.run(2).unwrap();
        assert_eq!(resumed_backend.runs.load(Ordering::SeqCst), 0);
        assert_eq!(second, first);
        // Checkpoint hits still count as completed points.
        assert_eq!(progress.count.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_partial_checkpoint_triggers_remaining_runs_only() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("sweep"));
        store.init(toy_sequence().grid()).unwrap();
        for index in 0..3 {
            store.save(index, &vec![0.0, 0.0]).unwrap();
        }

        let backend = Arc::new(CountingBackend::default());
        let exec = local_exec(
            backend.clone(),
            Some(store),
            Arc::new(CountingProgress::default()),
        );
        let results = exec.run(2).unwrap();
        assert_eq!(backend.runs.load(Ordering::SeqCst), 3);
        assert_eq!(results.len(), 6);
        for index in 0..3 {
            assert_eq!(results[index], vec![0.0, 0.0]);
        }
    }

    #[test]
    fn test_file_progress_reporter_counts_under_contention() {
        let dir = tempdir().unwrap();
        let reporter = Arc::new(FileProgressReporter::new(dir.path().join("status.txt")));
        reporter.init().unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reporter = reporter.clone();
                std::thread::spawn(move || {
                    for _ in 0..5 {
                        reporter.advance();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let content = fs::read_to_string(dir.path().join("status.txt")).unwrap();
        assert_eq!(content, "40");
    }

    #[test]
    fn test_distributed_reduced_matches_local() {
        let backend = Arc::new(CountingBackend::default());
        let local = local_exec(backend, None, Arc::new(CountingProgress::default()));
        let expected = local.run(2).unwrap();

        let dir = tempdir().unwrap();
        let exec = DistributedExec {
            seq: toy_sequence(),
            post: PostProcess::new(
                toy_metrics(),
                Some(Box::new(crate::reduce::SaveMetricsToDisk {
                    filename: dir.path().join("metrics.json"),
                })),
            ),
            backend: Arc::new(CountingBackend::default()),
            checkpoint: None,
        };
        match exec.run(&ThreadClusterClient).unwrap() {
            DistributedOutcome::Reduced(results) => assert_eq!(results, expected),
            DistributedOutcome::Pending(_) => panic!("expected a reduced outcome"),
        }
        assert!(dir.path().join("metrics.json").exists());
    }

    #[test]
    fn test_distributed_without_reduction_returns_pending_handles() {
        let exec = DistributedExec {
            seq: toy_sequence(),
            post: PostProcess::new(toy_metrics(), None),
            backend: Arc::new(CountingBackend::default()),
            checkpoint: None,
        };
        match exec.run(&ThreadClusterClient).unwrap() {
            DistributedOutcome::Pending(handles) => {
                assert_eq!(handles.len(), 6);
                let results = ThreadClusterClient.gather(handles).unwrap();
                assert_eq!(results.len(), 6);
            }
            DistributedOutcome::Reduced(_) => panic!("expected pending handles"),
        }
    }
}
