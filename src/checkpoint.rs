//! Per-grid-point checkpointing for resumable sweeps.
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::PseError;
use crate::grid::ParameterGrid;
use crate::metrics::MetricVector;
use crate::utils::{from_nullable, to_nullable};

const PARAMS_FILE: &str = "params.json";
const PARAM_VALUES_FILE: &str = "param_values.json";

/// Persists one metric vector per completed grid index under a per-sweep
/// directory, so an interrupted sweep can be resumed.
///
/// Each index is written by exactly one worker; no cross-index locking is
/// needed.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        CheckpointStore {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the checkpoint directory and write the grid metadata once.
    ///
    /// Idempotent: an existing directory is reused as-is, without
    /// revalidation against the current grid shape. Reusing a directory
    /// written for a differently-shaped grid silently yields stale vectors.
    pub fn init(&self, grid: &ParameterGrid) -> Result<(), PseError> {
        if self.dir.exists() {
            log::info!("Reusing existing checkpoint dir {}", self.dir.display());
            return Ok(());
        }
        fs::create_dir_all(&self.dir).map_err(|e| {
            PseError::IoError(format!(
                "Failed to create checkpoint dir {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let names = [&grid.axis1().name, &grid.axis2().name];
        self.write_json(PARAMS_FILE, &names)?;
        let values = [&grid.axis1().values, &grid.axis2().values];
        self.write_json(PARAM_VALUES_FILE, &values)?;
        Ok(())
    }

    fn write_json<T: serde::Serialize>(&self, name: &str, value: &T) -> Result<(), PseError> {
        let path = self.dir.join(name);
        let file = File::create(&path)
            .map_err(|e| PseError::IoError(format!("Failed to create {}: {}", path.display(), e)))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)
            .map_err(|e| PseError::IoError(format!("Failed to write {}: {}", path.display(), e)))?;
        writer
            .flush()
            .map_err(|e| PseError::IoError(format!("Failed to flush {}: {}", path.display(), e)))
    }

    fn record_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}.json", index))
    }

    /// The stored metric vector for a grid index, if any.
    ///
    /// Absence means "not yet computed". A corrupt record is treated the
    /// same way, with a warning, so the point gets recomputed.
    pub fn load(&self, index: usize) -> Option<MetricVector> {
        let path = self.record_path(index);
        if !path.exists() {
            return None;
        }
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) => {
                log::warn!("Could not open checkpoint {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_reader::<_, Vec<Option<f64>>>(BufReader::new(file)) {
            Ok(vector) => Some(from_nullable(vector)),
            Err(e) => {
                log::warn!(
                    "Corrupt checkpoint {}, recomputing: {}",
                    path.display(),
                    e
                );
                None
            }
        }
    }

    /// Persist the metric vector for a grid index. NaN sentinels survive the
    /// roundtrip as JSON nulls.
    pub fn save(&self, index: usize, vector: &MetricVector) -> Result<(), PseError> {
        self.write_json(&format!("{}.json", index), &to_nullable(vector))
    }
}
