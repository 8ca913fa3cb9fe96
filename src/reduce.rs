//! Reduction of per-grid-point metric vectors into the final result cube.
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PseError;
use crate::grid::{AxisLabel, ParamValue};
use crate::metrics::MetricVector;
use crate::utils::{nan_cube, to_nullable};

/// The durable output artifact of a sweep, consumed by the visualization
/// widget. Read-only once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PseResult {
    pub x_title: String,
    pub y_title: String,
    pub x_value: Vec<AxisLabel>,
    pub y_value: Vec<AxisLabel>,
    pub metrics_names: Vec<String>,
    /// The metric cube, indexed `[metric][x][y]`.
    #[serde(with = "nan_cube")]
    pub results: Vec<Vec<Vec<f64>>>,
}

impl PseResult {
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), PseError> {
        let file = File::create(path.as_ref())
            .map_err(|e| PseError::IoError(format!("Failed to create result file: {}", e)))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|e| PseError::IoError(format!("Failed to write result file: {}", e)))?;
        writer
            .flush()
            .map_err(|e| PseError::IoError(format!("Failed to flush result file: {}", e)))
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<PseResult, PseError> {
        let file = File::open(path.as_ref())
            .map_err(|e| PseError::IoError(format!("Failed to open result file: {}", e)))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| PseError::IoError(format!("Failed to read result file: {}", e)))
    }
}

/// Aggregates the ordered per-grid-point metric vectors at sweep completion.
pub trait Reduction: Send + Sync {
    fn reduce(&self, metrics: &[MetricVector]) -> Result<(), PseError>;
}

/// Reshapes the flat metric vectors into a `[metric][x][y]` cube and persists
/// it as a self-describing result container.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveDataToDisk {
    pub param1: String,
    pub param2: String,
    pub x_values: Vec<ParamValue>,
    pub y_values: Vec<ParamValue>,
    pub metrics: Vec<String>,
    pub file_name: PathBuf,
}

impl Reduction for SaveDataToDisk {
    fn reduce(&self, metrics: &[MetricVector]) -> Result<(), PseError> {
        let nx = self.x_values.len();
        let ny = self.y_values.len();
        if metrics.len() != nx * ny {
            return Err(PseError::ShapeMismatch(format!(
                "Got {} metric vectors for a {}x{} grid",
                metrics.len(),
                nx,
                ny
            )));
        }
        for (index, vector) in metrics.iter().enumerate() {
            if vector.len() != self.metrics.len() {
                return Err(PseError::ShapeMismatch(format!(
                    "Metric vector {} has {} entries, expected {}",
                    index,
                    vector.len(),
                    self.metrics.len()
                )));
            }
        }

        // Row-major inverse of the sweep iteration order: index = x * ny + y.
        let results: Vec<Vec<Vec<f64>>> = (0..self.metrics.len())
            .map(|k| {
                (0..nx)
                    .map(|i| (0..ny).map(|j| metrics[i * ny + j][k]).collect())
                    .collect()
            })
            .collect();

        let result = PseResult {
            x_title: self.param1.clone(),
            y_title: self.param2.clone(),
            x_value: self.x_values.iter().map(|v| v.axis_label()).collect(),
            y_value: self.y_values.iter().map(|v| v.axis_label()).collect(),
            metrics_names: self.metrics.clone(),
            results,
        };
        result.save_to(&self.file_name)?;
        log::info!("{} file created", self.file_name.display());
        Ok(())
    }
}

/// Dumps the raw metric vectors, one row per grid index, without reshaping.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveMetricsToDisk {
    pub filename: PathBuf,
}

impl Reduction for SaveMetricsToDisk {
    fn reduce(&self, metrics: &[MetricVector]) -> Result<(), PseError> {
        let rows: Vec<Vec<Option<f64>>> = metrics.iter().map(|v| to_nullable(v)).collect();
        let file = File::create(&self.filename)
            .map_err(|e| PseError::IoError(format!("Failed to create metrics file: {}", e)))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &rows)
            .map_err(|e| PseError::IoError(format!("Failed to write metrics file: {}", e)))?;
        writer
            .flush()
            .map_err(|e| PseError::IoError(format!("Failed to flush metrics file: {}", e)))
    }
}
