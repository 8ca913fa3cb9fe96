//! Simulation output: a time axis and a 4-D output tensor.
use crate::error::PseError;

/// The result of running one simulator configuration.
///
/// The tensor is stored flat in row-major order with dimensions
/// `[time][state_var][node][mode]`, matching the shape simulation monitors
/// record.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutput {
    times: Vec<f64>,
    data: Vec<f64>,
    shape: (usize, usize, usize, usize),
}

impl SimulationOutput {
    /// Create an output from a time axis and a flat row-major tensor.
    pub fn new(
        times: Vec<f64>,
        data: Vec<f64>,
        shape: (usize, usize, usize, usize),
    ) -> Result<Self, PseError> {
        let (num_times, num_svars, num_nodes, num_modes) = shape;
        if times.len() != num_times {
            return Err(PseError::ShapeMismatch(format!(
                "Time axis has {} samples but the tensor declares {}",
                times.len(),
                num_times
            )));
        }
        if data.len() != num_times * num_svars * num_nodes * num_modes {
            return Err(PseError::ShapeMismatch(format!(
                "Tensor has {} entries but the shape {:?} requires {}",
                data.len(),
                shape,
                num_times * num_svars * num_nodes * num_modes
            )));
        }
        Ok(SimulationOutput { times, data, shape })
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn shape(&self) -> (usize, usize, usize, usize) {
        self.shape
    }

    pub fn num_times(&self) -> usize {
        self.shape.0
    }

    pub fn num_nodes(&self) -> usize {
        self.shape.2
    }

    /// The tensor entry at `(time, state_var, node, mode)`.
    pub fn value(&self, t: usize, v: usize, n: usize, m: usize) -> f64 {
        let (_, num_svars, num_nodes, num_modes) = self.shape;
        self.data[((t * num_svars + v) * num_nodes + n) * num_modes + m]
    }

    /// The time course of one `(state_var, node, mode)` channel.
    pub fn node_series(&self, v: usize, n: usize, m: usize) -> Vec<f64> {
        (0..self.num_times()).map(|t| self.value(t, v, n, m)).collect()
    }

    /// The index of the first sample at or after the given time offset.
    pub fn sample_at(&self, time: f64) -> usize {
        self.times.partition_point(|t| *t < time)
    }
}
