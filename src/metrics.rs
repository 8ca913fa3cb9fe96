//! Summary statistics computed from a completed simulation run.
//!
//! Every metric is a pure function of the simulation output; metrics share no
//! state and a failure in one of them never aborts a grid point, its slot in
//! the metric vector is filled with NaN instead.
use crate::error::PseError;
use crate::series::SimulationOutput;

/// The ordered per-grid-point results, one or more entries per requested
/// metric, concatenated in request order.
pub type MetricVector = Vec<f64>;

/// The catalog of metric names accepted by [`metrics_from_names`].
pub const METRICS: [&str; 5] = [
    "GlobalVariance",
    "KuramotoIndex",
    "ProxyMetastabilitySynchrony-Metastability",
    "ProxyMetastabilitySynchrony-Synchrony",
    "VarianceNodeVariance",
];

/// Default time offset (in the time axis unit) before which samples are discarded.
pub const DEFAULT_START_POINT: f64 = 500.0;
/// Default decimation step applied after the start point.
pub const DEFAULT_SEGMENT: usize = 4;

/// A summary statistic for a simulation.
pub trait Metric: Send + Sync {
    /// The catalog name of the metric.
    fn name(&self) -> &str;

    /// Compute the statistic from one run's output.
    fn compute(&self, output: &SimulationOutput) -> Result<Vec<f64>, PseError>;
}

fn mean(z: &[f64]) -> f64 {
    z.iter().sum::<f64>() / z.len() as f64
}

fn variance(z: &[f64]) -> f64 {
    let m = mean(z);
    z.iter().map(|zi| (zi - m) * (zi - m)).sum::<f64>() / z.len() as f64
}

fn std_dev(z: &[f64]) -> f64 {
    variance(z).sqrt()
}

/// One channel's time course, trimmed to samples at or after `start_point`
/// and decimated by `segment`.
fn trimmed_series(
    output: &SimulationOutput,
    v: usize,
    n: usize,
    m: usize,
    start_point: f64,
    segment: usize,
) -> Vec<f64> {
    let start = output.sample_at(start_point);
    (start..output.num_times())
        .step_by(segment)
        .map(|t| output.value(t, v, n, m))
        .collect()
}

/// The Kuramoto order parameter `r(t)` over all nodes of the first state
/// variable and mode.
///
/// Instantaneous phases are estimated from the quadrature pair formed by the
/// zero-centered signal and its rescaled time derivative, a narrowband
/// approximation of the analytic signal.
fn order_parameter_series(output: &SimulationOutput) -> Result<Vec<f64>, PseError> {
    let num_times = output.num_times();
    let num_nodes = output.num_nodes();
    if num_times < 3 {
        return Err(PseError::InvalidParameter(format!(
            "Phase estimation requires at least 3 time samples, got {}",
            num_times
        )));
    }

    let mut phases: Vec<Vec<f64>> = Vec::with_capacity(num_nodes);
    for n in 0..num_nodes {
        let series = output.node_series(0, n, 0);
        let center = mean(&series);
        let centered: Vec<f64> = series.iter().map(|x| x - center).collect();

        let mut derivative = vec![0.0; num_times];
        derivative[0] = centered[1] - centered[0];
        derivative[num_times - 1] = centered[num_times - 1] - centered[num_times - 2];
        for t in 1..num_times - 1 {
            derivative[t] = (centered[t + 1] - centered[t - 1]) / 2.0;
        }

        let derivative_std = std_dev(&derivative);
        if derivative_std == 0.0 {
            return Err(PseError::InvalidParameter(
                "Cannot estimate phases of a constant signal".to_string(),
            ));
        }
        let scale = std_dev(&centered) / derivative_std;

        phases.push(
            centered
                .iter()
                .zip(derivative.iter())
                .map(|(x, d)| (-d * scale).atan2(*x))
                .collect(),
        );
    }

    Ok((0..num_times)
        .map(|t| {
            let (re, im) = phases
                .iter()
                .fold((0.0, 0.0), |(re, im), phase| {
                    (re + phase[t].cos(), im + phase[t].sin())
                });
            (re * re + im * im).sqrt() / num_nodes as f64
        })
        .collect())
}

/// Variance of the zero-centered output over all channels and retained samples.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalVariance {
    pub sample_period: f64,
    pub start_point: f64,
    pub segment: usize,
}

impl GlobalVariance {
    pub fn new(sample_period: f64) -> Self {
        GlobalVariance {
            sample_period,
            start_point: DEFAULT_START_POINT,
            segment: DEFAULT_SEGMENT,
        }
    }
}

impl Metric for GlobalVariance {
    fn name(&self) -> &str {
        "GlobalVariance"
    }

    fn compute(&self, output: &SimulationOutput) -> Result<Vec<f64>, PseError> {
        let (_, num_svars, num_nodes, num_modes) = output.shape();
        let mut samples = Vec::new();
        for v in 0..num_svars {
            for n in 0..num_nodes {
                for m in 0..num_modes {
                    samples.extend(trimmed_series(
                        output,
                        v,
                        n,
                        m,
                        self.start_point,
                        self.segment,
                    ));
                }
            }
        }
        if samples.is_empty() {
            return Err(PseError::InvalidParameter(format!(
                "No samples left after start point {}",
                self.start_point
            )));
        }
        Ok(vec![variance(&samples)])
    }
}

/// Time-averaged Kuramoto order parameter of the node phases.
#[derive(Debug, Clone, PartialEq)]
pub struct KuramotoIndex {
    pub sample_period: f64,
}

impl KuramotoIndex {
    pub fn new(sample_period: f64) -> Self {
        KuramotoIndex { sample_period }
    }
}

impl Metric for KuramotoIndex {
    fn name(&self) -> &str {
        "KuramotoIndex"
    }

    fn compute(&self, output: &SimulationOutput) -> Result<Vec<f64>, PseError> {
        let order = order_parameter_series(output)?;
        Ok(vec![mean(&order)])
    }
}

/// Which statistic of the order-parameter course a
/// [`ProxyMetastabilitySynchrony`] metric reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyMode {
    Metastability,
    Synchrony,
}

/// Synchrony (temporal mean) or metastability (temporal deviation) of the
/// Kuramoto order parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyMetastabilitySynchrony {
    pub mode: ProxyMode,
    pub sample_period: f64,
    pub start_point: f64,
    pub segment: usize,
}

impl ProxyMetastabilitySynchrony {
    pub fn new(mode: ProxyMode, sample_period: f64) -> Self {
        ProxyMetastabilitySynchrony {
            mode,
            sample_period,
            start_point: DEFAULT_START_POINT,
            segment: DEFAULT_SEGMENT,
        }
    }
}

impl Metric for ProxyMetastabilitySynchrony {
    fn name(&self) -> &str {
        match self.mode {
            ProxyMode::Metastability => "ProxyMetastabilitySynchrony-Metastability",
            ProxyMode::Synchrony => "ProxyMetastabilitySynchrony-Synchrony",
        }
    }

    fn compute(&self, output: &SimulationOutput) -> Result<Vec<f64>, PseError> {
        let order = order_parameter_series(output)?;
        let start = output.sample_at(self.start_point);
        let retained: Vec<f64> = order
            .into_iter()
            .skip(start)
            .step_by(self.segment)
            .collect();
        if retained.is_empty() {
            return Err(PseError::InvalidParameter(format!(
                "No samples left after start point {}",
                self.start_point
            )));
        }
        match self.mode {
            ProxyMode::Synchrony => Ok(vec![mean(&retained)]),
            ProxyMode::Metastability => Ok(vec![std_dev(&retained)]),
        }
    }
}

/// Variance across nodes of the per-node temporal variances.
#[derive(Debug, Clone, PartialEq)]
pub struct VarianceNodeVariance {
    pub sample_period: f64,
    pub start_point: f64,
    pub segment: usize,
}

impl VarianceNodeVariance {
    pub fn new(sample_period: f64) -> Self {
        VarianceNodeVariance {
            sample_period,
            start_point: DEFAULT_START_POINT,
            segment: DEFAULT_SEGMENT,
        }
    }
}

impl Metric for VarianceNodeVariance {
    fn name(&self) -> &str {
        "VarianceNodeVariance"
    }

    fn compute(&self, output: &SimulationOutput) -> Result<Vec<f64>, PseError> {
        let node_variances: Vec<f64> = (0..output.num_nodes())
            .map(|n| {
                let series = trimmed_series(output, 0, n, 0, self.start_point, self.segment);
                if series.is_empty() {
                    Err(PseError::InvalidParameter(format!(
                        "No samples left after start point {}",
                        self.start_point
                    )))
                } else {
                    Ok(variance(&series))
                }
            })
            .collect::<Result<_, _>>()?;
        Ok(vec![variance(&node_variances)])
    }
}

/// Per-node deviation over the second half of the run. A simplistic
/// simulation statistic, one entry per node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeVariability;

impl Metric for NodeVariability {
    fn name(&self) -> &str {
        "NodeVariability"
    }

    fn compute(&self, output: &SimulationOutput) -> Result<Vec<f64>, PseError> {
        let times = output.times();
        if times.is_empty() {
            return Err(PseError::InvalidParameter(
                "Empty time axis".to_string(),
            ));
        }
        let start = output.sample_at(times[times.len() - 1] / 2.0);
        Ok((0..output.num_nodes())
            .map(|n| {
                let series: Vec<f64> = (start..output.num_times())
                    .map(|t| output.value(t, 0, n, 0))
                    .collect();
                std_dev(&series)
            })
            .collect())
    }
}

/// Resolve requested metric names against the catalog.
pub fn metrics_from_names(
    names: &[String],
    sample_period: f64,
) -> Result<Vec<Box<dyn Metric>>, PseError> {
    names
        .iter()
        .map(|name| -> Result<Box<dyn Metric>, PseError> {
            match name.as_str() {
                "GlobalVariance" => Ok(Box::new(GlobalVariance::new(sample_period))),
                "KuramotoIndex" => Ok(Box::new(KuramotoIndex::new(sample_period))),
                "ProxyMetastabilitySynchrony-Metastability" => Ok(Box::new(
                    ProxyMetastabilitySynchrony::new(ProxyMode::Metastability, sample_period),
                )),
                "ProxyMetastabilitySynchrony-Synchrony" => Ok(Box::new(
                    ProxyMetastabilitySynchrony::new(ProxyMode::Synchrony, sample_period),
                )),
                "VarianceNodeVariance" => Ok(Box::new(VarianceNodeVariance::new(sample_period))),
                "NodeVariability" => Ok(Box::new(NodeVariability)),
                other => Err(PseError::UnknownMetric(other.to_string())),
            }
        })
        .collect()
}

/// Evaluate every metric on one run's output, concatenating the results in
/// request order. A failing metric contributes a single NaN slot and the
/// evaluation continues.
pub fn evaluate_metrics(metrics: &[Box<dyn Metric>], output: &SimulationOutput) -> MetricVector {
    let mut vector = MetricVector::new();
    for metric in metrics {
        match metric.compute(output) {
            Ok(values) => vector.extend(values),
            Err(e) => {
                log::warn!("Metric {} failed: {}", metric.name(), e);
                vector.push(f64::NAN);
            }
        }
    }
    vector
}
