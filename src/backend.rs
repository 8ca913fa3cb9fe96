//! Pluggable simulation backends and the default simulator configuration.
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::error::PseError;
use crate::grid::ParamValue;
use crate::sequence::{Setter, Sweepable};
use crate::series::SimulationOutput;

/// A simulation backend: executes one finalized configuration and returns
/// the run's time axis and output tensor.
///
/// Implementations must be invokable from multiple concurrent workers; the
/// engine hands each call its own configuration clone.
pub trait Backend<C>: Send + Sync {
    fn run(&self, config: &C) -> Result<SimulationOutput, PseError>;
}

/// The default simulator configuration.
///
/// The engine treats it as opaque apart from the attributes reachable through
/// [`Sweepable::setter`]. A template must be finalized with [`Simulator::configure`]
/// before it can seed a configuration sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simulator {
    /// Global coupling strength between nodes.
    pub coupling: f64,
    /// Signal propagation speed, in mm/ms.
    pub conduction_speed: f64,
    /// Standard deviation of the additive observation noise.
    pub noise_sigma: f64,
    /// Display title of the connectivity in use.
    pub connectivity: String,
    /// Number of simulated nodes.
    pub num_nodes: usize,
    /// Monitor sampling period, in ms.
    pub sample_period: f64,
    /// Total simulated time, in ms.
    pub simulation_length: f64,
    /// Base seed for the noise stream.
    pub seed: u64,
    configured: bool,
}

impl Default for Simulator {
    fn default() -> Self {
        Simulator {
            coupling: 0.1,
            conduction_speed: 3.0,
            noise_sigma: 0.01,
            connectivity: "default".to_string(),
            num_nodes: 8,
            sample_period: 1.0,
            simulation_length: 1000.0,
            seed: 42,
            configured: false,
        }
    }
}

impl Simulator {
    /// Finalize the configuration, validating its fields.
    pub fn configure(mut self) -> Result<Self, PseError> {
        if self.sample_period <= 0.0 {
            return Err(PseError::InvalidParameter(
                "The sample period must be positive".to_string(),
            ));
        }
        if self.simulation_length < self.sample_period {
            return Err(PseError::InvalidParameter(
                "The simulation length must cover at least one sample".to_string(),
            ));
        }
        if self.conduction_speed <= 0.0 {
            return Err(PseError::InvalidParameter(
                "The conduction speed must be positive".to_string(),
            ));
        }
        if self.num_nodes == 0 {
            return Err(PseError::InvalidParameter(
                "The simulator needs at least one node".to_string(),
            ));
        }
        self.configured = true;
        Ok(self)
    }

    fn expect_scalar(value: &ParamValue) -> Result<f64, PseError> {
        match value {
            ParamValue::Scalar(x) => Ok(*x),
            // A 1-element vector is accepted where a scalar is expected.
            ParamValue::Vector(v) if v.len() == 1 => Ok(v[0]),
            other => Err(PseError::InvalidParameter(format!(
                "Expected a scalar value, got {}",
                other
            ))),
        }
    }
}

impl Sweepable for Simulator {
    fn setter(name: &str) -> Option<Setter<Self>> {
        match name {
            "coupling" => Some(|config, value| {
                config.coupling = Simulator::expect_scalar(value)?;
                Ok(())
            }),
            "conduction_speed" => Some(|config, value| {
                config.conduction_speed = Simulator::expect_scalar(value)?;
                Ok(())
            }),
            "noise_sigma" => Some(|config, value| {
                config.noise_sigma = Simulator::expect_scalar(value)?;
                Ok(())
            }),
            "connectivity" => Some(|config, value| {
                match value {
                    ParamValue::Object { title } => {
                        config.connectivity = title.clone();
                        Ok(())
                    }
                    other => Err(PseError::InvalidParameter(format!(
                        "Expected a connectivity object, got {}",
                        other
                    ))),
                }
            }),
            _ => None,
        }
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}

/// The default backend: a deterministic network of phase oscillators.
///
/// Stronger coupling pulls node phases together, higher conduction speed
/// shortens the inter-node lags, and the noise stream is seeded from the
/// configuration so identical configurations produce identical outputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OscillatorBackend;

impl OscillatorBackend {
    /// Base oscillation frequency, in cycles per ms.
    const FREQUENCY: f64 = 0.01;

    fn noise_seed(config: &Simulator) -> u64 {
        config.seed
            ^ config.coupling.to_bits()
            ^ config.conduction_speed.to_bits().rotate_left(17)
            ^ config.noise_sigma.to_bits().rotate_left(31)
    }
}

impl Backend<Simulator> for OscillatorBackend {
    fn run(&self, config: &Simulator) -> Result<SimulationOutput, PseError> {
        if !config.is_configured() {
            return Err(PseError::BackendError(
                "Cannot run an unconfigured simulator".to_string(),
            ));
        }

        let num_steps = (config.simulation_length / config.sample_period) as usize;
        let times: Vec<f64> = (0..num_steps)
            .map(|t| t as f64 * config.sample_period)
            .collect();

        let mut rng = StdRng::seed_from_u64(Self::noise_seed(config));
        let noise = Normal::new(0.0, config.noise_sigma.max(f64::MIN_POSITIVE))
            .map_err(|e| PseError::BackendError(format!("Invalid noise distribution: {}", e)))?;

        let omega = 2.0 * std::f64::consts::PI * Self::FREQUENCY;
        // Phase lag between neighbouring nodes: shrinks with coupling and speed.
        let spread = (1.0 - config.coupling).max(0.0) / config.conduction_speed;

        let mut data = Vec::with_capacity(num_steps * config.num_nodes);
        for t in 0..num_steps {
            let time = times[t];
            for n in 0..config.num_nodes {
                let phase = omega * time + spread * n as f64;
                data.push(phase.cos() + noise.sample(&mut rng));
            }
        }

        SimulationOutput::new(times, data, (num_steps, 1, config.num_nodes, 1))
    }
}
