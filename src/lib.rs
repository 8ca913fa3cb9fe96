//! This crate provides a parameter space exploration (PSE) engine for neural
//! simulation sweeps.
//!
//! A sweep expands two named parameters into the Cartesian product of
//! simulator configurations, runs each configuration through a pluggable
//! backend, summarizes every run with a set of metrics, and reduces the
//! per-point metric vectors into a `[metric][x][y]` result cube persisted for
//! later visualization. Completed points are checkpointed so an interrupted
//! sweep can be resumed.
//!
//! # Building a Sweep
//!
//! ```rust
//! use pse_engine::backend::Simulator;
//! use pse_engine::grid::{ParameterGrid, ParameterSpec};
//! use pse_engine::sequence::ConfigSequence;
//!
//! let grid = ParameterGrid::new(
//!     ParameterSpec::scalars("coupling", &[0.1, 0.2]),
//!     ParameterSpec::scalars("conduction_speed", &[1.0, 2.0, 3.0]),
//! ).unwrap();
//!
//! // The template must be finalized before the sequence clones it
//! let template = Simulator::default().configure().unwrap();
//! let seq = ConfigSequence::new(template, grid).unwrap();
//!
//! // One independent configuration per grid point, row-major
//! assert_eq!(seq.len(), 6);
//! let config = seq.configure_at(4).unwrap();
//! assert_eq!(config.coupling, 0.2);
//! assert_eq!(config.conduction_speed, 2.0);
//! ```
//!
//! # Running It
//!
//! [`launch::launch_local`] wires grid, sequence, metrics, and reduction
//! together and runs the sweep on a bounded thread pool; [`exec::LocalExec`]
//! and [`exec::DistributedExec`] expose the two scheduling strategies
//! directly.

pub mod backend;
pub mod checkpoint;
pub mod error;
pub mod exec;
pub mod grid;
pub mod launch;
pub mod metrics;
pub mod reduce;
pub mod sequence;
pub mod series;
pub mod utils;
