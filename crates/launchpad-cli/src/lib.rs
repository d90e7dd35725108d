//! Operator tooling for the launchpad engine: TOML configuration, fee
//! quotes and scripted simulations.

pub mod config;
pub mod scenario;

pub use config::{create_example_config, FeeConfig, LaunchpadConfig};
pub use scenario::{Scenario, Simulation, Step, StepReport};
