// ABOUTME: Root module for refectory - a ring of agents sharing exclusive resources.
// ABOUTME: Re-exports the public types from submodules.

pub mod agent;
pub mod config;
pub mod error;
pub mod hook;
pub mod orchestrator;
pub mod prelude;
pub mod resource;

pub use error::{ConfigError, SimulationError};
