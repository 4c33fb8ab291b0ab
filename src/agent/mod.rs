// ABOUTME: Agent module - one seat at the ring and its life-cycle.
// ABOUTME: Provides the Agent runner, its states and report, and the shutdown signal.

mod runner;
mod shutdown;
mod state;

pub use runner::{Agent, AgentOutcome, AgentReport};
pub use shutdown::Shutdown;
pub use state::{AgentState, Side};
