// ABOUTME: Orchestrator module - assembles the ring, runs all agents, aggregates results.
// ABOUTME: Contains the Orchestrator and the RunReport it produces.

mod orchestrator;
mod report;

pub use orchestrator::Orchestrator;
pub use report::RunReport;
