// ABOUTME: Aggregated result of a simulation run.
// ABOUTME: Per-agent reports plus totals, with helpers to flag partial runs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agent::{AgentOutcome, AgentReport};
use crate::error::SimulationError;

/// Result of running every agent at the ring to completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique identifier of this run.
    pub run_id: String,

    /// Units the pool started with.
    pub capacity: u64,

    /// Units still in the pool when the last agent stopped.
    pub remaining: u64,

    /// Sum of every agent's count.
    pub total_consumed: u64,

    /// Wall-clock time from first spawn to last join.
    pub elapsed: Duration,

    /// One report per agent, in seat order.
    pub agents: Vec<AgentReport>,
}

impl RunReport {
    /// Returns true if every agent ran to completion.
    pub fn is_complete(&self) -> bool {
        self.agents
            .iter()
            .all(|agent| agent.outcome == AgentOutcome::Completed)
    }

    /// Agents whose task ended abnormally.
    pub fn failed_agents(&self) -> impl Iterator<Item = &AgentReport> {
        self.agents
            .iter()
            .filter(|agent| matches!(agent.outcome, AgentOutcome::Failed(_)))
    }

    /// Count of one agent, by seat.
    pub fn consumed_by(&self, index: usize) -> Option<u64> {
        self.agents
            .iter()
            .find(|agent| agent.index == index)
            .map(|agent| agent.consumed)
    }

    /// Turn a run with failed agents into an error.
    ///
    /// Cancelled agents are not failures.
    pub fn into_result(self) -> Result<Self, SimulationError> {
        let failed = self.failed_agents().count();
        if failed > 0 {
            return Err(SimulationError::AgentsFailed {
                failed,
                total_consumed: self.total_consumed,
            });
        }
        Ok(self)
    }
}
