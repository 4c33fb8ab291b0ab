// ABOUTME: Agent life-cycle states and the sides an agent picks resources up from.
// ABOUTME: Used for tracing, hook events, and the final agent report.

use serde::{Deserialize, Serialize};

/// Where an agent is in its think / pick up / eat cycle.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    /// Created but not yet running.
    Idle,
    /// Sleeping without holding anything.
    Thinking,
    /// Waiting for the left resource.
    AcquiringLeft,
    /// Waiting for the right resource.
    AcquiringRight,
    /// Holding both resources.
    Eating,
    /// Observed an empty pool and stopped.
    Done,
    /// Stopped by a shutdown request.
    Cancelled,
}

impl AgentState {
    /// The state of an agent waiting for the resource on `side`.
    pub fn acquiring(side: Side) -> Self {
        match side {
            Side::Left => AgentState::AcquiringLeft,
            Side::Right => AgentState::AcquiringRight,
        }
    }

    /// Returns true once the agent will not run again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentState::Done | AgentState::Cancelled)
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentState::Idle => write!(f, "idle"),
            AgentState::Thinking => write!(f, "thinking"),
            AgentState::AcquiringLeft => write!(f, "acquiring left"),
            AgentState::AcquiringRight => write!(f, "acquiring right"),
            AgentState::Eating => write!(f, "eating"),
            AgentState::Done => write!(f, "done"),
            AgentState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Which of an agent's two resources an event refers to.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Left,
    Right,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Left => write!(f, "LEFT"),
            Side::Right => write!(f, "RIGHT"),
        }
    }
}
