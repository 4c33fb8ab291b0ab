// ABOUTME: Defines all error types for the refectory library using thiserror.
// ABOUTME: Configuration problems and failed runs, unified under SimulationError.

/// Top-level error type for the refectory library.
///
/// Lock timeouts and pool exhaustion are part of normal operation and never
/// show up here.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{failed} agent(s) failed; the rest consumed {total_consumed} unit(s)")]
    AgentsFailed { failed: usize, total_consumed: u64 },
}

/// Errors from building or loading a simulation configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("a ring needs at least one agent")]
    NoAgents,

    #[error("acquire timeout must be greater than zero")]
    ZeroTimeout,

    #[error("invalid value for {var}: '{value}'")]
    InvalidEnv { var: String, value: String },

    #[error("unknown acquisition strategy '{0}' (expected 'timeout' or 'ordered')")]
    UnknownStrategy(String),
}
