// ABOUTME: Prelude module - convenient imports for common use cases.
// ABOUTME: Use `use refectory::prelude::*;` to get started quickly.

pub use crate::agent::{Agent, AgentOutcome, AgentReport, AgentState, Shutdown, Side};
pub use crate::config::{AcquisitionStrategy, SimulationConfig};
pub use crate::error::{ConfigError, SimulationError};
pub use crate::hook::{Hook, HookEvent, HookRegistry};
pub use crate::orchestrator::{Orchestrator, RunReport};
pub use crate::resource::{Acquire, ExclusiveResource, ResourceGuard, ResourcePool};
