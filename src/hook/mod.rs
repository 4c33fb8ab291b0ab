// ABOUTME: Hook system for observing a run - agent life-cycle and resource events.
// ABOUTME: Provides events, the Hook trait, and a registry agents fire into.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::agent::{AgentOutcome, Side};

/// Events fired while a simulation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookEvent {
    /// Fired once before any agent starts.
    RunStart {
        run_id: String,
        agents: usize,
        capacity: u64,
    },

    /// Fired once after every agent has stopped.
    RunEnd {
        run_id: String,
        total_consumed: u64,
    },

    /// Fired when an agent's task begins.
    AgentStart { agent_id: String, index: usize },

    /// Fired when an agent's loop exits normally or by cancellation.
    AgentStop {
        agent_id: String,
        consumed: u64,
        outcome: AgentOutcome,
    },

    /// Fired right after an agent acquires a resource.
    PickedUp {
        agent_id: String,
        agent: usize,
        resource: String,
        side: Side,
    },

    /// Fired right before an agent releases a resource.
    PutDown {
        agent_id: String,
        agent: usize,
        resource: String,
        side: Side,
    },

    /// Fired when an agent claims a unit from the pool.
    Ate {
        agent_id: String,
        /// The agent's running total including this unit.
        consumed: u64,
        /// Units left in the pool after this claim.
        remaining: u64,
    },

    /// Fired when a bounded pick-up gives up.
    TimedOut {
        agent_id: String,
        resource: String,
        side: Side,
    },
}

impl HookEvent {
    /// Short name of the event kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            HookEvent::RunStart { .. } => "RunStart",
            HookEvent::RunEnd { .. } => "RunEnd",
            HookEvent::AgentStart { .. } => "AgentStart",
            HookEvent::AgentStop { .. } => "AgentStop",
            HookEvent::PickedUp { .. } => "PickedUp",
            HookEvent::PutDown { .. } => "PutDown",
            HookEvent::Ate { .. } => "Ate",
            HookEvent::TimedOut { .. } => "TimedOut",
        }
    }
}

/// Trait for implementing hooks.
///
/// Hooks run inline on the agent's task, so `PickedUp` and `PutDown` are
/// observed while the resource is actually held.
#[async_trait]
pub trait Hook: Send + Sync {
    /// Called when an event occurs.
    ///
    /// An `Err` is logged and otherwise ignored; it never stops an agent.
    async fn on_event(&self, event: &HookEvent) -> Result<(), anyhow::Error>;

    /// Optional: Filter which events this hook cares about.
    /// Default returns true for all events.
    fn accepts(&self, event: &HookEvent) -> bool {
        let _ = event;
        true
    }
}

/// Registry for managing and firing hooks.
pub struct HookRegistry {
    hooks: RwLock<Vec<Arc<dyn Hook>>>,
}

impl HookRegistry {
    /// Create a new empty hook registry.
    pub fn new() -> Self {
        Self {
            hooks: RwLock::new(Vec::new()),
        }
    }

    /// Register a hook.
    pub async fn register(&self, hook: impl Hook + 'static) {
        self.hooks.write().await.push(Arc::new(hook));
    }

    /// Register a hook wrapped in Arc.
    pub async fn register_arc(&self, hook: Arc<dyn Hook>) {
        self.hooks.write().await.push(hook);
    }

    /// Register a plain callback for every event.
    pub async fn on_event<F>(&self, f: F)
    where
        F: Fn(&HookEvent) + Send + Sync + 'static,
    {
        self.register(CallbackHook { callback: f }).await;
    }

    /// Fire an event to all registered hooks.
    ///
    /// Every accepting hook sees the event, even if an earlier one failed.
    /// Returns the first failure.
    pub async fn fire(&self, event: &HookEvent) -> Result<(), anyhow::Error> {
        let hooks = self.hooks.read().await;
        let mut first_error = None;

        for hook in hooks.iter() {
            if !hook.accepts(event) {
                continue;
            }

            if let Err(e) = hook.on_event(event).await {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Get the number of registered hooks.
    pub async fn len(&self) -> usize {
        self.hooks.read().await.len()
    }

    /// Check if the registry is empty.
    pub async fn is_empty(&self) -> bool {
        self.hooks.read().await.is_empty()
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Hook wrapper for plain callbacks.
struct CallbackHook<F> {
    callback: F,
}

#[async_trait]
impl<F> Hook for CallbackHook<F>
where
    F: Fn(&HookEvent) + Send + Sync,
{
    async fn on_event(&self, event: &HookEvent) -> Result<(), anyhow::Error> {
        (self.callback)(event);
        Ok(())
    }
}
