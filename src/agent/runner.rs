// ABOUTME: Agent runner - executes the think / pick up / eat loop for one seat at the ring.
// ABOUTME: Handles bounded pick-ups, retry on timeout, cancellation, and per-agent counts.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::shutdown::Shutdown;
use super::state::{AgentState, Side};
use crate::config::{AcquisitionStrategy, SimulationConfig};
use crate::hook::{HookEvent, HookRegistry};
use crate::resource::{Acquire, ExclusiveResource, ResourceGuard, ResourcePool};

/// How an agent's run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum AgentOutcome {
    /// The agent saw an empty pool and stopped.
    Completed,
    /// Shutdown was requested before the pool ran out.
    Cancelled,
    /// The agent's task ended abnormally; its count is lost.
    Failed(String),
}

impl std::fmt::Display for AgentOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentOutcome::Completed => write!(f, "completed"),
            AgentOutcome::Cancelled => write!(f, "cancelled"),
            AgentOutcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Result from running an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReport {
    /// Identifier of the agent, e.g. `Philosopher-0`.
    pub agent_id: String,

    /// Seat of the agent around the ring.
    pub index: usize,

    /// Units this agent claimed from the pool.
    pub consumed: u64,

    /// Number of think / pick up / eat cycles started.
    pub attempts: u64,

    /// Number of pick-ups that gave up after the timeout.
    pub timeouts: u64,

    /// How the run ended.
    pub outcome: AgentOutcome,
}

impl AgentReport {
    /// Report for an agent whose task never returned a count.
    pub fn failed(agent_id: impl Into<String>, index: usize, reason: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            index,
            consumed: 0,
            attempts: 0,
            timeouts: 0,
            outcome: AgentOutcome::Failed(reason.into()),
        }
    }
}

/// Result of one think / pick up / eat cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cycle {
    /// Go back to the top of the loop and check the pool again.
    Continue,
    /// Shutdown interrupted the cycle.
    Cancelled,
}

/// Timings an agent runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Timing {
    think_time: Duration,
    think_jitter: Duration,
    eat_time: Duration,
    acquire_timeout: Duration,
}

/// One participant at the ring.
///
/// The agent holds shared references to its two resources and the pool,
/// and a private consumption count that nothing else touches. The count is
/// handed back in the [`AgentReport`] returned by [`Agent::run`].
pub struct Agent {
    agent_id: String,
    index: usize,
    left: Arc<ExclusiveResource>,
    right: Arc<ExclusiveResource>,
    pool: Arc<ResourcePool>,
    timing: Timing,
    strategy: AcquisitionStrategy,
    shutdown: Shutdown,
    hooks: Option<Arc<HookRegistry>>,
    state: AgentState,
    consumed: u64,
    attempts: u64,
    timeouts: u64,
}

impl Agent {
    /// Create an agent seated between `left` and `right`.
    ///
    /// # Panics
    ///
    /// Panics if `left` and `right` are the same resource, since an agent
    /// could never hold both.
    pub fn new(
        index: usize,
        left: Arc<ExclusiveResource>,
        right: Arc<ExclusiveResource>,
        pool: Arc<ResourcePool>,
        config: &SimulationConfig,
        shutdown: Shutdown,
    ) -> Self {
        assert!(
            !Arc::ptr_eq(&left, &right),
            "agent {index} needs two distinct resources"
        );

        Self {
            agent_id: format!("Philosopher-{}", index),
            index,
            left,
            right,
            pool,
            timing: Timing {
                think_time: config.think_time,
                think_jitter: config.think_jitter,
                eat_time: config.eat_time,
                acquire_timeout: config.acquire_timeout,
            },
            strategy: config.strategy,
            shutdown,
            hooks: None,
            state: AgentState::Idle,
            consumed: 0,
            attempts: 0,
            timeouts: 0,
        }
    }

    /// Attach a hook registry the agent fires events into.
    pub fn with_hooks(mut self, hooks: Arc<HookRegistry>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Get the agent ID.
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Seat of this agent around the ring.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The resource on this agent's left.
    pub fn left(&self) -> &Arc<ExclusiveResource> {
        &self.left
    }

    /// The resource on this agent's right.
    pub fn right(&self) -> &Arc<ExclusiveResource> {
        &self.right
    }

    /// Current life-cycle state.
    pub fn state(&self) -> AgentState {
        self.state
    }

    /// Units claimed so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Run until the pool is observed empty or shutdown is requested.
    pub async fn run(mut self) -> AgentReport {
        self.fire(HookEvent::AgentStart {
            agent_id: self.agent_id.clone(),
            index: self.index,
        })
        .await;

        let outcome = loop {
            if self.shutdown.is_triggered() {
                break AgentOutcome::Cancelled;
            }
            if self.pool.is_empty() {
                break AgentOutcome::Completed;
            }

            self.attempts += 1;
            if self.dine_once().await == Cycle::Cancelled {
                break AgentOutcome::Cancelled;
            }
        };

        self.transition(match outcome {
            AgentOutcome::Cancelled => AgentState::Cancelled,
            _ => AgentState::Done,
        });
        debug!(
            agent = %self.agent_id,
            consumed = self.consumed,
            attempts = self.attempts,
            timeouts = self.timeouts,
            %outcome,
            "agent stopped"
        );

        self.fire(HookEvent::AgentStop {
            agent_id: self.agent_id.clone(),
            consumed: self.consumed,
            outcome: outcome.clone(),
        })
        .await;

        AgentReport {
            agent_id: self.agent_id,
            index: self.index,
            consumed: self.consumed,
            attempts: self.attempts,
            timeouts: self.timeouts,
            outcome,
        }
    }

    /// One pass through think, pick up both, eat, put both down.
    ///
    /// Every resource picked up in this cycle is released before it returns,
    /// whichever way it returns.
    async fn dine_once(&mut self) -> Cycle {
        self.transition(AgentState::Thinking);
        if !self.pause(self.think_delay()).await {
            return Cycle::Cancelled;
        }

        let [(first_side, first), (second_side, second)] = self.pick_up_order();

        self.transition(AgentState::acquiring(first_side));
        let first_guard = match self.pick_up(&first, first_side).await {
            Acquire::Acquired(guard) => guard,
            Acquire::TimedOut => return Cycle::Continue,
            Acquire::Cancelled => return Cycle::Cancelled,
        };

        self.transition(AgentState::acquiring(second_side));
        let second_guard = match self.pick_up(&second, second_side).await {
            Acquire::Acquired(guard) => guard,
            Acquire::TimedOut => {
                self.put_down(first_guard, first_side).await;
                return Cycle::Continue;
            }
            Acquire::Cancelled => {
                self.put_down(first_guard, first_side).await;
                return Cycle::Cancelled;
            }
        };

        self.transition(AgentState::Eating);
        let claimed = self.pool.take_one();
        if claimed > 0 {
            self.consumed += claimed;
            self.fire(HookEvent::Ate {
                agent_id: self.agent_id.clone(),
                consumed: self.consumed,
                remaining: self.pool.remaining(),
            })
            .await;
        }
        let finished = self.pause(self.timing.eat_time).await;

        self.put_down(second_guard, second_side).await;
        self.put_down(first_guard, first_side).await;

        if finished {
            Cycle::Continue
        } else {
            Cycle::Cancelled
        }
    }

    /// The two resources in the order this agent picks them up.
    fn pick_up_order(&self) -> [(Side, Arc<ExclusiveResource>); 2] {
        let left = (Side::Left, Arc::clone(&self.left));
        let right = (Side::Right, Arc::clone(&self.right));

        match self.strategy {
            AcquisitionStrategy::Timeout => [left, right],
            AcquisitionStrategy::Ordered if self.left.index() <= self.right.index() => {
                [left, right]
            }
            AcquisitionStrategy::Ordered => [right, left],
        }
    }

    async fn pick_up<'r>(&mut self, resource: &'r ExclusiveResource, side: Side) -> Acquire<'r> {
        let result = resource
            .try_acquire(self.index, self.timing.acquire_timeout, &self.shutdown)
            .await;

        match &result {
            Acquire::Acquired(_) => {
                debug!(agent = %self.agent_id, %resource, %side, "picked up");
                self.fire(HookEvent::PickedUp {
                    agent_id: self.agent_id.clone(),
                    agent: self.index,
                    resource: resource.id().to_string(),
                    side,
                })
                .await;
            }
            Acquire::TimedOut => {
                self.timeouts += 1;
                trace!(agent = %self.agent_id, %resource, %side, "pick up timed out");
                self.fire(HookEvent::TimedOut {
                    agent_id: self.agent_id.clone(),
                    resource: resource.id().to_string(),
                    side,
                })
                .await;
            }
            Acquire::Cancelled => {
                debug!(agent = %self.agent_id, %resource, "pick up cancelled");
            }
        }

        result
    }

    async fn put_down(&self, guard: ResourceGuard<'_>, side: Side) {
        let resource = guard.resource().id().to_string();
        self.fire(HookEvent::PutDown {
            agent_id: self.agent_id.clone(),
            agent: self.index,
            resource: resource.clone(),
            side,
        })
        .await;

        guard.release();
        debug!(agent = %self.agent_id, %resource, %side, "put down");
    }

    /// Sleep for `delay` unless shutdown is requested first.
    ///
    /// Returns false if the pause was cut short.
    async fn pause(&self, delay: Duration) -> bool {
        if delay.is_zero() {
            tokio::task::yield_now().await;
            return !self.shutdown.is_triggered();
        }

        tokio::select! {
            biased;
            () = self.shutdown.cancelled() => false,
            () = tokio::time::sleep(delay) => true,
        }
    }

    fn think_delay(&self) -> Duration {
        let jitter = self.timing.think_jitter;
        if jitter.is_zero() {
            return self.timing.think_time;
        }

        let max_micros = u64::try_from(jitter.as_micros()).unwrap_or(u64::MAX);
        let extra = rand::thread_rng().gen_range(0..=max_micros);
        self.timing.think_time + Duration::from_micros(extra)
    }

    fn transition(&mut self, next: AgentState) {
        if self.state != next {
            trace!(agent = %self.agent_id, from = %self.state, to = %next, "state change");
            self.state = next;
        }
    }

    async fn fire(&self, event: HookEvent) {
        let Some(hooks) = &self.hooks else {
            return;
        };

        if let Err(e) = hooks.fire(&event).await {
            warn!(agent = %self.agent_id, event = event.kind(), error = %e, "hook failed");
        }
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("agent_id", &self.agent_id)
            .field("left", &self.left.id())
            .field("right", &self.right.id())
            .field("state", &self.state)
            .field("consumed", &self.consumed)
            .finish()
    }
}

impl std::fmt::Display for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.agent_id)
    }
}
