// ABOUTME: Orchestrator for a ring of agents - builds the ring, runs it, aggregates counts.
// ABOUTME: One tokio task per agent; the only blocking point is awaiting all of them.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::task::JoinError;
use tracing::{info, warn};
use uuid::Uuid;

use super::report::RunReport;
use crate::agent::{Agent, AgentReport, Shutdown};
use crate::config::SimulationConfig;
use crate::error::SimulationError;
use crate::hook::{HookEvent, HookRegistry};
use crate::resource::{ExclusiveResource, ResourcePool};

/// Builds and runs one simulation.
///
/// # Topology
///
/// Agent *i* holds resource *i* on its left and resource *(i+1) mod n* on
/// its right, so neighbours share exactly one resource and the resources
/// form a cycle. A ring of one agent is given two resources so that its
/// left and right are still distinct.
///
/// An orchestrator runs once: [`Orchestrator::run_all`] consumes it, and a
/// second run needs a freshly built one.
pub struct Orchestrator {
    config: SimulationConfig,
    pool: Arc<ResourcePool>,
    resources: Vec<Arc<ExclusiveResource>>,
    agents: Vec<Agent>,
    hooks: Option<Arc<HookRegistry>>,
    shutdown: Shutdown,
}

impl Orchestrator {
    /// Build a ring of `agents` agents over a pool of `capacity` units, with
    /// default timings.
    pub fn build(agents: usize, capacity: u64) -> Result<Self, SimulationError> {
        Self::from_config(SimulationConfig::new(agents, capacity))
    }

    /// Build a ring from a full configuration.
    pub fn from_config(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;

        let pool = Arc::new(ResourcePool::new(config.capacity));
        let shutdown = Shutdown::new();

        let resource_count = config.agents.max(2);
        let resources: Vec<_> = (0..resource_count)
            .map(|i| Arc::new(ExclusiveResource::new(format!("C{}", i), i)))
            .collect();

        let agents = (0..config.agents)
            .map(|i| {
                Agent::new(
                    i,
                    Arc::clone(&resources[i]),
                    Arc::clone(&resources[(i + 1) % resource_count]),
                    Arc::clone(&pool),
                    &config,
                    shutdown.clone(),
                )
            })
            .collect();

        Ok(Self {
            config,
            pool,
            resources,
            agents,
            hooks: None,
            shutdown,
        })
    }

    /// Attach a hook registry; every agent fires into it.
    pub fn with_hooks(mut self, hooks: Arc<HookRegistry>) -> Self {
        self.agents = self
            .agents
            .into_iter()
            .map(|agent| agent.with_hooks(Arc::clone(&hooks)))
            .collect();
        self.hooks = Some(hooks);
        self
    }

    /// The configuration this ring was built from.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The shared pool.
    pub fn pool(&self) -> &Arc<ResourcePool> {
        &self.pool
    }

    /// The resources around the ring, by index.
    pub fn resources(&self) -> &[Arc<ExclusiveResource>] {
        &self.resources
    }

    /// The agents, in seat order.
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// A handle that stops every agent when triggered.
    ///
    /// Agents put down whatever they hold before stopping, and the run
    /// returns a report with their partial counts.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Run every agent concurrently until all of them stop, then aggregate.
    ///
    /// An agent whose task panics is reported as failed with a count of
    /// zero; the remaining agents are still awaited.
    ///
    /// Dropping the returned future before it completes, for example under
    /// `tokio::time::timeout`, triggers shutdown so the spawned agents stop.
    pub async fn run_all(self) -> Result<RunReport, SimulationError> {
        let Self {
            config,
            pool,
            resources: _,
            agents,
            hooks,
            shutdown,
        } = self;
        let abandon = ShutdownOnDrop(Some(shutdown));

        let run_id = Uuid::new_v4().to_string();
        info!(
            run_id = %run_id,
            agents = config.agents,
            capacity = config.capacity,
            strategy = %config.strategy,
            "starting run"
        );
        fire(
            hooks.as_deref(),
            HookEvent::RunStart {
                run_id: run_id.clone(),
                agents: config.agents,
                capacity: config.capacity,
            },
        )
        .await;

        let started = Instant::now();
        let handles: Vec<_> = agents
            .into_iter()
            .map(|agent| {
                let agent_id = agent.agent_id().to_string();
                let index = agent.index();
                (agent_id, index, tokio::spawn(agent.run()))
            })
            .collect();

        let joined = join_all(
            handles
                .into_iter()
                .map(|(agent_id, index, handle)| async move { (agent_id, index, handle.await) }),
        )
        .await;

        let agents: Vec<AgentReport> = joined
            .into_iter()
            .map(|(agent_id, index, result)| match result {
                Ok(report) => report,
                Err(e) => {
                    let reason = describe_join_error(e);
                    warn!(run_id = %run_id, agent = %agent_id, %reason, "agent task failed");
                    AgentReport::failed(agent_id, index, reason)
                }
            })
            .collect();

        let total_consumed = agents.iter().map(|agent| agent.consumed).sum();
        let report = RunReport {
            run_id: run_id.clone(),
            capacity: pool.capacity(),
            remaining: pool.remaining(),
            total_consumed,
            elapsed: started.elapsed(),
            agents,
        };

        info!(
            run_id = %run_id,
            total_consumed = report.total_consumed,
            remaining = report.remaining,
            elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            complete = report.is_complete(),
            "run finished"
        );
        abandon.disarm();
        fire(
            hooks.as_deref(),
            HookEvent::RunEnd {
                run_id,
                total_consumed,
            },
        )
        .await;

        Ok(report)
    }

    /// Like [`Orchestrator::run_all`], but request shutdown once `deadline`
    /// has elapsed and return whatever the agents managed until then.
    pub async fn run_with_deadline(self, deadline: Duration) -> Result<RunReport, SimulationError> {
        let shutdown = self.shutdown.clone();
        let run = self.run_all();
        tokio::pin!(run);

        tokio::select! {
            report = &mut run => report,
            () = tokio::time::sleep(deadline) => {
                let deadline_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX);
                warn!(deadline_ms, "deadline reached, shutting down");
                shutdown.trigger();
                run.await
            }
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("remaining", &self.pool.remaining())
            .field("agents", &self.agents)
            .finish()
    }
}

/// Triggers shutdown when dropped, unless disarmed after a finished run.
struct ShutdownOnDrop(Option<Shutdown>);

impl ShutdownOnDrop {
    fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for ShutdownOnDrop {
    fn drop(&mut self) {
        if let Some(shutdown) = self.0.take() {
            if shutdown.trigger() {
                warn!("run abandoned before all agents stopped, shutting down");
            }
        }
    }
}

async fn fire(hooks: Option<&HookRegistry>, event: HookEvent) {
    let Some(hooks) = hooks else {
        return;
    };

    if let Err(e) = hooks.fire(&event).await {
        warn!(event = event.kind(), error = %e, "hook failed");
    }
}

fn describe_join_error(err: JoinError) -> String {
    if err.is_cancelled() {
        return "task cancelled".to_string();
    }

    let payload = err.into_panic();
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panicked: {}", msg)
    } else {
        "panicked".to_string()
    }
}
