// ABOUTME: Demo driver - seats a ring of philosophers and prints who ate what.
// ABOUTME: Reads REFECTORY_* settings from the environment or a .env file.

use anyhow::{Context, Result};

use refectory::prelude::*;

const ENV_JSON: &str = "REFECTORY_JSON";

fn init_tracing() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {e}"))
}

fn print_report(report: &RunReport) {
    for agent in &report.agents {
        println!(
            "{} - {} ({} attempts, {} timeouts, {})",
            agent.agent_id, agent.consumed, agent.attempts, agent.timeouts, agent.outcome
        );
    }
    println!("Counted: {}", report.total_consumed);
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();
    init_tracing()?;

    let config = SimulationConfig::from_env().context("Invalid REFECTORY_* configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let report = Orchestrator::from_config(config)?.run_all().await?;

    if std::env::var_os(ENV_JSON).is_some() {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    report.into_result()?;
    Ok(())
}
