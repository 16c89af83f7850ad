//! zone-gate CLI: drive the gating orchestrator with scripted collaborators.
//!
//! Settings come from `packages/conf/zone-gate.yaml` and the user config home
//! (override with `--conf <dir>`).
//!
//! Logging: set `RUST_LOG=zone_gate=debug` to see step-level logs on stderr.

mod cli;

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use zone_gate::scenario::Scenario;
use zone_gate::{
    GatingConfig, GatingOrchestrator, RouteKind, evaluate, load_gating_settings,
    set_config_home_override,
};

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Some(conf_dir) = cli.conf.clone() {
        set_config_home_override(conf_dir);
    }

    // RUST_LOG overrides; --verbose => debug; else info
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose {
            "zone_gate=debug"
        } else {
            "zone_gate=info"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let settings = load_gating_settings();
    let config = GatingConfig::from_settings(&settings);

    match cli.command {
        Command::Run { scenario, retry } => run_flow(&scenario, config, retry).await,
        Command::Manual {
            scenario,
            address,
            lat,
            lng,
        } => run_manual(&scenario, config, &address, lat, lng).await,
        Command::Settings => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "location_required": config.location_required,
                    "retry_delay_ms": millis(config.retry_delay),
                    "step_timeout_ms": config.step_timeout.map(millis),
                    "event_bus_capacity": config.event_bus_capacity,
                }))?
            );
            Ok(())
        }
    }
}

async fn run_flow(path: &Path, config: GatingConfig, retry: bool) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let (orchestrator, _collaborators) = scenario.build_orchestrator(config);

    let status = orchestrator.start().await?;
    tracing::info!(status = %status, "first attempt finished");
    if retry && !orchestrator.state().can_proceed_to_app() {
        let status = orchestrator.retry().await?;
        tracing::info!(status = %status, "retry finished");
    }
    print_state(&orchestrator)
}

async fn run_manual(
    path: &Path,
    config: GatingConfig,
    address: &str,
    lat: f64,
    lng: f64,
) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let (orchestrator, _collaborators) = scenario.build_orchestrator(config);
    orchestrator.validate_manual_address(address, lat, lng).await?;
    print_state(&orchestrator)
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn print_state(orchestrator: &GatingOrchestrator) -> Result<()> {
    let state = orchestrator.state();
    let report = json!({
        "state": state,
        "can_proceed_to_app": state.can_proceed_to_app(),
        "needs_settings_visit": state.needs_settings_visit(),
        "routes": {
            "browse": evaluate(&state, RouteKind::Browse),
            "order": evaluate(&state, RouteKind::Order),
        },
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
