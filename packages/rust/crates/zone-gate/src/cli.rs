use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "zone-gate")]
#[command(about = "Run the location gating flow against a scripted scenario and print the session state.")]
pub(crate) struct Cli {
    /// Override config directory (user settings live under `<conf>/zone-gate/`).
    #[arg(long, global = true)]
    pub(crate) conf: Option<PathBuf>,

    /// Debug logging (RUST_LOG still wins when set).
    #[arg(long, short, global = true)]
    pub(crate) verbose: bool,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the GPS flow: permission, service, fix, address, zone.
    Run {
        /// Scenario YAML describing collaborator answers.
        #[arg(long)]
        scenario: PathBuf,

        /// Call retry() once when the first attempt does not grant entry.
        #[arg(long)]
        retry: bool,
    },
    /// Validate a manually entered address.
    Manual {
        /// Scenario YAML (only the zone answer is used).
        #[arg(long)]
        scenario: PathBuf,

        /// Address text shown as the session location.
        #[arg(long)]
        address: String,

        /// Latitude in degrees.
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude in degrees.
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
    },
    /// Print the resolved gating settings.
    Settings,
}
