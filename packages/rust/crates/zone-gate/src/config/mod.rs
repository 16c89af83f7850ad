//! Config namespace: orchestrator config and layered settings loading.

mod gating;
mod settings;

pub use gating::GatingConfig;
pub use settings::{
    GatingSettings, gating_settings_paths, load_gating_settings, load_gating_settings_from_paths,
    set_config_home_override,
};
