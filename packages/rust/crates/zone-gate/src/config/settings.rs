//! Gating settings loader.
//!
//! Loads and merges:
//! - System defaults: `<PRJ_ROOT>/packages/conf/zone-gate.yaml`
//! - User overrides:  `<config home>/zone-gate/settings.yaml`, where the config home
//!   is `--conf`, else `ZONE_GATE_CONFIG_HOME`, else `PRJ_CONFIG_HOME`, else `.config`
//!   (relative values resolve against `PRJ_ROOT`)
//!
//! Merge precedence is user over system.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::Deserialize;

const DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH: &str = "packages/conf/zone-gate.yaml";
const DEFAULT_USER_SETTINGS_RELATIVE_PATH: &str = "zone-gate/settings.yaml";
const DEFAULT_CONFIG_HOME_RELATIVE_PATH: &str = ".config";
const PROJECT_ROOT_ENV: &str = "PRJ_ROOT";
const CONFIG_HOME_ENV: &str = "ZONE_GATE_CONFIG_HOME";
const SHARED_CONFIG_HOME_ENV: &str = "PRJ_CONFIG_HOME";
static CONFIG_HOME_OVERRIDE: OnceLock<PathBuf> = OnceLock::new();

/// Raw settings file shape. Every key is optional so files can be layered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GatingSettings {
    /// Initial `is_location_required` policy flag.
    pub location_required: Option<bool>,
    /// Pause before `retry()` restarts the flow.
    pub retry_delay_ms: Option<u64>,
    /// Per-step collaborator timeout; absent means unbounded.
    pub step_timeout_ms: Option<u64>,
    /// Transition event bus capacity.
    pub event_bus_capacity: Option<usize>,
}

impl GatingSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            location_required: overlay.location_required.or(self.location_required),
            retry_delay_ms: overlay.retry_delay_ms.or(self.retry_delay_ms),
            step_timeout_ms: overlay.step_timeout_ms.or(self.step_timeout_ms),
            event_bus_capacity: overlay.event_bus_capacity.or(self.event_bus_capacity),
        }
    }
}

/// Load settings from the default system and user locations.
pub fn load_gating_settings() -> GatingSettings {
    let (system_path, user_path) = gating_settings_paths();
    load_gating_settings_from_paths(&system_path, &user_path)
}

#[doc(hidden)]
pub fn gating_settings_paths() -> (PathBuf, PathBuf) {
    let root = project_root();
    let system_path = root.join(DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH);
    let user_path = resolve_config_home(&root).join(DEFAULT_USER_SETTINGS_RELATIVE_PATH);
    (system_path, user_path)
}

#[doc(hidden)]
pub fn load_gating_settings_from_paths(system: &Path, user: &Path) -> GatingSettings {
    load_one(system).merge(load_one(user))
}

fn load_one(path: &Path) -> GatingSettings {
    if !path.exists() {
        return GatingSettings::default();
    }
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "failed to read gating settings file; ignoring"
            );
            return GatingSettings::default();
        }
    };
    if raw.trim().is_empty() {
        return GatingSettings::default();
    }
    match serde_yaml::from_str::<GatingSettings>(&raw) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "failed to parse gating settings yaml; ignoring file"
            );
            GatingSettings::default()
        }
    }
}

/// Settings root: `PRJ_ROOT`, else the working directory.
fn project_root() -> PathBuf {
    env_path(PROJECT_ROOT_ENV)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Pin the user config home for this process (CLI `--conf`).
///
/// Relative paths resolve against the project root. Only the first call wins; a
/// different later value is logged and dropped.
pub fn set_config_home_override(path: impl Into<PathBuf>) {
    let requested = path.into();
    if requested.as_os_str().is_empty() {
        return;
    }
    let pinned = CONFIG_HOME_OVERRIDE.get_or_init(|| requested.clone());
    if pinned != &requested {
        tracing::warn!(
            pinned = %pinned.display(),
            ignored = %requested.display(),
            "zone-gate config home already pinned; ignoring --conf value"
        );
    }
}

fn resolve_config_home(project_root: &Path) -> PathBuf {
    pick_config_home(
        project_root,
        CONFIG_HOME_OVERRIDE.get().map(PathBuf::as_path),
        env_path(CONFIG_HOME_ENV),
        env_path(SHARED_CONFIG_HOME_ENV),
    )
}

/// Precedence: `--conf` > `ZONE_GATE_CONFIG_HOME` > `PRJ_CONFIG_HOME` > `.config`.
fn pick_config_home(
    project_root: &Path,
    pinned: Option<&Path>,
    dedicated: Option<PathBuf>,
    shared: Option<PathBuf>,
) -> PathBuf {
    let chosen = pinned
        .map(Path::to_path_buf)
        .or(dedicated)
        .or(shared)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_HOME_RELATIVE_PATH));
    if chosen.is_absolute() {
        chosen
    } else {
        project_root.join(chosen)
    }
}

/// Non-blank value of `name` as a path.
fn env_path(name: &str) -> Option<PathBuf> {
    let value = std::env::var(name).ok()?;
    let value = value.trim();
    (!value.is_empty()).then(|| PathBuf::from(value))
}
