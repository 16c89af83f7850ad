//! Collaborator seams consumed by the orchestrator.
//!
//! Platform adapters (OS permission/GPS bindings, network checks, the zone service)
//! implement these traits; the orchestrator only ever sees `Arc<dyn ...>`.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{Coordinates, LocationSnapshot, ZoneDecision};

/// OS location permission state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    /// Never asked; the OS will show a prompt.
    Undetermined,
    /// Denied, but the OS still allows asking again.
    Denied,
    /// Denied with "don't ask again"; only app settings can change it.
    DeniedForever,
    /// Granted (foreground or always).
    Granted,
}

impl PermissionStatus {
    /// Asking again may show an OS prompt.
    pub fn can_prompt(self) -> bool {
        matches!(self, Self::Undetermined | Self::Denied)
    }
}

/// OS permission and GPS capability wrapper.
#[async_trait]
pub trait LocationCapabilityGateway: Send + Sync {
    /// Current permission state, without prompting.
    async fn check_permission(&self) -> Result<PermissionStatus>;

    /// Show the OS permission prompt and return the user's answer.
    async fn request_permission(&self) -> Result<PermissionStatus>;

    /// Location services (GPS radio) are switched on.
    async fn is_service_enabled(&self) -> Result<bool>;

    /// Prompt the user to enable location services; `true` if now enabled.
    async fn request_service_enable(&self) -> Result<bool>;

    /// Acquire a fix without any network dependency. `None` when no fix is available.
    async fn get_coordinates_only(&self) -> Result<Option<Coordinates>>;

    /// Acquire a fix and reverse geocode it. Network dependent.
    async fn get_coordinates_with_address(&self) -> Result<Option<LocationSnapshot>>;

    /// Open the system location settings screen; `true` if it opened.
    async fn open_location_settings(&self) -> Result<bool>;

    /// Open this app's settings screen; `true` if it opened.
    async fn open_app_settings(&self) -> Result<bool>;
}

/// Best-effort network reachability check.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// Never fails; unknown reachability reports `false`.
    async fn has_connection(&self) -> bool;
}

/// Zone membership lookup.
#[async_trait]
pub trait ZoneResolver: Send + Sync {
    /// Resolve the access tier for a point. Errors are transport failures.
    async fn resolve(&self, coordinates: Coordinates) -> Result<ZoneDecision>;
}
