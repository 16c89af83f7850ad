//! Scripted collaborators driven by a YAML scenario.
//!
//! Used by the `zone-gate` binary to exercise the orchestrator without device
//! bindings, and by tests that need recorded calls.
//!
//! ```yaml
//! permission:
//!   initial: undetermined
//!   on_request: granted
//! gps:
//!   enabled: false
//!   enable_on_request: true
//! fix: { latitude: 12.9, longitude: 77.6 }
//! address: { address: "MG Road", city: "Bengaluru" }
//! online: true
//! zone: { access_level: full_access, message: "Delivery available" }
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::GatingConfig;
use crate::model::{AccessLevel, Coordinates, LocationSnapshot, ZoneDecision};
use crate::orchestrator::GatingOrchestrator;
use crate::ports::{ConnectivityProbe, LocationCapabilityGateway, PermissionStatus, ZoneResolver};

/// Full description of what each collaborator answers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Permission answers.
    #[serde(default)]
    pub permission: PermissionScript,
    /// Location service answers.
    #[serde(default)]
    pub gps: GpsScript,
    /// Fix returned by `get_coordinates_only`; absent means no fix.
    #[serde(default)]
    pub fix: Option<Coordinates>,
    /// Address fields returned by reverse geocoding.
    #[serde(default)]
    pub address: Option<AddressScript>,
    /// Reverse geocoding fails with this message.
    #[serde(default)]
    pub address_error: Option<String>,
    /// Connectivity probe answer.
    #[serde(default = "default_online")]
    pub online: bool,
    /// Resolver decision.
    #[serde(default)]
    pub zone: Option<ZoneScript>,
    /// Resolver fails with this message.
    #[serde(default)]
    pub zone_error: Option<String>,
    /// Simulated latency applied to every gateway and resolver call.
    #[serde(default)]
    pub latency_ms: u64,
}

fn default_online() -> bool {
    true
}

/// Permission answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionScript {
    /// Returned by `check_permission` until a request changes it.
    pub initial: PermissionStatus,
    /// Returned by `request_permission`.
    pub on_request: PermissionStatus,
}

impl Default for PermissionScript {
    fn default() -> Self {
        Self {
            initial: PermissionStatus::Granted,
            on_request: PermissionStatus::Granted,
        }
    }
}

/// Location service answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpsScript {
    /// Service initially on.
    pub enabled: bool,
    /// User accepts the enable prompt.
    #[serde(default)]
    pub enable_on_request: bool,
}

impl Default for GpsScript {
    fn default() -> Self {
        Self {
            enabled: true,
            enable_on_request: false,
        }
    }
}

/// Reverse-geocoded address fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressScript {
    /// Street-level line.
    #[serde(default)]
    pub address: Option<String>,
    /// City.
    #[serde(default)]
    pub city: Option<String>,
    /// State.
    #[serde(default)]
    pub state: Option<String>,
    /// Postal code.
    #[serde(default)]
    pub postal_code: Option<String>,
    /// Country.
    #[serde(default)]
    pub country: Option<String>,
}

/// Resolver decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneScript {
    /// Access tier.
    pub access_level: AccessLevel,
    /// Resolver message.
    #[serde(default)]
    pub message: String,
}

impl Scenario {
    /// Parse a scenario from YAML text.
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).context("failed to parse scenario yaml")
    }

    /// Load a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_yaml_str(&raw)
    }

    /// Scripted collaborators for this scenario.
    pub fn collaborators(&self) -> ScenarioCollaborators {
        ScenarioCollaborators {
            gateway: Arc::new(ScriptedGateway::new(self.clone())),
            connectivity: Arc::new(StaticConnectivity::new(self.online)),
            resolver: Arc::new(ScriptedResolver::new(self.clone())),
        }
    }

    /// Orchestrator wired to fresh scripted collaborators.
    pub fn build_orchestrator(
        &self,
        config: GatingConfig,
    ) -> (GatingOrchestrator, ScenarioCollaborators) {
        let collaborators = self.collaborators();
        let orchestrator = GatingOrchestrator::new(
            Arc::clone(&collaborators.gateway) as Arc<dyn LocationCapabilityGateway>,
            Arc::clone(&collaborators.connectivity) as Arc<dyn ConnectivityProbe>,
            Arc::clone(&collaborators.resolver) as Arc<dyn ZoneResolver>,
            config,
        );
        (orchestrator, collaborators)
    }
}

/// Handles to the scripted collaborators, kept for call inspection.
#[derive(Clone)]
pub struct ScenarioCollaborators {
    /// Gateway double.
    pub gateway: Arc<ScriptedGateway>,
    /// Connectivity double.
    pub connectivity: Arc<StaticConnectivity>,
    /// Resolver double.
    pub resolver: Arc<ScriptedResolver>,
}

/// Scripted [`LocationCapabilityGateway`].
pub struct ScriptedGateway {
    scenario: Scenario,
    permission: Mutex<PermissionStatus>,
    service_enabled: AtomicBool,
    calls: Mutex<Vec<&'static str>>,
}

impl ScriptedGateway {
    /// Gateway answering from `scenario`.
    pub fn new(scenario: Scenario) -> Self {
        Self {
            permission: Mutex::new(scenario.permission.initial),
            service_enabled: AtomicBool::new(scenario.gps.enabled),
            scenario,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Names of the gateway methods called so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn record(&self, call: &'static str) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
        if self.scenario.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.scenario.latency_ms)).await;
        }
    }
}

#[async_trait]
impl LocationCapabilityGateway for ScriptedGateway {
    async fn check_permission(&self) -> Result<PermissionStatus> {
        self.record("check_permission").await;
        Ok(*self.permission.lock().unwrap_or_else(PoisonError::into_inner))
    }

    async fn request_permission(&self) -> Result<PermissionStatus> {
        self.record("request_permission").await;
        let answer = self.scenario.permission.on_request;
        *self.permission.lock().unwrap_or_else(PoisonError::into_inner) = answer;
        Ok(answer)
    }

    async fn is_service_enabled(&self) -> Result<bool> {
        self.record("is_service_enabled").await;
        Ok(self.service_enabled.load(Ordering::Acquire))
    }

    async fn request_service_enable(&self) -> Result<bool> {
        self.record("request_service_enable").await;
        let accepted = self.scenario.gps.enable_on_request;
        if accepted {
            self.service_enabled.store(true, Ordering::Release);
        }
        Ok(accepted)
    }

    async fn get_coordinates_only(&self) -> Result<Option<Coordinates>> {
        self.record("get_coordinates_only").await;
        Ok(self.scenario.fix)
    }

    async fn get_coordinates_with_address(&self) -> Result<Option<LocationSnapshot>> {
        self.record("get_coordinates_with_address").await;
        if let Some(error) = &self.scenario.address_error {
            return Err(anyhow!("{error}"));
        }
        let (Some(fix), Some(address)) = (self.scenario.fix, self.scenario.address.clone()) else {
            return Ok(None);
        };
        Ok(Some(LocationSnapshot {
            coordinates: fix,
            address: address.address,
            city: address.city,
            state: address.state,
            postal_code: address.postal_code,
            country: address.country,
        }))
    }

    async fn open_location_settings(&self) -> Result<bool> {
        self.record("open_location_settings").await;
        Ok(true)
    }

    async fn open_app_settings(&self) -> Result<bool> {
        self.record("open_app_settings").await;
        Ok(true)
    }
}

/// Fixed [`ConnectivityProbe`] answer.
pub struct StaticConnectivity {
    online: bool,
}

impl StaticConnectivity {
    /// Probe that always answers `online`.
    pub fn new(online: bool) -> Self {
        Self { online }
    }
}

#[async_trait]
impl ConnectivityProbe for StaticConnectivity {
    async fn has_connection(&self) -> bool {
        self.online
    }
}

/// Scripted [`ZoneResolver`].
pub struct ScriptedResolver {
    scenario: Scenario,
    resolved: Mutex<Vec<Coordinates>>,
}

impl ScriptedResolver {
    /// Resolver answering from `scenario`.
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            resolved: Mutex::new(Vec::new()),
        }
    }

    /// Coordinates passed to `resolve`, in order.
    pub fn resolved(&self) -> Vec<Coordinates> {
        self.resolved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ZoneResolver for ScriptedResolver {
    async fn resolve(&self, coordinates: Coordinates) -> Result<ZoneDecision> {
        self.resolved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(coordinates);
        if self.scenario.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.scenario.latency_ms)).await;
        }
        if let Some(error) = &self.scenario.zone_error {
            return Err(anyhow!("{error}"));
        }
        let zone = self
            .scenario
            .zone
            .as_ref()
            .ok_or_else(|| anyhow!("no zone answer configured"))?;
        Ok(ZoneDecision::new(zone.access_level, zone.message.clone()))
    }
}
