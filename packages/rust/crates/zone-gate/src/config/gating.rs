//! Resolved orchestrator configuration.

use std::time::Duration;

use super::settings::GatingSettings;

const DEFAULT_RETRY_DELAY_MS: u64 = 500;
const DEFAULT_EVENT_BUS_CAPACITY: usize = 64;

/// Orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatingConfig {
    /// Initial `is_location_required` policy flag (restored by `reset()`).
    pub location_required: bool,
    /// Fixed pause between `retry()` forcing `NotStarted` and restarting.
    pub retry_delay: Duration,
    /// Optional bound on each collaborator call. `None` applies no timeout.
    pub step_timeout: Option<Duration>,
    /// Transition event bus capacity.
    pub event_bus_capacity: usize,
}

impl Default for GatingConfig {
    fn default() -> Self {
        Self {
            location_required: true,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            step_timeout: None,
            event_bus_capacity: DEFAULT_EVENT_BUS_CAPACITY,
        }
    }
}

impl GatingConfig {
    /// Resolve settings over defaults.
    pub fn from_settings(settings: &GatingSettings) -> Self {
        let defaults = Self::default();
        Self {
            location_required: settings
                .location_required
                .unwrap_or(defaults.location_required),
            retry_delay: settings
                .retry_delay_ms
                .map_or(defaults.retry_delay, Duration::from_millis),
            step_timeout: settings.step_timeout_ms.map(Duration::from_millis),
            event_bus_capacity: settings
                .event_bus_capacity
                .unwrap_or(defaults.event_bus_capacity),
        }
        .normalized()
    }

    /// Clamp values the runtime cannot accept.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.event_bus_capacity = self.event_bus_capacity.max(1);
        self.step_timeout = self
            .step_timeout
            .map(|timeout| timeout.max(Duration::from_millis(1)));
        self
    }
}
