//! Session gating aggregate and its status machine labels.

use serde::{Deserialize, Serialize};

use super::access::{AccessLevel, ZoneDecision};
use super::location::LocationSnapshot;
use crate::error::FailureKind;

/// Orchestrator status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatingStatus {
    /// No attempt yet (or forced back here by retry).
    #[default]
    NotStarted,
    /// User declined to enable location services.
    GpsDisabled,
    /// Waiting on the GPS-enable prompt.
    GpsEnabling,
    /// Checking or requesting OS permission.
    PermissionRequesting,
    /// Acquiring a fix and reverse geocoding.
    LocationDetecting,
    /// Waiting on the zone resolver.
    ZoneValidating,
    /// Full access granted.
    Completed,
    /// Browsing-only access granted.
    ViewingModeReady,
    /// Technical or permission failure.
    Failed,
    /// Location resolved but not serviceable.
    ServiceNotAvailable,
}

impl GatingStatus {
    /// Every status, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::NotStarted,
        Self::GpsDisabled,
        Self::GpsEnabling,
        Self::PermissionRequesting,
        Self::LocationDetecting,
        Self::ZoneValidating,
        Self::Completed,
        Self::ViewingModeReady,
        Self::Failed,
        Self::ServiceNotAvailable,
    ];

    /// Stable label for logs and events.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::GpsDisabled => "gps_disabled",
            Self::GpsEnabling => "gps_enabling",
            Self::PermissionRequesting => "permission_requesting",
            Self::LocationDetecting => "location_detecting",
            Self::ZoneValidating => "zone_validating",
            Self::Completed => "completed",
            Self::ViewingModeReady => "viewing_mode_ready",
            Self::Failed => "failed",
            Self::ServiceNotAvailable => "service_not_available",
        }
    }

    /// A step is running in this status.
    pub fn is_in_progress(self) -> bool {
        matches!(
            self,
            Self::PermissionRequesting
                | Self::GpsEnabling
                | Self::LocationDetecting
                | Self::ZoneValidating
        )
    }

    /// Stable for the rest of the session unless retried or reset.
    pub fn is_session_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::ViewingModeReady | Self::ServiceNotAvailable
        )
    }

    /// Recoverable through `retry()`.
    pub fn is_recoverable(self) -> bool {
        matches!(self, Self::Failed | Self::GpsDisabled)
    }

    /// Statuses that grant entry into the app.
    pub fn grants_entry(self) -> bool {
        matches!(self, Self::Completed | Self::ViewingModeReady)
    }

    /// Statuses allowed to carry an error message.
    pub fn may_carry_error(self) -> bool {
        matches!(
            self,
            Self::Failed | Self::GpsDisabled | Self::ServiceNotAvailable
        )
    }
}

impl std::fmt::Display for GatingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single mutable session aggregate. Only the orchestrator writes it; observers
/// receive whole snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatingState {
    /// Current machine status.
    pub status: GatingStatus,
    /// Policy flag: the app requires gating at all.
    pub is_location_required: bool,
    /// OS permission was granted during this session.
    pub is_permission_granted: bool,
    /// Last captured location; survives later failures.
    pub current_location: Option<LocationSnapshot>,
    /// Last zone decision.
    pub zone_decision: Option<ZoneDecision>,
    /// A step is in flight.
    pub is_loading: bool,
    /// User-visible error text.
    pub error_message: Option<String>,
    /// Classification of the failure behind `error_message`, when technical.
    pub failure: Option<FailureKind>,
    /// Sticky completion flag; only `reset()` clears it.
    pub has_completed_in_session: bool,
    /// Resolved access tier.
    pub access_level: AccessLevel,
    /// Derived: `access_level == FullAccess`.
    pub can_order: bool,
    /// Derived: `access_level == ViewingOnly`.
    pub is_viewing_mode: bool,
}

impl Default for GatingState {
    fn default() -> Self {
        Self::with_location_required(true)
    }
}

impl GatingState {
    /// Defaults with an explicit policy flag.
    pub fn with_location_required(is_location_required: bool) -> Self {
        Self {
            status: GatingStatus::NotStarted,
            is_location_required,
            is_permission_granted: false,
            current_location: None,
            zone_decision: None,
            is_loading: false,
            error_message: None,
            failure: None,
            has_completed_in_session: false,
            access_level: AccessLevel::NoAccess,
            can_order: false,
            is_viewing_mode: false,
        }
    }

    /// Set the access tier together with its derived flags.
    #[must_use]
    pub fn with_access_level(mut self, access_level: AccessLevel) -> Self {
        self.access_level = access_level;
        self.can_order = access_level.can_order();
        self.is_viewing_mode = access_level.is_viewing_only();
        self
    }

    /// User may proceed into the app.
    pub fn can_proceed_to_app(&self) -> bool {
        self.has_completed_in_session
            && self.status.grants_entry()
            && self.access_level.permits_entry()
    }

    /// Permission was permanently denied; retrying cannot succeed without a settings visit.
    pub fn needs_settings_visit(&self) -> bool {
        self.status == GatingStatus::Failed
            && self.failure == Some(FailureKind::PermissionDeniedForever)
    }

    /// Location services were declined; the location settings screen can fix it.
    pub fn needs_location_services(&self) -> bool {
        self.status == GatingStatus::GpsDisabled
    }

    /// Structural invariants every committed state satisfies.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.can_order != self.access_level.can_order() {
            return Err(format!(
                "can_order={} disagrees with access_level={:?}",
                self.can_order, self.access_level
            ));
        }
        if self.is_viewing_mode != self.access_level.is_viewing_only() {
            return Err(format!(
                "is_viewing_mode={} disagrees with access_level={:?}",
                self.is_viewing_mode, self.access_level
            ));
        }
        if self.error_message.is_some() && !self.status.may_carry_error() {
            return Err(format!("error_message set in status {}", self.status));
        }
        if self.is_loading && !self.status.is_in_progress() {
            return Err(format!("is_loading set in status {}", self.status));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_session_start() {
        let state = GatingState::default();
        assert_eq!(state.status, GatingStatus::NotStarted);
        assert!(state.is_location_required);
        assert_eq!(state.access_level, AccessLevel::NoAccess);
        assert!(!state.can_order);
        assert!(!state.can_proceed_to_app());
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn access_level_drives_derived_flags() {
        let full = GatingState::default().with_access_level(AccessLevel::FullAccess);
        assert!(full.can_order && !full.is_viewing_mode);
        let viewing = full.with_access_level(AccessLevel::ViewingOnly);
        assert!(!viewing.can_order && viewing.is_viewing_mode);
        let none = viewing.with_access_level(AccessLevel::NoAccess);
        assert!(!none.can_order && !none.is_viewing_mode);
    }

    #[test]
    fn proceed_requires_all_three_conditions() {
        let mut state = GatingState::default().with_access_level(AccessLevel::FullAccess);
        state.status = GatingStatus::Completed;
        assert!(!state.can_proceed_to_app());
        state.has_completed_in_session = true;
        assert!(state.can_proceed_to_app());
        state.status = GatingStatus::Failed;
        assert!(!state.can_proceed_to_app());
    }

    #[test]
    fn terminal_and_recoverable_sets_are_disjoint() {
        for status in GatingStatus::ALL {
            assert!(!(status.is_session_terminal() && status.is_recoverable()));
            assert!(!(status.is_in_progress() && status.may_carry_error()));
        }
    }
}
