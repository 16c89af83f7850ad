use serde::{Deserialize, Serialize};

use crate::error::GatingFailure;

/// One collaborator call made by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatingStep {
    /// `check_permission`.
    PermissionCheck,
    /// `request_permission` (OS prompt).
    PermissionRequest,
    /// `is_service_enabled`.
    ServiceCheck,
    /// `request_service_enable` (OS prompt).
    ServiceEnable,
    /// `get_coordinates_only`.
    CoordinateFix,
    /// `get_coordinates_with_address`.
    AddressLookup,
    /// `ZoneResolver::resolve`.
    ZoneResolution,
    /// `ConnectivityProbe::has_connection`.
    ConnectivityProbe,
    /// `open_location_settings`.
    OpenLocationSettings,
    /// `open_app_settings`.
    OpenAppSettings,
}

impl GatingStep {
    /// Stable label for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PermissionCheck => "permission_check",
            Self::PermissionRequest => "permission_request",
            Self::ServiceCheck => "service_check",
            Self::ServiceEnable => "service_enable",
            Self::CoordinateFix => "coordinate_fix",
            Self::AddressLookup => "address_lookup",
            Self::ZoneResolution => "zone_resolution",
            Self::ConnectivityProbe => "connectivity_probe",
            Self::OpenLocationSettings => "open_location_settings",
            Self::OpenAppSettings => "open_app_settings",
        }
    }

    /// Failure recorded when this step's collaborator returns an error.
    pub(crate) fn failure_for(self, error: &anyhow::Error) -> GatingFailure {
        match self {
            Self::ZoneResolution => GatingFailure::ZoneValidationFailed(format!("{error:#}")),
            _ => GatingFailure::UnexpectedException(format!("{}: {error:#}", self.as_str())),
        }
    }
}

impl std::fmt::Display for GatingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolver_errors_map_to_zone_validation() {
        let error = anyhow::anyhow!("503 from zone service");
        assert_eq!(
            GatingStep::ZoneResolution.failure_for(&error),
            GatingFailure::ZoneValidationFailed("503 from zone service".to_string())
        );
        assert_eq!(
            GatingStep::ServiceCheck.failure_for(&error).to_string(),
            "Unexpected error during location check: service_check: 503 from zone service"
        );
    }
}
