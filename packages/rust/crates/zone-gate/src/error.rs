//! Error types for the gating pipeline.
//!
//! `GatingFailure` is the failure taxonomy; its `Display` text becomes the
//! user-visible `error_message`. Triggers only return `TriggerError` to callers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::orchestrator::GatingStep;

/// Technical or permission failure of one gating attempt.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatingFailure {
    /// User denied the permission prompt.
    #[error("Location permission denied. Allow location access to continue.")]
    PermissionDenied,

    /// Permission denied with "don't ask again"; only a settings visit can undo it.
    #[error("Location permission permanently denied. Enable it in app settings to continue.")]
    PermissionDeniedForever,

    /// Location services are off and the user declined to enable them.
    #[error("Location services are disabled. Turn on GPS to continue.")]
    GpsDisabled,

    /// Gateway produced no fix.
    #[error("Unable to get GPS coordinates. Check your signal and try again.")]
    CoordinatesUnavailable,

    /// Coordinates outside valid WGS84 ranges.
    #[error("Invalid coordinates: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinates {
        /// Rejected latitude.
        latitude: f64,
        /// Rejected longitude.
        longitude: f64,
    },

    /// Resolver could not produce a usable decision.
    #[error("Zone validation failed: {0}")]
    ZoneValidationFailed(String),

    /// A collaborator call exceeded the configured step timeout.
    #[error("Location step '{step}' timed out after {timeout_ms}ms")]
    StepTimedOut {
        /// Step that timed out.
        step: GatingStep,
        /// Configured bound.
        timeout_ms: u64,
    },

    /// Any other collaborator error.
    #[error("Unexpected error during location check: {0}")]
    UnexpectedException(String),
}

impl GatingFailure {
    /// Classification stored alongside the message in `GatingState`.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::PermissionDenied => FailureKind::PermissionDenied,
            Self::PermissionDeniedForever => FailureKind::PermissionDeniedForever,
            Self::GpsDisabled => FailureKind::GpsDisabled,
            Self::CoordinatesUnavailable => FailureKind::CoordinatesUnavailable,
            Self::InvalidCoordinates { .. } => FailureKind::InvalidCoordinates,
            Self::ZoneValidationFailed(_) => FailureKind::ZoneValidationFailed,
            Self::StepTimedOut { .. } => FailureKind::StepTimedOut,
            Self::UnexpectedException(_) => FailureKind::UnexpectedException,
        }
    }
}

/// Copyable tag for [`GatingFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// See [`GatingFailure::PermissionDenied`].
    PermissionDenied,
    /// See [`GatingFailure::PermissionDeniedForever`].
    PermissionDeniedForever,
    /// See [`GatingFailure::GpsDisabled`].
    GpsDisabled,
    /// See [`GatingFailure::CoordinatesUnavailable`].
    CoordinatesUnavailable,
    /// See [`GatingFailure::InvalidCoordinates`].
    InvalidCoordinates,
    /// See [`GatingFailure::ZoneValidationFailed`].
    ZoneValidationFailed,
    /// See [`GatingFailure::StepTimedOut`].
    StepTimedOut,
    /// See [`GatingFailure::UnexpectedException`].
    UnexpectedException,
}

/// Rejection of a trigger call. Pipeline failures are never returned here; they
/// are observed through the state.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerError {
    /// Another `start`/`retry`/`validate_manual_address` is still running.
    #[error("a location gating attempt is already in flight")]
    AttemptInFlight,
}
