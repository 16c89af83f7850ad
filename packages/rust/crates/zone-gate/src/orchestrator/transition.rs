//! Pure state transitions. Each function maps the committed state to the full next
//! state; the orchestrator assigns the result in one write.

use crate::error::GatingFailure;
use crate::model::{AccessLevel, GatingState, GatingStatus, LocationSnapshot, ZoneDecision};

const DEFAULT_NOT_SERVICEABLE_MESSAGE: &str = "Service is not available at this location.";

/// New attempt: clear any previous error and mark the first step in flight.
pub(crate) fn begin_attempt(previous: &GatingState, status: GatingStatus) -> GatingState {
    GatingState {
        status,
        is_loading: true,
        error_message: None,
        failure: None,
        ..previous.clone()
    }
}

/// Move to the next in-flight step of the current attempt.
pub(crate) fn enter_step(previous: &GatingState, status: GatingStatus) -> GatingState {
    GatingState {
        status,
        is_loading: true,
        ..previous.clone()
    }
}

pub(crate) fn permission_granted(previous: &GatingState) -> GatingState {
    GatingState {
        is_permission_granted: true,
        ..previous.clone()
    }
}

/// Record a captured location while staying in the current step.
pub(crate) fn located(previous: &GatingState, snapshot: LocationSnapshot) -> GatingState {
    GatingState {
        current_location: Some(snapshot),
        ..previous.clone()
    }
}

/// Enter zone validation for `snapshot`. Also the first write of a manual-address
/// attempt, so errors from earlier attempts are cleared.
pub(crate) fn enter_zone_validation(
    previous: &GatingState,
    snapshot: LocationSnapshot,
) -> GatingState {
    GatingState {
        status: GatingStatus::ZoneValidating,
        current_location: Some(snapshot),
        is_loading: true,
        error_message: None,
        failure: None,
        ..previous.clone()
    }
}

/// Terminal failure of the current step.
pub(crate) fn fail(previous: &GatingState, failure: &GatingFailure) -> GatingState {
    let status = match failure {
        GatingFailure::GpsDisabled => GatingStatus::GpsDisabled,
        _ => GatingStatus::Failed,
    };
    let is_permission_granted = match failure {
        GatingFailure::PermissionDenied | GatingFailure::PermissionDeniedForever => false,
        _ => previous.is_permission_granted,
    };
    GatingState {
        status,
        is_permission_granted,
        is_loading: false,
        error_message: Some(failure.to_string()),
        failure: Some(failure.kind()),
        ..previous.clone()
    }
}

/// Branch on a resolver decision.
pub(crate) fn apply_zone_decision(previous: &GatingState, decision: ZoneDecision) -> GatingState {
    if !decision.is_consistent() {
        let failure = GatingFailure::ZoneValidationFailed(if decision.message.trim().is_empty() {
            format!(
                "resolver reported success={} for {:?}",
                decision.success, decision.access_level
            )
        } else {
            decision.message.clone()
        });
        return fail(previous, &failure);
    }

    match decision.access_level {
        AccessLevel::FullAccess => granted(previous, GatingStatus::Completed, decision),
        AccessLevel::ViewingOnly => granted(previous, GatingStatus::ViewingModeReady, decision),
        AccessLevel::NoAccess => {
            let message = if decision.message.trim().is_empty() {
                DEFAULT_NOT_SERVICEABLE_MESSAGE.to_string()
            } else {
                decision.message.clone()
            };
            GatingState {
                status: GatingStatus::ServiceNotAvailable,
                zone_decision: Some(decision),
                is_loading: false,
                error_message: Some(message),
                failure: None,
                ..previous.clone()
            }
            .with_access_level(AccessLevel::NoAccess)
        }
    }
}

fn granted(previous: &GatingState, status: GatingStatus, decision: ZoneDecision) -> GatingState {
    let access_level = decision.access_level;
    GatingState {
        status,
        zone_decision: Some(decision),
        is_loading: false,
        error_message: None,
        failure: None,
        has_completed_in_session: true,
        ..previous.clone()
    }
    .with_access_level(access_level)
}

/// `retry()` first forces the machine back to its initial status.
pub(crate) fn force_not_started(previous: &GatingState) -> GatingState {
    GatingState {
        status: GatingStatus::NotStarted,
        is_loading: false,
        error_message: None,
        failure: None,
        ..previous.clone()
    }
}

/// Access confirmed upstream.
pub(crate) fn mark_completed(previous: &GatingState, snapshot: LocationSnapshot) -> GatingState {
    GatingState {
        status: GatingStatus::Completed,
        current_location: Some(snapshot),
        is_loading: false,
        error_message: None,
        failure: None,
        has_completed_in_session: true,
        ..previous.clone()
    }
    .with_access_level(AccessLevel::FullAccess)
}

/// Policy override: complete the session without validation.
pub(crate) fn skip(previous: &GatingState) -> GatingState {
    GatingState {
        status: GatingStatus::Completed,
        is_location_required: false,
        is_loading: false,
        error_message: None,
        failure: None,
        has_completed_in_session: true,
        ..previous.clone()
    }
    .with_access_level(AccessLevel::FullAccess)
}
