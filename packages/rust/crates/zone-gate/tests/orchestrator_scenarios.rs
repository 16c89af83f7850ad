#![allow(missing_docs)]

use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use zone_gate::scenario::{AddressScript, GpsScript, PermissionScript, Scenario, ZoneScript};
use zone_gate::{
    AccessLevel, Coordinates, FailureKind, GatingConfig, GatingOrchestrator, GatingStatus,
    LocationCapabilityGateway, LocationSnapshot, PermissionStatus, ZoneDecision,
};

fn fix(latitude: f64, longitude: f64) -> Option<Coordinates> {
    Some(Coordinates {
        latitude,
        longitude,
    })
}

fn zone(access_level: AccessLevel, message: &str) -> Option<ZoneScript> {
    Some(ZoneScript {
        access_level,
        message: message.to_string(),
    })
}

fn happy_path(access_level: AccessLevel, message: &str) -> Scenario {
    Scenario {
        fix: fix(12.9, 77.6),
        zone: zone(access_level, message),
        ..Scenario::default()
    }
}

#[tokio::test]
async fn permission_denied_forever_fails_without_prompting() {
    let scenario = Scenario {
        permission: PermissionScript {
            initial: PermissionStatus::DeniedForever,
            on_request: PermissionStatus::Granted,
        },
        ..happy_path(AccessLevel::FullAccess, "ok")
    };
    let (orchestrator, collaborators) = scenario.build_orchestrator(GatingConfig::default());

    let status = orchestrator.start().await.expect("start should run");

    let state = orchestrator.state();
    assert_eq!(status, GatingStatus::Failed);
    assert!(
        state
            .error_message
            .as_deref()
            .is_some_and(|message| message.contains("permanently denied"))
    );
    assert!(!state.can_proceed_to_app());
    assert!(state.needs_settings_visit());
    assert!(!state.is_loading);
    assert_eq!(collaborators.gateway.calls(), vec!["check_permission"]);
    assert!(collaborators.resolver.resolved().is_empty());
}

#[tokio::test]
async fn full_access_completes_session() {
    let (orchestrator, collaborators) =
        happy_path(AccessLevel::FullAccess, "Delivery available").build_orchestrator(
            GatingConfig::default(),
        );

    let status = orchestrator.start().await.expect("start should run");

    let state = orchestrator.state();
    assert_eq!(status, GatingStatus::Completed);
    assert!(state.can_order);
    assert!(!state.is_viewing_mode);
    assert!(state.has_completed_in_session);
    assert!(state.is_permission_granted);
    assert!(state.error_message.is_none());
    assert!(state.can_proceed_to_app());
    assert_eq!(
        collaborators.resolver.resolved(),
        vec![Coordinates {
            latitude: 12.9,
            longitude: 77.6
        }]
    );
}

#[tokio::test]
async fn viewing_only_enters_viewing_mode() {
    let (orchestrator, _collaborators) =
        happy_path(AccessLevel::ViewingOnly, "outside delivery zone, inside city")
            .build_orchestrator(GatingConfig::default());

    let status = orchestrator.start().await.expect("start should run");

    let state = orchestrator.state();
    assert_eq!(status, GatingStatus::ViewingModeReady);
    assert!(!state.can_order);
    assert!(state.is_viewing_mode);
    assert!(state.has_completed_in_session);
    assert!(state.can_proceed_to_app());
    assert_eq!(
        state.zone_decision.map(|decision| decision.message),
        Some("outside delivery zone, inside city".to_string())
    );
}

#[tokio::test]
async fn no_access_reports_service_not_available() {
    let scenario = Scenario {
        fix: fix(0.0, 0.0),
        zone: zone(AccessLevel::NoAccess, "not serviceable"),
        ..Scenario::default()
    };
    let (orchestrator, _collaborators) = scenario.build_orchestrator(GatingConfig::default());

    let status = orchestrator.start().await.expect("start should run");

    let state = orchestrator.state();
    assert_eq!(status, GatingStatus::ServiceNotAvailable);
    assert!(!state.has_completed_in_session);
    assert!(!state.can_order);
    assert_eq!(state.error_message.as_deref(), Some("not serviceable"));
    assert!(state.failure.is_none());
    assert!(!state.can_proceed_to_app());
}

#[tokio::test]
async fn missing_gps_fix_fails_without_location() {
    let scenario = Scenario {
        fix: None,
        ..happy_path(AccessLevel::FullAccess, "ok")
    };
    let (orchestrator, collaborators) = scenario.build_orchestrator(GatingConfig::default());

    let status = orchestrator.start().await.expect("start should run");

    let state = orchestrator.state();
    assert_eq!(status, GatingStatus::Failed);
    assert!(
        state
            .error_message
            .as_deref()
            .is_some_and(|message| message.contains("GPS coordinates"))
    );
    assert_eq!(state.failure, Some(FailureKind::CoordinatesUnavailable));
    assert!(state.current_location.is_none());
    assert!(
        !collaborators
            .gateway
            .calls()
            .contains(&"get_coordinates_with_address")
    );
}

#[tokio::test]
async fn undetermined_permission_prompts_once() {
    let scenario = Scenario {
        permission: PermissionScript {
            initial: PermissionStatus::Undetermined,
            on_request: PermissionStatus::Granted,
        },
        ..happy_path(AccessLevel::FullAccess, "ok")
    };
    let (orchestrator, collaborators) = scenario.build_orchestrator(GatingConfig::default());

    orchestrator.start().await.expect("start should run");

    let calls = collaborators.gateway.calls();
    assert_eq!(&calls[..2], &["check_permission", "request_permission"]);
    assert_eq!(
        calls
            .iter()
            .filter(|call| **call == "request_permission")
            .count(),
        1
    );
    assert_eq!(orchestrator.status(), GatingStatus::Completed);
}

#[tokio::test]
async fn declined_gps_prompt_is_recoverable() {
    let scenario = Scenario {
        gps: GpsScript {
            enabled: false,
            enable_on_request: false,
        },
        ..happy_path(AccessLevel::FullAccess, "ok")
    };
    let (orchestrator, collaborators) = scenario.build_orchestrator(GatingConfig::default());

    let status = orchestrator.start().await.expect("start should run");

    let state = orchestrator.state();
    assert_eq!(status, GatingStatus::GpsDisabled);
    assert!(status.is_recoverable());
    assert!(state.needs_location_services());
    assert_eq!(state.failure, Some(FailureKind::GpsDisabled));
    assert_eq!(
        collaborators.gateway.calls().last().copied(),
        Some("request_service_enable")
    );
}

#[tokio::test]
async fn accepted_gps_prompt_continues() {
    let scenario = Scenario {
        gps: GpsScript {
            enabled: false,
            enable_on_request: true,
        },
        ..happy_path(AccessLevel::FullAccess, "ok")
    };
    let (orchestrator, _collaborators) = scenario.build_orchestrator(GatingConfig::default());
    let mut events = orchestrator.events();

    orchestrator.start().await.expect("start should run");

    let mut visited = Vec::new();
    while let Ok(event) = events.try_recv() {
        visited.push(event.to);
    }
    assert!(visited.contains(&GatingStatus::GpsEnabling));
    assert_eq!(visited.last().copied(), Some(GatingStatus::Completed));
}

#[tokio::test]
async fn offline_probe_does_not_abort_flow() {
    let scenario = Scenario {
        online: false,
        ..happy_path(AccessLevel::FullAccess, "ok")
    };
    let (orchestrator, _collaborators) = scenario.build_orchestrator(GatingConfig::default());

    let status = orchestrator.start().await.expect("start should run");
    assert_eq!(status, GatingStatus::Completed);
}

#[tokio::test]
async fn address_enrichment_keeps_captured_coordinates() {
    let scenario = Scenario {
        address: Some(AddressScript {
            address: Some("MG Road".to_string()),
            city: Some("Bengaluru".to_string()),
            postal_code: Some("560001".to_string()),
            ..AddressScript::default()
        }),
        ..happy_path(AccessLevel::FullAccess, "ok")
    };
    let (orchestrator, _collaborators) = scenario.build_orchestrator(GatingConfig::default());

    orchestrator.start().await.expect("start should run");

    let location = orchestrator
        .state()
        .current_location
        .expect("location should be captured");
    assert_eq!(location.city.as_deref(), Some("Bengaluru"));
    assert_eq!(location.coordinates, fix(12.9, 77.6).expect("fix"));
}

#[tokio::test]
async fn address_failure_is_soft() {
    let scenario = Scenario {
        address_error: Some("geocoder offline".to_string()),
        ..happy_path(AccessLevel::ViewingOnly, "browse only")
    };
    let (orchestrator, _collaborators) = scenario.build_orchestrator(GatingConfig::default());

    let status = orchestrator.start().await.expect("start should run");

    let state = orchestrator.state();
    assert_eq!(status, GatingStatus::ViewingModeReady);
    let location = state.current_location.expect("coordinates-only capture");
    assert!(!location.has_address());
}

#[tokio::test]
async fn resolver_error_fails_and_keeps_last_location() {
    let scenario = Scenario {
        zone_error: Some("zone service unavailable".to_string()),
        ..happy_path(AccessLevel::FullAccess, "ok")
    };
    let (orchestrator, _collaborators) = scenario.build_orchestrator(GatingConfig::default());

    let status = orchestrator.start().await.expect("start should run");

    let state = orchestrator.state();
    assert_eq!(status, GatingStatus::Failed);
    assert_eq!(state.failure, Some(FailureKind::ZoneValidationFailed));
    assert_eq!(
        state.error_message.as_deref(),
        Some("Zone validation failed: zone service unavailable")
    );
    assert!(state.current_location.is_some());
    assert_eq!(state.access_level, AccessLevel::NoAccess);
}

struct BrokenServiceGateway;

#[async_trait]
impl LocationCapabilityGateway for BrokenServiceGateway {
    async fn check_permission(&self) -> Result<PermissionStatus> {
        Ok(PermissionStatus::Granted)
    }

    async fn request_permission(&self) -> Result<PermissionStatus> {
        Ok(PermissionStatus::Granted)
    }

    async fn is_service_enabled(&self) -> Result<bool> {
        Err(anyhow!("platform channel closed"))
    }

    async fn request_service_enable(&self) -> Result<bool> {
        Ok(false)
    }

    async fn get_coordinates_only(&self) -> Result<Option<Coordinates>> {
        Ok(None)
    }

    async fn get_coordinates_with_address(&self) -> Result<Option<LocationSnapshot>> {
        Ok(None)
    }

    async fn open_location_settings(&self) -> Result<bool> {
        Err(anyhow!("no settings activity"))
    }

    async fn open_app_settings(&self) -> Result<bool> {
        Ok(true)
    }
}

#[tokio::test]
async fn gateway_errors_become_failed_state() {
    let collaborators = happy_path(AccessLevel::FullAccess, "ok").collaborators();
    let orchestrator = GatingOrchestrator::new(
        Arc::new(BrokenServiceGateway),
        collaborators.connectivity.clone(),
        collaborators.resolver.clone(),
        GatingConfig::default(),
    );

    let status = orchestrator.start().await.expect("start should run");

    let state = orchestrator.state();
    assert_eq!(status, GatingStatus::Failed);
    assert_eq!(state.failure, Some(FailureKind::UnexpectedException));
    assert!(
        state
            .error_message
            .as_deref()
            .is_some_and(|message| message.contains("platform channel closed"))
    );
    assert!(collaborators.resolver.resolved().is_empty());
}

#[tokio::test]
async fn settings_shortcuts_report_failures_as_false() {
    let collaborators = happy_path(AccessLevel::FullAccess, "ok").collaborators();
    let orchestrator = GatingOrchestrator::new(
        Arc::new(BrokenServiceGateway),
        collaborators.connectivity.clone(),
        collaborators.resolver.clone(),
        GatingConfig::default(),
    );

    assert!(!orchestrator.open_location_settings().await);
    assert!(orchestrator.open_app_settings().await);
    assert_eq!(orchestrator.status(), GatingStatus::NotStarted);
}

#[tokio::test]
async fn mark_completed_bypasses_validation() {
    let (orchestrator, collaborators) =
        happy_path(AccessLevel::NoAccess, "nope").build_orchestrator(GatingConfig::default());
    let snapshot = LocationSnapshot::manual(
        Coordinates::new(12.9, 77.6).expect("valid coordinates"),
        "Confirmed at checkout",
    );

    let status = orchestrator.mark_completed(snapshot.clone());

    let state = orchestrator.state();
    assert_eq!(status, GatingStatus::Completed);
    assert!(state.has_completed_in_session);
    assert!(state.can_order);
    assert_eq!(state.current_location, Some(snapshot));
    assert!(state.can_proceed_to_app());
    assert!(collaborators.gateway.calls().is_empty());
}

#[tokio::test]
async fn skip_completes_and_lifts_requirement() {
    let (orchestrator, collaborators) =
        happy_path(AccessLevel::NoAccess, "nope").build_orchestrator(GatingConfig::default());

    let status = orchestrator.skip();

    let state = orchestrator.state();
    assert_eq!(status, GatingStatus::Completed);
    assert!(!state.is_location_required);
    assert!(state.has_completed_in_session);
    assert!(collaborators.gateway.calls().is_empty());
    assert!(collaborators.resolver.resolved().is_empty());
}

#[tokio::test]
async fn start_after_entry_granted_is_a_no_op() {
    let (orchestrator, collaborators) =
        happy_path(AccessLevel::FullAccess, "ok").build_orchestrator(GatingConfig::default());

    orchestrator.start().await.expect("first start");
    let calls_after_first = collaborators.gateway.calls().len();
    let status = orchestrator.start().await.expect("second start");

    assert_eq!(status, GatingStatus::Completed);
    assert_eq!(collaborators.gateway.calls().len(), calls_after_first);
}

#[tokio::test]
async fn custom_decision_without_success_flag_fails() {
    struct DegradedResolver;

    #[async_trait]
    impl zone_gate::ZoneResolver for DegradedResolver {
        async fn resolve(&self, _coordinates: Coordinates) -> Result<ZoneDecision> {
            Ok(ZoneDecision {
                access_level: AccessLevel::FullAccess,
                message: "degraded lookup".to_string(),
                success: false,
            })
        }
    }

    let collaborators = happy_path(AccessLevel::FullAccess, "ok").collaborators();
    let orchestrator = GatingOrchestrator::new(
        collaborators.gateway.clone(),
        collaborators.connectivity.clone(),
        Arc::new(DegradedResolver),
        GatingConfig::default(),
    );

    let status = orchestrator.start().await.expect("start should run");
    assert_eq!(status, GatingStatus::Failed);
    assert!(!orchestrator.state().has_completed_in_session);
}
