//! Location gating: decides per session whether the device location permits
//! ordering, browsing only, or no access.
//!
//! - **Orchestrator**: permission → GPS enablement → fix → address → zone resolution,
//!   one owned state aggregate, in-flight guard, retry from scratch.
//! - **Route guard**: derived predicates the navigation layer checks before entering
//!   access-controlled routes.
//! - **Ports**: collaborator traits for OS location APIs, connectivity and the zone
//!   service.

mod config;
mod error;
mod events;
mod model;
mod orchestrator;
mod ports;
mod route_guard;
pub mod scenario;

pub use config::{
    GatingConfig, GatingSettings, gating_settings_paths, load_gating_settings,
    load_gating_settings_from_paths, set_config_home_override,
};
pub use error::{FailureKind, GatingFailure, TriggerError};
pub use events::{GatingEvent, GatingEventBus, topics};
pub use model::{
    AccessLevel, Coordinates, GatingState, GatingStatus, LocationSnapshot, ZoneDecision,
};
pub use orchestrator::{GatingOrchestrator, GatingStep};
pub use ports::{ConnectivityProbe, LocationCapabilityGateway, PermissionStatus, ZoneResolver};
pub use route_guard::{
    RouteDecision, RouteGuard, RouteKind, can_enter, evaluate, requires_gating,
};
