//! Gating data model: locations, access tiers, and the session aggregate.

mod access;
mod location;
mod state;

pub use access::{AccessLevel, ZoneDecision};
pub use location::{Coordinates, LocationSnapshot};
pub use state::{GatingState, GatingStatus};
