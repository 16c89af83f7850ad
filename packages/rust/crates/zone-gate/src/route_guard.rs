//! Navigation guard over the gating state.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::model::GatingState;

/// Kind of access-controlled route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    /// Catalog and other read-only screens.
    Browse,
    /// Cart, checkout and anything that places an order.
    Order,
}

/// What the navigation layer should do before entering a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteDecision {
    /// An attempt is in flight; keep the current screen.
    Defer,
    /// Send the user to the location gate.
    RedirectToGate,
    /// Enter the route.
    Allow,
    /// Ordering route requested in viewing mode; show browse-only screens instead.
    BrowseOnly,
}

/// `is_location_required ∧ ¬has_completed_in_session`.
pub fn requires_gating(state: &GatingState) -> bool {
    state.is_location_required && !state.has_completed_in_session
}

/// `has_completed_in_session ∧ access_level ∈ {FullAccess, ViewingOnly}`.
pub fn can_enter(state: &GatingState) -> bool {
    state.has_completed_in_session && state.access_level.permits_entry()
}

/// Decide a route against one state snapshot.
pub fn evaluate(state: &GatingState, route: RouteKind) -> RouteDecision {
    if state.is_loading {
        return RouteDecision::Defer;
    }
    if requires_gating(state) {
        return RouteDecision::RedirectToGate;
    }
    let entered = can_enter(state);
    match route {
        RouteKind::Browse if entered || !state.is_location_required => RouteDecision::Allow,
        RouteKind::Order if entered && state.can_order => RouteDecision::Allow,
        RouteKind::Order if entered && state.is_viewing_mode => RouteDecision::BrowseOnly,
        RouteKind::Browse | RouteKind::Order => RouteDecision::RedirectToGate,
    }
}

/// Reader half handed to the navigation layer.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    state: watch::Receiver<GatingState>,
}

impl RouteGuard {
    /// Wrap a state receiver.
    pub fn new(state: watch::Receiver<GatingState>) -> Self {
        Self { state }
    }

    /// See [`requires_gating`].
    pub fn requires_gating(&self) -> bool {
        requires_gating(&self.state.borrow())
    }

    /// See [`can_enter`].
    pub fn can_enter(&self) -> bool {
        can_enter(&self.state.borrow())
    }

    /// Navigation layer must not redirect while this is true.
    pub fn should_defer(&self) -> bool {
        self.state.borrow().is_loading
    }

    /// Decide `route` against the latest state.
    pub fn decide(&self, route: RouteKind) -> RouteDecision {
        evaluate(&self.state.borrow(), route)
    }

    /// Wait for the next committed state. Returns `false` once the orchestrator is gone.
    pub async fn changed(&mut self) -> bool {
        self.state.changed().await.is_ok()
    }

    /// Wait until no attempt is in flight, then decide. Returns `None` if the
    /// orchestrator is dropped while waiting.
    pub async fn settle(&mut self, route: RouteKind) -> Option<RouteDecision> {
        let state = self.state.wait_for(|state| !state.is_loading).await.ok()?;
        Some(evaluate(&state, route))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AccessLevel, GatingStatus};

    fn completed(access_level: AccessLevel, status: GatingStatus) -> GatingState {
        let mut state = GatingState::default().with_access_level(access_level);
        state.status = status;
        state.has_completed_in_session = true;
        state
    }

    #[test]
    fn fresh_session_redirects_to_gate() {
        let state = GatingState::default();
        assert!(requires_gating(&state));
        assert_eq!(evaluate(&state, RouteKind::Browse), RouteDecision::RedirectToGate);
    }

    #[test]
    fn loading_defers_even_when_gating_required() {
        let mut state = GatingState::default();
        state.status = GatingStatus::LocationDetecting;
        state.is_loading = true;
        assert_eq!(evaluate(&state, RouteKind::Order), RouteDecision::Defer);
    }

    #[test]
    fn viewing_mode_allows_browse_but_not_order() {
        let state = completed(AccessLevel::ViewingOnly, GatingStatus::ViewingModeReady);
        assert!(can_enter(&state));
        assert_eq!(evaluate(&state, RouteKind::Browse), RouteDecision::Allow);
        assert_eq!(evaluate(&state, RouteKind::Order), RouteDecision::BrowseOnly);
    }

    #[test]
    fn full_access_allows_ordering() {
        let state = completed(AccessLevel::FullAccess, GatingStatus::Completed);
        assert_eq!(evaluate(&state, RouteKind::Order), RouteDecision::Allow);
    }

    #[test]
    fn not_required_allows_browse_without_completion() {
        let state = GatingState::with_location_required(false);
        assert!(!requires_gating(&state));
        assert!(!can_enter(&state));
        assert_eq!(evaluate(&state, RouteKind::Browse), RouteDecision::Allow);
        assert_eq!(evaluate(&state, RouteKind::Order), RouteDecision::RedirectToGate);
    }
}
