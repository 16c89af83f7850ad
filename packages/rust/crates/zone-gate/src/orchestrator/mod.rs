//! Location gating orchestrator.
//!
//! Owns the session's [`GatingState`] and is its only writer. Observers read whole
//! snapshots through a `tokio::sync::watch` channel and follow transitions on the
//! event bus.
//!
//! ```text
//! start()/retry()                validate_manual_address()
//!      ↓                                   ↓
//! PermissionRequesting → (GpsEnabling) → LocationDetecting → ZoneValidating
//!      ↓ denied               ↓ declined        ↓ no fix          ↓
//!    Failed              GpsDisabled          Failed     Completed | ViewingModeReady
//!                                                         | ServiceNotAvailable | Failed
//! ```
//!
//! `start`, `retry` and `validate_manual_address` share one in-flight slot: a second
//! call while an attempt runs is rejected with [`TriggerError::AttemptInFlight`].
//! `reset`, `skip` and `mark_completed` always apply and supersede a running attempt;
//! the next trigger takes the slot over without waiting for the superseded attempt's
//! pending collaborator call.
//!
//! Events are published while the state lock is held, so the bus order matches the
//! commit order across triggers.

mod attempt;
mod pipeline;
mod step;
mod transition;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{broadcast, watch};

use crate::config::GatingConfig;
use crate::error::{GatingFailure, TriggerError};
use crate::events::{GatingEvent, GatingEventBus, topics};
use crate::model::{Coordinates, GatingState, GatingStatus, LocationSnapshot};
use crate::ports::{ConnectivityProbe, LocationCapabilityGateway, ZoneResolver};
use crate::route_guard::RouteGuard;

use self::attempt::{AttemptKind, AttemptSlot};
use self::pipeline::Halt;
pub use self::step::GatingStep;

/// Sequences permission, GPS, geocoding and zone resolution into one session decision.
pub struct GatingOrchestrator {
    gateway: Arc<dyn LocationCapabilityGateway>,
    connectivity: Arc<dyn ConnectivityProbe>,
    resolver: Arc<dyn ZoneResolver>,
    config: GatingConfig,
    state_tx: watch::Sender<GatingState>,
    events: GatingEventBus,
    attempts: AttemptSlot,
    generation: AtomicU64,
}

impl GatingOrchestrator {
    /// Build an orchestrator with default session state.
    pub fn new(
        gateway: Arc<dyn LocationCapabilityGateway>,
        connectivity: Arc<dyn ConnectivityProbe>,
        resolver: Arc<dyn ZoneResolver>,
        config: GatingConfig,
    ) -> Self {
        let config = config.normalized();
        let (state_tx, _) = watch::channel(GatingState::with_location_required(
            config.location_required,
        ));
        Self {
            gateway,
            connectivity,
            resolver,
            events: GatingEventBus::new(config.event_bus_capacity),
            config,
            state_tx,
            attempts: AttemptSlot::default(),
            generation: AtomicU64::new(0),
        }
    }

    /// Effective configuration.
    pub fn config(&self) -> &GatingConfig {
        &self.config
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> GatingState {
        self.state_tx.borrow().clone()
    }

    /// Current status.
    pub fn status(&self) -> GatingStatus {
        self.state_tx.borrow().status
    }

    /// Receiver that observes every committed state.
    pub fn subscribe(&self) -> watch::Receiver<GatingState> {
        self.state_tx.subscribe()
    }

    /// Receiver for transition events.
    pub fn events(&self) -> broadcast::Receiver<GatingEvent> {
        self.events.subscribe()
    }

    /// Navigation guard bound to this orchestrator's state.
    pub fn route_guard(&self) -> RouteGuard {
        RouteGuard::new(self.subscribe())
    }

    /// A `start`/`retry`/`validate_manual_address` call is running.
    pub fn is_attempt_in_flight(&self) -> bool {
        self.attempts.is_busy(self.current_generation())
    }

    /// Run the GPS flow.
    ///
    /// A session that already granted entry (`Completed`/`ViewingModeReady`) is left
    /// untouched. Pipeline failures are reported through the state, not the return.
    pub async fn start(&self) -> Result<GatingStatus, TriggerError> {
        let generation = self.current_generation();
        let _attempt = self.attempts.try_begin(AttemptKind::Start, generation)?;
        let current = self.status();
        if current.grants_entry() {
            tracing::debug!(status = %current, "location gating already satisfied; start ignored");
            return Ok(current);
        }
        let outcome = self.run_location_flow(generation).await;
        Ok(self.finish(AttemptKind::Start, outcome))
    }

    /// Discard the previous outcome, wait the fixed retry delay, and rerun the whole
    /// flow from the permission step.
    pub async fn retry(&self) -> Result<GatingStatus, TriggerError> {
        let generation = self.current_generation();
        let _attempt = self.attempts.try_begin(AttemptKind::Retry, generation)?;
        let outcome = async {
            self.commit(generation, transition::force_not_started)?;
            tokio::time::sleep(self.config.retry_delay).await;
            self.ensure_current(generation)?;
            self.run_location_flow(generation).await
        }
        .await;
        Ok(self.finish(AttemptKind::Retry, outcome))
    }

    /// Validate a manually entered address, skipping permission and GPS.
    pub async fn validate_manual_address(
        &self,
        address: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<GatingStatus, TriggerError> {
        let generation = self.current_generation();
        let _attempt = self
            .attempts
            .try_begin(AttemptKind::ManualAddress, generation)?;
        let outcome = match Coordinates::new(latitude, longitude) {
            Ok(coordinates) => {
                let snapshot = LocationSnapshot::manual(coordinates, address);
                self.validate_zone(generation, snapshot).await
            }
            Err(failure) => Err(self.fail(generation, failure)),
        };
        Ok(self.finish(AttemptKind::ManualAddress, outcome))
    }

    /// Administrative shortcut: access was already confirmed upstream.
    pub fn mark_completed(&self, snapshot: LocationSnapshot) -> GatingStatus {
        tracing::info!(location = %snapshot.display_label(), "location gating marked completed");
        self.commit_superseding(None, |state| {
            transition::mark_completed(state, snapshot)
        })
    }

    /// Policy override: complete the session without validation and stop requiring
    /// location. Intended for fallback and testing.
    pub fn skip(&self) -> GatingStatus {
        tracing::warn!("location gating skipped; session completed without validation");
        self.commit_superseding(None, transition::skip)
    }

    /// Return to session defaults (logout).
    pub fn reset(&self) {
        let location_required = self.config.location_required;
        self.commit_superseding(Some(topics::RESET), |_| {
            GatingState::with_location_required(location_required)
        });
        tracing::info!("location gating state reset");
    }

    /// Open the system location settings screen. Failures are logged and reported as `false`.
    pub async fn open_location_settings(&self) -> bool {
        let result = self
            .bounded(
                GatingStep::OpenLocationSettings,
                self.gateway.open_location_settings(),
            )
            .await;
        log_settings_result(GatingStep::OpenLocationSettings, result)
    }

    /// Open this app's settings screen. Failures are logged and reported as `false`.
    pub async fn open_app_settings(&self) -> bool {
        let result = self
            .bounded(GatingStep::OpenAppSettings, self.gateway.open_app_settings())
            .await;
        log_settings_result(GatingStep::OpenAppSettings, result)
    }

    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn ensure_current(&self, generation: u64) -> Result<(), Halt> {
        if self.current_generation() == generation {
            Ok(())
        } else {
            Err(Halt::Superseded)
        }
    }

    /// Write the full next state in one assignment, unless the attempt was superseded.
    fn commit<F>(&self, generation: u64, transition: F) -> Result<(), Halt>
    where
        F: FnOnce(&GatingState) -> GatingState,
    {
        let applied = self.state_tx.send_if_modified(|state| {
            if self.generation.load(Ordering::Acquire) != generation {
                return false;
            }
            let next = transition(state);
            debug_assert!(next.check_invariants().is_ok(), "{:?}", next.check_invariants());
            let event = GatingEvent::transition(state, &next);
            *state = next;
            tracing::trace!(from = %event.from, to = %event.to, "gating transition");
            self.events.publish(event);
            true
        });
        if applied {
            Ok(())
        } else {
            Err(Halt::Superseded)
        }
    }

    /// Administrative write: bumps the generation so a running attempt stops.
    fn commit_superseding<F>(&self, topic: Option<&str>, transition: F) -> GatingStatus
    where
        F: FnOnce(&GatingState) -> GatingState,
    {
        self.state_tx.send_modify(|state| {
            self.generation.fetch_add(1, Ordering::AcqRel);
            let next = transition(state);
            let mut event = GatingEvent::transition(state, &next);
            if let Some(topic) = topic {
                event.topic = topic.to_string();
            }
            *state = next;
            self.events.publish(event);
        });
        self.status()
    }

    fn finish(&self, kind: AttemptKind, outcome: Result<(), Halt>) -> GatingStatus {
        let status = self.status();
        match outcome {
            Ok(()) | Err(Halt::Failed) => {
                tracing::debug!(attempt = kind.as_str(), status = %status, "gating attempt finished");
            }
            Err(Halt::Superseded) => {
                tracing::debug!(
                    attempt = kind.as_str(),
                    status = %status,
                    "gating attempt superseded; remaining steps dropped"
                );
            }
        }
        status
    }
}

fn log_settings_result(
    step: GatingStep,
    result: Result<anyhow::Result<bool>, GatingFailure>,
) -> bool {
    match result {
        Ok(Ok(opened)) => opened,
        Ok(Err(error)) => {
            tracing::warn!(step = %step, error = %format!("{error:#}"), "failed to open settings");
            false
        }
        Err(failure) => {
            tracing::warn!(step = %step, error = %failure, "failed to open settings");
            false
        }
    }
}
