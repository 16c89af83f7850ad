//! Step sequencing for one gating attempt.
//!
//! Every step returns `Result<_, Halt>`: a failure has already been committed when
//! `Halt::Failed` is returned, and `Halt::Superseded` means a reset (or another
//! administrative write) replaced the session state mid-attempt, so nothing more
//! may be written or called.

use std::future::Future;
use std::sync::Arc;

use crate::error::GatingFailure;
use crate::model::{GatingStatus, LocationSnapshot};
use crate::ports::PermissionStatus;

use super::GatingOrchestrator;
use super::step::GatingStep;
use super::transition;

/// Why an attempt stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Halt {
    /// Failure state committed.
    Failed,
    /// Session generation moved on; the attempt's writes are void.
    Superseded,
}

impl GatingOrchestrator {
    /// Full GPS flow: permission → service → fix → address → zone.
    pub(super) async fn run_location_flow(&self, generation: u64) -> Result<(), Halt> {
        self.commit(generation, |state| {
            transition::begin_attempt(state, GatingStatus::PermissionRequesting)
        })?;
        self.fire_connectivity_probe();

        self.ensure_permission(generation).await?;
        self.ensure_service_enabled(generation).await?;
        let snapshot = self.detect_location(generation).await?;
        self.validate_zone(generation, snapshot).await
    }

    async fn ensure_permission(&self, generation: u64) -> Result<(), Halt> {
        let mut permission = self
            .call(
                generation,
                GatingStep::PermissionCheck,
                self.gateway.check_permission(),
            )
            .await?;
        if permission.can_prompt() {
            permission = self
                .call(
                    generation,
                    GatingStep::PermissionRequest,
                    self.gateway.request_permission(),
                )
                .await?;
        }

        match permission {
            PermissionStatus::Granted => self.commit(generation, transition::permission_granted),
            PermissionStatus::DeniedForever => {
                Err(self.fail(generation, GatingFailure::PermissionDeniedForever))
            }
            PermissionStatus::Denied | PermissionStatus::Undetermined => {
                Err(self.fail(generation, GatingFailure::PermissionDenied))
            }
        }
    }

    async fn ensure_service_enabled(&self, generation: u64) -> Result<(), Halt> {
        let enabled = self
            .call(
                generation,
                GatingStep::ServiceCheck,
                self.gateway.is_service_enabled(),
            )
            .await?;
        if !enabled {
            self.commit(generation, |state| {
                transition::enter_step(state, GatingStatus::GpsEnabling)
            })?;
            let enabled = self
                .call(
                    generation,
                    GatingStep::ServiceEnable,
                    self.gateway.request_service_enable(),
                )
                .await?;
            if !enabled {
                return Err(self.fail(generation, GatingFailure::GpsDisabled));
            }
        }
        self.commit(generation, |state| {
            transition::enter_step(state, GatingStatus::LocationDetecting)
        })
    }

    async fn detect_location(&self, generation: u64) -> Result<LocationSnapshot, Halt> {
        let Some(coordinates) = self
            .call(
                generation,
                GatingStep::CoordinateFix,
                self.gateway.get_coordinates_only(),
            )
            .await?
        else {
            return Err(self.fail(generation, GatingFailure::CoordinatesUnavailable));
        };
        if let Err(failure) = coordinates.validate() {
            return Err(self.fail(generation, failure));
        }

        let captured = LocationSnapshot::from_coordinates(coordinates);
        self.commit(generation, |state| {
            transition::located(state, captured.clone())
        })?;
        tracing::debug!(coordinates = %coordinates, "gps fix captured");

        self.enrich_address(generation, captured).await
    }

    /// Reverse geocoding is best effort: any failure keeps the coordinates-only capture.
    async fn enrich_address(
        &self,
        generation: u64,
        captured: LocationSnapshot,
    ) -> Result<LocationSnapshot, Halt> {
        let result = self
            .bounded(
                GatingStep::AddressLookup,
                self.gateway.get_coordinates_with_address(),
            )
            .await;
        self.ensure_current(generation)?;

        match result {
            Ok(Ok(Some(enriched))) => Ok(captured.with_address_from(enriched)),
            Ok(Ok(None)) => {
                tracing::debug!("address lookup returned nothing; continuing with coordinates");
                Ok(captured)
            }
            Ok(Err(error)) => {
                tracing::warn!(
                    error = %format!("{error:#}"),
                    "address lookup failed; continuing with coordinates"
                );
                Ok(captured)
            }
            Err(failure) => {
                tracing::warn!(error = %failure, "address lookup timed out; continuing with coordinates");
                Ok(captured)
            }
        }
    }

    /// Zone resolution and outcome branching, shared by the GPS and manual paths.
    pub(super) async fn validate_zone(
        &self,
        generation: u64,
        snapshot: LocationSnapshot,
    ) -> Result<(), Halt> {
        let coordinates = snapshot.coordinates;
        self.commit(generation, |state| {
            transition::enter_zone_validation(state, snapshot)
        })?;

        let decision = self
            .call(
                generation,
                GatingStep::ZoneResolution,
                self.resolver.resolve(coordinates),
            )
            .await?;
        self.commit(generation, |state| {
            transition::apply_zone_decision(state, decision)
        })?;

        let state = self.state();
        tracing::info!(
            status = %state.status,
            access_level = ?state.access_level,
            coordinates = %coordinates,
            "zone validation finished"
        );
        Ok(())
    }

    /// Run one collaborator call; errors and timeouts commit a failure.
    async fn call<T, F>(&self, generation: u64, step: GatingStep, call: F) -> Result<T, Halt>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        tracing::debug!(step = %step, "gating step started");
        let result = self.bounded(step, call).await;
        self.ensure_current(generation)?;
        match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => {
                tracing::warn!(
                    step = %step,
                    error = %format!("{error:#}"),
                    "gating step failed"
                );
                Err(self.fail(generation, step.failure_for(&error)))
            }
            Err(failure) => Err(self.fail(generation, failure)),
        }
    }

    /// Apply the configured step timeout, if any.
    pub(super) async fn bounded<T, F>(&self, step: GatingStep, call: F) -> Result<T, GatingFailure>
    where
        F: Future<Output = T>,
    {
        let Some(limit) = self.config.step_timeout else {
            return Ok(call.await);
        };
        tokio::time::timeout(limit, call).await.map_err(|_| {
            tracing::warn!(step = %step, timeout = ?limit, "gating step timed out");
            GatingFailure::StepTimedOut {
                step,
                timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
            }
        })
    }

    pub(super) fn fail(&self, generation: u64, failure: GatingFailure) -> Halt {
        match self.commit(generation, |state| transition::fail(state, &failure)) {
            Ok(()) => {
                tracing::info!(
                    failure = ?failure.kind(),
                    message = %failure,
                    "location gating attempt failed"
                );
                Halt::Failed
            }
            Err(halt) => halt,
        }
    }

    /// Fire-and-check: the result is only logged and never gates the flow.
    fn fire_connectivity_probe(&self) {
        let probe = Arc::clone(&self.connectivity);
        let timeout = self.config.step_timeout;
        tokio::spawn(async move {
            let online = match timeout {
                Some(limit) => tokio::time::timeout(limit, probe.has_connection())
                    .await
                    .unwrap_or(false),
                None => probe.has_connection().await,
            };
            let step = GatingStep::ConnectivityProbe;
            if online {
                tracing::debug!(step = %step, "device online");
            } else {
                tracing::warn!(
                    step = %step,
                    "no connection reported; continuing with gps-only flow"
                );
            }
        });
    }
}
