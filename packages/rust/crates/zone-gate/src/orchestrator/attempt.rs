use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::TriggerError;

const FREE: u64 = 0;

/// Trigger that owns the in-flight slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttemptKind {
    Start,
    Retry,
    ManualAddress,
}

impl AttemptKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Retry => "retry",
            Self::ManualAddress => "manual_address",
        }
    }
}

/// Single in-flight slot shared by every pipeline trigger.
///
/// The slot holds an owner token derived from the session generation
/// (`generation + 1`, `0` when free). An attempt from an older generation has been
/// superseded, so a trigger of the current generation takes the slot over instead
/// of waiting for the stale collaborator call to return.
#[derive(Debug, Default)]
pub(crate) struct AttemptSlot {
    owner: AtomicU64,
}

impl AttemptSlot {
    pub(crate) fn try_begin(
        &self,
        kind: AttemptKind,
        generation: u64,
    ) -> Result<AttemptGuard<'_>, TriggerError> {
        let token = generation.saturating_add(1);
        let mut current = self.owner.load(Ordering::Acquire);
        loop {
            if current != FREE && current >= token {
                tracing::debug!(
                    attempt = kind.as_str(),
                    generation,
                    "rejecting gating trigger; attempt already in flight"
                );
                return Err(TriggerError::AttemptInFlight);
            }
            match self
                .owner
                .compare_exchange(current, token, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        if current == FREE {
            tracing::debug!(attempt = kind.as_str(), generation, "gating attempt started");
        } else {
            tracing::debug!(
                attempt = kind.as_str(),
                generation,
                superseded_generation = current - 1,
                "gating attempt started; took over slot from superseded attempt"
            );
        }
        Ok(AttemptGuard {
            slot: self,
            kind,
            token,
        })
    }

    /// An attempt of `generation` holds the slot. Superseded holders do not count.
    pub(crate) fn is_busy(&self, generation: u64) -> bool {
        self.owner.load(Ordering::Acquire) == generation.saturating_add(1)
    }
}

/// Releases the slot on drop, including when the attempt future is dropped mid-step.
/// A guard whose slot was taken over leaves the new owner in place.
pub(crate) struct AttemptGuard<'a> {
    slot: &'a AttemptSlot,
    kind: AttemptKind,
    token: u64,
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        let released = self
            .slot
            .owner
            .compare_exchange(self.token, FREE, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        tracing::trace!(
            attempt = self.kind.as_str(),
            released,
            "gating attempt guard dropped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_attempt_is_rejected_until_guard_drops() {
        let slot = AttemptSlot::default();
        let guard = slot.try_begin(AttemptKind::Start, 0).expect("first attempt");
        assert!(slot.is_busy(0));
        assert_eq!(
            slot.try_begin(AttemptKind::Retry, 0).err(),
            Some(TriggerError::AttemptInFlight)
        );
        drop(guard);
        assert!(!slot.is_busy(0));
        assert!(slot.try_begin(AttemptKind::ManualAddress, 0).is_ok());
    }

    #[test]
    fn newer_generation_takes_over_superseded_slot() {
        let slot = AttemptSlot::default();
        let stale = slot.try_begin(AttemptKind::Start, 3).expect("stale attempt");
        assert!(!slot.is_busy(4));

        let fresh = slot.try_begin(AttemptKind::Retry, 4).expect("takeover");
        assert!(slot.is_busy(4));
        assert_eq!(
            slot.try_begin(AttemptKind::Start, 3).err(),
            Some(TriggerError::AttemptInFlight)
        );

        drop(stale);
        assert!(slot.is_busy(4), "stale guard must not release the new owner");
        drop(fresh);
        assert!(!slot.is_busy(4));
    }
}
