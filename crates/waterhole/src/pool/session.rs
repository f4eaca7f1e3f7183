//! Service sessions and their throttle permits.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::OwnedSemaphorePermit;
use tokio_util::sync::CancellationToken;

use super::ring::Placement;
use crate::actor::Actor;

/// One admitted actor being served.
///
/// The cancellation token is shared with the resident entries in the slot
/// table, so an eviction can interrupt the session it displaces.
#[derive(Debug)]
pub(crate) struct Session {
    actor: Arc<Actor>,
    placement: Placement,
    cancel: CancellationToken,
}

impl Session {
    pub(crate) fn new(actor: Arc<Actor>, placement: Placement, cancel: CancellationToken) -> Self {
        Self {
            actor,
            placement,
            cancel,
        }
    }

    pub(crate) fn actor(&self) -> &Arc<Actor> {
        &self.actor
    }

    pub(crate) fn placement(&self) -> Placement {
        self.placement
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionOutcome {
    Completed,
    /// Cancelled by an exclusive admission. Expected, not an error.
    Preempted,
}

impl SessionOutcome {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Preempted => "preempted",
        }
    }
}

/// Throttle permit held for the service phase of a session.
///
/// Counts itself in the pool's active-session gauge and records the peak.
/// The permit goes back to the throttle on drop.
pub(crate) struct ActivePermit<'a> {
    _permit: OwnedSemaphorePermit,
    active: &'a AtomicUsize,
}

impl<'a> ActivePermit<'a> {
    pub(crate) fn new(
        permit: OwnedSemaphorePermit,
        active: &'a AtomicUsize,
        peak: &AtomicUsize,
    ) -> Self {
        let current = active.fetch_add(1, Ordering::AcqRel) + 1;
        peak.fetch_max(current, Ordering::AcqRel);
        Self {
            _permit: permit,
            active,
        }
    }
}

impl Drop for ActivePermit<'_> {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}
