//! The shared pool: slot table, exclusion flag, throttle and sessions.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Notify, Semaphore};
use tokio_util::sync::CancellationToken;

use super::PoolId;
use super::ring::{self, Occupant};
use super::session::{ActivePermit, Session, SessionOutcome};
use super::snapshot::{PoolSnapshot, ResidentInfo};
use crate::actor::{Actor, ActorId, Species};
use crate::sampler;
use crate::sink::{NoopSink, Occupancy, OccupancyEvent, OccupancySink};

/// An actor currently holding a slot, with the handle that cancels its
/// session. Both slots of a paired actor share one token.
struct Resident {
    actor: Arc<Actor>,
    cancel: CancellationToken,
}

impl Occupant for Resident {
    fn species(&self) -> Species {
        self.actor.species()
    }
}

struct PoolState {
    slots: Vec<Option<Resident>>,
    /// Set while an exclusive actor holds the pool.
    exclusive: Option<ActorId>,
}

impl PoolState {
    fn holds(&self, actor: ActorId) -> bool {
        self.slots
            .iter()
            .flatten()
            .any(|r| r.actor.id() == actor)
    }
}

/// A capacity-limited pool of ring-arranged slots.
///
/// Every admission decision and every cleanup runs under one mutex, so slot
/// state is never observed half-updated. The mutex is never held across an
/// `.await`.
pub struct Pool {
    id: PoolId,
    slot_count: usize,
    state: Mutex<PoolState>,
    exclusion_cleared: Notify,
    throttle: Arc<Semaphore>,
    active: AtomicUsize,
    peak_active: AtomicUsize,
    sink: Arc<dyn OccupancySink>,
}

impl Pool {
    /// # Panics
    ///
    /// Panics if `slot_count` is zero.
    pub fn new(id: PoolId, slot_count: usize) -> Self {
        assert!(slot_count > 0, "pool {id} must have at least one slot");
        Self {
            id,
            slot_count,
            state: Mutex::new(PoolState {
                slots: (0..slot_count).map(|_| None).collect(),
                exclusive: None,
            }),
            exclusion_cleared: Notify::new(),
            throttle: Arc::new(Semaphore::new(slot_count)),
            active: AtomicUsize::new(0),
            peak_active: AtomicUsize::new(0),
            sink: Arc::new(NoopSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn OccupancySink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn id(&self) -> PoolId {
        self.id
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn exclusive_present(&self) -> bool {
        self.lock_state().exclusive.is_some()
    }

    /// Sessions currently in their service phase.
    pub fn active_sessions(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        let state = self.lock_state();
        PoolSnapshot {
            pool: self.id,
            slots: state
                .slots
                .iter()
                .map(|slot| {
                    slot.as_ref().map(|r| ResidentInfo {
                        actor: r.actor.id(),
                        species: r.actor.species(),
                    })
                })
                .collect(),
            exclusive_present: state.exclusive.is_some(),
            active_sessions: self.active.load(Ordering::Acquire),
            peak_active_sessions: self.peak_active.load(Ordering::Acquire),
        }
    }

    /// Try to place `actor` under its species rule.
    ///
    /// Waits (without polling) while an exclusive actor holds the pool. After
    /// that, returns `false` if there is currently no room, or `true` once the
    /// actor is placed and its session has been started. Callers retry on
    /// `false`.
    ///
    /// # Panics
    ///
    /// Panics if `actor` already holds a slot in this pool.
    pub async fn admit(self: &Arc<Self>, actor: &Arc<Actor>) -> bool {
        loop {
            // Register before checking the flag so a clear between the check
            // and the await still wakes us.
            let cleared = self.exclusion_cleared.notified();
            tokio::pin!(cleared);
            cleared.as_mut().enable();

            if let Some(admitted) = self.try_place(actor) {
                return admitted;
            }

            tracing::trace!(pool = %self.id, actor = %actor.id(), "Waiting for exclusive occupant to leave");
            cleared.await;
        }
    }

    /// `None` while the exclusion flag is set.
    fn try_place(self: &Arc<Self>, actor: &Arc<Actor>) -> Option<bool> {
        let mut state = self.lock_state();

        assert!(
            !state.holds(actor.id()),
            "actor {} is already resident in pool {}",
            actor.id(),
            self.id
        );

        if state.exclusive.is_some() {
            return None;
        }

        let Some(placement) = ring::find_placement(&state.slots, actor.species()) else {
            tracing::trace!(pool = %self.id, actor = %actor.id(), species = %actor.species(), "No placement available");
            return Some(false);
        };

        if actor.species() == Species::Exclusive {
            state.exclusive = Some(actor.id());
            self.evict_all(&mut state, actor.id());
        }

        let cancel = CancellationToken::new();
        for slot in placement.slots() {
            state.slots[slot] = Some(Resident {
                actor: Arc::clone(actor),
                cancel: cancel.clone(),
            });
            self.notify(slot, actor, Occupancy::Enter);
        }

        tracing::debug!(
            pool = %self.id,
            actor = %actor.id(),
            species = %actor.species(),
            ?placement,
            "Actor admitted"
        );

        let session = Session::new(Arc::clone(actor), placement, cancel);
        tokio::spawn(Arc::clone(self).serve(session));
        Some(true)
    }

    /// Empty every slot, cancelling the sessions that held them.
    fn evict_all(&self, state: &mut PoolState, by: ActorId) {
        let mut evicted = 0usize;
        for slot in 0..state.slots.len() {
            if let Some(resident) = state.slots[slot].take() {
                self.notify(slot, &resident.actor, Occupancy::Exit);
                resident.cancel.cancel();
                evicted += 1;
            }
        }
        if evicted > 0 {
            tracing::info!(pool = %self.id, actor = %by, evicted, "Exclusive actor cleared the pool");
        }
    }

    async fn serve(self: Arc<Self>, session: Session) {
        let service = sampler::sample(session.actor().mean_duration());
        let cancel = session.cancel_token().clone();

        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            permit = Arc::clone(&self.throttle).acquire_owned() => match permit {
                Ok(permit) => Some(permit),
                Err(e) => {
                    tracing::error!(pool = %self.id, error = %e, "Throttle closed");
                    None
                }
            },
        };
        let permit = permit.map(|p| ActivePermit::new(p, &self.active, &self.peak_active));

        let outcome = if permit.is_some() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => SessionOutcome::Preempted,
                _ = tokio::time::sleep(service) => SessionOutcome::Completed,
            }
        } else {
            SessionOutcome::Preempted
        };

        tracing::debug!(
            pool = %self.id,
            actor = %session.actor().id(),
            outcome = outcome.as_str(),
            service = ?service,
            "Session ended"
        );

        self.release(&session);
        drop(permit);
    }

    /// Free whatever `session` still holds.
    ///
    /// Slots are cleared only if they still reference the session's actor,
    /// so cleanup after an eviction leaves the new occupant alone. Returns
    /// `false` when there was nothing left to release; calling it again for
    /// the same session is a no-op.
    pub(crate) fn release(&self, session: &Session) -> bool {
        let actor = session.actor();
        let mut state = self.lock_state();

        let mut released = false;
        for slot in session.placement().slots() {
            let still_ours = state.slots[slot]
                .as_ref()
                .is_some_and(|r| r.actor.id() == actor.id());
            if still_ours {
                state.slots[slot] = None;
                self.notify(slot, actor, Occupancy::Exit);
                released = true;
            }
        }

        let was_exclusive = state.exclusive == Some(actor.id());
        if was_exclusive {
            state.exclusive = None;
        }
        drop(state);

        if was_exclusive {
            tracing::debug!(pool = %self.id, actor = %actor.id(), "Exclusive actor left, waking waiters");
            self.exclusion_cleared.notify_waiters();
        }

        released || was_exclusive
    }

    fn notify(&self, slot: usize, actor: &Actor, status: Occupancy) {
        self.sink.on_change(&OccupancyEvent {
            pool: self.id,
            slot,
            actor: actor.id(),
            species: actor.species(),
            status,
        });
    }

    /// Lock the slot state, recovering from poison.
    ///
    /// Contract checks run before any mutation, so a panic under the lock
    /// leaves the state consistent.
    fn lock_state(&self) -> MutexGuard<'_, PoolState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!(pool = %self.id, "Pool state mutex poisoned - recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("id", &self.id)
            .field("slot_count", &self.slot_count)
            .field("active", &self.active_sessions())
            .finish_non_exhaustive()
    }
}
