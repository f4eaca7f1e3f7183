//! Point-in-time view of a pool.

use serde::Serialize;

use super::PoolId;
use super::ring::{self, Occupant};
use crate::actor::{ActorId, Species};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResidentInfo {
    pub actor: ActorId,
    pub species: Species,
}

impl Occupant for ResidentInfo {
    fn species(&self) -> Species {
        self.species
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolSnapshot {
    pub pool: PoolId,
    pub slots: Vec<Option<ResidentInfo>>,
    pub exclusive_present: bool,
    pub active_sessions: usize,
    /// Highest number of simultaneously active sessions seen so far.
    pub peak_active_sessions: usize,
}

impl PoolSnapshot {
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn resident_at(&self, slot: usize) -> Option<ActorId> {
        self.slots.get(slot).copied().flatten().map(|r| r.actor)
    }

    /// Slots held by `actor`, in ring order.
    pub fn slots_of(&self, actor: ActorId) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.filter(|r| r.actor == actor).map(|_| i))
            .collect()
    }

    /// Distinct residents, ordered by the first slot they hold.
    pub fn residents(&self) -> Vec<ResidentInfo> {
        let mut seen = Vec::new();
        for resident in self.slots.iter().flatten() {
            if !seen.iter().any(|r: &ResidentInfo| r.actor == resident.actor) {
                seen.push(*resident);
            }
        }
        seen
    }

    /// Whether an admission of `species` would be placed right now without
    /// waiting on the exclusion flag.
    pub fn can_place(&self, species: Species) -> bool {
        !self.exclusive_present && ring::find_placement(&self.slots, species).is_some()
    }
}
