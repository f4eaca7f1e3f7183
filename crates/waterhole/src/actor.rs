//! Actors and their species.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Admission category of an actor.
///
/// Placement rules for each species live in the pool; the species itself
/// carries no behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    /// Dominant: evicts every resident and holds the pool alone at slot 0.
    Exclusive,
    /// Occupies two ring-adjacent slots at once.
    Paired,
    /// Prefers a slot next to another of its kind.
    Gregarious,
}

impl Species {
    pub const ALL: [Species; 3] = [Species::Exclusive, Species::Paired, Species::Gregarious];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exclusive => "exclusive",
            Self::Paired => "paired",
            Self::Gregarious => "gregarious",
        }
    }
}

impl std::fmt::Display for Species {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-unique actor identity. Ids increase monotonically per factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(u64);

impl ActorId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One arriving entity.
///
/// Immutable once created. The only mutable per-actor state (its
/// cancellation flag) is owned by the pool for the duration of a session.
#[derive(Debug)]
pub struct Actor {
    id: ActorId,
    species: Species,
    mean_duration: Duration,
}

impl Actor {
    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn species(&self) -> Species {
        self.species
    }

    /// Mean of the service duration sampled when a session starts.
    pub fn mean_duration(&self) -> Duration {
        self.mean_duration
    }
}

/// Creates actors with unique, increasing ids.
#[derive(Debug)]
pub struct ActorFactory {
    next_id: AtomicU64,
}

impl ActorFactory {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    pub fn create(&self, species: Species, mean_duration: Duration) -> Arc<Actor> {
        let id = ActorId(self.next_id.fetch_add(1, Ordering::Relaxed));
        Arc::new(Actor {
            id,
            species,
            mean_duration,
        })
    }

    /// Number of actors created so far.
    pub fn created(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed) - 1
    }
}

impl Default for ActorFactory {
    fn default() -> Self {
        Self::new()
    }
}
