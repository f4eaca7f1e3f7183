//! Resource pools contended by actors.
//!
//! A pool is a ring of slots guarded by one lock. Admission follows the
//! actor's species:
//! - `Exclusive`: waits for any other exclusive to leave, then evicts every
//!   resident (cancelling their sessions) and takes slot 0 alone
//! - `Paired`: takes the first two adjacent empty slots, wrapping at the end
//! - `Gregarious`: takes the first empty slot next to another gregarious
//!   actor, or any empty slot if none is present
//!
//! Admitted actors are served by a session task that holds one throttle
//! permit for its service phase.

mod ring;
mod session;
mod shared;
mod snapshot;

use serde::{Deserialize, Serialize};

pub use ring::Placement;
pub use shared::Pool;
pub use snapshot::{PoolSnapshot, ResidentInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolId(u32);

impl PoolId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for PoolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
