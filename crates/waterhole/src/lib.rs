//! waterhole: capacity-limited shared pools contended by concurrent actors.
//!
//! Actors of three species compete for the slots of a ring-shaped pool:
//! exclusive actors evict everyone and hold the pool alone, paired actors
//! need two adjacent slots, gregarious actors prefer to sit next to their
//! own kind. A per-pool throttle bounds how many sessions are served at once.
//!
//! The pieces, bottom-up:
//! - [`sampler`]: service and arrival durations
//! - [`pool`]: slot table, admission rules, sessions and cancellation
//! - [`admission`]: the retry loop each actor runs against its pool
//! - [`dispatcher`]: per-species arrival streams
//! - [`sink`]: occupancy change notifications

pub mod actor;
pub mod admission;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod pool;
pub mod sampler;
pub mod sink;

pub use actor::{Actor, ActorFactory, ActorId, Species};
pub use admission::{Admission, RetryPolicy};
pub use config::{PoolLayout, RandomLayout, SimConfig, SpeciesConfig, SpeciesTable};
pub use dispatcher::{Arrival, Dispatcher, DispatcherHandle};
pub use error::ConfigError;
pub use pool::{Placement, Pool, PoolId, PoolSnapshot, ResidentInfo};
pub use sink::{
    ChannelSink, FanoutSink, NoopSink, Occupancy, OccupancyEvent, OccupancySink, TracingSink,
};
