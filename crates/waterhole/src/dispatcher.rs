//! Actor arrivals.
//!
//! One loop per species: wait a sampled gap around the species' arrival mean,
//! create an actor, pick a pool uniformly at random and start the actor's
//! admission loop on its own task. Loops never coordinate with each other.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::actor::{ActorFactory, Species};
use crate::admission::{self, RetryPolicy};
use crate::config::SimConfig;
use crate::pool::Pool;
use crate::sampler;

/// Arrival stream of one species.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrival {
    pub species: Species,
    /// Mean gap between two arrivals.
    pub arrival_mean: Duration,
    /// Mean service duration of each arriving actor.
    pub service_mean: Duration,
}

pub struct Dispatcher {
    pools: Arc<[Arc<Pool>]>,
    arrivals: Vec<Arrival>,
    retry: RetryPolicy,
    factory: Arc<ActorFactory>,
}

impl Dispatcher {
    /// # Panics
    ///
    /// Panics if `pools` is empty.
    pub fn new(pools: Vec<Arc<Pool>>, retry: RetryPolicy) -> Self {
        assert!(!pools.is_empty(), "dispatcher needs at least one pool");
        Self {
            pools: pools.into(),
            arrivals: Vec::new(),
            retry,
            factory: Arc::new(ActorFactory::new()),
        }
    }

    pub fn from_config(pools: Vec<Arc<Pool>>, config: &SimConfig) -> Self {
        config
            .arrivals()
            .into_iter()
            .fold(Self::new(pools, config.retry_policy()), Self::with_arrival)
    }

    pub fn with_arrival(mut self, arrival: Arrival) -> Self {
        self.arrivals.push(arrival);
        self
    }

    pub fn pools(&self) -> &[Arc<Pool>] {
        &self.pools
    }

    /// Start one arrival loop per configured species.
    pub fn spawn(self) -> DispatcherHandle {
        let shutdown = CancellationToken::new();
        let loops = self
            .arrivals
            .iter()
            .map(|&arrival| {
                tokio::spawn(arrival_loop(
                    arrival,
                    Arc::clone(&self.pools),
                    self.retry,
                    Arc::clone(&self.factory),
                    shutdown.child_token(),
                ))
            })
            .collect();

        tracing::info!(
            pools = self.pools.len(),
            species = self.arrivals.len(),
            "Dispatcher started"
        );

        DispatcherHandle {
            shutdown,
            loops,
            factory: self.factory,
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pools", &self.pools.len())
            .field("arrivals", &self.arrivals)
            .field("retry", &self.retry)
            .finish()
    }
}

async fn arrival_loop(
    arrival: Arrival,
    pools: Arc<[Arc<Pool>]>,
    retry: RetryPolicy,
    factory: Arc<ActorFactory>,
    shutdown: CancellationToken,
) {
    loop {
        let gap = sampler::sample(arrival.arrival_mean);
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(gap) => {}
        }

        let pool = Arc::clone(&pools[rand::thread_rng().gen_range(0..pools.len())]);
        let actor = factory.create(arrival.species, arrival.service_mean);
        tracing::debug!(
            pool = %pool.id(),
            actor = %actor.id(),
            species = %arrival.species,
            "Actor arrived"
        );
        // Admission loops outlive the dispatcher.
        tokio::spawn(admission::run(actor, pool, retry));
    }
    tracing::debug!(species = %arrival.species, "Arrival loop stopped");
}

/// Running dispatcher.
pub struct DispatcherHandle {
    shutdown: CancellationToken,
    loops: Vec<JoinHandle<()>>,
    factory: Arc<ActorFactory>,
}

impl DispatcherHandle {
    pub fn actors_created(&self) -> u64 {
        self.factory.created()
    }

    /// Stop every arrival loop and wait for them to exit.
    ///
    /// Actors already dispatched keep running their admission loops and
    /// sessions.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for result in futures::future::join_all(self.loops).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Arrival loop failed");
            }
        }
        tracing::info!(actors = self.factory.created(), "Dispatcher stopped");
    }
}

impl std::fmt::Debug for DispatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherHandle")
            .field("loops", &self.loops.len())
            .field("actors_created", &self.actors_created())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::pool::PoolId;
    use crate::sink::{ChannelSink, Occupancy};

    fn arrival(species: Species, arrival_secs: u64) -> Arrival {
        Arrival {
            species,
            arrival_mean: Duration::from_secs(arrival_secs),
            service_mean: Duration::from_secs(1),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dispatches_every_species_across_pools() {
        let (sink, mut rx) = ChannelSink::new();
        let sink = Arc::new(sink);
        let pools: Vec<_> = [6, 8]
            .into_iter()
            .enumerate()
            .map(|(i, slots)| {
                Arc::new(Pool::new(PoolId::new(i as u32 + 1), slots).with_sink(sink.clone()))
            })
            .collect();

        let handle = Dispatcher::new(pools, RetryPolicy::default())
            .with_arrival(arrival(Species::Exclusive, 5))
            .with_arrival(arrival(Species::Paired, 1))
            .with_arrival(arrival(Species::Gregarious, 1))
            .spawn();

        tokio::time::sleep(Duration::from_secs(120)).await;
        handle.shutdown().await;

        let mut species = HashSet::new();
        let mut pools = HashSet::new();
        while let Ok(event) = rx.try_recv() {
            if event.status == Occupancy::Enter {
                species.insert(event.species);
                pools.insert(event.pool.get());
            }
        }
        assert_eq!(species.len(), 3, "{species:?}");
        assert_eq!(pools, HashSet::from([1, 2]));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_arrivals() {
        let pool = Arc::new(Pool::new(PoolId::new(1), 5));
        let handle = Dispatcher::from_config(vec![pool], &SimConfig::default()).spawn();
        let factory = Arc::clone(&handle.factory);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(handle.actors_created() > 0);
        handle.shutdown().await;

        let created = factory.created();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(factory.created(), created);
    }

    #[test]
    fn from_config_registers_one_stream_per_species() {
        let pool = Arc::new(Pool::new(PoolId::new(1), 5));
        let dispatcher = Dispatcher::from_config(vec![pool], &SimConfig::default());
        assert_eq!(dispatcher.arrivals, SimConfig::default().arrivals());
        assert_eq!(dispatcher.pools().len(), 1);
        assert_eq!(dispatcher.retry, RetryPolicy::default());
    }

    #[test]
    #[should_panic(expected = "at least one pool")]
    fn empty_pool_set_is_rejected() {
        let _ = Dispatcher::new(Vec::new(), RetryPolicy::default());
    }
}
