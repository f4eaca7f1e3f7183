//! Actor admission loop.
//!
//! An actor keeps asking its pool for a slot, backing off between refusals,
//! until it is admitted. Once admitted the loop ends; the session runs inside
//! the pool. With the default policy there is no retry limit, so an actor can
//! wait forever under sustained contention.

use std::sync::Arc;
use std::time::Duration;

use crate::actor::Actor;
use crate::pool::Pool;

/// Default pause between refused admissions.
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub backoff: Duration,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: DEFAULT_BACKOFF,
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Give up after `max_attempts` refusals. Zero is treated as one, since
    /// every run makes at least one attempt.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts.max(1));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted { attempts: u32 },
    /// Only reachable with a bounded policy.
    GaveUp { attempts: u32 },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted { .. })
    }

    pub fn attempts(&self) -> u32 {
        match *self {
            Admission::Admitted { attempts } | Admission::GaveUp { attempts } => attempts,
        }
    }
}

pub async fn run(actor: Arc<Actor>, pool: Arc<Pool>, policy: RetryPolicy) -> Admission {
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        if pool.admit(&actor).await {
            tracing::trace!(pool = %pool.id(), actor = %actor.id(), attempts, "Admission loop done");
            return Admission::Admitted { attempts };
        }

        if policy.max_attempts.is_some_and(|max| attempts >= max) {
            tracing::warn!(
                pool = %pool.id(),
                actor = %actor.id(),
                species = %actor.species(),
                attempts,
                "Giving up on admission"
            );
            return Admission::GaveUp { attempts };
        }

        tokio::time::sleep(policy.backoff).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{ActorFactory, Species};
    use crate::pool::PoolId;

    #[test]
    fn default_policy_is_unbounded() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff, Duration::from_millis(100));
        assert_eq!(policy.max_attempts, None);
        assert_eq!(RetryPolicy::default().with_max_attempts(0).max_attempts, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_a_slot_frees_up() {
        let pool = Arc::new(Pool::new(PoolId::new(1), 1));
        let factory = ActorFactory::new();
        let holder = factory.create(Species::Gregarious, Duration::from_secs(1));
        assert!(pool.admit(&holder).await);

        let late = factory.create(Species::Gregarious, Duration::from_secs(1));
        let outcome = run(late, Arc::clone(&pool), RetryPolicy::default()).await;

        assert!(outcome.is_admitted());
        assert!(outcome.attempts() >= 2, "{outcome:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_policy_reports_starvation() {
        let pool = Arc::new(Pool::new(PoolId::new(1), 1));
        let factory = ActorFactory::new();
        let holder = factory.create(Species::Gregarious, Duration::from_secs(1_000));
        assert!(pool.admit(&holder).await);

        // A pair can never fit a single-slot ring.
        let pair = factory.create(Species::Paired, Duration::from_secs(1));
        let started = tokio::time::Instant::now();
        let policy = RetryPolicy::default().with_max_attempts(5);
        let outcome = run(pair, Arc::clone(&pool), policy).await;

        assert_eq!(outcome, Admission::GaveUp { attempts: 5 });
        let waited = started.elapsed();
        assert!(waited >= DEFAULT_BACKOFF * 4 && waited < DEFAULT_BACKOFF * 5, "{waited:?}");
    }
}
