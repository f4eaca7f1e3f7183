//! Occupancy board fed by pool events.
//!
//! The board keeps its own copy of every pool's slots, rebuilt purely from
//! enter/exit events, so rendering never takes a pool lock.

use std::fmt::Write as _;

use dashmap::DashMap;
use waterhole::{ActorId, Occupancy, OccupancyEvent, OccupancySink, PoolId, Species};

type Cell = Option<(ActorId, Species)>;

#[derive(Debug, Default)]
pub struct Board {
    pools: DashMap<PoolId, Vec<Cell>>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, pool: PoolId, slot_count: usize) {
        self.pools.insert(pool, vec![None; slot_count]);
    }

    /// One line per pool, ordered by pool id.
    pub fn render(&self) -> String {
        let mut rows: Vec<(PoolId, String)> = self
            .pools
            .iter()
            .map(|entry| {
                let cells: String = entry
                    .value()
                    .iter()
                    .map(|cell| match cell {
                        Some((_, species)) => glyph(*species),
                        None => '.',
                    })
                    .collect();
                (*entry.key(), cells)
            })
            .collect();
        rows.sort_by_key(|(pool, _)| *pool);

        let mut out = String::new();
        for (pool, cells) in rows {
            let _ = writeln!(out, "pool {pool:>2} [{cells}]");
        }
        out
    }
}

fn glyph(species: Species) -> char {
    match species {
        Species::Exclusive => 'E',
        Species::Paired => 'P',
        Species::Gregarious => 'G',
    }
}

impl OccupancySink for Board {
    fn on_change(&self, event: &OccupancyEvent) {
        let Some(mut slots) = self.pools.get_mut(&event.pool) else {
            tracing::warn!(pool = %event.pool, "Event for unregistered pool");
            return;
        };
        let Some(cell) = slots.get_mut(event.slot) else {
            tracing::warn!(pool = %event.pool, slot = event.slot, "Event for unknown slot");
            return;
        };
        match event.status {
            Occupancy::Enter => *cell = Some((event.actor, event.species)),
            Occupancy::Exit => {
                if cell.is_some_and(|(actor, _)| actor == event.actor) {
                    *cell = None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use waterhole::{ActorFactory, Pool};

    use super::*;

    #[test]
    fn renders_empty_pools_in_id_order() {
        let board = Board::new();
        board.register(PoolId::new(2), 3);
        board.register(PoolId::new(1), 5);
        insta::assert_snapshot!(board.render(), @r###"
        pool  1 [.....]
        pool  2 [...]
        "###);
    }

    #[tokio::test(start_paused = true)]
    async fn mirrors_pool_occupancy() {
        let board = Arc::new(Board::new());
        let id = PoolId::new(1);
        board.register(id, 5);
        let pool = Arc::new(Pool::new(id, 5).with_sink(board.clone()));

        let factory = ActorFactory::new();
        let long = Duration::from_secs(1_000);
        assert!(pool.admit(&factory.create(Species::Paired, long)).await);
        assert!(pool.admit(&factory.create(Species::Gregarious, long)).await);
        assert_eq!(board.render(), "pool  1 [PPG..]\n");

        assert!(pool.admit(&factory.create(Species::Exclusive, long)).await);
        assert_eq!(board.render(), "pool  1 [E....]\n");
    }

    #[test]
    fn stale_exit_keeps_new_occupant() {
        let board = Board::new();
        let pool = PoolId::new(1);
        board.register(pool, 2);
        let factory = ActorFactory::new();
        let old = factory.create(Species::Gregarious, Duration::ZERO);
        let new = factory.create(Species::Exclusive, Duration::ZERO);

        let event = |actor: &waterhole::Actor, status| OccupancyEvent {
            pool,
            slot: 0,
            actor: actor.id(),
            species: actor.species(),
            status,
        };
        board.on_change(&event(&old, Occupancy::Enter));
        board.on_change(&event(&new, Occupancy::Enter));
        board.on_change(&event(&old, Occupancy::Exit));
        assert_eq!(board.render(), "pool  1 [E.]\n");

        // Unknown pools and slots are ignored.
        board.on_change(&OccupancyEvent {
            pool: PoolId::new(9),
            ..event(&old, Occupancy::Enter)
        });
        board.on_change(&OccupancyEvent {
            slot: 7,
            ..event(&old, Occupancy::Enter)
        });
        assert_eq!(board.render(), "pool  1 [E.]\n");
    }
}
