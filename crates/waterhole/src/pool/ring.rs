//! Placement search over a ring of slots.
//!
//! Slot `i` of an `n`-slot ring is adjacent to `(i - 1) mod n` and
//! `(i + 1) mod n`, for every `i` including the boundary slots.

use serde::Serialize;

use crate::actor::Species;

/// Anything that can sit in a slot and report its species.
pub(crate) trait Occupant {
    fn species(&self) -> Species;
}

impl Occupant for Species {
    fn species(&self) -> Species {
        *self
    }
}

/// The slot(s) an admitted actor occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Single(usize),
    /// Two ring-adjacent slots, `second == (first + 1) mod n`.
    Pair(usize, usize),
}

impl Placement {
    pub fn slots(&self) -> impl Iterator<Item = usize> + use<> {
        let (first, second) = match *self {
            Placement::Single(slot) => (slot, None),
            Placement::Pair(first, second) => (first, Some(second)),
        };
        std::iter::once(first).chain(second)
    }

    pub fn contains(&self, slot: usize) -> bool {
        self.slots().any(|s| s == slot)
    }
}

pub(crate) fn neighbors(slot: usize, n: usize) -> [usize; 2] {
    [(slot + n - 1) % n, (slot + 1) % n]
}

/// First placement `species` would get in `slots`, if any.
///
/// Exclusive actors always get slot 0; clearing the other residents is the
/// caller's job.
pub(crate) fn find_placement<T: Occupant>(
    slots: &[Option<T>],
    species: Species,
) -> Option<Placement> {
    if slots.is_empty() {
        return None;
    }
    match species {
        Species::Exclusive => Some(Placement::Single(0)),
        Species::Paired => find_pair(slots),
        Species::Gregarious => find_gregarious(slots),
    }
}

fn find_pair<T>(slots: &[Option<T>]) -> Option<Placement> {
    let n = slots.len();
    (0..n).find_map(|i| {
        let j = (i + 1) % n;
        (i != j && slots[i].is_none() && slots[j].is_none()).then_some(Placement::Pair(i, j))
    })
}

fn find_gregarious<T: Occupant>(slots: &[Option<T>]) -> Option<Placement> {
    let n = slots.len();
    let is_gregarious =
        |slot: usize| matches!(&slots[slot], Some(o) if o.species() == Species::Gregarious);

    let next_to_kin = (0..n).find(|&i| {
        slots[i].is_none() && neighbors(i, n).into_iter().any(|nb| nb != i && is_gregarious(nb))
    });
    if let Some(slot) = next_to_kin {
        return Some(Placement::Single(slot));
    }

    if (0..n).any(is_gregarious) {
        return None;
    }
    slots
        .iter()
        .position(Option::is_none)
        .map(Placement::Single)
}
