//! The optimistic half of voting: intent bookkeeping, delta resolution and
//! the snapshot/rollback protocol. The stores own the displayed counts;
//! this module owns everything per-user and per-flight.

use std::collections::HashMap;

use uuid::Uuid;

use shared::VoteDirection;

use crate::error::StoreError;

/// Outcome of applying a requested direction on top of a held one.
///
/// Clicking the held direction again retracts it; clicking the opposite
/// direction switches, folding the retraction and the new vote into one
/// step of double weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteTransition {
    /// Direction to persist. `None` means "retract the vote".
    pub next: Option<VoteDirection>,
    /// Net change to the displayed count.
    pub delta: i64,
}

pub fn resolve_transition(
    prev: Option<VoteDirection>,
    requested: VoteDirection,
) -> VoteTransition {
    match prev {
        Some(held) if held == requested => VoteTransition {
            next: None,
            delta: -held.weight(),
        },
        Some(held) => VoteTransition {
            next: Some(requested),
            delta: requested.weight() - held.weight(),
        },
        None => VoteTransition {
            next: Some(requested),
            delta: requested.weight(),
        },
    }
}

/// State to restore if the confirming request fails: the intent and the
/// displayed count exactly as they were before the optimistic mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteSnapshot {
    pub intent: Option<VoteDirection>,
    pub votes: i64,
}

/// A vote that has been applied locally but not yet confirmed. Must be
/// settled exactly once, with [`VoteLedger::commit`] or
/// [`VoteLedger::rollback`].
#[derive(Debug, Clone, Copy)]
pub struct PendingVote {
    pub item: Uuid,
    pub next: Option<VoteDirection>,
    pub delta: i64,
    pub snapshot: VoteSnapshot,
    ticket: u64,
}

/// Owns the current user's vote intents and the per-item in-flight guard.
///
/// Invariants: at most one intent per item, at most one pending vote per
/// item. A second vote for an item whose confirmation is still in flight
/// is rejected, not queued. Tickets make settlement idempotent against
/// eviction: once an item leaves the ledger, its outstanding pending vote
/// can no longer touch state.
#[derive(Debug, Default)]
pub struct VoteLedger {
    intents: HashMap<Uuid, VoteDirection>,
    in_flight: HashMap<Uuid, u64>,
    next_ticket: u64,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intent(&self, item: &Uuid) -> Option<VoteDirection> {
        self.intents.get(item).copied()
    }

    pub fn has_in_flight(&self, item: &Uuid) -> bool {
        self.in_flight.contains_key(item)
    }

    /// Applies the intent side of the transition and reserves the item.
    /// The caller applies the returned delta to the displayed count and
    /// settles the pending vote once the confirming request resolves.
    pub fn begin(
        &mut self,
        item: Uuid,
        requested: VoteDirection,
        votes: i64,
    ) -> Result<PendingVote, StoreError> {
        if self.in_flight.contains_key(&item) {
            return Err(StoreError::InFlight(item));
        }

        let prev = self.intent(&item);
        let transition = resolve_transition(prev, requested);

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight.insert(item, ticket);

        match transition.next {
            Some(direction) => {
                self.intents.insert(item, direction);
            }
            None => {
                self.intents.remove(&item);
            }
        }

        Ok(PendingVote {
            item,
            next: transition.next,
            delta: transition.delta,
            snapshot: VoteSnapshot { intent: prev, votes },
            ticket,
        })
    }

    /// Confirmation arrived; the optimistic state is the truth. Returns
    /// false when the pending vote went stale in the meantime.
    pub fn commit(&mut self, pending: &PendingVote) -> bool {
        self.settle(pending)
    }

    /// Confirmation failed. Restores the held intent and hands back the
    /// snapshot so the caller can restore the count, or `None` when the
    /// pending vote went stale (item evicted, ledger reset) and nothing
    /// may be touched.
    pub fn rollback(&mut self, pending: &PendingVote) -> Option<VoteSnapshot> {
        if !self.settle(pending) {
            return None;
        }
        match pending.snapshot.intent {
            Some(direction) => {
                self.intents.insert(pending.item, direction);
            }
            None => {
                self.intents.remove(&pending.item);
            }
        }
        Some(pending.snapshot)
    }

    fn settle(&mut self, pending: &PendingVote) -> bool {
        match self.in_flight.get(&pending.item) {
            Some(&ticket) if ticket == pending.ticket => {
                self.in_flight.remove(&pending.item);
                true
            }
            _ => false,
        }
    }

    /// Replaces settled intents with server truth after a batch load.
    /// Items with a vote still in flight keep their optimistic intent;
    /// the pending settlement decides their fate.
    pub fn seed_intents(&mut self, server: HashMap<Uuid, VoteDirection>) {
        let in_flight = &self.in_flight;
        self.intents.retain(|item, _| in_flight.contains_key(item));
        for (item, direction) in server {
            if !self.in_flight.contains_key(&item) {
                self.intents.insert(item, direction);
            }
        }
    }

    /// Drops all ledger state for one item.
    pub fn forget(&mut self, item: &Uuid) {
        self.intents.remove(item);
        self.in_flight.remove(item);
    }

    /// Drops ledger state for every item not kept, used when the active
    /// view is replaced.
    pub fn retain(&mut self, keep: impl Fn(&Uuid) -> bool) {
        self.intents.retain(|item, _| keep(item));
        self.in_flight.retain(|item, _| keep(item));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::VoteDirection::{Down, Up};

    fn item() -> Uuid {
        Uuid::new_v4()
    }

    #[test]
    fn transition_table() {
        // (prev, requested) -> (next, delta), all six rows
        let cases = [
            (None, Up, Some(Up), 1),
            (None, Down, Some(Down), -1),
            (Some(Up), Up, None, -1),
            (Some(Down), Down, None, 1),
            (Some(Up), Down, Some(Down), -2),
            (Some(Down), Up, Some(Up), 2),
        ];
        for (prev, requested, next, delta) in cases {
            let t = resolve_transition(prev, requested);
            assert_eq!(t.next, next, "{prev:?} + {requested:?}");
            assert_eq!(t.delta, delta, "{prev:?} + {requested:?}");
        }
    }

    #[test]
    fn begin_records_intent_and_reserves_item() {
        let id = item();
        let mut ledger = VoteLedger::new();

        let pending = ledger.begin(id, Up, 10).unwrap();
        assert_eq!(pending.delta, 1);
        assert_eq!(ledger.intent(&id), Some(Up));
        assert!(ledger.has_in_flight(&id));

        assert!(matches!(
            ledger.begin(id, Down, 11),
            Err(StoreError::InFlight(rejected)) if rejected == id
        ));

        assert!(ledger.commit(&pending));
        assert!(!ledger.has_in_flight(&id));
        assert_eq!(ledger.intent(&id), Some(Up));
    }

    #[test]
    fn rollback_restores_the_exact_snapshot() {
        let id = item();
        let mut ledger = VoteLedger::new();

        ledger.seed_intents([(id, Down)].into_iter().collect());
        let pending = ledger.begin(id, Up, 4).unwrap();
        assert_eq!(pending.delta, 2);
        assert_eq!(ledger.intent(&id), Some(Up));

        let snapshot = ledger.rollback(&pending).unwrap();
        assert_eq!(snapshot, VoteSnapshot { intent: Some(Down), votes: 4 });
        assert_eq!(ledger.intent(&id), Some(Down));
        assert!(!ledger.has_in_flight(&id));
    }

    #[test]
    fn settlement_is_idempotent_and_eviction_aware() {
        let id = item();
        let mut ledger = VoteLedger::new();

        let pending = ledger.begin(id, Up, 0).unwrap();
        ledger.forget(&id);

        // evicted: neither settlement path may report success
        assert!(!ledger.commit(&pending));
        assert!(ledger.rollback(&pending).is_none());
        assert_eq!(ledger.intent(&id), None);

        // a fresh flight for the same item gets a new ticket; the stale
        // pending vote still cannot settle it
        let fresh = ledger.begin(id, Up, 0).unwrap();
        assert!(!ledger.commit(&pending));
        assert!(ledger.commit(&fresh));
    }

    #[test]
    fn seeding_skips_items_with_a_flight_up() {
        let a = item();
        let b = item();
        let mut ledger = VoteLedger::new();

        let pending = ledger.begin(a, Up, 0).unwrap();
        ledger.seed_intents([(a, Down), (b, Down)].into_iter().collect());

        assert_eq!(ledger.intent(&a), Some(Up), "in-flight intent kept");
        assert_eq!(ledger.intent(&b), Some(Down));

        ledger.commit(&pending);
    }
}
