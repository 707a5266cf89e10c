//! Property-Based Tests for GRUDGE Core
//!
//! Uses `proptest` to check the store's invariants under arbitrary event
//! sequences: bounded scores, bounded FIFO logs, the escalation rule and the
//! aggression guard.

use chrono::Utc;
use proptest::prelude::*;

use grudge_core::config::{MemoryConfig, PersistenceConfig};
use grudge_core::events::{CombatEvent, CombatKind, Event, SocialEvent, SocialKind};
use grudge_core::ledger::ESCALATION_TRUST_CEILING;
use grudge_core::persistence::{MemoryStorage, SqliteStorage, StoreCollection};
use grudge_core::store::MemoryStore;
use grudge_core::{AgentId, CounterpartKind};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

const NAMES: [&str; 4] = ["Steve", "Alex", "Zombie", "Villager"];

fn arb_event() -> impl Strategy<Value = Event> {
    let combat = (0..3usize, 0..NAMES.len(), proptest::option::of(0u32..40)).prop_map(
        |(kind, name, damage)| {
            let mut ev = CombatEvent::new(
                CombatKind::ALL[kind],
                NAMES[name],
                CounterpartKind::Player,
                Utc::now(),
            );
            ev.damage = damage.map(f64::from);
            Event::Combat(ev)
        },
    );
    let social = (0..5usize, 0..NAMES.len()).prop_map(|(kind, name)| {
        Event::Social(SocialEvent::new(SocialKind::ALL[kind], NAMES[name], Utc::now()))
    });
    prop_oneof![combat, social]
}

fn fresh() -> MemoryStore {
    MemoryStore::new(AgentId::from("Professor G"), &MemoryConfig::default(), Utc::now())
}

// ---------------------------------------------------------------------------
// Property: scores stay in range after every operation
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn scores_always_in_range(events in proptest::collection::vec(arb_event(), 0..200)) {
        let mut store = fresh();
        for ev in events {
            store.record(ev, Utc::now());
            for rel in store.relationships() {
                prop_assert!((-100..=100).contains(&rel.trust));
                prop_assert!((0..=100).contains(&rel.fear));
                prop_assert!((0..=100).contains(&rel.affection));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Property: logs are bounded and evict oldest first
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn combat_log_is_bounded_fifo(count in 0usize..150, capacity in 1usize..60) {
        let config = MemoryConfig { combat_log_capacity: capacity, ..MemoryConfig::default() };
        let mut store = MemoryStore::new(AgentId::from("A"), &config, Utc::now());
        for i in 0..count {
            store.record_combat(
                CombatEvent::new(CombatKind::Attacked, format!("mob{i}"), CounterpartKind::Mob, Utc::now()),
                Utc::now(),
            );
        }

        let log = store.combat_log();
        prop_assert_eq!(log.len(), count.min(capacity));
        let expected: Vec<String> = (count.saturating_sub(capacity)..count).map(|i| format!("mob{i}")).collect();
        let actual: Vec<String> = log.iter().map(|e| e.counterpart.clone()).collect();
        prop_assert_eq!(actual, expected);
        prop_assert_eq!(store.total_combat_events(), count as u64);
    }
}

// ---------------------------------------------------------------------------
// Property: the third attack escalates regardless of prior trust
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn third_attack_forces_threat(gifts in 0usize..20, helps in 0usize..20) {
        let mut store = fresh();
        for _ in 0..gifts {
            store.record_social(SocialEvent::new(SocialKind::GiftReceived, "Steve", Utc::now()), Utc::now());
        }
        for _ in 0..helps {
            store.record_social(SocialEvent::new(SocialKind::Helped, "Steve", Utc::now()), Utc::now());
        }

        for _ in 0..2 {
            store.record_combat(
                CombatEvent::new(CombatKind::AttackedBy, "Steve", CounterpartKind::Player, Utc::now()),
                Utc::now(),
            );
        }
        prop_assert_eq!(store.current_threat(), None);

        let rel = store.record_combat(
            CombatEvent::new(CombatKind::AttackedBy, "Steve", CounterpartKind::Player, Utc::now()),
            Utc::now(),
        );
        prop_assert!(rel.trust <= ESCALATION_TRUST_CEILING);
        prop_assert_eq!(rel.times_attacked_by, 3);
        prop_assert_eq!(store.current_threat(), Some("Steve"));
    }
}

// ---------------------------------------------------------------------------
// Property: every attack after the third re-applies the ceiling
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn later_attacks_restore_the_ceiling(gifts in 0usize..20, extra in 1usize..5) {
        let mut store = fresh();
        let attack = || CombatEvent::new(CombatKind::AttackedBy, "Steve", CounterpartKind::Player, Utc::now());
        for _ in 0..3 {
            store.record_combat(attack(), Utc::now());
        }
        for _ in 0..gifts {
            store.record_social(SocialEvent::new(SocialKind::GiftReceived, "Steve", Utc::now()), Utc::now());
        }

        for _ in 0..extra {
            let rel = store.record_combat(attack(), Utc::now());
            prop_assert!(rel.trust <= ESCALATION_TRUST_CEILING);
        }
        prop_assert_eq!(store.current_threat(), Some("Steve"));
    }
}

// ---------------------------------------------------------------------------
// Property: no aggression without two attacks
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn aggression_requires_two_attacks(
        events in proptest::collection::vec(arb_event(), 0..100),
    ) {
        let mut store = fresh();
        for ev in events {
            store.record(ev, Utc::now());
        }
        for rel in store.relationships() {
            if rel.times_attacked_by < 2 {
                prop_assert!(!store.should_be_aggressive(&rel.counterpart));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Property: persist → reload is identical
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn sqlite_round_trip_is_identical(events in proptest::collection::vec(arb_event(), 0..80)) {
        let mut store = fresh();
        for ev in events {
            store.record(ev, Utc::now());
        }
        let mut collection = StoreCollection::new();
        collection.insert(store.agent_id().clone(), store);

        let storage = SqliteStorage::open_in_memory(&PersistenceConfig::default()).expect("open");
        storage.save(&collection).expect("save");
        let report = storage.load().expect("load");
        prop_assert!(report.corrupt.is_empty());
        prop_assert_eq!(report.stores, collection);
    }
}
