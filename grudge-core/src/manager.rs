//! Store manager: every agent's memory, with write-through persistence.
//!
//! The manager is the only component that sees more than one agent. It
//! owns:
//!
//! - **Live stores**: resolved agents, one `Mutex` per agent so different
//!   agents update in parallel
//! - **Dormant stores**: loaded from storage at startup but not yet touched
//! - **The storage backend**: written through after every mutation
//!
//! Persistence failures never roll back memory. Mutating calls return a
//! [`Persisted`] carrying the applied result and, separately, any save
//! error, so callers can tell "applied but unsaved" from "rejected".

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::behavior::{Disposition, compute_disposition};
use crate::config::GrudgeConfig;
use crate::error::{GrudgeError, Persisted, Result};
use crate::events::Event;
use crate::metrics::{CounterSnapshot, GrudgeCounters, SaveTimings, spans};
use crate::persistence::{MemoryStorage, StoreCollection, open_storage};
use crate::store::MemoryStore;
use crate::summary::MemorySummary;
use crate::types::AgentId;
use crate::validation::{
    EventFamily, RawEvent, check_typed_event, validate_agent_id, validate_event,
};

/// What an accepted event did.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordOutcome {
    /// The agent that recorded the event.
    pub agent_id: AgentId,
    /// Family of the recorded event.
    pub family: &'static str,
    /// Whether the agent's store was created by this event.
    pub created: bool,
    /// The counterpart's updated disposition, when the event names one.
    pub disposition: Option<Disposition>,
}

/// Keyed collection of every agent's [`MemoryStore`].
///
/// `Send + Sync`; share it behind an `Arc`.
pub struct StoreManager {
    live: DashMap<AgentId, Arc<Mutex<MemoryStore>>>,
    dormant: Mutex<StoreCollection>,
    storage: Box<dyn MemoryStorage>,
    save_lock: Mutex<()>,
    config: GrudgeConfig,
    counters: GrudgeCounters,
    save_timings: SaveTimings,
}

impl std::fmt::Debug for StoreManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreManager")
            .field("live", &self.live.len())
            .field("storage", &self.storage)
            .finish_non_exhaustive()
    }
}

impl StoreManager {
    /// Open a manager over `storage`, loading the persisted collection.
    ///
    /// Corrupt entries are skipped (and counted); those agents start over
    /// as if they had never existed.
    ///
    /// # Errors
    /// Returns an error if the storage itself cannot be read.
    pub fn open(storage: Box<dyn MemoryStorage>, config: GrudgeConfig) -> Result<Self> {
        let _span = tracing::info_span!(spans::PERSIST_LOAD).entered();
        let start = Instant::now();
        let report = storage.load()?;

        let counters = GrudgeCounters::new();
        for agent in &report.corrupt {
            warn!(agent = %agent, "Discarding corrupt persisted memory");
            GrudgeCounters::bump(&counters.corrupt_entries_skipped);
        }

        info!(
            agents = report.stores.len(),
            corrupt = report.corrupt.len(),
            elapsed_us = start.elapsed().as_micros(),
            "GRUDGE store manager opened"
        );

        Ok(Self {
            live: DashMap::new(),
            dormant: Mutex::new(report.stores),
            storage,
            save_lock: Mutex::new(()),
            config,
            counters,
            save_timings: SaveTimings::new(),
        })
    }

    /// Open the storage backend named in `config.persistence`, then the
    /// manager over it.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be opened or read.
    pub fn from_config(config: GrudgeConfig) -> Result<Self> {
        let storage = open_storage(&config.persistence)?;
        Self::open(storage, config)
    }

    /// The configuration this manager runs with.
    #[must_use]
    pub fn config(&self) -> &GrudgeConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// The agent's store handle, waking or creating it as needed.
    ///
    /// The flag is `true` if the store was created from scratch.
    fn handle(&self, agent: &AgentId) -> (Arc<Mutex<MemoryStore>>, bool) {
        if let Some(entry) = self.live.get(agent) {
            return (Arc::clone(entry.value()), false);
        }

        let mut created = false;
        let handle = Arc::clone(
            self.live
                .entry(agent.clone())
                .or_insert_with(|| {
                    let store = self.dormant.lock().remove(agent).unwrap_or_else(|| {
                        created = true;
                        MemoryStore::new(agent.clone(), &self.config.memory, Utc::now())
                    });
                    Arc::new(Mutex::new(store))
                })
                .value(),
        );

        if created {
            GrudgeCounters::bump(&self.counters.stores_created);
            info!(agent = %agent, "Created memory store");
        }
        (handle, created)
    }

    /// Make sure the agent has a store, creating and saving a fresh one if
    /// needed. Returns whether it was created.
    pub fn resolve(&self, agent: &AgentId) -> Persisted<bool> {
        let (_, created) = self.handle(agent);
        if created {
            Persisted::new(true, self.persist())
        } else {
            Persisted::unchanged(false)
        }
    }

    /// Remove the agent's store and save the removal.
    ///
    /// Returns whether a store existed. A later [`resolve`](Self::resolve)
    /// creates a fresh one.
    pub fn delete(&self, agent: &AgentId) -> Persisted<bool> {
        let was_live = self.live.remove(agent).is_some();
        let was_dormant = self.dormant.lock().remove(agent).is_some();
        let existed = was_live || was_dormant;

        if !existed {
            return Persisted::unchanged(false);
        }
        GrudgeCounters::bump(&self.counters.stores_deleted);
        info!(agent = %agent, "Deleted memory store");
        Persisted::new(true, self.persist())
    }

    /// Write every store to storage.
    ///
    /// Idempotent. Saves are serialized; each writes a consistent snapshot
    /// taken under the save lock.
    ///
    /// # Errors
    /// Returns the storage error. In-memory state is unaffected.
    pub fn persist(&self) -> Result<()> {
        let _span = tracing::debug_span!(spans::PERSIST_SAVE).entered();
        let _guard = self.save_lock.lock();

        let mut collection = self.dormant.lock().clone();
        for entry in &self.live {
            collection.insert(entry.key().clone(), entry.value().lock().clone());
        }

        let start = Instant::now();
        match self.storage.save(&collection) {
            Ok(()) => {
                self.save_timings.record(start.elapsed());
                GrudgeCounters::bump(&self.counters.saves_completed);
                Ok(())
            }
            Err(e) => {
                GrudgeCounters::bump(&self.counters.saves_failed);
                warn!(error = %e, agents = collection.len(), "Failed to save memory stores");
                Err(e)
            }
        }
    }

    /// Save everything one last time before the manager is dropped.
    ///
    /// # Errors
    /// Returns the storage error of the final save.
    pub fn shutdown(&self) -> Result<()> {
        let result = self.persist();
        info!(agents = self.agent_count(), saved = result.is_ok(), "GRUDGE store manager shut down");
        result
    }

    // -----------------------------------------------------------------------
    // Recording
    // -----------------------------------------------------------------------

    /// Record a typed event for `agent`, then save.
    ///
    /// The event is held to the same limits as an ingested payload.
    ///
    /// # Errors
    /// Returns [`GrudgeError::Validation`] for a bad counterpart name or
    /// damage value. Nothing is mutated in that case.
    pub fn record(&self, agent: &AgentId, event: Event) -> Result<Persisted<RecordOutcome>> {
        if let Err(e) = check_typed_event(&event, &self.config.validation) {
            GrudgeCounters::bump(&self.counters.validation_rejections);
            debug!(agent = %agent, error = %e, "Rejected typed event");
            return Err(e);
        }
        Ok(self.apply(agent, event))
    }

    fn apply(&self, agent: &AgentId, event: Event) -> Persisted<RecordOutcome> {
        let _span = tracing::debug_span!(spans::RECORD, agent = %agent).entered();
        let family = event.family();
        let counter = match event {
            Event::Combat(_) => &self.counters.combat_events,
            Event::Social(_) => &self.counters.social_events,
            Event::Environmental(_) => &self.counters.environmental_events,
        };

        let (handle, created) = self.handle(agent);
        let disposition = {
            let mut store = handle.lock();
            let counterpart = event.counterpart().map(str::to_string);
            store.record(event, Utc::now());
            counterpart.and_then(|c| compute_disposition(&store, &c))
        };
        GrudgeCounters::bump(counter);

        if let Some(d) = &disposition {
            debug!(
                agent = %agent,
                counterpart = %d.counterpart,
                trust = d.trust,
                fear = d.fear,
                affection = d.affection,
                "Recorded {family} event"
            );
        } else {
            debug!(agent = %agent, "Recorded {family} event");
        }

        Persisted::new(
            RecordOutcome {
                agent_id: agent.clone(),
                family,
                created,
                disposition,
            },
            self.persist(),
        )
    }

    /// Validate a raw payload and record it.
    ///
    /// # Errors
    /// Returns [`GrudgeError::Validation`] naming the first bad field. Nothing
    /// is mutated in that case.
    pub fn ingest(
        &self,
        agent_id: &str,
        family: EventFamily,
        payload: &RawEvent,
    ) -> Result<Persisted<RecordOutcome>> {
        let checked = validate_agent_id(agent_id, &self.config.validation).and_then(|agent| {
            validate_event(family, payload, &self.config.validation, Utc::now())
                .map(|event| (agent, event))
        });

        match checked {
            Ok((agent, event)) => Ok(self.apply(&agent, event)),
            Err(e) => {
                GrudgeCounters::bump(&self.counters.validation_rejections);
                debug!(agent = agent_id, error = %e, "Rejected event payload");
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The agent's disposition toward `counterpart` (matched after trimming,
    /// as ingested names are), or `None` if they have never interacted. The
    /// agent's store is created if it does not exist.
    pub fn relationship(&self, agent: &AgentId, counterpart: &str) -> Persisted<Option<Disposition>> {
        let (handle, created) = self.handle(agent);
        let disposition = compute_disposition(&handle.lock(), counterpart.trim());
        self.after_query(created, disposition)
    }

    /// Headline numbers and context text for `agent`. The agent's store is
    /// created if it does not exist.
    pub fn summary(&self, agent: &AgentId) -> Persisted<MemorySummary> {
        let (handle, created) = self.handle(agent);
        let summary = MemorySummary::of(&handle.lock(), self.config.memory.recent_combat_window);
        self.after_query(created, summary)
    }

    /// The agent's disposition toward `counterpart`, without creating
    /// anything.
    ///
    /// # Errors
    /// Returns [`GrudgeError::UnknownAgent`] or
    /// [`GrudgeError::UnknownCounterpart`].
    pub fn lookup(&self, agent: &AgentId, counterpart: &str) -> Result<Disposition> {
        let store = self
            .snapshot(agent)
            .ok_or_else(|| GrudgeError::UnknownAgent(agent.clone()))?;
        let counterpart = counterpart.trim();
        compute_disposition(&store, counterpart).ok_or_else(|| GrudgeError::UnknownCounterpart {
            agent: agent.clone(),
            counterpart: counterpart.to_string(),
        })
    }

    /// A copy of the agent's store, if it exists (live or dormant).
    #[must_use]
    pub fn snapshot(&self, agent: &AgentId) -> Option<MemoryStore> {
        if let Some(entry) = self.live.get(agent) {
            return Some(entry.value().lock().clone());
        }
        self.dormant.lock().get(agent).cloned()
    }

    /// Every known agent, sorted.
    #[must_use]
    pub fn agent_ids(&self) -> Vec<AgentId> {
        let mut ids: Vec<AgentId> = self.dormant.lock().keys().cloned().collect();
        ids.extend(self.live.iter().map(|e| e.key().clone()));
        ids.sort();
        ids.dedup();
        ids
    }

    /// Number of known agents.
    #[must_use]
    pub fn agent_count(&self) -> usize {
        self.agent_ids().len()
    }

    /// Runtime counters.
    #[must_use]
    pub fn metrics(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    /// Timings of recent saves.
    #[must_use]
    pub fn save_timings(&self) -> &SaveTimings {
        &self.save_timings
    }

    fn after_query<T>(&self, created: bool, value: T) -> Persisted<T> {
        if created {
            Persisted::new(value, self.persist())
        } else {
            Persisted::unchanged(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PersistenceConfig;
    use crate::error::ErrorKind;
    use crate::events::{CombatEvent, CombatKind, EnvironmentalEvent, EnvironmentalKind};
    use crate::persistence::SqliteStorage;
    use crate::types::CounterpartKind;

    fn manager() -> StoreManager {
        let storage = SqliteStorage::open_in_memory(&PersistenceConfig::default()).expect("open");
        StoreManager::open(Box::new(storage), GrudgeConfig::default()).expect("manager")
    }

    fn attack(name: &str, damage: f64) -> Event {
        CombatEvent::new(CombatKind::AttackedBy, name, CounterpartKind::Player, Utc::now())
            .with_damage(damage)
            .into()
    }

    #[test]
    fn first_record_creates_store() {
        let m = manager();
        let agent = AgentId::from("Professor G");
        let first = m.record(&agent, attack("Steve", 3.0)).expect("valid");
        assert!(first.is_saved());
        assert!(first.value.created);
        assert!(!m.record(&agent, attack("Steve", 4.0)).expect("valid").value.created);
        assert_eq!(m.agent_count(), 1);
        assert_eq!(m.metrics().stores_created, 1);
        assert_eq!(m.metrics().events, [2, 0, 0]);
    }

    #[test]
    fn environmental_record_has_no_disposition() {
        let m = manager();
        let ev = EnvironmentalEvent::new(EnvironmentalKind::BlockBroken, "door broke", Utc::now());
        let out = m.record(&AgentId::from("A"), ev.into()).expect("valid");
        assert!(out.value.disposition.is_none());
        assert_eq!(out.value.family, "environmental");
    }

    #[test]
    fn resolve_creates_once() {
        let m = manager();
        let agent = AgentId::from("A");
        assert!(m.resolve(&agent).value);
        assert!(!m.resolve(&agent).value);
        assert_eq!(m.snapshot(&agent).map(|s| s.total_interactions()), Some(0));
    }

    #[test]
    fn delete_reports_existence() {
        let m = manager();
        let agent = AgentId::from("A");
        assert!(!m.delete(&agent).value);
        let _saved = m.record(&agent, attack("Steve", 1.0)).expect("valid");
        assert!(m.delete(&agent).value);
        assert!(m.snapshot(&agent).is_none());
        assert!(m.resolve(&agent).value);
    }

    #[test]
    fn invalid_payload_changes_nothing() {
        let m = manager();
        let raw = RawEvent {
            event_type: Some("attacked_by".into()),
            entity_name: Some("Steve".into()),
            entity_type: Some("player".into()),
            damage: Some(-3.0),
            ..RawEvent::default()
        };
        let err = m.ingest("A", EventFamily::Combat, &raw).expect_err("negative damage");
        assert_eq!(err.kind(), ErrorKind::Rejected);
        assert_eq!(m.agent_count(), 0);
        assert_eq!(m.metrics().validation_rejections, 1);
    }

    #[test]
    fn typed_event_with_bad_damage_is_rejected() {
        let m = manager();
        let agent = AgentId::from("A");
        for damage in [f64::NAN, f64::INFINITY, -1.0] {
            let err = m.record(&agent, attack("Steve", damage)).expect_err("bad damage");
            assert!(matches!(err, GrudgeError::Validation { field: "damage", .. }));
        }
        let padded = m.record(&agent, attack(" Steve ", 1.0)).expect_err("untrimmed name");
        assert_eq!(padded.kind(), ErrorKind::Rejected);

        assert_eq!(m.agent_count(), 0);
        assert_eq!(m.metrics().validation_rejections, 4);

        // A valid record afterwards still saves and reloads cleanly.
        let _saved = m.record(&agent, attack("Steve", 2.5)).expect("valid");
        let report = m.storage.load().expect("load");
        assert!(report.corrupt.is_empty());
        assert_eq!(report.stores.len(), 1);
    }

    #[test]
    fn lookup_distinguishes_unknown_agent_and_counterpart() {
        let m = manager();
        let agent = AgentId::from("A");
        assert!(matches!(m.lookup(&agent, "Steve"), Err(GrudgeError::UnknownAgent(_))));
        let _saved = m.record(&agent, attack("Steve", 1.0)).expect("valid");
        assert!(m.lookup(&agent, "Steve").is_ok());
        assert!(m.lookup(&agent, "  Steve\t").is_ok());
        assert!(m.relationship(&agent, " Steve ").value.is_some());
        assert!(matches!(
            m.lookup(&agent, "Alex"),
            Err(GrudgeError::UnknownCounterpart { .. })
        ));
    }

    #[test]
    fn manager_is_shareable_across_threads() {
        let m = Arc::new(manager());
        let threads: Vec<_> = (0..4)
            .map(|i| {
                let m = Arc::clone(&m);
                std::thread::spawn(move || {
                    let agent = AgentId::new(format!("npc{i}"));
                    for _ in 0..5 {
                        let out = m.record(&agent, attack("Steve", 1.0)).expect("valid");
                        assert!(out.is_saved());
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().expect("thread");
        }
        assert_eq!(m.agent_count(), 4);
        assert_eq!(m.metrics().events[0], 20);
        for i in 0..4 {
            let store = m.snapshot(&AgentId::new(format!("npc{i}"))).expect("store");
            assert_eq!(store.total_combat_events(), 5);
        }
    }
}
