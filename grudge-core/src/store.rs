//! Per-agent memory store.
//!
//! A [`MemoryStore`] owns everything one agent remembers: three bounded
//! event logs, one [`Relationship`] per counterpart and a few scalars
//! describing the agent's current situation. It is mutated only through the
//! `record_*` methods, which keep logs, ledgers and counters in step.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MemoryConfig;
use crate::events::{CombatEvent, EnvironmentalEvent, Event, SocialEvent};
use crate::ledger::Relationship;
use crate::log::EventLog;
use crate::types::{AgentId, CounterpartKind};

/// Goal every new agent starts with.
pub const DEFAULT_GOAL: &str = "idle";

/// Everything one agent remembers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    agent_id: AgentId,
    combat: EventLog<CombatEvent>,
    social: EventLog<SocialEvent>,
    environmental: EventLog<EnvironmentalEvent>,
    relationships: BTreeMap<String, Relationship>,
    current_threat: Option<String>,
    current_ally: Option<String>,
    current_goal: String,
    total_interactions: u64,
    total_combat_events: u64,
    created_at: DateTime<Utc>,
}

impl MemoryStore {
    /// A fresh store with empty logs sized from `config`.
    #[must_use]
    pub fn new(agent_id: AgentId, config: &MemoryConfig, now: DateTime<Utc>) -> Self {
        Self {
            agent_id,
            combat: EventLog::with_capacity(config.combat_log_capacity),
            social: EventLog::with_capacity(config.social_log_capacity),
            environmental: EventLog::with_capacity(config.environmental_log_capacity),
            relationships: BTreeMap::new(),
            current_threat: None,
            current_ally: None,
            current_goal: DEFAULT_GOAL.to_string(),
            total_interactions: 0,
            total_combat_events: 0,
            created_at: now,
        }
    }

    // -----------------------------------------------------------------------
    // Recording
    // -----------------------------------------------------------------------

    /// Record an event of any family.
    ///
    /// Returns the counterpart's updated ledger when the event names one.
    pub fn record(&mut self, event: Event, now: DateTime<Utc>) -> Option<&Relationship> {
        match event {
            Event::Combat(e) => Some(self.record_combat(e, now)),
            Event::Social(e) => Some(self.record_social(e, now)),
            Event::Environmental(e) => {
                self.record_environmental(e);
                None
            }
        }
    }

    /// Record a combat event and update the counterpart's ledger.
    ///
    /// A third (or later) attack from the same counterpart makes it the
    /// agent's current threat.
    pub fn record_combat(&mut self, event: CombatEvent, now: DateTime<Utc>) -> &Relationship {
        self.total_combat_events += 1;

        let name = event.counterpart.clone();
        let rel = self
            .relationships
            .entry(name.clone())
            .or_insert_with(|| Relationship::new(&name, event.counterpart_kind, now));
        let escalated = rel.apply_combat(&event, now);

        if escalated {
            debug!(
                agent = %self.agent_id,
                counterpart = %name,
                attacks = rel.times_attacked_by,
                "Counterpart escalated to threat"
            );
            self.current_threat = Some(name.clone());
        }

        self.combat.push(event);
        &self.relationships[&name]
    }

    /// Record a social event and update the counterpart's ledger.
    ///
    /// Counterparts first met socially are assumed to be players.
    pub fn record_social(&mut self, event: SocialEvent, now: DateTime<Utc>) -> &Relationship {
        self.total_interactions += 1;

        let name = event.counterpart.clone();
        self.relationships
            .entry(name.clone())
            .or_insert_with(|| Relationship::new(&name, CounterpartKind::Player, now))
            .apply_social(&event, now);

        self.social.push(event);
        &self.relationships[&name]
    }

    /// Record an environmental observation. No ledger is touched.
    pub fn record_environmental(&mut self, event: EnvironmentalEvent) {
        self.environmental.push(event);
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The agent this store belongs to.
    #[must_use]
    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    /// Ledger for `counterpart`, if the agent has ever dealt with it.
    #[must_use]
    pub fn relationship(&self, counterpart: &str) -> Option<&Relationship> {
        self.relationships.get(counterpart)
    }

    /// All ledgers, ordered by counterpart name.
    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.values()
    }

    /// Number of counterparts the agent knows.
    #[must_use]
    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    /// Whether the agent should attack `counterpart`. False for strangers.
    #[must_use]
    pub fn should_be_aggressive(&self, counterpart: &str) -> bool {
        self.relationship(counterpart)
            .is_some_and(Relationship::should_be_aggressive)
    }

    /// Whether the agent should keep away from `counterpart`. False for
    /// strangers.
    #[must_use]
    pub fn should_avoid(&self, counterpart: &str) -> bool {
        self.relationship(counterpart)
            .is_some_and(Relationship::should_avoid)
    }

    /// One-line description of the relationship with `counterpart`.
    #[must_use]
    pub fn relationship_summary(&self, counterpart: &str) -> String {
        let Some(rel) = self.relationship(counterpart) else {
            return format!("No prior relationship with {counterpart}");
        };

        let mut line = format!(
            "{counterpart} ({}, {}): Trust={}, Fear={}, Affection={}",
            rel.status(),
            rel.sentiment(),
            rel.trust,
            rel.fear,
            rel.affection
        );
        if rel.times_attacked_by > 0 {
            line.push_str(&format!(
                " | Attacked me {}x (took {:.1} damage)",
                rel.times_attacked_by, rel.total_damage_received
            ));
        }
        if rel.gifts_received > 0 {
            line.push_str(&format!(" | Gave me {} gift(s)", rel.gifts_received));
        }
        line
    }

    /// Combat log, oldest first.
    #[must_use]
    pub fn combat_log(&self) -> &EventLog<CombatEvent> {
        &self.combat
    }

    /// Social log, oldest first.
    #[must_use]
    pub fn social_log(&self) -> &EventLog<SocialEvent> {
        &self.social
    }

    /// Environmental log, oldest first.
    #[must_use]
    pub fn environmental_log(&self) -> &EventLog<EnvironmentalEvent> {
        &self.environmental
    }

    /// Counterpart the agent currently regards as a threat.
    #[must_use]
    pub fn current_threat(&self) -> Option<&str> {
        self.current_threat.as_deref()
    }

    /// Counterpart the agent is currently helping.
    #[must_use]
    pub fn current_ally(&self) -> Option<&str> {
        self.current_ally.as_deref()
    }

    /// What the agent is doing.
    #[must_use]
    pub fn current_goal(&self) -> &str {
        &self.current_goal
    }

    /// Social events ever recorded (not capped by the log).
    #[must_use]
    pub fn total_interactions(&self) -> u64 {
        self.total_interactions
    }

    /// Combat events ever recorded (not capped by the log).
    #[must_use]
    pub fn total_combat_events(&self) -> u64 {
        self.total_combat_events
    }

    /// When the store was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
