//! Context summaries: a compact digest of an agent's situation.
//!
//! The digest is handed to whatever decides what the agent says or does
//! next. It is a pure function of the store: the same state always renders
//! the same text.
//!
//! ```text
//! === CURRENT CONTEXT ===
//! THREAT: Steve is hostile! (Attacked 3x, Trust=-45)
//! Recent attacks: 3 in last 5 events
//! Enemies: Steve
//! Combat history: 3 events
//! ```

use serde::{Deserialize, Serialize};

use crate::events::CombatKind;
use crate::store::MemoryStore;
use crate::types::AgentId;

/// Heading of every rendered summary.
pub const HEADER: &str = "=== CURRENT CONTEXT ===";

/// Counterparts with trust below this are listed as enemies.
const ENEMY_TRUST: i32 = -30;
/// Counterparts with trust above this are listed as friends.
const FRIEND_TRUST: i32 = 40;

/// The agent's current threat, if its ledger still exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatLine {
    /// Who the threat is.
    pub counterpart: String,
    /// Times it attacked the agent.
    pub attacks: u32,
    /// Current trust toward it.
    pub trust: i32,
}

/// Structured context digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSummary {
    /// Active threat.
    pub threat: Option<ThreatLine>,
    /// `attacked_by` events among the last `window` combat events.
    pub recent_attacks: usize,
    /// Size of the recent-combat window.
    pub window: usize,
    /// Counterparts regarded as enemies, by name.
    pub enemies: Vec<String>,
    /// Counterparts regarded as friends, by name.
    pub friends: Vec<String>,
    /// Retained combat events.
    pub combat_history: usize,
    /// Retained social events.
    pub social_history: usize,
}

impl ContextSummary {
    /// Summarize `store`, scanning the last `window` combat events for
    /// recent attacks.
    #[must_use]
    pub fn of(store: &MemoryStore, window: usize) -> Self {
        let threat = store.current_threat().and_then(|name| {
            store.relationship(name).map(|rel| ThreatLine {
                counterpart: name.to_string(),
                attacks: rel.times_attacked_by,
                trust: rel.trust,
            })
        });

        let recent_attacks = store
            .combat_log()
            .latest(window)
            .filter(|e| e.kind == CombatKind::AttackedBy)
            .count();

        let enemies = store
            .relationships()
            .filter(|r| r.trust < ENEMY_TRUST)
            .map(|r| r.counterpart.clone())
            .collect();
        let friends = store
            .relationships()
            .filter(|r| r.trust > FRIEND_TRUST)
            .map(|r| r.counterpart.clone())
            .collect();

        Self {
            threat,
            recent_attacks,
            window,
            enemies,
            friends,
            combat_history: store.combat_log().len(),
            social_history: store.social_log().len(),
        }
    }

    /// Render as newline-separated text. Empty sections are omitted; the
    /// header is always present.
    #[must_use]
    pub fn render(&self) -> String {
        let mut lines = vec![HEADER.to_string()];

        if let Some(t) = &self.threat {
            lines.push(format!(
                "THREAT: {} is hostile! (Attacked {}x, Trust={})",
                t.counterpart, t.attacks, t.trust
            ));
        }
        if self.recent_attacks > 0 {
            lines.push(format!(
                "Recent attacks: {} in last {} events",
                self.recent_attacks, self.window
            ));
        }
        if !self.enemies.is_empty() {
            lines.push(format!("Enemies: {}", self.enemies.join(", ")));
        }
        if !self.friends.is_empty() {
            lines.push(format!("Friends: {}", self.friends.join(", ")));
        }
        if self.combat_history > 0 {
            lines.push(format!("Combat history: {} events", self.combat_history));
        }
        if self.social_history > 0 {
            lines.push(format!("Social history: {} events", self.social_history));
        }

        lines.join("\n")
    }
}

/// Headline numbers of one agent's memory plus its rendered context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySummary {
    /// Whose memory this is.
    pub agent_id: AgentId,
    /// Social events ever recorded.
    pub total_interactions: u64,
    /// Combat events ever recorded.
    pub total_combat_events: u64,
    /// Counterparts the agent knows.
    pub relationship_count: usize,
    /// Current threat, if any.
    pub current_threat: Option<String>,
    /// Current ally, if any.
    pub current_ally: Option<String>,
    /// Current goal.
    pub current_goal: String,
    /// Structured context.
    pub context: ContextSummary,
    /// Rendered context.
    pub context_summary_text: String,
}

impl MemorySummary {
    /// Summarize `store`.
    #[must_use]
    pub fn of(store: &MemoryStore, window: usize) -> Self {
        let context = ContextSummary::of(store, window);
        Self {
            agent_id: store.agent_id().clone(),
            total_interactions: store.total_interactions(),
            total_combat_events: store.total_combat_events(),
            relationship_count: store.relationship_count(),
            current_threat: store.current_threat().map(str::to_string),
            current_ally: store.current_ally().map(str::to_string),
            current_goal: store.current_goal().to_string(),
            context_summary_text: context.render(),
            context,
        }
    }
}

impl std::fmt::Display for ContextSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfig;
    use crate::events::{CombatEvent, SocialEvent, SocialKind};
    use crate::types::CounterpartKind;
    use chrono::Utc;

    fn store() -> MemoryStore {
        MemoryStore::new(AgentId::from("Professor G"), &MemoryConfig::default(), Utc::now())
    }

    fn combat(kind: CombatKind, name: &str) -> CombatEvent {
        CombatEvent::new(kind, name, CounterpartKind::Player, Utc::now()).with_damage(4.0)
    }

    #[test]
    fn empty_store_renders_header_only() {
        assert_eq!(ContextSummary::of(&store(), 5).render(), HEADER);
    }

    #[test]
    fn threat_scenario_renders_all_combat_lines() {
        let mut s = store();
        for _ in 0..3 {
            s.record_combat(combat(CombatKind::AttackedBy, "Steve"), Utc::now());
        }
        let text = ContextSummary::of(&s, 5).render();
        assert_eq!(
            text,
            "=== CURRENT CONTEXT ===\n\
             THREAT: Steve is hostile! (Attacked 3x, Trust=-45)\n\
             Recent attacks: 3 in last 5 events\n\
             Enemies: Steve\n\
             Combat history: 3 events"
        );
    }

    #[test]
    fn recent_window_only_scans_latest_events() {
        let mut s = store();
        s.record_combat(combat(CombatKind::AttackedBy, "Steve"), Utc::now());
        for _ in 0..5 {
            s.record_combat(combat(CombatKind::Attacked, "Zombie"), Utc::now());
        }
        let summary = ContextSummary::of(&s, 5);
        assert_eq!(summary.recent_attacks, 0);
        assert_eq!(summary.combat_history, 6);
        assert!(!summary.render().contains("Recent attacks"));
    }

    #[test]
    fn friends_listed_and_social_history_counted() {
        let mut s = store();
        for _ in 0..5 {
            s.record_social(SocialEvent::new(SocialKind::GiftReceived, "Alex", Utc::now()), Utc::now());
        }
        s.record_social(SocialEvent::new(SocialKind::Chat, "Bob", Utc::now()), Utc::now());
        let summary = ContextSummary::of(&s, 5);
        assert_eq!(summary.friends, vec!["Alex".to_string()]);
        assert!(summary.enemies.is_empty());
        assert!(summary.render().ends_with("Friends: Alex\nSocial history: 6 events"));
    }

    #[test]
    fn memory_summary_carries_counters_and_text() {
        let mut s = store();
        for _ in 0..3 {
            s.record_combat(combat(CombatKind::AttackedBy, "Steve"), Utc::now());
        }
        s.record_social(SocialEvent::new(SocialKind::Chat, "Alex", Utc::now()), Utc::now());

        let m = MemorySummary::of(&s, 5);
        assert_eq!(m.total_combat_events, 3);
        assert_eq!(m.total_interactions, 1);
        assert_eq!(m.relationship_count, 2);
        assert_eq!(m.current_threat.as_deref(), Some("Steve"));
        assert_eq!(m.current_goal, "idle");
        assert_eq!(m.context_summary_text, m.context.render());
    }

    #[test]
    fn rendering_is_deterministic() {
        let mut s = store();
        for name in ["Zed", "Amy", "Moe"] {
            for _ in 0..3 {
                s.record_combat(combat(CombatKind::AttackedBy, name), Utc::now());
            }
        }
        let a = ContextSummary::of(&s, 5).render();
        let b = ContextSummary::of(&s.clone(), 5).render();
        assert_eq!(a, b);
        assert!(a.contains("Enemies: Amy, Moe, Zed"));
    }
}
