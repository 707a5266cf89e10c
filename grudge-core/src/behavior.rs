//! Agent behavior toward a counterpart: the read side of a ledger.
//!
//! [`compute_disposition`] folds a [`Relationship`](crate::ledger::Relationship)
//! into everything a decision maker needs about one counterpart: labels,
//! raw scores, the fight/flee recommendations and the accumulated stats.
//!
//! Strangers have no disposition. Callers get `None` and must not invent a
//! zero-valued one.

use serde::{Deserialize, Serialize};

use crate::ledger::{RelationshipStatus, Sentiment};
use crate::store::MemoryStore;
use crate::types::CounterpartKind;

/// How an agent stands toward one counterpart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disposition {
    /// Counterpart name.
    pub counterpart: String,
    /// What the counterpart is.
    pub counterpart_kind: CounterpartKind,
    /// Status band over trust.
    pub status: RelationshipStatus,
    /// Dominant feeling.
    pub sentiment: Sentiment,
    /// −100..=100.
    pub trust: i32,
    /// 0..=100.
    pub fear: i32,
    /// 0..=100.
    pub affection: i32,
    /// The agent should fight this counterpart.
    pub should_attack: bool,
    /// The agent should keep away from this counterpart.
    pub should_avoid: bool,
    /// Combat counters.
    pub combat: CombatStats,
    /// Social counters.
    pub social: SocialStats,
    /// One-line human-readable description.
    pub summary: String,
}

/// Accumulated combat history with a counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombatStats {
    /// Times the counterpart attacked the agent.
    pub times_attacked_by: u32,
    /// Times the agent attacked the counterpart.
    pub times_attacked: u32,
    /// Damage taken from the counterpart.
    pub total_damage_received: f64,
    /// Damage dealt to the counterpart.
    pub total_damage_dealt: f64,
}

/// Accumulated social history with a counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialStats {
    /// Gifts received from the counterpart.
    pub gifts_received: u32,
    /// Gifts given to the counterpart.
    pub gifts_given: u32,
    /// Times the counterpart helped the agent.
    pub times_helped: u32,
}

/// Compute the agent's disposition toward `counterpart`.
///
/// Returns `None` if the agent has never dealt with the counterpart.
#[must_use]
pub fn compute_disposition(store: &MemoryStore, counterpart: &str) -> Option<Disposition> {
    let rel = store.relationship(counterpart)?;

    Some(Disposition {
        counterpart: rel.counterpart.clone(),
        counterpart_kind: rel.counterpart_kind,
        status: rel.status(),
        sentiment: rel.sentiment(),
        trust: rel.trust,
        fear: rel.fear,
        affection: rel.affection,
        should_attack: rel.should_be_aggressive(),
        should_avoid: rel.should_avoid(),
        combat: CombatStats {
            times_attacked_by: rel.times_attacked_by,
            times_attacked: rel.times_attacked,
            total_damage_received: rel.total_damage_received,
            total_damage_dealt: rel.total_damage_dealt,
        },
        social: SocialStats {
            gifts_received: rel.gifts_received,
            gifts_given: rel.gifts_given,
            times_helped: rel.times_helped,
        },
        summary: store.relationship_summary(counterpart),
    })
}
