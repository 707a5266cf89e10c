//! Relationship ledger: how one agent feels about one counterpart.
//!
//! A [`Relationship`] accumulates two kinds of state:
//!
//! - **Scores**: trust (−100..=100), fear and affection (0..=100), clamped
//!   after every update
//! - **Counters**: attacks, damage, gifts and help, never decremented
//!
//! Status and sentiment are derived from the scores on read and never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::{CombatEvent, CombatKind, SocialEvent, SocialKind};
use crate::types::{CounterpartKind, TRUST_RANGE, UNIT_RANGE};

// ---------------------------------------------------------------------------
// Update constants
// ---------------------------------------------------------------------------

const ATTACKED_TRUST: i32 = -15;
const ATTACKED_FEAR: i32 = 10;
const ATTACKED_AFFECTION: i32 = -5;
const WITNESSED_DEATH_FEAR: i32 = 5;
const GIFT_TRUST: i32 = 10;
const GIFT_AFFECTION: i32 = 15;
const GIFT_FEAR_RELIEF: i32 = 5;
const HELPED_TRUST: i32 = 5;
const HELPED_AFFECTION: i32 = 5;

/// Attacks from the same counterpart after which it is marked a threat.
pub const ESCALATION_ATTACKS: u32 = 3;
/// Trust is forced to at most this value when escalation triggers.
pub const ESCALATION_TRUST_CEILING: i32 = -40;

/// The ledger between one agent and one counterpart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Counterpart name.
    pub counterpart: String,
    /// What the counterpart is.
    pub counterpart_kind: CounterpartKind,
    /// −100 (betrayed) to 100 (complete trust).
    pub trust: i32,
    /// 0 (unafraid) to 100 (terrified).
    pub fear: i32,
    /// 0 (none) to 100 (devoted).
    pub affection: i32,
    /// Times the counterpart attacked the agent.
    pub times_attacked_by: u32,
    /// Times the agent attacked the counterpart.
    pub times_attacked: u32,
    /// Sum of damage the counterpart dealt to the agent.
    pub total_damage_received: f64,
    /// Sum of damage the agent dealt to the counterpart.
    pub total_damage_dealt: f64,
    /// Gifts the agent received from the counterpart.
    pub gifts_received: u32,
    /// Gifts the agent gave to the counterpart.
    pub gifts_given: u32,
    /// Times the counterpart helped the agent.
    pub times_helped: u32,
    /// When the agent last dealt with the counterpart.
    pub last_interaction: DateTime<Utc>,
}

impl Relationship {
    /// A zero-valued ledger for a counterpart seen for the first time.
    #[must_use]
    pub fn new(
        counterpart: impl Into<String>,
        counterpart_kind: CounterpartKind,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            counterpart: counterpart.into(),
            counterpart_kind,
            trust: 0,
            fear: 0,
            affection: 0,
            times_attacked_by: 0,
            times_attacked: 0,
            total_damage_received: 0.0,
            total_damage_dealt: 0.0,
            gifts_received: 0,
            gifts_given: 0,
            times_helped: 0,
            last_interaction: now,
        }
    }

    /// Fold a combat event into the ledger.
    ///
    /// Returns `true` when this event escalated the counterpart to a threat,
    /// i.e. it was an `attacked_by` that brought the attack count to
    /// [`ESCALATION_ATTACKS`] or beyond. The trust ceiling is applied on each
    /// such attack; it is never re-applied by any other update.
    pub fn apply_combat(&mut self, event: &CombatEvent, now: DateTime<Utc>) -> bool {
        // Totals must stay finite and non-negative to survive a JSON round trip.
        let damage = event.damage.filter(|d| d.is_finite() && *d >= 0.0).unwrap_or(0.0);
        let mut escalated = false;

        match event.kind {
            CombatKind::AttackedBy => {
                self.times_attacked_by += 1;
                self.total_damage_received += damage;
                self.trust += ATTACKED_TRUST;
                self.fear += ATTACKED_FEAR;
                self.affection += ATTACKED_AFFECTION;

                if self.times_attacked_by >= ESCALATION_ATTACKS {
                    self.trust = self.trust.min(ESCALATION_TRUST_CEILING);
                    escalated = true;
                }
            }
            CombatKind::Attacked => {
                self.times_attacked += 1;
                self.total_damage_dealt += damage;
            }
            CombatKind::WitnessedDeath => {
                self.fear += WITNESSED_DEATH_FEAR;
            }
        }

        self.settle(now);
        escalated
    }

    /// Fold a social event into the ledger.
    pub fn apply_social(&mut self, event: &SocialEvent, now: DateTime<Utc>) {
        match event.kind {
            SocialKind::GiftReceived => {
                self.gifts_received += 1;
                self.trust += GIFT_TRUST;
                self.affection += GIFT_AFFECTION;
                self.fear = (self.fear - GIFT_FEAR_RELIEF).max(0);
            }
            SocialKind::GiftGiven => {
                self.gifts_given += 1;
            }
            SocialKind::Helped => {
                self.times_helped += 1;
                self.trust += HELPED_TRUST;
                self.affection += HELPED_AFFECTION;
            }
            SocialKind::Chat | SocialKind::Ignored => {}
        }

        self.settle(now);
    }

    /// Clamp every score into range and stamp the interaction time.
    fn settle(&mut self, now: DateTime<Utc>) {
        self.trust = self.trust.clamp(TRUST_RANGE.0, TRUST_RANGE.1);
        self.fear = self.fear.clamp(UNIT_RANGE.0, UNIT_RANGE.1);
        self.affection = self.affection.clamp(UNIT_RANGE.0, UNIT_RANGE.1);
        self.last_interaction = now;
    }

    /// Relationship status derived from trust.
    #[must_use]
    pub fn status(&self) -> RelationshipStatus {
        RelationshipStatus::from_trust(self.trust)
    }

    /// Dominant feeling derived from fear, then affection, then trust.
    #[must_use]
    pub fn sentiment(&self) -> Sentiment {
        if self.fear > 60 {
            Sentiment::Terrified
        } else if self.fear > 30 {
            Sentiment::Afraid
        } else if self.affection > 60 {
            Sentiment::Loves
        } else if self.affection > 30 {
            Sentiment::Likes
        } else if self.trust < -50 {
            Sentiment::Hates
        } else {
            Sentiment::Indifferent
        }
    }

    /// Whether the agent should fight this counterpart.
    ///
    /// Requires a repeated aggressor: low trust alone is never enough.
    #[must_use]
    pub fn should_be_aggressive(&self) -> bool {
        self.trust < -30 && self.fear < 70 && self.times_attacked_by >= 2
    }

    /// Whether the agent should keep away from this counterpart.
    #[must_use]
    pub fn should_avoid(&self) -> bool {
        self.fear > 50 || (self.trust < -20 && self.total_damage_received > 15.0)
    }
}

// ---------------------------------------------------------------------------
// Derived labels
// ---------------------------------------------------------------------------

/// Relationship status bands over trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipStatus {
    /// trust < −50
    Enemy,
    /// −50 ≤ trust < −20
    Hostile,
    /// −20 ≤ trust < 20
    Neutral,
    /// 20 ≤ trust < 50
    Friendly,
    /// trust ≥ 50
    TrustedFriend,
}

impl RelationshipStatus {
    /// Band a trust value. Bounds are checked lowest first.
    #[must_use]
    pub fn from_trust(trust: i32) -> Self {
        if trust < -50 {
            Self::Enemy
        } else if trust < -20 {
            Self::Hostile
        } else if trust < 20 {
            Self::Neutral
        } else if trust < 50 {
            Self::Friendly
        } else {
            Self::TrustedFriend
        }
    }

    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enemy => "enemy",
            Self::Hostile => "hostile",
            Self::Neutral => "neutral",
            Self::Friendly => "friendly",
            Self::TrustedFriend => "trusted_friend",
        }
    }
}

impl std::fmt::Display for RelationshipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single dominant feeling toward a counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    /// fear > 60
    Terrified,
    /// fear > 30
    Afraid,
    /// affection > 60
    Loves,
    /// affection > 30
    Likes,
    /// trust < −50
    Hates,
    /// Nothing stands out.
    Indifferent,
}

impl Sentiment {
    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Terrified => "terrified",
            Self::Afraid => "afraid",
            Self::Loves => "loves",
            Self::Likes => "likes",
            Self::Hates => "hates",
            Self::Indifferent => "indifferent",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
