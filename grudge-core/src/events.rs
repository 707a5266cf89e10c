//! Event types: the immutable records an agent remembers.
//!
//! Three families exist, one per log in the [`MemoryStore`](crate::store::MemoryStore):
//!
//! - **Combat**: someone hit me, I hit someone, I saw someone die
//! - **Social**: chat, gifts, help, being ignored
//! - **Environmental**: world changes with no counterpart
//!
//! Values are validated at the boundary (see [`crate::validation`]) and are
//! never mutated after they are recorded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::CounterpartKind;

// ---------------------------------------------------------------------------
// Combat
// ---------------------------------------------------------------------------

/// What happened in a combat event, from the recording agent's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatKind {
    /// The counterpart attacked the agent.
    AttackedBy,
    /// The agent attacked the counterpart.
    Attacked,
    /// The agent saw the counterpart kill something (or die).
    WitnessedDeath,
}

impl CombatKind {
    /// All combat kinds, in wire order.
    pub const ALL: [Self; 3] = [Self::AttackedBy, Self::Attacked, Self::WitnessedDeath];

    /// Wire name of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AttackedBy => "attacked_by",
            Self::Attacked => "attacked",
            Self::WitnessedDeath => "witnessed_death",
        }
    }

    /// Parse a wire name.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == raw)
    }
}

/// A recorded combat interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatEvent {
    /// What happened.
    pub kind: CombatKind,
    /// Who the agent fought with.
    pub counterpart: String,
    /// What the counterpart is.
    pub counterpart_kind: CounterpartKind,
    /// Damage involved, if known. Never negative.
    pub damage: Option<f64>,
    /// Weapon used, if known.
    pub weapon: Option<String>,
    /// Where it happened (`"x,y,z"`), if known.
    pub location: Option<String>,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
}

impl CombatEvent {
    /// Create a combat event with no optional details.
    #[must_use]
    pub fn new(
        kind: CombatKind,
        counterpart: impl Into<String>,
        counterpart_kind: CounterpartKind,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            counterpart: counterpart.into(),
            counterpart_kind,
            damage: None,
            weapon: None,
            location: None,
            timestamp,
        }
    }

    /// Attach a damage amount.
    #[must_use]
    pub fn with_damage(mut self, damage: f64) -> Self {
        self.damage = Some(damage);
        self
    }

    /// Attach a weapon name.
    #[must_use]
    pub fn with_weapon(mut self, weapon: impl Into<String>) -> Self {
        self.weapon = Some(weapon.into());
        self
    }

    /// Attach a location.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Social
// ---------------------------------------------------------------------------

/// What happened in a social event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocialKind {
    /// The counterpart talked to the agent.
    Chat,
    /// The counterpart gave the agent something.
    GiftReceived,
    /// The agent gave the counterpart something.
    GiftGiven,
    /// The counterpart helped the agent.
    Helped,
    /// The counterpart ignored the agent.
    Ignored,
}

impl SocialKind {
    /// All social kinds, in wire order.
    pub const ALL: [Self; 5] = [
        Self::Chat,
        Self::GiftReceived,
        Self::GiftGiven,
        Self::Helped,
        Self::Ignored,
    ];

    /// Wire name of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::GiftReceived => "gift_received",
            Self::GiftGiven => "gift_given",
            Self::Helped => "helped",
            Self::Ignored => "ignored",
        }
    }

    /// Parse a wire name.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == raw)
    }
}

/// A recorded social interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialEvent {
    /// What happened.
    pub kind: SocialKind,
    /// Who the agent interacted with.
    pub counterpart: String,
    /// What was said, if anything.
    pub message: Option<String>,
    /// What was exchanged, if anything.
    pub item: Option<String>,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
}

impl SocialEvent {
    /// Create a social event with no message or item.
    #[must_use]
    pub fn new(kind: SocialKind, counterpart: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            counterpart: counterpart.into(),
            message: None,
            item: None,
            timestamp,
        }
    }

    /// Attach a chat message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach an item name.
    #[must_use]
    pub fn with_item(mut self, item: impl Into<String>) -> Self {
        self.item = Some(item.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Environmental
// ---------------------------------------------------------------------------

/// What kind of world change was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentalKind {
    /// A block was removed.
    BlockBroken,
    /// A block was placed.
    BlockPlaced,
    /// Something exploded.
    Explosion,
    /// A mob appeared.
    MobSpawned,
}

impl EnvironmentalKind {
    /// All environmental kinds, in wire order.
    pub const ALL: [Self; 4] = [
        Self::BlockBroken,
        Self::BlockPlaced,
        Self::Explosion,
        Self::MobSpawned,
    ];

    /// Wire name of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BlockBroken => "block_broken",
            Self::BlockPlaced => "block_placed",
            Self::Explosion => "explosion",
            Self::MobSpawned => "mob_spawned",
        }
    }

    /// Parse a wire name.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == raw)
    }
}

/// A recorded observation of the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalEvent {
    /// What happened.
    pub kind: EnvironmentalKind,
    /// Free-text description.
    pub description: String,
    /// Where it happened, if known.
    pub location: Option<String>,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
}

impl EnvironmentalEvent {
    /// Create an environmental event.
    #[must_use]
    pub fn new(
        kind: EnvironmentalKind,
        description: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            description: description.into(),
            location: None,
            timestamp,
        }
    }

    /// Attach a location.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Tagged union
// ---------------------------------------------------------------------------

/// A validated event of any family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// A combat event.
    Combat(CombatEvent),
    /// A social event.
    Social(SocialEvent),
    /// An environmental event.
    Environmental(EnvironmentalEvent),
}

impl Event {
    /// The counterpart named by the event, if any.
    #[must_use]
    pub fn counterpart(&self) -> Option<&str> {
        match self {
            Self::Combat(e) => Some(&e.counterpart),
            Self::Social(e) => Some(&e.counterpart),
            Self::Environmental(_) => None,
        }
    }

    /// When the event happened.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Combat(e) => e.timestamp,
            Self::Social(e) => e.timestamp,
            Self::Environmental(e) => e.timestamp,
        }
    }

    /// The family name used on the wire.
    #[must_use]
    pub fn family(&self) -> &'static str {
        match self {
            Self::Combat(_) => "combat",
            Self::Social(_) => "social",
            Self::Environmental(_) => "environmental",
        }
    }
}

impl From<CombatEvent> for Event {
    fn from(e: CombatEvent) -> Self {
        Self::Combat(e)
    }
}

impl From<SocialEvent> for Event {
    fn from(e: SocialEvent) -> Self {
        Self::Social(e)
    }
}

impl From<EnvironmentalEvent> for Event {
    fn from(e: EnvironmentalEvent) -> Self {
        Self::Environmental(e)
    }
}
