//! Core identity and classification types shared across the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Identifier of an agent that owns a memory store.
///
/// Game agents are addressed by their display name (`"Professor G"`), so the
/// identifier is an opaque string rather than a generated id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub String);

impl AgentId {
    /// Create an agent id from anything string-like.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AgentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// What kind of character a counterpart is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterpartKind {
    /// A human-controlled player.
    Player,
    /// A hostile or passive creature.
    Mob,
    /// Another autonomous agent.
    Npc,
}

impl CounterpartKind {
    /// Wire name of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Mob => "mob",
            Self::Npc => "npc",
        }
    }

    /// Parse a wire name. Returns `None` for unknown kinds.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "player" => Some(Self::Player),
            "mob" => Some(Self::Mob),
            "npc" => Some(Self::Npc),
            _ => None,
        }
    }
}

impl fmt::Display for CounterpartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Bounded scores
// ---------------------------------------------------------------------------

/// Inclusive bounds for trust.
pub const TRUST_RANGE: (i32, i32) = (-100, 100);
/// Inclusive bounds for fear and affection.
pub const UNIT_RANGE: (i32, i32) = (0, 100);
