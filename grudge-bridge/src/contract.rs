//! Request and reply shapes, independent of the transport carrying them.
//!
//! Requests are JSON objects tagged by `op`:
//!
//! ```json
//! { "op": "ingest", "agent_id": "Professor G", "kind": "combat",
//!   "payload": { "event_type": "attacked_by", "entity_name": "Steve",
//!                "entity_type": "player", "damage": 3.0 } }
//! { "op": "relationship", "agent_id": "Professor G", "counterpart": "Steve" }
//! { "op": "summary", "agent_id": "Professor G" }
//! { "op": "delete", "agent_id": "Professor G" }
//! { "op": "health" }
//! { "op": "metrics" }
//! ```
//!
//! Replies to mutating requests carry `saved` (and `save_error` when the
//! change is applied but could not be written). Failures are
//! `{ "error": { "kind", "message", "field"? } }`.

use grudge_core::behavior::{CombatStats, Disposition, SocialStats};
use grudge_core::ledger::{RelationshipStatus, Sentiment};
use grudge_core::summary::MemorySummary;
use grudge_core::validation::RawEvent;
use grudge_core::{ErrorKind, GrudgeError, Persisted};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Any request the bridge understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Record an event.
    Ingest(IngestRequest),
    /// Read one relationship.
    Relationship {
        /// Agent whose memory is read.
        agent_id: String,
        /// Counterpart to look up.
        counterpart: String,
    },
    /// Read an agent's memory summary.
    Summary {
        /// Agent whose memory is read.
        agent_id: String,
    },
    /// Forget an agent entirely.
    Delete {
        /// Agent to delete.
        agent_id: String,
    },
    /// Liveness and agent count.
    Health,
    /// Prometheus text export of the engine counters.
    Metrics,
}

/// Event ingestion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestRequest {
    /// Agent recording the event.
    pub agent_id: String,
    /// Event family: `combat`, `social` or `environmental`.
    pub kind: String,
    /// Event fields.
    #[serde(default)]
    pub payload: RawEvent,
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

/// A reply body plus the outcome of the save that followed it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Saved<T> {
    /// The reply body.
    #[serde(flatten)]
    pub body: T,
    /// Whether the change reached storage.
    pub saved: bool,
    /// Why it did not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_error: Option<String>,
}

impl<T> Saved<T> {
    /// Convert an engine outcome, mapping its value with `f`.
    pub fn from_persisted<U>(outcome: Persisted<U>, f: impl FnOnce(U) -> T) -> Self {
        let save_error = outcome.save_error.as_ref().map(ToString::to_string);
        Self {
            saved: save_error.is_none(),
            save_error,
            body: f(outcome.value),
        }
    }
}

/// Fight/flee recommendations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendations {
    /// The agent should fight.
    pub should_attack: bool,
    /// The agent should keep away.
    pub should_avoid: bool,
}

/// What the agent thinks of one counterpart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Counterpart name.
    pub counterpart: String,
    /// Status band.
    pub status: RelationshipStatus,
    /// Dominant feeling.
    pub sentiment: Sentiment,
    /// −100..=100.
    pub trust: i32,
    /// 0..=100.
    pub fear: i32,
    /// 0..=100.
    pub affection: i32,
    /// The agent should fight.
    pub should_attack: bool,
    /// The agent should keep away.
    pub should_avoid: bool,
    /// Combat counters.
    pub combat_stats: CombatStats,
    /// Social counters.
    pub social_stats: SocialStats,
    /// Same recommendations, grouped.
    pub recommendations: Recommendations,
    /// One-line description.
    pub summary: String,
}

impl From<Disposition> for LedgerSnapshot {
    fn from(d: Disposition) -> Self {
        Self {
            recommendations: Recommendations {
                should_attack: d.should_attack,
                should_avoid: d.should_avoid,
            },
            counterpart: d.counterpart,
            status: d.status,
            sentiment: d.sentiment,
            trust: d.trust,
            fear: d.fear,
            affection: d.affection,
            should_attack: d.should_attack,
            should_avoid: d.should_avoid,
            combat_stats: d.combat,
            social_stats: d.social,
            summary: d.summary,
        }
    }
}

/// Acknowledgement of an ingested event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReceipt {
    /// Always `"ok"`.
    pub status: &'static str,
    /// Agent that recorded the event.
    pub agent_id: String,
    /// Event family.
    pub kind: &'static str,
    /// Whether the agent was first seen with this event.
    pub created: bool,
    /// Updated ledger, when the event names a counterpart.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<LedgerSnapshot>,
}

/// Answer to a relationship query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RelationshipReply {
    /// The agent knows the counterpart.
    Known {
        /// Agent queried.
        agent_id: String,
        /// The ledger.
        relationship: LedgerSnapshot,
    },
    /// The agent has never dealt with the counterpart.
    Unknown {
        /// Agent queried.
        agent_id: String,
        /// Counterpart queried.
        counterpart: String,
    },
}

/// Answer to a memory summary query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryReply {
    /// Agent queried.
    pub agent_id: String,
    /// Social events ever recorded.
    pub total_interactions: u64,
    /// Combat events ever recorded.
    pub total_combat_events: u64,
    /// Known counterparts.
    pub relationship_count: usize,
    /// Rendered context digest.
    pub context_summary_text: String,
    /// Current threat.
    pub current_threat: Option<String>,
    /// Current goal.
    pub current_goal: String,
}

impl From<MemorySummary> for SummaryReply {
    fn from(s: MemorySummary) -> Self {
        Self {
            agent_id: s.agent_id.0,
            total_interactions: s.total_interactions,
            total_combat_events: s.total_combat_events,
            relationship_count: s.relationship_count,
            context_summary_text: s.context_summary_text,
            current_threat: s.current_threat,
            current_goal: s.current_goal,
        }
    }
}

/// Answer to a delete request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteReply {
    /// Agent deleted.
    pub agent_id: String,
    /// Whether a store existed and was removed.
    pub deleted: bool,
}

/// Answer to a health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReply {
    /// Always `"healthy"`.
    pub status: &'static str,
    /// Known agents.
    pub agent_count: usize,
}

/// Answer to a metrics request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsReply {
    /// Prometheus text exposition.
    pub prometheus: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    /// What went wrong.
    pub error: ErrorBody,
}

/// Structured error detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// `bad_request`, `rejected`, `not_found`, `persistence` or `config`.
    pub kind: String,
    /// Human-readable message.
    pub message: String,
    /// Offending payload field, for rejections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorReply {
    /// A request that could not be parsed at all.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                kind: "bad_request".to_string(),
                message: message.into(),
                field: None,
            },
        }
    }
}

impl From<&GrudgeError> for ErrorReply {
    fn from(err: &GrudgeError) -> Self {
        let kind = match err.kind() {
            ErrorKind::Rejected => "rejected",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Persistence => "persistence",
            ErrorKind::Config => "config",
        };
        let field = match err {
            GrudgeError::Validation { field, .. } => Some((*field).to_string()),
            _ => None,
        };
        Self {
            error: ErrorBody {
                kind: kind.to_string(),
                message: err.to_string(),
                field,
            },
        }
    }
}
