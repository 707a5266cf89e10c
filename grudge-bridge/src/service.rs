//! Request dispatch.
//!
//! [`GrudgeService`] is what a transport (HTTP handler, game plugin, IPC
//! loop) holds. It owns the engine and exposes one typed method per
//! operation plus [`handle_json`](GrudgeService::handle_json) for callers
//! that only move strings around.

use std::sync::Arc;

use grudge_core::error::GrudgeError;
use grudge_core::{ErrorKind, StoreManager};
use grudge_core::validation::{EventFamily, validate_agent_id};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{BridgeConfig, BridgeSettings};
use crate::contract::{
    DeleteReply, ErrorReply, HealthReply, IngestReceipt, IngestRequest, LedgerSnapshot,
    MetricsReply, RelationshipReply, Request, Saved, SummaryReply,
};

/// Why a request could not be served.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The request text is not a valid request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The request exceeds `bridge.max_request_bytes`.
    #[error("Request of {size} bytes exceeds the {limit}-byte limit")]
    TooLarge {
        /// Request size.
        size: usize,
        /// Configured limit.
        limit: usize,
    },

    /// The engine refused or failed.
    #[error(transparent)]
    Engine(#[from] GrudgeError),
}

impl From<&BridgeError> for ErrorReply {
    fn from(err: &BridgeError) -> Self {
        match err {
            BridgeError::Engine(e) => ErrorReply::from(e),
            other => ErrorReply::bad_request(other.to_string()),
        }
    }
}

/// Result alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// The engine behind a request interface.
#[derive(Debug, Clone)]
pub struct GrudgeService {
    manager: Arc<StoreManager>,
    settings: BridgeSettings,
}

impl GrudgeService {
    /// Wrap an existing engine.
    #[must_use]
    pub fn new(manager: Arc<StoreManager>, settings: BridgeSettings) -> Self {
        Self { manager, settings }
    }

    /// Open storage and load every persisted agent.
    ///
    /// # Errors
    /// Returns an error if the storage backend cannot be opened.
    pub fn from_config(config: BridgeConfig) -> Result<Self> {
        let manager = StoreManager::from_config(config.engine)?;
        info!(
            agents = manager.agent_count(),
            max_request_bytes = config.bridge.max_request_bytes,
            "GRUDGE service ready"
        );
        Ok(Self::new(Arc::new(manager), config.bridge))
    }

    /// The engine.
    #[must_use]
    pub fn manager(&self) -> &Arc<StoreManager> {
        &self.manager
    }

    // -----------------------------------------------------------------------
    // Typed operations
    // -----------------------------------------------------------------------

    /// Validate and record an event.
    ///
    /// # Errors
    /// Returns [`BridgeError::Engine`] with a validation error if the family
    /// or payload is rejected.
    pub fn ingest(&self, req: &IngestRequest) -> Result<Saved<IngestReceipt>> {
        let family = EventFamily::parse(&req.kind)?;
        let outcome = self.manager.ingest(&req.agent_id, family, &req.payload)?;
        Ok(Saved::from_persisted(outcome, |o| IngestReceipt {
            status: "ok",
            agent_id: o.agent_id.0,
            kind: o.family,
            created: o.created,
            relationship: o.disposition.map(LedgerSnapshot::from),
        }))
    }

    /// What `agent_id` thinks of `counterpart`.
    ///
    /// # Errors
    /// Returns a validation error if `agent_id` is malformed.
    pub fn relationship(&self, agent_id: &str, counterpart: &str) -> Result<Saved<RelationshipReply>> {
        let agent = validate_agent_id(agent_id, &self.manager.config().validation)?;
        let counterpart = counterpart.trim();
        let outcome = self.manager.relationship(&agent, counterpart);
        Ok(Saved::from_persisted(outcome, |found| match found {
            Some(d) => RelationshipReply::Known {
                agent_id: agent.0.clone(),
                relationship: LedgerSnapshot::from(d),
            },
            None => RelationshipReply::Unknown {
                agent_id: agent.0.clone(),
                counterpart: counterpart.to_string(),
            },
        }))
    }

    /// Headline numbers and context text for `agent_id`.
    ///
    /// # Errors
    /// Returns a validation error if `agent_id` is malformed.
    pub fn summary(&self, agent_id: &str) -> Result<Saved<SummaryReply>> {
        let agent = validate_agent_id(agent_id, &self.manager.config().validation)?;
        Ok(Saved::from_persisted(self.manager.summary(&agent), SummaryReply::from))
    }

    /// Forget `agent_id`.
    ///
    /// # Errors
    /// Returns a validation error if `agent_id` is malformed.
    pub fn delete(&self, agent_id: &str) -> Result<Saved<DeleteReply>> {
        let agent = validate_agent_id(agent_id, &self.manager.config().validation)?;
        let outcome = self.manager.delete(&agent);
        Ok(Saved::from_persisted(outcome, |deleted| DeleteReply {
            agent_id: agent.0.clone(),
            deleted,
        }))
    }

    /// Liveness probe.
    #[must_use]
    pub fn health(&self) -> HealthReply {
        HealthReply {
            status: "healthy",
            agent_count: self.manager.agent_count(),
        }
    }

    /// Prometheus export of the engine counters.
    #[must_use]
    pub fn metrics(&self) -> MetricsReply {
        MetricsReply {
            prometheus: self.manager.metrics().to_prometheus(),
        }
    }

    // -----------------------------------------------------------------------
    // String interface
    // -----------------------------------------------------------------------

    /// Parse a request, dispatch it and encode the reply.
    ///
    /// Always returns a JSON document: the reply on success, an
    /// [`ErrorReply`] otherwise.
    #[must_use]
    pub fn handle_json(&self, raw: &str) -> String {
        match self.dispatch(raw) {
            Ok(reply) => reply,
            Err(e) => {
                match &e {
                    BridgeError::Engine(inner) if inner.kind() == ErrorKind::Persistence => {
                        warn!(error = %e, "Request failed");
                    }
                    _ => debug!(error = %e, "Request refused"),
                }
                self.encode(&ErrorReply::from(&e))
            }
        }
    }

    fn dispatch(&self, raw: &str) -> Result<String> {
        let limit = self.settings.max_request_bytes;
        if raw.len() > limit {
            return Err(BridgeError::TooLarge {
                size: raw.len(),
                limit,
            });
        }
        let request: Request =
            serde_json::from_str(raw).map_err(|e| BridgeError::BadRequest(e.to_string()))?;

        Ok(match request {
            Request::Ingest(req) => self.encode(&self.ingest(&req)?),
            Request::Relationship {
                agent_id,
                counterpart,
            } => self.encode(&self.relationship(&agent_id, &counterpart)?),
            Request::Summary { agent_id } => self.encode(&self.summary(&agent_id)?),
            Request::Delete { agent_id } => self.encode(&self.delete(&agent_id)?),
            Request::Health => self.encode(&self.health()),
            Request::Metrics => self.encode(&self.metrics()),
        })
    }

    fn encode<T: Serialize>(&self, reply: &T) -> String {
        let encoded = if self.settings.pretty_replies {
            serde_json::to_string_pretty(reply)
        } else {
            serde_json::to_string(reply)
        };
        encoded.unwrap_or_else(|e| {
            serde_json::json!({ "error": { "kind": "internal", "message": e.to_string() } })
                .to_string()
        })
    }
}
