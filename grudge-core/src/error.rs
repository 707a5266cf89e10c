//! Error types for the GRUDGE core library.

use thiserror::Error;

use crate::types::AgentId;

/// Top-level error type for all GRUDGE operations.
#[derive(Error, Debug)]
pub enum GrudgeError {
    /// An event payload violated a field constraint. Nothing was mutated.
    #[error("Invalid event payload: {field}: {reason}")]
    Validation {
        /// The first offending field.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// No memory store exists for the agent.
    #[error("Unknown agent: {0}")]
    UnknownAgent(AgentId),

    /// The agent has never interacted with the counterpart.
    #[error("Agent {agent} has no relationship with {counterpart}")]
    UnknownCounterpart {
        /// The agent that was queried.
        agent: AgentId,
        /// The counterpart that was not found.
        counterpart: String,
    },

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// `SQLite` persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`GrudgeError`] for callers that need to
/// decide whether any state changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request was rejected before any mutation.
    Rejected,
    /// The agent or counterpart does not exist.
    NotFound,
    /// Storage could not be read or written. In-memory state is unaffected.
    Persistence,
    /// The configuration is invalid.
    Config,
}

impl GrudgeError {
    /// Build a validation error for `field`.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Rejected,
            Self::UnknownAgent(_) | Self::UnknownCounterpart { .. } => ErrorKind::NotFound,
            Self::Serialization(_) | Self::Database(_) | Self::Io(_) => ErrorKind::Persistence,
            Self::Config(_) => ErrorKind::Config,
        }
    }
}

impl From<serde_json::Error> for GrudgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, GrudgeError>;

/// The outcome of a write-through operation.
///
/// The in-memory change in `value` has been applied. `save_error` is set if
/// writing it to storage failed; the change is kept in memory regardless.
#[derive(Debug)]
#[must_use]
pub struct Persisted<T> {
    /// What the operation produced.
    pub value: T,
    /// Why the change could not be saved, if it could not.
    pub save_error: Option<GrudgeError>,
}

impl<T> Persisted<T> {
    /// Pair `value` with the outcome of the save that followed it.
    pub fn new(value: T, saved: Result<()>) -> Self {
        Self {
            value,
            save_error: saved.err(),
        }
    }

    /// A value that needed no save.
    pub fn unchanged(value: T) -> Self {
        Self {
            value,
            save_error: None,
        }
    }

    /// Whether the change reached storage.
    #[must_use]
    pub fn is_saved(&self) -> bool {
        self.save_error.is_none()
    }

    /// Transform the value, keeping the save outcome.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Persisted<U> {
        Persisted {
            value: f(self.value),
            save_error: self.save_error,
        }
    }

    /// Treat a failed save as an error.
    ///
    /// # Errors
    /// Returns the save error, if any.
    pub fn into_result(self) -> Result<T> {
        match self.save_error {
            None => Ok(self.value),
            Some(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_separate_rejections_from_storage_failures() {
        assert_eq!(GrudgeError::invalid("damage", "negative").kind(), ErrorKind::Rejected);
        assert_eq!(
            GrudgeError::UnknownAgent(AgentId::from("Professor G")).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            GrudgeError::Serialization("bad json".into()).kind(),
            ErrorKind::Persistence
        );
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        assert_eq!(GrudgeError::from(io).kind(), ErrorKind::Persistence);
    }

    #[test]
    fn persisted_keeps_value_when_save_fails() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let p = Persisted::new(7, Err(io.into())).map(|v| v * 2);
        assert!(!p.is_saved());
        assert_eq!(p.value, 14);
        assert_eq!(p.into_result().expect_err("unsaved").kind(), ErrorKind::Persistence);

        assert_eq!(Persisted::unchanged("ok").into_result().expect("saved"), "ok");
    }

    #[test]
    fn validation_message_names_the_field() {
        let err = GrudgeError::invalid("entity_name", "must not be empty");
        assert_eq!(
            err.to_string(),
            "Invalid event payload: entity_name: must not be empty"
        );
    }
}
