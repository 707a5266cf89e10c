//! # GRUDGE Core Library
//!
//! Relationship and memory engine for autonomous game agents.
//!
//! Every agent gets a [`MemoryStore`] that folds what happens to it into:
//!
//! - **Event logs**: the last 50 combat, social and environmental events
//! - **Relationships**: trust, fear and affection toward each counterpart,
//!   plus what they did (attacks, damage, gifts, help)
//! - **Situation**: current threat, ally and goal
//!
//! From that state the engine derives whether the agent should fight or
//! avoid a counterpart, and a short context digest for whatever generates
//! the agent's words. It never decides what the agent says.
//!
//! The [`StoreManager`] holds every agent's store, validates incoming
//! payloads and writes the whole collection through to storage
//! (`SQLite` or a JSON file) after every change.
//!
//! ```no_run
//! use grudge_core::{AgentId, GrudgeConfig, StoreManager};
//! use grudge_core::validation::{EventFamily, RawEvent};
//!
//! let manager = StoreManager::from_config(GrudgeConfig::default())?;
//! let hit = RawEvent {
//!     event_type: Some("attacked_by".into()),
//!     entity_name: Some("Steve".into()),
//!     entity_type: Some("player".into()),
//!     damage: Some(3.0),
//!     ..RawEvent::default()
//! };
//! let outcome = manager.ingest("Professor G", EventFamily::Combat, &hit)?;
//! let summary = manager.summary(&AgentId::from("Professor G"));
//! println!("{}", summary.value.context_summary_text);
//! # let _ = outcome;
//! # Ok::<(), grudge_core::GrudgeError>(())
//! ```

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod behavior;
pub mod config;
pub mod error;
pub mod events;
pub mod ledger;
pub mod log;
pub mod manager;
pub mod metrics;
pub mod persistence;
pub mod store;
pub mod summary;
pub mod types;
pub mod validation;

pub use behavior::Disposition;
pub use config::GrudgeConfig;
pub use error::{ErrorKind, GrudgeError, Persisted};
pub use events::Event;
pub use ledger::Relationship;
pub use manager::StoreManager;
pub use store::MemoryStore;
pub use types::*;
