//! # grudge-bridge: request interface for GRUDGE
//!
//! Sits between a transport and `grudge-core`. Whatever carries the
//! requests (an HTTP server, a game plugin, a pipe) hands JSON text to
//! [`GrudgeService::handle_json`] and sends back what it returns.
//!
//! ```text
//!  transport ──json──▶ GrudgeService ──▶ StoreManager ──▶ storage
//!            ◀─json───  (contract)        (grudge-core)
//! ```
//!
//! ## Modules
//!
//! - `config`: `grudge.toml` with an extra `[bridge]` section
//! - `contract`: request and reply shapes
//! - `service`: dispatch and error mapping
//! - `logging`: `tracing` subscriber setup

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod contract;
pub mod logging;
pub mod service;

pub use config::BridgeConfig;
pub use contract::{ErrorReply, Request};
pub use service::{BridgeError, GrudgeService};
