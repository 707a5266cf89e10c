//! Bridge configuration: the engine's `grudge.toml` plus a `[bridge]`
//! section for the request layer.
//!
//! ```toml
//! [general]
//! log_level = "info"
//!
//! [persistence]
//! backend = "json"
//! path = "data/npc_memory.json"
//!
//! [bridge]
//! max_request_bytes = 65536
//! ```

use std::path::Path;

use grudge_core::GrudgeError;
use grudge_core::config::GrudgeConfig;
use serde::{Deserialize, Serialize};

/// Engine configuration plus request-layer settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Engine settings (`[general]`, `[memory]`, `[validation]`,
    /// `[persistence]`).
    #[serde(flatten)]
    pub engine: GrudgeConfig,
    /// Request-layer settings.
    #[serde(default)]
    pub bridge: BridgeSettings,
}

/// Settings for [`GrudgeService`](crate::service::GrudgeService).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeSettings {
    /// Requests larger than this are rejected unread.
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,
    /// Pretty-print JSON replies.
    #[serde(default)]
    pub pretty_replies: bool,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            max_request_bytes: default_max_request_bytes(),
            pretty_replies: false,
        }
    }
}

impl BridgeConfig {
    /// Load from a TOML string.
    ///
    /// # Errors
    /// Returns `GrudgeError::Config` if the TOML is invalid or a value is
    /// out of range.
    pub fn from_toml(toml_str: &str) -> grudge_core::error::Result<Self> {
        let config: Self = toml::from_str(toml_str).map_err(|e| GrudgeError::Config(e.to_string()))?;
        config.engine.validate()?;
        if config.bridge.max_request_bytes == 0 {
            return Err(GrudgeError::Config(
                "bridge.max_request_bytes must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    /// Load from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> grudge_core::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

fn default_max_request_bytes() -> usize { 64 * 1024 }

#[cfg(test)]
mod tests {
    use super::*;
    use grudge_core::config::StorageBackend;

    #[test]
    fn engine_and_bridge_sections_share_one_file() {
        let config = BridgeConfig::from_toml(
            r#"
            [general]
            log_level = "debug"

            [persistence]
            backend = "json"
            path = "saves/npc_memory.json"

            [bridge]
            max_request_bytes = 1024
            "#,
        )
        .expect("parse");
        assert_eq!(config.engine.general.log_level, "debug");
        assert_eq!(config.engine.persistence.backend, StorageBackend::Json);
        assert_eq!(config.engine.memory.combat_log_capacity, 50);
        assert_eq!(config.bridge.max_request_bytes, 1024);
        assert!(!config.bridge.pretty_replies);
    }

    #[test]
    fn empty_file_is_valid() {
        let config = BridgeConfig::from_toml("").expect("parse");
        assert_eq!(config.bridge.max_request_bytes, 65_536);
    }

    #[test]
    fn engine_limits_are_still_checked() {
        assert!(BridgeConfig::from_toml("[memory]\nsocial_log_capacity = 0").is_err());
        assert!(BridgeConfig::from_toml("[bridge]\nmax_request_bytes = 0").is_err());
    }
}
