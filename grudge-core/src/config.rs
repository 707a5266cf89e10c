//! Configuration for the GRUDGE engine.
//!
//! Maps directly to `grudge.toml`. Every section and field has a default,
//! so an empty file is a valid configuration.
//!
//! ```toml
//! [general]
//! log_level = "debug"
//!
//! [memory]
//! combat_log_capacity = 50
//!
//! [persistence]
//! backend = "json"
//! path = "data/npc_memory.json"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level GRUDGE configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrudgeConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Per-agent log capacities.
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Boundary validation limits.
    #[serde(default)]
    pub validation: ValidationConfig,
    /// Persistence / save settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl GrudgeConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `GrudgeError::Config` if the TOML is invalid or a value is
    /// out of range.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| crate::GrudgeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Reject values the engine cannot run with.
    ///
    /// # Errors
    /// Returns `GrudgeError::Config` naming the offending field.
    pub fn validate(&self) -> crate::error::Result<()> {
        let m = &self.memory;
        for (name, value) in [
            ("memory.combat_log_capacity", m.combat_log_capacity),
            ("memory.social_log_capacity", m.social_log_capacity),
            ("memory.environmental_log_capacity", m.environmental_log_capacity),
            ("memory.recent_combat_window", m.recent_combat_window),
            ("validation.max_name_chars", self.validation.max_name_chars),
            ("validation.max_text_chars", self.validation.max_text_chars),
        ] {
            if value == 0 {
                return Err(crate::GrudgeError::Config(format!("{name} must be at least 1")));
            }
        }
        if !(self.validation.max_damage.is_finite() && self.validation.max_damage > 0.0) {
            return Err(crate::GrudgeError::Config(
                "validation.max_damage must be a positive finite number".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log filter directive: trace, debug, info, warn, error, or a full
    /// `EnvFilter` expression.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text.
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

/// Per-agent memory capacities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Combat events kept per agent (oldest evicted first).
    #[serde(default = "default_50")]
    pub combat_log_capacity: usize,
    /// Social events kept per agent.
    #[serde(default = "default_50")]
    pub social_log_capacity: usize,
    /// Environmental events kept per agent.
    #[serde(default = "default_50")]
    pub environmental_log_capacity: usize,
    /// How many of the latest combat events the context summary scans for
    /// recent attacks.
    #[serde(default = "default_5")]
    pub recent_combat_window: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            combat_log_capacity: 50,
            social_log_capacity: 50,
            environmental_log_capacity: 50,
            recent_combat_window: 5,
        }
    }
}

/// Limits applied when validating raw event payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Maximum characters in an agent or counterpart name.
    #[serde(default = "default_64")]
    pub max_name_chars: usize,
    /// Maximum characters in any free-text field.
    #[serde(default = "default_256")]
    pub max_text_chars: usize,
    /// Largest damage value accepted for a single event.
    #[serde(default = "default_max_damage")]
    pub max_damage: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_name_chars: 64,
            max_text_chars: 256,
            max_damage: default_max_damage(),
        }
    }
}

/// Which storage backend holds the persisted collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// One `SQLite` row per agent.
    Sqlite,
    /// A single JSON object keyed by agent id.
    Json,
}

/// Persistence / save configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Storage backend.
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    /// Database or JSON file path.
    #[serde(default = "default_path")]
    pub path: PathBuf,
    /// Use WAL mode (`SQLite` only).
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Detect save corruption via checksums (`SQLite` only).
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_path(),
            wal_mode: true,
            checksum_enabled: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_backend() -> StorageBackend { StorageBackend::Sqlite }
fn default_path() -> PathBuf { PathBuf::from("data/npc_memory.db") }
fn default_max_damage() -> f64 { 10_000.0 }
fn default_5() -> usize { 5 }
fn default_50() -> usize { 50 }
fn default_64() -> usize { 64 }
fn default_256() -> usize { 256 }
