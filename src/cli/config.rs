//! Bountyd configuration file handling.
//!
//! Configuration files are TOML format. Only deployment settings live
//! here: program addresses, poll cadence, logging. Lifecycle rules
//! (who may claim, release thresholds, the ban threshold) are fixed in
//! the engine and are not operator-tunable.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

/// Default governance poll interval in seconds
const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_commitment() -> String {
    "confirmed".to_string()
}

/// Bountyd service configuration (operator settings only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BountydConfig {
    /// On-chain program addresses
    pub chain: ChainConfig,

    /// Governance polling configuration
    #[serde(default)]
    pub poller: PollerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Chain-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Address of the deployed escrow program
    pub escrow_program_id: String,

    /// Governance realm (DAO) address, if token-holder governance is in
    /// use. Leave unset for creator-fallback release authority.
    pub governance_realm: Option<String>,

    /// Commitment level for on-chain reads
    #[serde(default = "default_commitment")]
    pub commitment: String,
}

/// Governance polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Seconds between reconciliation passes over linked proposals
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl BountydConfig {
    /// Create a new configuration with the given escrow program address
    pub fn new(escrow_program_id: String) -> Self {
        Self {
            chain: ChainConfig {
                escrow_program_id,
                governance_realm: None,
                commitment: default_commitment(),
            },
            poller: PollerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: BountydConfig = toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(path, contents)
            .map_err(|e| format!("Failed to write config file '{}': {}", path.display(), e))?;

        Ok(())
    }

    /// Generate default configuration content as a string with comments
    pub fn generate_default_toml(escrow_program_id: &str) -> String {
        format!(
            r#"# Bountyd Configuration (Operator Settings)
#
# Deployment settings only: program addresses, polling cadence, logging.
# Lifecycle rules (claim eligibility, release authority checks, the
# ownership-verification ban threshold) are fixed in the engine and
# cannot be changed here.

[chain]
# Address of the deployed escrow program
escrow_program_id = "{escrow_program_id}"

# Governance realm (DAO) address. Leave commented to run without
# token-holder governance; escrow release then falls back to the
# bounty creator's own key.
# governance_realm = "..."

# Commitment level for on-chain reads
commitment = "confirmed"

[poller]
# Seconds between reconciliation passes over linked proposals
interval_secs = 30

[logging]
# Log level: trace, debug, info, warn, error
level = "info"
"#,
        )
    }

    /// Create and save a default configuration file
    pub fn create_default(
        config_path: &Path,
        escrow_program_id: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let contents = Self::generate_default_toml(escrow_program_id);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(config_path, contents).map_err(|e| {
            format!(
                "Failed to write config file '{}': {}",
                config_path.display(),
                e
            )
        })?;

        Ok(())
    }
}

/// Get the default config file path: ~/.local/share/bountyd/config.toml
pub fn default_config_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bountyd")
        .join("config.toml")
}
