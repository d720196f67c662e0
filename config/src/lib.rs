//! Tenebra Configuration
//!
//! Shared configuration crate for the wallet engine.
//!
//! Handles loading configuration from:
//! 1. TN_CONFIG env var (explicit path)
//! 2. ./config.toml (current directory)
//! 3. ~/.tenebra/config.toml (user home)
//!
//! Environment variables take precedence over TOML config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs};

const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_NAME: &str = ".tenebra";

// ============================================================================
// Default Constants
// ============================================================================

const DEFAULT_DB_PATH: &str = "./tenebra-wallet-db";
const DEFAULT_SCAN_CHUNK: u64 = 16;
const DEFAULT_SCAN_POLL_MS: u64 = 1000;
const DEFAULT_RELAY_TIMEOUT_SECS: u64 = 120;

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenebraConfig {
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub scan: ScanTomlConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

/// Wallet storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.into(),
        }
    }
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.into()
}

/// Fund-scanning configuration (TOML format)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanTomlConfig {
    /// Blocks fetched and committed together in parallel mode.
    #[serde(default = "default_scan_chunk")]
    pub chunk_size: u64,
    /// Delay between tip polls once synced.
    #[serde(default = "default_scan_poll_ms")]
    pub poll_interval_ms: u64,
    /// Keep following the tip instead of completing at the current height.
    #[serde(default)]
    pub follow: bool,
    /// Scan all accounts of a wallet over the same chunk in parallel.
    #[serde(default = "default_true")]
    pub parallel: bool,
}

impl Default for ScanTomlConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_SCAN_CHUNK,
            poll_interval_ms: DEFAULT_SCAN_POLL_MS,
            follow: false,
            parallel: true,
        }
    }
}

fn default_scan_chunk() -> u64 {
    DEFAULT_SCAN_CHUNK
}
fn default_scan_poll_ms() -> u64 {
    DEFAULT_SCAN_POLL_MS
}
fn default_true() -> bool {
    true
}

/// Network relay configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Upper bound callers put on a confirmation wait.
    #[serde(default = "default_relay_timeout")]
    pub confirmation_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout_secs: DEFAULT_RELAY_TIMEOUT_SECS,
        }
    }
}

fn default_relay_timeout() -> u64 {
    DEFAULT_RELAY_TIMEOUT_SECS
}

// ============================================================================
// Environment Variable Helpers
// ============================================================================

/// Set field from env var if present
fn env_string(vars: &impl Fn(&str) -> Option<String>, key: &str, field: &mut String) {
    if let Some(v) = vars(key) {
        *field = v;
    }
}

/// Set field from env var if present and parseable
fn env_parse<T: std::str::FromStr>(
    vars: &impl Fn(&str) -> Option<String>,
    key: &str,
    field: &mut T,
) {
    if let Some(v) = vars(key) {
        match v.parse() {
            Ok(parsed) => *field = parsed,
            Err(_) => log::warn!("Ignoring unparseable {key}={v}"),
        }
    }
}

/// Set bool from env var if present ("1"/"true" are truthy)
fn env_bool(vars: &impl Fn(&str) -> Option<String>, key: &str, field: &mut bool) {
    if let Some(v) = vars(key) {
        *field = v == "1" || v.eq_ignore_ascii_case("true");
    }
}

// ============================================================================
// Implementation
// ============================================================================

impl TenebraConfig {
    /// Load configuration from config file with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                log::info!("Loading config from: {}", path.display());
                Self::parse_file(&path)?
            }
            None => {
                log::info!("No config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::parse_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn parse_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check TN_CONFIG env var
        if let Ok(path) = env::var("TN_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check ./config.toml (current directory)
        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        // 3. Check ~/.tenebra/config.toml
        Self::default_config_path().filter(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn apply_overrides(&mut self, vars: impl Fn(&str) -> Option<String>) {
        // Wallet
        env_string(&vars, "TN_DB_PATH", &mut self.wallet.db_path);

        // Scan
        env_parse(&vars, "TN_SCAN_CHUNK", &mut self.scan.chunk_size);
        env_parse(&vars, "TN_SCAN_POLL_MS", &mut self.scan.poll_interval_ms);
        env_bool(&vars, "TN_SCAN_FOLLOW", &mut self.scan.follow);
        env_bool(&vars, "TN_SCAN_PARALLEL", &mut self.scan.parallel);

        // Relay
        env_parse(
            &vars,
            "TN_RELAY_TIMEOUT_SECS",
            &mut self.relay.confirmation_timeout_secs,
        );
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        let mut sample = Self::default();
        sample.scan.follow = true;
        toml::to_string_pretty(&sample).unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = TenebraConfig::default();
        assert_eq!(config.wallet.db_path, DEFAULT_DB_PATH);
        assert_eq!(config.scan.chunk_size, DEFAULT_SCAN_CHUNK);
        assert!(config.scan.parallel);
        assert!(!config.scan.follow);
    }

    #[test]
    fn test_generate_sample() {
        let sample = TenebraConfig::generate_sample();
        assert!(sample.contains("[wallet]"));
        assert!(sample.contains("[scan]"));
        assert!(sample.contains("[relay]"));
    }

    #[test]
    fn test_parse_sample() {
        let sample = TenebraConfig::generate_sample();
        let parsed: TenebraConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.wallet.db_path, DEFAULT_DB_PATH);
        assert!(parsed.scan.follow);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[scan]\nchunk_size = 4\n").unwrap();

        let parsed = TenebraConfig::parse_file(&path).unwrap();
        assert_eq!(parsed.scan.chunk_size, 4);
        assert_eq!(parsed.scan.poll_interval_ms, DEFAULT_SCAN_POLL_MS);
        assert_eq!(parsed.relay, RelayConfig::default());
    }

    #[test]
    fn test_load_from_reads_the_given_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("wallet.toml");
        fs::write(&path, "[relay]\nconfirmation_timeout_secs = 9\n").unwrap();

        let config = TenebraConfig::load_from(&path).unwrap();
        assert_eq!(config.relay.confirmation_timeout_secs, 9);
        assert_eq!(config.scan, ScanTomlConfig::default());

        assert!(TenebraConfig::load_from(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_overrides_take_precedence() {
        let vars: HashMap<&str, &str> = [
            ("TN_DB_PATH", "/tmp/wallet"),
            ("TN_SCAN_CHUNK", "64"),
            ("TN_SCAN_PARALLEL", "false"),
            ("TN_SCAN_FOLLOW", "1"),
            ("TN_RELAY_TIMEOUT_SECS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = TenebraConfig::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.wallet.db_path, "/tmp/wallet");
        assert_eq!(config.scan.chunk_size, 64);
        assert!(!config.scan.parallel);
        assert!(config.scan.follow);
        assert_eq!(
            config.relay.confirmation_timeout_secs,
            DEFAULT_RELAY_TIMEOUT_SECS
        );
    }
}
