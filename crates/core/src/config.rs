use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_usize(profile: &str, key: &str) -> Option<usize> {
    profiled_env_opt(profile, key).and_then(|v| v.parse().ok())
}

fn profiled_env_i32(profile: &str, key: &str, default: i32) -> i32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key) {
        Some(v) => matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        None => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub storage: StorageConfig,
    pub table: TableConfig,
}

/// Well-known env keys that identify a profile when prefixed.
const PROFILE_MARKER_KEYS: &[&str] = &["DATA_DIR", "TABLE_MAX_VERSIONS"];

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `STRATA_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("STRATA_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            storage: StorageConfig::from_env_profiled(p),
            table: TableConfig::from_env_profiled(p),
        }
    }

    /// Default settings rooted at `data_dir`, ignoring the environment.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            profile: String::new(),
            storage: StorageConfig {
                data_dir: data_dir.into(),
                compression_level: 3,
            },
            table: TableConfig::default(),
        }
    }

    /// Discover available profiles by scanning env vars for `{PREFIX}_{MARKER_KEY}` patterns.
    /// Always includes "default" (the unprefixed config).
    pub fn available_profiles() -> Vec<String> {
        let mut profiles = std::collections::BTreeSet::new();
        profiles.insert("default".to_string());

        for (key, _) in env::vars() {
            for marker in PROFILE_MARKER_KEYS {
                if let Some(prefix) = key.strip_suffix(&format!("_{}", marker)) {
                    if !prefix.is_empty()
                        && prefix.chars().all(|c| c.is_ascii_uppercase() || c == '_')
                    {
                        profiles.insert(prefix.to_string());
                    }
                }
            }
        }

        profiles.into_iter().collect()
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  storage:     data_dir={}, zstd_level={}",
            self.storage.data_dir.display(),
            self.storage.compression_level
        );
        tracing::info!(
            "  table:       versioning={}, max_versions={}, max_mutation_bytes={:?}",
            self.table.versioning,
            self.table.max_versions,
            self.table.max_mutation_bytes
        );
    }

    /// Return a view suitable for printing or API responses.
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "storage": {
                "data_dir": self.storage.data_dir,
                "compression_level": self.storage.compression_level,
            },
            "table": {
                "versioning": self.table.versioning,
                "max_versions": self.table.max_versions,
                "max_mutation_bytes": self.table.max_mutation_bytes,
            },
        })
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    /// zstd level used when flushing table files.
    pub compression_level: i32,
}

impl StorageConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            data_dir: PathBuf::from(profiled_env_or(p, "DATA_DIR", "data")),
            compression_level: profiled_env_i32(p, "ZSTD_LEVEL", 3),
        }
    }
}

// ── Table defaults ────────────────────────────────────────────

/// Defaults applied when a table is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Attach the default versioning stage to new tables.
    pub versioning: bool,
    pub max_versions: u32,
    /// Size limit enforced on every mutation written to a new table.
    pub max_mutation_bytes: Option<usize>,
}

impl TableConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            versioning: profiled_env_bool(p, "TABLE_VERSIONING", true),
            max_versions: profiled_env_u32(p, "TABLE_MAX_VERSIONS", 1).max(1),
            max_mutation_bytes: profiled_env_usize(p, "TABLE_MAX_MUTATION_BYTES").filter(|n| *n > 0),
        }
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            versioning: true,
            max_versions: 1,
            max_mutation_bytes: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_prefers_prefixed_key() {
        env::set_var("CFGTEST_DATA_DIR", "/tmp/strata-cfgtest");
        let config = Config::for_profile("cfgtest");
        assert_eq!(config.profile, "CFGTEST");
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/strata-cfgtest"));
        assert!(Config::available_profiles().contains(&"CFGTEST".to_string()));
        env::remove_var("CFGTEST_DATA_DIR");
    }

    #[test]
    fn test_table_defaults() {
        let table = TableConfig::default();
        assert!(table.versioning);
        assert_eq!(table.max_versions, 1);
        assert_eq!(table.max_mutation_bytes, None);
    }

    #[test]
    fn test_max_mutation_bytes_from_env() {
        env::set_var("CFGLIMIT_TABLE_MAX_MUTATION_BYTES", "4096");
        assert_eq!(Config::for_profile("cfglimit").table.max_mutation_bytes, Some(4096));
        env::set_var("CFGLIMIT_TABLE_MAX_MUTATION_BYTES", "0");
        assert_eq!(Config::for_profile("cfglimit").table.max_mutation_bytes, None);
        env::remove_var("CFGLIMIT_TABLE_MAX_MUTATION_BYTES");
    }

    #[test]
    fn test_redacted_summary_shape() {
        let config = Config::for_profile("");
        let summary = config.redacted_summary();
        assert_eq!(summary["profile"], "default");
        assert!(summary["table"]["max_versions"].as_u64().unwrap() >= 1);
    }
}
