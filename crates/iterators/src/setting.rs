//! Iterator settings: what gets attached to a table.
//!
//! A setting is a name, a priority, a stage kind and a flat map of string
//! options. Options are validated by building the stage, so a setting that
//! passes [`IteratorSetting::validate`] can always be opened.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strata_core::Column;

use crate::encoding::LongEncoding;
use crate::error::IteratorError;
use crate::stages::Stage;

/// Option keys understood by the built-in stages.
pub mod options {
    pub const TTL: &str = "ttl";
    pub const CURRENT_TIME: &str = "currentTime";
    pub const NEGATE: &str = "negate";
    pub const ALL_COLUMNS: &str = "all";
    pub const ALL_COLUMNS_ALIAS: &str = "combineAllColumns";
    pub const COLUMNS: &str = "columns";
    pub const ENCODING: &str = "type";
    pub const RADIX: &str = "radix";
    pub const MAX_VERSIONS: &str = "maxVersions";
    pub const IGNORE_VISIBILITY: &str = "ignoreVisibility";
}

// ── Stage kinds ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageKind {
    AgeOff,
    SummingCombiner,
    StatsCombiner,
    Versioning,
}

impl StageKind {
    /// Name used when a setting is created without an explicit one.
    pub fn default_name(&self) -> &'static str {
        match self {
            StageKind::AgeOff => "ageoff",
            StageKind::SummingCombiner => "sum",
            StageKind::StatsCombiner => "stats",
            StageKind::Versioning => "vers",
        }
    }

    /// Option keys this kind reads.
    pub fn known_options(&self) -> &'static [&'static str] {
        use options::*;
        match self {
            StageKind::AgeOff => &[TTL, CURRENT_TIME, NEGATE],
            StageKind::SummingCombiner => {
                &[ALL_COLUMNS, ALL_COLUMNS_ALIAS, COLUMNS, ENCODING, IGNORE_VISIBILITY]
            }
            StageKind::StatsCombiner => {
                &[ALL_COLUMNS, ALL_COLUMNS_ALIAS, COLUMNS, RADIX, IGNORE_VISIBILITY]
            }
            StageKind::Versioning => &[MAX_VERSIONS],
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::AgeOff => write!(f, "AgeOff"),
            StageKind::SummingCombiner => write!(f, "SummingCombiner"),
            StageKind::StatsCombiner => write!(f, "StatsCombiner"),
            StageKind::Versioning => write!(f, "Versioning"),
        }
    }
}

impl FromStr for StageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "ageoff" | "ageofffilter" => Ok(StageKind::AgeOff),
            "sum" | "summing" | "summingcombiner" => Ok(StageKind::SummingCombiner),
            "stats" | "statscombiner" => Ok(StageKind::StatsCombiner),
            "vers" | "versioning" | "versioningiterator" => Ok(StageKind::Versioning),
            _ => Err(format!("unknown stage kind '{}'", s)),
        }
    }
}

// ── Scopes ──────────────────────────────────────────────────────────

/// When an attached iterator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IteratorScope {
    /// Client scans.
    Scan,
    /// Minor compaction (in-memory data written out).
    Minc,
    /// Major compaction (files merged).
    Majc,
}

impl IteratorScope {
    pub const ALL: [IteratorScope; 3] = [IteratorScope::Scan, IteratorScope::Minc, IteratorScope::Majc];
}

impl fmt::Display for IteratorScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IteratorScope::Scan => write!(f, "scan"),
            IteratorScope::Minc => write!(f, "minc"),
            IteratorScope::Majc => write!(f, "majc"),
        }
    }
}

impl FromStr for IteratorScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scan" => Ok(IteratorScope::Scan),
            "minc" => Ok(IteratorScope::Minc),
            "majc" => Ok(IteratorScope::Majc),
            _ => Err(format!("unknown iterator scope '{}'", s)),
        }
    }
}

// ── Settings ────────────────────────────────────────────────────────

/// One attachable stage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IteratorSetting {
    pub name: String,
    pub priority: u32,
    pub kind: StageKind,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl IteratorSetting {
    pub fn new(priority: u32, name: impl Into<String>, kind: StageKind) -> Self {
        Self {
            name: name.into(),
            priority,
            kind,
            options: BTreeMap::new(),
        }
    }

    /// Create a setting named after its kind (`ageoff`, `sum`, `stats`, `vers`).
    pub fn with_default_name(priority: u32, kind: StageKind) -> Self {
        Self::new(priority, kind.default_name(), kind)
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_option(key, value);
        self
    }

    pub fn set_option(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.options.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(|s| s.as_str())
    }

    /// Age-off time-to-live in milliseconds.
    pub fn ttl(self, ttl_ms: i64) -> Self {
        self.option(options::TTL, ttl_ms.to_string())
    }

    /// Fixed reference time for age-off, in milliseconds.
    pub fn current_time(self, now_ms: i64) -> Self {
        self.option(options::CURRENT_TIME, now_ms.to_string())
    }

    pub fn negate(self, negate: bool) -> Self {
        self.option(options::NEGATE, negate.to_string())
    }

    pub fn combine_all_columns(self, all: bool) -> Self {
        self.option(options::ALL_COLUMNS, all.to_string())
    }

    pub fn columns(self, columns: &[Column]) -> Self {
        let joined = columns
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.combine_all_columns(false).option(options::COLUMNS, joined)
    }

    pub fn encoding(self, encoding: LongEncoding) -> Self {
        self.option(options::ENCODING, encoding.to_string())
    }

    pub fn radix(self, radix: u32) -> Self {
        self.option(options::RADIX, radix.to_string())
    }

    pub fn max_versions(self, max_versions: u32) -> Self {
        self.option(options::MAX_VERSIONS, max_versions.to_string())
    }

    pub fn ignore_visibility(self, ignore: bool) -> Self {
        self.option(options::IGNORE_VISIBILITY, ignore.to_string())
    }

    /// Check name and options by building the stage once.
    pub fn validate(&self) -> Result<(), IteratorError> {
        if self.name.trim().is_empty() {
            return Err(IteratorError::config(&self.name, "iterator name must not be empty"));
        }
        if self.name.contains(char::is_whitespace) {
            return Err(IteratorError::config(&self.name, "iterator name must not contain whitespace"));
        }
        Stage::from_setting(self).map(|_| ())
    }

    // ── typed option readers used by the stages ──

    pub(crate) fn bool_option(&self, key: &str) -> Result<Option<bool>, IteratorError> {
        match self.get(key) {
            None => Ok(None),
            Some(v) if v.eq_ignore_ascii_case("true") => Ok(Some(true)),
            Some(v) if v.eq_ignore_ascii_case("false") => Ok(Some(false)),
            Some(v) => Err(IteratorError::config(
                &self.name,
                format!("option '{}' must be true or false, got '{}'", key, v),
            )),
        }
    }

    pub(crate) fn i64_option(&self, key: &str) -> Result<Option<i64>, IteratorError> {
        self.get(key)
            .map(|v| {
                v.trim().parse::<i64>().map_err(|_| {
                    IteratorError::config(
                        &self.name,
                        format!("option '{}' must be an integer, got '{}'", key, v),
                    )
                })
            })
            .transpose()
    }

    pub(crate) fn u32_option(&self, key: &str) -> Result<Option<u32>, IteratorError> {
        self.get(key)
            .map(|v| {
                v.trim().parse::<u32>().map_err(|_| {
                    IteratorError::config(
                        &self.name,
                        format!("option '{}' must be a non-negative integer, got '{}'", key, v),
                    )
                })
            })
            .transpose()
    }
}

impl fmt::Display for IteratorSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (priority {}, {})", self.name, self.priority, self.kind)?;
        for (k, v) in &self.options {
            write!(f, " {}={}", k, v)?;
        }
        Ok(())
    }
}
