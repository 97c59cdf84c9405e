use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use strata_iterators::{IteratorScope, IteratorSetting, StageKind};
use strata_table::{ColumnUpdate, Mutation};

/// A YAML pipeline definition:
///
/// ```yaml
/// iterators:
///   - name: stats
///     priority: 10
///     kind: StatsCombiner
///     scopes: [scan, majc]
///     options:
///       all: true
///       radix: 16
/// ```
#[derive(Debug, Deserialize)]
pub struct PipelineFile {
    pub iterators: Vec<AttachSpec>,
}

#[derive(Debug, Deserialize)]
pub struct AttachSpec {
    /// Defaults to the kind's own name (`ageoff`, `sum`, `stats`, `vers`).
    #[serde(default)]
    pub name: Option<String>,
    pub priority: u32,
    pub kind: String,
    /// Empty means every scope.
    #[serde(default)]
    pub scopes: Vec<IteratorScope>,
    #[serde(default)]
    pub options: BTreeMap<String, serde_yaml::Value>,
}

impl AttachSpec {
    pub fn to_setting(&self) -> Result<IteratorSetting> {
        let kind: StageKind = self.kind.parse().map_err(anyhow::Error::msg)?;
        let mut setting = match &self.name {
            Some(name) => IteratorSetting::new(self.priority, name.clone(), kind),
            None => IteratorSetting::with_default_name(self.priority, kind),
        };
        for (key, value) in &self.options {
            let text = match value {
                serde_yaml::Value::String(s) => s.clone(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                serde_yaml::Value::Number(n) => n.to_string(),
                other => bail!("option '{}' of '{}' must be a scalar, got {:?}", key, setting.name, other),
            };
            setting.set_option(key.clone(), text);
        }
        Ok(setting)
    }
}

pub fn read_pipeline(path: &Path) -> Result<PipelineFile> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    parse_pipeline(&text).with_context(|| format!("invalid pipeline file {}", path.display()))
}

pub fn parse_pipeline(text: &str) -> Result<PipelineFile> {
    Ok(serde_yaml::from_str(text)?)
}

/// One line of a records file.
#[derive(Debug, Deserialize)]
pub struct RecordLine {
    pub row: String,
    #[serde(default)]
    pub family: String,
    #[serde(default)]
    pub qualifier: String,
    #[serde(default)]
    pub visibility: String,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub delete: bool,
}

impl RecordLine {
    pub fn into_mutation(self) -> Mutation {
        Mutation::new(self.row).update(ColumnUpdate {
            family: self.family,
            qualifier: self.qualifier,
            visibility: self.visibility,
            timestamp: self.timestamp,
            deleted: self.delete,
            value: self.value.into(),
        })
    }
}

pub fn read_records(path: &Path) -> Result<Vec<Mutation>> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    parse_records(&text).with_context(|| format!("invalid records file {}", path.display()))
}

/// Parse JSON lines, skipping blank lines and `#` comments.
pub fn parse_records(text: &str) -> Result<Vec<Mutation>> {
    let mut mutations = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let record: RecordLine =
            serde_json::from_str(line).with_context(|| format!("line {}: not a record", idx + 1))?;
        mutations.push(record.into_mutation());
    }
    Ok(mutations)
}
