use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strata_core::config::TableConfig;
use strata_iterators::{IteratorError, IteratorScope, IteratorSetting, Pipeline, StageKind};
use tracing::debug;

use crate::error::TableError;

/// Name of the versioning stage attached to new tables.
pub const DEFAULT_VERSIONING_NAME: &str = "vers";
/// Priority of the versioning stage attached to new tables.
pub const DEFAULT_VERSIONING_PRIORITY: u32 = 20;

/// Iterator settings attached to a table, per scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IteratorConfig {
    scopes: BTreeMap<IteratorScope, BTreeMap<String, IteratorSetting>>,
}

impl IteratorConfig {
    /// Configuration for a new table: the versioning stage in every scope
    /// when `defaults.versioning` is set, nothing otherwise.
    pub fn for_new_table(defaults: &TableConfig) -> Result<Self, TableError> {
        let mut config = Self::default();
        if defaults.versioning {
            let setting = IteratorSetting::new(
                DEFAULT_VERSIONING_PRIORITY,
                DEFAULT_VERSIONING_NAME,
                StageKind::Versioning,
            )
            .max_versions(defaults.max_versions);
            config.attach(setting, &IteratorScope::ALL)?;
        }
        Ok(config)
    }

    /// Attach `setting` to `scopes`, or to every scope when `scopes` is empty.
    ///
    /// Nothing is attached unless the setting validates and neither its name
    /// nor its priority is taken in any targeted scope.
    pub fn attach(&mut self, setting: IteratorSetting, scopes: &[IteratorScope]) -> Result<(), TableError> {
        let scopes = targeted(scopes);
        setting.validate()?;

        for scope in scopes {
            let Some(attached) = self.scopes.get(scope) else {
                continue;
            };
            if attached.contains_key(&setting.name) {
                return Err(TableError::IteratorExists {
                    name: setting.name.clone(),
                    scope: *scope,
                });
            }
            if let Some(existing) = attached.values().find(|s| s.priority == setting.priority) {
                return Err(TableError::PriorityConflict {
                    priority: setting.priority,
                    scope: *scope,
                    existing: existing.name.clone(),
                });
            }
        }

        for scope in scopes {
            debug!(iterator = %setting.name, priority = setting.priority, scope = %scope, "Attached iterator");
            self.scopes
                .entry(*scope)
                .or_default()
                .insert(setting.name.clone(), setting.clone());
        }
        Ok(())
    }

    /// Remove the iterator called `name` from `scopes` (every scope when empty).
    pub fn remove(&mut self, name: &str, scopes: &[IteratorScope]) -> Result<(), TableError> {
        let mut removed = false;
        for scope in targeted(scopes) {
            if let Some(attached) = self.scopes.get_mut(scope) {
                removed |= attached.remove(name).is_some();
                if attached.is_empty() {
                    self.scopes.remove(scope);
                }
            }
        }
        if removed {
            debug!(iterator = %name, "Removed iterator");
            Ok(())
        } else {
            Err(TableError::IteratorNotFound(name.to_string()))
        }
    }

    pub fn get(&self, scope: IteratorScope, name: &str) -> Option<&IteratorSetting> {
        self.scopes.get(&scope).and_then(|attached| attached.get(name))
    }

    /// Settings of one scope in priority order.
    pub fn settings(&self, scope: IteratorScope) -> Vec<IteratorSetting> {
        let mut settings: Vec<IteratorSetting> = self
            .scopes
            .get(&scope)
            .map(|attached| attached.values().cloned().collect())
            .unwrap_or_default();
        settings.sort_by_key(|s| s.priority);
        settings
    }

    /// Every attachment, ordered by scope then priority.
    pub fn list(&self) -> Vec<(IteratorScope, IteratorSetting)> {
        IteratorScope::ALL
            .iter()
            .flat_map(|scope| self.settings(*scope).into_iter().map(move |s| (*scope, s)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.scopes.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build the pipeline that runs for `scope`.
    pub fn pipeline(&self, scope: IteratorScope) -> Result<Pipeline, IteratorError> {
        Pipeline::new(self.settings(scope))
    }
}

fn targeted(scopes: &[IteratorScope]) -> &[IteratorScope] {
    if scopes.is_empty() {
        &IteratorScope::ALL
    } else {
        scopes
    }
}
