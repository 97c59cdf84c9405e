//! Column selection for combiners.

use std::collections::HashSet;

use strata_core::{Column, Key};

use crate::error::IteratorError;
use crate::setting::{options, IteratorSetting};

/// Which records a combiner folds. Resolved once when the stage is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnPolicy {
    AllColumns,
    ExplicitColumns(ColumnSet),
}

/// Families (any qualifier) and exact family/qualifier pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSet {
    families: HashSet<String>,
    columns: HashSet<(String, String)>,
}

impl ColumnSet {
    pub fn insert(&mut self, column: Column) {
        match column.qualifier {
            Some(q) => {
                self.columns.insert((column.family, q));
            }
            None => {
                self.families.insert(column.family);
            }
        }
    }

    pub fn contains(&self, key: &Key) -> bool {
        if self.families.contains(&key.family) {
            return true;
        }
        // Avoid allocating a tuple per record when no exact columns are set.
        !self.columns.is_empty()
            && self
                .columns
                .contains(&(key.family.clone(), key.qualifier.clone()))
    }

    pub fn len(&self) -> usize {
        self.families.len() + self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<Column> for ColumnSet {
    fn from_iter<T: IntoIterator<Item = Column>>(iter: T) -> Self {
        let mut set = ColumnSet::default();
        for column in iter {
            set.insert(column);
        }
        set
    }
}

impl ColumnPolicy {
    /// Read `all` (or `combineAllColumns`) and `columns` from a setting.
    ///
    /// `all=true` wins over any column list; otherwise at least one column
    /// must be named.
    pub fn from_setting(setting: &IteratorSetting) -> Result<Self, IteratorError> {
        let all = match setting.bool_option(options::ALL_COLUMNS)? {
            Some(v) => v,
            None => setting.bool_option(options::ALL_COLUMNS_ALIAS)?.unwrap_or(false),
        };
        if all {
            return Ok(ColumnPolicy::AllColumns);
        }

        let raw = setting.get(options::COLUMNS).unwrap_or("").trim();
        if raw.is_empty() {
            return Err(IteratorError::config(
                &setting.name,
                "columns must be set when 'all' is not true",
            ));
        }

        let columns = raw
            .split(',')
            .map(|c| Column::parse(c.trim()))
            .collect::<Result<ColumnSet, _>>()
            .map_err(|e| IteratorError::config(&setting.name, e.to_string()))?;

        Ok(ColumnPolicy::ExplicitColumns(columns))
    }

    pub fn applies_to(&self, key: &Key) -> bool {
        match self {
            ColumnPolicy::AllColumns => true,
            ColumnPolicy::ExplicitColumns(set) => set.contains(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setting::StageKind;

    fn setting() -> IteratorSetting {
        IteratorSetting::new(10, "sum", StageKind::SummingCombiner)
    }

    #[test]
    fn test_all_columns() {
        let policy = ColumnPolicy::from_setting(&setting().combine_all_columns(true)).unwrap();
        assert_eq!(policy, ColumnPolicy::AllColumns);
        assert!(policy.applies_to(&Key::new("r", "anything", "q", 1)));
    }

    #[test]
    fn test_alias_option() {
        let policy =
            ColumnPolicy::from_setting(&setting().option("combineAllColumns", "true")).unwrap();
        assert_eq!(policy, ColumnPolicy::AllColumns);
    }

    #[test]
    fn test_all_wins_over_columns() {
        let s = setting()
            .option("columns", "count")
            .option("all", "true");
        assert_eq!(ColumnPolicy::from_setting(&s).unwrap(), ColumnPolicy::AllColumns);
    }

    #[test]
    fn test_explicit_columns() {
        let policy =
            ColumnPolicy::from_setting(&setting().option("columns", "count, stat:hits")).unwrap();
        assert!(policy.applies_to(&Key::new("r", "count", "word", 1)));
        assert!(policy.applies_to(&Key::new("r", "stat", "hits", 1)));
        assert!(!policy.applies_to(&Key::new("r", "stat", "misses", 1)));
        assert!(!policy.applies_to(&Key::new("r", "other", "hits", 1)));
    }

    #[test]
    fn test_missing_columns_is_config_error() {
        let err = ColumnPolicy::from_setting(&setting()).unwrap_err();
        assert!(matches!(err, IteratorError::Configuration { .. }));
        assert!(ColumnPolicy::from_setting(&setting().option("all", "false")).is_err());
    }

    #[test]
    fn test_bad_column_is_config_error() {
        assert!(ColumnPolicy::from_setting(&setting().option("columns", "a:b:c")).is_err());
        assert!(ColumnPolicy::from_setting(&setting().option("columns", "a,,b")).is_err());
    }
}
