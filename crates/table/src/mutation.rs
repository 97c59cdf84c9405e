use strata_core::Value;

use crate::error::TableError;

/// One column change inside a [`Mutation`].
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnUpdate {
    pub family: String,
    pub qualifier: String,
    pub visibility: String,
    /// Explicit timestamp; the table assigns one when absent.
    pub timestamp: Option<i64>,
    pub deleted: bool,
    pub value: Value,
}

/// A batch of puts and deletes against a single row, applied atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    row: String,
    updates: Vec<ColumnUpdate>,
}

impl Mutation {
    pub fn new(row: impl Into<String>) -> Self {
        Self {
            row: row.into(),
            updates: Vec::new(),
        }
    }

    pub fn row(&self) -> &str {
        &self.row
    }

    pub fn updates(&self) -> &[ColumnUpdate] {
        &self.updates
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Approximate encoded size: the row plus, per update, its column,
    /// visibility and value bytes, 8 timestamp bytes and a delete flag.
    pub fn size_bytes(&self) -> usize {
        self.row.len()
            + self
                .updates
                .iter()
                .map(|u| u.family.len() + u.qualifier.len() + u.visibility.len() + u.value.len() + 9)
                .sum::<usize>()
    }

    /// Add a put stamped by the table at write time.
    pub fn put(
        self,
        family: impl Into<String>,
        qualifier: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.push(family, qualifier, "", None, false, value.into())
    }

    /// Add a put with an explicit timestamp.
    pub fn put_at(
        self,
        family: impl Into<String>,
        qualifier: impl Into<String>,
        timestamp: i64,
        value: impl Into<Value>,
    ) -> Self {
        self.push(family, qualifier, "", Some(timestamp), false, value.into())
    }

    /// Add a put carrying a visibility label.
    pub fn put_visible(
        self,
        family: impl Into<String>,
        qualifier: impl Into<String>,
        visibility: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.push(family, qualifier, visibility, None, false, value.into())
    }

    /// Add a deletion marker hiding every version at or before write time.
    pub fn delete(self, family: impl Into<String>, qualifier: impl Into<String>) -> Self {
        self.push(family, qualifier, "", None, true, Value::default())
    }

    /// Add a deletion marker hiding versions at or before `timestamp`.
    pub fn delete_at(
        self,
        family: impl Into<String>,
        qualifier: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        self.push(family, qualifier, "", Some(timestamp), true, Value::default())
    }

    /// Add a fully specified update.
    pub fn update(mut self, update: ColumnUpdate) -> Self {
        self.updates.push(update);
        self
    }

    fn push(
        mut self,
        family: impl Into<String>,
        qualifier: impl Into<String>,
        visibility: impl Into<String>,
        timestamp: Option<i64>,
        deleted: bool,
        value: Value,
    ) -> Self {
        self.updates.push(ColumnUpdate {
            family: family.into(),
            qualifier: qualifier.into(),
            visibility: visibility.into(),
            timestamp,
            deleted,
            value,
        });
        self
    }

    pub(crate) fn validate(&self) -> Result<(), TableError> {
        if self.row.is_empty() {
            return Err(TableError::InvalidMutation("row must not be empty".into()));
        }
        if self.updates.is_empty() {
            return Err(TableError::InvalidMutation(format!(
                "mutation for row '{}' has no updates",
                self.row
            )));
        }
        if let Some(update) = self.updates.iter().find(|u| u.deleted && !u.value.is_empty()) {
            return Err(TableError::InvalidMutation(format!(
                "delete of {}:{} carries a value",
                update.family, update.qualifier
            )));
        }
        Ok(())
    }

    pub(crate) fn into_parts(self) -> (String, Vec<ColumnUpdate>) {
        (self.row, self.updates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_updates() {
        let m = Mutation::new("foo")
            .put("a", "b", "1")
            .put_at("a", "c", 7, "2")
            .delete("a", "d");
        assert_eq!(m.row(), "foo");
        assert_eq!(m.len(), 3);
        assert_eq!(m.updates()[1].timestamp, Some(7));
        assert!(m.updates()[2].deleted);
        assert!(m.validate().is_ok());
    }

    #[test]
    fn test_size_bytes() {
        assert_eq!(Mutation::new("row").size_bytes(), 3);
        let m = Mutation::new("row").put("fam", "q", "value").delete("f", "");
        assert_eq!(m.size_bytes(), 3 + (3 + 1 + 5 + 9) + (1 + 9));
    }

    #[test]
    fn test_empty_mutations_rejected() {
        assert!(Mutation::new("").put("a", "b", "1").validate().is_err());
        assert!(Mutation::new("foo").validate().is_err());
    }

    #[test]
    fn test_delete_with_value_rejected() {
        let m = Mutation::new("foo").update(ColumnUpdate {
            family: "a".into(),
            qualifier: "b".into(),
            visibility: String::new(),
            timestamp: None,
            deleted: true,
            value: Value::from("x"),
        });
        assert!(matches!(m.validate(), Err(TableError::InvalidMutation(_))));
    }
}
