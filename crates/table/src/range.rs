use strata_core::{Column, Key};

/// Row range and column selection for a scan. Bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanRange {
    /// First row returned, or the start of the table.
    pub start_row: Option<String>,
    /// Last row returned, or the end of the table.
    pub end_row: Option<String>,
    /// Columns to fetch. Empty fetches every column.
    pub columns: Vec<Column>,
}

impl ScanRange {
    /// A range that covers the whole table.
    pub fn all() -> Self {
        Self::default()
    }

    /// A range that covers a single row.
    pub fn exact_row(row: impl Into<String>) -> Self {
        let row = row.into();
        Self {
            start_row: Some(row.clone()),
            end_row: Some(row),
            columns: Vec::new(),
        }
    }

    /// A range from `start` to `end` (inclusive).
    pub fn rows(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start_row: Some(start.into()),
            end_row: Some(end.into()),
            columns: Vec::new(),
        }
    }

    pub fn start_row(mut self, row: impl Into<String>) -> Self {
        self.start_row = Some(row.into());
        self
    }

    pub fn end_row(mut self, row: impl Into<String>) -> Self {
        self.end_row = Some(row.into());
        self
    }

    /// Restrict the scan to a column family or a family/qualifier pair.
    pub fn fetch_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// True when `start_row` sorts after `end_row`.
    pub fn is_inverted(&self) -> bool {
        matches!((&self.start_row, &self.end_row), (Some(s), Some(e)) if s > e)
    }

    /// Row is at or after the start bound.
    pub(crate) fn after_start(&self, row: &str) -> bool {
        self.start_row.as_deref().map_or(true, |start| row >= start)
    }

    /// Row is at or before the end bound.
    pub(crate) fn before_end(&self, row: &str) -> bool {
        self.end_row.as_deref().map_or(true, |end| row <= end)
    }

    /// Test if a key is inside the row range and fetched columns.
    pub fn contains(&self, key: &Key) -> bool {
        self.after_start(&key.row) && self.before_end(&key.row) && self.fetches(key)
    }

    pub(crate) fn fetches(&self, key: &Key) -> bool {
        self.columns.is_empty() || self.columns.iter().any(|c| c.matches(key))
    }
}
