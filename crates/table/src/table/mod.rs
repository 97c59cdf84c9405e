use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::vec;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strata_core::config::TableConfig;
use strata_core::{now_millis, Key, Record, Value};
use strata_iterators::{IteratorScope, IteratorSetting, Pass, Pipeline};
use tracing::{debug, info, warn};

use crate::constraint::{check_all, Constraint, ConstraintViolation};
use crate::deletes::apply_deletes;
use crate::error::TableError;
use crate::iterator_config::IteratorConfig;
use crate::mutation::{ColumnUpdate, Mutation};
use crate::range::ScanRange;
use crate::writer::TableEntry;


/// Which compaction to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompactionKind {
    /// Runs the `minc` iterators and keeps deletion markers.
    Minor,
    /// Runs the `majc` iterators over everything and drops deletion markers.
    Full,
}

impl CompactionKind {
    pub fn scope(&self) -> IteratorScope {
        match self {
            CompactionKind::Minor => IteratorScope::Minc,
            CompactionKind::Full => IteratorScope::Majc,
        }
    }

    fn keeps_deletes(&self) -> bool {
        matches!(self, CompactionKind::Minor)
    }
}

/// Outcome of one compaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactionSummary {
    pub kind: CompactionKind,
    pub entries_read: usize,
    pub entries_written: usize,
}

/// Point-in-time statistics for a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableStats {
    pub name: String,
    pub entry_count: usize,
    pub delete_markers: usize,
    pub row_count: usize,
    pub iterator_count: usize,
    pub sequence: u64,
    pub last_write: Option<DateTime<Utc>>,
}

/// Storage order: key order, then newest write first for identical keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct EntryKey {
    key: Key,
    seq: Reverse<u64>,
}

impl EntryKey {
    /// Sorts before every entry of `row`.
    fn first_in_row(row: &str) -> Self {
        Self {
            key: Key::new(row, "", "", i64::MAX).into_delete(),
            seq: Reverse(u64::MAX),
        }
    }
}

#[derive(Debug, Default)]
struct TableData {
    entries: BTreeMap<EntryKey, Value>,
    /// Last write sequence handed out.
    sequence: u64,
    /// Last timestamp assigned by the table clock.
    last_timestamp: i64,
}

impl TableData {
    fn records_in(&self, range: &ScanRange) -> Vec<Record> {
        let lower = match &range.start_row {
            Some(row) => Bound::Included(EntryKey::first_in_row(row)),
            None => Bound::Unbounded,
        };
        self.entries
            .range((lower, Bound::Unbounded))
            .take_while(|(k, _)| range.before_end(&k.key.row))
            .filter(|(k, _)| range.fetches(&k.key))
            .map(|(k, v)| Record::new(k.key.clone(), v.clone()))
            .collect()
    }

    /// Millisecond clock that never runs backwards.
    fn next_timestamp(&mut self) -> i64 {
        self.last_timestamp = self.last_timestamp.max(now_millis());
        self.last_timestamp
    }
}

/// A sorted table of records with attached iterators.
///
/// Writers take the write lock briefly. Scans and compactions copy what they
/// need under the read lock and run their pipeline without holding any lock.
/// Compactions of one table run one at a time.
#[derive(Debug)]
pub struct Table {
    name: String,
    data: RwLock<TableData>,
    iterators: RwLock<IteratorConfig>,
    constraints: RwLock<Vec<Constraint>>,
    compaction: Mutex<()>,
}

impl Table {
    /// Create an empty table with no iterators attached.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_iterators(name, IteratorConfig::default())
    }

    /// Create an empty table with the configured default iterators and
    /// mutation size limit.
    pub fn with_defaults(name: impl Into<String>, defaults: &TableConfig) -> Result<Self, TableError> {
        let table = Self::with_iterators(name, IteratorConfig::for_new_table(defaults)?);
        if let Some(max_bytes) = defaults.max_mutation_bytes {
            table.add_constraint(Constraint::max_mutation_size(max_bytes))?;
        }
        Ok(table)
    }

    fn with_iterators(name: impl Into<String>, iterators: IteratorConfig) -> Self {
        Self {
            name: name.into(),
            data: RwLock::new(TableData::default()),
            iterators: RwLock::new(iterators),
            constraints: RwLock::new(Vec::new()),
            compaction: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ── Writes ──────────────────────────────────────────────────

    /// Apply a mutation. Updates without a timestamp share one assigned by
    /// the table clock.
    pub fn write(&self, mutation: Mutation) -> Result<(), TableError> {
        mutation.validate()?;
        self.check_constraints(std::slice::from_ref(&mutation))?;
        let mut data = self.write_data()?;
        apply(&mut data, mutation);
        Ok(())
    }

    /// Apply several mutations under one lock acquisition.
    ///
    /// Every mutation is validated and checked against the table's
    /// constraints before any is applied. One violation rejects the batch.
    pub fn write_batch(&self, mutations: Vec<Mutation>) -> Result<usize, TableError> {
        for mutation in &mutations {
            mutation.validate()?;
        }
        self.check_constraints(&mutations)?;
        let count = mutations.len();
        let mut data = self.write_data()?;
        for mutation in mutations {
            apply(&mut data, mutation);
        }
        debug!(table = %self.name, mutations = count, "Applied batch");
        Ok(count)
    }

    /// Write a deletion marker for every cell of `row` that holds a value.
    ///
    /// Markers carry the table clock's timestamp, so versions written with
    /// a later explicit timestamp stay visible. Returns the number of
    /// markers written.
    pub fn delete_row(&self, row: &str) -> Result<usize, TableError> {
        let constraints = self.read_constraints()?;
        let mut data = self.write_data()?;

        let cells: BTreeSet<(String, String, String)> = data
            .entries
            .range(EntryKey::first_in_row(row)..)
            .take_while(|(k, _)| k.key.row == row)
            .filter(|(k, _)| !k.key.deleted)
            .map(|(k, _)| {
                (
                    k.key.family.clone(),
                    k.key.qualifier.clone(),
                    k.key.visibility.clone(),
                )
            })
            .collect();
        if cells.is_empty() {
            return Ok(0);
        }

        let mutation = cells
            .into_iter()
            .fold(Mutation::new(row), |m, (family, qualifier, visibility)| {
                m.update(ColumnUpdate {
                    family,
                    qualifier,
                    visibility,
                    timestamp: None,
                    deleted: true,
                    value: Value::default(),
                })
            });
        let violations = check_all(&constraints, std::slice::from_ref(&mutation));
        if !violations.is_empty() {
            return Err(self.rejected(violations));
        }

        let markers = mutation.len();
        apply(&mut data, mutation);
        info!(table = %self.name, row = %row, markers, "Row deleted");
        Ok(markers)
    }

    fn check_constraints(&self, mutations: &[Mutation]) -> Result<(), TableError> {
        let violations = check_all(&self.read_constraints()?, mutations);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(self.rejected(violations))
        }
    }

    fn rejected(&self, violations: Vec<ConstraintViolation>) -> TableError {
        warn!(table = %self.name, violations = violations.len(), "Mutations rejected by constraints");
        TableError::ConstraintViolation {
            table: self.name.clone(),
            violations,
        }
    }

    // ── Reads ───────────────────────────────────────────────────

    /// Scan `range` through the `scan` iterators.
    ///
    /// The records are copied under the read lock, so writes that land after
    /// this call are not visible to the returned scanner.
    pub fn scan(&self, range: &ScanRange) -> Result<Scanner, TableError> {
        let pipeline = self.pipeline(IteratorScope::Scan)?;
        let snapshot = if range.is_inverted() {
            Vec::new()
        } else {
            self.read_data()?.records_in(range)
        };
        debug!(table = %self.name, records = snapshot.len(), stages = pipeline.len(), "Opened scan");

        let visible = apply_deletes(snapshot, false);
        Ok(Scanner {
            pass: pipeline.open(visible),
        })
    }

    // ── Compaction ──────────────────────────────────────────────

    /// Rewrite the table through the iterators of `kind`'s scope.
    ///
    /// The pipeline runs over a snapshot. Its output replaces the snapshot's
    /// entries, while entries written during the compaction are kept. A
    /// second compaction of the same table waits for the first to finish.
    pub fn compact(&self, kind: CompactionKind) -> Result<CompactionSummary, TableError> {
        let _running = self
            .compaction
            .lock()
            .map_err(|_| poisoned(&self.name, "compaction"))?;
        let pipeline = self.pipeline(kind.scope())?;

        let (snapshot, high_water) = {
            let data = self.read_data()?;
            (data.records_in(&ScanRange::all()), data.sequence)
        };
        let entries_read = snapshot.len();

        let input = apply_deletes(snapshot, kind.keeps_deletes());
        let output = pipeline.open(input).collect::<Result<Vec<Record>, _>>()?;
        let entries_written = output.len();

        {
            let mut data = self.write_data()?;
            data.entries.retain(|k, _| k.seq.0 > high_water);
            // Compacted entries take sequences below every concurrent write,
            // counting down so that duplicate keys keep their order.
            let count = output.len() as u64;
            for (idx, record) in output.into_iter().enumerate() {
                let entry_key = EntryKey {
                    key: record.key,
                    seq: Reverse(count - idx as u64),
                };
                data.entries.insert(entry_key, record.value);
            }
        }

        info!(
            table = %self.name,
            kind = ?kind,
            entries_read,
            entries_written,
            "Compaction finished"
        );
        Ok(CompactionSummary {
            kind,
            entries_read,
            entries_written,
        })
    }

    // ── Iterators ───────────────────────────────────────────────

    /// Attach an iterator to `scopes` (every scope when empty).
    pub fn attach_iterator(&self, setting: IteratorSetting, scopes: &[IteratorScope]) -> Result<(), TableError> {
        let name = setting.name.clone();
        self.write_iterators()?.attach(setting, scopes)?;
        info!(table = %self.name, iterator = %name, "Iterator attached");
        Ok(())
    }

    /// Remove the iterator called `name` from `scopes` (every scope when empty).
    pub fn remove_iterator(&self, name: &str, scopes: &[IteratorScope]) -> Result<(), TableError> {
        self.write_iterators()?.remove(name, scopes)?;
        info!(table = %self.name, iterator = %name, "Iterator removed");
        Ok(())
    }

    /// Every attached iterator, ordered by scope then priority.
    pub fn list_iterators(&self) -> Result<Vec<(IteratorScope, IteratorSetting)>, TableError> {
        Ok(self.read_iterators()?.list())
    }

    /// A copy of the iterator configuration.
    pub fn iterators(&self) -> Result<IteratorConfig, TableError> {
        Ok(self.read_iterators()?.clone())
    }

    fn pipeline(&self, scope: IteratorScope) -> Result<Pipeline, TableError> {
        Ok(self.read_iterators()?.pipeline(scope)?)
    }

    // ── Constraints ─────────────────────────────────────────────

    /// Add a write constraint. Each kind of constraint can be set once.
    pub fn add_constraint(&self, constraint: Constraint) -> Result<(), TableError> {
        let mut constraints = self.write_constraints()?;
        if constraints.iter().any(|c| c.name() == constraint.name()) {
            return Err(TableError::ConstraintExists(constraint.name().to_string()));
        }
        info!(table = %self.name, constraint = %constraint, "Constraint added");
        constraints.push(constraint);
        Ok(())
    }

    pub fn remove_constraint(&self, name: &str) -> Result<(), TableError> {
        let mut constraints = self.write_constraints()?;
        let before = constraints.len();
        constraints.retain(|c| c.name() != name);
        if constraints.len() == before {
            return Err(TableError::ConstraintNotFound(name.to_string()));
        }
        info!(table = %self.name, constraint = %name, "Constraint removed");
        Ok(())
    }

    pub fn constraints(&self) -> Result<Vec<Constraint>, TableError> {
        Ok(self.read_constraints()?.clone())
    }

    // ── Stats ───────────────────────────────────────────────────

    pub fn stats(&self) -> Result<TableStats, TableError> {
        let iterator_count = self.read_iterators()?.len();
        let data = self.read_data()?;

        let mut row_count = 0;
        let mut last_row: Option<&str> = None;
        let mut delete_markers = 0;
        for entry in data.entries.keys() {
            if last_row != Some(entry.key.row.as_str()) {
                row_count += 1;
                last_row = Some(entry.key.row.as_str());
            }
            if entry.key.deleted {
                delete_markers += 1;
            }
        }

        Ok(TableStats {
            name: self.name.clone(),
            entry_count: data.entries.len(),
            delete_markers,
            row_count,
            iterator_count,
            sequence: data.sequence,
            last_write: DateTime::from_timestamp_millis(data.last_timestamp)
                .filter(|_| data.last_timestamp > 0),
        })
    }

    pub fn len(&self) -> Result<usize, TableError> {
        Ok(self.read_data()?.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool, TableError> {
        Ok(self.len()? == 0)
    }

    // ── Persistence hooks ───────────────────────────────────────

    /// Copy out every stored entry with the clock state, for flushing.
    pub(crate) fn export(&self) -> Result<(Vec<TableEntry>, u64, i64), TableError> {
        let data = self.read_data()?;
        let entries = data
            .entries
            .iter()
            .map(|(k, v)| TableEntry {
                key: k.key.clone(),
                seq: k.seq.0,
                value: v.clone(),
            })
            .collect();
        Ok((entries, data.sequence, data.last_timestamp))
    }

    /// Rebuild a table from flushed entries.
    pub(crate) fn restore(
        name: impl Into<String>,
        entries: Vec<TableEntry>,
        iterators: IteratorConfig,
        constraints: Vec<Constraint>,
        sequence: u64,
        last_timestamp: i64,
    ) -> Self {
        let mut data = TableData {
            entries: BTreeMap::new(),
            sequence,
            last_timestamp,
        };
        for entry in entries {
            data.sequence = data.sequence.max(entry.seq);
            data.entries.insert(
                EntryKey {
                    key: entry.key,
                    seq: Reverse(entry.seq),
                },
                entry.value,
            );
        }
        data.sequence = data.sequence.max(data.entries.len() as u64);

        Self {
            name: name.into(),
            data: RwLock::new(data),
            iterators: RwLock::new(iterators),
            constraints: RwLock::new(constraints),
            compaction: Mutex::new(()),
        }
    }

    // ── Locks ───────────────────────────────────────────────────

    fn read_data(&self) -> Result<RwLockReadGuard<'_, TableData>, TableError> {
        self.data.read().map_err(|_| poisoned(&self.name, "records"))
    }

    fn write_data(&self) -> Result<RwLockWriteGuard<'_, TableData>, TableError> {
        self.data.write().map_err(|_| poisoned(&self.name, "records"))
    }

    fn read_iterators(&self) -> Result<RwLockReadGuard<'_, IteratorConfig>, TableError> {
        self.iterators.read().map_err(|_| poisoned(&self.name, "iterators"))
    }

    fn write_iterators(&self) -> Result<RwLockWriteGuard<'_, IteratorConfig>, TableError> {
        self.iterators.write().map_err(|_| poisoned(&self.name, "iterators"))
    }

    fn read_constraints(&self) -> Result<RwLockReadGuard<'_, Vec<Constraint>>, TableError> {
        self.constraints.read().map_err(|_| poisoned(&self.name, "constraints"))
    }

    fn write_constraints(&self) -> Result<RwLockWriteGuard<'_, Vec<Constraint>>, TableError> {
        self.constraints.write().map_err(|_| poisoned(&self.name, "constraints"))
    }
}

fn apply(data: &mut TableData, mutation: Mutation) {
    let timestamp = data.next_timestamp();
    let (row, updates) = mutation.into_parts();
    for update in updates {
        let ts = update.timestamp.unwrap_or(timestamp);
        data.sequence += 1;

        let mut key = Key::new(row.clone(), update.family, update.qualifier, ts)
            .with_visibility(update.visibility);
        key.deleted = update.deleted;
        data.entries.insert(
            EntryKey {
                key,
                seq: Reverse(data.sequence),
            },
            update.value,
        );
    }
}

fn poisoned(table: &str, what: &str) -> TableError {
    TableError::Poisoned(format!("{} lock of table '{}'", what, table))
}

/// Records of one scan, in key order.
pub struct Scanner {
    pass: Pass<vec::IntoIter<Record>>,
}

impl Scanner {
    /// Drain the scanner, stopping at the first decode error.
    pub fn into_records(self) -> Result<Vec<Record>, TableError> {
        self.collect()
    }

    /// Number of records returned so far.
    pub fn emitted(&self) -> u64 {
        self.pass.emitted()
    }

    pub fn close(self) {
        self.pass.close();
    }
}

impl Iterator for Scanner {
    type Item = Result<Record, TableError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.pass.next().map(|r| r.map_err(TableError::from))
    }
}
