use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use strata_core::config::{Config, TableConfig};

use crate::error::TableError;
use crate::reader::TableFileReader;
use crate::table::Table;
use crate::writer::TableFileWriter;


/// Overall statistics for the table store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub table_count: usize,
    /// Total number of stored entries across all tables.
    pub entry_count: usize,
}

/// Named tables persisted under `data_dir/tables/<name>/`.
///
/// Tables live in memory; [`TableStore::flush`] writes one table's records,
/// iterators, constraints and metadata to its directory.
pub struct TableStore {
    tables_dir: PathBuf,
    compression_level: i32,
    defaults: TableConfig,
    tables: HashMap<String, Arc<Table>>,
}

impl TableStore {
    /// Open the store, loading every table directory found on disk.
    ///
    /// Directories that fail to load are skipped with a warning.
    pub fn open(config: &Config) -> Result<Self, TableError> {
        let tables_dir = config.storage.data_dir.join("tables");
        fs::create_dir_all(&tables_dir)?;

        let mut tables = HashMap::new();
        for entry in fs::read_dir(&tables_dir)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) if valid_name(name) => name.to_string(),
                _ => continue,
            };

            match load_table(&path, &name) {
                Ok(table) => {
                    debug!(table = %name, entries = table.len().unwrap_or(0), "Loaded table");
                    tables.insert(name, Arc::new(table));
                }
                Err(e) => {
                    warn!(table = %name, error = %e, "Failed to load table, skipping");
                }
            }
        }

        info!(
            tables = tables.len(),
            data_dir = %config.storage.data_dir.display(),
            "TableStore initialized"
        );

        Ok(Self {
            tables_dir,
            compression_level: config.storage.compression_level,
            defaults: config.table.clone(),
            tables,
        })
    }

    /// Create and persist an empty table with the default iterators.
    pub fn create(&mut self, name: &str) -> Result<Arc<Table>, TableError> {
        if !valid_name(name) {
            return Err(TableError::InvalidTableName(name.to_string()));
        }
        if self.tables.contains_key(name) {
            return Err(TableError::TableExists(name.to_string()));
        }

        let table = Arc::new(Table::with_defaults(name, &self.defaults)?);
        self.write_table(&table)?;
        self.tables.insert(name.to_string(), Arc::clone(&table));
        info!(table = %name, "Table created");
        Ok(table)
    }

    pub fn get(&self, name: &str) -> Result<Arc<Table>, TableError> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| TableError::TableNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Drop a table and remove its directory.
    pub fn delete(&mut self, name: &str) -> Result<(), TableError> {
        if self.tables.remove(name).is_none() {
            return Err(TableError::TableNotFound(name.to_string()));
        }
        let dir = self.table_dir(name);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        info!(table = %name, "Table deleted");
        Ok(())
    }

    /// Table names in sorted order.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }

    /// Write one table to disk.
    pub fn flush(&self, name: &str) -> Result<(), TableError> {
        let table = self.get(name)?;
        self.write_table(&table)
    }

    /// Write every table to disk.
    pub fn flush_all(&self) -> Result<(), TableError> {
        for table in self.tables.values() {
            self.write_table(table)?;
        }
        Ok(())
    }

    pub fn stats(&self) -> Result<StoreStats, TableError> {
        let mut entry_count = 0;
        for table in self.tables.values() {
            entry_count += table.len()?;
        }
        Ok(StoreStats {
            table_count: self.tables.len(),
            entry_count,
        })
    }

    fn table_dir(&self, name: &str) -> PathBuf {
        self.tables_dir.join(name)
    }

    fn write_table(&self, table: &Table) -> Result<(), TableError> {
        let iterators = table.iterators()?;
        let constraints = table.constraints()?;
        let (entries, sequence, last_timestamp) = table.export()?;

        let mut writer = TableFileWriter::new(&self.table_dir(table.name()), table.name(), self.compression_level)?;
        for entry in &entries {
            writer.append(entry)?;
        }
        writer.finalize(&iterators, &constraints, sequence, last_timestamp)?;
        Ok(())
    }
}

fn load_table(dir: &Path, name: &str) -> Result<Table, TableError> {
    let reader = TableFileReader::open(dir)?;
    let entries = reader.iter().collect::<Result<Vec<_>, _>>()?;
    let meta = reader.meta();
    if entries.len() != meta.entry_count {
        warn!(
            table = %name,
            expected = meta.entry_count,
            found = entries.len(),
            "Entry count differs from meta.json"
        );
    }
    Ok(Table::restore(
        name,
        entries,
        reader.iterators().clone(),
        reader.constraints().to_vec(),
        meta.sequence,
        meta.last_timestamp,
    ))
}

/// Table names are non-empty and use ASCII letters, digits and `_`.
pub fn valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
