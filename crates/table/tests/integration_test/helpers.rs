use std::path::PathBuf;

use uuid::Uuid;

use strata_core::config::Config;
use strata_core::Record;
use strata_table::{ScanRange, Table, TableStore};

/// Create a unique temp directory for each test.
pub fn test_data_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("strata-test-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Create a test configuration with given data directory.
pub fn make_config(data_dir: PathBuf) -> Config {
    Config::with_data_dir(data_dir)
}

/// Open a store in a fresh temp directory.
pub fn open_store() -> (TableStore, PathBuf) {
    let data_dir = test_data_dir();
    let store = TableStore::open(&make_config(data_dir.clone())).unwrap();
    (store, data_dir)
}

/// Scan the whole table, panicking on pass errors.
pub fn scan_all(table: &Table) -> Vec<Record> {
    table.scan(&ScanRange::all()).unwrap().into_records().unwrap()
}

/// Values of a full scan, rendered as text.
pub fn scan_values(table: &Table) -> Vec<String> {
    scan_all(table).into_iter().map(|r| r.value.to_string()).collect()
}
