use strata_core::Key;
use strata_iterators::{IteratorScope, IteratorSetting, LongEncoding, StageKind};
use strata_table::{CompactionKind, Mutation, ScanRange, TableStore};

use crate::helpers::{make_config, scan_all, scan_values, test_data_dir};

#[test]
fn test_tables_reopen_identically() {
    let data_dir = test_data_dir();
    let config = make_config(data_dir.clone());

    let (records, iterators) = {
        let mut store = TableStore::open(&config).unwrap();
        let table = store.create("events").unwrap();
        table
            .attach_iterator(
                IteratorSetting::with_default_name(10, StageKind::SummingCombiner)
                    .combine_all_columns(true)
                    .encoding(LongEncoding::String),
                &[IteratorScope::Scan, IteratorScope::Majc],
            )
            .unwrap();

        for (row, value) in [("a", "1"), ("a", "2"), ("b", "7"), ("c", "3")] {
            table.write(Mutation::new(row).put("hits", "", value)).unwrap();
        }
        table.write(Mutation::new("c").delete("hits", "")).unwrap();
        store.flush_all().unwrap();

        (scan_all(&table), table.list_iterators().unwrap())
    };

    let store = TableStore::open(&config).unwrap();
    assert_eq!(store.list(), vec!["events"]);
    let table = store.get("events").unwrap();
    assert_eq!(scan_all(&table), records);
    assert_eq!(table.list_iterators().unwrap(), iterators);
    assert_eq!(scan_values(&table), vec!["3", "7"]);

    std::fs::remove_dir_all(&data_dir).ok();
}

#[test]
fn test_unflushed_writes_are_lost() {
    let data_dir = test_data_dir();
    let config = make_config(data_dir.clone());
    {
        let mut store = TableStore::open(&config).unwrap();
        let table = store.create("t").unwrap();
        table.write(Mutation::new("r").put("f", "q", "1")).unwrap();
    }

    let store = TableStore::open(&config).unwrap();
    assert!(store.get("t").unwrap().is_empty().unwrap());
    std::fs::remove_dir_all(&data_dir).ok();
}

#[test]
fn test_minor_compaction_markers_survive_reopen() {
    let data_dir = test_data_dir();
    let config = make_config(data_dir.clone());
    {
        let mut store = TableStore::open(&config).unwrap();
        let table = store.create("t").unwrap();
        table.write(Mutation::new("r").put_at("f", "q", 1, "x")).unwrap();
        table.write(Mutation::new("r").delete_at("f", "q", 3)).unwrap();
        table.compact(CompactionKind::Minor).unwrap();
        store.flush("t").unwrap();
    }

    let store = TableStore::open(&config).unwrap();
    let table = store.get("t").unwrap();
    let stats = table.stats().unwrap();
    assert_eq!(stats.entry_count, 1);
    assert_eq!(stats.delete_markers, 1);

    // a put older than the marker stays hidden
    table.write(Mutation::new("r").put_at("f", "q", 2, "late")).unwrap();
    assert!(scan_all(&table).is_empty());

    table.compact(CompactionKind::Full).unwrap();
    assert_eq!(table.len().unwrap(), 0);
    std::fs::remove_dir_all(&data_dir).ok();
}

#[test]
fn test_deleted_table_does_not_reappear() {
    let data_dir = test_data_dir();
    let config = make_config(data_dir.clone());
    {
        let mut store = TableStore::open(&config).unwrap();
        store.create("keep").unwrap();
        store.create("drop").unwrap();
        store.delete("drop").unwrap();
    }

    let store = TableStore::open(&config).unwrap();
    assert_eq!(store.list(), vec!["keep"]);
    std::fs::remove_dir_all(&data_dir).ok();
}

#[test]
fn test_range_scan_after_reopen() {
    let data_dir = test_data_dir();
    let config = make_config(data_dir.clone());
    {
        let mut store = TableStore::open(&config).unwrap();
        let table = store.create("rows").unwrap();
        for i in 0..20 {
            table
                .write(Mutation::new(format!("row{i:02}")).put("f", "q", i.to_string()))
                .unwrap();
        }
        store.flush("rows").unwrap();
    }

    let store = TableStore::open(&config).unwrap();
    let table = store.get("rows").unwrap();
    let keys: Vec<Key> = table
        .scan(&ScanRange::rows("row05", "row07"))
        .unwrap()
        .map(|r| r.unwrap().key)
        .collect();
    let rows: Vec<&str> = keys.iter().map(|k| k.row.as_str()).collect();
    assert_eq!(rows, vec!["row05", "row06", "row07"]);
    std::fs::remove_dir_all(&data_dir).ok();
}
