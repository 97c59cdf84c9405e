use std::thread::sleep;
use std::time::Duration;

use strata_core::now_millis;
use strata_iterators::{IteratorScope, IteratorSetting, StageKind};
use strata_table::{CompactionKind, Mutation};

use crate::helpers::{open_store, scan_all, scan_values};

#[test]
fn test_age_off_filter() {
    let (mut store, data_dir) = open_store();
    let table = store.create("ageoff").unwrap();
    table
        .attach_iterator(IteratorSetting::with_default_name(10, StageKind::AgeOff).ttl(1000), &[])
        .unwrap();

    table.write(Mutation::new("foo").put("a", "b", "c")).unwrap();
    assert_eq!(scan_all(&table).len(), 1);

    sleep(Duration::from_millis(1100));
    assert!(scan_all(&table).is_empty());

    std::fs::remove_dir_all(&data_dir).ok();
}

#[test]
fn test_negated_age_off_keeps_only_old_records() {
    let (mut store, data_dir) = open_store();
    let table = store.create("negated").unwrap();
    table
        .attach_iterator(
            IteratorSetting::with_default_name(10, StageKind::AgeOff)
                .ttl(60_000)
                .negate(true),
            &[IteratorScope::Scan],
        )
        .unwrap();

    let now = now_millis();
    table.write(Mutation::new("old").put_at("f", "q", now - 120_000, "old")).unwrap();
    table.write(Mutation::new("new").put_at("f", "q", now, "new")).unwrap();
    assert_eq!(scan_values(&table), vec!["old"]);

    std::fs::remove_dir_all(&data_dir).ok();
}

#[test]
fn test_fixed_current_time() {
    let (mut store, data_dir) = open_store();
    let table = store.create("fixed").unwrap();
    table
        .attach_iterator(
            IteratorSetting::with_default_name(10, StageKind::AgeOff)
                .ttl(100)
                .current_time(1_000),
            &[],
        )
        .unwrap();

    for (row, ts) in [("a", 850), ("b", 900), ("c", 950), ("d", 1_500)] {
        table.write(Mutation::new(row).put_at("f", "q", ts, row)).unwrap();
    }
    // age = 1000 - ts; kept while age < 100, future timestamps included
    assert_eq!(scan_values(&table), vec!["c", "d"]);

    std::fs::remove_dir_all(&data_dir).ok();
}

#[test]
fn test_major_compaction_purges_expired_records() {
    let (mut store, data_dir) = open_store();
    let table = store.create("purge").unwrap();
    table
        .attach_iterator(
            IteratorSetting::with_default_name(10, StageKind::AgeOff).ttl(10_000),
            &[IteratorScope::Majc],
        )
        .unwrap();

    let now = now_millis();
    table.write(Mutation::new("stale").put_at("f", "q", now - 60_000, "x")).unwrap();
    table.write(Mutation::new("fresh").put("f", "q", "y")).unwrap();

    // scan has no age-off attached
    assert_eq!(scan_all(&table).len(), 2);

    let summary = table.compact(CompactionKind::Full).unwrap();
    assert_eq!(summary.entries_read, 2);
    assert_eq!(summary.entries_written, 1);
    assert_eq!(scan_values(&table), vec!["y"]);

    std::fs::remove_dir_all(&data_dir).ok();
}
