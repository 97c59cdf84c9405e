use std::sync::Arc;
use std::thread;

use strata_iterators::{IteratorSetting, LongEncoding, StageKind};
use strata_table::{CompactionKind, Mutation, ScanRange};

use crate::helpers::{open_store, scan_values};

#[test]
fn test_scans_run_while_writing() {
    let (mut store, data_dir) = open_store();
    let table = store.create("busy").unwrap();
    table
        .attach_iterator(
            IteratorSetting::with_default_name(10, StageKind::SummingCombiner)
                .combine_all_columns(true)
                .encoding(LongEncoding::String),
            &[],
        )
        .unwrap();

    let writers: Vec<_> = (0..4)
        .map(|_| {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                for _ in 0..250 {
                    table.write(Mutation::new("counter").put("n", "", "1")).unwrap();
                }
            })
        })
        .collect();

    let reader = {
        let table = Arc::clone(&table);
        thread::spawn(move || {
            let mut last = 0i64;
            for _ in 0..50 {
                let values: Vec<i64> = table
                    .scan(&ScanRange::all())
                    .unwrap()
                    .map(|r| r.unwrap().value.to_string().parse().unwrap())
                    .collect();
                if let Some(total) = values.first() {
                    assert!(*total >= last, "sum went backwards: {total} < {last}");
                    last = *total;
                }
            }
        })
    };

    for handle in writers {
        handle.join().unwrap();
    }
    reader.join().unwrap();

    assert_eq!(scan_values(&table), vec!["1000"]);
    std::fs::remove_dir_all(&data_dir).ok();
}

#[test]
fn test_compaction_keeps_concurrent_writes() {
    let (mut store, data_dir) = open_store();
    let table = store.create("compacting").unwrap();
    table
        .attach_iterator(
            IteratorSetting::with_default_name(10, StageKind::SummingCombiner)
                .combine_all_columns(true)
                .encoding(LongEncoding::String),
            &[],
        )
        .unwrap();

    let writer = {
        let table = Arc::clone(&table);
        thread::spawn(move || {
            for _ in 0..500 {
                table.write(Mutation::new("counter").put("n", "", "2")).unwrap();
            }
        })
    };
    let compactor = {
        let table = Arc::clone(&table);
        thread::spawn(move || {
            for i in 0..40 {
                let kind = if i % 2 == 0 { CompactionKind::Minor } else { CompactionKind::Full };
                table.compact(kind).unwrap();
            }
        })
    };

    writer.join().unwrap();
    compactor.join().unwrap();

    assert_eq!(scan_values(&table), vec!["1000"]);
    table.compact(CompactionKind::Full).unwrap();
    assert_eq!(table.len().unwrap(), 1);
    assert_eq!(scan_values(&table), vec!["1000"]);
    std::fs::remove_dir_all(&data_dir).ok();
}
