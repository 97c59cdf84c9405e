use strata_core::Column;
use strata_iterators::{IteratorScope, IteratorSetting, LongEncoding, StageKind};
use strata_table::{CompactionKind, Mutation, ScanRange};

use crate::helpers::{open_store, scan_all, scan_values};

#[test]
fn test_stats_combiner() {
    let (mut store, data_dir) = open_store();
    let table = store.create("stats").unwrap();

    let setting = IteratorSetting::with_default_name(10, StageKind::StatsCombiner)
        .combine_all_columns(true)
        .radix(10);
    assert_eq!(setting.get("radix"), Some("10"));
    table.attach_iterator(setting, &[]).unwrap();

    // Two mutations so both versions are stored
    table.write(Mutation::new("foo").put("a", "b", "1")).unwrap();
    table.write(Mutation::new("foo").put("a", "b", "3")).unwrap();
    assert_eq!(scan_values(&table), vec!["1,3,4,2"]);

    table.write(Mutation::new("foo").put("a", "b", "0,20,20,2")).unwrap();
    assert_eq!(scan_values(&table), vec!["0,20,24,4"]);

    std::fs::remove_dir_all(&data_dir).ok();
}

#[test]
fn test_summing_combiner_across_compaction() {
    let (mut store, data_dir) = open_store();
    let table = store.create("sums").unwrap();
    table
        .attach_iterator(
            IteratorSetting::with_default_name(10, StageKind::SummingCombiner)
                .combine_all_columns(true)
                .encoding(LongEncoding::String),
            &[],
        )
        .unwrap();

    table.write(Mutation::new("foo").put("a", "b", "1")).unwrap();
    table.write(Mutation::new("foo").put("a", "b", "3")).unwrap();
    table.compact(CompactionKind::Full).unwrap();
    assert_eq!(table.len().unwrap(), 1);
    assert_eq!(scan_values(&table), vec!["4"]);

    table.write(Mutation::new("foo").put("a", "b", "10")).unwrap();
    assert_eq!(scan_values(&table), vec!["14"]);

    std::fs::remove_dir_all(&data_dir).ok();
}

#[test]
fn test_combiner_columns_leave_other_columns_alone() {
    let (mut store, data_dir) = open_store();
    let table = store.create("cols").unwrap();
    table
        .attach_iterator(
            IteratorSetting::with_default_name(10, StageKind::SummingCombiner)
                .columns(&[Column::family("count")])
                .encoding(LongEncoding::String),
            &[],
        )
        .unwrap();
    // versioning would hide the extra versions of "name"
    table.remove_iterator("vers", &[IteratorScope::Scan]).unwrap();

    table
        .write(
            Mutation::new("w")
                .put_at("count", "", 1, "2")
                .put_at("name", "", 1, "old"),
        )
        .unwrap();
    table
        .write(
            Mutation::new("w")
                .put_at("count", "", 2, "5")
                .put_at("name", "", 2, "new"),
        )
        .unwrap();

    assert_eq!(scan_values(&table), vec!["7", "new", "old"]);
    std::fs::remove_dir_all(&data_dir).ok();
}

#[test]
fn test_fixedlen_and_varlen_values() {
    let (mut store, data_dir) = open_store();
    let table = store.create("binary").unwrap();
    table
        .attach_iterator(
            IteratorSetting::new(10, "fixed", StageKind::SummingCombiner)
                .columns(&[Column::family("fixed")])
                .encoding(LongEncoding::FixedLen),
            &[],
        )
        .unwrap();
    table
        .attach_iterator(
            IteratorSetting::new(11, "var", StageKind::SummingCombiner)
                .columns(&[Column::family("var")]),
            &[],
        )
        .unwrap();

    for v in [100i64, 200, -50] {
        table
            .write(
                Mutation::new("r")
                    .put("fixed", "", LongEncoding::FixedLen.encode(v))
                    .put("var", "", LongEncoding::VarLen.encode(v)),
            )
            .unwrap();
    }

    let records = scan_all(&table);
    assert_eq!(records.len(), 2);
    assert_eq!(LongEncoding::FixedLen.decode(records[0].value.as_bytes()), Ok(250));
    assert_eq!(LongEncoding::VarLen.decode(records[1].value.as_bytes()), Ok(250));
    std::fs::remove_dir_all(&data_dir).ok();
}

#[test]
fn test_visibility_groups() {
    let (mut store, data_dir) = open_store();
    let table = store.create("vis").unwrap();
    table.remove_iterator("vers", &[]).unwrap();
    table
        .attach_iterator(
            IteratorSetting::with_default_name(10, StageKind::StatsCombiner).combine_all_columns(true),
            &[IteratorScope::Scan],
        )
        .unwrap();

    table.write(Mutation::new("r").put_visible("f", "q", "A", "1")).unwrap();
    table.write(Mutation::new("r").put_visible("f", "q", "B", "2")).unwrap();
    table.write(Mutation::new("r").put_visible("f", "q", "B", "4")).unwrap();
    assert_eq!(scan_values(&table), vec!["1,1,1,1", "2,4,6,2"]);

    table.remove_iterator("stats", &[]).unwrap();
    table
        .attach_iterator(
            IteratorSetting::with_default_name(10, StageKind::StatsCombiner)
                .combine_all_columns(true)
                .ignore_visibility(true),
            &[IteratorScope::Scan],
        )
        .unwrap();
    assert_eq!(scan_values(&table), vec!["1,4,7,3"]);
    std::fs::remove_dir_all(&data_dir).ok();
}

#[test]
fn test_bad_value_fails_the_scan() {
    let (mut store, data_dir) = open_store();
    let table = store.create("bad").unwrap();
    table
        .attach_iterator(
            IteratorSetting::with_default_name(10, StageKind::StatsCombiner).combine_all_columns(true),
            &[],
        )
        .unwrap();
    table.write(Mutation::new("r").put("f", "q", "1,2")).unwrap();

    let result = table.scan(&ScanRange::all()).unwrap().into_records();
    assert!(result.is_err());
    std::fs::remove_dir_all(&data_dir).ok();
}
