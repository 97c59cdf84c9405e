use strata_table::{CompactionKind, Constraint, Mutation, ScanRange, TableError};

use crate::helpers::{open_store, scan_all};

#[test]
fn test_wide_row_rejected_by_size_limit() {
    let (mut store, data_dir) = open_store();
    let table = store.create("ingest").unwrap();
    table.add_constraint(Constraint::max_mutation_size(16 * 1024)).unwrap();

    // one row with 1000 columns of 50-byte values
    let wide = (0..1000).fold(Mutation::new("row_0000000000"), |m, col| {
        m.put("colf", format!("col_{col:07}"), "x".repeat(50))
    });
    let narrow = Mutation::new("row_0000000001").put("colf", "col_0000000", "x".repeat(50));

    match table.write_batch(vec![wide, narrow]) {
        Err(TableError::ConstraintViolation { violations, .. }) => assert_eq!(violations.len(), 1),
        other => panic!("expected a constraint violation, got {other:?}"),
    }
    assert!(table.is_empty().unwrap());
    std::fs::remove_dir_all(&data_dir).ok();
}

#[test]
fn test_row_operations() {
    let (mut store, data_dir) = open_store();
    let table = store.create("rows").unwrap();
    for row in ["row1", "row2", "row3"] {
        let mutation = (1..=3).fold(Mutation::new(row), |m, col| {
            m.put("column", col.to_string(), format!("{row}.{col}"))
        });
        table.write(mutation).unwrap();
    }

    let row2: Vec<String> = table
        .scan(&ScanRange::exact_row("row2"))
        .unwrap()
        .map(|r| r.unwrap().value.to_string())
        .collect();
    assert_eq!(row2, vec!["row2.1", "row2.2", "row2.3"]);

    assert_eq!(table.delete_row("row2").unwrap(), 3);
    assert_eq!(table.delete_row("row3").unwrap(), 3);
    let rows: Vec<String> = scan_all(&table).into_iter().map(|r| r.key.row).collect();
    assert_eq!(rows, vec!["row1", "row1", "row1"]);

    table.compact(CompactionKind::Full).unwrap();
    assert_eq!(table.len().unwrap(), 3);
    std::fs::remove_dir_all(&data_dir).ok();
}
