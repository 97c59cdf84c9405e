use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use serde_json::json;
use strata_core::config::Config;
use strata_core::{Column, Record, Value};
use strata_table::{ColumnUpdate, CompactionKind, Constraint, Mutation, ScanRange, TableStore};
use tracing::info;

use crate::cli::{Command, InsertArgs, ScanArgs};
use crate::input::{read_pipeline, read_records};

pub fn run(command: Command, store: &mut TableStore, config: &Config) -> Result<()> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match command {
        Command::Create { table } => {
            store.create(&table)?;
            writeln!(out, "created {}", table)?;
        }
        Command::Delete { table } => {
            store.delete(&table)?;
            writeln!(out, "deleted {}", table)?;
        }
        Command::Tables => {
            for name in store.list() {
                let stats = store.get(&name)?.stats()?;
                writeln!(
                    out,
                    "{}\t{} entries\t{} iterators",
                    name, stats.entry_count, stats.iterator_count
                )?;
            }
        }
        Command::Attach { table, file } => {
            let pipeline = read_pipeline(&file)?;
            let handle = store.get(&table)?;
            for spec in &pipeline.iterators {
                let setting = spec.to_setting()?;
                let name = setting.name.clone();
                handle
                    .attach_iterator(setting, &spec.scopes)
                    .with_context(|| format!("failed to attach '{}'", name))?;
                writeln!(out, "attached {} to {}", name, table)?;
            }
            store.flush(&table)?;
        }
        Command::Iterators { table } => {
            for (scope, setting) in store.get(&table)?.list_iterators()? {
                writeln!(out, "{}\t{}", scope, setting)?;
            }
        }
        Command::Detach { table, name, scopes } => {
            store.get(&table)?.remove_iterator(&name, &scopes)?;
            store.flush(&table)?;
            writeln!(out, "removed {} from {}", name, table)?;
        }
        Command::Insert(args) => {
            let table = args.table.clone();
            let mutations = mutations_from(args)?;
            let count = store.get(&table)?.write_batch(mutations)?;
            store.flush(&table)?;
            info!(table = %table, mutations = count, "Inserted records");
            writeln!(out, "inserted {} records into {}", count, table)?;
        }
        Command::DeleteRow { table, row } => {
            let markers = store.get(&table)?.delete_row(&row)?;
            store.flush(&table)?;
            writeln!(out, "deleted row {} from {} ({} cells)", row, table, markers)?;
        }
        Command::Constrain { table, max_mutation_bytes } => {
            store
                .get(&table)?
                .add_constraint(Constraint::max_mutation_size(max_mutation_bytes))?;
            store.flush(&table)?;
            writeln!(out, "limited mutations on {} to {} bytes", table, max_mutation_bytes)?;
        }
        Command::Constraints { table } => {
            for constraint in store.get(&table)?.constraints()? {
                writeln!(out, "{}", constraint)?;
            }
        }
        Command::Unconstrain { table, name } => {
            store.get(&table)?.remove_constraint(&name)?;
            store.flush(&table)?;
            writeln!(out, "removed {} from {}", name, table)?;
        }
        Command::Scan(args) => scan(store, args, &mut out)?,
        Command::Compact { table, full } => {
            let kind = if full { CompactionKind::Full } else { CompactionKind::Minor };
            let summary = store.get(&table)?.compact(kind)?;
            store.flush(&table)?;
            writeln!(
                out,
                "compacted {}: {} entries read, {} written",
                table, summary.entries_read, summary.entries_written
            )?;
        }
        Command::Config => {
            writeln!(out, "{}", serde_json::to_string_pretty(&config.redacted_summary())?)?;
        }
    }

    out.flush()?;
    Ok(())
}

fn mutations_from(args: InsertArgs) -> Result<Vec<Mutation>> {
    if let Some(file) = &args.file {
        return read_records(file);
    }

    let row = args.row.context("--row is required without --file")?;
    let value = if args.delete {
        Value::default()
    } else {
        args.value.context("--value is required unless --delete is set")?.into()
    };
    let mutation = Mutation::new(row).update(ColumnUpdate {
        family: args.family,
        qualifier: args.qualifier,
        visibility: args.visibility,
        timestamp: args.timestamp,
        deleted: args.delete,
        value,
    });
    Ok(vec![mutation])
}

fn scan(store: &TableStore, args: ScanArgs, out: &mut impl Write) -> Result<()> {
    let mut range = ScanRange::all();
    range.start_row = args.start_row;
    range.end_row = args.end_row;
    for column in &args.columns {
        range = range.fetch_column(Column::parse(column)?);
    }

    let scanner = store.get(&args.table)?.scan(&range)?;
    let limit = args.limit.unwrap_or(usize::MAX);
    for record in scanner.take(limit) {
        let record = record.with_context(|| format!("scan of {} failed", args.table))?;
        if args.json {
            writeln!(out, "{}", record_json(&record))?;
        } else {
            writeln!(out, "{}", record)?;
        }
    }
    Ok(())
}

fn record_json(record: &Record) -> serde_json::Value {
    let key = &record.key;
    json!({
        "row": key.row,
        "family": key.family,
        "qualifier": key.qualifier,
        "visibility": key.visibility,
        "timestamp": key.timestamp,
        "time": key.datetime().map(|t| t.to_rfc3339()),
        "deleted": key.deleted,
        "value": record.value.to_string(),
    })
}
