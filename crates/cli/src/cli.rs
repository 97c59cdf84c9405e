use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use strata_iterators::IteratorScope;

/// Sorted key/value tables with attachable iterators.
///
/// Tables are stored under `<data_dir>/tables/`. Every command that changes
/// a table writes it back to disk before exiting.
#[derive(Parser, Debug)]
#[command(name = "strata", version, about = "Sorted key/value tables with attachable iterators")]
pub struct CliArgs {
    /// Config profile (reads {PROFILE}_DATA_DIR etc. before DATA_DIR)
    #[arg(long, env = "STRATA_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Data directory override
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an empty table with the default iterators
    Create { table: String },

    /// Delete a table and its files
    Delete { table: String },

    /// List tables with entry counts
    Tables,

    /// Attach the iterators defined in a YAML pipeline file
    Attach {
        table: String,
        #[arg(long, short)]
        file: PathBuf,
    },

    /// List the iterators attached to a table
    Iterators { table: String },

    /// Remove an iterator by name
    Detach {
        table: String,
        name: String,
        /// Scopes to remove from (default: all)
        #[arg(long = "scope", value_parser = parse_scope)]
        scopes: Vec<IteratorScope>,
    },

    /// Write records from a JSON-lines file or from flags
    Insert(InsertArgs),

    /// Write deletion markers for every cell of a row
    DeleteRow { table: String, row: String },

    /// Reject mutations larger than a byte limit
    Constrain {
        table: String,
        #[arg(long)]
        max_mutation_bytes: usize,
    },

    /// List the constraints set on a table
    Constraints { table: String },

    /// Remove a constraint by name
    Unconstrain { table: String, name: String },

    /// Scan a table through its scan-time iterators
    Scan(ScanArgs),

    /// Compact a table through its minc or majc iterators
    Compact {
        table: String,
        /// Run a full major compaction, dropping deletion markers
        #[arg(long)]
        full: bool,
    },

    /// Print the effective configuration
    Config,
}

#[derive(Args, Debug)]
pub struct InsertArgs {
    pub table: String,

    /// JSON-lines file, one record per line
    #[arg(long, short, conflicts_with_all = ["row", "value"])]
    pub file: Option<PathBuf>,

    #[arg(long, required_unless_present = "file")]
    pub row: Option<String>,

    #[arg(long, default_value = "")]
    pub family: String,

    #[arg(long, default_value = "")]
    pub qualifier: String,

    #[arg(long, default_value = "")]
    pub visibility: String,

    /// Timestamp in milliseconds (default: assigned by the table)
    #[arg(long)]
    pub timestamp: Option<i64>,

    #[arg(long, required_unless_present_any = ["file", "delete"])]
    pub value: Option<String>,

    /// Write a deletion marker instead of a value
    #[arg(long, conflicts_with = "value")]
    pub delete: bool,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    pub table: String,

    /// First row (inclusive)
    #[arg(long)]
    pub start_row: Option<String>,

    /// Last row (inclusive)
    #[arg(long)]
    pub end_row: Option<String>,

    /// Column to fetch, `family` or `family:qualifier` (repeatable)
    #[arg(long = "column")]
    pub columns: Vec<String>,

    /// Print JSON lines instead of text
    #[arg(long)]
    pub json: bool,

    /// Stop after this many records
    #[arg(long)]
    pub limit: Option<usize>,
}

fn parse_scope(s: &str) -> Result<IteratorScope, String> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_definition() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_parse_scan() {
        let args = CliArgs::parse_from([
            "strata", "scan", "events", "--start-row", "a", "--end-row", "m", "--column", "f:q", "--json",
        ]);
        match args.command {
            Command::Scan(scan) => {
                assert_eq!(scan.table, "events");
                assert_eq!(scan.start_row.as_deref(), Some("a"));
                assert_eq!(scan.columns, vec!["f:q"]);
                assert!(scan.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_detach_scopes() {
        let args = CliArgs::parse_from(["strata", "detach", "t", "vers", "--scope", "scan", "--scope", "majc"]);
        match args.command {
            Command::Detach { scopes, .. } => {
                assert_eq!(scopes, vec![IteratorScope::Scan, IteratorScope::Majc]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_insert_requires_row_or_file() {
        assert!(CliArgs::try_parse_from(["strata", "insert", "t", "--value", "1"]).is_err());
        assert!(CliArgs::try_parse_from(["strata", "insert", "t", "--row", "r", "--value", "1"]).is_ok());
        assert!(CliArgs::try_parse_from(["strata", "insert", "t", "--row", "r", "--delete"]).is_ok());
        assert!(CliArgs::try_parse_from(["strata", "insert", "t", "--file", "x.jsonl"]).is_ok());
    }

    #[test]
    fn test_parse_constrain() {
        let args = CliArgs::parse_from(["strata", "constrain", "t", "--max-mutation-bytes", "4096"]);
        match args.command {
            Command::Constrain { table, max_mutation_bytes } => {
                assert_eq!(table, "t");
                assert_eq!(max_mutation_bytes, 4096);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(CliArgs::try_parse_from(["strata", "constrain", "t"]).is_err());
    }

    #[test]
    fn test_global_data_dir() {
        let args = CliArgs::parse_from(["strata", "tables", "--data-dir", "/tmp/strata"]);
        assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/strata")));
    }
}
