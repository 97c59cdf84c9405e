use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strata_core::{Key, StrataError, Value};
use tracing::info;

use crate::constraint::Constraint;
use crate::error::TableError;
use crate::iterator_config::IteratorConfig;

pub(crate) const RECORDS_FILE: &str = "records.dat";
pub(crate) const ITERATORS_FILE: &str = "iterators.json";
pub(crate) const CONSTRAINTS_FILE: &str = "constraints.json";
pub(crate) const META_FILE: &str = "meta.json";
/// Codec recorded in meta.json. The record stream is always zstd.
pub(crate) const COMPRESSION: &str = "zstd";

/// One stored cell as it appears in `records.dat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEntry {
    pub key: Key,
    /// Write sequence, newest highest. Orders duplicate keys.
    pub seq: u64,
    pub value: Value,
}

/// Table metadata stored as meta.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMeta {
    pub name: String,
    pub entry_count: usize,
    pub size_bytes: u64,
    pub raw_bytes: u64,
    pub compression: String,
    pub sequence: u64,
    pub last_timestamp: i64,
    pub flushed_at: DateTime<Utc>,
}

/// Writes a table directory. Records go to a temporary file that replaces
/// `records.dat` only once the zstd stream is complete.
pub struct TableFileWriter {
    name: String,
    table_dir: PathBuf,
    encoder: zstd::Encoder<'static, BufWriter<fs::File>>,
    raw_bytes: u64,
    entry_count: usize,
}

impl TableFileWriter {
    pub fn new(table_dir: &Path, name: &str, compression_level: i32) -> Result<Self, TableError> {
        fs::create_dir_all(table_dir)?;

        let file = fs::File::create(tmp_path(table_dir))?;
        let encoder = zstd::Encoder::new(BufWriter::new(file), compression_level)?;

        Ok(Self {
            name: name.to_string(),
            table_dir: table_dir.to_path_buf(),
            encoder,
            raw_bytes: 0,
            entry_count: 0,
        })
    }

    /// Append an entry to the zstd-compressed stream.
    pub fn append(&mut self, entry: &TableEntry) -> Result<(), TableError> {
        let encoded = rmp_serde::to_vec(entry).map_err(|e| StrataError::Serialize(e.to_string()))?;

        let len = encoded.len() as u32;
        self.encoder.write_all(&len.to_le_bytes())?;
        self.encoder.write_all(&encoded)?;

        self.raw_bytes += 4 + encoded.len() as u64;
        self.entry_count += 1;
        Ok(())
    }

    /// Finish the zstd stream, then write iterators.json, constraints.json
    /// and meta.json.
    pub fn finalize(
        self,
        iterators: &IteratorConfig,
        constraints: &[Constraint],
        sequence: u64,
        last_timestamp: i64,
    ) -> Result<TableMeta, TableError> {
        let buf_writer = self.encoder.finish()?;
        let mut inner = buf_writer.into_inner().map_err(|e| e.into_error())?;
        inner.flush()?;
        inner.sync_all()?;
        drop(inner);

        let records_path = self.table_dir.join(RECORDS_FILE);
        fs::rename(tmp_path(&self.table_dir), &records_path)?;
        let compressed_size = fs::metadata(&records_path).map(|m| m.len()).unwrap_or(0);

        let iterators_json =
            serde_json::to_string_pretty(iterators).map_err(|e| StrataError::Serialize(e.to_string()))?;
        fs::write(self.table_dir.join(ITERATORS_FILE), iterators_json)?;

        let constraints_json =
            serde_json::to_string_pretty(constraints).map_err(|e| StrataError::Serialize(e.to_string()))?;
        fs::write(self.table_dir.join(CONSTRAINTS_FILE), constraints_json)?;

        let meta = TableMeta {
            name: self.name.clone(),
            entry_count: self.entry_count,
            size_bytes: compressed_size,
            raw_bytes: self.raw_bytes,
            compression: COMPRESSION.to_string(),
            sequence,
            last_timestamp,
            flushed_at: Utc::now(),
        };
        let meta_json =
            serde_json::to_string_pretty(&meta).map_err(|e| StrataError::Serialize(e.to_string()))?;
        fs::write(self.table_dir.join(META_FILE), meta_json)?;

        let ratio = if self.raw_bytes > 0 {
            (compressed_size as f64 / self.raw_bytes as f64 * 100.0) as u32
        } else {
            100
        };
        info!(
            table = %self.name,
            entries = self.entry_count,
            size_bytes = compressed_size,
            raw_bytes = self.raw_bytes,
            ratio_pct = ratio,
            "Table flushed"
        );
        Ok(meta)
    }
}

fn tmp_path(table_dir: &Path) -> PathBuf {
    table_dir.join(format!("{}.tmp", RECORDS_FILE))
}
