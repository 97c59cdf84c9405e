use std::fs;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use strata_core::StrataError;

use crate::constraint::Constraint;
use crate::error::TableError;
use crate::iterator_config::IteratorConfig;
use crate::writer::{TableEntry, TableMeta, COMPRESSION, CONSTRAINTS_FILE, ITERATORS_FILE, META_FILE, RECORDS_FILE};

/// Reads a table directory written by [`crate::writer::TableFileWriter`].
pub struct TableFileReader {
    records_path: PathBuf,
    meta: TableMeta,
    iterators: IteratorConfig,
    constraints: Vec<Constraint>,
    /// Decompressed record stream.
    data: Vec<u8>,
}

impl TableFileReader {
    pub fn open(table_dir: &Path) -> Result<Self, TableError> {
        let meta_path = table_dir.join(META_FILE);
        if !meta_path.exists() {
            return Err(TableError::TableNotFound(table_dir.display().to_string()));
        }

        let meta: TableMeta = serde_json::from_str(&fs::read_to_string(&meta_path)?)
            .map_err(|e| corrupt(&meta_path, e))?;
        if meta.compression != COMPRESSION {
            return Err(corrupt(
                &meta_path,
                format!("unsupported compression '{}'", meta.compression),
            ));
        }

        let iterators_path = table_dir.join(ITERATORS_FILE);
        let iterators = if iterators_path.exists() {
            serde_json::from_str(&fs::read_to_string(&iterators_path)?)
                .map_err(|e| corrupt(&iterators_path, e))?
        } else {
            IteratorConfig::default()
        };

        let constraints_path = table_dir.join(CONSTRAINTS_FILE);
        let constraints = if constraints_path.exists() {
            serde_json::from_str(&fs::read_to_string(&constraints_path)?)
                .map_err(|e| corrupt(&constraints_path, e))?
        } else {
            Vec::new()
        };

        let records_path = table_dir.join(RECORDS_FILE);
        let data = if records_path.exists() {
            let file = fs::File::open(&records_path)?;
            if file.metadata()?.len() == 0 {
                Vec::new()
            } else {
                // SAFETY: table files are only replaced by rename, never written in place.
                let mmap = unsafe { Mmap::map(&file)? };
                zstd::decode_all(mmap.as_ref())?
            }
        } else {
            Vec::new()
        };

        Ok(Self {
            records_path,
            meta,
            iterators,
            constraints,
            data,
        })
    }

    pub fn meta(&self) -> &TableMeta {
        &self.meta
    }

    pub fn iterators(&self) -> &IteratorConfig {
        &self.iterators
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Iterate all entries in file order.
    pub fn iter(&self) -> TableFileIter<'_> {
        TableFileIter {
            path: &self.records_path,
            data: &self.data,
            pos: 0,
        }
    }

    /// Size of the decompressed record stream in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct TableFileIter<'a> {
    path: &'a Path,
    data: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for TableFileIter<'a> {
    type Item = Result<TableEntry, TableError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.data.len() {
            return None;
        }

        let Some(header) = self.data.get(self.pos..self.pos + 4) else {
            self.pos = self.data.len();
            return Some(Err(corrupt(self.path, "truncated length prefix")));
        };
        let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;

        let Some(body) = self.data.get(self.pos + 4..self.pos + 4 + len) else {
            self.pos = self.data.len();
            return Some(Err(corrupt(self.path, "truncated record")));
        };

        let result = rmp_serde::from_slice(body)
            .map_err(|e| TableError::Core(StrataError::Serialize(e.to_string())));

        self.pos += 4 + len;
        Some(result)
    }
}

fn corrupt(path: &Path, message: impl ToString) -> TableError {
    TableError::Corrupt {
        path: path.display().to_string(),
        message: message.to_string(),
    }
}
