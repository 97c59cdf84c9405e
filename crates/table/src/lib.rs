//! Sorted tables with attached iterator pipelines, and their on-disk store.

pub mod constraint;
mod deletes;
pub mod error;
pub mod iterator_config;
pub mod mutation;
pub mod range;
pub mod reader;
pub mod store;
pub mod table;
pub mod writer;

// Re-export key types
pub use constraint::{Constraint, ConstraintViolation};
pub use error::TableError;
pub use iterator_config::IteratorConfig;
pub use mutation::{ColumnUpdate, Mutation};
pub use range::ScanRange;
pub use store::{StoreStats, TableStore};
pub use table::{CompactionKind, CompactionSummary, Scanner, Table, TableStats};
