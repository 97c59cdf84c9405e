//! Iterator/combiner pipeline over sorted key/value records.
//!
//! This crate provides:
//! - `IteratorSetting`: name, priority, stage kind and string options
//! - Stage implementations (age-off, versioning, summing and statistics combiners)
//! - `Pipeline`: priority-ordered stage stack, opened once per scan or compaction pass
//! - Long value encodings shared with clients (`STRING`, `FIXEDLEN`, `VARLEN`)

pub mod columns;
pub mod encoding;
pub mod error;
pub mod pipeline;
pub mod setting;
pub mod stages;

pub use columns::ColumnPolicy;
pub use encoding::LongEncoding;
pub use error::IteratorError;
pub use pipeline::{Pass, Pipeline};
pub use setting::{IteratorScope, IteratorSetting, StageKind};
pub use stages::stats::Stats;
