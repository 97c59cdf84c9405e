use strata_core::StrataError;
use strata_iterators::{IteratorError, IteratorScope};
use thiserror::Error;

use crate::constraint::{summarize, ConstraintViolation};

#[derive(Error, Debug)]
pub enum TableError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] StrataError),

    #[error(transparent)]
    Iterator(#[from] IteratorError),

    #[error("Table already exists: {0}")]
    TableExists(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Invalid table name '{0}': use letters, digits and '_'")]
    InvalidTableName(String),

    #[error("Iterator '{name}' is already attached for scope {scope}")]
    IteratorExists { name: String, scope: IteratorScope },

    #[error("Priority {priority} in scope {scope} is already used by '{existing}'")]
    PriorityConflict {
        priority: u32,
        scope: IteratorScope,
        existing: String,
    },

    #[error("Iterator not found: {0}")]
    IteratorNotFound(String),

    #[error("Invalid mutation: {0}")]
    InvalidMutation(String),

    #[error("Mutations rejected by constraints of table '{table}': {}", summarize(.violations))]
    ConstraintViolation {
        table: String,
        violations: Vec<ConstraintViolation>,
    },

    #[error("Constraint '{0}' is already set")]
    ConstraintExists(String),

    #[error("Constraint not found: {0}")]
    ConstraintNotFound(String),

    #[error("Lock poisoned: {0}")]
    Poisoned(String),

    #[error("Corrupt table file {path}: {message}")]
    Corrupt { path: String, message: String },
}

impl TableError {
    /// True for errors raised while attaching iterators, before any pass runs.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            TableError::Iterator(IteratorError::Configuration { .. })
                | TableError::IteratorExists { .. }
                | TableError::PriorityConflict { .. }
        )
    }
}
