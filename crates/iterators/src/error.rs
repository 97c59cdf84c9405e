//! Iterator error types.

use strata_core::Key;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IteratorError {
    /// Raised while attaching or building a stage; no pipeline is constructed.
    #[error("invalid configuration for iterator '{stage}': {message}")]
    Configuration { stage: String, message: String },

    /// A value could not be decoded; fatal to the current pass.
    #[error("cannot decode value at {key} as {encoding}: {message}")]
    Decode {
        key: Key,
        encoding: String,
        message: String,
    },
}

impl IteratorError {
    pub(crate) fn config(stage: &str, message: impl Into<String>) -> Self {
        IteratorError::Configuration {
            stage: stage.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn decode(key: &Key, encoding: impl Into<String>, message: impl Into<String>) -> Self {
        IteratorError::Decode {
            key: key.clone(),
            encoding: encoding.into(),
            message: message.into(),
        }
    }
}
