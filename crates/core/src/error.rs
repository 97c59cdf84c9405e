use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Invalid column: {0}")]
    InvalidColumn(String),

    #[error("{0}")]
    Other(String),
}
