//! Error types for index building, loading, and querying.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NearpolyError {
    /// A geometry without usable coordinates. Absorbed by the builder and the
    /// loaders, which substitute an empty shape and keep the ID.
    #[error("Malformed geometry at id {id}: {reason}")]
    MalformedGeometry { id: u32, reason: String },

    #[error("Dataset is empty: nothing to index")]
    EmptyDataset,

    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    /// Artifacts are still loading; retry or wait on the loader.
    #[error("Index is not ready yet")]
    IndexNotReady,

    #[error("Serialized index is {size} bytes, exceeding the limit of {limit} bytes")]
    IndexTooLarge { size: u64, limit: u64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for NearpolyError {
    fn from(e: serde_json::Error) -> Self {
        NearpolyError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NearpolyError>;
