use std::path::PathBuf;
use thiserror::Error;

/// Why a single file could not be corrected. Never fatal to a batch.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is {bytes} bytes, over the {limit} byte limit")]
    TooLarge { path: PathBuf, bytes: u64, limit: u64 },

    #[error("binary file, cannot parse")]
    Binary,

    #[error("failed to load {grammar} grammar: {reason}")]
    Grammar { grammar: &'static str, reason: String },

    #[error("failed to parse: {reason}")]
    Parse { reason: String },
}

impl FileError {
    /// True for failures that happened before any text was available.
    pub fn is_load_failure(&self) -> bool {
        matches!(self, FileError::Read { .. } | FileError::TooLarge { .. })
    }
}
