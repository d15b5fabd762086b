use std::io;
use std::path::PathBuf;

use dex_intel_dex::{DexError, ErrorKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Given path doesn't exist
    #[error("file not found: {0:?}")]
    FileNotFound(PathBuf),

    /// Path exists, but can't be opened or read
    #[error("can't read file: {path:?}")]
    NotReadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Input is bigger than [crate::DexOptions::max_file_size]
    #[error("file too large: {size} bytes, limit is {limit}")]
    FileTooLarge { size: u64, limit: u64 },

    /// Fatal error while parsing dex header
    #[error(transparent)]
    DexError(#[from] DexError),

    /// Signature catalog contains a pattern that doesn't compile
    #[error("invalid pattern for signature {label:?}")]
    InvalidSignature {
        label: String,
        #[source]
        source: regex::Error,
    },

    /// Signature catalog is not a valid json
    #[error("can't parse signature catalog")]
    CatalogError(#[from] serde_json::Error),
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::FileNotFound(_) => ErrorKind::FileNotFound,
            AnalysisError::NotReadable { .. } => ErrorKind::NotReadable,
            AnalysisError::FileTooLarge { .. } => ErrorKind::FileTooLarge,
            AnalysisError::DexError(e) => e.kind(),
            AnalysisError::InvalidSignature { .. } | AnalysisError::CatalogError(_) => {
                ErrorKind::InvalidSignature
            }
        }
    }
}
