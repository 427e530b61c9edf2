use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::FileRef;
use crate::MAX_UPLOAD_BYTES;

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum FileError {
    #[error("file not found: {path}")]
    NotFound { path: String },

    #[error("permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("file too large: {size} bytes exceeds maximum of {max} bytes")]
    TooLarge { size: u64, max: u64 },

    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },
}

impl FileError {
    fn from_io(err: &std::io::Error, file: &FileRef) -> Self {
        let path = file.path().display().to_string();
        match err.kind() {
            std::io::ErrorKind::NotFound => FileError::NotFound { path },
            std::io::ErrorKind::PermissionDenied => FileError::PermissionDenied { path },
            _ => FileError::Io {
                path,
                message: err.to_string(),
            },
        }
    }
}

/// Reads the bytes behind a pending file reference at upload time.
#[async_trait::async_trait]
pub trait FileSource: Send + Sync {
    async fn read(&self, file: &FileRef) -> Result<Vec<u8>, FileError>;
}

/// Local filesystem source.
#[derive(Debug, Clone)]
pub struct TokioFileSource {
    max_bytes: u64,
}

impl Default for TokioFileSource {
    fn default() -> Self {
        Self {
            max_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

impl TokioFileSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_bytes(max_bytes: u64) -> Self {
        Self { max_bytes }
    }
}

#[async_trait::async_trait]
impl FileSource for TokioFileSource {
    async fn read(&self, file: &FileRef) -> Result<Vec<u8>, FileError> {
        let metadata = tokio::fs::metadata(file.path())
            .await
            .map_err(|e| FileError::from_io(&e, file))?;

        if metadata.len() > self.max_bytes {
            return Err(FileError::TooLarge {
                size: metadata.len(),
                max: self.max_bytes,
            });
        }

        tokio::fs::read(file.path())
            .await
            .map_err(|e| FileError::from_io(&e, file))
    }
}
