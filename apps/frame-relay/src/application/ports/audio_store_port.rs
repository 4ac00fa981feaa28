//! Audio Store Port (Driven Port)
//!
//! Write-once storage for synthesized audio, served back by file name.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::domain::speech::AudioEncoding;

/// Reference to a stored audio file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAudio {
    /// Unique file name (`<uuid>.<ext>`).
    pub file_name: String,
    /// Path under which the file is served (`/static/<file_name>`).
    pub url_path: String,
}

/// Audio store error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No file with that name exists.
    #[error("audio file not found: {0}")]
    NotFound(String),

    /// The name is not a plain file name inside the store.
    #[error("invalid audio file name: {0:?}")]
    InvalidName(String),

    /// Filesystem failure.
    #[error("audio store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Port for persisting synthesized audio.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioStore: Send + Sync {
    /// Store a new file and return its reference. Never overwrites.
    async fn store(&self, audio: Bytes, encoding: AudioEncoding) -> Result<StoredAudio, StoreError>;

    /// Load a previously stored file.
    async fn load(&self, file_name: &str) -> Result<Bytes, StoreError>;
}
