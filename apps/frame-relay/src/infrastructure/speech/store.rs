//! Local filesystem audio store.
//!
//! Files are written once under a static directory as `<uuid-v4>.<ext>`
//! and served back by name.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::application::ports::{AudioStore, StoreError, StoredAudio};
use crate::domain::speech::AudioEncoding;

/// URL prefix under which stored files are served.
pub const STATIC_URL_PREFIX: &str = "/static";

/// Audio store backed by a local directory.
#[derive(Debug, Clone)]
pub struct LocalAudioStore {
    dir: PathBuf,
}

impl LocalAudioStore {
    /// Open the store, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the directory cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    /// Directory files are stored in.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// A plain file name: one path component, no separators, not hidden.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
        && Path::new(name).file_name().is_some_and(|n| n == name)
}

#[async_trait]
impl AudioStore for LocalAudioStore {
    async fn store(&self, audio: Bytes, encoding: AudioEncoding) -> Result<StoredAudio, StoreError> {
        let file_name = format!("{}.{}", Uuid::new_v4(), encoding.extension());
        let path = self.dir.join(&file_name);

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(&audio).await?;
        file.flush().await?;

        tracing::debug!(path = %path.display(), bytes = audio.len(), "Stored audio");

        Ok(StoredAudio {
            url_path: format!("{STATIC_URL_PREFIX}/{file_name}"),
            file_name,
        })
    }

    async fn load(&self, file_name: &str) -> Result<Bytes, StoreError> {
        if !is_plain_file_name(file_name) {
            return Err(StoreError::InvalidName(file_name.to_string()));
        }

        match tokio::fs::read(self.dir.join(file_name)).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(file_name.to_string()))
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}
