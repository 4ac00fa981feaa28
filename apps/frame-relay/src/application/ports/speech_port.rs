//! Speech Ports (Driven Ports)
//!
//! Interfaces for the hosted speech collaborators.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::speech::{AudioEncoding, AudioUpload, VoiceSelection};

/// Failure reported by a speech collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpeechError {
    /// The request never produced an HTTP response.
    #[error("{service} request failed: {message}")]
    Transport {
        /// Collaborator name.
        service: &'static str,
        /// Error details.
        message: String,
    },

    /// The collaborator answered with a non-success status.
    #[error("{service} API error ({status}): {message}")]
    Api {
        /// Collaborator name.
        service: &'static str,
        /// HTTP status code.
        status: u16,
        /// Response body or error message.
        message: String,
    },

    /// The response could not be interpreted.
    #[error("{service} returned an invalid response: {message}")]
    InvalidResponse {
        /// Collaborator name.
        service: &'static str,
        /// Error details.
        message: String,
    },
}

/// Speech-to-text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an uploaded recording.
    ///
    /// `language_hint` is an ISO-639-1 code; `None` lets the model detect it.
    async fn transcribe(
        &self,
        audio: AudioUpload,
        language_hint: Option<String>,
    ) -> Result<String, SpeechError>;
}

/// Instruction-following text model used for translation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Translator: Send + Sync {
    /// Run `text` through the model under `system_instruction`.
    async fn translate(&self, system_instruction: &str, text: &str) -> Result<String, SpeechError>;
}

/// Text-to-speech.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` with the given voice.
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceSelection,
        encoding: AudioEncoding,
    ) -> Result<Bytes, SpeechError>;
}
