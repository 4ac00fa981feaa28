//! Speech Translation Types
//!
//! Value types shared by the translation pipeline and its adapters: the
//! voice lookup table, output encodings, uploaded audio and the pipeline
//! outcome.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

// =============================================================================
// Languages and Voices
// =============================================================================

/// Target language used when a request does not name one.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Voice used for languages missing from the table.
pub const DEFAULT_VOICE: &str = "en-US-Wavenet-D";

const VOICES: &[(&str, &str)] = &[
    ("en", "en-US-Wavenet-D"),
    ("es", "es-ES-Wavenet-D"),
    ("fr", "fr-FR-Wavenet-D"),
    ("de", "de-DE-Wavenet-D"),
    ("it", "it-IT-Wavenet-D"),
];

/// A synthesis voice and the locale it speaks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceSelection {
    /// BCP-47 locale of the voice (`en-US`).
    pub language_code: String,
    /// Provider voice name (`en-US-Wavenet-D`).
    pub name: String,
}

impl VoiceSelection {
    /// Select the voice for a short language code.
    ///
    /// Unknown codes fall back to [`DEFAULT_VOICE`].
    #[must_use]
    pub fn for_language(language: &str) -> Self {
        let normalized = language.trim().to_ascii_lowercase();
        let name = VOICES
            .iter()
            .find(|(code, _)| *code == normalized)
            .map_or(DEFAULT_VOICE, |(_, voice)| *voice);

        Self {
            language_code: locale_of(name).to_string(),
            name: name.to_string(),
        }
    }
}

/// `en-US-Wavenet-D` -> `en-US`
fn locale_of(voice: &str) -> &str {
    voice
        .match_indices('-')
        .nth(1)
        .map_or(voice, |(idx, _)| &voice[..idx])
}

/// System instruction asking the chat model for a bare translation.
#[must_use]
pub fn translation_instruction(language: &str) -> String {
    format!(
        "You are a helpful assistant that translates text to {language}. \
         Please provide the translation without any additional text."
    )
}

// =============================================================================
// Audio
// =============================================================================

/// Output encoding requested from the synthesizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudioEncoding {
    /// MPEG layer 3.
    #[default]
    Mp3,
    /// Opus in an Ogg container.
    OggOpus,
    /// Uncompressed 16-bit PCM with a WAV header.
    Linear16,
}

impl AudioEncoding {
    /// Name used by the synthesis API.
    #[must_use]
    pub const fn as_api_str(&self) -> &'static str {
        match self {
            Self::Mp3 => "MP3",
            Self::OggOpus => "OGG_OPUS",
            Self::Linear16 => "LINEAR16",
        }
    }

    /// File extension for stored audio.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::OggOpus => "ogg",
            Self::Linear16 => "wav",
        }
    }

    /// MIME type for serving stored audio.
    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::OggOpus => "audio/ogg",
            Self::Linear16 => "audio/wav",
        }
    }

    /// Reverse lookup by file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp3" => Some(Self::Mp3),
            "ogg" => Some(Self::OggOpus),
            "wav" => Some(Self::Linear16),
            _ => None,
        }
    }
}

/// Audio recording uploaded by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioUpload {
    /// Raw file content.
    pub data: Bytes,
    /// File name as sent by the client, `uploaded_audio.webm` if absent.
    pub file_name: String,
    /// Declared content type, if any.
    pub content_type: Option<String>,
}

impl AudioUpload {
    /// Name given to uploads that arrive without one.
    pub const FALLBACK_FILE_NAME: &'static str = "uploaded_audio.webm";

    /// Build an upload, filling in a file name when the client sent none.
    #[must_use]
    pub fn new(data: Bytes, file_name: Option<String>, content_type: Option<String>) -> Self {
        let file_name = file_name
            .filter(|name| !name.trim().is_empty())
            .map_or_else(|| Self::FALLBACK_FILE_NAME.to_string(), |name| with_extension(&name));

        Self {
            data,
            file_name,
            content_type,
        }
    }

    /// Whether the upload carries no audio.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Recordings from the browser recorder are webm when unnamed.
fn with_extension(name: &str) -> String {
    if std::path::Path::new(name).extension().is_some() {
        name.to_string()
    } else {
        format!("{name}.webm")
    }
}

/// Result of one successful translation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationOutcome {
    /// Text recognized from the uploaded audio.
    pub transcript: String,
    /// Transcript translated into the target language.
    pub translated_text: String,
    /// Target language as requested.
    pub language: String,
    /// Path under which the synthesized audio is served.
    pub audio_url: String,
}
