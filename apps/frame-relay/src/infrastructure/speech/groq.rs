//! Groq client for transcription and translation.
//!
//! Uses the OpenAI-compatible endpoints:
//!
//! - `POST /openai/v1/audio/transcriptions` (multipart, Whisper)
//! - `POST /openai/v1/chat/completions` (chat model)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use super::error::{check_status, invalid_response, transport};
use crate::application::ports::{SpeechError, Transcriber, Translator};
use crate::domain::speech::AudioUpload;

const SERVICE: &str = "groq";

/// Speech recognition model.
pub const TRANSCRIPTION_MODEL: &str = "whisper-large-v3";

/// Chat model used for translation.
pub const CHAT_MODEL: &str = "llama3-8b-8192";

/// Sampling temperature for translation.
pub const CHAT_TEMPERATURE: f32 = 0.5;

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

// =============================================================================
// Client
// =============================================================================

/// HTTP client for the Groq API.
#[derive(Clone)]
pub struct GroqClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for GroqClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqClient")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GroqClient {
    /// Create a client.
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::Transport` if the HTTP client cannot be built.
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, SpeechError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| transport(SERVICE, &e))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl Transcriber for GroqClient {
    async fn transcribe(
        &self,
        audio: AudioUpload,
        language_hint: Option<String>,
    ) -> Result<String, SpeechError> {
        let mut file = Part::bytes(audio.data.to_vec()).file_name(audio.file_name);
        if let Some(content_type) = audio.content_type.as_deref() {
            file = file
                .mime_str(content_type)
                .map_err(|e| invalid_response(SERVICE, format!("bad content type: {e}")))?;
        }

        let mut form = Form::new()
            .part("file", file)
            .text("model", TRANSCRIPTION_MODEL)
            .text("response_format", "json");
        if let Some(language) = language_hint {
            form = form.text("language", language);
        }

        let response = self
            .client
            .post(self.url("/openai/v1/audio/transcriptions"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport(SERVICE, &e))?;

        let body: TranscriptionResponse = check_status(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| invalid_response(SERVICE, e.to_string()))?;

        Ok(body.text)
    }
}

#[async_trait]
impl Translator for GroqClient {
    async fn translate(&self, system_instruction: &str, text: &str) -> Result<String, SpeechError> {
        let request = ChatRequest {
            model: CHAT_MODEL,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_instruction,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            temperature: CHAT_TEMPERATURE,
        };

        let response = self
            .client
            .post(self.url("/openai/v1/chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport(SERVICE, &e))?;

        let body: ChatResponse = check_status(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| invalid_response(SERVICE, e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| invalid_response(SERVICE, "completion has no content"))
    }
}

// =============================================================================
// Tests
// =============================================================================
