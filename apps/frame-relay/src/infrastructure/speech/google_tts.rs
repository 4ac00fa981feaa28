//! Google Cloud Text-to-Speech client.
//!
//! `POST /v1/text:synthesize?key=<api key>`; the audio comes back base64
//! encoded in `audioContent`.

use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::error::{check_status, invalid_response, transport};
use crate::application::ports::{SpeechError, SpeechSynthesizer};
use crate::domain::speech::{AudioEncoding, VoiceSelection};

const SERVICE: &str = "google-tts";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceParams<'a>,
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceParams<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

/// HTTP client for the Google Text-to-Speech REST API.
#[derive(Clone)]
pub struct GoogleTtsClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for GoogleTtsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleTtsClient")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GoogleTtsClient {
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
}

#[async_trait]
impl SpeechSynthesizer for GoogleTtsClient {
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceSelection,
        encoding: AudioEncoding,
    ) -> Result<Bytes, SpeechError> {
        let request = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceParams {
                language_code: &voice.language_code,
                name: &voice.name,
            },
            audio_config: AudioConfig {
                audio_encoding: encoding.as_api_str(),
            },
        };

        let response = self
            .client
            .post(format!("{}/v1/text:synthesize", self.base_url))
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| transport(SERVICE, &e))?;

        let body: SynthesizeResponse = check_status(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| invalid_response(SERVICE, e.to_string()))?;

        let audio = general_purpose::STANDARD
            .decode(body.audio_content.as_bytes())
            .map_err(|e| invalid_response(SERVICE, format!("audioContent is not base64: {e}")))?;

        if audio.is_empty() {
            return Err(invalid_response(SERVICE, "audioContent is empty"));
        }

        Ok(Bytes::from(audio))
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(server: &MockServer) -> GoogleTtsClient {
        GoogleTtsClient::new("AIza-test", &server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn synthesize_decodes_audio_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text:synthesize"))
            .and(query_param("key", "AIza-test"))
            .and(body_partial_json(serde_json::json!({
                "input": { "text": "hola" },
                "voice": { "languageCode": "es-ES", "name": "es-ES-Wavenet-D" },
                "audioConfig": { "audioEncoding": "MP3" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "audioContent": general_purpose::STANDARD.encode(b"ID3\x04mp3")
            })))
            .expect(1)
            .mount(&server)
            .await;

        let audio = client(&server)
            .synthesize("hola", &VoiceSelection::for_language("es"), AudioEncoding::Mp3)
            .await
            .unwrap();
        assert_eq!(&audio[..], b"ID3\x04mp3");
    }

    #[tokio::test]
    async fn forbidden_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text:synthesize"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": { "code": 403, "message": "API key not valid.", "status": "PERMISSION_DENIED" }
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .synthesize("hi", &VoiceSelection::for_language("en"), AudioEncoding::Mp3)
            .await
            .unwrap_err();
        assert!(matches!(err, SpeechError::Api { status: 403, ref message, .. } if message == "API key not valid."));
    }

    #[tokio::test]
    async fn garbage_audio_content_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text:synthesize"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "audioContent": "***not base64***"
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .synthesize("hi", &VoiceSelection::for_language("en"), AudioEncoding::Mp3)
            .await
            .unwrap_err();
        assert!(matches!(err, SpeechError::InvalidResponse { .. }));
    }
}
