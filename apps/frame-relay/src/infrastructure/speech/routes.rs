//! HTTP surface of the translation pipeline.
//!
//! - `POST /audio-input` - multipart form with an `audio` file and an optional
//!   `language` field
//! - `GET /static/{file}` - synthesized audio produced by earlier requests

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use crate::application::ports::StoreError;
use crate::application::services::{PipelineError, TranslationPipeline};
use crate::domain::speech::{AudioEncoding, AudioUpload, DEFAULT_LANGUAGE};
use crate::infrastructure::metrics;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Success message of `POST /audio-input`.
pub const SUCCESS_MESSAGE: &str =
    "Audio file received, transcribed, translated, and synthesized successfully";

// =============================================================================
// Responses
// =============================================================================

/// Body of a successful translation.
#[derive(Debug, Serialize)]
pub struct TranslationResponse {
    /// Fixed success message.
    pub message: &'static str,
    /// Text recognised in the uploaded audio.
    pub transcript: String,
    /// Transcript translated into the target language.
    pub translated_text: String,
    /// Target language code the audio was synthesized in.
    pub language: String,
    /// Path under `/static` serving the synthesized audio.
    pub audio_url: String,
}

/// Error answered to the client as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: &'static str,
}

impl ApiError {
    const fn new(status: StatusCode, message: &'static str) -> Self {
        Self { status, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

impl From<&PipelineError> for ApiError {
    fn from(error: &PipelineError) -> Self {
        match error {
            PipelineError::InvalidInput(_) => {
                Self::new(StatusCode::BAD_REQUEST, "Audio file is empty")
            }
            PipelineError::Transcription(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to transcribe audio")
            }
            PipelineError::Translation(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to translate text")
            }
            PipelineError::Synthesis(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to synthesize speech")
            }
            PipelineError::Storage(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to store audio")
            }
        }
    }
}

// =============================================================================
// Router
// =============================================================================

/// Build the speech router.
pub fn router(pipeline: Arc<TranslationPipeline>) -> Router {
    Router::new()
        .route(
            "/audio-input",
            post(audio_input).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/static/{file}", get(static_audio))
        .with_state(pipeline)
}

async fn audio_input(
    State(pipeline): State<Arc<TranslationPipeline>>,
    mut multipart: Multipart,
) -> Result<Json<TranslationResponse>, ApiError> {
    let mut audio = None;
    let mut language = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed multipart request");
                return Err(ApiError::new(
                    StatusCode::BAD_REQUEST,
                    "Invalid multipart request",
                ));
            }
        };

        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("audio") => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(|e| {
                    tracing::warn!(error = %e, "Failed to read audio field");
                    ApiError::new(StatusCode::BAD_REQUEST, "Invalid multipart request")
                })?;
                audio = Some(AudioUpload::new(data, file_name, content_type));
            }
            Some("language") => {
                let value = field.text().await.map_err(|e| {
                    tracing::warn!(error = %e, "Failed to read language field");
                    ApiError::new(StatusCode::BAD_REQUEST, "Invalid multipart request")
                })?;
                language = Some(value);
            }
            _ => {}
        }
    }

    let Some(audio) = audio else {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "No audio file in request",
        ));
    };
    let language = language
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

    tracing::info!(
        file_name = %audio.file_name,
        bytes = audio.data.len(),
        language = %language,
        "Audio received"
    );

    match pipeline.run(audio, &language).await {
        Ok(outcome) => {
            metrics::record_translation_completed();
            tracing::info!(
                language = %outcome.language,
                audio_url = %outcome.audio_url,
                "Translation completed"
            );
            Ok(Json(TranslationResponse {
                message: SUCCESS_MESSAGE,
                transcript: outcome.transcript,
                translated_text: outcome.translated_text,
                language: outcome.language,
                audio_url: outcome.audio_url,
            }))
        }
        Err(e) => {
            metrics::record_translation_failed(e.stage());
            tracing::error!(stage = e.stage(), error = %e, "Translation pipeline failed");
            Err(ApiError::from(&e))
        }
    }
}

async fn static_audio(
    State(pipeline): State<Arc<TranslationPipeline>>,
    Path(file): Path<String>,
) -> Response {
    match pipeline.store().load(&file).await {
        Ok(data) => {
            let content_type = file
                .rsplit_once('.')
                .and_then(|(_, ext)| AudioEncoding::from_extension(ext))
                .map_or("application/octet-stream", |encoding| encoding.mime_type());
            ([(header::CONTENT_TYPE, content_type)], data).into_response()
        }
        Err(StoreError::NotFound(_) | StoreError::InvalidName(_)) => {
            StatusCode::NOT_FOUND.into_response()
        }
        Err(e) => {
            tracing::error!(file = %file, error = %e, "Failed to read stored audio");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use bytes::Bytes;
    use tower::ServiceExt;

    use super::*;
    use crate::application::ports::{
        MockAudioStore, MockSpeechSynthesizer, MockTranscriber, MockTranslator, SpeechError,
        StoredAudio,
    };

    const BOUNDARY: &str = "relayboundary";

    fn multipart_body(fields: &[(&str, Option<&str>, &[u8])]) -> Body {
        let mut body = Vec::new();
        for (name, file_name, data) in fields {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match file_name {
                Some(file_name) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: audio/webm\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Body::from(body)
    }

    fn upload_request(body: Body) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/audio-input")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(body)
            .unwrap()
    }

    fn pipeline(
        transcriber: MockTranscriber,
        translator: MockTranslator,
        synthesizer: MockSpeechSynthesizer,
        store: MockAudioStore,
    ) -> Arc<TranslationPipeline> {
        Arc::new(TranslationPipeline::new(
            Arc::new(transcriber),
            Arc::new(translator),
            Arc::new(synthesizer),
            Arc::new(store),
        ))
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn audio_input_runs_the_pipeline() {
        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .returning(|_, _| Ok("good morning".to_string()));
        let mut translator = MockTranslator::new();
        translator
            .expect_translate()
            .withf(|instruction, text| instruction.contains("to es") && text == "good morning")
            .returning(|_, _| Ok("buenos días".to_string()));
        let mut synthesizer = MockSpeechSynthesizer::new();
        synthesizer
            .expect_synthesize()
            .returning(|_, _, _| Ok(Bytes::from_static(b"ID3")));
        let mut store = MockAudioStore::new();
        store.expect_store().returning(|_, _| {
            Ok(StoredAudio {
                file_name: "abc.mp3".to_string(),
                url_path: "/static/abc.mp3".to_string(),
            })
        });

        let app = router(pipeline(transcriber, translator, synthesizer, store));
        let response = app
            .oneshot(upload_request(multipart_body(&[
                ("audio", Some("clip.webm"), b"webm"),
                ("language", None, b"es"),
            ])))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["message"], SUCCESS_MESSAGE);
        assert_eq!(json["transcript"], "good morning");
        assert_eq!(json["translated_text"], "buenos días");
        assert_eq!(json["language"], "es");
        assert_eq!(json["audio_url"], "/static/abc.mp3");
    }

    #[tokio::test]
    async fn missing_audio_is_bad_request() {
        let app = router(pipeline(
            MockTranscriber::new(),
            MockTranslator::new(),
            MockSpeechSynthesizer::new(),
            MockAudioStore::new(),
        ));
        let response = app
            .oneshot(upload_request(multipart_body(&[("language", None, b"fr")])))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No audio file in request");
    }

    #[tokio::test]
    async fn transcription_failure_is_internal_error() {
        let mut transcriber = MockTranscriber::new();
        transcriber.expect_transcribe().returning(|_, _| {
            Err(SpeechError::Api {
                service: "groq",
                status: 401,
                message: "Invalid API Key".to_string(),
            })
        });

        let app = router(pipeline(
            transcriber,
            MockTranslator::new(),
            MockSpeechSynthesizer::new(),
            MockAudioStore::new(),
        ));
        let response = app
            .oneshot(upload_request(multipart_body(&[(
                "audio",
                Some("clip.webm"),
                b"webm",
            )])))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["error"], "Failed to transcribe audio");
    }

    #[tokio::test]
    async fn language_defaults_to_english() {
        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .returning(|_, _| Ok("hi".to_string()));
        let mut translator = MockTranslator::new();
        translator
            .expect_translate()
            .withf(|instruction, _| instruction.contains("to en"))
            .returning(|_, _| Ok("hi".to_string()));
        let mut synthesizer = MockSpeechSynthesizer::new();
        synthesizer
            .expect_synthesize()
            .withf(|_, voice, _| voice.language_code == "en-US")
            .returning(|_, _, _| Ok(Bytes::from_static(b"ID3")));
        let mut store = MockAudioStore::new();
        store.expect_store().returning(|_, _| {
            Ok(StoredAudio {
                file_name: "x.mp3".to_string(),
                url_path: "/static/x.mp3".to_string(),
            })
        });

        let response = router(pipeline(transcriber, translator, synthesizer, store))
            .oneshot(upload_request(multipart_body(&[(
                "audio",
                Some("clip.webm"),
                b"webm",
            )])))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["language"], "en");
    }

    #[tokio::test]
    async fn static_serves_stored_audio_with_mime() {
        let mut store = MockAudioStore::new();
        store
            .expect_load()
            .withf(|name| name == "abc.mp3")
            .returning(|_| Ok(Bytes::from_static(b"ID3")));

        let response = router(pipeline(
            MockTranscriber::new(),
            MockTranslator::new(),
            MockSpeechSynthesizer::new(),
            store,
        ))
        .oneshot(
            Request::builder()
                .uri("/static/abc.mp3")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"ID3");
    }

    #[tokio::test]
    async fn static_unknown_file_is_not_found() {
        let mut store = MockAudioStore::new();
        store
            .expect_load()
            .returning(|name| Err(StoreError::NotFound(name.to_string())));

        let response = router(pipeline(
            MockTranscriber::new(),
            MockTranslator::new(),
            MockSpeechSynthesizer::new(),
            store,
        ))
        .oneshot(
            Request::builder()
                .uri("/static/missing.mp3")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn translation_response_field_names() {
        let body = serde_json::to_value(TranslationResponse {
            message: SUCCESS_MESSAGE,
            transcript: "hello".to_string(),
            translated_text: "hola".to_string(),
            language: "es".to_string(),
            audio_url: "/static/a.mp3".to_string(),
        })
        .unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "message": SUCCESS_MESSAGE,
                "transcript": "hello",
                "translated_text": "hola",
                "language": "es",
                "audio_url": "/static/a.mp3",
            })
        );
    }
}
