//! Speech Translation Integration Tests
//!
//! Runs the `/audio-input` and `/static` routes against real HTTP clients
//! pointed at mock Groq and Google TTS servers.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use base64::{Engine as _, engine::general_purpose};
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use frame_relay::infrastructure::speech;
use frame_relay::{SpeechCredentials, SpeechSettings};

const BOUNDARY: &str = "frame-relay-test";
const MP3: &[u8] = b"ID3\x04\x00synthesized";

struct Backends {
    groq: MockServer,
    tts: MockServer,
    static_dir: TempDir,
}

impl Backends {
    async fn start() -> Self {
        Self {
            groq: MockServer::start().await,
            tts: MockServer::start().await,
            static_dir: tempfile::tempdir().unwrap(),
        }
    }

    async fn app(&self) -> Router {
        let mut settings = SpeechSettings::new(SpeechCredentials::new(
            "gsk_test".to_string(),
            "AIza_test".to_string(),
        ));
        settings.groq_base_url = self.groq.uri();
        settings.google_tts_base_url = self.tts.uri();
        settings.static_dir = self.static_dir.path().to_path_buf();
        settings.request_timeout = Duration::from_secs(5);

        let pipeline = speech::build_pipeline(&settings).await.unwrap();
        speech::router(Arc::new(pipeline))
    }

    async fn mount_happy_path(&self) {
        Mock::given(method("POST"))
            .and(path("/openai/v1/audio/transcriptions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "text": "where is the station" })),
            )
            .mount(&self.groq)
            .await;
        Mock::given(method("POST"))
            .and(path("/openai/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "où est la gare\n" } }]
            })))
            .mount(&self.groq)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/text:synthesize"))
            .and(query_param("key", "AIza_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "audioContent": general_purpose::STANDARD.encode(MP3)
            })))
            .mount(&self.tts)
            .await;
    }
}

fn upload(language: Option<&str>) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"audio\"; filename=\"clip.webm\"\r\nContent-Type: audio/webm\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"\x1aE\xdf\xa3webm-audio");
    body.extend_from_slice(b"\r\n");
    if let Some(language) = language {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"language\"\r\n\r\n{language}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/audio-input")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json(response: axum::response::Response) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn translated_audio_is_stored_and_served() {
    let backends = Backends::start().await;
    backends.mount_happy_path().await;
    let app = backends.app().await;

    let response = app.clone().oneshot(upload(Some("fr"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json(response).await;
    assert_eq!(body["transcript"], "where is the station");
    assert_eq!(body["translated_text"], "où est la gare");
    assert_eq!(body["language"], "fr");

    let audio_url = body["audio_url"].as_str().unwrap().to_string();
    assert!(audio_url.starts_with("/static/"));
    assert!(audio_url.ends_with(".mp3"));

    let response = app
        .oneshot(Request::builder().uri(&audio_url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
    let audio = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&audio[..], MP3);
}

#[tokio::test]
async fn synthesis_failure_is_reported_per_stage() {
    let backends = Backends::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "text": "hi" })))
        .mount(&backends.groq)
        .await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "content": "hallo" } }]
        })))
        .mount(&backends.groq)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/text:synthesize"))
        .respond_with(ResponseTemplate::new(503).set_body_string("backend unavailable"))
        .mount(&backends.tts)
        .await;

    let response = backends.app().await.oneshot(upload(Some("de"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json(response).await["error"], "Failed to synthesize speech");
    assert_eq!(
        std::fs::read_dir(backends.static_dir.path()).unwrap().count(),
        0,
        "nothing is stored when synthesis fails"
    );
}

#[tokio::test]
async fn transcription_outage_is_internal_error() {
    let backends = Backends::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&backends.groq)
        .await;

    let response = backends.app().await.oneshot(upload(None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json(response).await["error"], "Failed to transcribe audio");
}

#[tokio::test]
async fn traversal_outside_static_dir_is_not_found() {
    let backends = Backends::start().await;
    let app = backends.app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/static/..%2FCargo.toml")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
