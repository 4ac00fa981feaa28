//! Mapping of HTTP failures onto [`SpeechError`].

use reqwest::Response;
use serde::Deserialize;

use crate::application::ports::SpeechError;

/// `{"error": {"message": "..."}}`, used by both the OpenAI-compatible and
/// the Google APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub(super) fn transport(service: &'static str, error: &reqwest::Error) -> SpeechError {
    let message = if error.is_timeout() {
        "request timed out".to_string()
    } else {
        error.to_string()
    };
    SpeechError::Transport { service, message }
}

pub(super) fn invalid_response(service: &'static str, message: impl Into<String>) -> SpeechError {
    SpeechError::InvalidResponse {
        service,
        message: message.into(),
    }
}

/// Pass successful responses through, turn the rest into [`SpeechError::Api`].
pub(super) async fn check_status(
    service: &'static str,
    response: Response,
) -> Result<Response, SpeechError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map_or(body, |envelope| envelope.error.message);

    Err(SpeechError::Api {
        service,
        status: status.as_u16(),
        message,
    })
}
