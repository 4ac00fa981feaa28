//! Speech Translation Adapters
//!
//! Concrete collaborators of the translation pipeline and its HTTP routes:
//!
//! - `groq`: transcription (Whisper) and translation (chat completions)
//! - `google_tts`: speech synthesis
//! - `store`: synthesized audio on the local filesystem
//! - `routes`: `POST /audio-input` and `GET /static/{file}`

mod error;
pub mod google_tts;
pub mod groq;
pub mod routes;
pub mod store;

use std::sync::Arc;

pub use google_tts::GoogleTtsClient;
pub use groq::GroqClient;
pub use routes::router;
pub use store::LocalAudioStore;

use crate::application::ports::{SpeechError, StoreError, Transcriber};
use crate::application::services::TranslationPipeline;
use crate::infrastructure::config::SpeechSettings;

/// Errors raised while wiring the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum SpeechSetupError {
    /// An HTTP client could not be built.
    #[error("speech client: {0}")]
    Client(#[from] SpeechError),

    /// The static directory could not be prepared.
    #[error("audio store: {0}")]
    Store(#[from] StoreError),
}

/// Build the translation pipeline from settings.
///
/// # Errors
///
/// Returns `SpeechSetupError` if a client or the audio store cannot be set up.
pub async fn build_pipeline(
    settings: &SpeechSettings,
) -> Result<TranslationPipeline, SpeechSetupError> {
    let groq = Arc::new(GroqClient::new(
        settings.credentials.groq_api_key(),
        &settings.groq_base_url,
        settings.request_timeout,
    )?);
    let tts = GoogleTtsClient::new(
        settings.credentials.google_tts_api_key(),
        &settings.google_tts_base_url,
        settings.request_timeout,
    )?;
    let store = LocalAudioStore::open(&settings.static_dir).await?;

    tracing::info!(
        static_dir = %store.dir().display(),
        groq = %settings.groq_base_url,
        tts = %settings.google_tts_base_url,
        "Speech translation enabled"
    );

    let transcriber: Arc<dyn Transcriber> = groq.clone();
    Ok(TranslationPipeline::new(
        transcriber,
        groq,
        Arc::new(tts),
        Arc::new(store),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::SpeechCredentials;

    #[tokio::test]
    async fn build_pipeline_prepares_static_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = SpeechSettings::new(SpeechCredentials::new(
            "gsk".to_string(),
            "AIza".to_string(),
        ));
        settings.static_dir = dir.path().join("static");

        build_pipeline(&settings).await.unwrap();

        assert!(settings.static_dir.is_dir());
    }
}
