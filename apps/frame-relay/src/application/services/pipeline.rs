//! Translation Pipeline
//!
//! Transcribe -> translate -> synthesize -> store. Each stage runs once; a
//! failing stage ends the run with a [`PipelineError`] naming that stage.

use std::sync::Arc;

use crate::application::ports::{
    AudioStore, SpeechError, SpeechSynthesizer, StoreError, Transcriber, Translator,
};
use crate::domain::speech::{
    AudioEncoding, AudioUpload, DEFAULT_LANGUAGE, TranslationOutcome, VoiceSelection,
    translation_instruction,
};

/// Translation pipeline error.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The request carried nothing to work on.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Speech-to-text failed.
    #[error("transcription failed: {0}")]
    Transcription(#[source] SpeechError),

    /// The translation model failed.
    #[error("translation failed: {0}")]
    Translation(#[source] SpeechError),

    /// Text-to-speech failed.
    #[error("speech synthesis failed: {0}")]
    Synthesis(#[source] SpeechError),

    /// The synthesized audio could not be stored.
    #[error("storing audio failed: {0}")]
    Storage(#[source] StoreError),
}

impl PipelineError {
    /// Stage label used for metrics and logs.
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "input",
            Self::Transcription(_) => "transcription",
            Self::Translation(_) => "translation",
            Self::Synthesis(_) => "synthesis",
            Self::Storage(_) => "storage",
        }
    }
}

/// Speech translation use case.
#[derive(Clone)]
pub struct TranslationPipeline {
    transcriber: Arc<dyn Transcriber>,
    translator: Arc<dyn Translator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    store: Arc<dyn AudioStore>,
    encoding: AudioEncoding,
}

impl std::fmt::Debug for TranslationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationPipeline")
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

impl TranslationPipeline {
    /// Wire the pipeline to its collaborators. Output is MP3.
    #[must_use]
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        translator: Arc<dyn Translator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        store: Arc<dyn AudioStore>,
    ) -> Self {
        Self {
            transcriber,
            translator,
            synthesizer,
            store,
            encoding: AudioEncoding::Mp3,
        }
    }

    /// Override the synthesized audio encoding.
    #[must_use]
    pub const fn with_encoding(mut self, encoding: AudioEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// The store synthesized audio is written to.
    #[must_use]
    pub fn store(&self) -> Arc<dyn AudioStore> {
        Arc::clone(&self.store)
    }

    /// Translate a recording into `language` and synthesize the result.
    ///
    /// A blank `language` means [`DEFAULT_LANGUAGE`].
    ///
    /// # Errors
    ///
    /// Returns the [`PipelineError`] of the first failing stage.
    pub async fn run(
        &self,
        audio: AudioUpload,
        language: &str,
    ) -> Result<TranslationOutcome, PipelineError> {
        if audio.is_empty() {
            return Err(PipelineError::InvalidInput("audio file is empty".to_string()));
        }

        let language = match language.trim() {
            "" => DEFAULT_LANGUAGE,
            lang => lang,
        };

        tracing::debug!(
            file_name = %audio.file_name,
            bytes = audio.data.len(),
            language,
            "Transcribing audio"
        );
        let transcript = self
            .transcriber
            .transcribe(audio, None)
            .await
            .map_err(PipelineError::Transcription)?;

        let translated_text = self
            .translator
            .translate(&translation_instruction(language), &transcript)
            .await
            .map_err(PipelineError::Translation)?
            .trim()
            .to_string();
        tracing::debug!(language, chars = translated_text.len(), "Translated transcript");

        let voice = VoiceSelection::for_language(language);
        let audio = self
            .synthesizer
            .synthesize(&translated_text, &voice, self.encoding)
            .await
            .map_err(PipelineError::Synthesis)?;

        let stored = self
            .store
            .store(audio, self.encoding)
            .await
            .map_err(PipelineError::Storage)?;
        tracing::info!(file = %stored.file_name, voice = %voice.name, "Synthesized translation");

        Ok(TranslationOutcome {
            transcript,
            translated_text,
            language: language.to_string(),
            audio_url: stored.url_path,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use mockall::predicate::{always, eq};

    use super::*;
    use crate::application::ports::{
        MockAudioStore, MockSpeechSynthesizer, MockTranscriber, MockTranslator, StoredAudio,
    };

    fn upload() -> AudioUpload {
        AudioUpload::new(Bytes::from_static(b"OggS..."), Some("clip.webm".into()), None)
    }

    fn transport_error(service: &'static str) -> SpeechError {
        SpeechError::Transport {
            service,
            message: "connection refused".to_string(),
        }
    }

    struct Mocks {
        transcriber: MockTranscriber,
        translator: MockTranslator,
        synthesizer: MockSpeechSynthesizer,
        store: MockAudioStore,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                transcriber: MockTranscriber::new(),
                translator: MockTranslator::new(),
                synthesizer: MockSpeechSynthesizer::new(),
                store: MockAudioStore::new(),
            }
        }

        fn build(self) -> TranslationPipeline {
            TranslationPipeline::new(
                Arc::new(self.transcriber),
                Arc::new(self.translator),
                Arc::new(self.synthesizer),
                Arc::new(self.store),
            )
        }
    }

    #[tokio::test]
    async fn runs_all_stages_in_order() {
        let mut mocks = Mocks::new();
        mocks
            .transcriber
            .expect_transcribe()
            .withf(|audio, hint| audio.file_name == "clip.webm" && hint.is_none())
            .times(1)
            .returning(|_, _| Ok("good morning".to_string()));
        mocks
            .translator
            .expect_translate()
            .withf(|instruction, text| {
                instruction.contains("translates text to es.") && text == "good morning"
            })
            .times(1)
            .returning(|_, _| Ok("  buenos días \n".to_string()));
        mocks
            .synthesizer
            .expect_synthesize()
            .withf(|text, voice, encoding| {
                text == "buenos días"
                    && voice.name == "es-ES-Wavenet-D"
                    && *encoding == AudioEncoding::Mp3
            })
            .times(1)
            .returning(|_, _, _| Ok(Bytes::from_static(b"ID3")));
        mocks
            .store
            .expect_store()
            .with(eq(Bytes::from_static(b"ID3")), eq(AudioEncoding::Mp3))
            .times(1)
            .returning(|_, _| {
                Ok(StoredAudio {
                    file_name: "abc.mp3".to_string(),
                    url_path: "/static/abc.mp3".to_string(),
                })
            });

        let outcome = mocks.build().run(upload(), "es").await.unwrap();

        assert_eq!(
            outcome,
            TranslationOutcome {
                transcript: "good morning".to_string(),
                translated_text: "buenos días".to_string(),
                language: "es".to_string(),
                audio_url: "/static/abc.mp3".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn empty_audio_is_invalid_input() {
        let mut mocks = Mocks::new();
        mocks.transcriber.expect_transcribe().never();

        let audio = AudioUpload::new(Bytes::new(), None, None);
        let err = mocks.build().run(audio, "en").await.unwrap_err();

        assert!(matches!(err, PipelineError::InvalidInput(_)));
        assert_eq!(err.stage(), "input");
    }

    #[tokio::test]
    async fn transcription_failure_stops_the_run() {
        let mut mocks = Mocks::new();
        mocks
            .transcriber
            .expect_transcribe()
            .returning(|_, _| Err(transport_error("groq")));
        mocks.translator.expect_translate().never();

        let err = mocks.build().run(upload(), "en").await.unwrap_err();
        assert!(matches!(err, PipelineError::Transcription(_)));
    }

    #[tokio::test]
    async fn translation_failure_is_reported_as_translation() {
        let mut mocks = Mocks::new();
        mocks
            .transcriber
            .expect_transcribe()
            .returning(|_, _| Ok("hi".to_string()));
        mocks
            .translator
            .expect_translate()
            .returning(|_, _| Err(transport_error("groq")));
        mocks.synthesizer.expect_synthesize().never();

        let err = mocks.build().run(upload(), "fr").await.unwrap_err();
        assert_eq!(err.stage(), "translation");
    }

    #[tokio::test]
    async fn synthesis_failure_skips_storage() {
        let mut mocks = Mocks::new();
        mocks
            .transcriber
            .expect_transcribe()
            .returning(|_, _| Ok("hi".to_string()));
        mocks
            .translator
            .expect_translate()
            .returning(|_, _| Ok("salut".to_string()));
        mocks
            .synthesizer
            .expect_synthesize()
            .returning(|_, _, _| {
                Err(SpeechError::Api {
                    service: "google-tts",
                    status: 403,
                    message: "forbidden".to_string(),
                })
            });
        mocks.store.expect_store().never();

        let err = mocks.build().run(upload(), "fr").await.unwrap_err();
        assert!(matches!(err, PipelineError::Synthesis(SpeechError::Api { status: 403, .. })));
    }

    #[tokio::test]
    async fn storage_failure_is_reported_as_storage() {
        let mut mocks = Mocks::new();
        mocks
            .transcriber
            .expect_transcribe()
            .returning(|_, _| Ok("hi".to_string()));
        mocks
            .translator
            .expect_translate()
            .returning(|_, _| Ok("hallo".to_string()));
        mocks
            .synthesizer
            .expect_synthesize()
            .returning(|_, _, _| Ok(Bytes::from_static(b"ID3")));
        mocks
            .store
            .expect_store()
            .with(always(), always())
            .returning(|_, _| {
                Err(StoreError::Io(std::io::Error::other("disk full")))
            });

        let err = mocks.build().run(upload(), "de").await.unwrap_err();
        assert_eq!(err.stage(), "storage");
    }

    #[tokio::test]
    async fn blank_language_defaults_to_english() {
        let mut mocks = Mocks::new();
        mocks
            .transcriber
            .expect_transcribe()
            .returning(|_, _| Ok("hi".to_string()));
        mocks
            .translator
            .expect_translate()
            .withf(|instruction, _| instruction.contains("translates text to en."))
            .returning(|_, _| Ok("hi".to_string()));
        mocks
            .synthesizer
            .expect_synthesize()
            .withf(|_, voice, _| voice.name == "en-US-Wavenet-D")
            .returning(|_, _, _| Ok(Bytes::from_static(b"ID3")));
        mocks.store.expect_store().returning(|_, _| {
            Ok(StoredAudio {
                file_name: "x.mp3".to_string(),
                url_path: "/static/x.mp3".to_string(),
            })
        });

        let outcome = mocks.build().run(upload(), "  ").await.unwrap();
        assert_eq!(outcome.language, "en");
    }
}
