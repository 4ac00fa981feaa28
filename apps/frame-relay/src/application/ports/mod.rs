//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `Transcriber`: speech-to-text
//! - `Translator`: chat model used for translation
//! - `SpeechSynthesizer`: text-to-speech
//! - `AudioStore`: write-once storage for synthesized audio
//!
//! The subscriber send capability (`FrameSink`) lives next to the registry
//! in `domain::registry`.

mod audio_store_port;
mod speech_port;

pub use audio_store_port::{AudioStore, StoreError, StoredAudio};
pub use speech_port::{SpeechError, SpeechSynthesizer, Transcriber, Translator};

#[cfg(test)]
pub use audio_store_port::MockAudioStore;
#[cfg(test)]
pub use speech_port::{MockSpeechSynthesizer, MockTranscriber, MockTranslator};
