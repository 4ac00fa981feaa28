//! Configuration Module
//!
//! Configuration loading for the relay service.

mod settings;

pub use settings::{
    ConfigError, DEFAULT_GOOGLE_TTS_BASE_URL, DEFAULT_GROQ_BASE_URL, GatewaySettings,
    IngressSettings, RelayConfig, ServerSettings, SpeechCredentials, SpeechSettings,
};
