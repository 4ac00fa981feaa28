//! Relay Configuration Settings
//!
//! Configuration types for the frame relay, loaded from environment variables.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::frame::FrameLimits;

/// Default Groq API base URL.
pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com";

/// Default Google Text-to-Speech API base URL.
pub const DEFAULT_GOOGLE_TTS_BASE_URL: &str = "https://texttospeech.googleapis.com";

/// API keys of the hosted speech collaborators.
#[derive(Clone)]
pub struct SpeechCredentials {
    groq_api_key: String,
    google_tts_api_key: String,
}

impl SpeechCredentials {
    /// Create new credentials.
    #[must_use]
    pub const fn new(groq_api_key: String, google_tts_api_key: String) -> Self {
        Self {
            groq_api_key,
            google_tts_api_key,
        }
    }

    /// Get the Groq API key.
    #[must_use]
    pub fn groq_api_key(&self) -> &str {
        &self.groq_api_key
    }

    /// Get the Google TTS API key.
    #[must_use]
    pub fn google_tts_api_key(&self) -> &str {
        &self.google_tts_api_key
    }
}

impl std::fmt::Debug for SpeechCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechCredentials")
            .field("groq_api_key", &"[REDACTED]")
            .field("google_tts_api_key", &"[REDACTED]")
            .finish()
    }
}

/// Listener settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Address all listeners bind to.
    pub bind_addr: IpAddr,
    /// gRPC ingress port.
    pub grpc_port: u16,
    /// WebSocket gateway HTTP port.
    pub gateway_port: u16,
    /// Health check HTTP port.
    pub health_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            grpc_port: 50051,
            gateway_port: 8000,
            health_port: 8082,
        }
    }
}

impl ServerSettings {
    /// gRPC listen address.
    #[must_use]
    pub const fn grpc_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.grpc_port)
    }

    /// Gateway listen address.
    #[must_use]
    pub const fn gateway_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.gateway_port)
    }

    /// Health listen address.
    #[must_use]
    pub const fn health_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.health_port)
    }
}

/// Subscriber connection settings.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Frames buffered per subscriber before new frames are dropped.
    pub subscriber_queue_capacity: usize,
    /// Longest a single WebSocket write may take.
    pub write_timeout: Duration,
    /// Interval between server pings.
    pub ping_interval: Duration,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            subscriber_queue_capacity: 16,
            write_timeout: Duration::from_millis(5000),
            ping_interval: Duration::from_secs(30),
        }
    }
}

/// Frame ingress settings.
#[derive(Debug, Clone)]
pub struct IngressSettings {
    /// Largest accepted frame payload in bytes.
    pub max_frame_bytes: usize,
}

impl Default for IngressSettings {
    fn default() -> Self {
        Self {
            max_frame_bytes: FrameLimits::default().max_frame_bytes,
        }
    }
}

impl From<&IngressSettings> for FrameLimits {
    fn from(settings: &IngressSettings) -> Self {
        Self {
            max_frame_bytes: settings.max_frame_bytes,
        }
    }
}

/// Speech translation settings.
#[derive(Debug, Clone)]
pub struct SpeechSettings {
    /// API keys.
    pub credentials: SpeechCredentials,
    /// Groq API base URL.
    pub groq_base_url: String,
    /// Google TTS API base URL.
    pub google_tts_base_url: String,
    /// Directory synthesized audio is written to.
    pub static_dir: PathBuf,
    /// Per-request timeout for collaborator calls.
    pub request_timeout: Duration,
}

impl SpeechSettings {
    /// Settings with default endpoints for the given credentials.
    #[must_use]
    pub fn new(credentials: SpeechCredentials) -> Self {
        Self {
            credentials,
            groq_base_url: DEFAULT_GROQ_BASE_URL.to_string(),
            google_tts_base_url: DEFAULT_GOOGLE_TTS_BASE_URL.to_string(),
            static_dir: PathBuf::from("static"),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Complete relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Listener settings.
    pub server: ServerSettings,
    /// Subscriber connection settings.
    pub gateway: GatewaySettings,
    /// Frame ingress settings.
    pub ingress: IngressSettings,
    /// Longest the supervisor waits for in-flight work at shutdown.
    pub shutdown_timeout: Duration,
    /// Speech translation, enabled when both API keys are set.
    pub speech: Option<SpeechSettings>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            gateway: GatewaySettings::default(),
            ingress: IngressSettings::default(),
            shutdown_timeout: Duration::from_secs(10),
            speech: None,
        }
    }
}

impl RelayConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unusable value, or if
    /// only one of the speech API keys is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// See [`RelayConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let env = EnvSource(lookup);

        let bind_addr = match env.get("RELAY_BIND_ADDR") {
            Some(value) => value
                .trim()
                .parse::<IpAddr>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "RELAY_BIND_ADDR".to_string(),
                    value,
                })?,
            None => defaults.server.bind_addr,
        };

        let server = ServerSettings {
            bind_addr,
            grpc_port: env.parse_or("GRPC_PORT", defaults.server.grpc_port),
            gateway_port: env.parse_or("RELAY_GATEWAY_PORT", defaults.server.gateway_port),
            health_port: env.parse_or("RELAY_HEALTH_PORT", defaults.server.health_port),
        };

        let subscriber_queue_capacity = env.parse_or(
            "RELAY_SUBSCRIBER_QUEUE_CAPACITY",
            defaults.gateway.subscriber_queue_capacity,
        );
        if subscriber_queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "RELAY_SUBSCRIBER_QUEUE_CAPACITY".to_string(),
                value: "0".to_string(),
            });
        }

        let gateway = GatewaySettings {
            subscriber_queue_capacity,
            write_timeout: env
                .parse::<u64>("RELAY_WRITE_TIMEOUT_MS")
                .filter(|&ms| ms > 0)
                .map_or(defaults.gateway.write_timeout, Duration::from_millis),
            ping_interval: env
                .parse::<u64>("RELAY_PING_INTERVAL_SECS")
                .filter(|&secs| secs > 0)
                .map_or(defaults.gateway.ping_interval, Duration::from_secs),
        };

        let max_frame_bytes =
            env.parse_or("RELAY_MAX_FRAME_BYTES", defaults.ingress.max_frame_bytes);
        if max_frame_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "RELAY_MAX_FRAME_BYTES".to_string(),
                value: "0".to_string(),
            });
        }
        let ingress = IngressSettings { max_frame_bytes };

        let shutdown_timeout = env
            .parse::<u64>("RELAY_SHUTDOWN_TIMEOUT_SECS")
            .map_or(defaults.shutdown_timeout, Duration::from_secs);

        Ok(Self {
            server,
            gateway,
            ingress,
            shutdown_timeout,
            speech: speech_from(&env)?,
        })
    }

    /// Whether the speech translation routes are enabled.
    #[must_use]
    pub const fn speech_enabled(&self) -> bool {
        self.speech.is_some()
    }
}

fn speech_from<F>(env: &EnvSource<F>) -> Result<Option<SpeechSettings>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let groq = env.get("GROQ_API_KEY");
    let google = env.get("GOOGLE_TTS_API_KEY");

    let (groq_api_key, google_tts_api_key) = match (groq, google) {
        (None, None) => return Ok(None),
        (Some(_), None) => return Err(ConfigError::MissingEnvVar("GOOGLE_TTS_API_KEY".to_string())),
        (None, Some(_)) => return Err(ConfigError::MissingEnvVar("GROQ_API_KEY".to_string())),
        (Some(groq), Some(google)) => (groq, google),
    };

    if groq_api_key.trim().is_empty() {
        return Err(ConfigError::EmptyValue("GROQ_API_KEY".to_string()));
    }

    if google_tts_api_key.trim().is_empty() {
        return Err(ConfigError::EmptyValue("GOOGLE_TTS_API_KEY".to_string()));
    }

    let mut settings = SpeechSettings::new(SpeechCredentials::new(groq_api_key, google_tts_api_key));
    if let Some(url) = env.get("GROQ_BASE_URL") {
        settings.groq_base_url = url;
    }
    if let Some(url) = env.get("GOOGLE_TTS_BASE_URL") {
        settings.google_tts_base_url = url;
    }
    if let Some(dir) = env.get("SPEECH_STATIC_DIR") {
        settings.static_dir = PathBuf::from(dir);
    }
    settings.request_timeout = env
        .parse::<u64>("SPEECH_TIMEOUT_SECS")
        .map_or(settings.request_timeout, Duration::from_secs);

    Ok(Some(settings))
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable cannot be used.
    #[error("invalid value for environment variable {key}: {value:?}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Offending value.
        value: String,
    },
}

struct EnvSource<F>(F);

impl<F> EnvSource<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    fn parse<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }

    fn parse_or<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.parse(key).unwrap_or(default)
    }
}
