//! Frame Types
//!
//! An accepted [`Frame`] is one encoded image pushed by a producer. Before it
//! reaches any subscriber it is turned into an [`EncodedFrame`]: a
//! self-describing `data:` URI that is computed once and shared by every
//! subscriber in the fan-out round.
//!
//! # Validation
//!
//! - empty payloads are rejected
//! - payloads larger than [`FrameLimits::max_frame_bytes`] are rejected
//! - a declared media type must be a well-formed `image/*` type
//!
//! When no media type is declared it is sniffed from the payload's magic
//! bytes; unknown signatures are relayed as `image/jpeg`.

use std::fmt;
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use chrono::{DateTime, Utc};

// =============================================================================
// Errors
// =============================================================================

/// Reasons a submitted frame is rejected at the ingress boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The payload contained no bytes.
    #[error("frame payload is empty")]
    Empty,

    /// The payload exceeds the configured size limit.
    #[error("frame payload is {size} bytes, limit is {limit}")]
    TooLarge {
        /// Payload size in bytes.
        size: usize,
        /// Configured limit in bytes.
        limit: usize,
    },

    /// The declared media type is not an image type usable in a data URI.
    #[error("unsupported media type: {0:?}")]
    UnsupportedMediaType(String),
}

impl FrameError {
    /// Name of the request field the error refers to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::Empty | Self::TooLarge { .. } => "image_data",
            Self::UnsupportedMediaType(_) => "media_type",
        }
    }

    /// Short label used for metrics.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::TooLarge { .. } => "too_large",
            Self::UnsupportedMediaType(_) => "media_type",
        }
    }
}

// =============================================================================
// Media Type
// =============================================================================

/// Image media type carried in the data URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImageMediaType {
    /// `image/jpeg`
    Jpeg,
    /// `image/png`
    Png,
    /// `image/gif`
    Gif,
    /// `image/webp`
    Webp,
    /// `image/bmp`
    Bmp,
    /// Any other declared `image/*` type, lowercased.
    Other(String),
}

impl ImageMediaType {
    /// Sniff the media type from the payload's leading bytes.
    ///
    /// Returns `None` when the signature is not recognised.
    #[must_use]
    pub fn sniff(data: &[u8]) -> Option<Self> {
        match data {
            [0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(Self::Png),
            [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some(Self::Gif),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(Self::Webp),
            [b'B', b'M', ..] => Some(Self::Bmp),
            _ => None,
        }
    }

    /// Parse a declared media type.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnsupportedMediaType`] unless the value is a
    /// single `image/<subtype>` token without parameters.
    pub fn parse(declared: &str) -> Result<Self, FrameError> {
        let normalized = declared.trim().to_ascii_lowercase();
        let Some(subtype) = normalized.strip_prefix("image/") else {
            return Err(FrameError::UnsupportedMediaType(declared.to_string()));
        };

        let well_formed = !subtype.is_empty()
            && subtype
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-'));
        if !well_formed {
            return Err(FrameError::UnsupportedMediaType(declared.to_string()));
        }

        Ok(match subtype {
            "jpeg" | "jpg" | "pjpeg" => Self::Jpeg,
            "png" => Self::Png,
            "gif" => Self::Gif,
            "webp" => Self::Webp,
            "bmp" => Self::Bmp,
            _ => Self::Other(normalized),
        })
    }

    /// The `type/subtype` string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Bmp => "image/bmp",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for ImageMediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Limits applied to submitted frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLimits {
    /// Largest accepted payload in bytes.
    pub max_frame_bytes: usize,
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self {
            max_frame_bytes: 4 * 1024 * 1024,
        }
    }
}

/// Validate a payload and resolve its media type.
///
/// An empty `declared_media_type` means "not declared".
///
/// # Errors
///
/// Returns a [`FrameError`] describing the first violated rule.
pub fn validate(
    data: &[u8],
    declared_media_type: &str,
    limits: &FrameLimits,
) -> Result<ImageMediaType, FrameError> {
    if data.is_empty() {
        return Err(FrameError::Empty);
    }

    if data.len() > limits.max_frame_bytes {
        return Err(FrameError::TooLarge {
            size: data.len(),
            limit: limits.max_frame_bytes,
        });
    }

    if declared_media_type.trim().is_empty() {
        return Ok(ImageMediaType::sniff(data).unwrap_or(ImageMediaType::Jpeg));
    }

    ImageMediaType::parse(declared_media_type)
}

// =============================================================================
// Frame
// =============================================================================

/// One accepted image frame.
#[derive(Debug, Clone)]
pub struct Frame {
    sequence: u64,
    data: Bytes,
    media_type: ImageMediaType,
    received_at: DateTime<Utc>,
}

impl Frame {
    /// Create a frame from an already validated payload.
    #[must_use]
    pub fn new(sequence: u64, data: Bytes, media_type: ImageMediaType) -> Self {
        Self {
            sequence,
            data,
            media_type,
            received_at: Utc::now(),
        }
    }

    /// Relay-assigned sequence number.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Raw image bytes.
    #[must_use]
    pub const fn data(&self) -> &Bytes {
        &self.data
    }

    /// Resolved media type.
    #[must_use]
    pub const fn media_type(&self) -> &ImageMediaType {
        &self.media_type
    }

    /// Arrival time at the ingress.
    #[must_use]
    pub const fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Encode the frame for subscribers.
    #[must_use]
    pub fn encode(&self) -> EncodedFrame {
        EncodedFrame::from_frame(self)
    }
}

/// Wire-ready text pushed to subscribers: `data:<type>;base64,<payload>`.
///
/// Cloning is cheap; every subscriber in a fan-out round shares the same
/// allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    sequence: u64,
    received_at: DateTime<Utc>,
    data_uri: Arc<str>,
}

impl EncodedFrame {
    /// Build the data URI for a frame.
    #[must_use]
    pub fn from_frame(frame: &Frame) -> Self {
        let media_type = frame.media_type.as_str();
        let encoded_len = frame.data.len().div_ceil(3) * 4;

        let mut data_uri =
            String::with_capacity("data:;base64,".len() + media_type.len() + encoded_len);
        data_uri.push_str("data:");
        data_uri.push_str(media_type);
        data_uri.push_str(";base64,");
        general_purpose::STANDARD.encode_string(&frame.data, &mut data_uri);

        Self {
            sequence: frame.sequence,
            received_at: frame.received_at,
            data_uri: data_uri.into(),
        }
    }

    /// Sequence number of the source frame.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Arrival time of the source frame.
    #[must_use]
    pub const fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// The data URI text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.data_uri
    }

    /// Length of the data URI in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data_uri.len()
    }

    /// Always false for frames built from validated payloads.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data_uri.is_empty()
    }

    /// Whether two encoded frames share the same text allocation.
    #[must_use]
    pub fn shares_text_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data_uri, &other.data_uri)
    }
}

// =============================================================================
// Tests
// =============================================================================
