//! Error types for request composition, generation and compositing.

use std::time::Duration;

/// Longest provider error body kept in an error message.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Errors that can occur anywhere in the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum SundaError {
    /// The selection cannot be turned into a request (e.g. empty custom prompt).
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    /// An option value (theme, accessory, model, aspect ratio) was not recognized,
    /// or an operation was requested without the input it needs.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A stored image reference is not a `data:image/<type>;base64,<payload>` string.
    #[error("unsupported image encoding: {0}")]
    UnsupportedImageEncoding(String),

    /// The compositor could not decode the base image or the logo.
    #[error("failed to decode image: {0}")]
    ImageDecode(String),

    /// The compositor could not serialize its output.
    #[error("failed to encode image: {0}")]
    ImageEncode(String),

    /// A generation request is already in flight for this session.
    #[error("a generation request is already in progress")]
    Busy,

    /// API key missing or rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Delay requested by the service, if any.
        retry_after: Option<Duration>,
    },

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// The service answered, but without a usable image.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (reading inputs, writing exports).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of [`SundaError`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Custom theme without a prompt.
    InvalidSelection,
    /// Unrecognized option value or missing input.
    InvalidRequest,
    /// Malformed data URI.
    UnsupportedImageEncoding,
    /// The generation service failed or returned no image.
    GenerationService,
    /// Base image or logo could not be decoded/encoded.
    ImageDecode,
    /// Local file input/output failed.
    Io,
    /// Another request is still in flight.
    Busy,
}

impl SundaError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSelection(_) => ErrorKind::InvalidSelection,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::UnsupportedImageEncoding(_) => ErrorKind::UnsupportedImageEncoding,
            Self::ImageDecode(_) | Self::ImageEncode(_) => ErrorKind::ImageDecode,
            Self::Busy => ErrorKind::Busy,
            Self::Io(_) => ErrorKind::Io,
            Self::Auth(_)
            | Self::Api { .. }
            | Self::RateLimited { .. }
            | Self::ContentBlocked(_)
            | Self::UnexpectedResponse(_)
            | Self::Network(_)
            | Self::Json(_) => ErrorKind::GenerationService,
        }
    }

    /// Returns true if the generation service is responsible for this error.
    pub fn is_generation_service_error(&self) -> bool {
        self.kind() == ErrorKind::GenerationService
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, SundaError>;

/// Collapses whitespace in a provider error body and caps its length.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= MAX_ERROR_MESSAGE_LEN {
        return collapsed;
    }
    let mut truncated: String = collapsed.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
    truncated.push_str("...");
    truncated
}

/// Reads a `Retry-After` header expressed in whole seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
