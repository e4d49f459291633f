//! Self-describing `data:<mime>;base64,<payload>` image references.
//!
//! Images cross every boundary of the pipeline in this form: uploaded photos,
//! watermark logos and service results are all stored in session state as
//! data URI strings and only parsed back into bytes where they are consumed.

use crate::error::{Result, SundaError};
use crate::generation::ImageFormat;
use base64::Engine;
use std::fmt;
use std::path::Path;

const SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// A decoded data URI: MIME type plus raw bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct DataUri {
    mime_type: String,
    data: Vec<u8>,
}

impl DataUri {
    /// Creates a data URI from a MIME type and raw bytes.
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Parses a `data:image/<type>;base64,<payload>` string.
    ///
    /// The subtype must be a single word (`png`, `jpeg`, `webp`, ...), so
    /// values such as `image/svg+xml` or non-image types are rejected.
    pub fn parse(input: &str) -> Result<Self> {
        let unsupported = |reason: &str| SundaError::UnsupportedImageEncoding(reason.to_string());

        let rest = input
            .strip_prefix(SCHEME)
            .ok_or_else(|| unsupported("missing 'data:' scheme"))?;
        let (mime_type, payload) = rest
            .split_once(BASE64_MARKER)
            .ok_or_else(|| unsupported("expected ';base64,' marker"))?;

        let subtype = mime_type
            .strip_prefix("image/")
            .ok_or_else(|| unsupported("MIME type is not an image type"))?;
        if subtype.is_empty() || !subtype.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(unsupported("malformed image subtype"));
        }
        if payload.trim().is_empty() {
            return Err(unsupported("empty payload"));
        }

        let data = decode_base64_lenient(payload)
            .map_err(|e| SundaError::UnsupportedImageEncoding(format!("invalid base64: {e}")))?;

        Ok(Self::new(mime_type, data))
    }

    /// Wraps raw image bytes, detecting the MIME type from magic bytes.
    pub fn from_image_bytes(data: Vec<u8>) -> Result<Self> {
        let format = ImageFormat::from_magic_bytes(&data).ok_or_else(|| {
            SundaError::UnsupportedImageEncoding("unrecognized image format".into())
        })?;
        Ok(Self::new(format.mime_type(), data))
    }

    /// Reads an image file fully into memory and wraps it as a data URI.
    ///
    /// The format is detected from the file contents, falling back to the
    /// file extension.
    pub async fn read_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;

        let format = ImageFormat::from_magic_bytes(&data)
            .or_else(|| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .and_then(ImageFormat::from_extension)
            })
            .ok_or_else(|| {
                SundaError::UnsupportedImageEncoding(format!(
                    "{} is not a PNG, JPEG, WebP or GIF image",
                    path.display()
                ))
            })?;

        tracing::debug!(path = %path.display(), bytes = data.len(), mime = format.mime_type(), "loaded image file");
        Ok(Self::new(format.mime_type(), data))
    }

    /// Returns the MIME type (e.g. `image/png`).
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Returns the decoded bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the value, returning the decoded bytes.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Returns the payload re-encoded as standard base64.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}{}{BASE64_MARKER}{}", self.mime_type, self.to_base64())
    }
}

impl fmt::Debug for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataUri")
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl std::str::FromStr for DataUri {
    type Err = SundaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Decodes base64 that may carry embedded whitespace or lack padding.
fn decode_base64_lenient(input: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    let cleaned: String = input.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    if let Ok(data) = base64::engine::general_purpose::STANDARD.decode(&cleaned) {
        return Ok(data);
    }

    base64::engine::general_purpose::STANDARD_NO_PAD.decode(&cleaned)
}
