//! Image payloads and their `data:` URI form.

use base64::Engine;
use base64::engine::general_purpose;

/// Raw image bytes with their declared media type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImagePayload {
    /// Declared media type, eg `image/jpeg`.
    pub mime_type: String,
    /// Encoded image bytes.
    pub bytes: Vec<u8>,
}

/// Errors returned when parsing a data URI.
#[derive(Debug, PartialEq, Eq)]
pub enum DataUriError {
    /// Missing the `data:` scheme or the `,` separator.
    Malformed,
    /// Only base64 payloads are accepted.
    NotBase64,
    /// The media type is not an image.
    NotAnImage(String),
    /// The payload could not be decoded.
    InvalidBase64(String),
}

impl std::fmt::Display for DataUriError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed => write!(f, "Malformed data URI"),
            Self::NotBase64 => write!(f, "Data URI must be base64 encoded"),
            Self::NotAnImage(mime) => write!(f, "Data URI media type is not an image: {mime}"),
            Self::InvalidBase64(err) => write!(f, "Invalid base64 payload: {err}"),
        }
    }
}

impl std::error::Error for DataUriError {}

impl ImagePayload {
    /// Wraps bytes with a media type.
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Parses `data:<mime>;base64,<payload>`.
    pub fn from_data_uri(uri: &str) -> Result<Self, DataUriError> {
        let rest = uri
            .trim()
            .strip_prefix("data:")
            .ok_or(DataUriError::Malformed)?;
        let (header, data) = rest.split_once(',').ok_or(DataUriError::Malformed)?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or(DataUriError::NotBase64)?
            .trim()
            .to_ascii_lowercase();
        if !mime_type.starts_with("image/") {
            return Err(DataUriError::NotAnImage(mime_type));
        }
        let bytes = general_purpose::STANDARD
            .decode(data.trim())
            .map_err(|err| DataUriError::InvalidBase64(err.to_string()))?;
        Ok(Self { mime_type, bytes })
    }

    /// Renders the payload as a data URI.
    pub fn to_data_uri(&self) -> String {
        data_uri(&self.mime_type, &self.to_base64())
    }

    /// Base64 form of the bytes, as the upstream expects for inline data.
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.bytes)
    }

    /// True when there is nothing to send.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Joins a media type and an already-encoded base64 payload.
pub fn data_uri(mime_type: &str, base64_data: &str) -> String {
    format!("data:{mime_type};base64,{base64_data}")
}
