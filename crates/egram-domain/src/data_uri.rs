//! `data:` URI encoding of file contents.
//!
//! Stored files are kept as text, so the raw bytes are wrapped as
//! `data:<mime>;base64,<payload>`. The MIME type travels with the payload, which keeps a
//! stored record self-describing even if its metadata fields are lost.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

const SCHEME: &str = "data:";
const BASE64_SEPARATOR: &str = ";base64,";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataUriError {
    #[error("missing data: scheme")]
    MissingScheme,
    #[error("missing payload separator")]
    MissingSeparator,
    #[error("payload is not base64 encoded")]
    NotBase64,
    #[error("invalid base64 payload: {0}")]
    InvalidPayload(String),
}

/// Decoded contents of a data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl DataUri {
    pub fn encode(mime_type: &str, bytes: &[u8]) -> String {
        let mut out = String::with_capacity(
            SCHEME.len() + mime_type.len() + BASE64_SEPARATOR.len() + bytes.len().div_ceil(3) * 4,
        );
        out.push_str(SCHEME);
        out.push_str(mime_type);
        out.push_str(BASE64_SEPARATOR);
        STANDARD.encode_string(bytes, &mut out);
        out
    }

    /// The MIME type may itself contain commas inside quoted parameters, so the payload
    /// starts after the last `;base64,`. Base64 never contains `;` or `,`.
    pub fn decode(uri: &str) -> Result<Self, DataUriError> {
        let rest = uri.strip_prefix(SCHEME).ok_or(DataUriError::MissingScheme)?;
        if !rest.contains(',') {
            return Err(DataUriError::MissingSeparator);
        }
        let (mime_type, payload) = rest
            .rsplit_once(BASE64_SEPARATOR)
            .ok_or(DataUriError::NotBase64)?;
        let bytes = STANDARD
            .decode(payload)
            .map_err(|e| DataUriError::InvalidPayload(e.to_string()))?;
        Ok(Self {
            mime_type: mime_type.to_owned(),
            bytes,
        })
    }
}
