use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// A decoded `data:image/<subtype>;base64,<payload>` URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataUrl {
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DataUrlError {
    #[error("not a data URL")]
    NotDataUrl,

    #[error("unsupported media type {0:?}, only image/* is accepted")]
    UnsupportedMediaType(String),

    #[error("data URL is not base64-encoded")]
    NotBase64,

    #[error("data URL payload is empty")]
    Empty,

    #[error("invalid base64 payload: {0}")]
    InvalidBase64(String),
}

impl DataUrl {
    const SCHEME: &'static str = "data:";

    pub fn is_data_url(s: &str) -> bool {
        s.as_bytes()
            .get(..Self::SCHEME.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(Self::SCHEME.as_bytes()))
    }

    pub fn parse(s: &str) -> Result<Self, DataUrlError> {
        if !Self::is_data_url(s) {
            return Err(DataUrlError::NotDataUrl);
        }
        let rest = &s[Self::SCHEME.len()..];
        let (header, payload) = rest.split_once(',').ok_or(DataUrlError::NotBase64)?;
        let mime = header
            .strip_suffix(";base64")
            .ok_or(DataUrlError::NotBase64)?;

        let subtype = mime
            .strip_prefix("image/")
            .ok_or_else(|| DataUrlError::UnsupportedMediaType(mime.to_string()))?;
        // Plain alphabetic subtypes only; rules out svg+xml and other scriptable forms.
        if subtype.is_empty() || !subtype.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(DataUrlError::UnsupportedMediaType(mime.to_string()));
        }

        let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        if compact.is_empty() {
            return Err(DataUrlError::Empty);
        }
        let bytes = STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| DataUrlError::InvalidBase64(e.to_string()))?;

        Ok(Self {
            mime: mime.to_ascii_lowercase(),
            bytes,
        })
    }
}
