use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use url::Url;
use zap_types::ContentKind;

use crate::data_url::DataUrl;
use crate::error::{ZapError, ZapResult};

const MAX_NAME_LEN: usize = 255;
const MAX_PASSWORD_LEN: usize = 1024;

/// An uploaded file as received at the boundary.
#[derive(Clone, Debug, Default)]
pub struct FileUpload {
    pub bytes: Bytes,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

impl FileUpload {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            ..Default::default()
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Best guess at the content kind from the declared media type.
    fn sniff_kind(&self) -> ContentKind {
        let ct = self.content_type.as_deref().unwrap_or_default();
        if ct.starts_with("image/") {
            ContentKind::Image
        } else if ct.starts_with("video/") {
            ContentKind::Video
        } else if ct.starts_with("audio/") {
            ContentKind::Audio
        } else if ct == "application/pdf" {
            ContentKind::Pdf
        } else {
            ContentKind::File
        }
    }
}

/// Raw creation request, as collected from a form or API body.
///
/// Every scalar is kept as the submitted text; [`CreateZapInput::validate`]
/// is the single place it gets interpreted.
#[derive(Clone, Debug, Default)]
pub struct CreateZapInput {
    pub kind: Option<String>,
    pub name: Option<String>,
    pub file: Option<FileUpload>,
    pub original_url: Option<String>,
    pub password: Option<String>,
    pub view_limit: Option<String>,
    pub expires_at: Option<String>,
    pub self_destruct: Option<String>,
}

/// What a zap carries.
#[derive(Clone, Debug)]
pub enum ZapContent {
    File(FileUpload),
    Url(String),
}

/// A validated creation request.
#[derive(Clone, Debug)]
pub struct NewZap {
    pub kind: ContentKind,
    pub name: Option<String>,
    pub content: ZapContent,
    pub password: Option<String>,
    pub view_limit: Option<u32>,
    pub expires_at: Option<DateTime<Utc>>,
    pub self_destruct: bool,
}

impl NewZap {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            kind: ContentKind::Url,
            name: None,
            content: ZapContent::Url(url.into()),
            password: None,
            view_limit: None,
            expires_at: None,
            self_destruct: false,
        }
    }

    pub fn file(kind: ContentKind, upload: FileUpload) -> Self {
        Self {
            kind,
            content: ZapContent::File(upload),
            ..Self::url("")
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_view_limit(mut self, limit: u32) -> Self {
        self.view_limit = Some(limit);
        self
    }

    pub fn with_expiry(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    pub fn self_destructing(mut self) -> Self {
        self.self_destruct = true;
        self
    }
}

impl CreateZapInput {
    /// Interpret the raw fields. Blank strings count as absent.
    pub fn validate(self) -> ZapResult<NewZap> {
        let declared_kind = non_blank(self.kind)
            .map(|k| {
                k.parse::<ContentKind>()
                    .map_err(|_| ZapError::Validation(format!("unknown type {k:?}")))
            })
            .transpose()?;

        let url = non_blank(self.original_url);
        // A file takes precedence over a URL submitted alongside it.
        let (content, kind) = match (self.file, url) {
            (None, None) => {
                return Err(ZapError::Validation(
                    "either a file or a URL is required".into(),
                ))
            }
            (Some(file), _) => {
                if file.bytes.is_empty() {
                    return Err(ZapError::Validation("uploaded file is empty".into()));
                }
                let kind = declared_kind.unwrap_or_else(|| file.sniff_kind());
                (ZapContent::File(file), kind)
            }
            (None, Some(url)) => {
                validate_url(&url)?;
                (ZapContent::Url(url), declared_kind.unwrap_or(ContentKind::Url))
            }
        };

        let name = non_blank(self.name);
        if name.as_ref().is_some_and(|n| n.chars().count() > MAX_NAME_LEN) {
            return Err(ZapError::Validation(format!(
                "name exceeds {MAX_NAME_LEN} characters"
            )));
        }

        let password = self.password.filter(|p| !p.is_empty());
        if password.as_ref().is_some_and(|p| p.len() > MAX_PASSWORD_LEN) {
            return Err(ZapError::Validation("password is too long".into()));
        }

        let view_limit = non_blank(self.view_limit)
            .map(|v| parse_view_limit(&v))
            .transpose()?;
        let expires_at = non_blank(self.expires_at)
            .map(|v| parse_timestamp(&v))
            .transpose()?;
        let self_destruct = non_blank(self.self_destruct)
            .map(|v| parse_flag(&v))
            .transpose()?
            .unwrap_or(false);

        Ok(NewZap {
            kind,
            name,
            content,
            password,
            view_limit,
            expires_at,
            self_destruct,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_url(raw: &str) -> ZapResult<()> {
    if DataUrl::is_data_url(raw) {
        return DataUrl::parse(raw)
            .map(|_| ())
            .map_err(|e| ZapError::Validation(e.to_string()));
    }
    let invalid =
        || ZapError::Validation(format!("URL must be an http(s) or data:image URL, got {raw:?}"));
    // The parser silently strips or percent-encodes these; a stored target must be exact.
    if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid());
    }
    let url = Url::parse(raw).map_err(|_| invalid())?;
    let has_host = url.host_str().is_some_and(|h| !h.is_empty());
    if !matches!(url.scheme(), "http" | "https") || !has_host {
        return Err(invalid());
    }
    Ok(())
}

fn parse_view_limit(raw: &str) -> ZapResult<u32> {
    let n: i64 = raw
        .parse()
        .map_err(|_| ZapError::Validation(format!("viewLimit must be an integer, got {raw:?}")))?;
    if n <= 0 {
        return Err(ZapError::Validation("viewLimit must be positive".into()));
    }
    u32::try_from(n).map_err(|_| ZapError::Validation("viewLimit is too large".into()))
}

/// RFC 3339, or a zone-less `YYYY-MM-DDTHH:MM[:SS]` taken as UTC.
fn parse_timestamp(raw: &str) -> ZapResult<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ZapError::Validation(format!("expiresAt is not a timestamp: {raw:?}")))
}

fn parse_flag(raw: &str) -> ZapResult<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" => Ok(false),
        _ => Err(ZapError::Validation(format!(
            "selfDestruct must be a boolean, got {raw:?}"
        ))),
    }
}
