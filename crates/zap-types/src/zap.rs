use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::code::ShortCode;
use crate::id::ZapId;
use crate::kind::ContentKind;

/// A persisted zap record.
///
/// Exactly one of `content_url` / `original_url` is populated for any record
/// produced by the creation path. Content, password and limits never change
/// after creation; `view_count` is only advanced by resolution.
///
/// Serialization is a one-way view: the digest is reported only as
/// `passwordProtected`. Records are persisted through repository columns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Zap {
    pub id: ZapId,
    pub short_code: ShortCode,
    /// Secondary reference id handed to the creator (QR/reference use).
    pub content_id: ShortCode,
    pub kind: ContentKind,
    pub display_name: Option<String>,
    /// Location of the stored file, when the zap carries a file.
    pub content_url: Option<String>,
    /// Submitted URL, when the zap is a redirect target. May be a
    /// `data:image/...;base64,` URL.
    pub original_url: Option<String>,
    #[serde(rename = "passwordProtected", serialize_with = "serialize_is_some")]
    pub password_hash: Option<String>,
    pub view_limit: Option<u32>,
    pub view_count: u32,
    pub expires_at: Option<DateTime<Utc>>,
    pub self_destruct: bool,
    pub created_at: DateTime<Utc>,
}

fn serialize_is_some<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_bool(value.is_some())
}

impl Zap {
    /// Whether the zap has expired at `now`. Expiry is strict: a zap is still
    /// valid at exactly `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now > at)
    }

    /// Pre-increment check: no further view may be granted.
    pub fn view_limit_reached(&self) -> bool {
        self.view_limit.is_some_and(|limit| self.view_count >= limit)
    }

    /// Post-increment check: the recorded count has gone past the limit.
    pub fn view_limit_exceeded(&self) -> bool {
        self.view_limit.is_some_and(|limit| self.view_count > limit)
    }

    pub fn is_password_protected(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Views left before the limit is reached, if limited.
    pub fn remaining_views(&self) -> Option<u32> {
        self.view_limit.map(|limit| limit.saturating_sub(self.view_count))
    }
}
