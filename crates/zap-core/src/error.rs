use zap_gate::Denial;
use zap_store::StoreError;

use crate::qr::QrError;

/// Errors surfaced by the controller.
///
/// Gate denials, `NotFound` and `Validation` are terminal and user-facing.
/// `Storage`, `Persistence` and `Qr` are collaborator failures; `Integrity`
/// means a stored record violates the creation invariants.
#[derive(Debug, thiserror::Error)]
pub enum ZapError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("zap not found")]
    NotFound,

    #[error("zap has expired")]
    Expired,

    #[error("zap view limit reached")]
    ViewLimit,

    #[error("password required")]
    PasswordRequired,

    #[error("incorrect password")]
    InvalidPassword,

    /// Every generated short code collided.
    #[error("short code collision after {attempts} attempts")]
    DuplicateKey { attempts: u32 },

    /// View-count races kept being lost.
    #[error("concurrent access to zap {0}, try again")]
    Conflict(String),

    #[error("content storage failed: {0}")]
    Storage(#[source] StoreError),

    #[error("persistence failed: {0}")]
    Persistence(#[source] StoreError),

    #[error("QR rendering failed: {0}")]
    Qr(#[from] QrError),

    #[error("credential hashing failed: {0}")]
    Credential(#[from] zap_crypto::CryptoError),

    #[error("integrity violation: {0}")]
    Integrity(String),
}

impl ZapError {
    /// Reason slug for frontend error pages, for errors a visitor should see.
    pub fn redirect_reason(&self) -> Option<&'static str> {
        match self {
            Self::NotFound => Some("notfound"),
            Self::Expired => Some("expired"),
            Self::ViewLimit => Some("viewlimit"),
            Self::PasswordRequired => Some("password_required"),
            Self::InvalidPassword => Some("invalid_password"),
            _ => None,
        }
    }

    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound => "not_found",
            Self::Expired => "expired",
            Self::ViewLimit => "view_limit_exceeded",
            Self::PasswordRequired => "password_required",
            Self::InvalidPassword => "invalid_password",
            Self::DuplicateKey { .. } => "duplicate_key",
            Self::Conflict(_) => "conflict",
            Self::Storage(_) => "storage_error",
            Self::Persistence(_) => "persistence_error",
            Self::Qr(_) => "qr_error",
            Self::Credential(_) => "credential_error",
            Self::Integrity(_) => "integrity_error",
        }
    }
}

impl From<Denial> for ZapError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Expired => Self::Expired,
            Denial::ViewLimitReached => Self::ViewLimit,
            Denial::PasswordRequired => Self::PasswordRequired,
            Denial::InvalidPassword => Self::InvalidPassword,
        }
    }
}

pub type ZapResult<T> = Result<T, ZapError>;
