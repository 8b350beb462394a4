//! Foundation types for ZapLink.
//!
//! A *zap* is a single shareable unit, either an uploaded file or a submitted
//! URL, addressed by a short public code. Every other ZapLink crate depends on
//! `zap-types` for the record layout and its identifiers.
//!
//! # Key Types
//!
//! - [`Zap`]: The persisted record with its lifecycle policy fields
//! - [`ZapId`]: Opaque internal identifier (UUID v7)
//! - [`ShortCode`]: Public fixed-alphabet identifier used for resolution
//! - [`ContentKind`]: What the zap carries (image, PDF, video, URL, ...)

pub mod code;
pub mod error;
pub mod id;
pub mod kind;
pub mod zap;

pub use code::{ShortCode, CODE_ALPHABET, MAX_CODE_LEN, MIN_CODE_LEN};
pub use error::TypeError;
pub use id::ZapId;
pub use kind::ContentKind;
pub use zap::Zap;
