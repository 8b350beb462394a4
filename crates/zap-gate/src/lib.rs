//! Resolution gate pipeline for ZapLink.
//!
//! Every resolution request must pass the gate before a view is recorded.
//! The gate runs its stages in a fixed order and stops at the first denial:
//!
//! 1. [`ExpirationStage`]: `expires_at` in the past
//! 2. [`ViewLimitStage`]: `view_count >= view_limit`
//! 3. [`PasswordStage`]: password missing or wrong
//!
//! Expiration and view limit are checked before the password, so a dead zap
//! is denied regardless of whether the caller knows its password.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use chrono::Utc;
//! use zap_crypto::SaltedBlake3Hasher;
//! use zap_gate::{GateContext, ResolutionGate};
//! # use zap_types::{ContentKind, ShortCode, Zap, ZapId};
//! # let zap = Zap {
//! #     id: ZapId::new(), short_code: ShortCode::parse("abc123").unwrap(),
//! #     content_id: ShortCode::parse("def456").unwrap(), kind: ContentKind::Url,
//! #     display_name: None, content_url: None, original_url: Some("https://example.com".into()),
//! #     password_hash: None, view_limit: None, view_count: 0, expires_at: None,
//! #     self_destruct: false, created_at: Utc::now(),
//! # };
//!
//! let gate = ResolutionGate::with_default_stages(Arc::new(SaltedBlake3Hasher::default()));
//! let result = gate.evaluate(&zap, &GateContext::new(Utc::now(), None)).unwrap();
//! assert!(result.is_granted());
//! ```

pub mod error;
pub mod gate;
pub mod stage;
pub mod stages;

pub use error::GateError;
pub use gate::{GateDecision, GateResult, ResolutionGate};
pub use stage::{Denial, GateContext, GateStage, StageDecision, StageResult};
pub use stages::{ExpirationStage, PasswordStage, ViewLimitStage};
