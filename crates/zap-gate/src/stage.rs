use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zap_types::Zap;

use crate::error::GateError;

// ---------------------------------------------------------------------------
// Denial
// ---------------------------------------------------------------------------

/// Why a gate refused access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Denial {
    Expired,
    ViewLimitReached,
    PasswordRequired,
    InvalidPassword,
}

impl Denial {
    /// Stable machine-readable reason (used in error-page redirects).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expired => "expired",
            Self::ViewLimitReached => "viewlimit",
            Self::PasswordRequired => "password_required",
            Self::InvalidPassword => "invalid_password",
        }
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expired => f.write_str("zap has expired"),
            Self::ViewLimitReached => f.write_str("zap view limit reached"),
            Self::PasswordRequired => f.write_str("password required"),
            Self::InvalidPassword => f.write_str("incorrect password"),
        }
    }
}

// ---------------------------------------------------------------------------
// StageDecision / StageResult
// ---------------------------------------------------------------------------

/// The outcome of a single stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageDecision {
    Pass,
    Deny(Denial),
}

impl StageDecision {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// Recorded result from a completed stage evaluation.
#[derive(Clone, Debug)]
pub struct StageResult {
    pub stage_name: String,
    pub passed: bool,
    pub denial: Option<Denial>,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// GateContext
// ---------------------------------------------------------------------------

/// Per-request inputs available to every stage.
#[derive(Clone, Copy, Debug)]
pub struct GateContext<'a> {
    /// Evaluation time.
    pub now: DateTime<Utc>,
    /// Caller-supplied password. Blank strings count as absent.
    pub password: Option<&'a str>,
}

impl<'a> GateContext<'a> {
    pub fn new(now: DateTime<Utc>, password: Option<&'a str>) -> Self {
        Self {
            now,
            password: password.filter(|p| !p.is_empty()),
        }
    }
}

// ---------------------------------------------------------------------------
// GateStage trait
// ---------------------------------------------------------------------------

/// A single evaluation stage in the gate pipeline.
///
/// The trait is object-safe and `Send + Sync` so stages can be stored in a
/// `Vec<Box<dyn GateStage>>`.
pub trait GateStage: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(&self, zap: &Zap, context: &GateContext<'_>) -> Result<StageDecision, GateError>;
}
