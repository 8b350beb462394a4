use std::sync::Arc;

use zap_crypto::CredentialHasher;
use zap_types::Zap;

use crate::error::GateError;
use crate::stage::{Denial, GateContext, GateStage, StageDecision};

/// Verifies the caller's password against the stored digest.
pub struct PasswordStage {
    hasher: Arc<dyn CredentialHasher>,
}

impl PasswordStage {
    pub fn new(hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { hasher }
    }
}

impl GateStage for PasswordStage {
    fn name(&self) -> &str {
        "password"
    }

    fn evaluate(&self, zap: &Zap, context: &GateContext<'_>) -> Result<StageDecision, GateError> {
        let Some(digest) = zap.password_hash.as_deref() else {
            return Ok(StageDecision::Pass);
        };
        let Some(supplied) = context.password else {
            return Ok(StageDecision::Deny(Denial::PasswordRequired));
        };
        if self.hasher.verify(supplied, digest)? {
            Ok(StageDecision::Pass)
        } else {
            Ok(StageDecision::Deny(Denial::InvalidPassword))
        }
    }
}
