use zap_types::Zap;

use crate::error::GateError;
use crate::stage::{Denial, GateContext, GateStage, StageDecision};

/// Denies zaps whose `expires_at` lies strictly before the evaluation time.
pub struct ExpirationStage;

impl GateStage for ExpirationStage {
    fn name(&self) -> &str {
        "expiration"
    }

    fn evaluate(&self, zap: &Zap, context: &GateContext<'_>) -> Result<StageDecision, GateError> {
        if zap.is_expired_at(context.now) {
            return Ok(StageDecision::Deny(Denial::Expired));
        }
        Ok(StageDecision::Pass)
    }
}
