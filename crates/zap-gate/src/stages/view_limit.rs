use zap_types::Zap;

use crate::error::GateError;
use crate::stage::{Denial, GateContext, GateStage, StageDecision};

/// Pre-increment view-limit check: denies once `view_count >= view_limit`.
pub struct ViewLimitStage;

impl GateStage for ViewLimitStage {
    fn name(&self) -> &str {
        "view_limit"
    }

    fn evaluate(&self, zap: &Zap, _context: &GateContext<'_>) -> Result<StageDecision, GateError> {
        if zap.view_limit_reached() {
            return Ok(StageDecision::Deny(Denial::ViewLimitReached));
        }
        Ok(StageDecision::Pass)
    }
}
