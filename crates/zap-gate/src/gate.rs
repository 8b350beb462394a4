use std::sync::Arc;
use std::time::{Duration, Instant};

use zap_crypto::CredentialHasher;
use zap_types::Zap;

use crate::error::GateError;
use crate::stage::{Denial, GateContext, GateStage, StageDecision, StageResult};
use crate::stages::{ExpirationStage, PasswordStage, ViewLimitStage};

/// Final outcome of a gate evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDecision {
    Granted,
    Denied(Denial),
}

/// The outcome of running a zap through the full pipeline.
#[derive(Clone, Debug)]
pub struct GateResult {
    pub decision: GateDecision,
    /// Per-stage results in evaluation order.
    pub stage_results: Vec<StageResult>,
    pub elapsed: Duration,
}

impl GateResult {
    pub fn is_granted(&self) -> bool {
        matches!(self.decision, GateDecision::Granted)
    }

    pub fn denial(&self) -> Option<Denial> {
        match self.decision {
            GateDecision::Granted => None,
            GateDecision::Denied(d) => Some(d),
        }
    }
}

/// Ordered, fail-fast pipeline of resolution checks.
pub struct ResolutionGate {
    stages: Vec<Box<dyn GateStage>>,
}

impl ResolutionGate {
    /// An empty pipeline that grants everything.
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Expiration -> ViewLimit -> Password
    pub fn with_default_stages(hasher: Arc<dyn CredentialHasher>) -> Self {
        let mut gate = Self::new();
        gate.add_stage(Box::new(ExpirationStage));
        gate.add_stage(Box::new(ViewLimitStage));
        gate.add_stage(Box::new(PasswordStage::new(hasher)));
        gate
    }

    pub fn add_stage(&mut self, stage: Box<dyn GateStage>) {
        self.stages.push(stage);
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Run every stage in order, stopping at the first denial.
    pub fn evaluate(&self, zap: &Zap, context: &GateContext<'_>) -> Result<GateResult, GateError> {
        let pipeline_start = Instant::now();
        let mut stage_results = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let stage_start = Instant::now();
            let decision = stage.evaluate(zap, context)?;
            let denial = match decision {
                StageDecision::Pass => None,
                StageDecision::Deny(d) => Some(d),
            };
            stage_results.push(StageResult {
                stage_name: stage.name().to_string(),
                passed: denial.is_none(),
                denial,
                elapsed: stage_start.elapsed(),
            });

            if let Some(denial) = denial {
                tracing::debug!(
                    short_code = %zap.short_code,
                    stage = stage.name(),
                    reason = denial.as_str(),
                    "resolution denied"
                );
                return Ok(GateResult {
                    decision: GateDecision::Denied(denial),
                    stage_results,
                    elapsed: pipeline_start.elapsed(),
                });
            }
        }

        Ok(GateResult {
            decision: GateDecision::Granted,
            stage_results,
            elapsed: pipeline_start.elapsed(),
        })
    }
}

impl Default for ResolutionGate {
    fn default() -> Self {
        Self::new()
    }
}
