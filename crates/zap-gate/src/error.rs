use zap_crypto::CryptoError;

/// Errors that abort gate evaluation. A denial is not an error: it is a
/// normal [`GateDecision`](crate::GateDecision).
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The stored credential digest could not be checked.
    #[error("credential check failed: {0}")]
    Credential(#[from] CryptoError),

    /// A stage returned an unexpected error.
    #[error("stage error in '{stage}': {message}")]
    StageError { stage: String, message: String },
}

impl GateError {
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StageError {
            stage: stage.into(),
            message: message.into(),
        }
    }
}
