use zap_types::ZapId;

/// Errors from repository and content store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The record does not exist (or was deleted concurrently).
    #[error("zap not found: {0}")]
    NotFound(ZapId),

    /// A unique key is already taken.
    #[error("duplicate {field}: {value}")]
    DuplicateKey { field: &'static str, value: String },

    /// Compare-and-swap on the view counter lost a race.
    #[error("view count conflict on {id}: expected {expected}")]
    Conflict { id: ZapId, expected: u32 },

    /// Object storage failure.
    #[error("content storage error: {0}")]
    Storage(String),

    /// Database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O error from a filesystem backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted row could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
