/// Errors from code generation and credential hashing.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CryptoError {
    /// A stored digest could not be parsed.
    #[error("malformed credential digest: {0}")]
    MalformedDigest(String),

    /// Generator or hasher configuration is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
