//! Short code generation and credential hashing for ZapLink.
//!
//! - [`CodeGenerator`] / [`RandomCodeGenerator`]: stateless producer of
//!   fixed-length codes over the lowercase alphanumeric alphabet
//! - [`CredentialHasher`] / [`SaltedBlake3Hasher`]: one-way password
//!   hashing with per-digest random salt

pub mod codegen;
pub mod error;
pub mod hasher;

pub use codegen::{CodeGenerator, RandomCodeGenerator, DEFAULT_CODE_LEN};
pub use error::{CryptoError, CryptoResult};
pub use hasher::{CredentialHasher, SaltedBlake3Hasher, DEFAULT_ROUNDS};
