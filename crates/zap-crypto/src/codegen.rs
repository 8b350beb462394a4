use rand::Rng;
use zap_types::{ShortCode, CODE_ALPHABET, MAX_CODE_LEN, MIN_CODE_LEN};

use crate::error::{CryptoError, CryptoResult};

/// Default generated code length.
pub const DEFAULT_CODE_LEN: usize = 6;

/// Producer of short codes.
///
/// Generators are stateless and side-effect-free. Collisions are possible and
/// are the caller's problem: uniqueness is enforced by the repository.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> ShortCode;
}

/// Uniform random codes over [`CODE_ALPHABET`].
#[derive(Clone, Debug)]
pub struct RandomCodeGenerator {
    length: usize,
}

impl RandomCodeGenerator {
    pub fn new(length: usize) -> CryptoResult<Self> {
        if !(MIN_CODE_LEN..=MAX_CODE_LEN).contains(&length) {
            return Err(CryptoError::InvalidConfig(format!(
                "code length {length} outside {MIN_CODE_LEN}..={MAX_CODE_LEN}"
            )));
        }
        Ok(Self { length })
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl Default for RandomCodeGenerator {
    fn default() -> Self {
        Self { length: DEFAULT_CODE_LEN }
    }
}

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> ShortCode {
        let mut rng = rand::thread_rng();
        let code: String = (0..self.length)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect();
        // Length and alphabet are validated in `new`.
        ShortCode::parse(code).expect("generated code is always valid")
    }
}
