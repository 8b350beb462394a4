use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Characters a short code may contain.
pub const CODE_ALPHABET: &[u8; 36] = b"1234567890abcdefghijklmnopqrstuvwxyz";

/// Shortest code accepted by [`ShortCode::parse`].
pub const MIN_CODE_LEN: usize = 4;

/// Longest code accepted by [`ShortCode::parse`].
pub const MAX_CODE_LEN: usize = 32;

/// Public fixed-alphabet identifier used to resolve a zap.
///
/// Codes are lowercase alphanumeric. Uniqueness is not a property of the
/// value itself: it is enforced by the repository when a zap is created.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShortCode(String);

impl ShortCode {
    /// Validate and wrap a code.
    pub fn parse(code: impl Into<String>) -> Result<Self, TypeError> {
        let code = code.into();
        let len = code.len();
        if !(MIN_CODE_LEN..=MAX_CODE_LEN).contains(&len) {
            return Err(TypeError::InvalidShortCode {
                reason: format!("length {len} outside {MIN_CODE_LEN}..={MAX_CODE_LEN}"),
                code,
            });
        }
        if let Some(bad) = code.bytes().find(|b| !CODE_ALPHABET.contains(b)) {
            return Err(TypeError::InvalidShortCode {
                reason: format!("character {:?} not in alphabet", bad as char),
                code,
            });
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for ShortCode {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ShortCode {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ShortCode> for String {
    fn from(code: ShortCode) -> Self {
        code.0
    }
}

impl AsRef<str> for ShortCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ShortCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShortCode({})", self.0)
    }
}

impl fmt::Display for ShortCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
