use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};

/// Default number of stretching rounds for new digests.
pub const DEFAULT_ROUNDS: u32 = 10_000;

const SCHEME: &str = "b3s";
const DOMAIN: &[u8] = b"zaplink-credential-v1";
const SALT_LEN: usize = 16;

/// One-way password hashing.
///
/// `hash` never returns the plaintext in any form; `verify` only errors when
/// the stored digest itself is unreadable.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> CryptoResult<String>;

    fn verify(&self, plaintext: &str, digest: &str) -> CryptoResult<bool>;
}

/// Salted, iterated BLAKE3 credential hasher.
///
/// Digest format: `b3s$<rounds>$<salt-hex>$<hash-hex>`. The round count is
/// stored with the digest so it can be raised later without invalidating
/// existing passwords.
#[derive(Clone, Debug)]
pub struct SaltedBlake3Hasher {
    rounds: u32,
}

impl SaltedBlake3Hasher {
    pub fn new(rounds: u32) -> CryptoResult<Self> {
        if rounds == 0 {
            return Err(CryptoError::InvalidConfig("hash rounds must be at least 1".into()));
        }
        Ok(Self { rounds })
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    fn stretch(plaintext: &str, salt: &[u8], rounds: u32) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(DOMAIN);
        hasher.update(b":");
        hasher.update(salt);
        hasher.update(plaintext.as_bytes());
        let mut current = hasher.finalize();
        for _ in 1..rounds {
            let mut hasher = blake3::Hasher::new();
            hasher.update(current.as_bytes());
            hasher.update(salt);
            current = hasher.finalize();
        }
        current
    }

    fn parse(digest: &str) -> CryptoResult<(u32, Vec<u8>, blake3::Hash)> {
        let malformed = |reason: &str| CryptoError::MalformedDigest(reason.to_string());
        let mut parts = digest.split('$');
        if parts.next() != Some(SCHEME) {
            return Err(malformed("unknown scheme"));
        }
        let rounds = parts
            .next()
            .and_then(|r| r.parse::<u32>().ok())
            .filter(|r| *r > 0)
            .ok_or_else(|| malformed("bad round count"))?;
        let salt = parts
            .next()
            .and_then(|s| hex::decode(s).ok())
            .filter(|s| s.len() == SALT_LEN)
            .ok_or_else(|| malformed("bad salt"))?;
        let hash = parts
            .next()
            .and_then(|h| blake3::Hash::from_hex(h).ok())
            .ok_or_else(|| malformed("bad hash"))?;
        if parts.next().is_some() {
            return Err(malformed("trailing segments"));
        }
        Ok((rounds, salt, hash))
    }
}

impl Default for SaltedBlake3Hasher {
    fn default() -> Self {
        Self { rounds: DEFAULT_ROUNDS }
    }
}

impl CredentialHasher for SaltedBlake3Hasher {
    fn hash(&self, plaintext: &str) -> CryptoResult<String> {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        let hash = Self::stretch(plaintext, &salt, self.rounds);
        Ok(format!("{SCHEME}${}${}${}", self.rounds, hex::encode(salt), hash.to_hex()))
    }

    fn verify(&self, plaintext: &str, digest: &str) -> CryptoResult<bool> {
        let (rounds, salt, expected) = Self::parse(digest)?;
        // blake3::Hash equality is constant-time.
        Ok(Self::stretch(plaintext, &salt, rounds) == expected)
    }
}
