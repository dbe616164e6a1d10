//! bcrypt password hashing.
//!
//! Digests are self-describing bcrypt strings (`$2b$<cost>$<salt><hash>`), so
//! verification needs only the stored digest and the candidate password. The
//! cost factor only affects newly created digests.

use tracing::debug;

use crate::error::HashError;

/// Default bcrypt cost factor.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Smallest cost bcrypt accepts.
pub const MIN_BCRYPT_COST: u32 = 4;

/// Largest cost bcrypt accepts.
pub const MAX_BCRYPT_COST: u32 = 31;

/// bcrypt only reads this many bytes of input.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// One-way salted password hasher.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// Create a hasher producing digests at the given cost factor.
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// The cost factor used for new digests.
    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext password with a fresh random salt.
    pub fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        Ok(bcrypt::hash(plaintext, self.cost)?)
    }

    /// Check a plaintext password against a stored digest.
    ///
    /// A malformed or truncated digest is a failed match, never an error.
    pub fn verify(&self, digest: &str, plaintext: &str) -> bool {
        match bcrypt::verify(plaintext, digest) {
            Ok(matches) => matches,
            Err(e) => {
                debug!("Rejecting unusable password digest: {}", e);
                false
            }
        }
    }

    /// [`hash`](Self::hash) on the blocking thread pool.
    pub async fn hash_blocking(&self, plaintext: String) -> Result<String, HashError> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext)).await?
    }

    /// [`verify`](Self::verify) on the blocking thread pool.
    pub async fn verify_blocking(
        &self,
        digest: String,
        plaintext: String,
    ) -> Result<bool, HashError> {
        let hasher = *self;
        Ok(tokio::task::spawn_blocking(move || hasher.verify(&digest, &plaintext)).await?)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}
