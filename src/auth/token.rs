//! Signed, time-limited identity tokens.
//!
//! Tokens are compact HS256 JWTs carrying two claims:
//!
//! ```text
//! {"user_id": 42, "exp": 1735689600}
//! ```
//!
//! The signature is keyed with the process-wide shared secret. There is no
//! revocation list; a token stays valid until `exp`.
//!
//! # Example
//!
//! ```rust
//! use microfeed::auth::TokenService;
//!
//! let tokens = TokenService::new("my-secret-key");
//! let token = tokens.issue(42).unwrap();
//! assert_eq!(tokens.validate(&token).unwrap(), 42);
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TokenError;

/// Lifetime of a token issued at login (7 days).
pub const TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// The only accepted signing algorithm.
const ALGORITHM: Algorithm = Algorithm::HS256;

/// Claims carried by an issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject user identifier
    pub user_id: i64,

    /// Expiry as Unix epoch seconds
    pub exp: u64,
}

/// Issues and validates tokens against a single shared secret.
///
/// One clone backs the login handler and another the auth gate.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService").finish_non_exhaustive()
    }
}

impl TokenService {
    /// Create a token service keyed with `secret`.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();

        // Expiry is checked by hand against a caller-supplied clock.
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issue a token for `user_id` valid for [`TOKEN_TTL`].
    pub fn issue(&self, user_id: i64) -> Result<String, TokenError> {
        self.issue_with_ttl(user_id, TOKEN_TTL)
    }

    /// Issue a token for `user_id` valid for `ttl` from now.
    pub fn issue_with_ttl(&self, user_id: i64, ttl: Duration) -> Result<String, TokenError> {
        self.issue_with_expiry(user_id, unix_now() + ttl.as_secs())
    }

    /// Issue a token with an explicit expiry timestamp.
    pub fn issue_with_expiry(&self, user_id: i64, exp: u64) -> Result<String, TokenError> {
        self.sign(&Claims { user_id, exp })
    }

    /// Validate a token against the current time and return its subject.
    pub fn validate(&self, token: &str) -> Result<i64, TokenError> {
        self.validate_at(token, unix_now())
    }

    /// Validate a token as of `now` (Unix epoch seconds).
    ///
    /// Checks, in order: structure, algorithm, signature, expiry, subject.
    pub fn validate_at(&self, token: &str, now: u64) -> Result<i64, TokenError> {
        let header = jsonwebtoken::decode_header(token).map_err(|_| TokenError::Malformed)?;

        let data = jsonwebtoken::decode::<Map<String, Value>>(
            token,
            &self.decoding_key,
            &self.validation,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidAlgorithm => {
                TokenError::UnsupportedAlgorithm(format!("{:?}", header.alg))
            }
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::MissingRequiredClaim(claim) if claim == "exp" => TokenError::MissingExpiry,
            _ => TokenError::Malformed,
        })?;
        let claims = data.claims;

        let exp = claims
            .get("exp")
            .and_then(Value::as_u64)
            .ok_or(TokenError::MissingExpiry)?;
        if now >= exp {
            return Err(TokenError::Expired {
                expired_at: exp,
                now,
            });
        }

        claims
            .get("user_id")
            .and_then(Value::as_i64)
            .ok_or(TokenError::MissingSubject)
    }

    fn sign(&self, claims: &impl Serialize) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::new(ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }
}

/// Current time as Unix epoch seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
