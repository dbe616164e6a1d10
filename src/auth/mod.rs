//! Credentials and identity tokens.
//!
//! - [`password`] - bcrypt password hashing and verification
//! - [`token`] - HS256 bearer token issuance and validation

pub mod password;
pub mod token;

pub use password::{
    PasswordHasher, DEFAULT_BCRYPT_COST, MAX_BCRYPT_COST, MAX_PASSWORD_BYTES, MIN_BCRYPT_COST,
};
pub use token::{unix_now, Claims, TokenService, TOKEN_TTL};
