use thiserror::Error;

/// Errors returned by a [`Store`](crate::store::Store) implementation.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated (username or email taken)
    #[error("Unique constraint violated")]
    Conflict,

    /// The requested row does not exist
    #[error("Record not found")]
    NotFound,

    /// A referenced user row does not exist
    #[error("Referenced user does not exist")]
    UnknownUser,

    /// Connectivity failure or any other unexpected backend error
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::Conflict,
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                StoreError::UnknownUser
            }
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

/// Reasons a bearer token fails validation.
///
/// Apart from `Signing`, every variant means the same thing to a caller: the
/// token is invalid. The distinction only exists for logging.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Not a three-segment JWT, or a segment is not the expected JSON
    #[error("Malformed token")]
    Malformed,

    /// Header names an algorithm other than HS256
    #[error("Unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// HMAC does not match the shared secret
    #[error("Invalid token signature")]
    InvalidSignature,

    /// The `exp` claim is absent or not an integer
    #[error("Token has no expiry")]
    MissingExpiry,

    /// The `exp` claim is not after the current time
    #[error("Token expired at {expired_at} (current time: {now})")]
    Expired { expired_at: u64, now: u64 },

    /// The `user_id` claim is absent or not an integer
    #[error("Token has no subject")]
    MissingSubject,

    /// Claims could not be encoded and signed
    #[error("Failed to sign token: {0}")]
    Signing(String),
}

/// Password hashing failures.
#[derive(Debug, Error)]
pub enum HashError {
    /// bcrypt rejected the input or cost
    #[error("Password hashing failed: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),

    /// The blocking hashing task panicked or was cancelled
    #[error("Hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Errors surfaced by request handlers, one variant per HTTP status class.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Malformed or missing input (400)
    #[error("{0}")]
    Validation(String),

    /// Uniqueness violation (409)
    #[error("{0}")]
    Conflict(String),

    /// Bad credentials or unusable identity (401)
    #[error("{0}")]
    Authentication(String),

    /// Store or other unexpected failure (500); the detail is logged, never returned
    #[error("{0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => ApiError::Conflict("username or email exists".to_string()),
            StoreError::UnknownUser => ApiError::Authentication("unknown user".to_string()),
            StoreError::NotFound | StoreError::Unavailable(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<HashError> for ApiError {
    fn from(err: HashError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
