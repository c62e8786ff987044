//! Error types for the domain layer.

use std::collections::HashMap;
use std::fmt;

/// Error codes organized by the HTTP status class they map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Device or QR code absent, or foreign to the tenant (404).
    NotFound,
    /// Missing/malformed QR code or unsupported method/direction combination (400).
    InvalidInput,
    /// Delinquent unit or unauthorized revocation (403).
    Forbidden,
    /// Active cooldown window (429).
    RateLimited,
    /// Lost race on the last QR use (409 internally; surfaced as a 400-class denial).
    Conflict,

    // Infrastructure errors
    DatabaseError,
    InternalError,
}

impl ErrorCode {
    /// Returns the string representation of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }

    /// HTTP status class the excluded HTTP layer should use for this code.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::NotFound => 404,
            ErrorCode::InvalidInput => 400,
            ErrorCode::Forbidden => 403,
            ErrorCode::RateLimited => 429,
            ErrorCode::Conflict => 409,
            ErrorCode::DatabaseError | ErrorCode::InternalError => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Standard domain error with code, message, and optional details.
#[derive(Debug, Clone)]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
    pub details: HashMap<String, String>,
}

impl DomainError {
    /// Creates a new domain error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Creates a NotFound error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Creates an InvalidInput error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Creates a Forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Creates a RateLimited error carrying the remaining cooldown seconds.
    pub fn rate_limited(remaining_secs: u64) -> Self {
        Self::new(
            ErrorCode::RateLimited,
            format!(
                "Espera {} segundos antes de intentar de nuevo",
                remaining_secs
            ),
        )
        .with_detail("retry_after_secs", remaining_secs.to_string())
    }

    /// Creates a DatabaseError from an underlying storage failure.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Adds a detail to the error.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Remaining cooldown seconds, when this is a RateLimited error.
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.details
            .get("retry_after_secs")
            .and_then(|v| v.parse().ok())
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for DomainError {}
