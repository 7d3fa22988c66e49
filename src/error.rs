//! Error types for the seeding pipeline.
//!
//! Errors are grouped by domain (validation, uniqueness, external service,
//! storage, configuration) because the pipeline treats each group
//! differently: validation errors are counted and skipped, external-service
//! errors degrade to unenriched data, and only storage errors are fatal to
//! the current batch.

use thiserror::Error;

/// Result type alias using our SeedError type
pub type Result<T> = std::result::Result<T, SeedError>;

/// Main error type for the seeding pipeline
#[derive(Error, Debug)]
pub enum SeedError {
    // ===== Validation errors (record-level, non-fatal) =====
    /// A source record is missing a required field or carries a malformed one
    #[error("invalid source record: {0}")]
    InvalidRecord(String),

    /// Input file format not recognized
    #[error("unsupported input format: {0}")]
    UnsupportedFormat(String),

    /// Domain constraint violated at creation time (e.g. a reply whose
    /// parent chain revisits itself)
    #[error("validation failed: {0}")]
    Validation(String),

    // ===== External-service errors =====
    /// The metadata API rejected the request (non-retryable 4xx)
    #[error("metadata request failed: {message}")]
    MetadataRequestFailed {
        message: String,
        /// HTTP status code if available
        status_code: Option<u16>,
    },

    /// Network-level failure talking to an external service
    #[error("network error: {message}")]
    NetworkError {
        message: String,
        /// Whether this error might be transient (retryable)
        is_transient: bool,
    },

    // ===== Storage errors (fatal to the current batch) =====
    /// Expected row absent
    #[error("record not found: {0}")]
    RecordNotFound(String),

    /// Schema migration failure
    #[error("migration failed: {0}")]
    MigrationFailed(String),

    // ===== Configuration / state =====
    #[error("invalid configuration: {0}")]
    ConfigurationError(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("file I/O error: {0}")]
    FileIoError(String),

    // ===== Wrapped library errors =====
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SeedError {
    /// Whether a retry might succeed.
    ///
    /// Drives the metadata client's backoff loop: network failures, rate
    /// limiting and 5xx responses are retried, definitive rejections are
    /// not.
    pub fn is_transient(&self) -> bool {
        match self {
            SeedError::NetworkError { is_transient, .. } => *is_transient,
            SeedError::MetadataRequestFailed { status_code, .. } => {
                matches!(status_code, Some(code) if *code >= 500 || *code == 429)
            }
            SeedError::Reqwest(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Whether this is a record-level validation error (counted and
    /// skipped, never fatal to a batch).
    pub fn is_validation(&self) -> bool {
        matches!(self, SeedError::InvalidRecord(_) | SeedError::Validation(_))
    }
}

impl From<std::io::Error> for SeedError {
    fn from(e: std::io::Error) -> Self {
        SeedError::FileIoError(e.to_string())
    }
}
