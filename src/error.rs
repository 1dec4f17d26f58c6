use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Fatal errors. Any of these stops the run and makes the process exit
/// non-zero; per-pair fetch failures are reported through [`FetchError`]
/// instead and never surface here.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Raised when a configuration file cannot be found.
    #[error("configuration file not found: {0}")]
    MissingConfig(PathBuf),

    /// Raised when the configuration is incomplete or inconsistent.
    #[error("invalid configuration: {problem}\n  how to fix: {fix}")]
    InvalidConfig { problem: String, fix: String },

    /// Raised when the HTTP client cannot be constructed.
    #[error("failed to create HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Raised when the output workbook could not be written.
    #[error("failed to write Excel file {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: Box<ToolError>,
    },

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl ToolError {
    pub(crate) fn invalid_config(problem: impl Into<String>, fix: impl Into<String>) -> Self {
        ToolError::InvalidConfig {
            problem: problem.into(),
            fix: fix.into(),
        }
    }
}

/// Failure of a single (company, resource) fetch. The fetch loop records
/// these against the pair and carries on with the next one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Credentials were rejected or no token could be obtained.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The service answered with an error status.
    #[error("API error: {0}")]
    Api(String),

    /// Anything else, including bodies that cannot be decoded.
    #[error("unexpected error: {0}")]
    Unclassified(String),
}

impl FetchError {
    /// Category recorded in the run result.
    pub fn reason(&self) -> FailureReason {
        match self {
            FetchError::Auth(_) => FailureReason::AuthFailure,
            FetchError::Timeout(_) => FailureReason::Timeout,
            FetchError::Api(_) => FailureReason::ApiError,
            FetchError::Unclassified(_) => FailureReason::Unexpected,
        }
    }
}

/// Reason category attached to a failed pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    AuthFailure,
    Timeout,
    ApiError,
    Unexpected,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::AuthFailure => write!(f, "auth failed"),
            FailureReason::Timeout => write!(f, "timeout"),
            FailureReason::ApiError => write!(f, "api error"),
            FailureReason::Unexpected => write!(f, "unexpected error"),
        }
    }
}
