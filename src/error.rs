use chrono::NaiveDate;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Missing or unusable local configuration. Always fatal: a run never starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("credentials file not found at {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("missing or empty credential `{0}`")]
    MissingCredential(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("authentication rejected: {0}")]
    RemoteRejected(String),
}

/// A run request that cannot be honored. Raised before any remote call is made.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("start date {start} is after end date {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },

    #[error("dates must be in YYYY-MM-DD format, got `{0}`")]
    BadDate(String),

    #[error("select at least one of likes, replies, posts or quotes")]
    NothingSelected,
}

/// Errors from the remote API boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("request error: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("OAuth error: {0}")]
    OAuth(String),

    #[error("request accepted but had no effect: {0}")]
    NoEffect(String),

    #[error("Twitter API error {status} {reason}: {detail}")]
    Status {
        status: u16,
        reason: String,
        detail: String,
        retry_after: Option<Duration>,
    },
}

impl ApiError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Status { status: 429, .. })
    }

    /// Server-side or connection-level failures that are worth retrying with backoff.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(err) => err.is_connect() || err.is_timeout() || err.is_closed(),
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    pub fn hint(&self) -> Option<&'static str> {
        if self.is_permission_denied() {
            Some(
                "the access token must have Read and Write permissions; \
                 regenerate it after enabling write access for the app",
            )
        } else {
            None
        }
    }
}

/// A page walk could not continue. Ends the job with partial results.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("page reported errors: {}", .0.join("; "))]
    PageProblems(Vec<String>),
}

/// Fatal errors surfaced by the orchestrator.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
