use reqwest::StatusCode;
use std::{fmt, io};
use thiserror::Error;

/// A non-2xx answer from the remote API, keeping the status and the body text.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    /// Create a new ApiError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND
    }

    /// Server-side and throttling failures, the only ones worth sending again.
    pub fn is_transient(&self) -> bool {
        self.status.is_server_error() || self.status == StatusCode::TOO_MANY_REQUESTS
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for ApiError {}

#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("remote API error: {0}")]
    Api(#[from] ApiError),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("could not read `{path}`: {source}")]
    File { path: String, source: io::Error },
    #[error("bucket key `{key}` invalid: {reason}")]
    InvalidBucketKey { key: String, reason: String },
    #[error("last chunk of session `{session_id}` answered {status} instead of 200")]
    UploadNotAcknowledged {
        session_id: String,
        status: StatusCode,
    },
    #[error("resumable upload of `{0}` has no bytes to send")]
    EmptyUpload(String),
    #[error("invalid base URL {0}")]
    BaseUrl(String),
    #[error("bucket listing points to an unusable next page `{link}`: {reason}")]
    PaginationLink { link: String, reason: String },
    #[error("token lifetime of {0} seconds is out of range")]
    TokenExpiry(i64),
    #[error("translation of `{urn}` ended with status `{status}`")]
    TranslationFailed { urn: String, status: String },
}

impl ForgeError {
    /// True for 404 answers from the remote API.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ForgeError::Api(api) if api.is_not_found())
    }

    /// HTTP status behind the failure, when there was an answer at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ForgeError::Api(api) => Some(api.status),
            ForgeError::Http(err) => err.status(),
            _ => None,
        }
    }

    /// Whether a chunk upload failing with this error may be sent again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ForgeError::Api(api) => api.is_transient(),
            ForgeError::Http(err) => err.is_timeout() || err.is_connect(),
            _ => false,
        }
    }
}

pub type ForgeResult<T> = Result<T, ForgeError>;
