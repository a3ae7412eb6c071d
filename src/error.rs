use crate::types::ApiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KandinskyError {
    #[error("API key is required")]
    EmptyKey,
    #[error("API secret is required")]
    EmptySecret,
    #[error("API base URL must be a non-empty string")]
    EmptyUrl,
    #[error("Prompt must be a non-empty string")]
    EmptyPrompt,
    #[error("Task UUID must be a non-empty string")]
    EmptyTaskId,
    #[error("Image contains no payload")]
    EmptyImage,
    #[error("File name must be a non-empty string")]
    EmptyFileName,
    #[error("File path must be a non-empty string")]
    EmptyFilePath,
    #[error("Base64 payload must be a non-empty string")]
    EmptyBase64,
    #[error("Payload is not valid base64")]
    NotBase64,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Wrong request parameters or prompt too long")]
    BadRequest,
    #[error("Authentication error, check your key and secret")]
    Unauthorized,
    #[error("Resource not found")]
    NotFound,
    #[error("Unsupported media type")]
    UnsupportedMediaType,
    #[error("Internal server error")]
    InternalServerError,
    #[error("API error: status {} {} > {}", .0.status, .0.error, .0.message)]
    Api(ApiError),
    #[error("Model resolution failed: {0}")]
    ModelResolution(String),
    #[error("Task {uuid} could not be completed")]
    TaskNotCompleted { uuid: String },
    #[error("Task {uuid} result was censored")]
    Censored { uuid: String },
    #[error("Polling was cancelled")]
    Cancelled,
    #[error("Task did not complete before the deadline")]
    DeadlineExceeded,
    #[error("Decode error: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KandinskyError {
    /// Maps a response status onto the protocol error it represents.
    ///
    /// Any status outside the vendor's documented set yields `None` and the
    /// body is parsed as usual.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            400 => Some(Self::BadRequest),
            401 => Some(Self::Unauthorized),
            404 => Some(Self::NotFound),
            415 => Some(Self::UnsupportedMediaType),
            500 => Some(Self::InternalServerError),
            _ => None,
        }
    }

    /// HTTP status behind a protocol error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::BadRequest => Some(400),
            Self::Unauthorized => Some(401),
            Self::NotFound => Some(404),
            Self::UnsupportedMediaType => Some(415),
            Self::InternalServerError => Some(500),
            Self::Api(e) => Some(e.status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, KandinskyError>;
