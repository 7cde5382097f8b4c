use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AttendanceError {
    /// Missing or malformed input, detected before any network call.
    #[error("{0}")]
    Validation(String),

    /// A protected action was attempted without a usable session.
    #[error("{0}")]
    AuthRequired(String),

    /// The login endpoint rejected the credentials.
    #[error("{0}")]
    Auth(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Camera error: {0}")]
    Camera(String),

    #[error("Unexpected response: {0}")]
    Protocol(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, AttendanceError>;

/// Non-2xx response from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: u16,
    /// Server supplied `detail` or `message` field, if any.
    pub detail: Option<String>,
}

impl ApiError {
    pub fn new(status: u16, detail: Option<String>) -> Self {
        Self { status, detail }
    }

    pub fn message(&self) -> String {
        match &self.detail {
            Some(detail) => detail.clone(),
            None => format!("Request failed with status {}", self.status),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for ApiError {}
