pub mod config;
pub mod error;

pub use config::{Config, API_BASE_ENV, DEFAULT_API_BASE};
pub use error::{ApiError, AttendanceError, Result};
