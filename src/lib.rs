// Core modules
pub mod common;
pub mod session;
pub mod service;
pub mod camera;
pub mod core;
pub mod cli;

// Re-export commonly used types
pub use common::{ApiError, AttendanceError, Config, Result};
pub use session::{LoginForm, Role, Session, SessionStore};
pub use service::{ApiGateway, CallOptions, ReqwestTransport, Transport};
pub use camera::{CameraDevice, CameraLease, CaptureBuffer, FrameSource};
pub use crate::core::{AttendanceWorkflow, CaptureState, EnrollmentState, EnrollmentWorkflow, Notice, RecordsView};
