pub mod attendance;
pub mod enrollment;
pub mod records;

use std::fmt;
use crate::common::AttendanceError;

pub use attendance::{describe_decision, manual_override, AttendanceWorkflow, CaptureState};
pub use enrollment::{EnrollmentState, EnrollmentWorkflow, NewUserDraft};
pub use records::RecordsView;

/// Outcome of a user action, ready to show to the operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Success(String),
    Failure(String),
}

impl Notice {
    pub fn text(&self) -> &str {
        match self {
            Notice::Success(text) | Notice::Failure(text) => text,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Notice::Success(_))
    }

    pub fn failure(err: &AttendanceError) -> Self {
        Notice::Failure(err.to_string())
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

pub(crate) fn login_required() -> AttendanceError {
    AttendanceError::AuthRequired("Please log in first".into())
}

pub(crate) fn admin_required() -> AttendanceError {
    AttendanceError::AuthRequired("Admin access required".into())
}
