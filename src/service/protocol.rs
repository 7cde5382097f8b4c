use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// Endpoint paths, relative to the configured base URL
pub const LOGIN_PATH: &str = "/api/v1/auth/login";
pub const USERS_PATH: &str = "/api/v1/users";
pub const MARK_ATTENDANCE_PATH: &str = "/api/v1/attendance/mark";
pub const MANUAL_ATTENDANCE_PATH: &str = "/api/v1/attendance/manual";
pub const ATTENDANCE_LOGS_PATH: &str = "/api/v1/attendance/logs";

/// Multipart field name the backend reads uploads from.
pub const UPLOAD_FIELD: &str = "file";

pub fn enroll_path(user_id: i64) -> String {
    format!("{}/{}/enroll", USERS_PATH, user_id)
}

pub fn logs_path(limit: u32) -> String {
    format!("{}?limit={}", ATTENDANCE_LOGS_PATH, limit)
}

pub fn manual_path(user_id: i64, note: &str) -> String {
    format!(
        "{}?user_id={}&note={}",
        MANUAL_ATTENDANCE_PATH,
        user_id,
        urlencoding::encode(note)
    )
}

#[derive(Deserialize, Debug, Clone)]
pub struct TokenResponse {
    pub access_token: String,
}

/// Roles an account can be created with.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountRole {
    Admin,
    Staff,
    #[default]
    Student,
}

impl std::str::FromStr for AccountRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Self::Admin),
            "STAFF" => Ok(Self::Staff),
            "STUDENT" => Ok(Self::Student),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct CreateUserRequest {
    pub full_name: String,
    pub roll_no: String,
    pub password: String,
    pub role: AccountRole,
}

#[derive(Deserialize, Debug, Clone)]
pub struct UserOut {
    pub id: i64,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub roll_no: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct EnrollResponse {
    #[serde(default)]
    pub status: Option<String>,
    pub model_version: String,
    #[serde(default)]
    pub liveness_score: Option<f64>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AttendanceDecision {
    pub status: String,
    pub confidence: f64,
    #[serde(default)]
    pub liveness_score: Option<f64>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Server-side attendance log entry. Read-only on the client.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct AttendanceRecord {
    pub id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: DateTime<Utc>,
    pub confidence: f64,
    #[serde(default)]
    pub liveness_score: Option<f64>,
    #[serde(default)]
    pub manual_override: bool,
}

impl AttendanceRecord {
    /// Confidence in [0, 1]. The backend stores whole percentages, so
    /// anything above 1 is scaled down.
    pub fn confidence_fraction(&self) -> f64 {
        if self.confidence > 1.0 {
            self.confidence / 100.0
        } else {
            self.confidence
        }
    }
}
