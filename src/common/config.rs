use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use directories::ProjectDirs;
use reqwest::Url;
use crate::common::error::{AttendanceError, Result};

/// Environment variable that selects the backend base URL.
pub const API_BASE_ENV: &str = "ATTENDANCE_API_BASE_URL";
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub attendance: AttendanceConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    DEFAULT_API_BASE.to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { base_url: default_base_url() }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CameraConfig {
    #[serde(default)]
    pub device_index: u32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_warmup_frames")]
    pub warmup_frames: u32,
    #[serde(default = "default_warmup_delay")]
    pub warmup_delay_ms: u64,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

fn default_width() -> u32 { 640 }
fn default_height() -> u32 { 480 }
fn default_warmup_frames() -> u32 { 3 }
fn default_warmup_delay() -> u64 { 50 }
fn default_jpeg_quality() -> u8 { 90 }

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            width: default_width(),
            height: default_height(),
            warmup_frames: default_warmup_frames(),
            warmup_delay_ms: default_warmup_delay(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AttendanceConfig {
    /// How many of the most recent records the logs page fetches.
    #[serde(default = "default_log_limit")]
    pub log_limit: u32,
}

fn default_log_limit() -> u32 { 100 }

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self { log_limit: default_log_limit() }
    }
}

impl Config {
    /// Defaults, then the config file (if any), then the environment.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match explicit_path {
            Some(path) => Self::load_from_path(path)?,
            None => match Self::user_config_file() {
                Some(path) if path.exists() => Self::load_from_path(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_env_override(std::env::var(API_BASE_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AttendanceError::Config(format!(
                "Config file not found: {}", path.display()
            )));
        }

        tracing::info!("Loading config from: {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| AttendanceError::Config(format!("Config parse error: {}", e)))
    }

    pub fn user_config_file() -> Option<PathBuf> {
        ProjectDirs::from("com", "faceattend", "AttendanceClient")
            .map(|dirs| dirs.config_dir().join("client.toml"))
    }

    pub fn apply_env_override(&mut self, base_url: Option<String>) {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            tracing::debug!("API base URL taken from {}", API_BASE_ENV);
            self.api.base_url = url.trim().to_string();
        }
    }

    pub fn api_base(&self) -> Result<Url> {
        let url = Url::parse(&self.api.base_url).map_err(|e| AttendanceError::Config(format!(
            "Invalid API base URL {:?}: {}", self.api.base_url, e
        )))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(AttendanceError::Config(format!(
                "API base URL must use http or https, got {}", url.scheme()
            )));
        }
        Ok(url)
    }

    pub fn validate(&self) -> Result<()> {
        self.api_base()?;

        if self.camera.width == 0 || self.camera.width > 4096 {
            return Err(AttendanceError::Config(format!(
                "Camera width must be between 1 and 4096, got {}", self.camera.width
            )));
        }
        if self.camera.height == 0 || self.camera.height > 4096 {
            return Err(AttendanceError::Config(format!(
                "Camera height must be between 1 and 4096, got {}", self.camera.height
            )));
        }
        if self.camera.jpeg_quality == 0 || self.camera.jpeg_quality > 100 {
            return Err(AttendanceError::Config(format!(
                "JPEG quality must be between 1 and 100, got {}", self.camera.jpeg_quality
            )));
        }

        if self.attendance.log_limit == 0 {
            return Err(AttendanceError::Config("Log limit must be at least 1".into()));
        }

        Ok(())
    }
}
