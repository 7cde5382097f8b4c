//! Camera access for the capture workflow.
//!
//! A [`CameraDevice`] describes a device that can be opened; opening it
//! yields a [`FrameSource`] holding the device lock. [`CameraLease`] wraps
//! that source so the lock is given back either explicitly through
//! [`CameraLease::release`] or when the lease is dropped.

pub mod capture;
#[cfg(feature = "camera-v4l")]
pub mod v4l2;

use std::sync::Arc;
use image::DynamicImage;
use crate::common::config::CameraConfig;
use crate::common::{AttendanceError, Result};

pub use capture::CaptureBuffer;
#[cfg(feature = "camera-v4l")]
pub use v4l2::V4lCamera;

pub trait CameraDevice: Send + Sync {
    /// Requests exclusive access. Permission and device errors come back
    /// unchanged as `AttendanceError::Camera`.
    fn open(&self) -> Result<Box<dyn FrameSource>>;

    fn describe(&self) -> String;
}

pub trait FrameSource: Send {
    /// Native (negotiated) resolution of the stream.
    fn resolution(&self) -> (u32, u32);

    fn grab_frame(&mut self) -> Result<DynamicImage>;
}

pub struct CameraLease {
    source: Option<Box<dyn FrameSource>>,
    label: String,
}

impl CameraLease {
    pub fn acquire(device: &dyn CameraDevice) -> Result<Self> {
        let label = device.describe();
        let source = device.open()?;
        let (width, height) = source.resolution();
        tracing::info!("Camera {} acquired at {}x{}", label, width, height);
        Ok(Self { source: Some(source), label })
    }

    /// Freezes the current frame at the stream's native resolution.
    pub fn capture(&mut self) -> Result<DynamicImage> {
        let source = self.source
            .as_mut()
            .ok_or_else(|| AttendanceError::Camera("Camera already released".into()))?;
        source.grab_frame()
    }

    pub fn release(mut self) {
        self.close();
    }

    fn close(&mut self) {
        if self.source.take().is_some() {
            tracing::info!("Camera {} released", self.label);
        }
    }
}

impl Drop for CameraLease {
    fn drop(&mut self) {
        self.close();
    }
}

/// Stand-in used when the binary is built without a camera backend.
pub struct NoCamera;

impl CameraDevice for NoCamera {
    fn open(&self) -> Result<Box<dyn FrameSource>> {
        Err(AttendanceError::Camera("No camera backend compiled in".into()))
    }

    fn describe(&self) -> String {
        "none".to_string()
    }
}

/// The capture backend this build was compiled with.
pub fn default_device(config: &CameraConfig) -> Arc<dyn CameraDevice> {
    #[cfg(feature = "camera-v4l")]
    {
        Arc::new(V4lCamera::new(config.clone()))
    }
    #[cfg(not(feature = "camera-v4l"))]
    {
        let _ = config;
        Arc::new(NoCamera)
    }
}
