use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use parking_lot::Mutex;
use crate::camera::{CameraDevice, CameraLease, CaptureBuffer};
use crate::common::{AttendanceError, Result};
use crate::core::{admin_required, login_required, Notice};
use crate::service::protocol::{manual_path, AttendanceDecision, MARK_ATTENDANCE_PATH, UPLOAD_FIELD};
use crate::service::{CallOptions, RequestBody};
use crate::session::SessionStore;

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureState {
    CameraOff,
    CameraOn,
    Capturing,
    Result(Notice),
}

/// Clears the in-flight flag however the submission ends, including when
/// the future is dropped half way.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Live capture: camera on, freeze a frame, upload it, show the verdict.
/// At most one upload is in flight per workflow.
pub struct AttendanceWorkflow {
    session: SessionStore,
    camera: Arc<dyn CameraDevice>,
    lease: Arc<Mutex<Option<CameraLease>>>,
    state: Mutex<CaptureState>,
    loading: AtomicBool,
    jpeg_quality: u8,
}

impl AttendanceWorkflow {
    pub fn new(session: SessionStore, camera: Arc<dyn CameraDevice>, jpeg_quality: u8) -> Self {
        Self {
            session,
            camera,
            lease: Arc::new(Mutex::new(None)),
            state: Mutex::new(CaptureState::CameraOff),
            loading: AtomicBool::new(false),
            jpeg_quality,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state.lock().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    pub fn camera_on(&self) -> bool {
        self.lease.lock().is_some()
    }

    /// Device errors (permission denied, busy, missing) are returned to the
    /// caller as they are.
    pub fn start_camera(&self) -> Result<()> {
        let mut lease = self.lease.lock();
        if lease.is_some() {
            return Ok(());
        }

        *lease = Some(CameraLease::acquire(self.camera.as_ref())?);
        *self.state.lock() = CaptureState::CameraOn;
        Ok(())
    }

    pub fn stop_camera(&self) {
        if let Some(lease) = self.lease.lock().take() {
            lease.release();
        }
        *self.state.lock() = CaptureState::CameraOff;
    }

    /// Returns `None` when another submission is still pending; that call
    /// does nothing at all.
    pub async fn capture_and_submit(&self) -> Option<Notice> {
        let session = self.session.snapshot();
        let Some(token) = session.token() else {
            return Some(Notice::failure(&login_required()));
        };

        let Some(_busy) = BusyGuard::try_acquire(&self.loading) else {
            tracing::debug!("Attendance submission already in flight, ignoring");
            return None;
        };

        if !self.camera_on() {
            return Some(Notice::Failure("Start the camera first".into()));
        }

        *self.state.lock() = CaptureState::Capturing;
        let notice = match self.submit_frame(token).await {
            Ok(decision) => {
                tracing::info!("Attendance marked: {} ({:.3})", decision.status, decision.confidence);
                Notice::Success(describe_decision(&decision))
            }
            Err(e) => {
                tracing::warn!("Attendance submission failed: {}", e);
                Notice::failure(&e)
            }
        };

        *self.state.lock() = CaptureState::Result(notice.clone());
        Some(notice)
    }

    async fn submit_frame(&self, token: &str) -> Result<AttendanceDecision> {
        // Device reads block (warmup frames), so they stay off the event loop.
        let lease = Arc::clone(&self.lease);
        let quality = self.jpeg_quality;
        let buffer = tokio::task::spawn_blocking(move || -> Result<CaptureBuffer> {
            let mut lease = lease.lock();
            let lease = lease
                .as_mut()
                .ok_or_else(|| AttendanceError::Camera("Camera was stopped".into()))?;
            let frame = lease.capture()?;
            CaptureBuffer::from_frame(&frame, quality)
        })
        .await
        .map_err(|e| AttendanceError::Camera(format!("Capture task failed: {}", e)))??;
        tracing::debug!("Captured {:?}", buffer);

        let upload = RequestBody::Multipart(vec![buffer.to_part(UPLOAD_FIELD)]);
        self.session
            .gateway()
            .call_as(MARK_ATTENDANCE_PATH, CallOptions::post(upload).with_token(Some(token)))
            .await
    }
}

pub fn describe_decision(decision: &AttendanceDecision) -> String {
    let liveness = decision.liveness_score
        .map(|s| s.to_string())
        .unwrap_or_else(|| "not applicable".to_string());
    format!(
        "Attendance marked: {} | confidence {:.1}% | liveness {}",
        decision.status,
        decision.confidence * 100.0,
        liveness
    )
}

/// Records attendance for `user_id` without a face match. Admin only.
pub async fn manual_override(session: &SessionStore, user_id: i64, note: &str) -> Notice {
    match submit_manual(session, user_id, note).await {
        Ok(decision) => Notice::Success(format!(
            "Manual attendance recorded for user {}: {}", user_id, decision.status
        )),
        Err(e) => {
            tracing::warn!("Manual attendance failed: {}", e);
            Notice::failure(&e)
        }
    }
}

async fn submit_manual(session: &SessionStore, user_id: i64, note: &str) -> Result<AttendanceDecision> {
    let note = note.trim();
    if note.is_empty() {
        return Err(AttendanceError::Validation("A note is required for manual attendance".into()));
    }

    let snapshot = session.snapshot();
    let token = snapshot.token().ok_or_else(login_required)?;
    if !snapshot.is_admin() {
        return Err(admin_required());
    }

    session
        .gateway()
        .call_as(&manual_path(user_id, note), CallOptions::post(RequestBody::Empty).with_token(Some(token)))
        .await
}
