#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use attendance_client::camera::{CameraDevice, FrameSource};
use attendance_client::service::protocol::LOGIN_PATH;
use attendance_client::service::{ApiGateway, ApiRequest, ApiResponse, Transport};
use attendance_client::{AttendanceError, Result, SessionStore};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use image::{DynamicImage, Rgb, RgbImage};
use parking_lot::Mutex;
use reqwest::{StatusCode, Url};
use tokio::sync::Notify;

/// Holds requests to one path until the test lets them through.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

/// Scripted backend: answers by exact URL path and records every request.
#[derive(Default)]
pub struct StubTransport {
    routes: Mutex<Vec<(String, u16, String)>>,
    calls: Mutex<Vec<ApiRequest>>,
    gate: Option<(String, Gate)>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated(path: &str) -> Self {
        Self { gate: Some((path.to_string(), Gate::default())), ..Self::default() }
    }

    pub fn gate(&self) -> &Gate {
        &self.gate.as_ref().expect("transport is not gated").1
    }

    pub fn route(&self, path: &str, status: u16, body: &str) {
        let mut routes = self.routes.lock();
        routes.retain(|(p, _, _)| p != path);
        routes.push((path.to_string(), status, body.to_string()));
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().clone()
    }

    pub fn count_for(&self, path: &str) -> usize {
        self.calls.lock().iter().filter(|r| r.url.path() == path).count()
    }

    pub fn last_for(&self, path: &str) -> Option<ApiRequest> {
        self.calls.lock().iter().rev().find(|r| r.url.path() == path).cloned()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let path = request.url.path().to_string();
        self.calls.lock().push(request);

        if let Some((gated, gate)) = &self.gate {
            if *gated == path {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
        }

        let route = self.routes.lock().iter().find(|(p, _, _)| *p == path).cloned();
        let (status, body) = match route {
            Some((_, status, body)) => (status, body),
            None => (404, r#"{"detail":"Not Found"}"#.to_string()),
        };
        Ok(ApiResponse {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.into_bytes(),
        })
    }
}

pub fn gateway(stub: &Arc<StubTransport>) -> ApiGateway {
    ApiGateway::new(Url::parse("http://localhost:8000").unwrap(), stub.clone())
}

/// Unsigned JWT-shaped token carrying `claims`.
pub fn token_with(claims: serde_json::Value) -> String {
    format!(
        "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.{}.sig",
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}

pub async fn login(stub: &Arc<StubTransport>, username: &str, token: &str) -> SessionStore {
    stub.route(LOGIN_PATH, 200, &serde_json::json!({ "access_token": token }).to_string());
    let store = SessionStore::new(gateway(stub));
    store.login(username, "secret").await.unwrap();
    store
}

pub fn test_frame() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(64, 48, |x, y| Rgb([(x * 4) as u8, (y * 5) as u8, 90])))
}

/// In-memory camera. `deny` simulates the platform refusing access;
/// with a `shutter`, each frame blocks the reading thread until a signal
/// arrives on it.
#[derive(Default)]
pub struct FakeCamera {
    pub deny: bool,
    pub open: Arc<AtomicUsize>,
    pub shutter: Option<Arc<Mutex<Receiver<()>>>>,
}

struct FakeSource {
    open: Arc<AtomicUsize>,
    shutter: Option<Arc<Mutex<Receiver<()>>>>,
}

impl CameraDevice for FakeCamera {
    fn open(&self) -> Result<Box<dyn FrameSource>> {
        if self.deny {
            return Err(AttendanceError::Camera("Permission denied".into()));
        }
        self.open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSource { open: self.open.clone(), shutter: self.shutter.clone() }))
    }

    fn describe(&self) -> String {
        "fake".to_string()
    }
}

impl FrameSource for FakeSource {
    fn resolution(&self) -> (u32, u32) {
        (64, 48)
    }

    fn grab_frame(&mut self) -> Result<DynamicImage> {
        if let Some(shutter) = &self.shutter {
            shutter
                .lock()
                .recv_timeout(Duration::from_secs(5))
                .map_err(|_| AttendanceError::Camera("Shutter never fired".into()))?;
        }
        Ok(test_frame())
    }
}

impl Drop for FakeSource {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}
