//! Process-wide authentication state.
//!
//! A [`Session`] is either empty or fully populated (token, principal and
//! role together). [`SessionStore`] is the single owner; `login` and
//! `logout` replace the whole value at once, every other caller only reads
//! snapshots.

pub mod claims;
pub mod form;

use std::fmt;
use std::sync::Arc;
use parking_lot::RwLock;
use crate::common::{AttendanceError, Result};
use crate::service::protocol::{TokenResponse, LOGIN_PATH};
use crate::service::{ApiGateway, CallOptions, RequestBody};

pub use form::LoginForm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("ADMIN"),
            Role::User => f.write_str("USER"),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
struct Credentials {
    token: String,
    principal: String,
    role: Role,
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    credentials: Option<Credentials>,
}

impl Session {
    pub fn authenticated(token: String, principal: String, role: Role) -> Self {
        Self { credentials: Some(Credentials { token, principal, role }) }
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.token.as_str())
    }

    pub fn principal_name(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.principal.as_str())
    }

    pub fn role(&self) -> Option<Role> {
        self.credentials.as_ref().map(|c| c.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }
}

// Keeps the token out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.credentials {
            Some(c) => f.debug_struct("Session")
                .field("principal", &c.principal)
                .field("role", &c.role)
                .field("token", &"<redacted>")
                .finish(),
            None => f.write_str("Session(anonymous)"),
        }
    }
}

#[derive(Clone)]
pub struct SessionStore {
    gateway: ApiGateway,
    current: Arc<RwLock<Session>>,
}

impl SessionStore {
    pub fn new(gateway: ApiGateway) -> Self {
        Self { gateway, current: Arc::new(RwLock::new(Session::default())) }
    }

    pub fn gateway(&self) -> &ApiGateway {
        &self.gateway
    }

    pub fn snapshot(&self) -> Session {
        self.current.read().clone()
    }

    pub fn current_role(&self) -> Option<Role> {
        self.current.read().role()
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AttendanceError::Validation("Username and password are required".into()));
        }

        let form = RequestBody::Form(vec![
            ("username".to_string(), username.to_string()),
            ("password".to_string(), password.to_string()),
        ]);
        let data = match self.gateway.call(LOGIN_PATH, CallOptions::post(form)).await {
            Ok(data) => data,
            Err(AttendanceError::Api(api)) => {
                tracing::warn!("Login rejected for {} with status {}", username, api.status);
                return Err(AttendanceError::Auth(
                    api.detail.unwrap_or_else(|| "Login failed".to_string()),
                ));
            }
            Err(other) => return Err(other),
        };

        let token: TokenResponse = serde_json::from_value(data)
            .map_err(|e| AttendanceError::Protocol(format!("login response: {}", e)))?;
        let role = claims::role_from_token(&token.access_token)
            .unwrap_or_else(|| claims::role_from_username(username));

        let session = Session::authenticated(token.access_token, username.to_string(), role);
        *self.current.write() = session.clone();
        tracing::info!("Logged in as {} ({})", username, role);
        Ok(session)
    }

    /// Always succeeds, also when nobody is logged in.
    pub fn logout(&self) {
        let previous = std::mem::take(&mut *self.current.write());
        if let Some(name) = previous.principal_name() {
            tracing::info!("Logged out {}", name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::transport::{ApiRequest, ApiResponse, Transport};
    use async_trait::async_trait;
    use reqwest::{StatusCode, Url};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        status: u16,
        body: String,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for Fixed {
        async fn send(&self, _request: ApiRequest) -> Result<ApiResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ApiResponse {
                status: StatusCode::from_u16(self.status).unwrap(),
                body: self.body.clone().into_bytes(),
            })
        }
    }

    fn store(status: u16, body: &str) -> (SessionStore, Arc<Fixed>) {
        let transport = Arc::new(Fixed { status, body: body.into(), calls: AtomicUsize::new(0) });
        let gateway = ApiGateway::new(Url::parse("http://localhost:8000").unwrap(), transport.clone());
        (SessionStore::new(gateway), transport)
    }

    fn assert_consistent(session: &Session) {
        assert_eq!(session.token().is_none(), session.principal_name().is_none());
        assert_eq!(session.token().is_none(), session.role().is_none());
    }

    #[tokio::test]
    async fn login_populates_everything() {
        let (store, _) = store(200, r#"{"access_token":"opaque","token_type":"bearer"}"#);
        let session = store.login("admin", "pw").await.unwrap();

        assert_eq!(session.token(), Some("opaque"));
        assert_eq!(session.principal_name(), Some("admin"));
        assert_eq!(store.current_role(), Some(Role::Admin));
        assert_consistent(&store.snapshot());
    }

    #[tokio::test]
    async fn rejected_login_surfaces_detail() {
        let (store, _) = store(401, r#"{"detail":"Invalid credentials"}"#);
        let err = store.login("alice", "nope").await.unwrap_err();
        assert!(matches!(err, AttendanceError::Auth(_)));
        assert_eq!(err.to_string(), "Invalid credentials");
        assert!(!store.snapshot().is_authenticated());
    }

    #[tokio::test]
    async fn rejected_login_without_detail_uses_fallback() {
        let (store, _) = store(500, "gateway exploded");
        let err = store.login("alice", "pw").await.unwrap_err();
        assert_eq!(err.to_string(), "Login failed");
    }

    #[tokio::test]
    async fn blank_detail_uses_fallback() {
        let (store, _) = store(401, r#"{"detail":""}"#);
        let err = store.login("alice", "pw").await.unwrap_err();
        assert_eq!(err.to_string(), "Login failed");
    }

    #[tokio::test]
    async fn empty_credentials_never_hit_network() {
        let (store, transport) = store(200, r#"{"access_token":"t"}"#);
        assert!(store.login("", "pw").await.is_err());
        assert!(store.login("bob", "").await.is_err());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let (store, _) = store(200, r#"{"access_token":"t"}"#);
        store.login("bob", "pw").await.unwrap();
        assert_eq!(store.current_role(), Some(Role::User));

        store.logout();
        store.logout();
        let session = store.snapshot();
        assert!(!session.is_authenticated());
        assert_consistent(&session);
    }

    #[test]
    fn debug_output_hides_token() {
        let session = Session::authenticated("secret-token".into(), "bob".into(), Role::User);
        assert!(!format!("{:?}", session).contains("secret-token"));
    }
}
