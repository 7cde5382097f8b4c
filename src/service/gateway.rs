use std::sync::Arc;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use crate::common::{ApiError, AttendanceError, Result};
use crate::service::transport::{ApiRequest, RequestBody, Transport};

/// Per-call options for [`ApiGateway::call`].
#[derive(Debug, Clone)]
pub struct CallOptions<'a> {
    pub method: Method,
    pub token: Option<&'a str>,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

impl Default for CallOptions<'_> {
    fn default() -> Self {
        Self {
            method: Method::GET,
            token: None,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }
}

impl<'a> CallOptions<'a> {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: RequestBody) -> Self {
        Self { method: Method::POST, body, ..Self::default() }
    }

    pub fn with_token(mut self, token: Option<&'a str>) -> Self {
        self.token = token;
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

/// Every outbound request goes through here: auth header, content type
/// rules, best-effort JSON parsing and status classification.
#[derive(Clone)]
pub struct ApiGateway {
    base: Url,
    transport: Arc<dyn Transport>,
}

impl ApiGateway {
    pub fn new(base: Url, transport: Arc<dyn Transport>) -> Self {
        Self { base, transport }
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn resolve(&self, path: &str) -> Result<Url> {
        let joined = format!("{}{}", self.base.as_str().trim_end_matches('/'), path);
        Url::parse(&joined)
            .map_err(|e| AttendanceError::Validation(format!("Invalid request path {}: {}", path, e)))
    }

    pub async fn call(&self, path: &str, options: CallOptions<'_>) -> Result<Value> {
        let url = self.resolve(path)?;
        let CallOptions { method, token, mut headers, body } = options;

        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| AttendanceError::AuthRequired("Session token is malformed".into()))?;
            headers.insert(AUTHORIZATION, value);
        }
        if !headers.contains_key(ACCEPT) {
            headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        }

        match &body {
            // The transport writes the boundary into the content type itself.
            RequestBody::Multipart(_) => {
                headers.remove(CONTENT_TYPE);
            }
            RequestBody::Json(_) if !headers.contains_key(CONTENT_TYPE) => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }
            RequestBody::Form(_) if !headers.contains_key(CONTENT_TYPE) => {
                headers.insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("application/x-www-form-urlencoded"),
                );
            }
            _ => {}
        }

        tracing::debug!("{} {}", method, url.path());
        let response = self.transport
            .send(ApiRequest { method: method.clone(), url, headers, body })
            .await?;

        let data = parse_body(&response.body);
        if !response.status.is_success() {
            let err = ApiError::new(response.status.as_u16(), error_detail(&data));
            tracing::warn!("{} {} failed with {}: {}", method, path, err.status, err);
            return Err(err.into());
        }

        tracing::debug!("{} {} -> {}", method, path, response.status);
        Ok(data)
    }

    /// Like [`call`](Self::call), then decodes the payload into `T`.
    pub async fn call_as<T: DeserializeOwned>(&self, path: &str, options: CallOptions<'_>) -> Result<T> {
        let data = self.call(path, options).await?;
        serde_json::from_value(data)
            .map_err(|e| AttendanceError::Protocol(format!("{}: {}", path, e)))
    }
}

/// Empty or non-JSON bodies become `null`.
fn parse_body(body: &[u8]) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(body).unwrap_or(Value::Null)
}

fn error_detail(data: &Value) -> Option<String> {
    ["detail", "message"]
        .iter()
        .find_map(|key| data.get(*key).and_then(Value::as_str).filter(|s| !s.trim().is_empty()))
        .map(str::to_owned)
}
