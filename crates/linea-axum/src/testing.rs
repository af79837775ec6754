//! In-process test client.
//!
//! `TestClient` installs a replacement session provider on an [`App`], runs
//! startup and sends requests straight into the router, with no socket. On
//! drop, panic unwinding included, it clears the override table and shuts
//! the app down.
//!
//! Clearing removes every override, not just the one installed here. Only
//! one client per `App` should be alive at a time.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tower::ServiceExt;

use linea_db::SessionProvider;

use crate::app::App;
use crate::overrides::DependencyKey;

/// Errors from building or reading a test request.
#[derive(Debug, Error)]
pub enum TestClientError {
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] axum::http::Error),

    #[error("Failed to encode body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to read body: {0}")]
    Body(String),
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    /// Body as JSON, or `Null` if it is not JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap_or(serde_json::Value::Null)
    }

    /// Body decoded into `T`.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Header value as text, if present and printable.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Client bound to an app whose sessions come from a test provider.
pub struct TestClient {
    app: App,
    router: Router,
}

impl std::fmt::Debug for TestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestClient")
            .field("app", &self.app)
            .finish_non_exhaustive()
    }
}

impl TestClient {
    /// Install `sessions` as the session dependency, then start the app.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(app: &App, sessions: Arc<dyn SessionProvider>) -> Self {
        tracing::debug!(provider = sessions.name(), "Installing session override");
        app.overrides().set(DependencyKey::Session, sessions);
        app.startup();
        Self {
            app: app.clone(),
            router: app.router(),
        }
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub async fn get(&self, path: &str) -> Result<TestResponse, TestClientError> {
        self.request(Method::GET, path, &[], None).await
    }

    pub async fn get_with_headers(
        &self,
        path: &str,
        headers: &[(&str, &str)],
    ) -> Result<TestResponse, TestClientError> {
        self.request(Method::GET, path, headers, None).await
    }

    /// POST without a body.
    pub async fn post(&self, path: &str) -> Result<TestResponse, TestClientError> {
        self.request(Method::POST, path, &[], None).await
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<TestResponse, TestClientError> {
        let body = serde_json::to_vec(body)?;
        self.request(Method::POST, path, &[], Some(body)).await
    }

    pub async fn put_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<TestResponse, TestClientError> {
        let body = serde_json::to_vec(body)?;
        self.request(Method::PUT, path, &[], Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<TestResponse, TestClientError> {
        self.request(Method::DELETE, path, &[], None).await
    }

    pub async fn options(
        &self,
        path: &str,
        headers: &[(&str, &str)],
    ) -> Result<TestResponse, TestClientError> {
        self.request(Method::OPTIONS, path, headers, None).await
    }

    /// Send one request through the router and buffer the response.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        headers: &[(&str, &str)],
        json_body: Option<Vec<u8>>,
    ) -> Result<TestResponse, TestClientError> {
        let mut builder = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let body = match json_body {
            Some(bytes) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(bytes)
            }
            None => Body::empty(),
        };
        let request = builder.body(body)?;

        let response = match self.router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };

        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|e| TestClientError::Body(e.to_string()))?;

        Ok(TestResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }
}

impl Drop for TestClient {
    fn drop(&mut self) {
        self.app.overrides().clear();
        self.app.shutdown();
        tracing::debug!("Test client dropped, overrides cleared");
    }
}
