//! HTTP transport for shovel: one GET at a time, never following redirects.
//!
//! - [`HttpTransport`]: the capability the fetch layer is written against
//! - [`ReqwestTransport`]: the default `reqwest`-backed binding
//! - Bounded concurrency: at most `max_connections` requests in flight per transport
//! - Optional *raw* request/response logging via `SHOVEL_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```no_run
//! # async fn demo() -> Result<(), shovel_http::HttpError> {
//! use shovel_http::{HeaderMap, HttpTransport, ReqwestTransport};
//!
//! let transport = ReqwestTransport::new(&shovel_config::ClientConfig::default())?;
//! let resp = transport.get("https://example.com/", HeaderMap::new()).await?;
//! assert!(resp.is_success());
//! # Ok(()) }
//! ```
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response headers, body snippets (truncated), and (optionally) raw
//! request/response lines on target `http.raw`.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::redirect::Policy;
use reqwest::{Client, Method, Url};
use shovel_config::ClientConfig;
use std::env;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Semaphore;

mod raw;

pub use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "SHOVEL_HTTP_RAW";

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("client build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("client is closed")]
    Closed,
}

// ==============================
// Response
// ==============================

/// Status and body of a completed GET, whatever the status class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Bytes,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// True for the 2xx class only; redirects count as failures.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, malformed sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

// ==============================
// Transport capability
// ==============================

/// Performs a single HTTP GET with exactly the headers it is given.
///
/// Implementations must not follow redirects: a 3xx comes back as a
/// [`RawResponse`] like any other status.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str, headers: HeaderMap) -> Result<RawResponse, HttpError>;

    /// Release pooled resources. Requests issued afterwards fail with [`HttpError::Closed`].
    fn close(&self);
}

// ==============================
// reqwest binding
// ==============================

pub struct ReqwestTransport {
    inner: Mutex<Option<Client>>,
    in_flight: Arc<Semaphore>,
}

impl ReqwestTransport {
    /// Build a transport from client settings.
    ///
    /// ```no_run
    /// use shovel_config::ClientConfig;
    /// use shovel_http::{HttpError, ReqwestTransport};
    ///
    /// let transport = ReqwestTransport::new(&ClientConfig {
    ///     max_connections: 4,
    ///     ..ClientConfig::default()
    /// })?;
    /// assert_eq!(transport.available_permits(), 4);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(config: &ClientConfig) -> Result<Self, HttpError> {
        let mut builder = Client::builder()
            .redirect(Policy::none())
            .connect_timeout(config.connect_timeout())
            .pool_max_idle_per_host(config.max_connections);
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let inner = builder
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            inner: Mutex::new(Some(inner)),
            in_flight: Arc::new(Semaphore::new(config.max_connections.max(1))),
        })
    }

    /// Free request slots right now.
    pub fn available_permits(&self) -> usize {
        self.in_flight.available_permits()
    }

    fn client(&self) -> Result<Client, HttpError> {
        self.inner
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
            .ok_or(HttpError::Closed)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, headers: HeaderMap) -> Result<RawResponse, HttpError> {
        let url = Url::parse(url).map_err(|e| HttpError::Url(e.to_string()))?;
        let _permit = self
            .in_flight
            .acquire()
            .await
            .map_err(|_| HttpError::Closed)?;
        let client = self.client()?;

        let req_id = format!(
            "r{:x}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );

        tracing::debug!(
            req_id=%req_id,
            host_path=%format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
            header_count=headers.len(),
            in_flight_free=self.in_flight.available_permits(),
            "http.request.start"
        );

        if raw_enabled() {
            let curl = raw::make_curl(&Method::GET, &url, &headers);
            tracing::debug!(target: "http.raw", %req_id, %curl, "request");
        }

        let t0 = Instant::now();
        let resp = client
            .get(url.clone())
            .headers(headers)
            .send()
            .await
            .map_err(|err| {
                tracing::warn!(req_id=%req_id, message=%err, "http.network_error.send");
                HttpError::Network(err.to_string())
            })?;

        let status = resp.status();
        let resp_headers = resp.headers().clone();
        let body = resp.bytes().await.map_err(|err| {
            tracing::warn!(req_id=%req_id, message=%err, "http.network_error.body");
            HttpError::Network(err.to_string())
        })?;
        let dur_ms = t0.elapsed().as_millis() as u64;

        tracing::debug!(
            req_id=%req_id,
            %status,
            duration_ms=dur_ms,
            body_len=body.len(),
            content_type=?resp_headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            location=?resp_headers.get(header::LOCATION).and_then(|v| v.to_str().ok()),
            "http.response.headers"
        );

        if raw_enabled() {
            let hdrs = raw::redact_headers(&resp_headers);
            let (text, truncated) = raw::capped_text(&body);
            tracing::info!(
                target: "http.raw",
                %req_id,
                status=%status,
                duration_ms=dur_ms,
                headers=?hdrs,
                body=%text,
                truncated
            );
        }

        tracing::trace!(
            req_id=%req_id,
            body_snippet=%raw::snip_body(&body),
            "http.response.body_snippet"
        );

        Ok(RawResponse {
            status: status.as_u16(),
            body,
        })
    }

    fn close(&self) {
        self.in_flight.close();
        if let Ok(mut guard) = self.inner.lock() {
            guard.take();
        }
        tracing::debug!("http.transport.closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_exactly_2xx() {
        assert!(RawResponse::new(200, "ok").is_success());
        assert!(RawResponse::new(204, "").is_success());
        assert!(!RawResponse::new(199, "").is_success());
        assert!(!RawResponse::new(301, "").is_success());
        assert!(!RawResponse::new(404, "").is_success());
    }

    #[test]
    fn text_replaces_invalid_utf8() {
        let resp = RawResponse::new(200, vec![b'h', b'i', 0xff]);
        assert_eq!(resp.text(), "hi\u{fffd}");
    }

    #[test]
    fn permits_follow_config() {
        let transport = ReqwestTransport::new(&ClientConfig {
            max_connections: 3,
            ..ClientConfig::default()
        })
        .unwrap();
        assert_eq!(transport.available_permits(), 3);
    }

    #[tokio::test]
    async fn closed_transport_rejects_requests() {
        let transport = ReqwestTransport::new(&ClientConfig::default()).unwrap();
        transport.close();
        let err = transport
            .get("http://127.0.0.1:9/", HeaderMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::Closed));
    }

    #[tokio::test]
    async fn malformed_url_is_rejected_before_sending() {
        let transport = ReqwestTransport::new(&ClientConfig::default()).unwrap();
        let err = transport
            .get("not a url", HeaderMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::Url(_)));
    }
}
