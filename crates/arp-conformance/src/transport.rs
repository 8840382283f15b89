// crates/arp-conformance/src/transport.rs
// ============================================================================
// Module: HTTP Transport
// Description: Blocking HTTP client wrapper with timeouts and bounded retry.
// Purpose: Issue contract requests and return raw status, type, and body.
// Dependencies: reqwest, serde_json, tracing
// ============================================================================

//! ## Overview
//! [`HttpTransport`] is bound to one service base URL. Every call carries the
//! configured timeout; failed sends of idempotent requests, or sends that
//! never connected, are retried up to the configured budget with a linear
//! backoff. HTTP error statuses are returned, never retried.
//!
//! Invariants:
//! - Redirects are not followed.
//! - Normal bodies are capped at [`MAX_BODY_BYTES`]; stream samples at the
//!   caller's byte budget.
//! - The underlying client is built on first use and dropped by
//!   [`HttpTransport::close`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::io::Read;
use std::thread;
use std::time::Duration;

use reqwest::Method;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::header::ACCEPT;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use reqwest::redirect::Policy;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Hard cap on buffered response bodies.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;
/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("arp-conformance/", env!("CARGO_PKG_VERSION"));
/// Media type of JSON bodies.
pub const JSON_MEDIA_TYPE: &str = "application/json";
/// Media type of server-sent event streams.
pub const EVENT_STREAM_MEDIA_TYPE: &str = "text/event-stream";
/// Base delay between retry attempts; attempt `n` waits `n` times this.
const RETRY_BACKOFF: Duration = Duration::from_millis(250);
/// Read size used while sampling streams.
const SAMPLE_CHUNK_BYTES: usize = 512;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Transport-level failures. HTTP error statuses are not errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be constructed (bad method, URL, or header).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The HTTP client could not be built.
    #[error("http client build failed: {0}")]
    Client(String),
    /// The request failed after all attempts.
    #[error("{method} {url} failed after {attempts} attempt(s): {message}")]
    Network {
        /// HTTP method.
        method: String,
        /// Absolute URL.
        url: String,
        /// Attempts made, including the first.
        attempts: u32,
        /// Last failure message.
        message: String,
    },
    /// The response body could not be read or exceeded the cap.
    #[error("response body from {url} unreadable: {message}")]
    Body {
        /// Absolute URL.
        url: String,
        /// Failure detail.
        message: String,
    },
}

// ============================================================================
// SECTION: Responses
// ============================================================================

/// A fully read HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Raw `Content-Type` header, if any.
    pub content_type: Option<String>,
    /// Body decoded as UTF-8 (lossy).
    pub text: String,
    /// Final request URL.
    pub url: String,
}

impl HttpResponse {
    /// Returns the lowercase media type without parameters, or an empty string.
    #[must_use]
    pub fn media_type(&self) -> String {
        media_type(self.content_type.as_deref())
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns the parser error when the body is not JSON.
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.text)
    }
}

// ============================================================================
// SECTION: Transport
// ============================================================================

/// Connection settings for one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Service base URL, without trailing slash requirements.
    pub base_url: String,
    /// Per-call timeout.
    pub timeout: Duration,
    /// Retry budget for transient failures.
    pub retries: u32,
    /// Headers attached to every call.
    pub headers: BTreeMap<String, String>,
}

/// HTTP transport bound to one base URL.
#[derive(Debug)]
pub struct HttpTransport {
    /// Connection settings.
    config: TransportConfig,
    /// Lazily built client; empty until first use and after close.
    client: OnceCell<Client>,
}

impl HttpTransport {
    /// Creates a transport; no connection is made until the first request.
    #[must_use]
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    /// Returns the absolute URL for `path`.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Sends a request and reads the full body.
    ///
    /// `headers` override defaults for this call only.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on construction, network, or body failures.
    pub fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<&Value>,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError> {
        let url = self.url_for(path);
        let mut response = self.send(method, &url, body, headers)?;
        let bytes = read_body_limited(&mut response, MAX_BODY_BYTES)
            .map_err(|message| TransportError::Body {
                url: url.clone(),
                message,
            })?;
        Ok(finish(&response, &bytes))
    }

    /// Sends a request and reads at most `max_bytes` of the body.
    ///
    /// Reading stops early once a blank line (end of a server-sent event) is
    /// seen, or when the stream stalls; the partial sample is returned.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the request itself fails.
    pub fn stream_sample(
        &self,
        method: &str,
        path: &str,
        headers: &[(&str, &str)],
        max_bytes: usize,
    ) -> Result<HttpResponse, TransportError> {
        let url = self.url_for(path);
        let mut response = self.send(method, &url, None, headers)?;
        let bytes = sample_body(&mut response, max_bytes);
        Ok(finish(&response, &bytes))
    }

    /// Drops the underlying client.
    pub fn close(&mut self) {
        if self.client.take().is_some() {
            debug!(base_url = %self.config.base_url, "transport closed");
        }
    }

    /// Returns the client, building it on first use.
    fn client(&self) -> Result<&Client, TransportError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = build_client(&self.config)?;
        Ok(self.client.get_or_init(|| client))
    }

    /// Sends with retry and returns the raw response.
    fn send(
        &self,
        method: &str,
        url: &str,
        body: Option<&Value>,
        headers: &[(&str, &str)],
    ) -> Result<Response, TransportError> {
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| TransportError::InvalidRequest(format!("invalid method {method}")))?;
        let request_headers = call_headers(body.is_some(), headers)?;
        let payload = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|err| TransportError::InvalidRequest(err.to_string()))?;
        let client = self.client()?;

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let mut builder = client.request(method.clone(), url).headers(request_headers.clone());
            if let Some(payload) = &payload {
                builder = builder.body(payload.clone());
            }
            debug!(%method, url, attempt, "http request");
            match builder.send() {
                Ok(response) => {
                    debug!(%method, url, status = response.status().as_u16(), "http response");
                    return Ok(response);
                }
                Err(err) => {
                    let retryable = is_idempotent(&method) || err.is_connect();
                    if retryable && attempt <= self.config.retries {
                        debug!(%method, url, attempt, error = %err, "http request failed; retrying");
                        thread::sleep(RETRY_BACKOFF * attempt);
                        continue;
                    }
                    return Err(TransportError::Network {
                        method: method.to_string(),
                        url: url.to_string(),
                        attempts: attempt,
                        message: err.to_string(),
                    });
                }
            }
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Lowercase media type of a `Content-Type` value, without parameters.
#[must_use]
pub fn media_type(content_type: Option<&str>) -> String {
    content_type
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Builds the blocking client with default headers.
fn build_client(config: &TransportConfig) -> Result<Client, TransportError> {
    let mut defaults = HeaderMap::new();
    for (name, value) in &config.headers {
        let (name, value) = header_pair(name, value)?;
        defaults.insert(name, value);
    }
    Client::builder()
        .timeout(config.timeout)
        .user_agent(USER_AGENT)
        .redirect(Policy::none())
        .default_headers(defaults)
        .build()
        .map_err(|err| TransportError::Client(err.to_string()))
}

/// Builds per-call headers: JSON accept (and content type when sending a
/// body), then caller overrides.
fn call_headers(has_body: bool, overrides: &[(&str, &str)]) -> Result<HeaderMap, TransportError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(JSON_MEDIA_TYPE));
    if has_body {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MEDIA_TYPE));
    }
    for (name, value) in overrides {
        let (name, value) = header_pair(name, value)?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Validates one header name/value pair.
fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), TransportError> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| TransportError::InvalidRequest(format!("invalid header name {name}")))?;
    let header_value = HeaderValue::from_str(value)
        .map_err(|_| TransportError::InvalidRequest(format!("invalid value for header {name}")))?;
    Ok((header_name, header_value))
}

/// Returns true for methods safe to resend.
fn is_idempotent(method: &Method) -> bool {
    [Method::GET, Method::HEAD, Method::PUT, Method::DELETE, Method::OPTIONS].contains(method)
}

/// Captures response metadata alongside an already-read body.
fn finish(response: &Response, bytes: &[u8]) -> HttpResponse {
    HttpResponse {
        status: response.status().as_u16(),
        content_type: response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        text: String::from_utf8_lossy(bytes).into_owned(),
        url: response.url().to_string(),
    }
}

/// Reads a response body, failing when it exceeds `max_bytes`.
fn read_body_limited(response: &mut Response, max_bytes: usize) -> Result<Vec<u8>, String> {
    let max_bytes_u64 =
        u64::try_from(max_bytes).map_err(|_| "response size limit exceeds u64".to_string())?;
    if let Some(expected) = response.content_length()
        && expected > max_bytes_u64
    {
        return Err(format!("response exceeds {max_bytes} bytes"));
    }
    let mut buf = Vec::new();
    response
        .take(max_bytes_u64.saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(|err| err.to_string())?;
    if buf.len() > max_bytes {
        return Err(format!("response exceeds {max_bytes} bytes"));
    }
    Ok(buf)
}

/// Reads up to `max_bytes`, stopping at the first complete event or on a
/// read error (typically the call timeout on an idle stream).
fn sample_body(response: &mut Response, max_bytes: usize) -> Vec<u8> {
    let mut sample = Vec::new();
    let mut chunk = [0_u8; SAMPLE_CHUNK_BYTES];
    while sample.len() < max_bytes {
        let want = (max_bytes - sample.len()).min(SAMPLE_CHUNK_BYTES);
        match response.read(&mut chunk[..want]) {
            Ok(0) => break,
            Ok(read) => {
                sample.extend_from_slice(&chunk[..read]);
                if contains_event_boundary(&sample) {
                    break;
                }
            }
            Err(err) => {
                debug!(error = %err, sampled = sample.len(), "stream sample ended early");
                break;
            }
        }
    }
    sample
}

/// Returns true when `bytes` contains a blank line.
fn contains_event_boundary(bytes: &[u8]) -> bool {
    bytes.windows(2).any(|pair| pair == b"\n\n") || bytes.windows(4).any(|quad| quad == b"\r\n\r\n")
}
