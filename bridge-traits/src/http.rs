//! HTTP Client Abstraction
//!
//! Request/response types and the async client trait the catalog gateway
//! talks through. Implementations perform exactly one attempt per call;
//! retry policy, if any, belongs to the caller.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{BridgeError, Result};

/// HTTP method types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// HTTP request builder
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Append a query parameter. Empty values are dropped so optional
    /// filters can be passed through unconditionally.
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.query.push((key.into(), value));
        }
        self
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let json = serde_json::to_vec(body).map_err(|e| {
            BridgeError::OperationFailed(format!("JSON serialization failed: {}", e))
        })?;
        self.body = Some(Bytes::from(json));
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Full URL with the percent-encoded query string appended.
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }

        let query = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.url, separator, query)
    }
}

/// HTTP response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

/// Error body shape used by the backend (`{"detail": "..."}`).
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

impl HttpResponse {
    /// Parse response body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            BridgeError::OperationFailed(format!("JSON deserialization failed: {}", e))
        })
    }

    /// Get response body as UTF-8 string
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| BridgeError::OperationFailed(format!("Invalid UTF-8: {}", e)))
    }

    /// Check if response status is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Header lookup, case-insensitive on the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Server-provided error message for a failed response.
    ///
    /// Prefers the `detail` field of a JSON body, falls back to the raw text,
    /// and finally to the bare status code.
    pub fn error_detail(&self) -> String {
        if let Ok(ErrorBody {
            detail: Some(detail),
        }) = serde_json::from_slice::<ErrorBody>(&self.body)
        {
            return match detail {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
        }

        match self.text() {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            _ => format!("HTTP {}", self.status),
        }
    }
}

/// Async HTTP client trait
///
/// Abstracts HTTP so the catalog gateway can run against reqwest on desktop
/// and against a scripted mock in tests.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::http::{HttpClient, HttpRequest};
///
/// async fn fetch_dates(client: &dyn HttpClient) -> Result<String> {
///     let request = HttpRequest::get("http://localhost:8000/api/dates");
///     let response = client.execute(request).await?;
///     response.text()
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request once.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Network`] or [`BridgeError::Timeout`] when no
    /// response was received. Non-2xx responses are returned as `Ok` so the
    /// caller can read the status and error body.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_request_builder() {
        let request = HttpRequest::get("https://example.com/api/videos")
            .header("User-Agent", "test")
            .query_param("date", "2025-08-13")
            .query_param("main_zone", "")
            .timeout(Duration::from_secs(30));

        assert_eq!(request.url, "https://example.com/api/videos");
        assert_eq!(request.headers.get("User-Agent"), Some(&"test".to_string()));
        assert_eq!(request.query.len(), 1);
        assert_eq!(request.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_full_url_encodes_query() {
        let request = HttpRequest::get("http://host/api/proxy/image")
            .query_param("url", "https://i0.hdslb.com/a b.jpg");

        assert_eq!(
            request.full_url(),
            "http://host/api/proxy/image?url=https%3A%2F%2Fi0.hdslb.com%2Fa%20b.jpg"
        );
    }

    #[test]
    fn test_full_url_without_query() {
        let request = HttpRequest::post("http://host/api/crawl/start");
        assert_eq!(request.full_url(), "http://host/api/crawl/start");
    }

    #[test]
    fn test_http_response_status_checks() {
        let response = HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from("test"),
        };

        assert!(response.is_success());

        let response = HttpResponse {
            status: 404,
            headers: HashMap::new(),
            body: Bytes::new(),
        };
        assert!(!response.is_success());
    }

    #[test]
    fn test_error_detail_prefers_json_detail() {
        let response = HttpResponse {
            status: 400,
            headers: HashMap::new(),
            body: Bytes::from(r#"{"detail":"爬取任务已在运行中"}"#),
        };
        assert_eq!(response.error_detail(), "爬取任务已在运行中");
    }

    #[test]
    fn test_error_detail_falls_back_to_status() {
        let response = HttpResponse {
            status: 502,
            headers: HashMap::new(),
            body: Bytes::new(),
        };
        assert_eq!(response.error_detail(), "HTTP 502");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "image/webp".to_string());
        let response = HttpResponse {
            status: 200,
            headers,
            body: Bytes::new(),
        };
        assert_eq!(response.header("Content-Type"), Some("image/webp"));
    }
}
