//! Responses produced for matched mappings.

mod builder;

pub use builder::ResponseBuilder;

use crate::request::RequestMessage;
use base64::Engine;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// A synthesized response, independent of the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub delay: Option<Duration>,
}

impl MockResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
            delay: None,
        }
    }

    pub fn into_hyper(self) -> Result<Response<Full<Bytes>>, ResponseError> {
        let status =
            StatusCode::from_u16(self.status).map_err(|_| ResponseError::InvalidStatus(self.status))?;
        Ok(ResponseBuilder::new(status)
            .merge_headers(self.headers)
            .body(self.body)
            .build_full())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("Invalid status code {0}")]
    InvalidStatus(u16),

    #[error("Failed to produce response body: {0}")]
    Body(String),
}

/// Produces the response for a matched mapping.
pub trait ResponseProvider: Send + Sync + fmt::Debug {
    fn provide(&self, request: &RequestMessage) -> Result<MockResponse, ResponseError>;
}

/// Body of a [`StaticResponse`].
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResponseBody {
    #[default]
    Empty,
    Text(String),
    Json(Value),
    /// Base64-encoded bytes, decoded when the response is produced.
    Base64(String),
}

/// A fixed response.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: ResponseBody,
    delay: Option<Duration>,
}

impl Default for StaticResponse {
    fn default() -> Self {
        Self::new(200)
    }
}

impl StaticResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: ResponseBody::Empty,
            delay: None,
        }
    }

    pub fn ok() -> Self {
        Self::new(200)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = ResponseBody::Text(body.into());
        self
    }

    pub fn with_json(mut self, json: Value) -> Self {
        self.body = ResponseBody::Json(json);
        self
    }

    pub fn with_base64(mut self, encoded: impl Into<String>) -> Self {
        self.body = ResponseBody::Base64(encoded.into());
        self
    }

    pub fn with_body_kind(mut self, body: ResponseBody) -> Self {
        self.body = body;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }
}

impl ResponseProvider for StaticResponse {
    fn provide(&self, _request: &RequestMessage) -> Result<MockResponse, ResponseError> {
        let mut headers = self.headers.clone();
        let body = match &self.body {
            ResponseBody::Empty => Bytes::new(),
            ResponseBody::Text(text) => Bytes::from(text.clone()),
            ResponseBody::Json(json) => {
                if !self.has_header("content-type") {
                    headers.push(("Content-Type".to_string(), "application/json".to_string()));
                }
                Bytes::from(json.to_string())
            }
            ResponseBody::Base64(encoded) => base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map(Bytes::from)
                .map_err(|e| ResponseError::Body(e.to_string()))?,
        };

        Ok(MockResponse {
            status: self.status,
            headers,
            body,
            delay: self.delay,
        })
    }
}

/// Serves the Prometheus text exposition.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsResponse;

impl ResponseProvider for MetricsResponse {
    fn provide(&self, _request: &RequestMessage) -> Result<MockResponse, ResponseError> {
        Ok(MockResponse {
            status: 200,
            headers: vec![(
                "Content-Type".to_string(),
                "text/plain; version=0.0.4".to_string(),
            )],
            body: Bytes::from(crate::metrics::collect_metrics()),
            delay: None,
        })
    }
}

/// JSON body of the 404 answered when no mapping matches.
pub fn no_match_body() -> Bytes {
    Bytes::from(serde_json::json!({"status": "No matching mapping found"}).to_string())
}
