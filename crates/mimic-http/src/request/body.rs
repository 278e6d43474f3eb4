//! Request body representation and content detection.

use super::{parse_query, Fields};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Detected shape of a request body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyType {
    #[default]
    None,
    String,
    Json,
    Bytes,
    FormUrlEncoded,
    MultiPart,
}

/// A request body in every representation it could be parsed into.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BodyData {
    pub detected: BodyType,
    pub string: Option<String>,
    pub json: Option<Value>,
    pub bytes: Option<Bytes>,
    pub form: Option<Fields>,
}

impl BodyData {
    pub fn from_string(body: impl Into<String>) -> Self {
        let body = body.into();
        Self {
            detected: BodyType::String,
            bytes: Some(Bytes::from(body.clone())),
            string: Some(body),
            ..Self::default()
        }
    }

    pub fn from_json(json: Value) -> Self {
        let string = json.to_string();
        Self {
            detected: BodyType::Json,
            bytes: Some(Bytes::from(string.clone())),
            string: Some(string),
            json: Some(json),
            form: None,
        }
    }

    /// Detect the body type from the content type first, then by sniffing.
    pub fn from_bytes(content_type: Option<&str>, bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Self::default();
        }

        let content_type = content_type.unwrap_or("").to_ascii_lowercase();
        let Ok(text) = std::str::from_utf8(&bytes) else {
            return Self {
                detected: BodyType::Bytes,
                bytes: Some(bytes),
                ..Self::default()
            };
        };
        let text = text.to_string();

        let mut body = Self {
            detected: BodyType::String,
            string: Some(text),
            bytes: Some(bytes),
            ..Self::default()
        };
        let text = body.string.as_deref().unwrap_or_default();

        if content_type.contains("application/x-www-form-urlencoded") {
            body.form = Some(parse_query(text));
            body.detected = BodyType::FormUrlEncoded;
        } else if content_type.starts_with("multipart/") {
            body.detected = BodyType::MultiPart;
        } else if content_type.contains("json") || looks_like_json(text) {
            if let Ok(json) = serde_json::from_str::<Value>(text) {
                body.json = Some(json);
                body.detected = BodyType::Json;
            }
        }
        body
    }

    pub fn is_empty(&self) -> bool {
        self.detected == BodyType::None
    }
}

fn looks_like_json(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.starts_with('{') || trimmed.starts_with('[')
}
