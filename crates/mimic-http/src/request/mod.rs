//! Incoming request model consumed by the matching engine.
//!
//! [`RequestMessage`] is transport-agnostic: the server shell builds one from
//! a hyper request, and tests build them directly.

mod body;

pub use body::{BodyData, BodyType};

use chrono::{DateTime, Utc};

/// Ordered multi-valued map (headers, query parameters, cookies, form fields).
///
/// Keys keep their first-seen spelling; lookups may be case-insensitive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    entries: Vec<(String, Vec<String>)>,
    case_insensitive: bool,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn case_insensitive() -> Self {
        Self {
            entries: Vec::new(),
            case_insensitive: true,
        }
    }

    fn position(&self, key: &str) -> Option<usize> {
        if self.case_insensitive {
            self.entries
                .iter()
                .position(|(k, _)| k.eq_ignore_ascii_case(key))
        } else {
            self.entries.iter().position(|(k, _)| k == key)
        }
    }

    /// Add a value, keeping any existing values for the key.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        match self.position(&key) {
            Some(idx) => self.entries[idx].1.push(value.into()),
            None => self.entries.push((key, vec![value.into()])),
        }
    }

    pub fn get_all(&self, key: &str) -> Option<&[String]> {
        self.position(key).map(|idx| self.entries[idx].1.as_slice())
    }

    /// Lookup ignoring the map's own case rule, used when a matcher asks for
    /// case-insensitive keys on a case-sensitive map.
    pub fn get_all_ignore_case(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_slice())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_all(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Fields {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut fields = Fields::new();
        for (k, v) in iter {
            fields.append(k, v);
        }
        fields
    }
}

/// Decode one `application/x-www-form-urlencoded` component.
fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

/// Parse a query string (without the leading `?`) into ordered, multi-valued fields.
///
/// Keys without `=` get an empty value.
pub fn parse_query(query: &str) -> Fields {
    let mut fields = Fields::new();
    for pair in query.split('&').filter(|s| !s.is_empty()) {
        match pair.split_once('=') {
            Some((key, value)) => fields.append(decode_component(key), decode_component(value)),
            None => fields.append(decode_component(pair), String::new()),
        }
    }
    fields
}

/// Parse a `Cookie` header value (`a=1; b=2`).
pub fn parse_cookies(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            let (name, value) = part.split_once('=').unwrap_or((part, ""));
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// A request as seen by the matchers.
#[derive(Debug, Clone)]
pub struct RequestMessage {
    pub method: String,
    /// Path plus query string, as received (`/api/users?id=1`).
    pub url: String,
    /// Percent-decoded path.
    pub path: String,
    /// Raw path, still percent-encoded.
    pub absolute_path: String,
    pub query: Fields,
    pub headers: Fields,
    pub cookies: Fields,
    pub client_ip: String,
    pub body: BodyData,
    pub received_at: DateTime<Utc>,
}

impl RequestMessage {
    /// Build a request from a method and a path-and-query string.
    ///
    /// An absolute URL (`http://host/path?q`) is accepted too; only its path
    /// and query are kept.
    pub fn new(method: impl Into<String>, url: &str) -> Self {
        let path_and_query = match url.find("://") {
            Some(scheme_end) => {
                let rest = &url[scheme_end + 3..];
                rest.find('/').map_or("/", |idx| &rest[idx..])
            }
            None => url,
        };

        let (raw_path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (path_and_query, None),
        };
        let raw_path = if raw_path.is_empty() { "/" } else { raw_path };

        let path = urlencoding::decode(raw_path)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| raw_path.to_string());

        Self {
            method: method.into().to_uppercase(),
            url: path_and_query.to_string(),
            path,
            absolute_path: raw_path.to_string(),
            query: query.map(parse_query).unwrap_or_default(),
            headers: Fields::case_insensitive(),
            cookies: Fields::case_insensitive(),
            client_ip: String::from("127.0.0.1"),
            body: BodyData::default(),
            received_at: Utc::now(),
        }
    }

    /// Add a header. `Cookie` headers are also split into [`Self::cookies`].
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_header(name, value);
        self
    }

    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if name.eq_ignore_ascii_case("cookie") {
            for (k, v) in parse_cookies(&value) {
                self.cookies.append(k, v);
            }
        }
        self.headers.append(name, value);
    }

    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = ip.into();
        self
    }

    pub fn with_body(mut self, body: BodyData) -> Self {
        self.body = body;
        self
    }

    /// Set the body, detecting its type from the `Content-Type` header if present.
    pub fn with_body_bytes(mut self, bytes: impl Into<bytes::Bytes>) -> Self {
        let content_type = self.headers.get("content-type").map(str::to_string);
        self.body = BodyData::from_bytes(content_type.as_deref(), bytes);
        self
    }

    pub fn with_received_at(mut self, at: DateTime<Utc>) -> Self {
        self.received_at = at;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_multi_valued_and_ordered() {
        let mut fields = Fields::new();
        fields.append("b", "1");
        fields.append("a", "2");
        fields.append("b", "3");

        assert_eq!(fields.get_all("b"), Some(&["1".to_string(), "3".to_string()][..]));
        assert_eq!(fields.get("b"), Some("1"));
        let keys: Vec<&str> = fields.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert!(fields.get("B").is_none());
        assert!(fields.get_all_ignore_case("B").is_some());
    }

    #[test]
    fn test_fields_case_insensitive() {
        let mut headers = Fields::case_insensitive();
        headers.append("Content-Type", "application/json");
        assert_eq!(headers.get("content-type"), Some("application/json"));
        assert!(headers.contains_key("CONTENT-TYPE"));
    }

    #[test]
    fn test_parse_query_decodes_and_keeps_duplicates() {
        let query = parse_query("name=John%20Doe&tag=a&tag=b&flag&q=a+b");
        assert_eq!(query.get("name"), Some("John Doe"));
        assert_eq!(query.get_all("tag").map(<[String]>::len), Some(2));
        assert_eq!(query.get("flag"), Some(""));
        assert_eq!(query.get("q"), Some("a b"));
    }

    #[test]
    fn test_parse_cookies() {
        let cookies = parse_cookies("session=abc123; theme=dark;flag");
        assert_eq!(
            cookies,
            vec![
                ("session".to_string(), "abc123".to_string()),
                ("theme".to_string(), "dark".to_string()),
                ("flag".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_request_message_splits_url() {
        let req = RequestMessage::new("get", "/api/my%20users?id=1&id=2");
        assert_eq!(req.method, "GET");
        assert_eq!(req.url, "/api/my%20users?id=1&id=2");
        assert_eq!(req.path, "/api/my users");
        assert_eq!(req.absolute_path, "/api/my%20users");
        assert_eq!(req.query.get_all("id").map(<[String]>::len), Some(2));
    }

    #[test]
    fn test_request_message_absolute_url() {
        let req = RequestMessage::new("GET", "http://localhost:8080/health?x=1");
        assert_eq!(req.path, "/health");
        assert_eq!(req.url, "/health?x=1");

        let req = RequestMessage::new("GET", "http://localhost:8080");
        assert_eq!(req.path, "/");
    }

    #[test]
    fn test_request_message_cookie_header() {
        let req = RequestMessage::new("GET", "/").with_header("Cookie", "a=1; b=2");
        assert_eq!(req.cookies.get("a"), Some("1"));
        assert_eq!(req.cookies.get("B"), Some("2"));
        assert!(req.headers.contains_key("cookie"));
    }

    #[test]
    fn test_request_message_body_detection_uses_content_type() {
        let req = RequestMessage::new("POST", "/")
            .with_header("Content-Type", "application/json")
            .with_body_bytes(r#"{"a":1}"#);
        assert_eq!(req.body.detected, BodyType::Json);
    }
}
