use bytes::Bytes;
use http_body_util::Full;
use hyper::http::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Response, StatusCode};
use std::str::FromStr;

/// Builds hyper responses, silently skipping headers that are not valid HTTP.
pub struct ResponseBuilder {
    status: StatusCode,
    body: Bytes,
    headers: HeaderMap,
}

impl ResponseBuilder {
    pub fn new(status_code: StatusCode) -> Self {
        ResponseBuilder {
            status: status_code,
            body: Bytes::new(),
            headers: Default::default(),
        }
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (HeaderName::from_str(name), HeaderValue::from_str(value)) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn merge_headers<H, K, V>(mut self, headers: H) -> Self
    where
        H: IntoIterator<Item = (K, V)>,
        HeaderName: TryFrom<K>,
        HeaderValue: TryFrom<V>,
    {
        for (key, value) in headers {
            if let (Ok(name), Ok(value)) = (HeaderName::try_from(key), HeaderValue::try_from(value))
            {
                self.headers.append(name, value);
            }
        }
        self
    }

    pub fn build_full(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        response.headers_mut().extend(self.headers);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::CONTENT_TYPE;

    #[test]
    fn test_builder_with_status() {
        let response = ResponseBuilder::new(StatusCode::NOT_FOUND).build_full();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_builder_with_headers() {
        let response = ResponseBuilder::new(StatusCode::OK)
            .header("X-Custom-Header", "test-value")
            .header("Content-Type", "application/json")
            .header("bad header", "ignored")
            .build_full();

        assert_eq!(
            response.headers().get("X-Custom-Header"),
            Some(&HeaderValue::from_static("test-value"))
        );
        assert_eq!(
            response.headers().get(CONTENT_TYPE),
            Some(&HeaderValue::from_static("application/json"))
        );
        assert_eq!(response.headers().len(), 2);
    }

    #[test]
    fn test_merge_headers_keeps_repeated_names() {
        let headers = vec![
            ("Set-Cookie".to_string(), "a=1".to_string()),
            ("Set-Cookie".to_string(), "b=2".to_string()),
        ];
        let response = ResponseBuilder::new(StatusCode::OK)
            .merge_headers(headers)
            .build_full();

        assert_eq!(response.headers().get_all("set-cookie").iter().count(), 2);
    }
}
