use super::{MatcherKind, MatcherSet, RequestMatcher};
use crate::error::MatchError;
use crate::match_result::RequestMatchResult;
use crate::matchers::{InputKind, MatchInput};
use crate::request::{BodyData, RequestMessage};

/// Matches the request body.
///
/// Each leaf matcher receives the body representation it prefers: JSON
/// matchers get the parsed document, byte matchers the raw bytes and text
/// matchers the string. When the preferred form is unavailable the next best
/// one is offered.
#[derive(Debug, Clone)]
pub struct BodyMatcher {
    set: MatcherSet,
}

impl BodyMatcher {
    pub fn new(set: MatcherSet) -> Self {
        Self { set }
    }
}

fn body_input(body: &BodyData, kind: InputKind) -> MatchInput<'_> {
    let json = body.json.as_ref().map(MatchInput::Json);
    let text = body.string.as_deref().map(MatchInput::text);
    let bytes = body.bytes.as_deref().map(MatchInput::Bytes);

    let chosen = match kind {
        InputKind::Json => json.or(text),
        InputKind::Text => text.or(json).or(bytes),
        InputKind::Bytes => bytes.or(text),
    };
    chosen.unwrap_or(MatchInput::Missing)
}

impl RequestMatcher for BodyMatcher {
    fn kind(&self) -> MatcherKind {
        MatcherKind::Body
    }

    fn matching_score(
        &self,
        request: &RequestMessage,
        result: &mut RequestMatchResult,
    ) -> Result<f64, MatchError> {
        let outcome = self
            .set
            .evaluate(|matcher| body_input(&request.body, matcher.input_kind()));
        self.set.record(MatcherKind::Body, outcome, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matchers::{
        ExactObjectMatcher, JsonMatcher, JsonPathMatcher, NotNullOrEmptyMatcher, RegexMatcher,
        XPathMatcher,
    };
    use serde_json::json;

    fn score(matcher: &BodyMatcher, request: &RequestMessage) -> (f64, RequestMatchResult) {
        let mut result = RequestMatchResult::new();
        let score = matcher.matching_score(request, &mut result).unwrap();
        (score, result)
    }

    fn post(content_type: &str, body: &'static str) -> RequestMessage {
        RequestMessage::new("POST", "/")
            .with_header("Content-Type", content_type)
            .with_body_bytes(body)
    }

    #[test]
    fn test_json_partial_body() {
        let matcher = BodyMatcher::new(MatcherSet::single(JsonMatcher::partial(vec![
            json!({"user": "alice"}),
        ])));
        let (s, _) = score(&matcher, &post("application/json", r#"{"user":"alice","id":1}"#));
        assert_eq!(s, 1.0);
    }

    #[test]
    fn test_json_path_body() {
        let matcher = BodyMatcher::new(MatcherSet::single(JsonPathMatcher::new(["$.id"]).unwrap()));
        let (s, _) = score(&matcher, &post("application/json", r#"{"id":1}"#));
        assert_eq!(s, 1.0);
    }

    #[test]
    fn test_text_matcher_sees_string_of_json_body() {
        let matcher =
            BodyMatcher::new(MatcherSet::single(RegexMatcher::new(["alice"], false).unwrap()));
        let (s, _) = score(&matcher, &post("application/json", r#"{"user":"alice"}"#));
        assert_eq!(s, 1.0);
    }

    #[test]
    fn test_bytes_body() {
        let matcher = BodyMatcher::new(MatcherSet::single(ExactObjectMatcher::new(vec![1u8, 2, 3])));
        let req = RequestMessage::new("POST", "/").with_body_bytes(vec![1u8, 2, 3]);
        let (s, _) = score(&matcher, &req);
        assert_eq!(s, 1.0);
    }

    #[test]
    fn test_empty_body_is_missing() {
        let matcher = BodyMatcher::new(MatcherSet::single(NotNullOrEmptyMatcher::new()));
        let (s, _) = score(&matcher, &RequestMessage::new("POST", "/"));
        assert_eq!(s, 0.0);

        let (s, _) = score(&matcher, &post("text/plain", "x"));
        assert_eq!(s, 1.0);
    }

    #[test]
    fn test_malformed_xml_recorded_as_error() {
        let matcher = BodyMatcher::new(MatcherSet::single(XPathMatcher::new(["/a"])));
        let (s, result) = score(&matcher, &post("application/xml", "<a><b></a>"));
        assert_eq!(s, 0.0);
        assert!(result.has_error());
    }
}
