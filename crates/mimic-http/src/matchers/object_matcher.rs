//! Structured matchers over JSON, XML and raw bytes.

use super::score::{self, MatchBehaviour, MatchOperator, MatchResult};
use super::{InputKind, MatchInput, Matcher};
use crate::error::{ConfigError, MatchError};
use serde_json::Value;
use serde_json_path::JsonPath;
use std::borrow::Cow;

/// Resolve an input to a JSON value, parsing text when necessary.
fn json_input<'a>(matcher: &str, input: &'a MatchInput<'_>) -> Result<Option<Cow<'a, Value>>, MatchError> {
    match input {
        MatchInput::Missing => Ok(None),
        MatchInput::Json(value) => Ok(Some(Cow::Borrowed(*value))),
        MatchInput::Text(text) => serde_json::from_str(text)
            .map(|v| Some(Cow::Owned(v)))
            .map_err(|e| MatchError::invalid_input(matcher, e)),
        MatchInput::Bytes(bytes) => serde_json::from_slice(bytes)
            .map(|v| Some(Cow::Owned(v)))
            .map_err(|e| MatchError::invalid_input(matcher, e)),
    }
}

/// Matches when a JSONPath expression selects at least one node.
#[derive(Debug, Clone)]
pub struct JsonPathMatcher {
    patterns: Vec<(String, JsonPath)>,
    behaviour: MatchBehaviour,
    operator: MatchOperator,
}

impl JsonPathMatcher {
    pub fn new<I, S>(patterns: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let pattern = p.into();
                let path = JsonPath::parse(&pattern).map_err(|e| ConfigError::JsonPath {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
                Ok((pattern, path))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            patterns,
            behaviour: MatchBehaviour::AcceptOnMatch,
            operator: MatchOperator::Or,
        })
    }

    pub fn behaviour(mut self, behaviour: MatchBehaviour) -> Self {
        self.behaviour = behaviour;
        self
    }

    pub fn operator(mut self, operator: MatchOperator) -> Self {
        self.operator = operator;
        self
    }
}

impl Matcher for JsonPathMatcher {
    fn name(&self) -> &str {
        "JsonPathMatcher"
    }

    fn patterns(&self) -> Vec<String> {
        self.patterns.iter().map(|(p, _)| p.clone()).collect()
    }

    fn match_behaviour(&self) -> MatchBehaviour {
        self.behaviour
    }

    fn input_kind(&self) -> InputKind {
        InputKind::Json
    }

    fn is_match(&self, input: &MatchInput<'_>) -> MatchResult {
        let value = match json_input(self.name(), input) {
            Ok(Some(value)) => value,
            Ok(None) => return MatchResult::mismatch().with_behaviour(self.behaviour),
            Err(e) => return MatchResult::failed(e),
        };

        let scores: Vec<f64> = self
            .patterns
            .iter()
            .map(|(_, path)| score::from_bool(!path.query(&value).is_empty()))
            .collect();
        MatchResult::new(self.operator.combine(&scores)).with_behaviour(self.behaviour)
    }
}

/// Matches when an XPath expression evaluates truthy against an XML document.
///
/// Node sets are truthy when non-empty, strings when non-empty and numbers
/// when non-zero.
#[derive(Debug, Clone)]
pub struct XPathMatcher {
    patterns: Vec<String>,
    behaviour: MatchBehaviour,
    operator: MatchOperator,
}

impl XPathMatcher {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
            behaviour: MatchBehaviour::AcceptOnMatch,
            operator: MatchOperator::Or,
        }
    }

    pub fn behaviour(mut self, behaviour: MatchBehaviour) -> Self {
        self.behaviour = behaviour;
        self
    }

    pub fn operator(mut self, operator: MatchOperator) -> Self {
        self.operator = operator;
        self
    }

    fn evaluate(&self, xml: &str) -> Result<f64, MatchError> {
        use sxd_document::parser;
        use sxd_xpath::{evaluate_xpath, Value as XValue};

        let package =
            parser::parse(xml).map_err(|e| MatchError::invalid_input(self.name(), format!("{e:?}")))?;
        let document = package.as_document();

        let mut scores = Vec::with_capacity(self.patterns.len());
        for pattern in &self.patterns {
            let value = evaluate_xpath(&document, pattern)
                .map_err(|e| MatchError::pattern(self.name(), pattern.as_str(), format!("{e:?}")))?;
            let truthy = match value {
                XValue::Boolean(b) => b,
                XValue::Number(n) => n != 0.0 && !n.is_nan(),
                XValue::String(s) => !s.is_empty(),
                XValue::Nodeset(nodes) => nodes.iter().next().is_some(),
            };
            scores.push(score::from_bool(truthy));
        }
        Ok(self.operator.combine(&scores))
    }
}

impl Matcher for XPathMatcher {
    fn name(&self) -> &str {
        "XPathMatcher"
    }

    fn patterns(&self) -> Vec<String> {
        self.patterns.clone()
    }

    fn match_behaviour(&self) -> MatchBehaviour {
        self.behaviour
    }

    fn is_match(&self, input: &MatchInput<'_>) -> MatchResult {
        if input.is_missing() {
            return MatchResult::mismatch().with_behaviour(self.behaviour);
        }
        let Some(xml) = input.as_text() else {
            return MatchResult::failed(MatchError::invalid_input(
                self.name(),
                "body is not valid UTF-8",
            ));
        };
        match self.evaluate(&xml) {
            Ok(score) => MatchResult::new(score).with_behaviour(self.behaviour),
            Err(e) => MatchResult::failed(e),
        }
    }
}

/// Structural JSON comparison.
///
/// With `partial`, the actual value may carry extra object keys and extra
/// trailing array elements. `ignore_case` applies to string values only.
pub fn json_equals(actual: &Value, expected: &Value, ignore_case: bool, partial: bool) -> bool {
    match (actual, expected) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a == b || a.as_f64() == b.as_f64(),
        (Value::String(a), Value::String(b)) => {
            if ignore_case {
                a.to_lowercase() == b.to_lowercase()
            } else {
                a == b
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            let length_ok = if partial {
                a.len() >= b.len()
            } else {
                a.len() == b.len()
            };
            length_ok
                && a.iter()
                    .zip(b.iter())
                    .all(|(x, y)| json_equals(x, y, ignore_case, partial))
        }
        (Value::Object(a), Value::Object(b)) => {
            (partial || a.len() == b.len())
                && b.iter().all(|(key, expected_val)| {
                    a.get(key).is_some_and(|actual_val| {
                        json_equals(actual_val, expected_val, ignore_case, partial)
                    })
                })
        }
        _ => false,
    }
}

/// Compares a JSON body against expected JSON documents.
#[derive(Debug, Clone)]
pub struct JsonMatcher {
    patterns: Vec<Value>,
    ignore_case: bool,
    partial: bool,
    behaviour: MatchBehaviour,
    operator: MatchOperator,
}

impl JsonMatcher {
    pub fn new(patterns: Vec<Value>) -> Self {
        Self {
            patterns,
            ignore_case: false,
            partial: false,
            behaviour: MatchBehaviour::AcceptOnMatch,
            operator: MatchOperator::Or,
        }
    }

    /// Matcher accepting bodies that contain the expected structure.
    pub fn partial(patterns: Vec<Value>) -> Self {
        Self {
            partial: true,
            ..Self::new(patterns)
        }
    }

    pub fn ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    pub fn behaviour(mut self, behaviour: MatchBehaviour) -> Self {
        self.behaviour = behaviour;
        self
    }

    pub fn operator(mut self, operator: MatchOperator) -> Self {
        self.operator = operator;
        self
    }
}

impl Matcher for JsonMatcher {
    fn name(&self) -> &str {
        if self.partial {
            "JsonPartialMatcher"
        } else {
            "JsonMatcher"
        }
    }

    fn patterns(&self) -> Vec<String> {
        self.patterns.iter().map(Value::to_string).collect()
    }

    fn match_behaviour(&self) -> MatchBehaviour {
        self.behaviour
    }

    fn input_kind(&self) -> InputKind {
        InputKind::Json
    }

    fn is_match(&self, input: &MatchInput<'_>) -> MatchResult {
        let actual = match json_input(self.name(), input) {
            Ok(Some(value)) => value,
            Ok(None) => return MatchResult::mismatch().with_behaviour(self.behaviour),
            Err(e) => return MatchResult::failed(e),
        };

        let scores: Vec<f64> = self
            .patterns
            .iter()
            .map(|expected| {
                score::from_bool(json_equals(&actual, expected, self.ignore_case, self.partial))
            })
            .collect();
        MatchResult::new(self.operator.combine(&scores)).with_behaviour(self.behaviour)
    }
}

/// Byte-for-byte comparison of the raw body.
#[derive(Debug, Clone)]
pub struct ExactObjectMatcher {
    pattern: Vec<u8>,
    behaviour: MatchBehaviour,
}

impl ExactObjectMatcher {
    pub fn new(pattern: impl Into<Vec<u8>>) -> Self {
        Self {
            pattern: pattern.into(),
            behaviour: MatchBehaviour::AcceptOnMatch,
        }
    }

    pub fn behaviour(mut self, behaviour: MatchBehaviour) -> Self {
        self.behaviour = behaviour;
        self
    }
}

impl Matcher for ExactObjectMatcher {
    fn name(&self) -> &str {
        "ExactObjectMatcher"
    }

    fn patterns(&self) -> Vec<String> {
        use base64::Engine;
        vec![base64::engine::general_purpose::STANDARD.encode(&self.pattern)]
    }

    fn match_behaviour(&self) -> MatchBehaviour {
        self.behaviour
    }

    fn input_kind(&self) -> InputKind {
        InputKind::Bytes
    }

    fn is_match(&self, input: &MatchInput<'_>) -> MatchResult {
        let matched = match input {
            MatchInput::Missing => false,
            MatchInput::Bytes(bytes) => *bytes == self.pattern.as_slice(),
            MatchInput::Text(text) => text.as_bytes() == self.pattern.as_slice(),
            MatchInput::Json(value) => value.to_string().as_bytes() == self.pattern.as_slice(),
        };
        MatchResult::from_bool(matched).with_behaviour(self.behaviour)
    }
}
