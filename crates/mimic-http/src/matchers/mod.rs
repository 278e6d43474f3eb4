//! Leaf matchers producing fuzzy scores.
//!
//! Every matcher implements [`Matcher`]: given one input value it returns a
//! [`MatchResult`]. Matchers are pure and total; internal failures (malformed
//! XML, unparsable JSON) are reported through `MatchResult::error` rather than
//! propagated, so one broken matcher never aborts evaluation elsewhere.
//!
//! # Module Structure
//!
//! - `score` - Scoring algebra (`MatchResult`, `MatchBehaviour`, `MatchOperator`)
//! - `string_matcher` - Text matchers (exact, wildcard, regex, similarity, not-empty)
//! - `object_matcher` - Structured matchers (JSON, JSONPath, XPath, raw bytes)

mod object_matcher;
mod score;
mod string_matcher;

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

pub use object_matcher::{
    json_equals, ExactObjectMatcher, JsonMatcher, JsonPathMatcher, XPathMatcher,
};
pub use score::{
    average, from_bool, is_mismatch, is_perfect, MatchBehaviour, MatchOperator, MatchResult,
    MISMATCH, PERFECT, TOLERANCE,
};
pub use string_matcher::{
    ExactMatcher, NotNullOrEmptyMatcher, RegexMatcher, SimMetricsMatcher, WildcardMatcher,
};

/// A value handed to a matcher.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchInput<'a> {
    /// The request attribute is absent.
    Missing,
    Text(Cow<'a, str>),
    Json(&'a serde_json::Value),
    Bytes(&'a [u8]),
}

impl<'a> MatchInput<'a> {
    pub fn text(value: &'a str) -> Self {
        MatchInput::Text(Cow::Borrowed(value))
    }

    /// Text view of the input. JSON is rendered compactly and bytes must be UTF-8.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            MatchInput::Missing => None,
            MatchInput::Text(text) => Some(Cow::Borrowed(text.as_ref())),
            MatchInput::Json(serde_json::Value::String(s)) => Some(Cow::Borrowed(s.as_str())),
            MatchInput::Json(value) => Some(Cow::Owned(value.to_string())),
            MatchInput::Bytes(bytes) => std::str::from_utf8(bytes).ok().map(Cow::Borrowed),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, MatchInput::Missing)
    }
}

impl<'a> From<&'a str> for MatchInput<'a> {
    fn from(value: &'a str) -> Self {
        MatchInput::text(value)
    }
}

/// Preferred input representation of a matcher, used when the body offers several.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    Json,
    Bytes,
}

/// Polymorphic leaf matcher.
pub trait Matcher: Send + Sync + fmt::Debug {
    /// Matcher name used in diagnostics (e.g. `"RegexMatcher"`).
    fn name(&self) -> &str;

    /// Patterns this matcher was configured with, for diagnostics.
    fn patterns(&self) -> Vec<String>;

    fn match_behaviour(&self) -> MatchBehaviour {
        MatchBehaviour::AcceptOnMatch
    }

    fn input_kind(&self) -> InputKind {
        InputKind::Text
    }

    fn is_match(&self, input: &MatchInput<'_>) -> MatchResult;
}

pub type SharedMatcher = Arc<dyn Matcher>;

type MatchFn = dyn Fn(&MatchInput<'_>) -> MatchResult + Send + Sync;

/// Matcher backed by a caller-supplied function.
#[derive(Clone)]
pub struct FuncMatcher {
    name: String,
    func: Arc<MatchFn>,
}

impl FuncMatcher {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&MatchInput<'_>) -> MatchResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Wrap a boolean predicate over the text view of the input.
    pub fn predicate<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self::new(name, move |input| {
            MatchResult::from_bool(input.as_text().is_some_and(|text| predicate(&text)))
        })
    }
}

impl fmt::Debug for FuncMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuncMatcher")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Matcher for FuncMatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn patterns(&self) -> Vec<String> {
        Vec::new()
    }

    fn is_match(&self, input: &MatchInput<'_>) -> MatchResult {
        (self.func)(input)
    }
}

/// A string value with pre-computed lowercase for efficient case-insensitive matching.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedValue {
    /// Original value (for case-sensitive matching)
    pub value: String,
    /// Pre-computed lowercase (for case-insensitive matching)
    pub lower: String,
}

impl CachedValue {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let lower = value.to_lowercase();
        Self { value, lower }
    }

    #[inline]
    pub fn pattern(&self, case_sensitive: bool) -> &str {
        if case_sensitive {
            &self.value
        } else {
            &self.lower
        }
    }

    #[inline]
    pub fn equals(&self, value: &str, case_sensitive: bool) -> bool {
        if case_sensitive {
            value == self.value
        } else {
            value.to_lowercase() == self.lower
        }
    }
}

impl From<&str> for CachedValue {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
