//! Per-attribute request matchers.
//!
//! Each [`RequestMatcher`] reads one part of a [`RequestMessage`], scores it
//! with its leaf [`Matcher`]s and records the score into a
//! [`RequestMatchResult`]. A mapping owns one [`CompositeRequestMatcher`]
//! combining all of its attribute matchers.
//!
//! # Module Structure
//!
//! - `method` - HTTP method
//! - `url` - URL (path and query) and decoded path
//! - `field` - Header, cookie and query parameter matchers
//! - `client_ip` - Remote address
//! - `body` - Request body, picking the representation each matcher wants
//! - `scenario` - Scenario state gate
//! - `builder` - Fluent construction of composite matchers

mod body;
mod builder;
mod client_ip;
mod field;
mod method;
mod scenario;
mod url;

pub use body::BodyMatcher;
pub use builder::RequestMatcherBuilder;
pub use client_ip::ClientIpMatcher;
pub use field::{FieldMatcher, FieldSource};
pub use method::MethodMatcher;
pub use scenario::ScenarioStateMatcher;
pub use url::{PathMatcher, UrlMatcher};

use crate::error::MatchError;
use crate::match_result::RequestMatchResult;
use crate::matchers::{MatchInput, MatchOperator, MatchResult, Matcher, SharedMatcher, PERFECT};
use crate::request::RequestMessage;
use serde::Serialize;
use std::fmt;

/// Which request attribute a recorded score came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MatcherKind {
    Method,
    Url,
    Path,
    Header,
    Cookie,
    Param,
    ClientIp,
    Body,
    Scenario,
    Composite,
}

impl fmt::Display for MatcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatcherKind::Method => "Method",
            MatcherKind::Url => "Url",
            MatcherKind::Path => "Path",
            MatcherKind::Header => "Header",
            MatcherKind::Cookie => "Cookie",
            MatcherKind::Param => "Param",
            MatcherKind::ClientIp => "ClientIp",
            MatcherKind::Body => "Body",
            MatcherKind::Scenario => "Scenario",
            MatcherKind::Composite => "Composite",
        };
        f.write_str(name)
    }
}

/// Scores one aspect of a request and records it.
pub trait RequestMatcher: Send + Sync + fmt::Debug {
    fn kind(&self) -> MatcherKind;

    /// Evaluate against `request`, recording into `result`.
    ///
    /// Returns `Err` only when a matcher failed and failures are configured
    /// to abort evaluation of the mapping.
    fn matching_score(
        &self,
        request: &RequestMessage,
        result: &mut RequestMatchResult,
    ) -> Result<f64, MatchError>;
}

/// Leaf matchers configured on one attribute, combined by an operator.
#[derive(Debug, Clone, Default)]
pub struct MatcherSet {
    matchers: Vec<SharedMatcher>,
    operator: MatchOperator,
    throw_on_failure: bool,
}

impl MatcherSet {
    pub fn new(matchers: Vec<SharedMatcher>) -> Self {
        Self {
            matchers,
            operator: MatchOperator::Or,
            throw_on_failure: false,
        }
    }

    pub fn single(matcher: impl Matcher + 'static) -> Self {
        Self::new(vec![std::sync::Arc::new(matcher)])
    }

    pub fn operator(mut self, operator: MatchOperator) -> Self {
        self.operator = operator;
        self
    }

    /// Turn recorded matcher errors into an `Err` from `matching_score`.
    pub fn throw_on_failure(mut self, throw: bool) -> Self {
        self.throw_on_failure = throw;
        self
    }

    pub fn matchers(&self) -> &[SharedMatcher] {
        &self.matchers
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// Evaluate every matcher on the input it asks for and combine the scores.
    pub fn evaluate<'a, F>(&self, input_for: F) -> MatchResult
    where
        F: Fn(&dyn Matcher) -> MatchInput<'a>,
    {
        self.evaluate_each(|m| m.is_match(&input_for(m)))
    }

    /// Score every matcher with `score` and combine the results.
    pub fn evaluate_each<F>(&self, score: F) -> MatchResult
    where
        F: Fn(&dyn Matcher) -> MatchResult,
    {
        let results = self.matchers.iter().map(|m| score(m.as_ref())).collect();
        self.operator.combine_results(results)
    }

    /// Record `outcome` under `kind`.
    pub fn record(
        &self,
        kind: MatcherKind,
        outcome: MatchResult,
        result: &mut RequestMatchResult,
    ) -> Result<f64, MatchError> {
        let score = result.add_score(kind, outcome.score, outcome.error.clone());
        match outcome.error {
            Some(error) if self.throw_on_failure => Err(error),
            _ => Ok(score),
        }
    }
}

/// All attribute matchers of one mapping.
///
/// With `And` the child scores are averaged, with `Or` the best one wins. The
/// composite records nothing itself; an empty composite is vacuously perfect.
#[derive(Debug)]
pub struct CompositeRequestMatcher {
    matchers: Vec<Box<dyn RequestMatcher>>,
    operator: MatchOperator,
}

impl Default for CompositeRequestMatcher {
    fn default() -> Self {
        Self::new(MatchOperator::And)
    }
}

impl CompositeRequestMatcher {
    pub fn new(operator: MatchOperator) -> Self {
        Self {
            matchers: Vec::new(),
            operator,
        }
    }

    pub fn push(&mut self, matcher: impl RequestMatcher + 'static) {
        self.matchers.push(Box::new(matcher));
    }

    pub fn with(mut self, matcher: impl RequestMatcher + 'static) -> Self {
        self.push(matcher);
        self
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

impl RequestMatcher for CompositeRequestMatcher {
    fn kind(&self) -> MatcherKind {
        MatcherKind::Composite
    }

    fn matching_score(
        &self,
        request: &RequestMessage,
        result: &mut RequestMatchResult,
    ) -> Result<f64, MatchError> {
        if self.matchers.is_empty() {
            return Ok(PERFECT);
        }

        let mut scores = Vec::with_capacity(self.matchers.len());
        for matcher in &self.matchers {
            scores.push(matcher.matching_score(request, result)?);
        }
        Ok(self.operator.combine(&scores))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matchers::{ExactMatcher, FuncMatcher};

    fn get(path: &str) -> RequestMessage {
        RequestMessage::new("GET", path)
    }

    #[test]
    fn test_empty_composite_records_nothing() {
        let composite = CompositeRequestMatcher::default();
        let mut result = RequestMatchResult::new();
        let score = composite.matching_score(&get("/"), &mut result).unwrap();
        assert_eq!(score, 1.0);
        assert_eq!(result.total_number(), 0);
        assert!(result.is_perfect_match());
    }

    #[test]
    fn test_composite_and_averages_children() {
        let composite = CompositeRequestMatcher::default()
            .with(MethodMatcher::new(["GET"]))
            .with(PathMatcher::new(MatcherSet::single(ExactMatcher::new(["/other"]))));
        let mut result = RequestMatchResult::new();
        let score = composite.matching_score(&get("/x"), &mut result).unwrap();
        assert_eq!(score, 0.5);
        assert_eq!(result.total_number(), 2);
        assert_eq!(result.average_total_score(), 0.5);
    }

    #[test]
    fn test_composite_or_takes_best_but_records_all() {
        let composite = CompositeRequestMatcher::new(MatchOperator::Or)
            .with(MethodMatcher::new(["POST"]))
            .with(PathMatcher::new(MatcherSet::single(ExactMatcher::new(["/x"]))));
        let mut result = RequestMatchResult::new();
        let score = composite.matching_score(&get("/x"), &mut result).unwrap();
        assert_eq!(score, 1.0);
        assert_eq!(result.total_number(), 2);
    }

    #[test]
    fn test_matcher_set_error_recorded_without_throw() {
        let failing = FuncMatcher::new("broken", |_| {
            MatchResult::failed(MatchError::evaluation("boom"))
        });
        let matcher = PathMatcher::new(MatcherSet::single(failing));
        let mut result = RequestMatchResult::new();
        let score = matcher.matching_score(&get("/"), &mut result).unwrap();
        assert_eq!(score, 0.0);
        assert!(result.has_error());
    }

    #[test]
    fn test_matcher_set_error_thrown_when_configured() {
        let failing = FuncMatcher::new("broken", |_| {
            MatchResult::failed(MatchError::evaluation("boom"))
        });
        let matcher = PathMatcher::new(MatcherSet::single(failing).throw_on_failure(true));
        let composite = CompositeRequestMatcher::default().with(matcher);
        let mut result = RequestMatchResult::new();
        let err = composite.matching_score(&get("/"), &mut result).unwrap_err();
        assert_eq!(err, MatchError::evaluation("boom"));
        // The failure is still recorded for diagnostics
        assert_eq!(result.total_number(), 1);
    }

    #[test]
    fn test_matcher_kind_display() {
        assert_eq!(MatcherKind::ClientIp.to_string(), "ClientIp");
    }
}
