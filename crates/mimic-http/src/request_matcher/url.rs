use super::{MatcherKind, MatcherSet, RequestMatcher};
use crate::error::MatchError;
use crate::match_result::RequestMatchResult;
use crate::matchers::{ExactMatcher, MatchInput};
use crate::request::RequestMessage;

/// Matches the request URL (path plus query string).
#[derive(Debug, Clone)]
pub struct UrlMatcher {
    set: MatcherSet,
}

impl UrlMatcher {
    pub fn new(set: MatcherSet) -> Self {
        Self { set }
    }

    pub fn exact(url: &str) -> Self {
        Self::new(MatcherSet::single(ExactMatcher::new([url])))
    }
}

impl RequestMatcher for UrlMatcher {
    fn kind(&self) -> MatcherKind {
        MatcherKind::Url
    }

    fn matching_score(
        &self,
        request: &RequestMessage,
        result: &mut RequestMatchResult,
    ) -> Result<f64, MatchError> {
        let outcome = self.set.evaluate(|_| MatchInput::text(&request.url));
        self.set.record(MatcherKind::Url, outcome, result)
    }
}

/// Matches the percent-decoded request path.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    set: MatcherSet,
}

impl PathMatcher {
    pub fn new(set: MatcherSet) -> Self {
        Self { set }
    }

    pub fn exact(path: &str) -> Self {
        Self::new(MatcherSet::single(ExactMatcher::new([path])))
    }
}

impl RequestMatcher for PathMatcher {
    fn kind(&self) -> MatcherKind {
        MatcherKind::Path
    }

    fn matching_score(
        &self,
        request: &RequestMessage,
        result: &mut RequestMatchResult,
    ) -> Result<f64, MatchError> {
        let outcome = self.set.evaluate(|_| MatchInput::text(&request.path));
        self.set.record(MatcherKind::Path, outcome, result)
    }
}
