use super::{MatcherKind, RequestMatcher};
use crate::error::MatchError;
use crate::match_result::RequestMatchResult;
use crate::matchers::from_bool;
use crate::request::RequestMessage;

/// Gates a mapping on the state of its scenario.
///
/// Built per evaluation from the mapping's required state and the scenario's
/// current state. An unset required state matches a scenario that has never
/// transitioned.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioStateMatcher<'a> {
    expected: Option<&'a str>,
    current: Option<&'a str>,
}

impl<'a> ScenarioStateMatcher<'a> {
    pub fn new(expected: Option<&'a str>, current: Option<&'a str>) -> Self {
        Self { expected, current }
    }
}

impl RequestMatcher for ScenarioStateMatcher<'_> {
    fn kind(&self) -> MatcherKind {
        MatcherKind::Scenario
    }

    fn matching_score(
        &self,
        _request: &RequestMessage,
        result: &mut RequestMatchResult,
    ) -> Result<f64, MatchError> {
        let score = from_bool(self.expected == self.current);
        Ok(result.add_score(MatcherKind::Scenario, score, None))
    }
}
