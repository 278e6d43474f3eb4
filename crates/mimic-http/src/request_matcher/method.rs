use super::{MatcherKind, RequestMatcher};
use crate::error::MatchError;
use crate::match_result::RequestMatchResult;
use crate::matchers::{from_bool, MatchBehaviour, MatchOperator};
use crate::request::RequestMessage;

/// Matches the HTTP method, case-insensitively, against a list of methods.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    methods: Vec<String>,
    behaviour: MatchBehaviour,
    operator: MatchOperator,
}

impl MethodMatcher {
    pub fn new<I, S>(methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            methods: methods.into_iter().map(Into::into).collect(),
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

    pub fn methods(&self) -> &[String] {
        &self.methods
    }
}

impl RequestMatcher for MethodMatcher {
    fn kind(&self) -> MatcherKind {
        MatcherKind::Method
    }

    fn matching_score(
        &self,
        request: &RequestMessage,
        result: &mut RequestMatchResult,
    ) -> Result<f64, MatchError> {
        let scores: Vec<f64> = self
            .methods
            .iter()
            .map(|m| from_bool(m.eq_ignore_ascii_case(&request.method)))
            .collect();
        let score = self.behaviour.apply(self.operator.combine(&scores));
        Ok(result.add_score(MatcherKind::Method, score, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(matcher: &MethodMatcher, method: &str) -> f64 {
        let mut result = RequestMatchResult::new();
        matcher
            .matching_score(&RequestMessage::new(method, "/"), &mut result)
            .unwrap()
    }

    #[test]
    fn test_method_any_of() {
        let matcher = MethodMatcher::new(["get", "HEAD"]);
        assert_eq!(score(&matcher, "GET"), 1.0);
        assert_eq!(score(&matcher, "head"), 1.0);
        assert_eq!(score(&matcher, "POST"), 0.0);
    }

    #[test]
    fn test_method_reject() {
        let matcher = MethodMatcher::new(["DELETE"]).behaviour(MatchBehaviour::RejectOnMatch);
        assert_eq!(score(&matcher, "DELETE"), 0.0);
        assert_eq!(score(&matcher, "GET"), 1.0);
    }

    #[test]
    fn test_method_records_detail() {
        let matcher = MethodMatcher::new(["GET"]);
        let mut result = RequestMatchResult::new();
        matcher
            .matching_score(&RequestMessage::new("GET", "/"), &mut result)
            .unwrap();
        assert_eq!(result.match_details()[0].kind, MatcherKind::Method);
    }
}
