use super::{MatcherKind, MatcherSet, RequestMatcher};
use crate::error::MatchError;
use crate::match_result::RequestMatchResult;
use crate::matchers::MatchInput;
use crate::request::RequestMessage;

/// Matches the remote client address.
#[derive(Debug, Clone)]
pub struct ClientIpMatcher {
    set: MatcherSet,
}

impl ClientIpMatcher {
    pub fn new(set: MatcherSet) -> Self {
        Self { set }
    }
}

impl RequestMatcher for ClientIpMatcher {
    fn kind(&self) -> MatcherKind {
        MatcherKind::ClientIp
    }

    fn matching_score(
        &self,
        request: &RequestMessage,
        result: &mut RequestMatchResult,
    ) -> Result<f64, MatchError> {
        let outcome = self.set.evaluate(|_| MatchInput::text(&request.client_ip));
        self.set.record(MatcherKind::ClientIp, outcome, result)
    }
}
