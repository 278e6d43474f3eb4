use super::{MatcherKind, MatcherSet, RequestMatcher};
use crate::error::MatchError;
use crate::match_result::RequestMatchResult;
use crate::matchers::{
    ExactMatcher, MatchBehaviour, MatchInput, MatchOperator, MatchResult, MISMATCH, PERFECT,
};
use crate::request::{Fields, RequestMessage};

/// Which multi-valued request collection a [`FieldMatcher`] reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    Header,
    Cookie,
    Param,
}

impl FieldSource {
    fn kind(self) -> MatcherKind {
        match self {
            FieldSource::Header => MatcherKind::Header,
            FieldSource::Cookie => MatcherKind::Cookie,
            FieldSource::Param => MatcherKind::Param,
        }
    }

    fn fields(self, request: &RequestMessage) -> &Fields {
        match self {
            FieldSource::Header => &request.headers,
            FieldSource::Cookie => &request.cookies,
            FieldSource::Param => &request.query,
        }
    }
}

/// Matches one named header, cookie or query parameter.
///
/// A missing key scores as a mismatch and a key with no matchers as perfect,
/// both through the field's own behaviour, so `RejectOnMatch` with no
/// matchers asserts absence. Otherwise each matcher takes its best score over
/// all values of the key and the matcher scores combine through the operator.
#[derive(Debug, Clone)]
pub struct FieldMatcher {
    source: FieldSource,
    key: String,
    ignore_case: bool,
    behaviour: MatchBehaviour,
    set: MatcherSet,
}

impl FieldMatcher {
    pub fn new(source: FieldSource, key: impl Into<String>, set: MatcherSet) -> Self {
        Self {
            source,
            key: key.into(),
            ignore_case: false,
            behaviour: MatchBehaviour::AcceptOnMatch,
            set,
        }
    }

    pub fn header(key: impl Into<String>, set: MatcherSet) -> Self {
        Self::new(FieldSource::Header, key, set)
    }

    pub fn cookie(key: impl Into<String>, set: MatcherSet) -> Self {
        Self::new(FieldSource::Cookie, key, set)
    }

    pub fn param(key: impl Into<String>, set: MatcherSet) -> Self {
        Self::new(FieldSource::Param, key, set)
    }

    /// Shorthand for a single exact value.
    pub fn exact(source: FieldSource, key: impl Into<String>, value: &str) -> Self {
        Self::new(source, key, MatcherSet::single(ExactMatcher::new([value])))
    }

    /// Match the key case-insensitively even where the collection is case-sensitive.
    pub fn ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    pub fn behaviour(mut self, behaviour: MatchBehaviour) -> Self {
        self.behaviour = behaviour;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn evaluate(&self, request: &RequestMessage) -> MatchResult {
        let fields = self.source.fields(request);
        let values = if self.ignore_case {
            fields.get_all_ignore_case(&self.key)
        } else {
            fields.get_all(&self.key)
        };

        let Some(values) = values else {
            return MatchResult::new(self.behaviour.apply(MISMATCH));
        };
        if self.set.is_empty() {
            return MatchResult::new(self.behaviour.apply(PERFECT));
        }

        self.set.evaluate_each(|matcher| {
            let per_value = values
                .iter()
                .map(|v| matcher.is_match(&MatchInput::text(v)))
                .collect();
            MatchOperator::Or.combine_results(per_value)
        })
    }
}

impl RequestMatcher for FieldMatcher {
    fn kind(&self) -> MatcherKind {
        self.source.kind()
    }

    fn matching_score(
        &self,
        request: &RequestMessage,
        result: &mut RequestMatchResult,
    ) -> Result<f64, MatchError> {
        let outcome = self.evaluate(request);
        self.set.record(self.source.kind(), outcome, result)
    }
}
