//! Scoring algebra shared by every matcher.
//!
//! A score is a value in `[0, 1]`: `1.0` is a perfect match, `0.0` a mismatch.
//! Anything in between is partial evidence of fit and is only meaningful when
//! comparing candidates for the best partial match.

use crate::error::MatchError;
use serde::{Deserialize, Serialize};

/// Score of a matcher that did not match.
pub const MISMATCH: f64 = 0.0;

/// Score of a matcher that matched exactly.
pub const PERFECT: f64 = 1.0;

/// Scores within this distance of a bound are treated as that bound.
pub const TOLERANCE: f64 = 0.000_001;

#[inline]
pub fn is_perfect(score: f64) -> bool {
    (score - PERFECT).abs() < TOLERANCE
}

#[inline]
pub fn is_mismatch(score: f64) -> bool {
    score <= TOLERANCE
}

#[inline]
pub fn from_bool(matched: bool) -> f64 {
    if matched {
        PERFECT
    } else {
        MISMATCH
    }
}

/// Average of a set of scores; an empty set is a mismatch.
pub fn average(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return MISMATCH;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}

/// Outcome of evaluating one matcher against one input.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub score: f64,
    pub error: Option<MatchError>,
}

impl MatchResult {
    pub fn new(score: f64) -> Self {
        Self {
            score: score.clamp(MISMATCH, PERFECT),
            error: None,
        }
    }

    pub fn perfect() -> Self {
        Self::new(PERFECT)
    }

    pub fn mismatch() -> Self {
        Self::new(MISMATCH)
    }

    pub fn from_bool(matched: bool) -> Self {
        Self::new(from_bool(matched))
    }

    /// A failed evaluation always scores as a mismatch, whatever the behaviour.
    pub fn failed(error: MatchError) -> Self {
        Self {
            score: MISMATCH,
            error: Some(error),
        }
    }

    pub fn is_perfect(&self) -> bool {
        is_perfect(self.score)
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Apply a match behaviour to this result. Errors are left untouched.
    pub fn with_behaviour(self, behaviour: MatchBehaviour) -> Self {
        if self.error.is_some() {
            return self;
        }
        Self::new(behaviour.apply(self.score))
    }
}

impl From<f64> for MatchResult {
    fn from(score: f64) -> Self {
        Self::new(score)
    }
}

/// Whether a matcher accepts or rejects the values it matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum MatchBehaviour {
    #[default]
    AcceptOnMatch,
    /// "must NOT match": a mismatch becomes perfect and anything else a mismatch.
    RejectOnMatch,
}

impl MatchBehaviour {
    pub fn from_reject(reject_on_match: bool) -> Self {
        if reject_on_match {
            MatchBehaviour::RejectOnMatch
        } else {
            MatchBehaviour::AcceptOnMatch
        }
    }

    #[inline]
    pub fn apply(self, score: f64) -> f64 {
        match self {
            MatchBehaviour::AcceptOnMatch => score,
            MatchBehaviour::RejectOnMatch => {
                if is_mismatch(score) {
                    PERFECT
                } else {
                    MISMATCH
                }
            }
        }
    }
}

/// How the scores of several patterns on a single matcher are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum MatchOperator {
    /// Best pattern wins (maximum).
    #[default]
    Or,
    /// Every pattern counts (average).
    And,
}

impl MatchOperator {
    pub fn combine(self, scores: &[f64]) -> f64 {
        if scores.is_empty() {
            return MISMATCH;
        }
        match self {
            MatchOperator::Or => scores.iter().copied().fold(MISMATCH, f64::max),
            MatchOperator::And => average(scores),
        }
    }

    /// Combine full results; the first error wins and forces a mismatch.
    pub fn combine_results(self, results: Vec<MatchResult>) -> MatchResult {
        let mut scores = Vec::with_capacity(results.len());
        for result in results {
            if let Some(error) = result.error {
                return MatchResult::failed(error);
            }
            scores.push(result.score);
        }
        MatchResult::new(self.combine(&scores))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_perfect_uses_tolerance() {
        assert!(is_perfect(1.0));
        assert!(is_perfect(0.999_999_9));
        assert!(!is_perfect(0.99));
        assert!(is_mismatch(0.0));
        assert!(is_mismatch(0.000_000_1));
        assert!(!is_mismatch(0.1));
    }

    #[test]
    fn test_average_empty_is_mismatch() {
        assert_eq!(average(&[]), MISMATCH);
        assert_eq!(average(&[1.0, 0.0]), 0.5);
    }

    #[test]
    fn test_match_result_clamps() {
        assert_eq!(MatchResult::new(1.7).score, PERFECT);
        assert_eq!(MatchResult::new(-0.3).score, MISMATCH);
    }

    #[test]
    fn test_reject_on_match_inverts() {
        let reject = MatchBehaviour::RejectOnMatch;
        assert_eq!(reject.apply(1.0), 0.0);
        assert_eq!(reject.apply(0.0), 1.0);
        // Partial similarity still counts as "matched" for rejection
        assert_eq!(reject.apply(0.4), 0.0);

        let accept = MatchBehaviour::AcceptOnMatch;
        assert_eq!(accept.apply(0.4), 0.4);
    }

    #[test]
    fn test_behaviour_leaves_errors_alone() {
        let failed = MatchResult::failed(MatchError::invalid_input("X", "bad"))
            .with_behaviour(MatchBehaviour::RejectOnMatch);
        assert_eq!(failed.score, MISMATCH);
        assert!(failed.is_error());
    }

    #[test]
    fn test_operator_or_takes_max() {
        assert_eq!(MatchOperator::Or.combine(&[0.2, 1.0, 0.0]), 1.0);
        assert_eq!(MatchOperator::Or.combine(&[0.2, 0.3]), 0.3);
    }

    #[test]
    fn test_operator_and_averages() {
        assert_eq!(MatchOperator::And.combine(&[1.0, 0.0]), 0.5);
        assert_eq!(MatchOperator::And.combine(&[1.0, 1.0]), 1.0);
    }

    #[test]
    fn test_operator_empty_is_mismatch() {
        assert_eq!(MatchOperator::Or.combine(&[]), MISMATCH);
        assert_eq!(MatchOperator::And.combine(&[]), MISMATCH);
    }

    #[test]
    fn test_combine_results_propagates_first_error() {
        let results = vec![
            MatchResult::perfect(),
            MatchResult::failed(MatchError::invalid_input("A", "first")),
            MatchResult::failed(MatchError::invalid_input("B", "second")),
        ];
        let combined = MatchOperator::Or.combine_results(results);
        assert_eq!(combined.score, MISMATCH);
        assert_eq!(
            combined.error,
            Some(MatchError::invalid_input("A", "first"))
        );
    }

    #[test]
    fn test_operator_serde() {
        let op: MatchOperator = serde_json::from_str(r#""And""#).unwrap();
        assert_eq!(op, MatchOperator::And);
        let behaviour: MatchBehaviour = serde_json::from_str(r#""RejectOnMatch""#).unwrap();
        assert_eq!(behaviour, MatchBehaviour::RejectOnMatch);
    }
}
