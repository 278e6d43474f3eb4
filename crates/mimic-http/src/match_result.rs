//! Per-mapping score accumulator and the ordering used to rank candidates.

use crate::error::MatchError;
use crate::matchers::{PERFECT, TOLERANCE};
use crate::request_matcher::MatcherKind;
use serde::Serialize;
use std::cmp::Ordering;

/// One recorded score.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDetail {
    pub kind: MatcherKind,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<MatchError>,
}

/// Accumulates the scores recorded while evaluating one mapping.
///
/// Records are append-only; every total is derived from them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMatchResult {
    match_details: Vec<MatchDetail>,
}

impl RequestMatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a score and hand it back, so callers can return it directly.
    pub fn add_score(&mut self, kind: MatcherKind, score: f64, error: Option<MatchError>) -> f64 {
        self.match_details.push(MatchDetail { kind, score, error });
        score
    }

    pub fn match_details(&self) -> &[MatchDetail] {
        &self.match_details
    }

    pub fn total_score(&self) -> f64 {
        self.match_details.iter().map(|d| d.score).sum()
    }

    pub fn total_number(&self) -> usize {
        self.match_details.len()
    }

    /// Mean recorded score; a result with nothing recorded is vacuously perfect.
    pub fn average_total_score(&self) -> f64 {
        if self.match_details.is_empty() {
            PERFECT
        } else {
            self.total_score() / self.total_number() as f64
        }
    }

    pub fn is_perfect_match(&self) -> bool {
        self.match_details.is_empty()
            || (self.total_score() - self.total_number() as f64).abs() < TOLERANCE
    }

    pub fn has_error(&self) -> bool {
        self.match_details.iter().any(|d| d.error.is_some())
    }

    pub fn first_error(&self) -> Option<&MatchError> {
        self.match_details.iter().find_map(|d| d.error.as_ref())
    }
}

/// Ranks results best first: perfect before imperfect, then higher average
/// score, then fewer recorded scores.
pub fn compare_match_results(a: &RequestMatchResult, b: &RequestMatchResult) -> Ordering {
    b.is_perfect_match()
        .cmp(&a.is_perfect_match())
        .then_with(|| {
            b.average_total_score()
                .total_cmp(&a.average_total_score())
        })
        .then_with(|| a.total_number().cmp(&b.total_number()))
}
