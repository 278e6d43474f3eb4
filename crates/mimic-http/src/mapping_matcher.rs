//! Mapping selection.
//!
//! For one request, every live mapping is filtered (time window,
//! probability), scored, and ordered. The best perfect match governs the
//! response; the best imperfect one is kept for diagnostics. Selection never
//! mutates scenario state: the caller commits a transition through
//! [`MappingMatcher::commit_scenario_transition`] once the response has been
//! produced.

use crate::mapping::{Mapping, MappingStore};
use crate::match_result::{compare_match_results, RequestMatchResult};
use crate::metrics;
use crate::request::RequestMessage;
use crate::scenario::{ScenarioStore, Transition, TransitionRequest};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, trace};

/// Source of uniform draws in `[0, 1)` for probabilistic mappings.
pub trait RandomSource: Send + Sync + fmt::Debug {
    fn next_f64(&self) -> f64;
}

/// Draws from the thread-local generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Selection settings.
#[derive(Debug, Clone)]
pub struct MatchingOptions {
    /// Answer with the best partial match when nothing matches perfectly.
    pub allow_partial_mapping: bool,
    /// Requests under this prefix do not log matcher failures.
    pub admin_path_prefix: String,
}

impl Default for MatchingOptions {
    fn default() -> Self {
        Self {
            allow_partial_mapping: false,
            admin_path_prefix: "/__admin".to_string(),
        }
    }
}

impl MatchingOptions {
    pub fn is_admin_path(&self, path: &str) -> bool {
        match path.strip_prefix(self.admin_path_prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

/// A mapping together with how well it matched.
#[derive(Debug, Clone)]
pub struct MappingMatcherResult {
    pub mapping: Arc<Mapping>,
    pub result: RequestMatchResult,
}

/// Outcome of selection.
#[derive(Debug, Clone, Default)]
pub struct BestMatch {
    /// The mapping that governs the response, if any.
    pub full: Option<MappingMatcherResult>,
    /// The best-scoring candidate with a non-zero score, for diagnostics.
    pub partial: Option<MappingMatcherResult>,
}

impl BestMatch {
    pub fn outcome(&self) -> &'static str {
        match (&self.full, &self.partial) {
            (Some(_), _) => "full",
            (None, Some(_)) => "partial",
            (None, None) => "none",
        }
    }
}

/// Ranks candidates best first: result ordering, then lower priority, then
/// the most recently updated mapping.
pub fn compare_mapping_results(a: &MappingMatcherResult, b: &MappingMatcherResult) -> Ordering {
    compare_match_results(&a.result, &b.result)
        .then_with(|| a.mapping.priority.cmp(&b.mapping.priority))
        .then_with(|| b.mapping.updated_at.cmp(&a.mapping.updated_at))
}

/// Ranks perfect candidates for the full match: priority first.
fn compare_full_match(a: &MappingMatcherResult, b: &MappingMatcherResult) -> Ordering {
    a.mapping
        .priority
        .cmp(&b.mapping.priority)
        .then_with(|| compare_match_results(&a.result, &b.result))
        .then_with(|| b.mapping.updated_at.cmp(&a.mapping.updated_at))
}

/// Select the best full and partial matches among `mappings`.
pub fn select_best_match(
    mappings: &[Arc<Mapping>],
    request: &RequestMessage,
    scenarios: &dyn ScenarioStore,
    random: &dyn RandomSource,
    options: &MatchingOptions,
    now: DateTime<Utc>,
) -> BestMatch {
    let admin_request = options.is_admin_path(&request.path);
    let mut candidates = Vec::with_capacity(mappings.len());

    for mapping in mappings {
        if !mapping.is_valid_at(now) {
            trace!(mapping = %mapping.guid, "Mapping outside its time window");
            metrics::record_exclusion("time_window");
            continue;
        }

        if let Some(probability) = mapping.probability {
            let draw = random.next_f64();
            if probability > draw {
                trace!(mapping = %mapping.guid, probability, draw, "Mapping skipped by probability");
                metrics::record_exclusion("probability");
                continue;
            }
        }

        let current_state = mapping
            .scenario
            .as_deref()
            .and_then(|name| scenarios.current_state(name));

        let result = match mapping.get_request_match_result(request, current_state.as_deref()) {
            Ok(result) => result,
            Err(e) => {
                error!(
                    mapping = %mapping.guid,
                    error = %e,
                    "Evaluating mapping failed, it will not be considered"
                );
                metrics::record_exclusion("evaluation_error");
                continue;
            }
        };

        if let Some(e) = result.first_error() {
            if !admin_request {
                error!(
                    mapping = %mapping.guid,
                    error = %e,
                    "Matcher failed, mapping will not be considered"
                );
            }
            metrics::record_exclusion("matcher_error");
            continue;
        }

        candidates.push(MappingMatcherResult {
            mapping: Arc::clone(mapping),
            result,
        });
    }

    let mut partials: Vec<&MappingMatcherResult> = candidates
        .iter()
        .filter(|c| !c.mapping.is_admin_interface || c.result.is_perfect_match())
        .collect();
    partials.sort_by(|a, b| compare_mapping_results(a, b));
    let partial = partials
        .into_iter()
        .find(|c| c.result.average_total_score() > 0.0)
        .cloned();

    if options.allow_partial_mapping {
        return BestMatch {
            full: partial.clone(),
            partial,
        };
    }

    let full = candidates
        .iter()
        .filter(|c| c.result.is_perfect_match())
        .min_by(|a, b| compare_full_match(a, b))
        .cloned();

    BestMatch { full, partial }
}

/// Selects mappings from a [`MappingStore`] and commits scenario transitions.
#[derive(Debug)]
pub struct MappingMatcher {
    store: Arc<MappingStore>,
    scenarios: Arc<dyn ScenarioStore>,
    random: Arc<dyn RandomSource>,
    options: MatchingOptions,
}

impl MappingMatcher {
    pub fn new(store: Arc<MappingStore>, options: MatchingOptions) -> Self {
        let scenarios = Arc::clone(store.scenarios());
        Self {
            store,
            scenarios,
            random: Arc::new(ThreadRandom),
            options,
        }
    }

    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    pub fn options(&self) -> &MatchingOptions {
        &self.options
    }

    pub fn store(&self) -> &Arc<MappingStore> {
        &self.store
    }

    pub fn scenarios(&self) -> &Arc<dyn ScenarioStore> {
        &self.scenarios
    }

    pub fn find_best_match(&self, request: &RequestMessage) -> BestMatch {
        self.find_best_match_at(request, Utc::now())
    }

    /// Selection against the store's current snapshot as of `now`.
    pub fn find_best_match_at(&self, request: &RequestMessage, now: DateTime<Utc>) -> BestMatch {
        let started = Instant::now();
        let mappings = self.store.snapshot();
        let best = select_best_match(
            &mappings,
            request,
            self.scenarios.as_ref(),
            self.random.as_ref(),
            &self.options,
            now,
        );

        let outcome = best.outcome();
        metrics::record_match(outcome, started.elapsed().as_secs_f64() * 1000.0);
        debug!(
            method = %request.method,
            path = %request.path,
            outcome,
            full = ?best.full.as_ref().map(|m| m.mapping.display_name()),
            partial = ?best.partial.as_ref().map(|m| m.mapping.display_name()),
            candidates = mappings.len(),
            "Mapping selection finished"
        );
        best
    }

    /// Apply the mapping's scenario transition. `None` when it has no scenario.
    pub fn commit_scenario_transition(&self, mapping: &Mapping) -> Option<Transition> {
        let scenario = mapping.scenario.as_deref()?;
        let transition = self.scenarios.commit(&TransitionRequest {
            scenario,
            expected: mapping.execution_condition_state.as_deref(),
            next: mapping.next_state.as_deref(),
            times: mapping.state_times.unwrap_or(1),
        });

        metrics::record_scenario_transition(scenario, transition.label());
        debug!(
            scenario,
            mapping = %mapping.display_name(),
            %transition,
            "Scenario commit"
        );
        Some(transition)
    }
}
