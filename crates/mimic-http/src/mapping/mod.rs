//! Mappings: request matcher plus response, with selection metadata.

mod store;

pub use store::MappingStore;

use crate::error::MatchError;
use crate::match_result::RequestMatchResult;
use crate::request::RequestMessage;
use crate::request_matcher::{CompositeRequestMatcher, RequestMatcher, ScenarioStateMatcher};
use crate::response::ResponseProvider;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Validity window of a mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    /// Seconds of validity, counted from `start` or else from the last update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
}

impl TimeSettings {
    pub fn is_valid_at(&self, now: DateTime<Utc>, updated_at: DateTime<Utc>) -> bool {
        if self.start.is_some_and(|start| now < start) {
            return false;
        }
        if self.end.is_some_and(|end| now > end) {
            return false;
        }
        if let Some(ttl) = self.ttl {
            let origin = self.start.unwrap_or(updated_at);
            // A ttl too large to represent never expires
            let expiry = i64::try_from(ttl)
                .ok()
                .and_then(Duration::try_seconds)
                .and_then(|ttl| origin.checked_add_signed(ttl));
            if expiry.is_some_and(|expiry| now > expiry) {
                return false;
            }
        }
        true
    }
}

/// Priority reserved for built-in admin mappings; outranks every user mapping.
pub const ADMIN_PRIORITY: i32 = i32::MIN;

/// A registered rule: how to recognize a request and how to answer it.
#[derive(Debug, Clone)]
pub struct Mapping {
    pub guid: Uuid,
    pub title: Option<String>,
    /// Lower wins.
    pub priority: i32,
    pub time_settings: Option<TimeSettings>,
    /// Activation draw threshold in `[0, 1]`.
    pub probability: Option<f64>,
    pub scenario: Option<String>,
    pub execution_condition_state: Option<String>,
    pub next_state: Option<String>,
    /// Commits needed before the scenario moves; defaults to 1.
    pub state_times: Option<u32>,
    pub updated_at: DateTime<Utc>,
    pub is_admin_interface: bool,
    pub request_matcher: Arc<CompositeRequestMatcher>,
    pub provider: Arc<dyn ResponseProvider>,
}

impl Mapping {
    pub fn new(
        request_matcher: CompositeRequestMatcher,
        provider: impl ResponseProvider + 'static,
    ) -> Self {
        Self {
            guid: Uuid::new_v4(),
            title: None,
            priority: 0,
            time_settings: None,
            probability: None,
            scenario: None,
            execution_condition_state: None,
            next_state: None,
            state_times: None,
            updated_at: Utc::now(),
            is_admin_interface: false,
            request_matcher: Arc::new(request_matcher),
            provider: Arc::new(provider),
        }
    }

    pub fn with_guid(mut self, guid: Uuid) -> Self {
        self.guid = guid;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_time_settings(mut self, time_settings: TimeSettings) -> Self {
        self.time_settings = Some(time_settings);
        self
    }

    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = Some(probability);
        self
    }

    pub fn in_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = Some(scenario.into());
        self
    }

    pub fn when_state_is(mut self, state: impl Into<String>) -> Self {
        self.execution_condition_state = Some(state.into());
        self
    }

    pub fn will_set_state_to(mut self, state: impl Into<String>) -> Self {
        self.next_state = Some(state.into());
        self
    }

    pub fn times_in_same_state(mut self, times: u32) -> Self {
        self.state_times = Some(times);
        self
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }

    pub fn admin_interface(mut self) -> Self {
        self.is_admin_interface = true;
        self
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.time_settings
            .as_ref()
            .is_none_or(|ts| ts.is_valid_at(now, self.updated_at))
    }

    /// Score this mapping against a request.
    ///
    /// `current_state` is the state of the mapping's scenario, `None` when it
    /// has none or has never transitioned.
    pub fn get_request_match_result(
        &self,
        request: &RequestMessage,
        current_state: Option<&str>,
    ) -> Result<RequestMatchResult, MatchError> {
        let mut result = RequestMatchResult::new();
        self.request_matcher.matching_score(request, &mut result)?;

        if self.scenario.is_some() {
            ScenarioStateMatcher::new(self.execution_condition_state.as_deref(), current_state)
                .matching_score(request, &mut result)?;
        }
        Ok(result)
    }

    /// Label used in logs and diagnostics.
    pub fn display_name(&self) -> String {
        match &self.title {
            Some(title) => format!("{} ({})", title, self.guid),
            None => self.guid.to_string(),
        }
    }
}
