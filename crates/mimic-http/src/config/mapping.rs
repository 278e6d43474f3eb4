//! Declarative mapping models and their compilation into [`Mapping`]s.
//!
//! Models use camelCase keys:
//!
//! ```yaml
//! - guid: 2b3c9a3e-8f0e-4d7e-9a55-1f0a3c1b2d4e
//!   priority: 1
//!   scenario: checkout
//!   whenStateIs: Paid
//!   setStateTo: Shipped
//!   request:
//!     methods: [GET]
//!     path: /orders/1
//!     headers:
//!       - name: Accept
//!         matchers:
//!           - name: WildcardMatcher
//!             pattern: "application/*"
//!   response:
//!     statusCode: 200
//!     bodyAsJson: { status: shipped }
//! ```

use crate::error::ConfigError;
use crate::mapping::{Mapping, TimeSettings, ADMIN_PRIORITY};
use crate::matchers::{
    ExactMatcher, ExactObjectMatcher, JsonMatcher, JsonPathMatcher, MatchBehaviour,
    MatchOperator, NotNullOrEmptyMatcher, RegexMatcher, SharedMatcher, SimMetricsMatcher,
    WildcardMatcher, XPathMatcher,
};
use crate::request_matcher::{
    BodyMatcher, ClientIpMatcher, CompositeRequestMatcher, FieldMatcher, FieldSource, MatcherSet,
    MethodMatcher, PathMatcher, UrlMatcher,
};
use crate::response::{ResponseBody, StaticResponse};
use base64::Engine;
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// One leaf matcher.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatcherModel {
    /// Matcher kind, e.g. `RegexMatcher`.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<Value>,
    #[serde(default)]
    pub ignore_case: bool,
    #[serde(default)]
    pub reject_on_match: bool,
    #[serde(default)]
    pub match_operator: MatchOperator,
}

impl MatcherModel {
    pub fn new(name: impl Into<String>, pattern: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            pattern: Some(pattern.into()),
            patterns: Vec::new(),
            ignore_case: false,
            reject_on_match: false,
            match_operator: MatchOperator::Or,
        }
    }

    fn all_patterns(&self) -> Vec<&Value> {
        self.pattern.iter().chain(self.patterns.iter()).collect()
    }

    fn string_patterns(&self) -> Result<Vec<String>, ConfigError> {
        let patterns = self
            .all_patterns()
            .into_iter()
            .map(|p| match p {
                Value::String(s) => Ok(s.clone()),
                _ => Err(ConfigError::PatternNotString(self.name.clone())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        if patterns.is_empty() {
            return Err(ConfigError::MissingPattern(self.name.clone()));
        }
        Ok(patterns)
    }

    /// JSON patterns may be given inline or as a JSON string.
    fn json_patterns(&self) -> Result<Vec<Value>, ConfigError> {
        let patterns: Vec<Value> = self
            .all_patterns()
            .into_iter()
            .map(|p| match p {
                Value::String(s) => serde_json::from_str(s).unwrap_or_else(|_| p.clone()),
                other => other.clone(),
            })
            .collect();
        if patterns.is_empty() {
            return Err(ConfigError::MissingPattern(self.name.clone()));
        }
        Ok(patterns)
    }

    pub fn compile(&self) -> Result<SharedMatcher, ConfigError> {
        let behaviour = MatchBehaviour::from_reject(self.reject_on_match);
        let operator = self.match_operator;

        let matcher: SharedMatcher = match self.name.as_str() {
            "ExactMatcher" => Arc::new(
                ExactMatcher::new(self.string_patterns()?)
                    .ignore_case(self.ignore_case)
                    .behaviour(behaviour)
                    .operator(operator),
            ),
            "WildcardMatcher" => Arc::new(
                WildcardMatcher::new(self.string_patterns()?, self.ignore_case)?
                    .behaviour(behaviour)
                    .operator(operator),
            ),
            "RegexMatcher" => Arc::new(
                RegexMatcher::new(self.string_patterns()?, self.ignore_case)?
                    .behaviour(behaviour)
                    .operator(operator),
            ),
            "SimMetricsMatcher" => Arc::new(
                SimMetricsMatcher::new(self.string_patterns()?)
                    .behaviour(behaviour)
                    .operator(operator),
            ),
            "NotNullOrEmptyMatcher" => Arc::new(NotNullOrEmptyMatcher::new().behaviour(behaviour)),
            "JsonPathMatcher" => Arc::new(
                JsonPathMatcher::new(self.string_patterns()?)?
                    .behaviour(behaviour)
                    .operator(operator),
            ),
            "XPathMatcher" => Arc::new(
                XPathMatcher::new(self.string_patterns()?)
                    .behaviour(behaviour)
                    .operator(operator),
            ),
            "JsonMatcher" => Arc::new(
                JsonMatcher::new(self.json_patterns()?)
                    .ignore_case(self.ignore_case)
                    .behaviour(behaviour)
                    .operator(operator),
            ),
            "JsonPartialMatcher" => Arc::new(
                JsonMatcher::partial(self.json_patterns()?)
                    .ignore_case(self.ignore_case)
                    .behaviour(behaviour)
                    .operator(operator),
            ),
            "ExactObjectMatcher" => {
                let encoded = self.string_patterns()?;
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(&encoded[0])
                    .map_err(|e| ConfigError::Base64 {
                        matcher: self.name.clone(),
                        reason: e.to_string(),
                    })?;
                Arc::new(ExactObjectMatcher::new(bytes).behaviour(behaviour))
            }
            other => return Err(ConfigError::UnknownMatcher(other.to_string())),
        };
        Ok(matcher)
    }
}

/// Matchers on one attribute.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchersModel {
    #[serde(default)]
    pub matchers: Vec<MatcherModel>,
    #[serde(default)]
    pub match_operator: MatchOperator,
}

impl MatchersModel {
    fn compile(&self, throw_on_failure: bool) -> Result<MatcherSet, ConfigError> {
        let matchers = self
            .matchers
            .iter()
            .map(MatcherModel::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MatcherSet::new(matchers)
            .operator(self.match_operator)
            .throw_on_failure(throw_on_failure))
    }
}

/// A URL, path or client IP: either a plain exact value or a matcher list.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum AttributeModel {
    Exact(String),
    Matchers(MatchersModel),
}

impl AttributeModel {
    fn compile(&self, throw_on_failure: bool) -> Result<MatcherSet, ConfigError> {
        match self {
            AttributeModel::Exact(value) => Ok(MatcherSet::single(ExactMatcher::new([value.as_str()]))
                .throw_on_failure(throw_on_failure)),
            AttributeModel::Matchers(model) => model.compile(throw_on_failure),
        }
    }
}

/// A named header, cookie or query parameter.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldModel {
    pub name: String,
    #[serde(default)]
    pub matchers: Vec<MatcherModel>,
    #[serde(default)]
    pub ignore_case: bool,
    #[serde(default)]
    pub reject_on_match: bool,
    #[serde(default)]
    pub match_operator: MatchOperator,
}

impl FieldModel {
    fn compile(&self, source: FieldSource, throw_on_failure: bool) -> Result<FieldMatcher, ConfigError> {
        let set = MatchersModel {
            matchers: self.matchers.clone(),
            match_operator: self.match_operator,
        }
        .compile(throw_on_failure)?;
        Ok(FieldMatcher::new(source, self.name.clone(), set)
            .ignore_case(self.ignore_case)
            .behaviour(MatchBehaviour::from_reject(self.reject_on_match)))
    }
}

/// Request side of a mapping.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestModel {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<AttributeModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<AttributeModel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<FieldModel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cookies: Vec<FieldModel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<FieldModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<AttributeModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<MatchersModel>,
}

impl RequestModel {
    pub fn compile(&self, throw_on_failure: bool) -> Result<CompositeRequestMatcher, ConfigError> {
        let mut composite = CompositeRequestMatcher::default();

        if !self.methods.is_empty() {
            composite.push(MethodMatcher::new(self.methods.iter().cloned()));
        }
        if let Some(url) = &self.url {
            composite.push(UrlMatcher::new(url.compile(throw_on_failure)?));
        }
        if let Some(path) = &self.path {
            composite.push(PathMatcher::new(path.compile(throw_on_failure)?));
        }
        for header in &self.headers {
            composite.push(header.compile(FieldSource::Header, throw_on_failure)?);
        }
        for cookie in &self.cookies {
            composite.push(cookie.compile(FieldSource::Cookie, throw_on_failure)?);
        }
        for param in &self.params {
            composite.push(param.compile(FieldSource::Param, throw_on_failure)?);
        }
        if let Some(client_ip) = &self.client_ip {
            composite.push(ClientIpMatcher::new(client_ip.compile(throw_on_failure)?));
        }
        if let Some(body) = &self.body {
            composite.push(BodyMatcher::new(body.compile(throw_on_failure)?));
        }
        Ok(composite)
    }
}

fn default_status_code() -> u16 {
    200
}

/// Response side of a mapping.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseModel {
    #[serde(default = "default_status_code")]
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_as_json: Option<Value>,
    /// Base64-encoded body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_as_bytes: Option<String>,
    /// Delay before answering, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,
}

impl Default for ResponseModel {
    fn default() -> Self {
        Self {
            status_code: default_status_code(),
            headers: BTreeMap::new(),
            body: None,
            body_as_json: None,
            body_as_bytes: None,
            delay: None,
        }
    }
}

impl ResponseModel {
    fn compile(&self, guid: &Uuid) -> Result<StaticResponse, ConfigError> {
        if StatusCode::from_u16(self.status_code).is_err() {
            return Err(ConfigError::invalid_mapping(
                guid,
                format!("invalid status code {}", self.status_code),
            ));
        }

        let bodies = [
            self.body.is_some(),
            self.body_as_json.is_some(),
            self.body_as_bytes.is_some(),
        ];
        if bodies.iter().filter(|set| **set).count() > 1 {
            return Err(ConfigError::invalid_mapping(
                guid,
                "only one of body, bodyAsJson and bodyAsBytes may be set",
            ));
        }

        let body = if let Some(text) = &self.body {
            ResponseBody::Text(text.clone())
        } else if let Some(json) = &self.body_as_json {
            ResponseBody::Json(json.clone())
        } else if let Some(encoded) = &self.body_as_bytes {
            base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map_err(|e| ConfigError::Base64 {
                    matcher: "bodyAsBytes".to_string(),
                    reason: e.to_string(),
                })?;
            ResponseBody::Base64(encoded.clone())
        } else {
            ResponseBody::Empty
        };

        let mut response = StaticResponse::new(self.status_code).with_body_kind(body);
        for (name, value) in &self.headers {
            response = response.with_header(name.clone(), value.clone());
        }
        if let Some(delay) = self.delay {
            response = response.with_delay(Duration::from_millis(delay));
        }
        Ok(response)
    }
}

/// A complete mapping definition.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_settings: Option<TimeSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when_state_is: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_state_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times_in_same_state: Option<u32>,
    #[serde(default)]
    pub is_admin_interface: bool,
    #[serde(default)]
    pub request: RequestModel,
    #[serde(default)]
    pub response: ResponseModel,
}

impl MappingModel {
    /// Check field constraints that do not need compilation.
    pub fn validate(&self, guid: &Uuid) -> Result<(), ConfigError> {
        if self.priority <= ADMIN_PRIORITY {
            return Err(ConfigError::invalid_mapping(
                guid,
                "priority is reserved for admin mappings",
            ));
        }
        if let Some(p) = self.probability {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::invalid_mapping(
                    guid,
                    "probability must be within [0, 1]",
                ));
            }
        }
        if self.times_in_same_state == Some(0) {
            return Err(ConfigError::invalid_mapping(
                guid,
                "timesInSameState must be at least 1",
            ));
        }
        let uses_scenario_fields = self.when_state_is.is_some()
            || self.set_state_to.is_some()
            || self.times_in_same_state.is_some();
        if uses_scenario_fields && self.scenario.is_none() {
            return Err(ConfigError::invalid_mapping(
                guid,
                "whenStateIs, setStateTo and timesInSameState require a scenario",
            ));
        }
        if let Some(ts) = &self.time_settings {
            if let (Some(start), Some(end)) = (ts.start, ts.end) {
                if end < start {
                    return Err(ConfigError::invalid_mapping(
                        guid,
                        "timeSettings.end is before timeSettings.start",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Compile into a [`Mapping`]; a missing guid gets a fresh one.
    pub fn compile(&self, throw_on_matcher_failure: bool) -> Result<Mapping, ConfigError> {
        let guid = self.guid.unwrap_or_else(Uuid::new_v4);
        self.validate(&guid)?;

        let request_matcher = self
            .request
            .compile(throw_on_matcher_failure)
            .map_err(|e| ConfigError::invalid_mapping(guid, e.to_string()))?;
        let response = self.response.compile(&guid)?;

        let mut mapping = Mapping::new(request_matcher, response)
            .with_guid(guid)
            .with_priority(self.priority);
        mapping.title = self.title.clone();
        mapping.time_settings = self.time_settings.clone();
        mapping.probability = self.probability;
        mapping.scenario = self.scenario.clone();
        mapping.execution_condition_state = self.when_state_is.clone();
        mapping.next_state = self.set_state_to.clone();
        mapping.state_times = self.times_in_same_state;
        mapping.is_admin_interface = self.is_admin_interface;
        Ok(mapping)
    }
}
