//! Text matchers: exact, wildcard, regex, similarity and presence.
//!
//! Patterns are compiled once at construction (regexes, lowercase copies) so
//! evaluation only pays for the comparison itself.

use super::score::{self, MatchBehaviour, MatchOperator, MatchResult};
use super::{CachedValue, MatchInput, Matcher};
use crate::error::ConfigError;
use regex::{Regex, RegexBuilder};
use similar::TextDiff;
use std::sync::Arc;

/// Exact string equality against one or more patterns.
#[derive(Debug, Clone)]
pub struct ExactMatcher {
    patterns: Vec<CachedValue>,
    ignore_case: bool,
    behaviour: MatchBehaviour,
    operator: MatchOperator,
}

impl ExactMatcher {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(CachedValue::new).collect(),
            ignore_case: false,
            behaviour: MatchBehaviour::AcceptOnMatch,
            operator: MatchOperator::Or,
        }
    }

    pub fn ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    pub fn behaviour(mut self, behaviour: MatchBehaviour) -> Self {
        self.behaviour = behaviour;
        self
    }

    pub fn operator(mut self, operator: MatchOperator) -> Self {
        self.operator = operator;
        self
    }
}

impl Matcher for ExactMatcher {
    fn name(&self) -> &str {
        "ExactMatcher"
    }

    fn patterns(&self) -> Vec<String> {
        self.patterns.iter().map(|p| p.value.clone()).collect()
    }

    fn match_behaviour(&self) -> MatchBehaviour {
        self.behaviour
    }

    fn is_match(&self, input: &MatchInput<'_>) -> MatchResult {
        let score = match input.as_text() {
            Some(text) => {
                let scores: Vec<f64> = self
                    .patterns
                    .iter()
                    .map(|p| score::from_bool(p.equals(&text, !self.ignore_case)))
                    .collect();
                self.operator.combine(&scores)
            }
            None => score::MISMATCH,
        };
        MatchResult::new(score).with_behaviour(self.behaviour)
    }
}

/// Regular expression matcher.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    name: &'static str,
    patterns: Vec<(String, Arc<Regex>)>,
    behaviour: MatchBehaviour,
    operator: MatchOperator,
}

impl RegexMatcher {
    pub fn new<I, S>(patterns: I, ignore_case: bool) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let pattern = p.into();
                let regex = compile_regex(&pattern, ignore_case)?;
                Ok((pattern, Arc::new(regex)))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            name: "RegexMatcher",
            patterns,
            behaviour: MatchBehaviour::AcceptOnMatch,
            operator: MatchOperator::Or,
        })
    }

    pub fn behaviour(mut self, behaviour: MatchBehaviour) -> Self {
        self.behaviour = behaviour;
        self
    }

    pub fn operator(mut self, operator: MatchOperator) -> Self {
        self.operator = operator;
        self
    }

    fn score(&self, input: &MatchInput<'_>) -> MatchResult {
        let score = match input.as_text() {
            Some(text) => {
                let scores: Vec<f64> = self
                    .patterns
                    .iter()
                    .map(|(_, regex)| score::from_bool(regex.is_match(&text)))
                    .collect();
                self.operator.combine(&scores)
            }
            None => score::MISMATCH,
        };
        MatchResult::new(score).with_behaviour(self.behaviour)
    }
}

fn compile_regex(pattern: &str, ignore_case: bool) -> Result<Regex, ConfigError> {
    RegexBuilder::new(pattern)
        .case_insensitive(ignore_case)
        .build()
        .map_err(|source| ConfigError::Regex {
            pattern: pattern.to_string(),
            source,
        })
}

impl Matcher for RegexMatcher {
    fn name(&self) -> &str {
        self.name
    }

    fn patterns(&self) -> Vec<String> {
        self.patterns.iter().map(|(p, _)| p.clone()).collect()
    }

    fn match_behaviour(&self) -> MatchBehaviour {
        self.behaviour
    }

    fn is_match(&self, input: &MatchInput<'_>) -> MatchResult {
        self.score(input)
    }
}

/// Glob-style matcher: `*` matches any run of characters, `?` exactly one.
///
/// Implemented as an anchored [`RegexMatcher`] but reports the original globs.
#[derive(Debug, Clone)]
pub struct WildcardMatcher {
    globs: Vec<String>,
    inner: RegexMatcher,
}

impl WildcardMatcher {
    pub fn new<I, S>(patterns: I, ignore_case: bool) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let globs: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let mut inner = RegexMatcher::new(globs.iter().map(|g| glob_to_regex(g)), ignore_case)?;
        inner.name = "WildcardMatcher";
        Ok(Self { globs, inner })
    }

    pub fn behaviour(mut self, behaviour: MatchBehaviour) -> Self {
        self.inner = self.inner.behaviour(behaviour);
        self
    }

    pub fn operator(mut self, operator: MatchOperator) -> Self {
        self.inner = self.inner.operator(operator);
        self
    }
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() + 8);
    out.push('^');
    for c in glob.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
        }
    }
    out.push('$');
    out
}

impl Matcher for WildcardMatcher {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn patterns(&self) -> Vec<String> {
        self.globs.clone()
    }

    fn match_behaviour(&self) -> MatchBehaviour {
        self.inner.match_behaviour()
    }

    fn is_match(&self, input: &MatchInput<'_>) -> MatchResult {
        self.inner.score(input)
    }
}

/// Fuzzy matcher scoring the character-level similarity ratio to each pattern.
#[derive(Debug, Clone)]
pub struct SimMetricsMatcher {
    patterns: Vec<String>,
    behaviour: MatchBehaviour,
    operator: MatchOperator,
}

impl SimMetricsMatcher {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
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
}

impl Matcher for SimMetricsMatcher {
    fn name(&self) -> &str {
        "SimMetricsMatcher"
    }

    fn patterns(&self) -> Vec<String> {
        self.patterns.clone()
    }

    fn match_behaviour(&self) -> MatchBehaviour {
        self.behaviour
    }

    fn is_match(&self, input: &MatchInput<'_>) -> MatchResult {
        let score = match input.as_text() {
            Some(text) => {
                let scores: Vec<f64> = self
                    .patterns
                    .iter()
                    .map(|p| f64::from(TextDiff::from_chars(p.as_str(), text.as_ref()).ratio()))
                    .collect();
                self.operator.combine(&scores)
            }
            None => score::MISMATCH,
        };
        MatchResult::new(score).with_behaviour(self.behaviour)
    }
}

/// Matches any present, non-empty value.
#[derive(Debug, Clone, Default)]
pub struct NotNullOrEmptyMatcher {
    behaviour: MatchBehaviour,
}

impl NotNullOrEmptyMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn behaviour(mut self, behaviour: MatchBehaviour) -> Self {
        self.behaviour = behaviour;
        self
    }
}

impl Matcher for NotNullOrEmptyMatcher {
    fn name(&self) -> &str {
        "NotNullOrEmptyMatcher"
    }

    fn patterns(&self) -> Vec<String> {
        Vec::new()
    }

    fn match_behaviour(&self) -> MatchBehaviour {
        self.behaviour
    }

    fn is_match(&self, input: &MatchInput<'_>) -> MatchResult {
        let present = match input {
            MatchInput::Missing => false,
            MatchInput::Text(text) => !text.is_empty(),
            MatchInput::Json(value) => !value.is_null(),
            MatchInput::Bytes(bytes) => !bytes.is_empty(),
        };
        MatchResult::from_bool(present).with_behaviour(self.behaviour)
    }
}
