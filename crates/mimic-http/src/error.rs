//! Error types shared across the matching engine.

use serde::Serialize;
use uuid::Uuid;

/// Failure raised while evaluating a matcher against a request.
///
/// Carried inside [`MatchResult`](crate::matchers::MatchResult) so a failing
/// matcher never aborts evaluation of other mappings.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum MatchError {
    #[error("{matcher}: invalid input: {reason}")]
    InvalidInput { matcher: String, reason: String },

    #[error("{matcher}: pattern '{pattern}' could not be evaluated: {reason}")]
    Pattern {
        matcher: String,
        pattern: String,
        reason: String,
    },

    #[error("mapping evaluation failed: {reason}")]
    Evaluation { reason: String },
}

impl MatchError {
    pub fn invalid_input(matcher: impl Into<String>, reason: impl ToString) -> Self {
        MatchError::InvalidInput {
            matcher: matcher.into(),
            reason: reason.to_string(),
        }
    }

    pub fn evaluation(reason: impl ToString) -> Self {
        MatchError::Evaluation {
            reason: reason.to_string(),
        }
    }

    pub fn pattern(
        matcher: impl Into<String>,
        pattern: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        MatchError::Pattern {
            matcher: matcher.into(),
            pattern: pattern.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors raised while loading configuration or compiling mapping models.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config format: {0}")]
    Parse(String),

    #[error("Invalid regex '{pattern}': {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid JSONPath '{pattern}': {reason}")]
    JsonPath { pattern: String, reason: String },

    #[error("Invalid base64 pattern for {matcher}: {reason}")]
    Base64 { matcher: String, reason: String },

    #[error("Unknown matcher '{0}'")]
    UnknownMatcher(String),

    #[error("{0} requires at least one pattern")]
    MissingPattern(String),

    #[error("{0} patterns must be strings")]
    PatternNotString(String),

    #[error("Mapping {guid}: {reason}")]
    InvalidMapping { guid: String, reason: String },

    #[error("Duplicate mapping guid {0}")]
    DuplicateGuid(Uuid),
}

impl ConfigError {
    pub fn invalid_mapping(guid: impl ToString, reason: impl Into<String>) -> Self {
        ConfigError::InvalidMapping {
            guid: guid.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_error_display() {
        let err = MatchError::invalid_input("XPathMatcher", "unexpected end of document");
        assert_eq!(
            err.to_string(),
            "XPathMatcher: invalid input: unexpected end of document"
        );

        let err = MatchError::pattern("RegexMatcher", "^a(", "unclosed group");
        assert!(err.to_string().contains("'^a('"));
    }

    #[test]
    fn test_match_error_serializes_with_type_tag() {
        let err = MatchError::evaluation("boom");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "evaluation");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::invalid_mapping("abc", "probability must be within [0, 1]");
        assert_eq!(
            err.to_string(),
            "Mapping abc: probability must be within [0, 1]"
        );
    }
}
