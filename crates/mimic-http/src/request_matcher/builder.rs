use super::{
    BodyMatcher, ClientIpMatcher, CompositeRequestMatcher, FieldMatcher, FieldSource, MatcherSet,
    MethodMatcher, PathMatcher, RequestMatcher, UrlMatcher,
};
use crate::matchers::{ExactMatcher, MatchOperator, Matcher};

/// Fluent construction of a [`CompositeRequestMatcher`].
///
/// ```
/// use mimic_http::request_matcher::RequestMatcherBuilder;
///
/// let matcher = RequestMatcherBuilder::new()
///     .using_methods(["GET"])
///     .with_path("/api/users")
///     .with_header("Accept", "application/json")
///     .build();
/// assert_eq!(matcher.len(), 3);
/// ```
#[derive(Debug, Default)]
pub struct RequestMatcherBuilder {
    composite: CompositeRequestMatcher,
}

impl RequestMatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Combine attributes with `Or` instead of averaging them.
    pub fn any() -> Self {
        Self {
            composite: CompositeRequestMatcher::new(MatchOperator::Or),
        }
    }

    pub fn using_methods<I, S>(self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with(MethodMatcher::new(methods))
    }

    pub fn with_path(self, path: &str) -> Self {
        self.with(PathMatcher::exact(path))
    }

    pub fn with_path_matcher(self, matcher: impl Matcher + 'static) -> Self {
        self.with(PathMatcher::new(MatcherSet::single(matcher)))
    }

    pub fn with_url(self, url: &str) -> Self {
        self.with(UrlMatcher::exact(url))
    }

    pub fn with_url_matcher(self, matcher: impl Matcher + 'static) -> Self {
        self.with(UrlMatcher::new(MatcherSet::single(matcher)))
    }

    pub fn with_header(self, name: &str, value: &str) -> Self {
        self.with(FieldMatcher::exact(FieldSource::Header, name, value))
    }

    pub fn with_header_matcher(self, name: &str, matcher: impl Matcher + 'static) -> Self {
        self.with(FieldMatcher::header(name, MatcherSet::single(matcher)))
    }

    pub fn with_cookie(self, name: &str, value: &str) -> Self {
        self.with(FieldMatcher::exact(FieldSource::Cookie, name, value))
    }

    pub fn with_param(self, name: &str, value: &str) -> Self {
        self.with(FieldMatcher::new(
            FieldSource::Param,
            name,
            MatcherSet::single(ExactMatcher::new([value])),
        ))
    }

    pub fn with_client_ip(self, matcher: impl Matcher + 'static) -> Self {
        self.with(ClientIpMatcher::new(MatcherSet::single(matcher)))
    }

    pub fn with_body(self, matcher: impl Matcher + 'static) -> Self {
        self.with(BodyMatcher::new(MatcherSet::single(matcher)))
    }

    pub fn with(mut self, matcher: impl RequestMatcher + 'static) -> Self {
        self.composite.push(matcher);
        self
    }

    pub fn build(self) -> CompositeRequestMatcher {
        self.composite
    }
}
