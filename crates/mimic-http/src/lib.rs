//! Mimic: HTTP service virtualization.
//!
//! Requests are scored against registered mappings by a fuzzy matching
//! engine; the best perfect match answers, optionally advancing a scenario
//! state machine.
//!
//! # Module Structure
//!
//! - `matchers` - Leaf matchers and the scoring algebra
//! - `request_matcher` - Per-attribute and composite request matchers
//! - `match_result` - Score accumulator and its ordering
//! - `mapping` / `mapping_matcher` - Mappings, their store, best-match selection
//! - `scenario` / `backends` - Scenario state machine and its stores
//! - `config` - Server config and declarative mapping models
//! - `server` - hyper front end

pub mod backends;
pub mod config;
pub mod error;
pub mod mapping;
pub mod mapping_matcher;
pub mod match_result;
pub mod matchers;
pub mod metrics;
pub mod request;
pub mod request_matcher;
pub mod response;
pub mod scenario;
pub mod server;

pub use config::ServerConfig;
pub use error::{ConfigError, MatchError};
pub use mapping::{Mapping, MappingStore, TimeSettings};
pub use mapping_matcher::{BestMatch, MappingMatcher, MappingMatcherResult, MatchingOptions};
pub use match_result::RequestMatchResult;
pub use matchers::{MatchResult, Matcher};
pub use request::RequestMessage;
pub use scenario::{ScenarioStore, Transition};
