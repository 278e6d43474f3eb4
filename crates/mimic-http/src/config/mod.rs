//! Configuration types for the Mimic server.
//!
//! A config file holds the listener, matching options and the initial
//! mapping set. YAML and JSON are both accepted; the format is chosen by
//! file extension.

mod listen;
mod mapping;

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::mapping::{Mapping, ADMIN_PRIORITY};
use crate::mapping_matcher::MatchingOptions;
use crate::request_matcher::{MethodMatcher, PathMatcher, RequestMatcherBuilder};
use crate::response::MetricsResponse;

pub use listen::{ListenConfig, MetricsConfig};
pub use mapping::{
    AttributeModel, FieldModel, MappingModel, MatcherModel, MatchersModel, RequestModel,
    ResponseModel,
};

/// Source format of a config document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    /// `.json` files are JSON; everything else is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Yaml,
        }
    }
}

fn default_admin_path_prefix() -> String {
    "/__admin".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub listen: ListenConfig,

    /// Answer with the best partial match when nothing matches perfectly
    #[serde(default)]
    pub allow_partial_mapping: bool,

    /// Abort a mapping's evaluation on the first matcher error
    #[serde(default)]
    pub throw_on_matcher_failure: bool,

    #[serde(default = "default_admin_path_prefix")]
    pub admin_path_prefix: String,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub mappings: Vec<MappingModel>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: ListenConfig::default(),
            allow_partial_mapping: false,
            throw_on_matcher_failure: false,
            admin_path_prefix: default_admin_path_prefix(),
            metrics: MetricsConfig::default(),
            mappings: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&contents, ConfigFormat::from_path(path))
    }

    pub fn parse(contents: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let config: ServerConfig = match format {
            ConfigFormat::Yaml => {
                serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?
            }
            ConfigFormat::Json => {
                serde_json::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen.socket_addr()?;

        if !self.admin_path_prefix.starts_with('/') {
            return Err(ConfigError::Parse(format!(
                "admin_path_prefix '{}' must start with '/'",
                self.admin_path_prefix
            )));
        }

        let mut seen = HashSet::new();
        for model in &self.mappings {
            if let Some(guid) = model.guid {
                if !seen.insert(guid) {
                    return Err(ConfigError::DuplicateGuid(guid));
                }
                model.validate(&guid)?;
            }
        }
        Ok(())
    }

    pub fn matching_options(&self) -> MatchingOptions {
        MatchingOptions {
            allow_partial_mapping: self.allow_partial_mapping,
            admin_path_prefix: self.admin_path_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Compile every configured mapping, plus the metrics endpoint when enabled.
    pub fn build_mappings(&self) -> Result<Vec<Mapping>, ConfigError> {
        let mut mappings = self
            .mappings
            .iter()
            .map(|model| model.compile(self.throw_on_matcher_failure))
            .collect::<Result<Vec<_>, _>>()?;

        if self.metrics.enabled {
            mappings.push(self.metrics_mapping());
        }
        Ok(mappings)
    }

    fn metrics_mapping(&self) -> Mapping {
        let path = format!("{}/metrics", self.admin_path_prefix.trim_end_matches('/'));
        let matcher = RequestMatcherBuilder::new()
            .with(MethodMatcher::new(["GET"]))
            .with(PathMatcher::exact(&path))
            .build();
        Mapping::new(matcher, MetricsResponse)
            .with_title("metrics")
            .with_priority(ADMIN_PRIORITY)
            .admin_interface()
    }
}
