//! Configuration loaded from TOML.
//!
//! Every section and field has a default, so an empty file is a valid
//! configuration:
//!
//! ```toml
//! [catalog]
//! id_base = "https://repo.example.org/"
//!
//! [aggregator]
//! probe_order = ["user", "group", "category", "folder", "artifact"]
//! max_concurrent_fetches = 8
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//!
//! [monitor]
//! queues = ["indexing"]
//! ```

use std::path::{Path, PathBuf};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregator::DEFAULT_MAX_CONCURRENT_FETCHES;
use crate::catalog::{DEFAULT_ID_BASE, IdentityCatalog};
use crate::logging::LogFormat;
use crate::types::ProbeOrder;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LookoutConfig {
    pub catalog: CatalogConfig,
    pub aggregator: AggregatorConfig,
    pub logging: LoggingConfig,
    pub monitor: MonitorConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    /// Prefix of every canonical id.
    pub id_base: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            id_base: DEFAULT_ID_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AggregatorConfig {
    pub probe_order: ProbeOrder,
    pub max_concurrent_fetches: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        AggregatorConfig {
            probe_order: ProbeOrder::default(),
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter level; `RUST_LOG` overrides it.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    /// Queues reported by `Inspector::queue_counts`, in report order.
    pub queues: Vec<String>,
}

impl LookoutConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: LookoutConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.catalog()?;

        if self.aggregator.max_concurrent_fetches == 0 {
            return Err(ConfigError::Validation(
                "aggregator.max_concurrent_fetches must be at least 1".to_string(),
            ));
        }
        // Re-checked here for configs built in code rather than parsed.
        ProbeOrder::new(self.aggregator.probe_order.as_slice().to_vec())
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level '{}' is not one of {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }

        if let Some(dup) = self.monitor.queues.iter().duplicates().next() {
            return Err(ConfigError::Validation(format!(
                "monitor.queues lists '{dup}' more than once"
            )));
        }
        Ok(())
    }

    pub fn catalog(&self) -> Result<IdentityCatalog, ConfigError> {
        IdentityCatalog::new(&self.catalog.id_base)
            .map_err(|e| ConfigError::Validation(format!("catalog.id_base: {e}")))
    }
}
