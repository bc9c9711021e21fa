//! Configuration for the trigger controller

use crate::operations::OperationCategory;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main controller configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Subscription used when the factory is selected by name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,

    /// Time budgets per operation category
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Independent time budgets, one per public operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_create_secs")]
    pub create_secs: u64,

    #[serde(default = "default_read_secs")]
    pub read_secs: u64,

    #[serde(default = "default_update_secs")]
    pub update_secs: u64,

    #[serde(default = "default_delete_secs")]
    pub delete_secs: u64,
}

impl TimeoutConfig {
    /// Budget for one call of `category`
    pub fn budget(&self, category: OperationCategory) -> Duration {
        let secs = match category {
            OperationCategory::Create => self.create_secs,
            OperationCategory::Read => self.read_secs,
            OperationCategory::Update => self.update_secs,
            OperationCategory::Delete => self.delete_secs,
        };
        Duration::from_secs(secs)
    }

    /// The same budget for every category
    pub fn uniform(budget: Duration) -> Self {
        let secs = budget.as_secs();
        Self {
            create_secs: secs,
            read_secs: secs,
            update_secs: secs,
            delete_secs: secs,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            create_secs: default_create_secs(),
            read_secs: default_read_secs(),
            update_secs: default_update_secs(),
            delete_secs: default_delete_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_create_secs() -> u64 {
    30 * 60
}

fn default_read_secs() -> u64 {
    5 * 60
}

fn default_update_secs() -> u64 {
    30 * 60
}

fn default_delete_secs() -> u64 {
    30 * 60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ControllerConfig {
    /// Load configuration from defaults, an optional file and the environment
    ///
    /// Environment variables use the `TRIGGER_` prefix and `__` between
    /// nested keys, e.g. `TRIGGER_TIMEOUTS__READ_SECS=60`.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&ControllerConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("TRIGGER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
