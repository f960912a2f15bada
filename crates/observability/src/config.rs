use config::{ConfigBuilder, Environment, builder::DefaultState};
use serde::Deserialize;

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ObservabilityConfig {
    /// Default filter directive when `RUST_LOG` is unset (e.g. `info`, `evkernel_infra=debug`).
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Whether to include the target (module path) in each record.
    #[serde(default)]
    pub include_target: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            include_target: false,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON, one object per line
    #[default]
    Json,
    /// Multi-line, human readable
    Pretty,
    /// Single-line, human readable
    Compact,
}

fn default_level() -> String {
    "info".to_string()
}

impl ObservabilityConfig {
    /// Load from `EVKERNEL_LOG_*` environment variables
    /// (e.g. `EVKERNEL_LOG_FORMAT=pretty`).
    pub fn load() -> anyhow::Result<Self> {
        Self::from_builder(
            config::Config::builder()
                .add_source(Environment::with_prefix("EVKERNEL_LOG").try_parsing(true)),
        )
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<Self> {
        let cfg: ObservabilityConfig = builder.build()?.try_deserialize()?;
        Ok(cfg)
    }
}
