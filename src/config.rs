//! Configuration for context compaction
//!
//! `CompactionConfig` is the static value the core reads. `Settings` is a
//! host-side convenience that layers `.env`, an optional config file and
//! `CONTEXT__*` environment variables; the core itself never calls it.

use crate::error::{ContextError, Result};
use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Compaction configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactionConfig {
    /// Global enable/disable for auto-compaction
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Total tokens the model accepts in one request
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    /// Headroom kept free for the response
    #[serde(default = "default_reserve_tokens")]
    pub reserve_tokens: usize,

    /// Nominal auto-compaction trigger, clamped by the hard budget
    #[serde(default = "default_auto_compact_threshold")]
    pub auto_compact_threshold: usize,

    /// Fraction of the hard budget allotted to retained history, in (0, 1]
    #[serde(default = "default_max_history_share")]
    pub max_history_share: f64,

    /// Distance below the flush trigger at which the flush gate rearms
    #[serde(default = "default_memory_flush_rearm_gap")]
    pub memory_flush_rearm_gap: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_context_window() -> usize {
    128_000
}

fn default_reserve_tokens() -> usize {
    20_000
}

fn default_auto_compact_threshold() -> usize {
    100_000
}

fn default_max_history_share() -> f64 {
    0.5
}

fn default_memory_flush_rearm_gap() -> usize {
    4_000
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            context_window: default_context_window(),
            reserve_tokens: default_reserve_tokens(),
            auto_compact_threshold: default_auto_compact_threshold(),
            max_history_share: default_max_history_share(),
            memory_flush_rearm_gap: default_memory_flush_rearm_gap(),
        }
    }
}

impl CompactionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_context_window(mut self, tokens: usize) -> Self {
        self.context_window = tokens;
        self
    }

    #[must_use]
    pub fn with_reserve_tokens(mut self, tokens: usize) -> Self {
        self.reserve_tokens = tokens;
        self
    }

    #[must_use]
    pub fn with_auto_compact_threshold(mut self, tokens: usize) -> Self {
        self.auto_compact_threshold = tokens;
        self
    }

    #[must_use]
    pub fn with_max_history_share(mut self, share: f64) -> Self {
        self.max_history_share = share;
        self
    }

    #[must_use]
    pub fn with_memory_flush_rearm_gap(mut self, tokens: usize) -> Self {
        self.memory_flush_rearm_gap = tokens;
        self
    }

    /// Validate that the configuration describes a usable window.
    ///
    /// Budgets derived from an unvalidated config are still floored at one
    /// token, so skipping this never breaks the core.
    pub fn validate(&self) -> Result<()> {
        if self.context_window == 0 {
            return Err(ContextError::Configuration(
                "context_window must be at least 1 token".to_string(),
            ));
        }

        let share = self.max_history_share;
        if !share.is_finite() || share <= 0.0 || share > 1.0 {
            return Err(ContextError::Configuration(format!(
                "max_history_share must be in (0, 1], got {}",
                share
            )));
        }

        Ok(())
    }

    /// Overlay `COMPACTION_*` environment variables on the defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("COMPACTION_ENABLED") {
            config.enabled = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("COMPACTION_CONTEXT_WINDOW") {
            if let Ok(num) = val.parse() {
                config.context_window = num;
            }
        }

        if let Ok(val) = std::env::var("COMPACTION_RESERVE_TOKENS") {
            if let Ok(num) = val.parse() {
                config.reserve_tokens = num;
            }
        }

        if let Ok(val) = std::env::var("COMPACTION_AUTO_COMPACT_THRESHOLD") {
            if let Ok(num) = val.parse() {
                config.auto_compact_threshold = num;
            }
        }

        if let Ok(val) = std::env::var("COMPACTION_MAX_HISTORY_SHARE") {
            if let Ok(num) = val.parse() {
                config.max_history_share = num;
            }
        }

        if let Ok(val) = std::env::var("COMPACTION_MEMORY_FLUSH_REARM_GAP") {
            if let Ok(num) = val.parse() {
                config.memory_flush_rearm_gap = num;
            }
        }

        config
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Top-level settings a host application may load
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub compaction: CompactionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Settings {
    /// Load settings from `.env`, an optional file and `CONTEXT__*` variables.
    ///
    /// `path` is passed to `config::File::with_name`, so the extension may be
    /// omitted. A missing file is not an error.
    pub fn load(path: &str) -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings: Settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("CONTEXT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.compaction.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CompactionConfig::default();
        assert!(config.enabled);
        assert_eq!(config.context_window, 128_000);
        assert_eq!(config.reserve_tokens, 20_000);
        assert_eq!(config.max_history_share, 0.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_share() {
        assert!(CompactionConfig::default().with_max_history_share(0.0).validate().is_err());
        assert!(CompactionConfig::default().with_max_history_share(1.5).validate().is_err());
        assert!(CompactionConfig::default().with_max_history_share(f64::NAN).validate().is_err());
        assert!(CompactionConfig::default().with_max_history_share(1.0).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_window() {
        let config = CompactionConfig::default().with_context_window(0);
        assert!(matches!(config.validate(), Err(ContextError::Configuration(_))));
    }

    #[test]
    fn test_from_env_overlay() {
        std::env::set_var("COMPACTION_CONTEXT_WINDOW", "200000");
        std::env::set_var("COMPACTION_ENABLED", "0");
        std::env::set_var("COMPACTION_RESERVE_TOKENS", "not-a-number");

        let config = CompactionConfig::from_env();

        std::env::remove_var("COMPACTION_CONTEXT_WINDOW");
        std::env::remove_var("COMPACTION_ENABLED");
        std::env::remove_var("COMPACTION_RESERVE_TOKENS");

        assert_eq!(config.context_window, 200_000);
        assert!(!config.enabled);
        assert_eq!(config.reserve_tokens, 20_000);
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: CompactionConfig =
            serde_json::from_str(r#"{"context_window": 32000, "enabled": false}"#).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.context_window, 32_000);
        assert_eq!(config.reserve_tokens, 20_000);
        assert_eq!(config.memory_flush_rearm_gap, 4_000);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!(
            "context-compaction-settings-{}.toml",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"
            [compaction]
            context_window = 64000
            reserve_tokens = 8000
            auto_compact_threshold = 50000

            [logging]
            level = "debug"
            json = true
            "#,
        )
        .unwrap();

        let settings = Settings::load(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(settings.compaction.context_window, 64_000);
        assert_eq!(settings.compaction.reserve_tokens, 8_000);
        assert_eq!(settings.compaction.auto_compact_threshold, 50_000);
        assert_eq!(settings.compaction.max_history_share, 0.5);
        assert_eq!(settings.logging.level, "debug");
        assert!(settings.logging.json);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let settings = Settings::load("/nonexistent/context-compaction/settings").unwrap();
        assert_eq!(settings.compaction, CompactionConfig::default());
    }
}
