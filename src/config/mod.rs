//! Configuration module for tablescope.

use crate::error::{Result, TablescopeError};
use crate::resilience::RetryConfig;
use crate::types::{FilterCriteria, SourceMode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TablescopeConfig {
    /// Lineage lookup configuration.
    #[serde(default)]
    pub lineage: LineageConfig,
    /// Access counting configuration.
    #[serde(default)]
    pub usage: UsageConfig,
    /// Retry policy for rate-limited origins.
    #[serde(default)]
    pub retry: RetrySettings,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl TablescopeConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TablescopeError::Config(format!("Failed to read config file: {}", e))
        })?;

        let config: Self = serde_json::from_str(&content).map_err(|e| {
            TablescopeError::Config(format!("Failed to parse config: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.lineage.location.trim().is_empty() {
            return Err(invalid("lineage.location", "Location must not be empty"));
        }

        if self.lineage.allowed_projects.iter().any(|p| p.trim().is_empty()) {
            return Err(invalid(
                "lineage.allowed_projects",
                "Project names must not be empty",
            ));
        }

        if self.usage.region.trim().is_empty() {
            return Err(invalid("usage.region", "Region must not be empty"));
        }

        if self.usage.default_days == 0 {
            return Err(invalid("usage.default_days", "Window must be at least one day"));
        }

        if self.usage.schema_retention_days == 0 {
            return Err(invalid(
                "usage.schema_retention_days",
                "Retention must be at least one day",
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts", "At least one attempt is required"));
        }

        if self.retry.multiplier < 1.0 {
            return Err(invalid("retry.multiplier", "Backoff multiplier must be >= 1.0"));
        }

        Ok(())
    }

    /// Create a minimal development configuration.
    pub fn development() -> Self {
        Self {
            lineage: LineageConfig::default(),
            usage: UsageConfig {
                default_days: 7,
                ..Default::default()
            },
            retry: RetrySettings {
                max_attempts: 2,
                initial_delay: Duration::from_millis(100),
                max_delay: Duration::from_secs(1),
                multiplier: 2.0,
                jitter: false,
            },
            observability: ObservabilityConfig {
                log_level: "debug".to_string(),
                json_logs: false,
            },
        }
    }
}

fn invalid(field: &str, reason: &str) -> TablescopeError {
    TablescopeError::InvalidConfig {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Lineage lookup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineageConfig {
    /// Lineage API location (e.g. `us`, `eu`).
    pub location: String,
    /// Projects downstream exploration may enter. Empty means all.
    #[serde(default)]
    pub allowed_projects: Vec<String>,
}

impl Default for LineageConfig {
    fn default() -> Self {
        Self {
            location: "us".to_string(),
            allowed_projects: Vec::new(),
        }
    }
}

/// Access counting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageConfig {
    /// BigQuery region holding `INFORMATION_SCHEMA`.
    pub region: String,
    /// Default look-back window in days.
    pub default_days: u32,
    /// Default minimum access count.
    #[serde(default)]
    pub min_access_count: u64,
    /// Origins to consult.
    #[serde(default)]
    pub source_mode: SourceMode,
    /// How far back `INFORMATION_SCHEMA` job history reaches.
    pub schema_retention_days: u32,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            region: "us".to_string(),
            default_days: 30,
            min_access_count: 0,
            source_mode: SourceMode::Both,
            schema_retention_days: 180,
        }
    }
}

impl From<&UsageConfig> for FilterCriteria {
    fn from(config: &UsageConfig) -> Self {
        FilterCriteria::new()
            .with_days(config.default_days)
            .with_min_access_count(config.min_access_count)
    }
}

/// Retry settings for rate-limited calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,
    /// Upper bound on any delay.
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
    /// Add jitter to delays.
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: false,
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        RetryConfig {
            max_attempts: settings.max_attempts,
            initial_delay: settings.initial_delay,
            max_delay: settings.max_delay,
            multiplier: settings.multiplier,
            jitter: settings.jitter,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level.
    pub log_level: String,
    /// Enable JSON logging.
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Serde helper for Duration using humantime format.
pub mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}ms", duration.as_millis()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(crate) fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        if let Some(ms) = s.strip_suffix("ms") {
            ms.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| e.to_string())
        } else if let Some(s_val) = s.strip_suffix('s') {
            s_val
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| e.to_string())
        } else if let Some(m) = s.strip_suffix('m') {
            m.parse::<u64>()
                .map(|v| Duration::from_secs(v * 60))
                .map_err(|e| e.to_string())
        } else {
            s.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = TablescopeConfig::default();
        assert_eq!(config.lineage.location, "us");
        assert_eq!(config.usage.default_days, 30);
        assert_eq!(config.usage.schema_retention_days, 180);
        assert_eq!(config.usage.source_mode, SourceMode::Both);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_development_config() {
        let config = TablescopeConfig::development();
        assert_eq!(config.usage.default_days, 7);
        assert!(!config.retry.jitter);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects() {
        let mut config = TablescopeConfig::default();
        config.usage.default_days = 0;
        assert!(matches!(
            config.validate(),
            Err(TablescopeError::InvalidConfig { ref field, .. }) if field == "usage.default_days"
        ));

        let mut config = TablescopeConfig::default();
        config.lineage.allowed_projects = vec!["p1".to_string(), " ".to_string()];
        assert!(config.validate().is_err());

        let mut config = TablescopeConfig::default();
        config.retry.multiplier = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "lineage": {{ "location": "eu", "allowed_projects": ["p1", "p2"] }},
                "usage": {{
                    "region": "eu",
                    "default_days": 90,
                    "min_access_count": 5,
                    "source_mode": "audit_only",
                    "schema_retention_days": 180
                }},
                "retry": {{
                    "max_attempts": 3,
                    "initial_delay": "500ms",
                    "max_delay": "2s",
                    "multiplier": 2.0
                }}
            }}"#
        )
        .unwrap();

        let config = TablescopeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.lineage.location, "eu");
        assert_eq!(config.lineage.allowed_projects.len(), 2);
        assert_eq!(config.usage.source_mode, SourceMode::AuditOnly);
        assert_eq!(config.retry.initial_delay, Duration::from_millis(500));
        assert_eq!(config.retry.max_delay, Duration::from_secs(2));
        assert_eq!(config.observability.log_level, "info");

        let criteria = FilterCriteria::from(&config.usage);
        assert_eq!(criteria.days, 90);
        assert_eq!(criteria.min_access_count, 5);
    }

    #[test]
    fn test_from_file_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "usage": {{ "region": "us", "default_days": 0, "schema_retention_days": 180 }} }}"#
        )
        .unwrap();
        assert!(TablescopeConfig::from_file(file.path()).is_err());

        let missing = TablescopeConfig::from_file(Path::new("/nonexistent/tablescope.json"));
        assert!(matches!(missing, Err(TablescopeError::Config(_))));
    }

    #[test]
    fn test_parse_duration() {
        use humantime_serde::parse_duration;
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("3s"), Ok(Duration::from_secs(3)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("40"), Ok(Duration::from_millis(40)));
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_retry_config_from_settings() {
        let retry = RetryConfig::from(&RetrySettings::default());
        assert_eq!(retry.max_attempts, 4);
        assert_eq!(retry.initial_delay, Duration::from_secs(1));
    }
}
