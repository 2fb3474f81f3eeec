//! Runner configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via PHASEGRAPH_CONFIG or --config)
//! 3. Environment variables
//! 4. Command-line flags (applied by the caller)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Transcript output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable, colored lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl OutputFormat {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

/// Runner configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Maximum number of compound steps per run.
    pub max_steps: usize,
    /// Phase to start in instead of the first declared one.
    pub initial_phase: Option<String>,
    /// Stop at the first step where neither phase nor state changed.
    pub stop_on_idle: bool,
    /// Transcript format.
    pub format: OutputFormat,
    /// Default log filter when RUST_LOG is unset.
    pub log_level: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_steps: 15,
            initial_phase: None,
            stop_on_idle: false,
            format: OutputFormat::Text,
            log_level: "info".to_string(),
        }
    }
}

impl RunnerConfig {
    /// Loads configuration from `path` (or PHASEGRAPH_CONFIG when `path` is
    /// `None`), then applies environment variable overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("PHASEGRAPH_CONFIG").map(PathBuf::from));
        if let Some(path) = path {
            config = Self::from_file(&path)?;
        }

        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: RunnerConfig = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from a variable lookup. Unparsable values are
    /// ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(n) = lookup("PHASEGRAPH_MAX_STEPS").and_then(|v| v.parse().ok()) {
            self.max_steps = n;
        }

        if let Some(phase) = lookup("PHASEGRAPH_INITIAL_PHASE") {
            self.initial_phase = Some(phase);
        }

        if let Some(flag) = lookup("PHASEGRAPH_STOP_ON_IDLE") {
            self.stop_on_idle = flag == "true" || flag == "1";
        }

        if let Some(level) = lookup("PHASEGRAPH_LOG_LEVEL") {
            self.log_level = level;
        }

        if let Some(format) = lookup("PHASEGRAPH_FORMAT").and_then(|v| OutputFormat::parse(&v)) {
            self.format = format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "max_steps must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = RunnerConfig::default();
        assert_eq!(config.max_steps, 15);
        assert_eq!(config.initial_phase, None);
        assert!(!config.stop_on_idle);
        assert_eq!(config.format, OutputFormat::Text);
        assert_eq!(config.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_steps: 40\nformat: json\ninitial_phase: Main").unwrap();

        let config = RunnerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_steps, 40);
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.initial_phase.as_deref(), Some("Main"));
        // unspecified fields keep defaults
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_from_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yaml");
        let err = RunnerConfig::from_file(&missing).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(..)));
        assert!(err.to_string().contains("failed to read config file"));

        let bad = dir.path().join("bad.yaml");
        std::fs::write(&bad, "max_steps: lots").unwrap();
        let err = RunnerConfig::from_file(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(..)));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PHASEGRAPH_MAX_STEPS", "7"),
            ("PHASEGRAPH_INITIAL_PHASE", "Combat"),
            ("PHASEGRAPH_STOP_ON_IDLE", "true"),
            ("PHASEGRAPH_LOG_LEVEL", "debug"),
            ("PHASEGRAPH_FORMAT", "JSON"),
        ]
        .into_iter()
        .collect();

        let mut config = RunnerConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.max_steps, 7);
        assert_eq!(config.initial_phase.as_deref(), Some("Combat"));
        assert!(config.stop_on_idle);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.format, OutputFormat::Json);
    }

    #[test]
    fn test_invalid_overrides_ignored() {
        let mut config = RunnerConfig::default();
        config.apply_overrides(|key| match key {
            "PHASEGRAPH_MAX_STEPS" => Some("many".to_string()),
            "PHASEGRAPH_FORMAT" => Some("xml".to_string()),
            _ => None,
        });
        assert_eq!(config, RunnerConfig::default());
    }

    #[test]
    fn test_validate_rejects_zero_steps() {
        let config = RunnerConfig {
            max_steps: 0,
            ..RunnerConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_steps"));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = RunnerConfig {
            initial_phase: Some("Main".to_string()),
            ..RunnerConfig::default()
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: RunnerConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }
}
