//! Configuration management for imgbatch
//!
//! Settings come from three layers: built-in defaults, an optional TOML or
//! YAML file, and command-line flags (applied by the binary, highest wins).

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::{ImgBatchError, Result};

/// Worker count used when neither the file nor the command line sets one
pub const DEFAULT_THREADS: usize = 8;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// WebP conversion settings
    pub convert: ConvertConfig,

    /// Image download settings
    pub download: DownloadConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Settings for the `convert` command
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Folder receiving the `.webp` files
    pub output: PathBuf,

    /// Maximum number of conversions in flight
    pub threads: usize,

    /// Error log file, appended to on failures
    pub error_log: PathBuf,

    /// Conversion executable
    pub cwebp_path: PathBuf,

    /// Extra arguments placed before the input path (e.g. `["-q", "80"]`)
    pub cwebp_args: Vec<String>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("webp_images"),
            threads: DEFAULT_THREADS,
            error_log: PathBuf::from("webp_error_log.txt"),
            cwebp_path: PathBuf::from("cwebp"),
            cwebp_args: Vec::new(),
        }
    }
}

/// Settings for the `download` command
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Folder receiving the downloaded files
    pub output: PathBuf,

    /// Maximum number of downloads in flight
    pub threads: usize,

    /// Error log file, appended to on failures
    pub error_log: PathBuf,

    /// Whole-request timeout in seconds (None = no timeout)
    pub timeout_seconds: Option<u64>,

    /// User-Agent header sent with every request
    pub user_agent: Option<String>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("images"),
            threads: DEFAULT_THREADS,
            error_log: PathBuf::from("error_log.txt"),
            timeout_seconds: None,
            user_agent: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ImgBatchError::config(
                format!("Failed to read config file {:?}: {}", path.as_ref(), e)
            ))?;

        let extension = path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        match extension.to_lowercase().as_str() {
            "toml" => toml::from_str(&content).map_err(Into::into),
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(Into::into),
            _ => Err(ImgBatchError::config(
                "Unsupported config file format. Use .toml or .yaml"
            )),
        }
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let extension = path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        let content = match extension.to_lowercase().as_str() {
            "toml" => toml::to_string_pretty(self)
                .map_err(|e| ImgBatchError::config(format!("TOML serialization failed: {}", e)))?,
            "yaml" | "yml" => serde_yaml::to_string(self)
                .map_err(|e| ImgBatchError::config(format!("YAML serialization failed: {}", e)))?,
            _ => return Err(ImgBatchError::config(
                "Unsupported config file format. Use .toml or .yaml"
            )),
        };

        std::fs::write(&path, content)
            .map_err(|e| ImgBatchError::config(
                format!("Failed to write config file {:?}: {}", path.as_ref(), e)
            ))?;

        Ok(())
    }
}

impl LoggingConfig {
    /// Checked when the file is loaded; the command sections are checked once
    /// command-line overrides have been applied.
    pub fn validate(&self) -> Result<()> {
        if self.level.trim().is_empty() {
            return Err(ImgBatchError::config("Log level must not be empty"));
        }

        Ok(())
    }
}

impl ConvertConfig {
    pub fn validate(&self) -> Result<()> {
        validate_common("convert", self.threads, &self.output, &self.error_log)?;

        if self.cwebp_path.as_os_str().is_empty() {
            return Err(ImgBatchError::config("convert.cwebp_path must not be empty"));
        }

        Ok(())
    }
}

impl DownloadConfig {
    pub fn validate(&self) -> Result<()> {
        validate_common("download", self.threads, &self.output, &self.error_log)?;

        if self.timeout_seconds == Some(0) {
            return Err(ImgBatchError::config("download.timeout_seconds must be greater than 0"));
        }

        Ok(())
    }
}

fn validate_common(section: &str, threads: usize, output: &Path, error_log: &Path) -> Result<()> {
    if threads == 0 {
        return Err(ImgBatchError::invalid_configuration(
            format!("{}.threads must be greater than 0", section)
        ));
    }

    if output.as_os_str().is_empty() {
        return Err(ImgBatchError::config(format!("{}.output must not be empty", section)));
    }

    if error_log.as_os_str().is_empty() {
        return Err(ImgBatchError::config(format!("{}.error_log must not be empty", section)));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.convert.output, PathBuf::from("webp_images"));
        assert_eq!(config.convert.error_log, PathBuf::from("webp_error_log.txt"));
        assert_eq!(config.download.output, PathBuf::from("images"));
        assert_eq!(config.download.error_log, PathBuf::from("error_log.txt"));
        assert_eq!(config.convert.threads, 8);
        assert_eq!(config.download.threads, 8);
        assert!(config.convert.validate().is_ok());
        assert!(config.download.validate().is_ok());
        assert!(config.logging.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [convert]
            threads = 2
            cwebp_args = ["-q", "75"]

            [download]
            timeout_seconds = 30
            "#,
        )
        .unwrap();

        assert_eq!(parsed.convert.threads, 2);
        assert_eq!(parsed.convert.cwebp_args, vec!["-q", "75"]);
        assert_eq!(parsed.convert.output, PathBuf::from("webp_images"));
        assert_eq!(parsed.download.timeout_seconds, Some(30));
        assert_eq!(parsed.download.threads, 8);
        assert_eq!(parsed.logging.level, "warn");
    }

    #[test]
    fn test_config_file_io() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.download.user_agent = Some("imgbatch-test".to_string());

        let toml_path = dir.path().join("imgbatch.toml");
        config.to_file(&toml_path).unwrap();
        let loaded = Config::from_file(&toml_path).unwrap();
        assert!(loaded.download.validate().is_ok());
        assert_eq!(loaded.download.user_agent.as_deref(), Some("imgbatch-test"));

        let yaml_path = dir.path().join("imgbatch.yaml");
        config.to_file(&yaml_path).unwrap();
        let loaded = Config::from_file(&yaml_path).unwrap();
        assert_eq!(loaded.convert.cwebp_path, PathBuf::from("cwebp"));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("imgbatch.json");
        assert!(Config::default().to_file(&path).is_err());

        std::fs::write(&path, "{}").unwrap();
        assert!(matches!(Config::from_file(&path), Err(ImgBatchError::ConfigError { .. })));
    }

    #[test]
    fn test_zero_threads_rejected() {
        let mut config = Config::default();
        config.download.threads = 0;
        let err = config.download.validate().unwrap_err();
        assert!(matches!(err, ImgBatchError::InvalidConfiguration { .. }));
        assert!(err.to_string().contains("download.threads"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = Config::default();
        config.download.timeout_seconds = Some(0);
        assert!(config.download.validate().is_err());
    }

    #[test]
    fn test_sections_validate_independently() {
        let mut config = Config::default();
        config.download.threads = 0;
        assert!(config.convert.validate().is_ok());

        config.logging.level = "  ".to_string();
        assert!(matches!(config.logging.validate(), Err(ImgBatchError::ConfigError { .. })));
    }
}
