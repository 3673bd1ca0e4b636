// -- imports
use serde::Deserialize;
use std::path::Path;

use crate::annotate::AnnotateConfigs;
use crate::error::{AppError, Result};
use crate::info::InfoConfig;
use crate::logging::LoggingConfig;
use crate::model::ModelConfig;

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

// -- config

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// HTTP port
    pub port: u16,

    /// Maximum accepted upload size in MiB
    pub body_limit_mb: usize,

    /// Sessions kept in memory before the least recently used is dropped
    pub max_sessions: usize,

    /// Seconds without a request after which a session is dropped
    pub session_idle_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8501,
            body_limit_mb: 20,
            max_sessions: 1024,
            session_idle_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub annotate: AnnotateConfigs,
    pub info: InfoConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Parse TOML config file with explicit project root for path resolution.
    ///
    /// # Arguments
    ///
    /// * `toml_path` - Path to the TOML config file
    /// * `project_root` - Base directory for resolving relative paths
    ///
    /// # Errors
    ///
    /// Returns `AppError` if:
    /// - The path is not a valid toml file
    /// - File read fails
    /// - TOML parsing fails
    /// - A value is out of range
    pub fn from_toml(toml_path: &Path, project_root: &Path) -> Result<Self> {
        if !toml_path.is_file() || toml_path.extension().is_none_or(|ext| ext != "toml") {
            return Err(AppError::Config(format!(
                "TOML config path is not a valid .toml file: {:?}",
                toml_path
            )));
        }

        let content = std::fs::read_to_string(toml_path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.resolve_paths(project_root);
        config.validate()?;

        Ok(config)
    }

    /// Resolve relative paths against project root
    fn resolve_paths(&mut self, project_root: &Path) {
        if !self.model.path.is_absolute() {
            self.model.path = project_root.join(&self.model.path);
        }

        if let Some(ref mut font) = self.annotate.font {
            if !font.is_absolute() {
                *font = project_root.join(font.as_path());
            }
        }

        if let Some(ref mut table) = self.info.table {
            if !table.is_absolute() {
                *table = project_root.join(table.as_path());
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.model.preprocess.input_size == 0 {
            return Err(AppError::Config("model.input_size must be positive".to_string()));
        }
        if self.server.max_sessions == 0 {
            return Err(AppError::Config("server.max_sessions must be positive".to_string()));
        }
        if self.server.session_idle_secs == 0 {
            return Err(AppError::Config(
                "server.session_idle_secs must be positive".to_string(),
            ));
        }
        if !(1..=100).contains(&self.annotate.jpeg_quality) {
            return Err(AppError::Config(format!(
                "annotate.jpeg_quality must be within 1..=100, got {}",
                self.annotate.jpeg_quality
            )));
        }
        Ok(())
    }
}

// -- public API

/// Parse TOML config file, resolving relative paths against the file's directory.
///
/// # Errors
///
/// Returns `AppError` if TOML parsing or validation fails.
pub fn parse_toml(toml_path: &Path) -> Result<AppConfig> {
    let project_root = toml_path.parent().unwrap_or_else(|| Path::new("."));
    AppConfig::from_toml(toml_path, project_root)
}

// -- tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::ResizeFilter;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_from_toml_with_custom_values() {
        let temp_dir = TempDir::new().unwrap();
        let toml_path = temp_dir.path().join("config.toml");
        let toml_content = r#"
[server]
port = 9000
max_sessions = 16
session_idle_secs = 120

[model]
path = "models/skin.onnx"
labels = ["Acne", "Eczema", "Melanoma", "Normal"]
input_size = 96
resize_filter = "Triangle"

[annotate]
font = "fonts/Sans.ttf"
origin = [4, 8]
text_color = [255, 255, 0]
show_background = false

[info]
table = "info.toml"

[logging]
level = "debug"
"#;
        fs::write(&toml_path, toml_content).unwrap();

        let config = AppConfig::from_toml(&toml_path, temp_dir.path()).unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.max_sessions, 16);
        assert_eq!(config.server.session_idle_secs, 120);
        assert_eq!(config.model.path, temp_dir.path().join("models/skin.onnx"));
        assert_eq!(config.model.labels.as_ref().map(Vec::len), Some(4));
        assert_eq!(config.model.preprocess.input_size, 96);
        assert_eq!(config.model.preprocess.resize_filter, ResizeFilter::Triangle);
        assert_eq!(config.annotate.font, Some(temp_dir.path().join("fonts/Sans.ttf")));
        assert_eq!(config.annotate.origin, [4, 8]);
        assert_eq!(config.annotate.text_color, [255, 255, 0]);
        assert!(!config.annotate.show_background);
        assert_eq!(config.info.table, Some(temp_dir.path().join("info.toml")));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_parse_toml_defaults_for_missing_sections() {
        let temp_dir = TempDir::new().unwrap();
        let toml_path = temp_dir.path().join("config.toml");
        fs::write(&toml_path, "[server]\nport = 1234\n").unwrap();

        let config = parse_toml(&toml_path).unwrap();

        assert_eq!(config.server.port, 1234);
        assert_eq!(config.model.preprocess.input_size, 128);
        assert_eq!(config.model.preprocess.resize_filter, ResizeFilter::CatmullRom);
        assert!(config.model.path.ends_with("models/cnn_skin_disease_model.onnx"));
        assert!(config.model.path.is_absolute() || config.model.path.starts_with(temp_dir.path()));
        assert!(config.info.table.is_none());
    }

    #[test]
    fn test_from_toml_invalid_path() {
        let invalid_path = PathBuf::from("/nonexistent/config.toml");
        let project_root = PathBuf::from("/tmp");
        assert!(AppConfig::from_toml(&invalid_path, &project_root).is_err());
    }

    #[test]
    fn test_from_toml_invalid_extension() {
        let temp_dir = TempDir::new().unwrap();
        let invalid_path = temp_dir.path().join("config.txt");
        fs::write(&invalid_path, "[server]\nport = 1\n").unwrap();
        assert!(AppConfig::from_toml(&invalid_path, temp_dir.path()).is_err());
    }

    #[test]
    fn test_parse_toml_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let invalid_toml_path = temp_dir.path().join("invalid.toml");
        fs::write(&invalid_toml_path, "invalid toml [[[").unwrap();
        assert!(matches!(
            parse_toml(&invalid_toml_path),
            Err(AppError::TomlConfig(_))
        ));
    }

    #[test]
    fn test_unknown_resize_filter_lists_variants() {
        let temp_dir = TempDir::new().unwrap();
        let toml_path = temp_dir.path().join("config.toml");
        fs::write(&toml_path, "[model]\nresize_filter = \"Bicubic\"\n").unwrap();

        let err = parse_toml(&toml_path).unwrap_err().to_string();
        assert!(err.contains("CatmullRom"), "{err}");
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let toml_path = temp_dir.path().join("config.toml");

        fs::write(&toml_path, "[model]\ninput_size = 0\n").unwrap();
        assert!(matches!(parse_toml(&toml_path), Err(AppError::Config(_))));

        fs::write(&toml_path, "[annotate]\njpeg_quality = 0\n").unwrap();
        assert!(matches!(parse_toml(&toml_path), Err(AppError::Config(_))));
    }
}
