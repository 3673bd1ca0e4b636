use serde::Deserialize;
use std::str::FromStr;
use tracing::Level;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of trace, debug, info, warn, error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

pub fn init_logger(cfg: &LoggingConfig) {
    let level = Level::from_str(&cfg.level).unwrap_or(Level::INFO);

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    if !cfg.level.eq_ignore_ascii_case(level.as_str()) {
        tracing::warn!("Unknown log level {:?}, using {}", cfg.level, level);
    }
}
