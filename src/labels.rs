use std::path::Path;

use crate::error::{AppError, Result};

/// Training order of the bundled skin disease classifier.
pub const DEFAULT_LABELS: [&str; 4] = ["Acne", "Eczema", "Melanoma", "Normal"];

/// File name looked up next to the model when no labels are configured.
pub const LABELS_FILE_NAME: &str = "labels.txt";

/// Ordered class names; position `i` names output score `i` of the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    names: Vec<String>,
}

impl Default for LabelSet {
    fn default() -> Self {
        Self {
            names: DEFAULT_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl LabelSet {
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(AppError::Config("label set must not be empty".to_string()));
        }
        if let Some(blank) = names.iter().position(|n| n.trim().is_empty()) {
            return Err(AppError::Config(format!("label #{blank} is blank")));
        }
        Ok(Self { names })
    }

    /// Read one label per line, skipping blank lines and `#` comments.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::new(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        )
    }

    /// Pick the label source for a model: explicit list, then a `labels.txt`
    /// sitting beside the model file, then the built-in training order.
    pub fn resolve(configured: Option<&[String]>, model_path: &Path) -> Result<Self> {
        if let Some(names) = configured {
            return Self::new(names.iter().cloned());
        }

        let sidecar = model_path
            .parent()
            .map(|dir| dir.join(LABELS_FILE_NAME))
            .filter(|p| p.is_file());
        match sidecar {
            Some(path) => {
                tracing::info!("Loading labels from {:?}", path);
                Self::from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}
