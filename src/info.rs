//! Descriptive text per class label.
//!
//! Texts live in a static table built once at startup from the built-in
//! entries and an optional TOML file. Each top-level table of that file is a
//! label holding either `text = "..."` or `file = "relative/path.md"`.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::error::Result;
use crate::labels::LabelSet;

const ACNE_INFO: &str = "\
Acne is a common skin condition that occurs when hair follicles become plugged \
with oil and dead skin cells. It causes whiteheads, blackheads or pimples and \
usually appears on the face, forehead, chest, upper back and shoulders.

Common causes include excess oil production, clogged follicles, bacteria and \
inflammation. Hormonal changes, certain medications and diet may make it worse.

Treatment ranges from over-the-counter cleansers containing benzoyl peroxide or \
salicylic acid to prescription retinoids and antibiotics. See a dermatologist \
if acne is severe, painful or leaves scars.";

const ECZEMA_INFO: &str = "\
Eczema (atopic dermatitis) makes the skin red, dry and itchy. It is common in \
children but can occur at any age, and tends to flare periodically.

Triggers include irritating soaps, detergents, stress, sweat, allergens and \
dry weather. It is not contagious.

Management focuses on regular moisturising, avoiding known triggers and, during \
flares, topical corticosteroids or other prescribed anti-inflammatory creams. \
Seek medical care if the skin shows signs of infection.";

const MELANOMA_INFO: &str = "\
Melanoma is the most serious type of skin cancer. It develops in the cells \
(melanocytes) that produce melanin and can spread to other organs if not caught \
early.

Warning signs follow the ABCDE rule: Asymmetry, irregular Border, uneven \
Colour, Diameter larger than 6 mm and Evolving size, shape or colour. A new \
spot or a mole that changes should be examined.

Early detection is critical: melanoma found early is highly treatable, usually \
by surgical removal. Consult a dermatologist promptly about any suspicious lesion.";

const BUILTIN_INFO: [(&str, &str); 3] = [
    ("Acne", ACNE_INFO),
    ("Eczema", ECZEMA_INFO),
    ("Melanoma", MELANOMA_INFO),
];

/// Why no text could be produced for a label
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InfoLookupError {
    #[error("Information module for {0} not found.")]
    NotFound(String),

    #[error("Information function not found in the {0} module.")]
    MalformedProvider(String),

    #[error("An error occurred while loading information for {label}: {reason}")]
    Other { label: String, reason: String },
}

impl InfoLookupError {
    pub const fn code(&self) -> &'static str {
        match self {
            InfoLookupError::NotFound(_) => "INFO_NOT_FOUND",
            InfoLookupError::MalformedProvider(_) => "INFO_MALFORMED",
            InfoLookupError::Other { .. } => "INFO_FAILED",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InfoConfig {
    /// Optional TOML file overriding or extending the built-in texts
    pub table: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum InfoEntry {
    Text(String),
    Malformed,
    Broken(String),
}

/// Label -> descriptive text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoTable {
    entries: HashMap<String, InfoEntry>,
}

impl Default for InfoTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl InfoTable {
    pub fn builtin() -> Self {
        let entries = BUILTIN_INFO
            .iter()
            .map(|(label, text)| (label.to_string(), InfoEntry::Text(text.to_string())))
            .collect();
        Self { entries }
    }

    pub fn insert(&mut self, label: impl Into<String>, text: impl Into<String>) {
        self.entries.insert(label.into(), InfoEntry::Text(text.into()));
    }

    /// Built-in texts overlaid with the configured table, if any.
    ///
    /// Only an unreadable or unparsable table file fails here; problems with a
    /// single entry are kept and reported when that label is looked up.
    pub fn load(cfg: &InfoConfig) -> Result<Self> {
        let mut table = Self::builtin();
        if let Some(path) = &cfg.table {
            table.merge_file(path)?;
            tracing::info!("Loaded info table {:?} ({} labels)", path, table.entries.len());
        }
        Ok(table)
    }

    fn merge_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)?;
        let doc: toml::Table = toml::from_str(&content)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

        for (label, value) in doc {
            let entry = match value.as_table() {
                Some(provider) => resolve_entry(provider, base_dir),
                None => InfoEntry::Malformed,
            };
            if entry == InfoEntry::Malformed {
                tracing::warn!("Info entry {:?} has neither `text` nor `file`", label);
            }
            self.entries.insert(label, entry);
        }
        Ok(())
    }

    pub fn lookup(&self, label: &str) -> Result<&str, InfoLookupError> {
        match self.entries.get(label) {
            Some(InfoEntry::Text(text)) => Ok(text),
            Some(InfoEntry::Malformed) => {
                Err(InfoLookupError::MalformedProvider(label.to_string()))
            }
            Some(InfoEntry::Broken(reason)) => Err(InfoLookupError::Other {
                label: label.to_string(),
                reason: reason.clone(),
            }),
            None => Err(InfoLookupError::NotFound(label.to_string())),
        }
    }

    /// Labels offered on the info page: label-set order first, then any extra
    /// entries from the table, alphabetically.
    pub fn labels(&self, order: &LabelSet) -> Vec<String> {
        let mut known: Vec<String> = order
            .iter()
            .filter(|l| self.entries.contains_key(*l))
            .map(str::to_string)
            .collect();

        let mut extra: Vec<String> = self
            .entries
            .keys()
            .filter(|k| !order.contains(k))
            .cloned()
            .collect();
        extra.sort();

        known.extend(extra);
        known
    }
}

fn resolve_entry(provider: &toml::Table, base_dir: &Path) -> InfoEntry {
    if let Some(text) = provider.get("text").and_then(toml::Value::as_str) {
        return InfoEntry::Text(text.to_string());
    }

    match provider.get("file").and_then(toml::Value::as_str) {
        Some(file) => {
            let path = base_dir.join(file);
            match std::fs::read_to_string(&path) {
                Ok(text) => InfoEntry::Text(text),
                Err(e) => {
                    tracing::warn!("Failed to read info file {:?}: {}", path, e);
                    InfoEntry::Broken(format!("{}: {e}", path.display()))
                }
            }
        }
        None => InfoEntry::Malformed,
    }
}
