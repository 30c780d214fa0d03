//! Message lookup for the handful of user-facing strings the pane emits.
//!
//! Keys are the English messages themselves, so a missing translation falls
//! back to readable text.

use std::{borrow::Cow, collections::HashMap, fs, path::Path};

use serde::Deserialize;
use thiserror::Error;

pub const MSG_DOCUMENT_COPIED: &str = "Markdown content copied to clipboard";
pub const MSG_CODE_COPIED: &str = "copied to clipboard";
pub const MSG_COPY_ALL: &str = "Copy All Markdown";
pub const MSG_COPY: &str = "Copy";
pub const MSG_PREVIEW: &str = "Preview";

pub const DEFAULT_LOCALE: &str = "en";

pub trait Translator: Send + Sync {
    /// Identifier of the active locale; part of render cache keys.
    fn locale(&self) -> &str;

    fn translate<'a>(&'a self, key: &'a str) -> Cow<'a, str>;
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("catalog locale must not be empty")]
    EmptyLocale,
}

/// Key to message map loaded from TOML:
///
/// ```toml
/// locale = "zh-CN"
///
/// [messages]
/// "copied to clipboard" = "已复制到剪贴板"
/// ```
#[derive(Debug, Clone)]
pub struct Catalog {
    locale: String,
    messages: HashMap<String, String>,
}

#[derive(Deserialize)]
struct RawCatalog {
    locale: String,
    #[serde(default)]
    messages: HashMap<String, String>,
}

impl Catalog {
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            messages: HashMap::new(),
        }
    }

    pub fn with_message(mut self, key: impl Into<String>, message: impl Into<String>) -> Self {
        self.messages.insert(key.into(), message.into());
        self
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, CatalogError> {
        let parsed: RawCatalog = toml::from_str(raw)?;
        let locale = parsed.locale.trim();
        if locale.is_empty() {
            return Err(CatalogError::EmptyLocale);
        }

        Ok(Self {
            locale: locale.to_string(),
            messages: parsed.messages,
        })
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(DEFAULT_LOCALE)
    }
}

impl Translator for Catalog {
    fn locale(&self) -> &str {
        &self.locale
    }

    fn translate<'a>(&'a self, key: &'a str) -> Cow<'a, str> {
        match self.messages.get(key) {
            Some(message) => Cow::Borrowed(message.as_str()),
            None => Cow::Borrowed(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_key() {
        let catalog = Catalog::default();
        assert_eq!(catalog.locale(), "en");
        assert_eq!(catalog.translate(MSG_CODE_COPIED), "copied to clipboard");
    }

    #[test]
    fn parses_toml_catalog() {
        let catalog = Catalog::from_toml_str(
            r#"
locale = "de"

[messages]
"copied to clipboard" = "in die Zwischenablage kopiert"
"#,
        )
        .expect("valid catalog");

        assert_eq!(catalog.locale(), "de");
        assert_eq!(
            catalog.translate(MSG_CODE_COPIED),
            "in die Zwischenablage kopiert"
        );
        assert_eq!(catalog.translate(MSG_PREVIEW), "Preview");
    }

    #[test]
    fn rejects_blank_locale() {
        let err = Catalog::from_toml_str("locale = \"  \"").unwrap_err();
        assert!(matches!(err, CatalogError::EmptyLocale));
    }
}
