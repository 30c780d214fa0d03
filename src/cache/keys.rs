//! Cache key definitions.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::application::render::ThemeMode;

/// Identifies one rendered pane. Everything that changes the body HTML is
/// part of the key; the wrapper class name is not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentKey {
    pub content_hash: u64,
    pub theme: ThemeMode,
    pub suppress_code_copy_button: bool,
    pub locale: String,
}

impl DocumentKey {
    pub fn new(
        markdown: &str,
        theme: ThemeMode,
        suppress_code_copy_button: bool,
        locale: &str,
    ) -> Self {
        Self {
            content_hash: hash_value(markdown),
            theme,
            suppress_code_copy_button,
            locale: locale.to_string(),
        }
    }
}

/// Identifies one highlighted code body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HighlightKey {
    pub content_hash: u64,
    pub language: String,
    pub theme: ThemeMode,
}

impl HighlightKey {
    pub fn new(code: &str, language: &str, theme: ThemeMode) -> Self {
        Self {
            content_hash: hash_value(code),
            language: language.to_string(),
            theme,
        }
    }
}

/// Compute a hash for any hashable value.
pub fn hash_value<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_key_equality() {
        let key1 = DocumentKey::new("# hi", ThemeMode::Dark, false, "en");
        let key2 = DocumentKey::new("# hi", ThemeMode::Dark, false, "en");
        assert_eq!(key1, key2);
        assert_eq!(hash_value(&key1), hash_value(&key2));
    }

    #[test]
    fn theme_and_flags_split_document_keys() {
        let base = DocumentKey::new("# hi", ThemeMode::Dark, false, "en");
        assert_ne!(base, DocumentKey::new("# hi", ThemeMode::Light, false, "en"));
        assert_ne!(base, DocumentKey::new("# hi", ThemeMode::Dark, true, "en"));
        assert_ne!(base, DocumentKey::new("# hi", ThemeMode::Dark, false, "de"));
        assert_ne!(base, DocumentKey::new("# hey", ThemeMode::Dark, false, "en"));
    }

    #[test]
    fn highlight_key_tracks_language_and_theme() {
        let key = HighlightKey::new("let x = 1;\n", "rust", ThemeMode::Light);
        assert_eq!(key, HighlightKey::new("let x = 1;\n", "rust", ThemeMode::Light));
        assert_ne!(key, HighlightKey::new("let x = 1;\n", "text", ThemeMode::Light));
        assert_ne!(key, HighlightKey::new("let x = 1;\n", "rust", ThemeMode::Dark));
    }
}
