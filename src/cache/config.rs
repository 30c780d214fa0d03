//! Cache configuration.
//!
//! Controls the document and highlight memo stores via `markpane.toml`.

use std::num::NonZeroUsize;

use serde::Deserialize;

const DEFAULT_DOCUMENT_LIMIT: usize = 64;
const DEFAULT_HIGHLIGHT_LIMIT: usize = 256;

/// Cache configuration from `markpane.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// When false every render recomputes.
    pub enabled: bool,
    /// Maximum rendered documents kept.
    pub document_limit: usize,
    /// Maximum highlighted code bodies kept.
    pub highlight_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            document_limit: DEFAULT_DOCUMENT_LIMIT,
            highlight_limit: DEFAULT_HIGHLIGHT_LIMIT,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            document_limit: settings.document_limit,
            highlight_limit: settings.highlight_limit,
        }
    }
}

impl CacheConfig {
    /// Returns the document limit as NonZeroUsize, clamping to 1 if zero.
    pub fn document_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.document_limit).unwrap_or(NonZeroUsize::MIN)
    }

    /// Returns the highlight limit as NonZeroUsize, clamping to 1 if zero.
    pub fn highlight_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.highlight_limit).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.document_limit, 64);
        assert_eq!(config.highlight_limit, 256);
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            document_limit: 0,
            highlight_limit: 0,
            ..Default::default()
        };
        assert_eq!(config.document_limit_non_zero().get(), 1);
        assert_eq!(config.highlight_limit_non_zero().get(), 1);
    }
}
