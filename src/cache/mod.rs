//! Render memoization.
//!
//! Two bounded stores keep recent work around:
//!
//! - **Document layer**: whole rendered panes, keyed by content hash, theme,
//!   copy-button flag and locale
//! - **Highlight layer**: highlighted code bodies, keyed by content hash,
//!   language and theme
//!
//! Hits hand back the same `Arc`, so a re-render with unchanged inputs is
//! referentially identical to the previous one.
//!
//! ```toml
//! [cache]
//! enabled = true
//! document_limit = 64
//! highlight_limit = 256
//! ```

mod config;
mod keys;
pub(crate) mod lock;
mod store;

pub use config::CacheConfig;
pub use keys::{DocumentKey, HighlightKey, hash_value};
pub use store::{CacheLayer, METRIC_CACHE_EVICT, METRIC_CACHE_HIT, METRIC_CACHE_MISS, MemoStore};
