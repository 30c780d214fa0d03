//! Application services layer.

pub mod error;
pub mod host;
pub mod i18n;
pub mod markdown;
pub mod render;
