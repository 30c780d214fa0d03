//! markpane: sanitized markdown panes with themed code blocks, copy and
//! preview actions.

pub mod application;
pub mod cache;
pub mod config;
pub mod infra;
