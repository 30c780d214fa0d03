//! Capabilities the embedding shell provides to the pane.
//!
//! Every call is fire-and-forget: implementations swallow (and log) their
//! own failures so that a broken clipboard never breaks rendering.

use std::sync::Arc;

use tracing::info;

pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str);
}

pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Live preview of a code snippet, offered for html, css and javascript.
pub trait CodePreview: Send + Sync {
    fn preview_code(&self, code: &str, language: &str);
}

/// Injected when the shell has no preview window.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPreview;

impl CodePreview for NoopPreview {
    fn preview_code(&self, _code: &str, _language: &str) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopClipboard;

impl Clipboard for NoopClipboard {
    fn write_text(&self, _text: &str) {}
}

/// Emits notifications as log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        info!(target = "application::host", message, "notification");
    }
}

#[derive(Clone)]
pub struct HostServices {
    pub clipboard: Arc<dyn Clipboard>,
    pub notifier: Arc<dyn Notifier>,
    pub preview: Arc<dyn CodePreview>,
}

impl HostServices {
    pub fn new(clipboard: Arc<dyn Clipboard>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            clipboard,
            notifier,
            preview: Arc::new(NoopPreview),
        }
    }

    pub fn with_preview(mut self, preview: Arc<dyn CodePreview>) -> Self {
        self.preview = preview;
        self
    }
}

impl Default for HostServices {
    fn default() -> Self {
        Self::new(Arc::new(NoopClipboard), Arc::new(LogNotifier))
    }
}
