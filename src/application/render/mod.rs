//! Markdown rendering pipeline.
//!
//! The pipeline is pure: it accepts markdown plus explicit options and
//! context, produces deterministic HTML with typed metadata, and surfaces
//! structured errors. Clipboard writes and notifications happen in the
//! caller (`application::markdown`) when the user acts on the output.

mod service;
mod types;

pub use service::code::{
    CodeBlockRenderer, CodeSpan, DEFAULT_LANGUAGE, PREVIEWABLE_LANGUAGES, RenderedCode,
    is_previewable, resolve_language,
};
pub use service::{
    ComrakRenderService, DEFAULT_DARK_THEME, DEFAULT_LIGHT_THEME, HighlightConfigError,
    RenderConfigError, RenderPipelineConfig, configure_render_service, render_plain,
    render_service, sanitize_url,
};
pub use types::{
    CodeAction, CodeBlockInfo, CodeStyle, LinkKind, ParseThemeModeError, RenderContext,
    RenderError, RenderOptions, RenderRequest, RenderService, RenderedDocument, RenderedLink,
    ThemeMode,
};
