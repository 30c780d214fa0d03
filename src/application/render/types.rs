use std::{fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::i18n::Translator;

/// Colour scheme the host is currently displaying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown theme mode `{0}` (expected `light` or `dark`)")]
pub struct ParseThemeModeError(String);

impl FromStr for ThemeMode {
    type Err = ParseThemeModeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(ThemeMode::Light),
            "dark" => Ok(ThemeMode::Dark),
            other => Err(ParseThemeModeError(other.to_string())),
        }
    }
}

/// Caller supplied options for one markdown pane.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Hide the copy (and preview) actions on block code headers.
    #[serde(default)]
    pub suppress_code_copy_button: bool,
    /// Extra class applied to the wrapping element. Presentation only.
    #[serde(default)]
    pub class_name: Option<String>,
}

impl RenderOptions {
    pub fn with_suppressed_code_copy(mut self) -> Self {
        self.suppress_code_copy_button = true;
        self
    }

    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }
}

/// Ambient values threaded explicitly into every render call.
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    pub theme: ThemeMode,
    pub translator: &'a dyn Translator,
}

impl<'a> RenderContext<'a> {
    pub fn new(theme: ThemeMode, translator: &'a dyn Translator) -> Self {
        Self { theme, translator }
    }
}

impl fmt::Debug for RenderContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderContext")
            .field("theme", &self.theme)
            .field("locale", &self.translator.locale())
            .finish()
    }
}

/// Rendering request passed into the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    /// Source markdown exactly as the caller supplied it.
    pub markdown: Arc<str>,
    pub options: RenderOptions,
}

impl RenderRequest {
    pub fn new(markdown: impl Into<Arc<str>>) -> Self {
        Self {
            markdown: markdown.into(),
            options: RenderOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }
}

/// How a code span was presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeStyle {
    Inline,
    Block,
}

/// Header actions offered on a block code span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeAction {
    Copy,
    Preview,
}

impl CodeAction {
    pub fn data_action(self) -> &'static str {
        match self {
            CodeAction::Copy => "copy-code",
            CodeAction::Preview => "preview-code",
        }
    }
}

/// Metadata for each code span, in document order. `index` matches the
/// `data-code-index` attribute in the rendered HTML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlockInfo {
    pub index: usize,
    pub language: String,
    pub code: String,
    pub style: CodeStyle,
    pub actions: Vec<CodeAction>,
}

impl CodeBlockInfo {
    pub fn offers(&self, action: CodeAction) -> bool {
        self.actions.contains(&action)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    External,
    Internal,
    Anchor,
    Other,
    /// Target was rejected by sanitisation and is not navigable.
    Inert,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedLink {
    pub href: Option<String>,
    pub kind: LinkKind,
}

/// Deterministic rendering result returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedDocument {
    /// Original markdown, byte for byte.
    pub source: Arc<str>,
    /// Sanitised body HTML, including the copy-document button.
    pub html: String,
    pub theme: ThemeMode,
    pub code_blocks: Vec<CodeBlockInfo>,
    pub links: Vec<RenderedLink>,
    pub contains_code: bool,
    pub contains_math: bool,
}

impl RenderedDocument {
    /// Wrap the body in the pane container carrying the caller's class.
    pub fn wrap(&self, class_name: Option<&str>) -> String {
        let extra = class_name.map(str::trim).filter(|name| !name.is_empty());
        let class_attr = match extra {
            Some(name) => format!("break-words {}", ammonia::clean_text(name)),
            None => "break-words".to_string(),
        };
        format!(
            "<div class=\"{class_attr}\" data-theme=\"{}\">{}</div>",
            self.theme, self.html
        )
    }

    pub fn code_block(&self, index: usize) -> Option<&CodeBlockInfo> {
        self.code_blocks.get(index)
    }
}

/// Structured errors surfaced by the rendering stages. The pane never shows
/// these to the user; the caller degrades to plain text instead.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("markdown formatting failed: {message}")]
    Markdown { message: String },
    #[error("syntax highlighting failed: {language}: {message}")]
    Highlighting { language: String, message: String },
    #[error("math rendering failed: {message}")]
    Math { message: String },
    #[error("document processing failed: {message}")]
    Document { message: String },
}

/// Trait exposed by the rendering pipeline. Implementations must be pure and
/// deterministic: given the same input, they return identical outputs or errors.
pub trait RenderService: Send + Sync {
    fn render(
        &self,
        request: &RenderRequest,
        ctx: &RenderContext<'_>,
    ) -> Result<RenderedDocument, RenderError>;
}
