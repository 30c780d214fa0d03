pub(crate) mod code;
mod config;
mod highlight;
mod links;
mod math;
mod rewrite;

use std::sync::Arc;

use ammonia::clean_text;
use comrak::{Arena, format_html, nodes::AstNode, options::Options, parse_document};
use once_cell::sync::{Lazy, OnceCell};
use syntect::{dumps::from_uncompressed_data, parsing::SyntaxSet};
use thiserror::Error;
use tracing::{debug, warn};

use crate::application::i18n::MSG_COPY_ALL;
use crate::application::render::types::{
    RenderContext, RenderError, RenderRequest, RenderService, RenderedDocument,
};
use crate::cache::{CacheConfig, hash_value};

use code::CodeBlockRenderer;
use config::{build_sanitizer, default_options};
use highlight::Highlighter;
use links::{LinkOutcome, decorate_links};
use rewrite::{FragmentMarker, RewriteOutcome, rewrite_ast};

pub use highlight::{DEFAULT_DARK_THEME, DEFAULT_LIGHT_THEME, HighlightConfigError};
pub use links::sanitize_url;

/// Fresh markers tried before a render gives up and the caller falls back to
/// plain text.
const MARKER_ATTEMPTS: u64 = 4;
const MARKER_STRIDE: u64 = 0x9e37_79b9_7f4a_7c15;

/// Default Comrak-based rendering pipeline with Syntect highlighting and
/// Ammonia sanitisation.
pub struct ComrakRenderService {
    options: Options<'static>,
    sanitizer: ammonia::Builder<'static>,
    code: CodeBlockRenderer,
}

impl ComrakRenderService {
    /// Build a pipeline from explicit settings. Unknown theme names fall back
    /// to the default palettes with a warning.
    pub fn new(config: &RenderPipelineConfig) -> Self {
        let highlighter = match Highlighter::new(
            load_syntax_set(),
            &config.dark_theme,
            &config.light_theme,
        ) {
            Ok(highlighter) => highlighter,
            Err(err) => {
                warn!(
                    target = "application::render::highlight",
                    dark_theme = %config.dark_theme,
                    light_theme = %config.light_theme,
                    error = %err,
                    "Falling back to default highlight themes"
                );
                Highlighter::with_default_themes(load_syntax_set())
            }
        };

        Self {
            options: default_options(),
            sanitizer: build_sanitizer(),
            code: CodeBlockRenderer::new(highlighter, &config.cache),
        }
    }
}

impl Default for ComrakRenderService {
    fn default() -> Self {
        Self::new(&RenderPipelineConfig::default())
    }
}

static RENDER_SERVICE: Lazy<Arc<ComrakRenderService>> =
    Lazy::new(|| Arc::new(ComrakRenderService::new(&active_render_config())));

/// Access the shared render service instance, initialised on first use.
pub fn render_service() -> Arc<ComrakRenderService> {
    Arc::clone(&RENDER_SERVICE)
}

impl ComrakRenderService {
    /// One pass through every stage. `Ok(None)` means the document text
    /// reproduced the fragment marker and a fresh one must be drawn.
    fn render_with_marker(
        &self,
        request: &RenderRequest,
        ctx: &RenderContext<'_>,
        marker: FragmentMarker,
    ) -> Result<Option<RenderedDocument>, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, &request.markdown, &self.options);

        let rewrite_outcome = rewrite_ast(root, marker, &self.code, &request.options, ctx);
        let rendered_html = render_html_stage(root, &self.options)?;
        let sanitized_html = self.sanitizer.clean(&rendered_html).to_string();
        let Some(restored_html) = restore_stage(&sanitized_html, &rewrite_outcome) else {
            return Ok(None);
        };
        let LinkOutcome { html, links } = decorate_links(&restored_html)?;

        let RewriteOutcome {
            contains_code,
            contains_math,
            code_blocks,
            ..
        } = rewrite_outcome;

        Ok(Some(RenderedDocument {
            source: Arc::clone(&request.markdown),
            html: append_copy_document_button(html, ctx),
            theme: ctx.theme,
            code_blocks,
            links,
            contains_code,
            contains_math,
        }))
    }
}

impl RenderService for ComrakRenderService {
    fn render(
        &self,
        request: &RenderRequest,
        ctx: &RenderContext<'_>,
    ) -> Result<RenderedDocument, RenderError> {
        let seed = hash_value(&*request.markdown);
        for attempt in 0..MARKER_ATTEMPTS {
            let salt = seed.wrapping_add(attempt.wrapping_mul(MARKER_STRIDE));
            let marker = FragmentMarker::draw(&request.markdown, salt);
            if let Some(doc) = self.render_with_marker(request, ctx, marker)? {
                return Ok(doc);
            }
            debug!(
                target = "application::render",
                attempt,
                "Document text reproduced the fragment marker; redrawing"
            );
        }

        Err(RenderError::Document {
            message: "no fragment marker survived the document text".to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct RenderPipelineConfig {
    pub dark_theme: String,
    pub light_theme: String,
    pub cache: CacheConfig,
}

impl Default for RenderPipelineConfig {
    fn default() -> Self {
        Self {
            dark_theme: DEFAULT_DARK_THEME.to_string(),
            light_theme: DEFAULT_LIGHT_THEME.to_string(),
            cache: CacheConfig::default(),
        }
    }
}

impl From<&crate::config::Settings> for RenderPipelineConfig {
    fn from(settings: &crate::config::Settings) -> Self {
        Self {
            dark_theme: settings.render.dark_theme.clone(),
            light_theme: settings.render.light_theme.clone(),
            cache: CacheConfig::from(&settings.cache),
        }
    }
}

#[derive(Debug, Error)]
pub enum RenderConfigError {
    #[error("render service already configured")]
    AlreadyConfigured,
}

static RENDER_PIPELINE_CONFIG: OnceCell<RenderPipelineConfig> = OnceCell::new();

pub fn configure_render_service(config: RenderPipelineConfig) -> Result<(), RenderConfigError> {
    RENDER_PIPELINE_CONFIG
        .set(config)
        .map_err(|_| RenderConfigError::AlreadyConfigured)
}

fn active_render_config() -> RenderPipelineConfig {
    RENDER_PIPELINE_CONFIG.get().cloned().unwrap_or_default()
}

fn load_syntax_set() -> SyntaxSet {
    let syntax_bytes = include_bytes!(env!("SYNTAX_PACK_FILE"));
    from_uncompressed_data(syntax_bytes).unwrap_or_else(|err| {
        warn!(
            target = "application::render::highlight",
            error = %err,
            "Bundled syntax pack unreadable; using syntect defaults"
        );
        SyntaxSet::load_defaults_newlines()
    })
}

fn render_html_stage<'a>(
    root: &'a AstNode<'a>,
    options: &Options<'static>,
) -> Result<String, RenderError> {
    let mut html = String::new();
    format_html(root, options, &mut html).map_err(|err| RenderError::Markdown {
        message: err.to_string(),
    })?;
    Ok(html)
}

fn restore_stage(html: &str, rewrite_outcome: &RewriteOutcome) -> Option<String> {
    rewrite_outcome.restore(html)
}

/// Escaped plain-text body used when a render stage fails.
pub fn render_plain(request: &RenderRequest, ctx: &RenderContext<'_>) -> RenderedDocument {
    let body = format!(
        "<p style=\"white-space:pre-wrap\">{}</p>",
        clean_text(&request.markdown)
    );
    RenderedDocument {
        source: Arc::clone(&request.markdown),
        html: append_copy_document_button(body, ctx),
        theme: ctx.theme,
        code_blocks: Vec::new(),
        links: Vec::new(),
        contains_code: false,
        contains_math: false,
    }
}

fn append_copy_document_button(mut html: String, ctx: &RenderContext<'_>) -> String {
    html.push_str(&format!(
        "<div data-role=\"copy-document\" style=\"display:flex;justify-content:flex-end\">\
<button type=\"button\" data-action=\"copy-document\">{}</button></div>",
        clean_text(&ctx.translator.translate(MSG_COPY_ALL))
    ));
    html
}
