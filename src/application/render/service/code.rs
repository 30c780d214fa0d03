//! Inline and block presentation of code spans.

use ammonia::clean_text;
use tracing::warn;

use crate::application::i18n::{MSG_COPY, MSG_PREVIEW};
use crate::application::render::types::{
    CodeAction, CodeBlockInfo, CodeStyle, RenderContext, RenderOptions, ThemeMode,
};
use crate::cache::{CacheConfig, CacheLayer, HighlightKey, MemoStore};

use super::highlight::Highlighter;

/// Languages whose blocks offer a host preview.
pub const PREVIEWABLE_LANGUAGES: [&str; 3] = ["html", "css", "javascript"];
pub const DEFAULT_LANGUAGE: &str = "text";

const LANGUAGE_MARKER: &str = "language-";

/// One code span as it appears in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSpan {
    content: String,
    class_attr: Option<String>,
    language: String,
    multi_line: bool,
}

impl CodeSpan {
    pub fn new(content: impl Into<String>, class_attr: Option<&str>) -> Self {
        let content = content.into();
        let multi_line = content.contains('\n');
        Self {
            language: resolve_language(class_attr),
            class_attr: class_attr.map(str::to_string),
            content,
            multi_line,
        }
    }

    /// Build a span from a fenced block's info string. The first word is the
    /// language tag; the rest is ignored.
    pub fn from_fence_info(content: impl Into<String>, info: &str) -> Self {
        let class_attr = info
            .split_whitespace()
            .next()
            .map(|tag| format!("{LANGUAGE_MARKER}{tag}"));
        Self::new(content, class_attr.as_deref())
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn class_attr(&self) -> Option<&str> {
        self.class_attr.as_deref()
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn is_multi_line(&self) -> bool {
        self.multi_line
    }
}

/// Extract `<tag>` from the first `language-<tag>` marker in a class
/// attribute, where the tag is a run of word characters.
pub fn resolve_language(class_attr: Option<&str>) -> String {
    let Some(classes) = class_attr else {
        return DEFAULT_LANGUAGE.to_string();
    };
    classes
        .match_indices(LANGUAGE_MARKER)
        .find_map(|(start, marker)| {
            let tag: String = classes[start + marker.len()..]
                .chars()
                .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
                .collect();
            (!tag.is_empty()).then(|| tag.to_ascii_lowercase())
        })
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
}

pub fn is_previewable(language: &str) -> bool {
    PREVIEWABLE_LANGUAGES.contains(&language)
}

/// HTML for one code span plus the metadata callers dispatch actions against.
#[derive(Debug, Clone)]
pub struct RenderedCode {
    pub html: String,
    pub info: CodeBlockInfo,
}

struct HighlightedBody {
    code: String,
    html: String,
}

/// Chooses inline or block presentation and memoizes highlighted bodies by
/// (code, language, theme).
pub struct CodeBlockRenderer {
    highlighter: Highlighter,
    cache: MemoStore<HighlightKey, HighlightedBody>,
}

impl CodeBlockRenderer {
    pub(crate) fn new(highlighter: Highlighter, cache: &CacheConfig) -> Self {
        Self {
            highlighter,
            cache: MemoStore::new(
                CacheLayer::Highlight,
                cache.highlight_limit_non_zero(),
                cache.enabled,
            ),
        }
    }

    pub fn render(
        &self,
        span: &CodeSpan,
        index: usize,
        options: &RenderOptions,
        ctx: &RenderContext<'_>,
    ) -> RenderedCode {
        if !span.is_multi_line() {
            return RenderedCode {
                html: inline_html(span.content(), index, ctx.theme),
                info: CodeBlockInfo {
                    index,
                    language: span.language().to_string(),
                    code: span.content().to_string(),
                    style: CodeStyle::Inline,
                    actions: Vec::new(),
                },
            };
        }

        let actions = block_actions(span.language(), options);
        let body = self.highlighted_body(span, ctx.theme);
        let html = block_html(span.language(), index, &actions, &body.html, ctx);

        RenderedCode {
            html,
            info: CodeBlockInfo {
                index,
                language: span.language().to_string(),
                code: span.content().to_string(),
                style: CodeStyle::Block,
                actions,
            },
        }
    }

    /// Number of highlighted bodies currently memoized.
    pub fn cached_bodies(&self) -> usize {
        self.cache.len()
    }

    fn highlighted_body(
        &self,
        span: &CodeSpan,
        theme: ThemeMode,
    ) -> std::sync::Arc<HighlightedBody> {
        let key = HighlightKey::new(span.content(), span.language(), theme);
        self.cache.get_or_insert_with(
            key,
            |cached| cached.code == span.content(),
            || {
                let code = span.content();
                let trimmed = code.strip_suffix('\n').unwrap_or(code);
                let html = self
                    .highlighter
                    .highlight(span.language(), trimmed, theme)
                    .unwrap_or_else(|err| {
                        warn!(
                            target = "application::render::code",
                            language = span.language(),
                            error = %err,
                            "Highlighting failed; rendering plain code"
                        );
                        self.highlighter.plain(trimmed, theme)
                    });
                HighlightedBody {
                    code: code.to_string(),
                    html,
                }
            },
        )
    }
}

fn block_actions(language: &str, options: &RenderOptions) -> Vec<CodeAction> {
    if options.suppress_code_copy_button {
        return Vec::new();
    }
    let mut actions = vec![CodeAction::Copy];
    if is_previewable(language) {
        actions.push(CodeAction::Preview);
    }
    actions
}

fn inline_html(code: &str, index: usize, theme: ThemeMode) -> String {
    let (background, border) = match theme {
        ThemeMode::Dark => ("#333", "#444"),
        ThemeMode::Light => ("#f1f1f1", "#ddd"),
    };
    format!(
        "<code data-role=\"code-inline\" data-code-index=\"{index}\" \
style=\"padding:0.1em 0.3em;border-radius:0.25rem;border:1px solid {border};\
background-color:{background};font-size:0.9em\">{}</code>",
        clean_text(code)
    )
}

fn block_html(
    language: &str,
    index: usize,
    actions: &[CodeAction],
    body: &str,
    ctx: &RenderContext<'_>,
) -> String {
    let (header_background, header_color) = match ctx.theme {
        ThemeMode::Dark => ("#1f2329", "#abb2bf"),
        ThemeMode::Light => ("#e1e4e8", "#24292e"),
    };
    let label = clean_text(&format!("<{}>", language.to_uppercase()));

    let mut buttons = String::new();
    for action in actions {
        let key = match action {
            CodeAction::Copy => MSG_COPY,
            CodeAction::Preview => MSG_PREVIEW,
        };
        buttons.push_str(&format!(
            "<button type=\"button\" data-action=\"{}\" data-code-index=\"{index}\" \
style=\"border:none;background:transparent;color:inherit;cursor:pointer;margin-left:0.5em\">{}</button>",
            action.data_action(),
            clean_text(&ctx.translator.translate(key))
        ));
    }

    format!(
        "<div data-role=\"code-block\" data-code-index=\"{index}\" data-language=\"{}\" \
style=\"margin:0.5em 0;border-radius:0.3rem;overflow:hidden\">\
<div data-role=\"code-header\" style=\"display:flex;justify-content:space-between;\
align-items:center;padding:0.25em 0.75em;font-size:0.75em;background-color:{header_background};\
color:{header_color}\"><span data-role=\"code-language\">{label}</span>\
<span data-role=\"code-actions\">{buttons}</span></div>{body}</div>",
        clean_text(language)
    )
}
