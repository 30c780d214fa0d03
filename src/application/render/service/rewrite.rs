use comrak::nodes::{AstNode, NodeHtmlBlock, NodeValue};
use tracing::warn;

use crate::application::render::types::{CodeBlockInfo, RenderContext, RenderOptions};

use super::{
    code::{CodeBlockRenderer, CodeSpan},
    links::{BLANK_URL, sanitize_url},
    math,
};

/// Language tag given to math expressions KaTeX could not render.
const MATH_FALLBACK_LANGUAGE: &str = "latex";

const BLOCK_OPEN: &str = "<div>";
const BLOCK_CLOSE: &str = "</div>";

/// Prefix shared by every placeholder token of one render. It is drawn so
/// that it does not occur in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FragmentMarker(String);

impl FragmentMarker {
    pub(crate) fn draw(source: &str, salt: u64) -> Self {
        let mut salt = salt;
        loop {
            let candidate = format!("mpfrag{salt:016x}");
            if !source.contains(&candidate) {
                return Self(candidate);
            }
            salt = salt.wrapping_add(1);
        }
    }

    pub(crate) fn token(&self, index: usize) -> String {
        format!("{}_{index}_", self.0)
    }

    fn as_str(&self) -> &str {
        &self.0
    }
}

pub(crate) struct RewriteOutcome {
    pub(crate) marker: FragmentMarker,
    pub(crate) contains_code: bool,
    pub(crate) contains_math: bool,
    pub(crate) code_blocks: Vec<CodeBlockInfo>,
    pub(crate) fragments: Vec<Fragment>,
}

/// Pre-rendered HTML that skips sanitisation. The AST carries only the
/// token; `restore` swaps the real markup back in afterwards.
#[derive(Clone)]
pub(crate) struct Fragment {
    pub(crate) html: String,
    pub(crate) is_block: bool,
}

impl RewriteOutcome {
    fn new(marker: FragmentMarker) -> Self {
        Self {
            marker,
            contains_code: false,
            contains_math: false,
            code_blocks: Vec::new(),
            fragments: Vec::new(),
        }
    }

    /// Replace every token with its fragment in a single left-to-right pass,
    /// so fragment output is never scanned again. Block tokens take their
    /// wrapping `<div>` with them.
    ///
    /// Returns `None` unless each fragment's token occurs exactly once and
    /// no other marker occurrence exists, i.e. when document text managed to
    /// reproduce the marker.
    pub(crate) fn restore(&self, html: &str) -> Option<String> {
        let marker = self.marker.as_str();
        let mut seen = vec![false; self.fragments.len()];
        let mut restored = String::with_capacity(html.len());
        let mut rest = html;

        while let Some(found) = rest.find(marker) {
            let tail = rest[found + marker.len()..].strip_prefix('_')?;
            let digits = tail.bytes().take_while(|byte| byte.is_ascii_digit()).count();
            let index: usize = tail[..digits].parse().ok()?;
            tail[digits..].strip_prefix('_')?;

            let fragment = self.fragments.get(index)?;
            if std::mem::replace(&mut seen[index], true) {
                return None;
            }

            let mut start = found;
            let mut end = found + marker.len() + digits + 2;
            if fragment.is_block
                && rest[..start].ends_with(BLOCK_OPEN)
                && rest[end..].starts_with(BLOCK_CLOSE)
            {
                start -= BLOCK_OPEN.len();
                end += BLOCK_CLOSE.len();
            }

            restored.push_str(&rest[..start]);
            restored.push_str(&fragment.html);
            rest = &rest[end..];
        }

        restored.push_str(rest);
        seen.iter().all(|done| *done).then_some(restored)
    }
}

pub(crate) fn rewrite_ast<'a>(
    root: &'a AstNode<'a>,
    marker: FragmentMarker,
    code: &CodeBlockRenderer,
    options: &RenderOptions,
    ctx: &RenderContext<'_>,
) -> RewriteOutcome {
    let mut walker = RewriteWalker {
        code,
        options,
        ctx,
        outcome: RewriteOutcome::new(marker),
    };
    walker.visit_nodes(root);
    walker.outcome
}

struct RewriteWalker<'a, 'c> {
    code: &'a CodeBlockRenderer,
    options: &'a RenderOptions,
    ctx: &'a RenderContext<'c>,
    outcome: RewriteOutcome,
}

impl RewriteWalker<'_, '_> {
    fn visit_nodes(&mut self, node: &AstNode<'_>) {
        sanitize_link_target(node);

        if !self.handle_math_node(node)
            && let Some((span, is_block)) = extract_code_span(node)
        {
            self.replace_with_code(node, &span, is_block);
        }

        let mut child = node.first_child();
        while let Some(next) = child {
            self.visit_nodes(next);
            child = next.next_sibling();
        }
    }

    fn replace_with_code(&mut self, node: &AstNode<'_>, span: &CodeSpan, is_block: bool) {
        let index = self.outcome.code_blocks.len();
        let rendered = self.code.render(span, index, self.options, self.ctx);

        self.outcome.contains_code = true;
        self.outcome.code_blocks.push(rendered.info);
        self.push_fragment(node, rendered.html, is_block);
    }

    /// Record `html` as the next fragment and leave its token in the tree.
    fn push_fragment(&mut self, node: &AstNode<'_>, html: String, is_block: bool) {
        let token = self.outcome.marker.token(self.outcome.fragments.len());
        self.outcome.fragments.push(Fragment { html, is_block });

        let mut data = node.data.borrow_mut();
        data.value = if is_block {
            NodeValue::HtmlBlock(NodeHtmlBlock {
                block_type: 0,
                literal: format!("{BLOCK_OPEN}{token}{BLOCK_CLOSE}"),
            })
        } else {
            NodeValue::HtmlInline(token)
        };
    }

    fn handle_math_node(&mut self, node: &AstNode<'_>) -> bool {
        let math_data = {
            let data = node.data.borrow();
            if let NodeValue::Math(math_node) = &data.value {
                Some((math_node.literal.clone(), math_node.display_math))
            } else {
                None
            }
        };

        let Some((literal, display_mode)) = math_data else {
            return false;
        };

        match math::render_math_html(&literal, display_mode) {
            Ok(html) => {
                let container = if display_mode {
                    format!("<div data-role=\"math-block\">{html}</div>")
                } else {
                    format!("<span data-role=\"math-inline\">{html}</span>")
                };

                self.push_fragment(node, container, display_mode);
                self.outcome.contains_math = true;
            }
            Err(err) => {
                warn!(
                    target = "application::render::math",
                    display_mode,
                    "KaTeX rendering failed: {err}"
                );
                // Display math keeps its block shape by ending in a newline.
                let content = if display_mode {
                    format!("{}\n", literal.trim_end_matches('\n'))
                } else {
                    literal
                };
                let span = CodeSpan::new(
                    content,
                    Some(&format!("language-{MATH_FALLBACK_LANGUAGE}")),
                );
                self.replace_with_code(node, &span, display_mode);
            }
        }

        true
    }
}

/// Rewrites rejected link and image targets to `about:blank`.
fn sanitize_link_target(node: &AstNode<'_>) {
    let mut data = node.data.borrow_mut();
    let link = match &mut data.value {
        NodeValue::Link(link) | NodeValue::Image(link) => link,
        _ => return,
    };
    if sanitize_url(&link.url).is_none() {
        link.url = BLANK_URL.to_string();
    }
}

/// Returns the span and whether it sits at block level.
fn extract_code_span(node: &AstNode<'_>) -> Option<(CodeSpan, bool)> {
    let data = node.data.borrow();
    match &data.value {
        NodeValue::CodeBlock(block) => Some((
            CodeSpan::from_fence_info(block.literal.clone(), block.info.trim()),
            true,
        )),
        NodeValue::Code(code) => Some((CodeSpan::new(code.literal.clone(), None), false)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use comrak::{Arena, format_html, parse_document};
    use syntect::parsing::SyntaxSet;

    use super::*;
    use crate::application::i18n::Catalog;
    use crate::application::render::service::{
        config::default_options,
        highlight::{DEFAULT_DARK_THEME, DEFAULT_LIGHT_THEME, Highlighter},
    };
    use crate::application::render::types::{CodeStyle, ThemeMode};
    use crate::cache::CacheConfig;

    fn code_renderer() -> CodeBlockRenderer {
        let highlighter = Highlighter::new(
            SyntaxSet::load_defaults_newlines(),
            DEFAULT_DARK_THEME,
            DEFAULT_LIGHT_THEME,
        )
        .expect("default themes");
        CodeBlockRenderer::new(highlighter, &CacheConfig::default())
    }

    fn rewrite(markdown: &str) -> (RewriteOutcome, String) {
        let options = default_options();
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &options);
        let catalog = Catalog::default();
        let ctx = RenderContext::new(ThemeMode::Dark, &catalog);
        let outcome = rewrite_ast(
            root,
            FragmentMarker::draw(markdown, 0),
            &code_renderer(),
            &RenderOptions::default(),
            &ctx,
        );

        let mut html = String::new();
        format_html(root, &options, &mut html).expect("html");
        (outcome, html)
    }

    #[test]
    fn rewrite_inline_math_renders_with_katex() {
        let (outcome, html) = rewrite("$a^2$");
        assert!(outcome.contains_math);
        assert_eq!(outcome.fragments.len(), 1);
        assert!(html.contains(&outcome.marker.token(0)));
        assert!(!html.contains("class=\"katex"));

        let restored = outcome.restore(&html).expect("restore");
        assert!(restored.contains("data-role=\"math-inline\""));
        assert!(restored.contains("class=\"katex"));
    }

    #[test]
    fn broken_display_math_falls_back_to_code_block() {
        let (outcome, html) = rewrite("$$\\frac{$$");
        assert!(!outcome.contains_math);
        assert!(outcome.contains_code);
        assert_eq!(outcome.code_blocks[0].language, "latex");
        assert_eq!(outcome.code_blocks[0].style, CodeStyle::Block);
        assert!(
            outcome
                .restore(&html)
                .expect("restore")
                .contains("data-role=\"code-block\"")
        );
    }

    #[test]
    fn code_spans_are_indexed_in_document_order() {
        let (outcome, html) = rewrite("Use `cargo`.\n\n```rust\nfn main() {}\n```\n");
        assert_eq!(outcome.code_blocks.len(), 2);
        assert_eq!(outcome.code_blocks[0].style, CodeStyle::Inline);
        assert_eq!(outcome.code_blocks[1].style, CodeStyle::Block);
        assert_eq!(outcome.code_blocks[1].code, "fn main() {}\n");
        assert!(html.contains(&format!("<div>{}</div>", outcome.marker.token(1))));

        let restored = outcome.restore(&html).expect("restore");
        assert!(!restored.contains(outcome.marker.as_str()));
        assert!(restored.contains("data-code-index=\"0\""));
        assert!(restored.contains(">&lt;RUST&gt;</span>"));
    }

    #[test]
    fn marker_avoids_text_already_in_source() {
        let taken = FragmentMarker::draw("", 7);
        let source = format!("see {} here", taken.as_str());
        let drawn = FragmentMarker::draw(&source, 7);
        assert_ne!(drawn, taken);
        assert!(!source.contains(drawn.as_str()));
    }

    #[test]
    fn restore_rejects_repeated_or_unknown_tokens() {
        let (outcome, html) = rewrite("`a` and `b`");
        let first = outcome.marker.token(0);

        let repeated = format!("<p title=\"{first}\">{html}</p>");
        assert!(outcome.restore(&repeated).is_none());

        let unknown = format!("{html}{}", outcome.marker.token(9));
        assert!(outcome.restore(&unknown).is_none());

        let missing = html.replace(&first, "");
        assert!(outcome.restore(&missing).is_none());
    }

    #[test]
    fn restore_never_rescans_fragment_output() {
        let marker = FragmentMarker::draw("", 1);
        let mut outcome = RewriteOutcome::new(marker.clone());
        outcome.fragments.push(Fragment {
            html: format!("<code>{}</code>", marker.token(1)),
            is_block: false,
        });
        outcome.fragments.push(Fragment {
            html: "<code>second</code>".to_string(),
            is_block: false,
        });

        let html = format!("<p>{} {}</p>", marker.token(0), marker.token(1));
        let restored = outcome.restore(&html).expect("restore");
        assert_eq!(
            restored,
            format!("<p><code>{}</code> <code>second</code></p>", marker.token(1))
        );
    }

    #[test]
    fn unsafe_link_targets_become_blank() {
        let (_, html) = rewrite("[x](javascript:alert(1)) ![y](data:image/png;base64,AA)");
        assert!(!html.contains("javascript:"));
        assert!(!html.contains("data:image"));
        assert_eq!(html.matches(BLANK_URL).count(), 2);
    }

    #[test]
    fn entity_obfuscated_targets_become_blank() {
        let (_, html) = rewrite(
            "[a](javascript&colon;alert(1)) [b](&#x6A;avascript:alert(1)) [c](java&#10;script:alert(1))",
        );
        assert!(!html.to_ascii_lowercase().contains("script:"));
        assert_eq!(html.matches(BLANK_URL).count(), 3);
    }
}
