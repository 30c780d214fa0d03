use std::{borrow::Cow, cell::RefCell, collections::BTreeSet, rc::Rc};

use lol_html::{RewriteStrSettings, element, rewrite_str};
use percent_encoding::percent_decode_str;
use url::{ParseError, Url};

use crate::application::render::types::{LinkKind, RenderError, RenderedLink};

pub(crate) const BLANK_URL: &str = "about:blank";

const UNSAFE_SCHEMES: [&str; 3] = ["javascript", "data", "vbscript"];

/// Percent-decoding rounds tried before a target is judged; catches
/// `%256A`-style double encoding.
const PERCENT_DECODE_ROUNDS: usize = 3;

/// Returns `None` when the target uses a script-capable scheme.
///
/// Expects entity-decoded input, which is what link destinations in the
/// parsed tree hold. Scheme detection follows the URL standard: ASCII tab
/// and newline are dropped and the scheme is case-insensitive.
pub fn sanitize_url(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut candidate = Cow::Borrowed(trimmed);
    for _ in 0..=PERCENT_DECODE_ROUNDS {
        if has_unsafe_scheme(&candidate) {
            return None;
        }
        let decoded = percent_decode_str(&candidate)
            .decode_utf8_lossy()
            .into_owned();
        if decoded == candidate {
            break;
        }
        candidate = Cow::Owned(decoded);
    }

    Some(trimmed)
}

/// Relative references carry no scheme. Anything else `url` refuses to parse
/// is treated as unsafe.
fn has_unsafe_scheme(value: &str) -> bool {
    match Url::parse(value) {
        Ok(parsed) => UNSAFE_SCHEMES.contains(&parsed.scheme()),
        Err(ParseError::RelativeUrlWithoutBase) => false,
        Err(_) => true,
    }
}

pub(crate) struct LinkOutcome {
    pub(crate) html: String,
    pub(crate) links: Vec<RenderedLink>,
}

/// Forces every anchor to open externally without bubbling its click to
/// ancestors, and neutralises anchors whose target was rejected.
pub(crate) fn decorate_links(html: &str) -> Result<LinkOutcome, RenderError> {
    let links = Rc::new(RefCell::new(Vec::new()));

    let rewritten = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("a", {
                let links = Rc::clone(&links);
                move |el| {
                    let href = el
                        .get_attribute("href")
                        .filter(|href| href.trim() != BLANK_URL);
                    let kind = match href.as_deref() {
                        Some(href) => classify_link(href),
                        None => LinkKind::Inert,
                    };
                    let href = href.filter(|_| kind != LinkKind::Inert);

                    if kind == LinkKind::Inert {
                        el.remove_attribute("href");
                        el.set_attribute("aria-disabled", "true")?;
                    } else {
                        let rel_value =
                            merge_rel(el.get_attribute("rel"), &["noopener", "noreferrer"]);
                        el.set_attribute("rel", &rel_value)?;
                    }
                    el.set_attribute("target", "_blank")?;
                    el.set_attribute("data-stop-propagation", "true")?;
                    el.set_attribute("data-link-kind", link_kind_attr(kind))?;

                    links.borrow_mut().push(RenderedLink { href, kind });
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::Document {
        message: err.to_string(),
    })?;

    let links = Rc::try_unwrap(links)
        .map(RefCell::into_inner)
        .unwrap_or_else(|rc| rc.borrow().clone());

    Ok(LinkOutcome {
        html: rewritten,
        links,
    })
}

fn link_kind_attr(kind: LinkKind) -> &'static str {
    match kind {
        LinkKind::External => "external",
        LinkKind::Internal => "internal",
        LinkKind::Anchor => "anchor",
        LinkKind::Other => "other",
        LinkKind::Inert => "inert",
    }
}

fn classify_link(href: &str) -> LinkKind {
    if sanitize_url(href).is_none() {
        return LinkKind::Inert;
    }

    if href.starts_with('#') {
        return LinkKind::Anchor;
    }

    if is_external_url(href) {
        return LinkKind::External;
    }

    if is_internal_path(href) {
        return LinkKind::Internal;
    }

    LinkKind::Other
}

fn is_internal_path(href: &str) -> bool {
    href.starts_with('/')
        || href.starts_with("./")
        || href.starts_with("../")
        || (!href.contains(':') && !href.starts_with("//"))
}

fn is_external_url(value: &str) -> bool {
    Url::parse(value)
        .map(|parsed| matches!(parsed.scheme(), "http" | "https"))
        .unwrap_or(false)
        || value.starts_with("//")
}

fn merge_rel(existing: Option<String>, required: &[&str]) -> String {
    let mut tokens: BTreeSet<String> = existing
        .unwrap_or_default()
        .split_whitespace()
        .map(|token| token.to_string())
        .collect();
    for &token in required {
        tokens.insert(token.to_string());
    }
    tokens.into_iter().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_script_schemes() {
        for url in [
            "javascript:alert(1)",
            "JaVaScRiPt:alert(1)",
            "  javascript:alert(1)",
            "java\tscript:alert(1)",
            "java\nscript:alert(1)",
            "javascript%3Aalert(1)",
            "%6Aavascript:alert(1)",
            "%256Aavascript:alert(1)",
            "data:text/html;base64,PHNjcmlwdD4=",
            "vbscript:msgbox(1)",
            "",
        ] {
            assert_eq!(sanitize_url(url), None, "{url:?} should be rejected");
        }
    }

    #[test]
    fn keeps_safe_targets() {
        for url in [
            "https://example.com/a?b=c",
            "mailto:someone@example.com",
            "/relative/path",
            "./sibling.md",
            "#section",
            "docs/javascript-guide.html",
        ] {
            assert_eq!(sanitize_url(url), Some(url));
        }
    }

    #[test]
    fn decorates_external_links() {
        let outcome =
            decorate_links("<p><a href=\"https://example.com\" rel=\"nofollow\">x</a></p>")
                .expect("rewrite");
        assert!(outcome.html.contains("target=\"_blank\""));
        assert!(outcome.html.contains("rel=\"nofollow noopener noreferrer\""));
        assert!(outcome.html.contains("data-stop-propagation=\"true\""));
        assert_eq!(
            outcome.links,
            vec![RenderedLink {
                href: Some("https://example.com".into()),
                kind: LinkKind::External,
            }]
        );
    }

    #[test]
    fn blank_targets_become_inert() {
        let outcome = decorate_links("<a href=\"about:blank\">x</a><a>y</a>").expect("rewrite");
        assert!(!outcome.html.contains("href="));
        assert!(outcome.html.contains("aria-disabled=\"true\""));
        assert_eq!(outcome.links.len(), 2);
        assert!(outcome.links.iter().all(|link| link.kind == LinkKind::Inert));
    }
}
