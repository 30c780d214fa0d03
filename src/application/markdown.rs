//! Markdown pane: memoized rendering plus the actions its buttons trigger.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::application::host::HostServices;
use crate::application::i18n::{MSG_CODE_COPIED, MSG_DOCUMENT_COPIED, Translator};
use crate::application::render::{
    CodeAction, RenderContext, RenderOptions, RenderRequest, RenderService, RenderedDocument,
    render_plain,
};
use crate::cache::{CacheConfig, CacheLayer, DocumentKey, MemoStore};

/// A button press coming back from the rendered pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum ViewAction {
    CopyDocument,
    CopyCode { index: usize },
    PreviewCode { index: usize },
}

impl ViewAction {
    /// Map a `data-action` attribute (and `data-code-index`, where relevant)
    /// back to an action.
    pub fn from_data_action(action: &str, index: Option<usize>) -> Option<Self> {
        match (action, index) {
            ("copy-document", _) => Some(ViewAction::CopyDocument),
            ("copy-code", Some(index)) => Some(ViewAction::CopyCode { index }),
            ("preview-code", Some(index)) => Some(ViewAction::PreviewCode { index }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Copied,
    Previewed,
    /// The action was not offered on this document.
    Ignored,
}

/// Renders markdown panes and executes their actions against the host.
pub struct MarkdownRenderer {
    service: Arc<dyn RenderService>,
    documents: MemoStore<DocumentKey, RenderedDocument>,
    host: HostServices,
}

impl MarkdownRenderer {
    pub fn new(service: Arc<dyn RenderService>, cache: &CacheConfig, host: HostServices) -> Self {
        Self {
            service,
            documents: MemoStore::new(
                CacheLayer::Document,
                cache.document_limit_non_zero(),
                cache.enabled,
            ),
            host,
        }
    }

    /// Render `markdown`. Identical inputs return the same `Arc`; the class
    /// name is not part of the key and is only applied by [`Self::render_pane`].
    ///
    /// Never fails: a broken stage degrades the pane to escaped plain text.
    pub fn render(
        &self,
        markdown: &str,
        options: &RenderOptions,
        ctx: &RenderContext<'_>,
    ) -> Arc<RenderedDocument> {
        let key = DocumentKey::new(
            markdown,
            ctx.theme,
            options.suppress_code_copy_button,
            ctx.translator.locale(),
        );

        self.documents.get_or_insert_with(
            key,
            |cached| &*cached.source == markdown,
            || {
                let request = RenderRequest::new(markdown).with_options(options.clone());
                self.service.render(&request, ctx).unwrap_or_else(|err| {
                    warn!(
                        target = "application::markdown",
                        theme = %ctx.theme,
                        error = %err,
                        "Rendering failed; showing plain text"
                    );
                    render_plain(&request, ctx)
                })
            },
        )
    }

    /// Render and wrap in the pane container with the caller's class.
    pub fn render_pane(
        &self,
        markdown: &str,
        options: &RenderOptions,
        ctx: &RenderContext<'_>,
    ) -> String {
        self.render(markdown, options, ctx)
            .wrap(options.class_name.as_deref())
    }

    pub fn dispatch(
        &self,
        doc: &RenderedDocument,
        action: ViewAction,
        translator: &dyn Translator,
    ) -> ActionOutcome {
        match action {
            ViewAction::CopyDocument => {
                self.host.clipboard.write_text(&doc.source);
                self.host
                    .notifier
                    .notify(&translator.translate(MSG_DOCUMENT_COPIED));
                ActionOutcome::Copied
            }
            ViewAction::CopyCode { index } => {
                let Some(block) = offered(doc, index, CodeAction::Copy) else {
                    return ActionOutcome::Ignored;
                };
                self.host.clipboard.write_text(&block.code);
                self.host
                    .notifier
                    .notify(&translator.translate(MSG_CODE_COPIED));
                ActionOutcome::Copied
            }
            ViewAction::PreviewCode { index } => {
                let Some(block) = offered(doc, index, CodeAction::Preview) else {
                    return ActionOutcome::Ignored;
                };
                self.host.preview.preview_code(&block.code, &block.language);
                ActionOutcome::Previewed
            }
        }
    }
}

fn offered(
    doc: &RenderedDocument,
    index: usize,
    action: CodeAction,
) -> Option<&crate::application::render::CodeBlockInfo> {
    let block = doc.code_block(index).filter(|block| block.offers(action));
    if block.is_none() {
        debug!(
            target = "application::markdown",
            index,
            action = action.data_action(),
            "Ignoring action not offered by this document"
        );
    }
    block
}
