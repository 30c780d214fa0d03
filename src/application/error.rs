use thiserror::Error;

use crate::{application::i18n::CatalogError, config::LoadError, infra::error::InfraError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("code block {index} does not exist; the document has {available}")]
    UnknownCodeBlock { index: usize, available: usize },
    #[error("action `{action}` is not offered for code block {index}")]
    ActionUnavailable { action: &'static str, index: usize },
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
