use jobboard_core::models::Role;
use jobboard_core::StoreError;
use jobboard_graphql::{DocumentError, TransportError};
use thiserror::Error;

use crate::forms::ValidationErrors;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("session could not be saved: {0}")]
    Session(#[from] StoreError),

    #[error("you need to sign in first")]
    NotAuthenticated,

    #[error("only {0} accounts can do this")]
    RoleRequired(Role),

    #[error("unexpected shape for `{field}`: {source}")]
    Decode {
        field: &'static str,
        source: serde_json::Error,
    },
}

impl From<DocumentError> for ApiError {
    fn from(e: DocumentError) -> Self {
        ApiError::Transport(TransportError::Document(e))
    }
}

impl ApiError {
    /// What to show the user: the server's own message when it rejected the
    /// operation, the local reason for client-side rejections, otherwise
    /// `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Validation(_) | ApiError::NotAuthenticated | ApiError::RoleRequired(_) => {
                self.to_string()
            }
            ApiError::Transport(e) => e
                .server_message()
                .map(str::to_string)
                .unwrap_or_else(|| fallback.to_string()),
            ApiError::Session(_) | ApiError::Decode { .. } => fallback.to_string(),
        }
    }
}
