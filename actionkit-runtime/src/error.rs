use serde::Serialize;
use thiserror::Error;

use crate::schema::ValidationError;
use crate::wallet::WalletError;

/// Every way an action invocation can fail.
///
/// Errors are tagged so callers can branch on [`ActionError::kind`] instead of
/// matching on message text. The string rendering is produced by
/// [`format_failure`] at the action boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Unsupported network: {provider} does not support {network}")]
    UnsupportedNetwork { provider: String, network: String },

    #[error("Chain read failed: {0}")]
    Read(String),

    #[error("Calldata build failed: {0}")]
    Build(String),

    #[error("Transaction submission failed: {0}")]
    Submission(WalletError),

    #[error("Transaction confirmation failed: {0}")]
    Confirmation(WalletError),

    #[error("Unknown action: {0}")]
    UnknownAction(String),
}

/// Stable tag for an [`ActionError`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    UnsupportedNetwork,
    Read,
    Build,
    Submission,
    Confirmation,
    UnknownAction,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::UnsupportedNetwork => "unsupported_network",
            ErrorKind::Read => "read",
            ErrorKind::Build => "build",
            ErrorKind::Submission => "submission",
            ErrorKind::Confirmation => "confirmation",
            ErrorKind::UnknownAction => "unknown_action",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ActionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ActionError::Validation(_) => ErrorKind::Validation,
            ActionError::UnsupportedNetwork { .. } => ErrorKind::UnsupportedNetwork,
            ActionError::Read(_) => ErrorKind::Read,
            ActionError::Build(_) => ErrorKind::Build,
            ActionError::Submission(_) => ErrorKind::Submission,
            ActionError::Confirmation(_) => ErrorKind::Confirmation,
            ActionError::UnknownAction(_) => ErrorKind::UnknownAction,
        }
    }

    pub fn read(message: impl Into<String>) -> Self {
        ActionError::Read(message.into())
    }

    pub fn build(message: impl Into<String>) -> Self {
        ActionError::Build(message.into())
    }
}

/// Render a failed invocation as the string handed back to the agent.
pub fn format_failure(context: &str, error: &ActionError) -> String {
    format!("{context}: {error}")
}
