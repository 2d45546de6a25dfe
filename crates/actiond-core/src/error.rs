use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActiondError {
    #[error("config file not found: {}", .0.display())]
    NotConfigured(PathBuf),

    #[error("action already registered: {0}")]
    DuplicateAction(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ActiondError>;

/// Request-level failures. Each one terminates a request before any action
/// is invoked and maps to a transport-level client error.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Invalid request type. Must be POST.")]
    InvalidMethod,

    #[error("Action is missing.")]
    MissingAction,

    #[error("Action '{0}' could not be found.")]
    ActionNotFound(String),

    #[error("Type/Filter was required but not provided or was invalid.")]
    InvalidTargets { diagnostic: Option<String> },

    #[error("Invalid request body.")]
    InvalidBody { diagnostic: Option<String> },
}

impl RequestError {
    pub fn status_code(&self) -> u16 {
        match self {
            RequestError::ActionNotFound(_) => 404,
            RequestError::InvalidMethod
            | RequestError::MissingAction
            | RequestError::InvalidTargets { .. }
            | RequestError::InvalidBody { .. } => 400,
        }
    }

    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            RequestError::InvalidTargets { diagnostic } | RequestError::InvalidBody { diagnostic } => {
                diagnostic.as_deref()
            }
            _ => None,
        }
    }

    /// JSON error body: `{"error": <code>, "status": <message>}` plus the
    /// diagnostic when one was captured.
    pub fn to_body(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "error": self.status_code(),
            "status": self.to_string(),
        });
        if let Some(diagnostic) = self.diagnostic() {
            body["diagnostic information"] = serde_json::Value::String(diagnostic.to_string());
        }
        body
    }
}
