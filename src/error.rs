//! Error taxonomy shared by every component.
//!
//! Each failure a caller can observe maps to exactly one [`ErrorKind`]. Errors
//! are values: they are rendered into response objects and never terminate
//! the hosting process.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidUrl,
    CloneFailed,
    CloneTimeout,
    ToolNotFound,
    Timeout,
    ExecutionFailed,
    AnalysisParseError,
    UnknownTool,
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("path does not exist: {0}")]
    NotFound(String),

    #[error("invalid repository URL: {0}")]
    InvalidUrl(String),

    #[error("failed to clone repository: {0}")]
    CloneFailed(String),

    #[error("clone timeout ({limit_secs}s limit), repository might be too large{}", detail_suffix(.stderr))]
    CloneTimeout { limit_secs: u64, stderr: String },

    #[error("{tool} not found - install with: {hint}")]
    ToolNotFound { tool: String, hint: String },

    #[error("{tool} timeout ({limit_secs}s limit)")]
    Timeout { tool: String, limit_secs: u64 },

    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    #[error("could not parse analysis output: {0}")]
    AnalysisParseError(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

fn detail_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::InvalidUrl(_) => ErrorKind::InvalidUrl,
            CoreError::CloneFailed(_) => ErrorKind::CloneFailed,
            CoreError::CloneTimeout { .. } => ErrorKind::CloneTimeout,
            CoreError::ToolNotFound { .. } => ErrorKind::ToolNotFound,
            CoreError::Timeout { .. } => ErrorKind::Timeout,
            CoreError::ExecutionFailed(_) => ErrorKind::ExecutionFailed,
            CoreError::AnalysisParseError(_) => ErrorKind::AnalysisParseError,
            CoreError::UnknownTool(_) => ErrorKind::UnknownTool,
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

/// Wire form of a [`CoreError`].
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub kind: ErrorKind,
    pub message: String,
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_serialize_snake_case() {
        let value = serde_json::to_value(ErrorKind::AnalysisParseError).unwrap();
        assert_eq!(value, "analysis_parse_error");
        let value = serde_json::to_value(ErrorKind::InvalidUrl).unwrap();
        assert_eq!(value, "invalid_url");
    }

    #[test]
    fn timeout_message_echoes_limit() {
        let err = CoreError::Timeout {
            tool: "pytest".to_string(),
            limit_secs: 60,
        };
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.to_string().contains("60s"));
    }

    #[test]
    fn clone_timeout_appends_stderr_only_when_present() {
        let bare = CoreError::CloneTimeout {
            limit_secs: 120,
            stderr: "  ".to_string(),
        };
        assert!(bare.to_string().ends_with("too large"));
        let detailed = CoreError::CloneTimeout {
            limit_secs: 120,
            stderr: "Receiving objects".to_string(),
        };
        assert!(detailed.to_string().ends_with(": Receiving objects"));
    }
}
