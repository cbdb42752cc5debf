use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Classification of a failed answer-service call.
///
/// Derived from the HTTP status and the provider's structured error fields,
/// never from free-form message matching alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmErrorKind {
    /// Rate limit or quota exhausted for the account/model.
    QuotaExceeded,
    /// The prompt is larger than the model accepts.
    OversizedInput,
    /// Network failure, timeout or upstream 5xx.
    Transient,
    Other,
}

impl fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuotaExceeded => write!(f, "quota_exceeded"),
            Self::OversizedInput => write!(f, "oversized_input"),
            Self::Transient => write!(f, "transient"),
            Self::Other => write!(f, "other"),
        }
    }
}

#[derive(Error, Debug)]
pub enum DatamateError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Could not extract any text from the {0}")]
    EmptyExtraction(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("OCR unavailable: {0}")]
    OcrUnavailable(String),

    #[error("LLM error ({kind}): {message}")]
    Llm { kind: LlmErrorKind, message: String },

    #[error("LLM unavailable: {0}")]
    LlmUnavailable(String),
}

impl DatamateError {
    pub fn llm(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self::Llm {
            kind,
            message: message.into(),
        }
    }

    /// Kind of answer-service failure, if this is one.
    pub fn llm_kind(&self) -> Option<LlmErrorKind> {
        match self {
            Self::Llm { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DatamateError>;
