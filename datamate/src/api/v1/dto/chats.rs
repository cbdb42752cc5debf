//! Chat request/response DTOs for the v1 API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::LlmErrorKind;
use crate::models::{self, DocumentKind, Role};
use crate::services::{AskOutcome, ChatHistory, ExportFormat};

/// Request body for `POST /v1/sessions/{sessionId}/chats/{kind}`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    #[validate(length(min = 1, max = 4000))]
    pub question: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AskResponse {
    pub answer: String,
    /// `true` when the answer service failed; `answer` then holds the
    /// message shown to the user.
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<LlmErrorKind>,
}

impl From<AskOutcome> for AskResponse {
    fn from(outcome: AskOutcome) -> Self {
        Self {
            answer: outcome.answer,
            failed: outcome.failed,
            error_kind: outcome.error_kind,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<models::Message> for MessageDto {
    fn from(msg: models::Message) -> Self {
        Self {
            role: msg.role,
            content: msg.content,
            created_at: msg.created_at,
        }
    }
}

/// Response for `GET /v1/sessions/{sessionId}/chats/{kind}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatHistoryResponse {
    pub kind: DocumentKind,
    pub has_document: bool,
    pub messages: Vec<MessageDto>,
    pub entry_count: usize,
}

impl From<ChatHistory> for ChatHistoryResponse {
    fn from(history: ChatHistory) -> Self {
        Self {
            kind: history.kind,
            has_document: history.has_document,
            entry_count: history.entries.len(),
            messages: history.messages.into_iter().map(MessageDto::from).collect(),
        }
    }
}

/// Response for `DELETE /v1/sessions/{sessionId}/chats/{kind}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearChatResponse {
    pub kind: DocumentKind,
    pub cleared: bool,
}

/// Query string for the export download. `format` is `txt` or `csv`; when
/// absent the kind's default is used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

impl ExportQuery {
    pub fn parse_format(&self) -> Result<Option<ExportFormat>, String> {
        self.format
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .map(str::parse)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ask_request_rejects_empty_question() {
        let req = AskRequest {
            question: String::new(),
        };
        assert!(req.validate().is_err());

        let req = AskRequest {
            question: "Top customer?".to_string(),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn export_query_format_parsing() {
        let query = ExportQuery {
            format: Some("TXT".to_string()),
        };
        assert_eq!(query.parse_format(), Ok(Some(ExportFormat::Text)));
        assert_eq!(ExportQuery::default().parse_format(), Ok(None));

        let query = ExportQuery {
            format: Some("xlsx".to_string()),
        };
        assert!(query.parse_format().is_err());
    }

    #[test]
    fn ask_response_omits_error_kind_on_success() {
        let json = serde_json::to_value(AskResponse {
            answer: "Acme".to_string(),
            failed: false,
            error_kind: None,
        })
        .unwrap();
        assert_eq!(json["answer"], "Acme");
        assert!(json.get("errorKind").is_none());
    }
}
