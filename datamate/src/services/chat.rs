use serde::Serialize;

use crate::error::{DatamateError, LlmErrorKind, Result};
use crate::llm::prompts::build_prompt;
use crate::llm::{answer_failure_message, LlmProvider};
use crate::models::{ConversationEntry, DocumentKind, Message};
use crate::services::export::{export_entries, ExportArtifact, ExportFormat};
use crate::services::session::SessionStore;

/// Result of one question. A failed answer is still a completed turn: its
/// user-facing error text has been appended to the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AskOutcome {
    pub answer: String,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<LlmErrorKind>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatHistory {
    pub kind: DocumentKind,
    pub messages: Vec<Message>,
    pub entries: Vec<ConversationEntry>,
    pub has_document: bool,
}

#[derive(Clone)]
pub struct ChatService {
    sessions: SessionStore,
    llm: LlmProvider,
}

impl ChatService {
    pub fn new(sessions: SessionStore, llm: LlmProvider) -> Self {
        Self { sessions, llm }
    }

    pub fn llm(&self) -> &LlmProvider {
        &self.llm
    }

    /// Answers `question` against the session's document of `kind`.
    ///
    /// Blank questions, an unavailable answer service and a missing document
    /// fail before anything is appended. Otherwise the user message is logged
    /// and the turn always completes with an assistant message; only
    /// successful answers add a Q/A entry.
    pub async fn ask(
        &self,
        session_id: &str,
        kind: DocumentKind,
        question: &str,
    ) -> Result<AskOutcome> {
        let question = question.trim();
        if question.is_empty() {
            return Err(DatamateError::Validation(
                "Question cannot be empty".to_string(),
            ));
        }

        if let Some(reason) = self.llm.unavailable_reason() {
            return Err(DatamateError::LlmUnavailable(reason.to_string()));
        }

        let document = self
            .sessions
            .with_session(session_id, |s| s.document(kind))?
            .ok_or_else(|| {
                DatamateError::NotFound(format!(
                    "No {kind} document has been uploaded in this session"
                ))
            })?;

        self.sessions.with_session_mut(session_id, |s| {
            s.log_mut(kind).push_message(Message::user(question))
        })?;

        let result = match build_prompt(&document, question) {
            Ok(prompt) => self.llm.complete(&prompt).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(answer) => {
                self.sessions.with_session_mut(session_id, |s| {
                    let log = s.log_mut(kind);
                    log.push_message(Message::assistant(answer.clone()));
                    log.push_entry(question, answer.clone());
                })?;
                tracing::info!(session_id, kind = %kind, "Question answered");

                Ok(AskOutcome {
                    answer,
                    failed: false,
                    error_kind: None,
                })
            }
            Err(error) => {
                let message = answer_failure_message(&error);
                tracing::warn!(
                    session_id,
                    kind = %kind,
                    error_kind = ?error.llm_kind(),
                    error = %error,
                    "Answering failed"
                );
                self.sessions.with_session_mut(session_id, |s| {
                    s.log_mut(kind)
                        .push_message(Message::assistant(message.clone()))
                })?;

                Ok(AskOutcome {
                    answer: message,
                    failed: true,
                    error_kind: error.llm_kind(),
                })
            }
        }
    }

    pub fn clear(&self, session_id: &str, kind: DocumentKind) -> Result<()> {
        self.sessions
            .with_session_mut(session_id, |s| s.log_mut(kind).clear())?;
        tracing::debug!(session_id, kind = %kind, "Chat history cleared");
        Ok(())
    }

    pub fn history(&self, session_id: &str, kind: DocumentKind) -> Result<ChatHistory> {
        self.sessions.with_session(session_id, |s| {
            let log = s.log(kind);
            ChatHistory {
                kind,
                messages: log.messages().to_vec(),
                entries: log.entries().to_vec(),
                has_document: s.document(kind).is_some(),
            }
        })
    }

    /// Renders the Q/A log; `format` defaults per kind.
    pub fn export(
        &self,
        session_id: &str,
        kind: DocumentKind,
        format: Option<ExportFormat>,
    ) -> Result<ExportArtifact> {
        let entries = self
            .sessions
            .with_session(session_id, |s| s.log(kind).entries().to_vec())?;
        export_entries(
            kind,
            &entries,
            format.unwrap_or_else(|| ExportFormat::default_for(kind)),
        )
    }
}
