use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use crate::error::{DatamateError, Result};
use crate::models::{DocumentKind, ExtractedDocument};
use crate::services::conversation::ConversationLog;

/// Everything one user has uploaded and asked, per document kind.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    logs: HashMap<DocumentKind, ConversationLog>,
    documents: HashMap<DocumentKind, Arc<ExtractedDocument>>,
}

impl Session {
    pub fn new(id: String) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            logs: DocumentKind::ALL
                .into_iter()
                .map(|kind| (kind, ConversationLog::new(kind)))
                .collect(),
            documents: HashMap::new(),
        }
    }

    pub fn log(&self, kind: DocumentKind) -> &ConversationLog {
        // Every kind is seeded in `new`.
        &self.logs[&kind]
    }

    pub fn log_mut(&mut self, kind: DocumentKind) -> &mut ConversationLog {
        self.logs
            .entry(kind)
            .or_insert_with(|| ConversationLog::new(kind))
    }

    pub fn document(&self, kind: DocumentKind) -> Option<Arc<ExtractedDocument>> {
        self.documents.get(&kind).cloned()
    }

    pub fn set_document(&mut self, document: ExtractedDocument) {
        self.documents.insert(document.kind, Arc::new(document));
    }
}

/// In-memory sessions keyed by id. The lock is only taken inside the
/// synchronous closures below, never across an await.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self) -> Result<String> {
        let id = nanoid::nanoid!();
        let mut sessions = self
            .inner
            .write()
            .map_err(|_| DatamateError::Internal("Session store lock poisoned".to_string()))?;
        sessions.insert(id.clone(), Session::new(id.clone()));
        tracing::debug!(session_id = %id, "Session created");
        Ok(id)
    }

    pub fn remove(&self, id: &str) -> Result<()> {
        let mut sessions = self
            .inner
            .write()
            .map_err(|_| DatamateError::Internal("Session store lock poisoned".to_string()))?;
        sessions
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| session_not_found(id))
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn with_session<R>(&self, id: &str, f: impl FnOnce(&Session) -> R) -> Result<R> {
        let sessions = self
            .inner
            .read()
            .map_err(|_| DatamateError::Internal("Session store lock poisoned".to_string()))?;
        let session = sessions.get(id).ok_or_else(|| session_not_found(id))?;
        Ok(f(session))
    }

    pub fn with_session_mut<R>(&self, id: &str, f: impl FnOnce(&mut Session) -> R) -> Result<R> {
        let mut sessions = self
            .inner
            .write()
            .map_err(|_| DatamateError::Internal("Session store lock poisoned".to_string()))?;
        let session = sessions.get_mut(id).ok_or_else(|| session_not_found(id))?;
        Ok(f(session))
    }
}

fn session_not_found(id: &str) -> DatamateError {
    DatamateError::NotFound(format!("Session '{id}' not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_remove() {
        let store = SessionStore::new();
        let id = store.create().unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.with_session(&id, |s| s.id.clone()).is_ok());

        store.remove(&id).unwrap();
        assert!(store.is_empty());
        assert!(matches!(
            store.remove(&id),
            Err(DatamateError::NotFound(_))
        ));
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        let a = store.create().unwrap();
        let b = store.create().unwrap();

        store
            .with_session_mut(&a, |s| {
                s.log_mut(DocumentKind::Pdf)
                    .push_entry("question", "answer")
            })
            .unwrap();

        let a_entries = store
            .with_session(&a, |s| s.log(DocumentKind::Pdf).entries().len())
            .unwrap();
        let b_entries = store
            .with_session(&b, |s| s.log(DocumentKind::Pdf).entries().len())
            .unwrap();
        assert_eq!((a_entries, b_entries), (1, 0));
    }

    #[test]
    fn test_logs_are_per_kind() {
        let mut session = Session::new("s".to_string());
        session.log_mut(DocumentKind::Word).push_entry("q", "a");
        assert_eq!(session.log(DocumentKind::Word).entries().len(), 1);
        assert!(session.log(DocumentKind::Spreadsheet).entries().is_empty());
    }
}
