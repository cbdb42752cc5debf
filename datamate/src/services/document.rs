use serde::Serialize;

use crate::error::Result;
use crate::models::{DocumentKind, ExtractedDocument, ExtractionProgress};
use crate::processing::{DocumentExtractor, ProgressFn};
use crate::services::session::SessionStore;

/// What an upload produced, for display before the first question.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub kind: DocumentKind,
    pub segments: usize,
    pub ocr_pages: usize,
    pub characters: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
    pub progress: Vec<ExtractionProgress>,
}

impl UploadSummary {
    fn new(document: &ExtractedDocument, progress: Vec<ExtractionProgress>) -> Self {
        Self {
            kind: document.kind,
            segments: document.segments.len(),
            ocr_pages: document.ocr_page_count(),
            characters: document.text().chars().count(),
            columns: document.table.as_ref().map(|t| t.columns.clone()),
            rows: document.table.as_ref().map(|t| t.rows.len()),
            progress,
        }
    }

    /// Sheets or pages in the source file, including ones that yielded no
    /// text. Falls back to the segment count when no progress was reported.
    pub fn source_units(&self) -> usize {
        self.progress
            .last()
            .map(|update| update.total)
            .unwrap_or(self.segments)
    }
}

#[derive(Clone)]
pub struct DocumentService {
    sessions: SessionStore,
    extractor: DocumentExtractor,
}

impl DocumentService {
    pub fn new(sessions: SessionStore, extractor: DocumentExtractor) -> Self {
        Self {
            sessions,
            extractor,
        }
    }

    /// Extracts `bytes` and makes it the session's document of `kind`.
    ///
    /// Every progress update is forwarded to `on_progress` and also returned
    /// in the summary. The conversation log for `kind` is kept.
    pub async fn upload(
        &self,
        session_id: &str,
        kind: DocumentKind,
        bytes: &[u8],
        on_progress: &mut ProgressFn<'_>,
    ) -> Result<UploadSummary> {
        // Fail on unknown sessions before doing any extraction work.
        self.sessions.with_session(session_id, |_| ())?;

        let mut updates = Vec::new();
        let document = self
            .extractor
            .extract(kind, bytes, &mut |update: ExtractionProgress| {
                on_progress(update.clone());
                updates.push(update);
            })
            .await?;

        let summary = UploadSummary::new(&document, updates);
        self.sessions
            .with_session_mut(session_id, |s| s.set_document(document))?;

        tracing::info!(
            session_id,
            kind = %kind,
            segments = summary.segments,
            characters = summary.characters,
            "Document ready for questions"
        );

        Ok(summary)
    }
}
