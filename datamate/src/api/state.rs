use std::sync::Arc;

use crate::config::Config;
use crate::llm::LlmProvider;
use crate::ocr::{OcrProvider, TextRecognizer};
use crate::processing::DocumentExtractor;
use crate::services::{ChatService, DocumentService, SessionStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: SessionStore,
    pub ocr: OcrProvider,
    pub chat: ChatService,
    pub documents: DocumentService,
}

impl AppState {
    pub fn new(config: Config, ocr: OcrProvider, llm: LlmProvider) -> Self {
        let recognizer: Arc<dyn TextRecognizer> = Arc::new(ocr.clone());
        Self::with_recognizer(config, ocr, recognizer, llm)
    }

    /// Like [`AppState::new`] but with a caller-supplied text recognizer for
    /// image-only PDF pages. `ocr` is still reported by the health check.
    pub fn with_recognizer(
        config: Config,
        ocr: OcrProvider,
        recognizer: Arc<dyn TextRecognizer>,
        llm: LlmProvider,
    ) -> Self {
        let config = Arc::new(config);
        let sessions = SessionStore::new();
        let extractor = DocumentExtractor::new(config.extraction.clone(), recognizer);
        let chat = ChatService::new(sessions.clone(), llm);
        let documents = DocumentService::new(sessions.clone(), extractor);

        Self {
            config,
            sessions,
            ocr,
            chat,
            documents,
        }
    }
}
