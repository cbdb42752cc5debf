use std::sync::Arc;

use crate::config::ExtractionConfig;
use crate::error::{DatamateError, Result};
use crate::models::{DocumentKind, ExtractedDocument};
use crate::ocr::TextRecognizer;
use crate::processing::extractors::{DocxExtractor, PdfExtractor, ProgressFn, XlsxExtractor};

/// Detect the document kind from magic bytes: the PDF header or the OOXML
/// part that identifies a Word document or workbook.
pub fn detect_kind_from_bytes(bytes: &[u8]) -> Option<DocumentKind> {
    if bytes.starts_with(b"%PDF") {
        return Some(DocumentKind::Pdf);
    }

    if bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
        if let Ok(mut archive) = zip::ZipArchive::new(std::io::Cursor::new(bytes)) {
            if archive.by_name("[Content_Types].xml").is_ok() {
                if archive.by_name("word/document.xml").is_ok() {
                    return Some(DocumentKind::Word);
                }
                if archive.by_name("xl/workbook.xml").is_ok() {
                    return Some(DocumentKind::Spreadsheet);
                }
            }
        }
    }

    None
}

/// Turns an uploaded file into an [`ExtractedDocument`] for its declared kind.
#[derive(Clone)]
pub struct DocumentExtractor {
    config: ExtractionConfig,
    recognizer: Arc<dyn TextRecognizer>,
}

impl DocumentExtractor {
    pub fn new(config: ExtractionConfig, recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self { config, recognizer }
    }

    /// Checks the upload against `kind` and extracts it.
    ///
    /// Fails with a validation error for empty, oversized or mismatched
    /// files and with [`DatamateError::EmptyExtraction`] when no text at all
    /// could be recovered.
    pub async fn extract(
        &self,
        kind: DocumentKind,
        bytes: &[u8],
        progress: &mut ProgressFn<'_>,
    ) -> Result<ExtractedDocument> {
        self.validate(kind, bytes)?;

        let document = match kind {
            DocumentKind::Spreadsheet => {
                XlsxExtractor::new(self.config.xlsx_max_rows).extract(bytes, progress)?
            }
            DocumentKind::Word => DocxExtractor::extract(bytes, progress)?,
            DocumentKind::Pdf => {
                PdfExtractor::extract(bytes, self.recognizer.as_ref(), progress).await?
            }
        };

        if !document.has_text() {
            tracing::warn!(kind = %kind, "No text could be extracted");
            return Err(DatamateError::EmptyExtraction(empty_label(kind).to_string()));
        }

        tracing::info!(
            kind = %kind,
            segments = document.segments.len(),
            ocr_pages = document.ocr_page_count(),
            "Document extracted"
        );

        Ok(document)
    }

    fn validate(&self, kind: DocumentKind, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Err(DatamateError::Validation("Uploaded file is empty".to_string()));
        }

        if bytes.len() > self.config.max_upload_size {
            return Err(DatamateError::Validation(format!(
                "File is {} bytes, the limit is {} bytes",
                bytes.len(),
                self.config.max_upload_size
            )));
        }

        match detect_kind_from_bytes(bytes) {
            Some(detected) if detected == kind => Ok(()),
            Some(detected) => Err(DatamateError::Validation(format!(
                "Expected a {kind} file but received a {detected} file"
            ))),
            None => Err(DatamateError::Validation(format!(
                "File is not a valid {kind} document"
            ))),
        }
    }
}

fn empty_label(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Spreadsheet => "spreadsheet",
        DocumentKind::Word => "Word document",
        DocumentKind::Pdf => "PDF",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct NoOcr;

    #[async_trait]
    impl TextRecognizer for NoOcr {
        async fn recognize_text(&self, _image: &[u8]) -> Result<String> {
            Err(DatamateError::OcrUnavailable("disabled".to_string()))
        }
    }

    fn extractor(max_upload_size: usize) -> DocumentExtractor {
        DocumentExtractor::new(
            ExtractionConfig {
                max_upload_size,
                ..ExtractionConfig::default()
            },
            Arc::new(NoOcr),
        )
    }

    #[test]
    fn test_detect_pdf() {
        assert_eq!(
            detect_kind_from_bytes(b"%PDF-1.7\n..."),
            Some(DocumentKind::Pdf)
        );
        assert_eq!(detect_kind_from_bytes(b"hello"), None);
    }

    #[tokio::test]
    async fn test_rejects_empty_upload() {
        let err = extractor(1024)
            .extract(DocumentKind::Pdf, &[], &mut |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, DatamateError::Validation(_)));
    }

    #[tokio::test]
    async fn test_rejects_oversized_upload() {
        let err = extractor(4)
            .extract(DocumentKind::Pdf, b"%PDF-1.4", &mut |_| {})
            .await
            .unwrap_err();
        assert!(err.to_string().contains("limit"));
    }

    #[tokio::test]
    async fn test_rejects_kind_mismatch() {
        let err = extractor(1024)
            .extract(DocumentKind::Word, b"%PDF-1.4", &mut |_| {})
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: Expected a word file but received a pdf file"
        );
    }
}
