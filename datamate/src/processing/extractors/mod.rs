use crate::models::ExtractionProgress;

/// Receives one update per sheet or page as extraction advances.
pub type ProgressFn<'a> = dyn FnMut(ExtractionProgress) + Send + 'a;

pub mod docx;
pub mod pdf;
pub mod xlsx;

pub use docx::DocxExtractor;
pub use pdf::PdfExtractor;
pub use xlsx::XlsxExtractor;
