//! OCR (Optical Character Recognition) Module
//!
//! Recovers text from PDF pages that carry no text layer. Every engine sits
//! behind the [`TextRecognizer`] capability; [`OcrProvider`] picks one from
//! `OcrConfig::model`:
//! - `local/tesseract` runs Tesseract through leptess on a blocking thread
//! - `openai/<model>` and `mistral/<model>` call a vision chat API
//! - `google/vision` calls Cloud Vision `images:annotate`
//!
//! A missing engine or credential leaves the provider unavailable rather than
//! failing startup; scanned pages then surface an OCR-unavailable error.

mod api;
mod preprocessing;
mod provider;

use async_trait::async_trait;

use crate::error::Result;

pub use preprocessing::preprocess_image;
pub use provider::OcrProvider;

/// Image bytes in, recognized text out.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize_text(&self, image: &[u8]) -> Result<String>;
}
