use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use leptess::LepTess;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::OcrConfig;
use crate::error::{DatamateError, Result};

use super::api::{GoogleVisionClient, VisionChatClient, VisionVendor};
use super::preprocessing::preprocess_image;
use super::TextRecognizer;

#[derive(Clone)]
enum OcrApiClient {
    VisionChat(VisionChatClient),
    GoogleVision(GoogleVisionClient),
}

impl OcrApiClient {
    async fn ocr(&self, image_bytes: &[u8]) -> Result<String> {
        match self {
            OcrApiClient::VisionChat(c) => c.ocr(image_bytes).await,
            OcrApiClient::GoogleVision(c) => c.ocr(image_bytes).await,
        }
    }
}

#[derive(Clone)]
enum OcrBackend {
    Local { tesseract: Arc<Mutex<LepTess>> },
    Api { client: OcrApiClient },
    Unavailable { reason: String },
}

/// Text recognition backed by the engine named in `OCR_MODEL`.
#[derive(Clone)]
pub struct OcrProvider {
    backend: OcrBackend,
    config: OcrConfig,
}

fn create_tesseract(languages: &str) -> std::result::Result<LepTess, String> {
    LepTess::new(None, languages).map_err(|e| e.to_string())
}

fn api_backend(label: &str, client: Result<OcrApiClient>) -> OcrBackend {
    match client {
        Ok(client) => {
            info!("{} OCR API backend initialized", label);
            OcrBackend::Api { client }
        }
        Err(e) => {
            let reason = format!("{label} OCR backend unavailable: {e}");
            warn!("{}", reason);
            OcrBackend::Unavailable { reason }
        }
    }
}

impl OcrProvider {
    pub fn new(config: &OcrConfig) -> Self {
        let model_lower = config.model.to_lowercase();
        let provider_prefix = model_lower.split('/').next().unwrap_or("local");

        let backend = match provider_prefix {
            "openai" => api_backend(
                "OpenAI Vision",
                VisionChatClient::new(VisionVendor::OpenAi, config).map(OcrApiClient::VisionChat),
            ),
            "mistral" => api_backend(
                "Mistral",
                VisionChatClient::new(VisionVendor::Mistral, config).map(OcrApiClient::VisionChat),
            ),
            "google" => api_backend(
                "Google Vision",
                GoogleVisionClient::new(config).map(OcrApiClient::GoogleVision),
            ),
            _ => match create_tesseract(&config.languages) {
                Ok(lt) => {
                    info!(languages = %config.languages, "Tesseract OCR initialized");
                    OcrBackend::Local {
                        tesseract: Arc::new(Mutex::new(lt)),
                    }
                }
                Err(e) => {
                    let reason = format!("Tesseract not available: {e}");
                    warn!("{}", reason);
                    OcrBackend::Unavailable { reason }
                }
            },
        };

        Self {
            backend,
            config: config.clone(),
        }
    }

    pub fn unavailable(reason: &str, config: &OcrConfig) -> Self {
        Self {
            backend: OcrBackend::Unavailable {
                reason: reason.to_string(),
            },
            config: config.clone(),
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, OcrBackend::Unavailable { .. })
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.backend {
            OcrBackend::Unavailable { reason } => Some(reason),
            _ => None,
        }
    }

    pub fn engine_name(&self) -> &str {
        &self.config.model
    }

    pub async fn ocr(&self, image_bytes: &[u8]) -> Result<String> {
        let timeout_duration = Duration::from_secs(self.config.timeout_secs);

        let result = tokio::time::timeout(timeout_duration, self.ocr_internal(image_bytes)).await;

        match result {
            Ok(inner_result) => inner_result,
            Err(_) => Err(DatamateError::Ocr(format!(
                "OCR operation timed out after {} seconds",
                self.config.timeout_secs
            ))),
        }
    }

    async fn ocr_internal(&self, image_bytes: &[u8]) -> Result<String> {
        match &self.backend {
            OcrBackend::Local { tesseract } => {
                let bytes = image_bytes.to_vec();
                let tesseract = Arc::clone(tesseract);

                let text = tokio::task::spawn_blocking(move || {
                    let mut lt = tesseract.blocking_lock();
                    lt.set_image_from_mem(&bytes)
                        .map_err(|e| DatamateError::Ocr(format!("Failed to set image: {e}")))?;
                    lt.get_utf8_text()
                        .map_err(|e| DatamateError::Ocr(format!("Failed to extract text: {e}")))
                })
                .await
                .map_err(|e| DatamateError::Ocr(format!("OCR task panicked: {e}")))??;

                Ok(text.trim().to_string())
            }
            OcrBackend::Api { client } => Ok(client.ocr(image_bytes).await?.trim().to_string()),
            OcrBackend::Unavailable { reason } => {
                Err(DatamateError::OcrUnavailable(reason.clone()))
            }
        }
    }
}

#[async_trait]
impl TextRecognizer for OcrProvider {
    async fn recognize_text(&self, image: &[u8]) -> Result<String> {
        let prepared = match preprocess_image(image, &self.config) {
            Ok(prepared) => prepared,
            Err(e) => {
                debug!(error = %e, "Image preprocessing failed, recognizing raw image");
                image.to_vec()
            }
        };

        self.ocr(&prepared).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config(model: &str, api_key: Option<&str>) -> OcrConfig {
        OcrConfig {
            model: model.to_string(),
            api_key: api_key.map(String::from),
            ..OcrConfig::default()
        }
    }

    #[tokio::test]
    async fn test_unavailable_provider_returns_error() {
        let provider = OcrProvider::unavailable("Test unavailable", &OcrConfig::default());
        let result = provider.recognize_text(&[]).await;
        assert!(matches!(result, Err(DatamateError::OcrUnavailable(_))));
    }

    #[test]
    fn test_openai_without_key_is_unavailable() {
        let provider = OcrProvider::new(&make_config("openai/gpt-4o", None));
        assert!(!provider.is_available());
        assert!(provider.unavailable_reason().unwrap().contains("OpenAI"));
    }

    #[test]
    fn test_mistral_without_key_is_unavailable() {
        let provider = OcrProvider::new(&make_config("mistral/pixtral-12b", None));
        assert!(!provider.is_available());
    }

    #[test]
    fn test_google_with_key_is_available() {
        let provider = OcrProvider::new(&make_config("google/vision", Some("key")));
        assert!(provider.is_available());
        assert_eq!(provider.engine_name(), "google/vision");
    }

    #[test]
    fn test_local_model_does_not_panic_without_tesseract() {
        let provider = OcrProvider::new(&make_config("local/tesseract", None));
        let _ = provider.is_available();
    }
}
