use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::OcrConfig;
use crate::error::{DatamateError, Result};

const OCR_INSTRUCTION: &str = "Extract all text from this image. Return only the extracted text without any explanations or formatting.";
const MAX_RETRIES: u32 = 3;

/// Vision-capable chat APIs that accept an image as a data URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisionVendor {
    OpenAi,
    Mistral,
}

impl VisionVendor {
    fn name(&self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Mistral => "Mistral",
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Mistral => "https://api.mistral.ai/v1",
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o",
            Self::Mistral => "pixtral-12b-2409",
        }
    }
}

#[derive(Clone, Debug)]
pub struct VisionChatClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Clone, Debug)]
pub struct GoogleVisionClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: String,
}

#[derive(Debug, Serialize)]
struct AnnotateRequest {
    requests: Vec<AnnotateImageRequest>,
}

#[derive(Debug, Serialize)]
struct AnnotateImageRequest {
    image: AnnotateImage,
    features: Vec<AnnotateFeature>,
}

#[derive(Debug, Serialize)]
struct AnnotateImage {
    content: String,
}

#[derive(Debug, Serialize)]
struct AnnotateFeature {
    #[serde(rename = "type")]
    feature_type: String,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    full_text_annotation: Option<FullTextAnnotation>,
    error: Option<AnnotateError>,
}

#[derive(Debug, Deserialize)]
struct FullTextAnnotation {
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnnotateError {
    message: String,
}

fn http_client(config: &OcrConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| DatamateError::Ocr(format!("Failed to create HTTP client: {e}")))
}

/// Sends a request, retrying rate limits and server errors with exponential delay.
async fn send_with_retry(
    build: impl Fn() -> reqwest::RequestBuilder,
) -> Result<reqwest::Response> {
    let mut retries = 0;

    loop {
        match build().send().await {
            Ok(resp) if resp.status().is_success() => return Ok(resp),
            Ok(resp) if resp.status().as_u16() == 429 || resp.status().is_server_error() => {
                retries += 1;
                if retries >= MAX_RETRIES {
                    return Err(DatamateError::Ocr(format!(
                        "API request failed after {} retries: {}",
                        MAX_RETRIES,
                        resp.status()
                    )));
                }
            }
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                return Err(DatamateError::Ocr(format!(
                    "API request failed: {status} - {body}"
                )));
            }
            Err(e) => {
                retries += 1;
                if retries >= MAX_RETRIES {
                    return Err(DatamateError::Ocr(format!(
                        "API request failed after {MAX_RETRIES} retries: {e}"
                    )));
                }
            }
        }

        let delay = Duration::from_millis(100 * (2_u64.pow(retries)));
        tokio::time::sleep(delay).await;
    }
}

impl VisionChatClient {
    pub fn new(vendor: VisionVendor, config: &OcrConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            DatamateError::Ocr(format!("API key required for {} OCR", vendor.name()))
        })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| vendor.default_base_url().to_string());

        let model = config
            .model
            .split_once('/')
            .map(|(_, model)| model.to_string())
            .filter(|model| !model.is_empty())
            .unwrap_or_else(|| vendor.default_model().to_string());

        Ok(Self {
            client: http_client(config)?,
            api_key,
            base_url,
            model,
        })
    }

    pub async fn ocr(&self, image_bytes: &[u8]) -> Result<String> {
        let base64_image = STANDARD.encode(image_bytes);
        let data_url = format!("data:{};base64,{base64_image}", image_mime(image_bytes));

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: OCR_INSTRUCTION.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: data_url },
                    },
                ],
            }],
            max_tokens: 4096,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let resp = send_with_retry(|| {
            self.client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&request)
        })
        .await?;

        let chat_response: ChatResponse = resp
            .json()
            .await
            .map_err(|e| DatamateError::Ocr(format!("Failed to parse response: {e}")))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| DatamateError::Ocr("No response from API".to_string()))
    }
}

impl GoogleVisionClient {
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| DatamateError::Ocr("API key required for Google Vision OCR".to_string()))?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "https://vision.googleapis.com/v1".to_string());

        Ok(Self {
            client: http_client(config)?,
            api_key,
            base_url,
        })
    }

    pub async fn ocr(&self, image_bytes: &[u8]) -> Result<String> {
        let request = AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: AnnotateImage {
                    content: STANDARD.encode(image_bytes),
                },
                features: vec![AnnotateFeature {
                    feature_type: "DOCUMENT_TEXT_DETECTION".to_string(),
                }],
            }],
        };

        let url = format!("{}/images:annotate", self.base_url);
        let resp = send_with_retry(|| {
            self.client
                .post(&url)
                .query(&[("key", self.api_key.as_str())])
                .json(&request)
        })
        .await?;

        let annotate: AnnotateResponse = resp
            .json()
            .await
            .map_err(|e| DatamateError::Ocr(format!("Failed to parse response: {e}")))?;

        let Some(first) = annotate.responses.into_iter().next() else {
            return Ok(String::new());
        };

        if let Some(error) = first.error {
            return Err(DatamateError::Ocr(format!(
                "Google Vision error: {}",
                error.message
            )));
        }

        Ok(first
            .full_text_annotation
            .map(|annotation| annotation.text)
            .unwrap_or_default())
    }
}

fn image_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else {
        "image/png"
    }
}
