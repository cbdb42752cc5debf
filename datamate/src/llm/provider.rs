use std::sync::Arc;

use crate::config::{parse_llm_provider_model, LlmConfig};
use crate::error::{DatamateError, LlmErrorKind, Result};
use crate::llm::api::{requires_api_key, LlmApiClient};

/// Shown for quota and oversized-input failures instead of the raw error.
pub const FILE_TOO_LONG_MESSAGE: &str = "❌ File too long. The document exceeds the model's processing limit. Please upload a shorter file or split it into smaller parts.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmBackend {
    Groq,
    OpenAI,
    OpenRouter,
    Ollama,
    LmStudio,
    OpenAICompatible { base_url: String },
    Unavailable { reason: String },
}

#[derive(Debug, Clone)]
pub struct LlmProvider {
    backend: LlmBackend,
    config: Option<Arc<LlmConfig>>,
    client: Option<LlmApiClient>,
}

impl LlmProvider {
    pub fn new(config: Option<&LlmConfig>) -> Self {
        let Some(config) = config else {
            return Self::unavailable("No LLM configuration provided");
        };

        let (provider, _model) = parse_llm_provider_model(&config.model);

        let backend = match provider.to_lowercase().as_str() {
            "groq" => LlmBackend::Groq,
            "openai" => LlmBackend::OpenAI,
            "openrouter" => LlmBackend::OpenRouter,
            "ollama" => LlmBackend::Ollama,
            "lmstudio" => LlmBackend::LmStudio,
            _ => {
                if let Some(base_url) = &config.base_url {
                    LlmBackend::OpenAICompatible {
                        base_url: base_url.clone(),
                    }
                } else {
                    return Self::unavailable(&format!(
                        "Unknown provider in model: {}",
                        config.model
                    ));
                }
            }
        };

        if requires_api_key(&config.model) && config.api_key.is_none() {
            tracing::warn!(model = %config.model, "No LLM API key configured; questions are disabled");
            return Self::unavailable("Missing API key: set LLM_API_KEY or GROQ_API_KEY");
        }

        match LlmApiClient::new(config) {
            Ok(client) => Self {
                backend,
                config: Some(Arc::new(config.clone())),
                client: Some(client),
            },
            Err(e) => Self::unavailable(&e.to_string()),
        }
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            backend: LlmBackend::Unavailable {
                reason: reason.to_string(),
            },
            config: None,
            client: None,
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, LlmBackend::Unavailable { .. })
    }

    pub fn backend(&self) -> &LlmBackend {
        &self.backend
    }

    pub fn config(&self) -> Option<&LlmConfig> {
        self.config.as_deref()
    }

    /// Reason the provider cannot answer, if it cannot.
    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.backend {
            LlmBackend::Unavailable { reason } => Some(reason),
            _ => None,
        }
    }

    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let client = self.client.as_ref().ok_or_else(|| {
            DatamateError::LlmUnavailable(
                self.unavailable_reason()
                    .unwrap_or("No client available")
                    .to_string(),
            )
        })?;

        client.complete(prompt).await
    }
}

/// Text shown in the conversation when answering a question fails.
pub fn answer_failure_message(error: &DatamateError) -> String {
    match error {
        DatamateError::Llm { kind, message } => match kind {
            LlmErrorKind::QuotaExceeded | LlmErrorKind::OversizedInput => {
                FILE_TOO_LONG_MESSAGE.to_string()
            }
            LlmErrorKind::Transient | LlmErrorKind::Other => format!("❌ Error: {message}"),
        },
        other => format!("❌ Error: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groq_provider_available_with_key() {
        let config = LlmConfig {
            api_key: Some("gsk_test".to_string()),
            ..LlmConfig::default()
        };
        let provider = LlmProvider::new(Some(&config));
        assert!(provider.is_available());
        assert_eq!(provider.backend(), &LlmBackend::Groq);
    }

    #[test]
    fn test_missing_key_makes_provider_unavailable() {
        let provider = LlmProvider::new(Some(&LlmConfig::default()));
        assert!(!provider.is_available());
        assert!(provider.unavailable_reason().unwrap().contains("API key"));
    }

    #[test]
    fn test_unknown_provider_without_base_url() {
        let config = LlmConfig {
            model: "mystery-model".to_string(),
            api_key: Some("k".to_string()),
            ..LlmConfig::default()
        };
        assert!(!LlmProvider::new(Some(&config)).is_available());
    }

    #[test]
    fn test_custom_base_url_provider() {
        let config = LlmConfig {
            model: "my-model".to_string(),
            api_key: Some("k".to_string()),
            base_url: Some("http://localhost:9000/v1".to_string()),
            ..LlmConfig::default()
        };
        let provider = LlmProvider::new(Some(&config));
        assert_eq!(
            provider.backend(),
            &LlmBackend::OpenAICompatible {
                base_url: "http://localhost:9000/v1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_unavailable_provider_fails_fast() {
        let provider = LlmProvider::unavailable("no key");
        let err = provider.complete("hi").await.unwrap_err();
        assert!(matches!(err, DatamateError::LlmUnavailable(reason) if reason == "no key"));
    }

    #[test]
    fn test_failure_messages() {
        let quota = DatamateError::llm(
            LlmErrorKind::QuotaExceeded,
            "{'error': {'code': 'rate_limit_exceeded'}}",
        );
        assert_eq!(answer_failure_message(&quota), FILE_TOO_LONG_MESSAGE);

        let oversized = DatamateError::llm(LlmErrorKind::OversizedInput, "Request too large");
        assert_eq!(answer_failure_message(&oversized), FILE_TOO_LONG_MESSAGE);

        let other = DatamateError::llm(LlmErrorKind::Other, "model not found");
        assert_eq!(answer_failure_message(&other), "❌ Error: model not found");
    }
}
