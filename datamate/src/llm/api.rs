use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::{ApiError, OpenAIError},
    types::{
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
    Client,
};

use crate::{
    config::{parse_llm_provider_model, LlmConfig},
    error::{DatamateError, LlmErrorKind, Result},
};

pub(crate) const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
const LMSTUDIO_BASE_URL: &str = "http://localhost:1234/v1";

#[derive(Debug, Clone)]
struct ApiConfig {
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    timeout_secs: Option<u64>,
}

/// Single-turn chat-completion client. Every failure is terminal: no retries.
#[derive(Clone)]
pub struct LlmApiClient {
    client: Client<OpenAIConfig>,
    config: ApiConfig,
}

impl std::fmt::Debug for LlmApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmApiClient")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .finish()
    }
}

impl LlmApiClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_config = ApiConfig::from_llm_config(config);

        if requires_api_key(&config.model) && api_config.api_key.is_none() {
            return Err(DatamateError::LlmUnavailable(
                "API key required for this provider (set LLM_API_KEY or GROQ_API_KEY)".to_string(),
            ));
        }

        let openai_config = OpenAIConfig::new()
            .with_api_base(api_config.base_url.clone())
            .with_api_key(api_config.api_key.clone().unwrap_or_default());

        let mut http_client = reqwest::Client::builder();
        if let Some(timeout_secs) = api_config.timeout_secs {
            http_client = http_client.timeout(Duration::from_secs(timeout_secs));
        }
        let http_client = http_client.build().map_err(|error| {
            DatamateError::Internal(format!("Failed to create LLM HTTP client: {error}"))
        })?;

        // async-openai retries 5xx and 429 responses on its own; a zero budget
        // makes the first failure final.
        let backoff = backoff::ExponentialBackoff {
            max_elapsed_time: Some(Duration::ZERO),
            ..Default::default()
        };

        let client = Client::with_config(openai_config)
            .with_http_client(http_client)
            .with_backoff(backoff);

        Ok(Self {
            client,
            config: api_config,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Sends `prompt` as one user message and returns the trimmed completion.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(DatamateError::Validation("Prompt cannot be empty".to_string()));
        }

        let request = self.build_request(prompt)?;

        match self.client.chat().create(request).await {
            Ok(response) => Self::extract_content(response),
            Err(error) => {
                let mapped = Self::map_openai_error(error);
                tracing::warn!(
                    model = %self.config.model,
                    kind = ?mapped.llm_kind(),
                    error = %mapped,
                    "Answer service call failed"
                );
                Err(mapped)
            }
        }
    }

    fn build_request(&self, prompt: &str) -> Result<CreateChatCompletionRequest> {
        let messages = vec![ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|error| DatamateError::Validation(format!("Invalid user prompt: {error}")))?
            .into()];

        CreateChatCompletionRequestArgs::default()
            .model(self.config.model.clone())
            .messages(messages)
            .temperature(self.config.temperature)
            .build()
            .map_err(|error| {
                DatamateError::Validation(format!("Invalid LLM completion request: {error}"))
            })
    }

    fn extract_content(response: CreateChatCompletionResponse) -> Result<String> {
        let message = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| {
                DatamateError::llm(LlmErrorKind::Other, "LLM response contained no choices")
            })?
            .message
            .content
            .unwrap_or_default();

        Ok(message.trim().to_string())
    }

    pub(crate) fn classify_api_error(api_error: &ApiError) -> LlmErrorKind {
        let message = api_error.message.to_lowercase();
        let error_type = api_error.r#type.clone().unwrap_or_default().to_lowercase();
        let code = api_error.code.clone().unwrap_or_default().to_lowercase();

        // Groq reports oversized prompts as a rate-limit code with this phrasing.
        if message.contains("request too large")
            || code == "context_length_exceeded"
            || error_type == "context_length_exceeded"
        {
            return LlmErrorKind::OversizedInput;
        }

        if code.contains("rate_limit")
            || error_type.contains("rate_limit")
            || code == "insufficient_quota"
            || error_type == "insufficient_quota"
        {
            return LlmErrorKind::QuotaExceeded;
        }

        // async-openai surfaces upstream 5xx as an ApiError with no structured fields.
        if api_error.r#type.is_none() && api_error.code.is_none() {
            return Self::classify_text(&api_error.message).unwrap_or(LlmErrorKind::Transient);
        }

        LlmErrorKind::Other
    }

    /// Fallback for error bodies without structured fields: only the
    /// provider's documented phrasings are recognized.
    pub(crate) fn classify_text(text: &str) -> Option<LlmErrorKind> {
        let text = text.to_lowercase();
        if text.contains("request too large") {
            Some(LlmErrorKind::OversizedInput)
        } else if text.contains("rate_limit_exceeded") {
            Some(LlmErrorKind::QuotaExceeded)
        } else {
            None
        }
    }

    fn classify_status(status: reqwest::StatusCode) -> LlmErrorKind {
        match status {
            reqwest::StatusCode::PAYLOAD_TOO_LARGE => LlmErrorKind::OversizedInput,
            reqwest::StatusCode::TOO_MANY_REQUESTS => LlmErrorKind::QuotaExceeded,
            status if status.is_server_error() => LlmErrorKind::Transient,
            _ => LlmErrorKind::Other,
        }
    }

    fn map_openai_error(error: OpenAIError) -> DatamateError {
        match error {
            OpenAIError::Reqwest(reqwest_error) => {
                let kind = reqwest_error
                    .status()
                    .map(Self::classify_status)
                    .unwrap_or(LlmErrorKind::Transient);
                DatamateError::llm(kind, format!("LLM request failed: {reqwest_error}"))
            }
            OpenAIError::ApiError(api_error) => {
                let kind = Self::classify_api_error(&api_error);
                DatamateError::llm(kind, api_error_detail(&api_error))
            }
            OpenAIError::JSONDeserialize(err) => {
                let detail = format!("Failed to parse LLM response: {err}");
                let kind = Self::classify_text(&detail).unwrap_or(LlmErrorKind::Other);
                DatamateError::llm(kind, detail)
            }
            OpenAIError::InvalidArgument(message) => DatamateError::Validation(message),
            other => DatamateError::llm(LlmErrorKind::Other, other.to_string()),
        }
    }
}

/// Renders an API error with its structured fields, in the shape the
/// provider returned them.
fn api_error_detail(api_error: &ApiError) -> String {
    let mut detail = format!("'message': '{}'", api_error.message);
    if let Some(error_type) = &api_error.r#type {
        detail.push_str(&format!(", 'type': '{error_type}'"));
    }
    if let Some(code) = &api_error.code {
        detail.push_str(&format!(", 'code': '{code}'"));
    }
    format!("{{'error': {{{detail}}}}}")
}

impl ApiConfig {
    fn from_llm_config(config: &LlmConfig) -> Self {
        let (provider, model) = parse_llm_provider_model(&config.model);

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(provider).to_string());

        let normalized_model = if provider.eq_ignore_ascii_case("local") {
            config.model.clone()
        } else {
            model.to_string()
        };

        Self {
            base_url,
            api_key: config.api_key.clone(),
            model: normalized_model,
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
        }
    }
}

pub(crate) fn requires_api_key(model: &str) -> bool {
    let (provider, _) = parse_llm_provider_model(model);
    !matches!(
        provider.to_lowercase().as_str(),
        "ollama" | "local" | "lmstudio"
    )
}

fn default_base_url(provider: &str) -> &'static str {
    match provider.to_lowercase().as_str() {
        "groq" => GROQ_BASE_URL,
        "openai" => OPENAI_BASE_URL,
        "openrouter" => OPENROUTER_BASE_URL,
        "ollama" => OLLAMA_BASE_URL,
        "lmstudio" => LMSTUDIO_BASE_URL,
        _ => OPENAI_BASE_URL,
    }
}
