mod api;
pub mod prompts;
mod provider;

pub use api::LlmApiClient;
pub use provider::{answer_failure_message, LlmBackend, LlmProvider, FILE_TOO_LONG_MESSAGE};
