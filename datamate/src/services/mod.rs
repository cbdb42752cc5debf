mod chat;
pub mod conversation;
mod document;
pub mod export;
pub mod session;

pub use chat::{AskOutcome, ChatHistory, ChatService};
pub use conversation::{ConversationLog, GREETING};
pub use document::{DocumentService, UploadSummary};
pub use export::{export_entries, ExportArtifact, ExportFormat};
pub use session::{Session, SessionStore};
