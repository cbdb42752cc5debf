use crate::models::{ConversationEntry, DocumentKind, Message, Role};

/// Assistant message every log starts with, and returns to on clear.
pub const GREETING: &str = "Ask your questions!";

/// Ordered chat for one document kind: rendered messages plus answered
/// question/answer pairs.
#[derive(Debug, Clone)]
pub struct ConversationLog {
    kind: DocumentKind,
    messages: Vec<Message>,
    entries: Vec<ConversationEntry>,
}

impl ConversationLog {
    pub fn new(kind: DocumentKind) -> Self {
        Self {
            kind,
            messages: vec![Message::assistant(GREETING)],
            entries: Vec::new(),
        }
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn push_entry(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.entries.push(ConversationEntry {
            question: question.into(),
            answer: answer.into(),
        });
    }

    /// Drops everything and reseeds the greeting.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.messages.push(Message::assistant(GREETING));
        self.entries.clear();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn is_exportable(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn count_role(&self, role: Role) -> usize {
        self.messages.iter().filter(|m| m.role == role).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_log_is_seeded() {
        let log = ConversationLog::new(DocumentKind::Pdf);
        assert_eq!(log.messages().len(), 1);
        assert_eq!(log.messages()[0].role, Role::Assistant);
        assert_eq!(log.messages()[0].content, GREETING);
        assert!(!log.is_exportable());
    }

    #[test]
    fn test_clear_resets_to_greeting() {
        let mut log = ConversationLog::new(DocumentKind::Word);
        log.push_message(Message::user("q"));
        log.push_message(Message::assistant("a"));
        log.push_entry("q", "a");
        assert!(log.is_exportable());

        log.clear();
        assert_eq!(log.messages().len(), 1);
        assert_eq!(log.messages()[0].content, GREETING);
        assert!(log.entries().is_empty());
    }

    #[test]
    fn test_count_role() {
        let mut log = ConversationLog::new(DocumentKind::Spreadsheet);
        log.push_message(Message::user("q"));
        assert_eq!(log.count_role(Role::User), 1);
        assert_eq!(log.count_role(Role::Assistant), 1);
    }
}
