use serde::{Deserialize, Serialize};

use crate::error::{DatamateError, Result};
use crate::models::{ConversationEntry, DocumentKind};

const RULE_WIDTH: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[serde(alias = "txt")]
    Text,
    Csv,
}

impl ExportFormat {
    /// Spreadsheet chats download as text, Word and PDF chats as CSV.
    pub fn default_for(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::Spreadsheet => Self::Text,
            DocumentKind::Word | DocumentKind::Pdf => Self::Csv,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Csv => "csv",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::Text => "text/plain; charset=utf-8",
            Self::Csv => "text/csv; charset=utf-8",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "txt" | "text" => Ok(Self::Text),
            "csv" => Ok(Self::Csv),
            other => Err(format!("Unknown export format '{other}' (expected txt or csv)")),
        }
    }
}

/// A rendered chat history ready for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime: &'static str,
    pub content: String,
}

pub fn export_entries(
    kind: DocumentKind,
    entries: &[ConversationEntry],
    format: ExportFormat,
) -> Result<ExportArtifact> {
    if entries.is_empty() {
        return Err(DatamateError::Validation(
            "Nothing to export yet: ask a question first".to_string(),
        ));
    }

    let content = match format {
        ExportFormat::Text => render_text(entries),
        ExportFormat::Csv => render_csv(entries)?,
    };

    Ok(ExportArtifact {
        file_name: format!("{}_chat_history.{}", kind.export_stem(), format.extension()),
        mime: format.mime(),
        content,
    })
}

fn render_text(entries: &[ConversationEntry]) -> String {
    let rule = "-".repeat(RULE_WIDTH);
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let n = i + 1;
            format!(
                "🧑‍💬 Question {n}:\n{}\n\n🤖 Answer {n}:\n{}\n\n{rule}\n\n",
                entry.question, entry.answer
            )
        })
        .collect()
}

fn render_csv(entries: &[ConversationEntry]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(["Q", "A"])?;
    for entry in entries {
        writer.write_record([entry.question.as_str(), entry.answer.as_str()])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| DatamateError::Internal(format!("Failed to finish CSV export: {e}")))?;
    String::from_utf8(bytes).map_err(|e| DatamateError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(q: &str, a: &str) -> ConversationEntry {
        ConversationEntry {
            question: q.to_string(),
            answer: a.to_string(),
        }
    }

    #[test]
    fn test_text_export_layout() {
        let artifact = export_entries(
            DocumentKind::Spreadsheet,
            &[entry("Top customer?", "Acme")],
            ExportFormat::Text,
        )
        .unwrap();

        assert_eq!(artifact.file_name, "excel_chat_history.txt");
        assert_eq!(
            artifact.content,
            format!(
                "🧑‍💬 Question 1:\nTop customer?\n\n🤖 Answer 1:\nAcme\n\n{}\n\n",
                "-".repeat(50)
            )
        );
    }

    #[test]
    fn test_csv_export_rows_match_entries() {
        let entries = [entry("a, b?", "yes"), entry("multi\nline", "\"quoted\"")];
        let artifact = export_entries(DocumentKind::Pdf, &entries, ExportFormat::Csv).unwrap();
        assert_eq!(artifact.file_name, "pdf_chat_history.csv");

        let mut reader = csv::Reader::from_reader(artifact.content.as_bytes());
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, vec!["Q", "A"]);
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), entries.len());
        assert_eq!(&rows[1][0], "multi\nline");
        assert_eq!(&rows[1][1], "\"quoted\"");
    }

    #[test]
    fn test_empty_log_is_not_exportable() {
        let err = export_entries(DocumentKind::Word, &[], ExportFormat::Csv).unwrap_err();
        assert!(matches!(err, DatamateError::Validation(_)));
    }

    #[test]
    fn test_format_parsing_and_defaults() {
        assert_eq!("txt".parse::<ExportFormat>(), Ok(ExportFormat::Text));
        assert_eq!("CSV".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
        assert!("xlsx".parse::<ExportFormat>().is_err());
        assert_eq!(
            ExportFormat::default_for(DocumentKind::Word),
            ExportFormat::Csv
        );
    }
}
