//! Prompt templates for answering questions about an uploaded document
//!
//! These templates use basic `format!()` interpolation. The whole extracted
//! text is embedded verbatim; nothing is truncated or chunked.

use crate::error::Result;
use crate::models::{DocumentKind, ExtractedDocument, Table};

/// Build the single prompt sent to the answer service for `question`.
///
/// Spreadsheets with a cleaned table use [`spreadsheet_prompt`]; every other
/// document uses [`document_prompt`] with its joined text.
///
/// # Example
/// ```
/// use datamate::llm::prompts::build_prompt;
/// use datamate::models::{DocumentKind, ExtractedDocument, Segment, SegmentOrigin};
///
/// let doc = ExtractedDocument::new(
///     DocumentKind::Word,
///     vec![Segment::new(SegmentOrigin::Paragraph { index: 0 }, "Quarterly report")],
/// );
/// let prompt = build_prompt(&doc, "What is this?").unwrap();
/// assert!(prompt.contains("Word document content:\nQuarterly report"));
/// ```
pub fn build_prompt(document: &ExtractedDocument, question: &str) -> Result<String> {
    match (document.kind, document.table.as_ref()) {
        (DocumentKind::Spreadsheet, Some(table)) => spreadsheet_prompt(table, question),
        (kind, _) => Ok(document_prompt(kind, &document.text(), question)),
    }
}

/// Prompt for tabular sources: column names plus the cleaned table as CSV.
pub fn spreadsheet_prompt(table: &Table, question: &str) -> Result<String> {
    let columns = format_column_list(&table.columns);
    let sample_data = table.to_csv()?;

    Ok(format!(
        r#"You are a data analyst. A user uploaded an Excel file. Based on the following column names and sample data, answer their question in plain English.

Column names: {columns}

Sample data:
{sample_data}

User's question: {question}

Answer:"#
    ))
}

/// Prompt for prose sources (Word and PDF).
pub fn document_prompt(kind: DocumentKind, content: &str, question: &str) -> String {
    let (label, content_heading) = match kind {
        DocumentKind::Word => ("Word document", "Word document content:"),
        DocumentKind::Pdf => ("PDF document", "PDF content:"),
        DocumentKind::Spreadsheet => ("Excel file", "Excel content:"),
    };

    format!(
        r#"You are a helpful assistant. A user uploaded a {label}. Based on the following extracted content, answer their question in plain English.

{content_heading}
{content}

User's question: {question}

Answer:"#
    )
}

/// Renders column names as a bracketed, quoted list: `['Name', 'Revenue']`.
fn format_column_list(columns: &[String]) -> String {
    let quoted = columns
        .iter()
        .map(|c| format!("'{}'", c.replace('\'', "\\'")))
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{quoted}]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Segment, SegmentOrigin, SHEET_NAME_COLUMN};
    use pretty_assertions::assert_eq;

    fn revenue_table() -> Table {
        Table {
            columns: vec![
                "Name".to_string(),
                "Revenue".to_string(),
                SHEET_NAME_COLUMN.to_string(),
            ],
            rows: vec![
                vec!["Acme".into(), "1200".into(), "Q1".into()],
                vec!["Globex".into(), "900".into(), "Q2".into()],
            ],
        }
    }

    #[test]
    fn test_spreadsheet_prompt_layout() {
        let prompt = spreadsheet_prompt(&revenue_table(), "Top customer?").unwrap();
        let expected = "You are a data analyst. A user uploaded an Excel file. Based on the following column names and sample data, answer their question in plain English.\n\n\
Column names: ['Name', 'Revenue', '__sheet_name__']\n\n\
Sample data:\n\
Name,Revenue,__sheet_name__\nAcme,1200,Q1\nGlobex,900,Q2\n\n\n\
User's question: Top customer?\n\n\
Answer:";
        assert_eq!(prompt, expected);
    }

    #[test]
    fn test_pdf_prompt_layout() {
        let prompt = document_prompt(DocumentKind::Pdf, "page one\n\npage two", "Summary?");
        assert!(prompt.starts_with("You are a helpful assistant. A user uploaded a PDF document."));
        assert!(prompt.contains("PDF content:\npage one\n\npage two\n\nUser's question: Summary?"));
        assert!(prompt.ends_with("Answer:"));
    }

    #[test]
    fn test_build_prompt_uses_table_for_spreadsheets() {
        let doc = ExtractedDocument::new(
            DocumentKind::Spreadsheet,
            vec![Segment::new(
                SegmentOrigin::Sheet {
                    name: "Q1".to_string(),
                },
                "ignored",
            )],
        )
        .with_table(revenue_table());

        let prompt = build_prompt(&doc, "Top customer?").unwrap();
        assert!(prompt.contains("Column names: ['Name', 'Revenue', '__sheet_name__']"));
        assert!(!prompt.contains("ignored"));
    }

    #[test]
    fn test_build_prompt_embeds_full_text() {
        let long_text = "word ".repeat(10_000);
        let doc = ExtractedDocument::new(
            DocumentKind::Word,
            vec![Segment::new(SegmentOrigin::Paragraph { index: 0 }, long_text.clone())],
        );
        let prompt = build_prompt(&doc, "q").unwrap();
        assert!(prompt.contains(&long_text));
    }

    #[test]
    fn test_column_list_escapes_quotes() {
        assert_eq!(
            format_column_list(&["O'Brien".to_string()]),
            "['O\\'Brien']"
        );
    }
}
