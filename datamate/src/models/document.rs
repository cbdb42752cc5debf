use serde::{Deserialize, Serialize};

/// Name of the column tagging each spreadsheet row with its sheet.
pub const SHEET_NAME_COLUMN: &str = "__sheet_name__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Spreadsheet,
    Word,
    Pdf,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [Self::Spreadsheet, Self::Word, Self::Pdf];

    /// Human label used inside prompts and messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Spreadsheet => "Excel file",
            Self::Word => "Word document",
            Self::Pdf => "PDF document",
        }
    }

    /// Prefix used for export file names.
    pub fn export_stem(&self) -> &'static str {
        match self {
            Self::Spreadsheet => "excel",
            Self::Word => "word",
            Self::Pdf => "pdf",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spreadsheet => write!(f, "spreadsheet"),
            Self::Word => write!(f, "word"),
            Self::Pdf => write!(f, "pdf"),
        }
    }
}

impl std::str::FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "spreadsheet" | "xlsx" | "excel" => Ok(Self::Spreadsheet),
            "word" | "docx" => Ok(Self::Word),
            "pdf" => Ok(Self::Pdf),
            other => Err(format!(
                "Unknown document kind '{other}' (expected spreadsheet, word or pdf)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SegmentOrigin {
    Sheet { name: String },
    Page { number: usize, ocr: bool },
    Paragraph { index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub origin: SegmentOrigin,
    pub text: String,
}

impl Segment {
    pub fn new(origin: SegmentOrigin, text: impl Into<String>) -> Self {
        Self {
            origin,
            text: text.into(),
        }
    }
}

/// Cleaned tabular content of a spreadsheet: every sheet's rows under one
/// header, tagged by sheet in the trailing [`SHEET_NAME_COLUMN`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Serializes the table (header included) as CSV.
    pub fn to_csv(&self) -> crate::error::Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| crate::error::DatamateError::Internal(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| crate::error::DatamateError::Internal(e.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub kind: DocumentKind,
    pub segments: Vec<Segment>,
    pub table: Option<Table>,
}

impl ExtractedDocument {
    pub fn new(kind: DocumentKind, segments: Vec<Segment>) -> Self {
        Self {
            kind,
            segments,
            table: None,
        }
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.table = Some(table);
        self
    }

    /// All segment texts joined with blank lines.
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .map(|segment| segment.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn has_text(&self) -> bool {
        self.segments.iter().any(|s| !s.text.trim().is_empty())
    }

    pub fn ocr_page_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s.origin, SegmentOrigin::Page { ocr: true, .. }))
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionProgress {
    pub completed: usize,
    pub total: usize,
    pub message: String,
}

impl ExtractionProgress {
    pub fn new(completed: usize, total: usize, message: impl Into<String>) -> Self {
        Self {
            completed,
            total,
            message: message.into(),
        }
    }

    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.completed.min(self.total) * 100) / self.total) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_aliases() {
        assert_eq!("xlsx".parse::<DocumentKind>(), Ok(DocumentKind::Spreadsheet));
        assert_eq!("Excel".parse::<DocumentKind>(), Ok(DocumentKind::Spreadsheet));
        assert_eq!("docx".parse::<DocumentKind>(), Ok(DocumentKind::Word));
        assert_eq!("pdf".parse::<DocumentKind>(), Ok(DocumentKind::Pdf));
        assert!("pptx".parse::<DocumentKind>().is_err());
    }

    #[test]
    fn test_text_joins_segments() {
        let doc = ExtractedDocument::new(
            DocumentKind::Pdf,
            vec![
                Segment::new(SegmentOrigin::Page { number: 1, ocr: false }, "one"),
                Segment::new(SegmentOrigin::Page { number: 2, ocr: true }, "two"),
            ],
        );
        assert_eq!(doc.text(), "one\n\ntwo");
        assert_eq!(doc.ocr_page_count(), 1);
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(ExtractionProgress::new(1, 2, "half").percent(), 50);
        assert_eq!(ExtractionProgress::new(3, 3, "done").percent(), 100);
        assert_eq!(ExtractionProgress::new(0, 0, "nothing").percent(), 100);
    }

    #[test]
    fn test_table_to_csv_quotes_commas() {
        let table = Table {
            columns: vec!["Name".into(), "Note".into()],
            rows: vec![vec!["Acme".into(), "big, loud".into()]],
        };
        assert_eq!(table.to_csv().unwrap(), "Name,Note\nAcme,\"big, loud\"\n");
    }
}
