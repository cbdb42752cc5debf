use super::ProgressFn;
use crate::error::{DatamateError, Result};
use crate::models::{DocumentKind, ExtractedDocument, ExtractionProgress, Segment, SegmentOrigin};

pub struct DocxExtractor;

impl DocxExtractor {
    /// Keeps every non-blank paragraph, table cells included, in document order.
    pub fn extract(bytes: &[u8], progress: &mut ProgressFn<'_>) -> Result<ExtractedDocument> {
        let docx = docx_rs::read_docx(bytes)
            .map_err(|e| DatamateError::Processing(format!("DOCX parse error: {e}")))?;

        let mut paragraphs: Vec<String> = Vec::new();

        for child in &docx.document.children {
            match child {
                docx_rs::DocumentChild::Paragraph(paragraph) => {
                    paragraphs.push(Self::paragraph_text(paragraph));
                }
                docx_rs::DocumentChild::Table(table) => {
                    Self::collect_table(table, &mut paragraphs);
                }
                _ => {}
            }
        }

        let segments: Vec<Segment> = paragraphs
            .into_iter()
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .enumerate()
            .map(|(index, text)| Segment::new(SegmentOrigin::Paragraph { index }, text))
            .collect();

        progress(ExtractionProgress::new(
            1,
            1,
            format!("Extracted {} paragraphs", segments.len()),
        ));

        Ok(ExtractedDocument::new(DocumentKind::Word, segments))
    }

    fn collect_table(table: &docx_rs::Table, out: &mut Vec<String>) {
        for table_child in &table.rows {
            let docx_rs::TableChild::TableRow(row) = table_child;
            for row_child in &row.cells {
                let docx_rs::TableRowChild::TableCell(cell) = row_child;
                for cell_child in &cell.children {
                    match cell_child {
                        docx_rs::TableCellContent::Paragraph(para) => {
                            out.push(Self::paragraph_text(para));
                        }
                        docx_rs::TableCellContent::Table(nested) => {
                            Self::collect_table(nested, out);
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    fn paragraph_text(paragraph: &docx_rs::Paragraph) -> String {
        let mut content = String::new();
        for para_child in &paragraph.children {
            if let docx_rs::ParagraphChild::Run(run) = para_child {
                for run_child in &run.children {
                    match run_child {
                        docx_rs::RunChild::Text(text) => content.push_str(&text.text),
                        docx_rs::RunChild::Tab(_) => content.push('\t'),
                        _ => {}
                    }
                }
            }
        }
        content
    }
}
