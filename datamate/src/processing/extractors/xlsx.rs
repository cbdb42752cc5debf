use super::ProgressFn;
use crate::error::{DatamateError, Result};
use crate::models::{
    DocumentKind, ExtractedDocument, ExtractionProgress, Segment, SegmentOrigin, Table,
    SHEET_NAME_COLUMN,
};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::collections::{HashMap, HashSet};
use std::io::Cursor;

/// One worksheet after cleaning: trimmed header plus non-blank rows.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SheetTable {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

pub struct XlsxExtractor {
    max_rows: usize,
}

impl Default for XlsxExtractor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ROWS)
    }
}

impl XlsxExtractor {
    pub const DEFAULT_MAX_ROWS: usize = 100_000;

    pub fn new(max_rows: usize) -> Self {
        Self { max_rows }
    }

    /// Loads every sheet, reporting one progress update per sheet.
    pub fn extract(&self, bytes: &[u8], progress: &mut ProgressFn<'_>) -> Result<ExtractedDocument> {
        let cursor = Cursor::new(bytes);
        let mut workbook = open_workbook_auto_from_rs(cursor)
            .map_err(|e| DatamateError::Processing(format!("XLSX parse error: {e}")))?;

        let worksheets = workbook.worksheets();
        let total = worksheets.len();
        let mut sheets = Vec::with_capacity(total);

        for (index, (name, range)) in worksheets.into_iter().enumerate() {
            let sheet = self.clean_sheet(name, range.rows());
            tracing::debug!(
                sheet = %sheet.name,
                columns = sheet.columns.len(),
                rows = sheet.rows.len(),
                "Loaded sheet"
            );
            sheets.push(sheet);

            progress(ExtractionProgress::new(
                index + 1,
                total,
                format!("Loaded sheet {} of {}", index + 1, total),
            ));
        }

        let segments = sheets
            .iter()
            .filter_map(|sheet| {
                let text = sheet_text(sheet)?;
                Some(Segment::new(
                    SegmentOrigin::Sheet {
                        name: sheet.name.clone(),
                    },
                    text,
                ))
            })
            .collect();

        Ok(ExtractedDocument::new(DocumentKind::Spreadsheet, segments).with_table(combine(&sheets)))
    }

    fn clean_sheet<'a>(&self, name: String, rows: impl Iterator<Item = &'a [Data]>) -> SheetTable {
        let mut non_blank = rows
            .map(|row| {
                row.iter()
                    .map(|cell| Self::format_cell_value(Some(cell)).trim().to_string())
                    .collect::<Vec<_>>()
            })
            .filter(|row| row.iter().any(|cell| !cell.is_empty()));

        let Some(header) = non_blank.next() else {
            return SheetTable {
                name,
                columns: Vec::new(),
                rows: Vec::new(),
            };
        };

        let columns = header_names(header);
        let width = columns.len();

        let mut rows = Vec::new();
        let mut dropped = 0usize;
        for mut row in non_blank {
            if rows.len() >= self.max_rows {
                dropped += 1;
                continue;
            }
            row.resize(width, String::new());
            rows.push(row);
        }

        if dropped > 0 {
            tracing::warn!(
                sheet = %name,
                kept = self.max_rows,
                dropped,
                "Sheet exceeds row limit, extra rows dropped"
            );
        }

        SheetTable {
            name,
            columns,
            rows,
        }
    }

    fn format_cell_value(cell: Option<&Data>) -> String {
        match cell {
            Some(Data::String(s)) => s.clone(),
            Some(Data::Int(i)) => i.to_string(),
            Some(Data::Float(f)) => {
                // Format float nicely - remove trailing zeros
                let s = format!("{f}");
                if s.contains('.') {
                    s.trim_end_matches('0').trim_end_matches('.').to_string()
                } else {
                    s
                }
            }
            Some(Data::Bool(b)) => b.to_string(),
            Some(Data::DateTime(dt)) => dt.to_string(),
            Some(Data::DateTimeIso(dt)) => dt.to_string(),
            Some(Data::DurationIso(d)) => d.to_string(),
            Some(Data::Error(e)) => format!("#{e:?}"),
            Some(Data::Empty) | None => String::new(),
            #[allow(unreachable_patterns)]
            _ => String::new(),
        }
    }
}

/// Blank headers become `Unnamed: <index>`; repeated names get `.1`, `.2` suffixes.
/// A suffix already taken by another header is skipped.
fn header_names(header: Vec<String>) -> Vec<String> {
    let mut suffixes: HashMap<String, usize> = HashMap::new();
    let mut used: HashSet<String> = HashSet::new();
    header
        .into_iter()
        .enumerate()
        .map(|(index, name)| {
            let base = if name.is_empty() {
                format!("Unnamed: {index}")
            } else {
                name
            };
            let mut unique = base.clone();
            if used.contains(&unique) {
                let suffix = suffixes.entry(base.clone()).or_insert(0);
                while used.contains(&unique) {
                    *suffix += 1;
                    unique = format!("{base}.{suffix}");
                }
            }
            used.insert(unique.clone());
            unique
        })
        .collect()
}

fn sheet_text(sheet: &SheetTable) -> Option<String> {
    if sheet.columns.is_empty() {
        return None;
    }
    let table = Table {
        columns: sheet.columns.clone(),
        rows: sheet.rows.clone(),
    };
    table.to_csv().ok()
}

/// Stacks every sheet under the union of their columns, tagging rows by sheet.
fn combine(sheets: &[SheetTable]) -> Table {
    let mut columns: Vec<String> = Vec::new();
    for sheet in sheets {
        for column in &sheet.columns {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
    }

    let mut rows = Vec::new();
    for sheet in sheets {
        let positions: Vec<usize> = sheet
            .columns
            .iter()
            .filter_map(|column| columns.iter().position(|c| c == column))
            .collect();

        for row in &sheet.rows {
            let mut combined = vec![String::new(); columns.len()];
            for (value, &position) in row.iter().zip(&positions) {
                combined[position] = value.clone();
            }
            combined.push(sheet.name.clone());
            rows.push(combined);
        }
    }

    columns.push(SHEET_NAME_COLUMN.to_string());
    Table { columns, rows }
}
