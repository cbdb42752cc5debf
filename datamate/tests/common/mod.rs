#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use datamate::error::{DatamateError, Result};
use datamate::ocr::TextRecognizer;

/// A worksheet as rows of cell text. Cells that parse as numbers are written
/// as numeric cells, everything else as inline strings.
pub struct SheetSpec<'a> {
    pub name: &'a str,
    pub rows: &'a [&'a [&'a str]],
}

pub fn xlsx_bytes(sheets: &[SheetSpec<'_>]) -> Vec<u8> {
    use zip::write::FileOptions;
    use zip::CompressionMethod;

    let mut buffer = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buffer);
        let options: FileOptions<zip::write::ExtendedFileOptions> = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);

        zip.start_file("[Content_Types].xml", options.clone())
            .unwrap();
        zip.write_all(content_types_xml(sheets.len()).as_bytes())
            .unwrap();

        zip.start_file("_rels/.rels", options.clone()).unwrap();
        zip.write_all(RELS_XLSX.as_bytes()).unwrap();

        zip.start_file("xl/workbook.xml", options.clone()).unwrap();
        zip.write_all(workbook_xml(sheets).as_bytes()).unwrap();

        zip.start_file("xl/_rels/workbook.xml.rels", options.clone())
            .unwrap();
        zip.write_all(workbook_rels(sheets.len()).as_bytes())
            .unwrap();

        for (i, sheet) in sheets.iter().enumerate() {
            zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options.clone())
                .unwrap();
            zip.write_all(sheet_xml(sheet.rows).as_bytes()).unwrap();
        }

        zip.finish().unwrap();
    }

    buffer.into_inner()
}

const RELS_XLSX: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

fn content_types_xml(sheet_count: usize) -> String {
    let overrides: String = (1..=sheet_count)
        .map(|i| {
            format!(
                r#"<Override PartName="/xl/worksheets/sheet{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
    {overrides}
</Types>"#
    )
}

fn workbook_xml(sheets: &[SheetSpec<'_>]) -> String {
    let entries: String = sheets
        .iter()
        .enumerate()
        .map(|(i, sheet)| {
            format!(
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                sheet.name,
                i + 1,
                i + 1
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
    <sheets>{entries}</sheets>
</workbook>"#
    )
}

fn workbook_rels(sheet_count: usize) -> String {
    let rels: String = (1..=sheet_count)
        .map(|i| {
            format!(
                r#"<Relationship Id="rId{i}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{i}.xml"/>"#
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    {rels}
</Relationships>"#
    )
}

fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

fn sheet_xml(rows: &[&[&str]]) -> String {
    let body: String = rows
        .iter()
        .enumerate()
        .map(|(r, cells)| {
            let row_number = r + 1;
            let cells: String = cells
                .iter()
                .enumerate()
                .filter(|(_, value)| !value.is_empty())
                .map(|(c, value)| {
                    let reference = format!("{}{row_number}", column_letter(c));
                    if value.parse::<f64>().is_ok() {
                        format!(r#"<c r="{reference}"><v>{value}</v></c>"#)
                    } else {
                        format!(r#"<c r="{reference}" t="inlineStr"><is><t>{value}</t></is></c>"#)
                    }
                })
                .collect();
            format!(r#"<row r="{row_number}">{cells}</row>"#)
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
    <sheetData>{body}</sheetData>
</worksheet>"#
    )
}

/// The two-sheet customer workbook used across tests.
pub fn revenue_workbook() -> Vec<u8> {
    xlsx_bytes(&[
        SheetSpec {
            name: "Q1",
            rows: &[&["Name", "Revenue"], &["Acme", "100"], &["Globex", "80"]],
        },
        SheetSpec {
            name: "Q2",
            rows: &[&["Name", "Revenue"], &["Initech", "120"]],
        },
    ])
}

pub fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
    use docx_rs::{Docx, Paragraph, Run};

    let docx = paragraphs.iter().fold(Docx::new(), |docx, text| {
        docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(*text)))
    });
    let mut buffer = Cursor::new(Vec::new());
    docx.build().pack(&mut buffer).expect("Failed to pack DOCX");
    buffer.into_inner()
}

/// One page of a generated PDF.
pub enum PdfPage<'a> {
    /// A page with a Helvetica text layer.
    Text(&'a str),
    /// An image-only page: an uncompressed 8-bit DeviceGray raster.
    Scanned { width: u32, height: u32 },
    /// No text and no image.
    Blank,
}

pub fn pdf_bytes(pages: &[PdfPage<'_>]) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut kids = Vec::new();
    for page in pages {
        let (resources, operations) = match page {
            PdfPage::Text(text) => (
                dictionary! { "Font" => dictionary! { "F1" => font_id } },
                vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12_i64.into()]),
                    Operation::new("Td", vec![72_i64.into(), 720_i64.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            ),
            PdfPage::Scanned { width, height } => {
                let pixels = vec![200_u8; (*width as usize) * (*height as usize)];
                let image_id = doc.add_object(Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => *width as i64,
                        "Height" => *height as i64,
                        "ColorSpace" => "DeviceGray",
                        "BitsPerComponent" => 8_i64,
                    },
                    pixels,
                ));
                (
                    dictionary! { "XObject" => dictionary! { "Im1" => image_id } },
                    vec![
                        Operation::new("q", vec![]),
                        Operation::new(
                            "cm",
                            vec![
                                500_i64.into(),
                                0_i64.into(),
                                0_i64.into(),
                                700_i64.into(),
                                50_i64.into(),
                                50_i64.into(),
                            ],
                        ),
                        Operation::new("Do", vec!["Im1".into()]),
                        Operation::new("Q", vec![]),
                    ],
                )
            }
            PdfPage::Blank => (dictionary! {}, vec![]),
        };

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("Failed to encode page content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources,
            "MediaBox" => vec![0_i64.into(), 0_i64.into(), 612_i64.into(), 792_i64.into()],
        });
        kids.push(Object::from(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("Failed to save PDF");
    bytes
}

/// Records how often OCR was requested and answers with a fixed text.
pub struct CountingRecognizer {
    calls: AtomicUsize,
    reply: Option<String>,
}

impl CountingRecognizer {
    pub fn replying(text: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            reply: Some(text.to_string()),
        }
    }

    /// Every call fails as if no OCR engine were configured.
    pub fn unavailable() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            reply: None,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextRecognizer for CountingRecognizer {
    async fn recognize_text(&self, image: &[u8]) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        assert!(!image.is_empty(), "OCR received an empty image");
        match &self.reply {
            Some(text) => Ok(format!("{text} {call}")),
            None => Err(DatamateError::OcrUnavailable(
                "no OCR engine in tests".to_string(),
            )),
        }
    }
}

pub fn completion_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1,
        "model": "llama3-8b-8192",
        "choices": [
            {
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": content
                },
                "finish_reason": "stop"
            }
        ],
        "usage": {
            "prompt_tokens": 1,
            "completion_tokens": 1,
            "total_tokens": 2
        }
    })
}

pub fn api_error_body(message: &str, error_type: &str, code: &str) -> serde_json::Value {
    serde_json::json!({
        "error": {
            "message": message,
            "type": error_type,
            "param": serde_json::Value::Null,
            "code": code
        }
    })
}
