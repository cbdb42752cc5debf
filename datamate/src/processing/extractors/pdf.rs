use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId};

use super::ProgressFn;
use crate::error::{DatamateError, Result};
use crate::models::{DocumentKind, ExtractedDocument, ExtractionProgress, Segment, SegmentOrigin};
use crate::ocr::TextRecognizer;

/// Text layer of one page, or the raster image standing in for it.
#[derive(Debug)]
struct PageContent {
    number: u32,
    text: String,
    image: Option<Vec<u8>>,
}

pub struct PdfExtractor;

impl PdfExtractor {
    /// Reads pages in order. Pages without a text layer are recognized from
    /// their largest embedded image, one OCR call per page.
    pub async fn extract(
        bytes: &[u8],
        recognizer: &dyn TextRecognizer,
        progress: &mut ProgressFn<'_>,
    ) -> Result<ExtractedDocument> {
        let pages = Self::read_pages(bytes)?;
        let total = pages.len();
        let mut segments = Vec::new();

        for (index, page) in pages.into_iter().enumerate() {
            let number = page.number as usize;
            let text = page.text.trim();

            let message = if !text.is_empty() {
                segments.push(Segment::new(
                    SegmentOrigin::Page { number, ocr: false },
                    text,
                ));
                format!("Processed page {} of {}", index + 1, total)
            } else if let Some(image) = page.image {
                match recognizer.recognize_text(&image).await {
                    Ok(recognized) if !recognized.trim().is_empty() => {
                        segments.push(Segment::new(
                            SegmentOrigin::Page { number, ocr: true },
                            recognized.trim(),
                        ));
                    }
                    Ok(_) => {
                        tracing::warn!(page = number, "OCR found no text on page");
                    }
                    Err(e @ DatamateError::OcrUnavailable(_)) => return Err(e),
                    Err(e) => {
                        tracing::warn!(page = number, error = %e, "OCR failed, skipping page");
                    }
                }
                format!("Processed page {} of {} (OCR)", index + 1, total)
            } else {
                tracing::warn!(page = number, "Page has no text layer and no image, skipping");
                format!("Skipped page {} of {}", index + 1, total)
            };

            progress(ExtractionProgress::new(index + 1, total, message));
        }

        Ok(ExtractedDocument::new(DocumentKind::Pdf, segments))
    }

    fn read_pages(bytes: &[u8]) -> Result<Vec<PageContent>> {
        let doc = Document::load_mem(bytes)
            .map_err(|e| DatamateError::Processing(format!("PDF parse error: {e}")))?;

        let page_ids: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();
        let mut fallback_pages: Option<Vec<String>> = None;
        let mut pages = Vec::with_capacity(page_ids.len());

        for (position, (number, page_id)) in page_ids.iter().enumerate() {
            let text = match doc.extract_text(&[*number]) {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!(page = number, error = %e, "lopdf text extraction failed, trying pdf-extract");
                    let fallback = fallback_pages.get_or_insert_with(|| {
                        pdf_extract::extract_text_from_mem_by_pages(bytes).unwrap_or_default()
                    });
                    fallback.get(position).cloned().unwrap_or_default()
                }
            };

            let image = if text.trim().is_empty() {
                largest_page_image(&doc, *page_id)
            } else {
                None
            };

            pages.push(PageContent {
                number: *number,
                text,
                image,
            });
        }

        Ok(pages)
    }
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Page resources, following the `Parent` chain for inherited entries.
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_object(page_id).ok()?.as_dict().ok()?;
    loop {
        if let Ok(resources) = node.get(b"Resources") {
            return resolve(doc, resources)?.as_dict().ok();
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_object(parent).ok()?.as_dict().ok()?;
    }
}

/// Encodes the page's largest image XObject for OCR.
fn largest_page_image(doc: &Document, page_id: ObjectId) -> Option<Vec<u8>> {
    let resources = page_resources(doc, page_id)?;
    let xobjects = resolve(doc, resources.get(b"XObject").ok()?)?.as_dict().ok()?;

    let mut best: Option<(i64, &lopdf::Stream)> = None;
    for (_, object) in xobjects.iter() {
        let Some(Ok(stream)) = resolve(doc, object).map(Object::as_stream) else {
            continue;
        };
        let is_image = stream
            .dict
            .get(b"Subtype")
            .and_then(Object::as_name)
            .map(|name| name == b"Image")
            .unwrap_or(false);
        if !is_image {
            continue;
        }
        let area = dimension(&stream.dict, b"Width")
            .max(0)
            .saturating_mul(dimension(&stream.dict, b"Height").max(0));
        if best.map(|(best_area, _)| area > best_area).unwrap_or(true) {
            best = Some((area, stream));
        }
    }

    let (_, stream) = best?;
    match encode_image(doc, stream) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::warn!(error = %e, "Unsupported page image");
            None
        }
    }
}

fn dimension(dict: &Dictionary, key: &[u8]) -> i64 {
    dict.get(key).and_then(Object::as_i64).unwrap_or(0)
}

/// Image size as declared by the stream; non-positive or oversized values are
/// rejected rather than trusted.
fn image_dimensions(dict: &Dictionary) -> Result<(u32, u32)> {
    let positive = |key: &[u8]| {
        let value = dimension(dict, key);
        u32::try_from(value)
            .ok()
            .filter(|v| *v > 0)
            .ok_or_else(|| DatamateError::Processing(format!("Invalid image dimensions: {value}")))
    };
    Ok((positive(b"Width")?, positive(b"Height")?))
}

fn filter_names(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

/// Number of colour components, for device and ICC-based spaces.
fn color_components(doc: &Document, dict: &Dictionary) -> Option<u32> {
    let space = resolve(doc, dict.get(b"ColorSpace").ok()?)?;
    match space {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" => Some(1),
            b"DeviceRGB" => Some(3),
            b"DeviceCMYK" => Some(4),
            _ => None,
        },
        Object::Array(items)
            if items.first().and_then(|o| o.as_name().ok()) == Some(b"ICCBased".as_slice()) =>
        {
            let profile = resolve(doc, items.get(1)?)?.as_stream().ok()?;
            profile
                .dict
                .get(b"N")
                .and_then(Object::as_i64)
                .ok()
                .map(|n| n as u32)
        }
        _ => None,
    }
}

fn encode_image(doc: &Document, stream: &lopdf::Stream) -> Result<Vec<u8>> {
    let filters = filter_names(&stream.dict);

    if filters.len() == 1 && filters[0] == b"DCTDecode" {
        return Ok(stream.content.clone());
    }

    let data = if filters.is_empty() {
        stream.content.clone()
    } else if filters.iter().all(|f| f.as_slice() == b"FlateDecode") {
        stream
            .decompressed_content()
            .map_err(|e| DatamateError::Processing(format!("Image stream decode failed: {e}")))?
    } else {
        return Err(DatamateError::Processing(format!(
            "Unsupported image filter: {}",
            filters
                .iter()
                .map(|f| String::from_utf8_lossy(f).into_owned())
                .collect::<Vec<_>>()
                .join(", ")
        )));
    };

    let bits = dimension(&stream.dict, b"BitsPerComponent");
    if bits != 8 {
        return Err(DatamateError::Processing(format!(
            "Unsupported bits per component: {bits}"
        )));
    }

    let (width, height) = image_dimensions(&stream.dict)?;
    let components = color_components(doc, &stream.dict)
        .ok_or_else(|| DatamateError::Processing("Unsupported image color space".to_string()))?;

    let too_large = || DatamateError::Processing("Image dimensions too large".to_string());
    let pixels = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(too_large)?;
    let required = pixels
        .checked_mul(components as usize)
        .ok_or_else(too_large)?;
    if data.len() < required {
        return Err(DatamateError::Processing(
            "Image data shorter than its dimensions".to_string(),
        ));
    }

    let image = match components {
        1 => GrayImage::from_raw(width, height, data[..pixels].to_vec()).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(width, height, data[..pixels * 3].to_vec())
            .map(DynamicImage::ImageRgb8),
        4 => {
            let rgb = data[..pixels * 4]
                .chunks_exact(4)
                .flat_map(|cmyk| cmyk_to_rgb(cmyk[0], cmyk[1], cmyk[2], cmyk[3]))
                .collect();
            RgbImage::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8)
        }
        n => {
            return Err(DatamateError::Processing(format!(
                "Unsupported component count: {n}"
            )))
        }
    }
    .ok_or_else(|| DatamateError::Processing("Invalid image dimensions".to_string()))?;

    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| DatamateError::Processing(format!("Failed to encode page image: {e}")))?;
    Ok(png)
}

fn cmyk_to_rgb(c: u8, m: u8, y: u8, k: u8) -> [u8; 3] {
    let k = 255 - k as u16;
    let channel = |v: u8| (((255 - v as u16) * k) / 255) as u8;
    [channel(c), channel(m), channel(y)]
}
