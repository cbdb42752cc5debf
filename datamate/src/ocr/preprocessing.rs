use crate::config::OcrConfig;
use crate::error::{DatamateError, Result};
use image::{DynamicImage, GenericImageView, GrayImage, ImageFormat, ImageReader};

/// Share of darkest and lightest pixels ignored when stretching contrast.
const CLIP_FRACTION: f32 = 0.01;

/// Normalizes a page image before recognition.
///
/// The image is checked against the configured minimum size, scaled down to
/// fit `max_image_dimension`, flattened to 8-bit grayscale and
/// contrast-stretched. The result is PNG encoded.
pub fn preprocess_image(bytes: &[u8], config: &OcrConfig) -> Result<Vec<u8>> {
    let img = ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DatamateError::Processing(format!("Failed to read image: {e}")))?
        .decode()
        .map_err(|e| DatamateError::Processing(format!("Failed to decode image: {e}")))?;

    let (width, height) = img.dimensions();
    if width < config.min_image_dimension || height < config.min_image_dimension {
        return Err(DatamateError::Processing(format!(
            "Image too small: {}x{}, minimum {}x{}",
            width, height, config.min_image_dimension, config.min_image_dimension
        )));
    }

    let gray = fit_within(img, config.max_image_dimension).to_luma8();
    let gray = stretch_contrast(gray);

    let mut output = Vec::new();
    DynamicImage::ImageLuma8(gray)
        .write_to(&mut std::io::Cursor::new(&mut output), ImageFormat::Png)
        .map_err(|e| DatamateError::Processing(format!("Failed to encode image: {e}")))?;

    Ok(output)
}

/// Scales `img` down (Lanczos3) so neither side exceeds `max_dim`.
fn fit_within(img: DynamicImage, max_dim: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width <= max_dim && height <= max_dim {
        return img;
    }

    let ratio = max_dim as f32 / width.max(height) as f32;
    let new_width = ((width as f32 * ratio) as u32).max(1);
    let new_height = ((height as f32 * ratio) as u32).max(1);

    img.resize_exact(new_width, new_height, image::imageops::FilterType::Lanczos3)
}

/// Linear histogram stretch between the clipped low and high percentiles.
fn stretch_contrast(gray: GrayImage) -> GrayImage {
    let mut histogram = [0usize; 256];
    for pixel in gray.pixels() {
        histogram[pixel[0] as usize] += 1;
    }

    let total = (gray.width() as usize) * (gray.height() as usize);
    let clip = (total as f32 * CLIP_FRACTION) as usize;

    let low = percentile_bound(histogram.iter().enumerate(), clip);
    let high = percentile_bound(histogram.iter().enumerate().rev(), clip);

    if high <= low {
        return gray;
    }

    let range = (high - low) as f32;
    let mut out = gray;
    for pixel in out.pixels_mut() {
        let value = pixel[0].clamp(low, high);
        pixel[0] = (((value - low) as f32 / range) * 255.0).round() as u8;
    }
    out
}

fn percentile_bound<'a>(bins: impl Iterator<Item = (usize, &'a usize)>, clip: usize) -> u8 {
    let mut seen = 0;
    let mut last = 0;
    for (value, count) in bins {
        if *count == 0 {
            continue;
        }
        last = value;
        seen += count;
        if seen > clip {
            return value as u8;
        }
    }
    last as u8
}
