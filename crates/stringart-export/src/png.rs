//! PNG export of a rendered canvas.

use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use stringart_core::Plane;

use crate::ExportError;

/// Encode `canvas` as an 8-bit grayscale PNG.
///
/// # Errors
///
/// Returns [`ExportError::Encode`] if the encoder fails.
pub fn to_png(canvas: &Plane) -> Result<Vec<u8>, ExportError> {
    let gray = canvas.to_gray_image();
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf).write_image(
        gray.as_raw(),
        gray.width(),
        gray.height(),
        image::ExtendedColorType::L8,
    )?;
    Ok(buf)
}
