//! Target image preparation.
//!
//! Raw image bytes in, a [`Plane`] of luminance in `[0, 1]` out:
//!
//! 1. decode (PNG, JPEG, BMP, WebP)
//! 2. composite any transparency over a solid background colour
//! 3. convert to luminance
//! 4. crop the largest centred square (circle layouts only)
//! 5. downscale with a Gaussian pre-blur against aliasing

use image::{GrayImage, Luma, RgbaImage};

use crate::plane::Plane;
use crate::types::{Dimensions, Layout, StringArtError};

/// Luminance weights for red, green, and blue (ITU-R BT.709).
pub const LUMINANCE_WEIGHTS: [f64; 3] = [0.2125, 0.7154, 0.0721];

/// A prepared target and the sizes it went through.
#[derive(Debug, Clone)]
pub struct PreparedTarget {
    /// The target at working resolution.
    pub target: Plane,
    /// Size of the decoded source image.
    pub source: Dimensions,
    /// Size after cropping, before downscaling. Replaying a result at
    /// full resolution uses this size.
    pub full: Dimensions,
}

/// Run every preparation step.
///
/// # Errors
///
/// Returns [`StringArtError::EmptyInput`] for empty `bytes`,
/// [`StringArtError::ImageDecode`] for undecodable data, and
/// [`StringArtError::InvalidArgument`] for a `downscale_factor` outside
/// `(0, 1]`.
pub fn prepare_target(
    bytes: &[u8],
    layout: Layout,
    background: [u8; 3],
    downscale_factor: f64,
) -> Result<PreparedTarget, StringArtError> {
    let rgba = decode(bytes)?;
    let source = Dimensions::new(rgba.width(), rgba.height());

    let gray = composite_luminance(&rgba, background);
    let gray = match layout {
        Layout::Circle => center_square_crop(&gray),
        Layout::Rectangle => gray,
    };
    let full = Dimensions::new(gray.width(), gray.height());

    let small = downscale(&gray, downscale_factor)?;
    log::debug!(
        "prepared target: decoded {}x{}, cropped {}x{}, working {}x{}",
        source.width,
        source.height,
        full.width,
        full.height,
        small.width(),
        small.height()
    );

    Ok(PreparedTarget {
        target: Plane::from_gray_image(&small),
        source,
        full,
    })
}

/// Decode raw image bytes to RGBA.
///
/// # Errors
///
/// Returns [`StringArtError::EmptyInput`] if `bytes` is empty.
/// Returns [`StringArtError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage, StringArtError> {
    if bytes.is_empty() {
        return Err(StringArtError::EmptyInput);
    }
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Composite over `background` and reduce to luminance.
///
/// Each colour channel is blended as `c·a + bg·(1 − a)` and truncated to
/// 8 bits before the luminance weights are applied. Opaque pixels are
/// unaffected by the background.
#[must_use = "returns the grayscale image"]
pub fn composite_luminance(image: &RgbaImage, background: [u8; 3]) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let alpha = f64::from(a) / 255.0;
        let blend = |c: u8, bg: u8| -> f64 {
            let v = f64::from(c).mul_add(alpha, f64::from(bg) * (1.0 - alpha));
            v.trunc()
        };
        let luma = LUMINANCE_WEIGHTS[0] * blend(r, background[0])
            + LUMINANCE_WEIGHTS[1] * blend(g, background[1])
            + LUMINANCE_WEIGHTS[2] * blend(b, background[2]);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let luma = luma.round().clamp(0.0, 255.0) as u8;
        Luma([luma])
    })
}

/// Crop the largest square centred in `image`.
#[must_use = "returns the cropped image"]
pub fn center_square_crop(image: &GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let side = width.min(height);
    let x = (width - side) / 2;
    let y = (height - side) / 2;
    image::imageops::crop_imm(image, x, y, side, side).to_image()
}

/// Apply Gaussian blur to a grayscale image.
///
/// Non-positive sigma values return the image unchanged, since
/// `imageproc`'s underlying function panics on `sigma <= 0.0`.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 {
        return image.clone();
    }
    imageproc::filter::gaussian_blur_f32(image, sigma)
}

/// Blur sigma that suppresses aliasing when scaling by `factor`:
/// `(1/factor − 1) / 2`, never negative.
#[must_use]
pub fn anti_aliasing_sigma(factor: f64) -> f64 {
    ((1.0 / factor - 1.0) / 2.0).max(0.0)
}

/// Scale `image` by `factor` in `(0, 1]`.
///
/// The output side lengths are `round(side · factor)`, at least 1. The
/// image is Gaussian-blurred with [`anti_aliasing_sigma`] first, then
/// resampled bilinearly. A factor of exactly 1 returns a copy.
///
/// # Errors
///
/// Returns [`StringArtError::InvalidArgument`] if `factor` is outside
/// `(0, 1]`.
pub fn downscale(image: &GrayImage, factor: f64) -> Result<GrayImage, StringArtError> {
    if !(factor > 0.0 && factor <= 1.0) {
        return Err(StringArtError::invalid(format!(
            "downscale_factor must be in (0, 1]; got {factor}"
        )));
    }
    if (factor - 1.0).abs() < f64::EPSILON {
        return Ok(image.clone());
    }

    let scaled = |side: u32| -> u32 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let s = (f64::from(side) * factor).round() as u32;
        s.max(1)
    };
    let (width, height) = (scaled(image.width()), scaled(image.height()));

    #[allow(clippy::cast_possible_truncation)]
    let sigma = anti_aliasing_sigma(factor) as f32;
    let blurred = gaussian_blur(image, sigma);
    Ok(image::imageops::resize(
        &blurred,
        width,
        height,
        image::imageops::FilterType::Triangle,
    ))
}
