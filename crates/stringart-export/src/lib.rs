//! stringart-export: Pure format serializers for string art results (sans-IO)
//!
//! Turns a finished run into bytes or strings. Supports a PNG raster of
//! the canvas, an SVG drawing of the thread path, and plain-text dumps of
//! the nail sequence and the error trace.

pub mod png;
pub mod svg;
pub mod text;

pub use png::to_png;
pub use svg::{SvgMetadata, to_svg};
pub use text::{errors_to_text, sequence_to_text};

/// Errors that can occur while serializing a result.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The image encoder rejected the canvas.
    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),

    /// The sequence names a nail the nail set does not have.
    #[error(transparent)]
    Nail(#[from] stringart_core::StringArtError),
}
