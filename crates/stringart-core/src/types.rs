//! Shared types for the string art engine.

use std::f64::consts::{PI, TAU};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::nails::NailSet;
use crate::plane::Plane;
use crate::raster::RasterizerKind;
use crate::search::SearchOutcome;

/// Re-export `GrayImage` so downstream crates can move raster data in
/// and out of [`Plane`] without depending on `image` directly.
pub use image::GrayImage;

/// Canvas dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels (number of columns).
    pub width: u32,
    /// Height in pixels (number of rows).
    pub height: u32,
}

impl Dimensions {
    /// Create new dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total pixel count.
    #[must_use]
    pub const fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Returns `true` if either side is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether `(row, col)` lies inside the canvas.
    #[must_use]
    pub fn contains(self, row: i64, col: i64) -> bool {
        (0..i64::from(self.height)).contains(&row) && (0..i64::from(self.width)).contains(&col)
    }
}

/// A nail position in `(row, column)` image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NailPosition {
    /// Row (pixels from the top edge).
    pub row: i32,
    /// Column (pixels from the left edge).
    pub col: i32,
}

impl NailPosition {
    /// Create a new nail position.
    #[must_use]
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }
}

/// Geometric arrangement of the nails around the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Nails along the four edges of the canvas.
    Rectangle,
    /// Nails evenly spaced on the largest circle inscribed in the canvas.
    #[default]
    Circle,
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rectangle => f.write_str("rectangle"),
            Self::Circle => f.write_str("circle"),
        }
    }
}

/// Which line geometry caching strategy a run uses.
///
/// `Precomputed` selects the precache pipeline; the other two select the
/// standard pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStrategy {
    /// Rasterize every candidate line from scratch on every lookup.
    Disabled,
    /// Memoize lines on first use, keyed by pair and nail fingerprint.
    Lazy,
    /// Rasterize every legal pair once before the search starts.
    #[default]
    Precomputed,
}

impl fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("disabled"),
            Self::Lazy => f.write_str("lazy"),
            Self::Precomputed => f.write_str("precomputed"),
        }
    }
}

/// Configuration for an end-to-end string art run.
///
/// Deserialization fills missing fields from [`Default`], so a partial
/// JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StringArtConfig {
    /// Number of nails placed around the canvas.
    pub num_nails: usize,

    /// Nail arrangement.
    pub layout: Layout,

    /// Darkening applied by one pass of string over a pixel of full
    /// intensity.
    pub strength: f64,

    /// Upper bound on the number of strings drawn.
    pub max_iterations: usize,

    /// Line geometry caching strategy.
    pub line_cache: CacheStrategy,

    /// Line drawing algorithm.
    pub rasterizer: RasterizerKind,

    /// Minimum angular distance (radians) between connected nails.
    /// Only used by the circle layout.
    pub min_angle_diff: f64,

    /// RGB colour composited under transparent pixels of the source image.
    pub background: [u8; 3],

    /// Scale factor in (0, 1] applied to the source image before searching.
    pub downscale_factor: f64,

    /// Consecutive negligible-improvement iterations tolerated before the
    /// search stops early.
    pub patience: usize,

    /// Smallest improvement (in summed squared error) counted as progress.
    pub epsilon: f64,
}

impl StringArtConfig {
    /// Default nail count.
    pub const DEFAULT_NUM_NAILS: usize = 200;
    /// Minimum nail count accepted by [`validate`](Self::validate).
    pub const MIN_NUM_NAILS: usize = 10;
    /// Default string strength.
    pub const DEFAULT_STRENGTH: f64 = 0.1;
    /// Default iteration bound.
    pub const DEFAULT_MAX_ITERATIONS: usize = 5000;
    /// Default minimum angular distance (π/8).
    pub const DEFAULT_MIN_ANGLE_DIFF: f64 = PI / 8.0;
    /// Default background colour (dark gray).
    pub const DEFAULT_BACKGROUND: [u8; 3] = [50, 50, 50];
    /// Default downscale factor (no downscaling).
    pub const DEFAULT_DOWNSCALE_FACTOR: f64 = 1.0;
    /// Default patience.
    pub const DEFAULT_PATIENCE: usize = 20;
    /// Default epsilon.
    pub const DEFAULT_EPSILON: f64 = 1e-6;

    /// Check every field against its legal range.
    ///
    /// # Errors
    ///
    /// Returns [`StringArtError::InvalidArgument`] naming the first
    /// offending field.
    pub fn validate(&self) -> Result<(), StringArtError> {
        if self.num_nails < Self::MIN_NUM_NAILS {
            return Err(StringArtError::invalid(format!(
                "num_nails must be at least {}; got {}",
                Self::MIN_NUM_NAILS,
                self.num_nails
            )));
        }
        if !(self.downscale_factor > 0.0 && self.downscale_factor <= 1.0) {
            return Err(StringArtError::invalid(format!(
                "downscale_factor must be in (0, 1]; got {}",
                self.downscale_factor
            )));
        }
        validate_min_angle_diff(self.min_angle_diff)?;
        self.search_params().validate()
    }

    /// The core search parameters carried by this config.
    #[must_use]
    pub const fn search_params(&self) -> crate::search::SearchParams {
        crate::search::SearchParams {
            strength: self.strength,
            max_iterations: self.max_iterations,
            patience: self.patience,
            epsilon: self.epsilon,
        }
    }
}

impl Default for StringArtConfig {
    fn default() -> Self {
        Self {
            num_nails: Self::DEFAULT_NUM_NAILS,
            layout: Layout::default(),
            strength: Self::DEFAULT_STRENGTH,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            line_cache: CacheStrategy::default(),
            rasterizer: RasterizerKind::default(),
            min_angle_diff: Self::DEFAULT_MIN_ANGLE_DIFF,
            background: Self::DEFAULT_BACKGROUND,
            downscale_factor: Self::DEFAULT_DOWNSCALE_FACTOR,
            patience: Self::DEFAULT_PATIENCE,
            epsilon: Self::DEFAULT_EPSILON,
        }
    }
}

/// Reject minimum angles outside `[0, 2π]` (and NaN).
pub(crate) fn validate_min_angle_diff(min_angle_diff: f64) -> Result<(), StringArtError> {
    if (0.0..=TAU).contains(&min_angle_diff) {
        Ok(())
    } else {
        Err(StringArtError::invalid(format!(
            "min_angle_diff must be in [0, 2*pi]; got {min_angle_diff}"
        )))
    }
}

/// Result of an end-to-end run.
#[derive(Debug, Clone)]
pub struct StringArt {
    /// Nail sequence, final canvas, and error trace.
    pub outcome: SearchOutcome,

    /// The nails the sequence indexes into, at working resolution.
    pub nails: NailSet,

    /// The prepared target the search approximated.
    pub target: Plane,

    /// Size of the cropped source before downscaling. Rendering the
    /// sequence at this size gives a full-resolution result.
    pub full_dimensions: Dimensions,
}

impl StringArt {
    /// Working-resolution canvas dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.target.dimensions()
    }
}

/// Errors raised by the string art engine.
///
/// Early termination of a search is not an error; see
/// [`StopReason`](crate::search::StopReason).
#[derive(Debug, thiserror::Error)]
pub enum StringArtError {
    /// An argument has the wrong shape or lies outside its legal range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A nail index is outside `[0, len)`.
    #[error("nail index {index} out of range for {len} nails")]
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Number of nails.
        len: usize,
    },

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),
}

impl StringArtError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

/// Check that `index` addresses one of `len` nails.
pub(crate) const fn check_index(index: usize, len: usize) -> Result<(), StringArtError> {
    if index < len {
        Ok(())
    } else {
        Err(StringArtError::IndexOutOfRange { index, len })
    }
}
