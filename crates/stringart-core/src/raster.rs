//! Line rasterization: turn a nail pair into [`LineGeometry`].
//!
//! This module defines the [`Rasterizer`] trait for pluggable line
//! drawing algorithms and the [`RasterizerKind`] enum for selecting one
//! at runtime.
//!
//! Every rasterizer must be symmetric: swapping the endpoints yields the
//! same pixels with the same weights. The eager line table stores one
//! entry per unordered pair and relies on this. Both built-in algorithms
//! get it by always walking from the lexicographically smaller endpoint.

use serde::{Deserialize, Serialize};

use crate::geometry::LineGeometry;
use crate::types::{Dimensions, NailPosition};

/// Selects which line drawing algorithm to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterizerKind {
    /// Anti-aliased line after Zingl's Bresenham variant. Pixels next to
    /// the ideal segment get partial coverage.
    #[default]
    Antialiased,
    /// Plain Bresenham line via `imageproc`, full coverage everywhere.
    Aliased,
}

/// Trait for line drawing strategies.
///
/// `Sync` so one rasterizer can feed a parallel table build.
pub trait Rasterizer: Sync {
    /// Rasterize the segment between two nails, clipped to `bounds`.
    fn line(&self, from: NailPosition, to: NailPosition, bounds: Dimensions) -> LineGeometry;
}

impl Rasterizer for RasterizerKind {
    fn line(&self, from: NailPosition, to: NailPosition, bounds: Dimensions) -> LineGeometry {
        let (start, end) = if from <= to { (from, to) } else { (to, from) };
        match *self {
            Self::Antialiased => LineGeometry::from_samples(antialiased(start, end), bounds),
            Self::Aliased => LineGeometry::from_samples(aliased(start, end), bounds),
        }
    }
}

/// Zingl's anti-aliased Bresenham walk from `start` to `end`.
///
/// Yields `(row, col, coverage)`. Coverage is `1 − distance / length`
/// where `distance` is the accumulated error term.
fn antialiased(start: NailPosition, end: NailPosition) -> Vec<(i64, i64, f64)> {
    let (r0, c0) = (i64::from(start.row), i64::from(start.col));
    let (r1, c1) = (i64::from(end.row), i64::from(end.col));

    let dc = (c1 - c0).abs();
    let dr = (r1 - r0).abs();
    let sign_c = if c0 < c1 { 1 } else { -1 };
    let sign_r = if r0 < r1 { 1 } else { -1 };
    #[allow(clippy::cast_precision_loss)]
    let (dc_f, dr_f) = (dc as f64, dr as f64);
    let ed = if dc + dr == 0 { 1.0 } else { dc_f.hypot(dr_f) };

    let coverage = |distance: f64| 1.0 - distance.abs() / ed;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let mut samples = Vec::with_capacity(3 * (dc.max(dr) as usize + 1));
    let mut err = dc_f - dr_f;
    let (mut r, mut c) = (r0, c0);
    loop {
        samples.push((r, c, coverage(err - dc_f + dr_f)));
        let err_prev = err;
        let c_prev = c;
        if 2.0 * err_prev >= -dc_f {
            if c == c1 {
                break;
            }
            if err_prev + dr_f < ed {
                samples.push((r + sign_r, c, coverage(err_prev + dr_f)));
            }
            err -= dr_f;
            c += sign_c;
        }
        if 2.0 * err_prev <= dr_f {
            if r == r1 {
                break;
            }
            if dc_f - err_prev < ed {
                samples.push((r, c_prev + sign_c, coverage(dc_f - err_prev)));
            }
            err += dc_f;
            r += sign_r;
        }
    }
    samples
}

/// Bresenham walk from `start` to `end` with full coverage.
fn aliased(start: NailPosition, end: NailPosition) -> Vec<(i64, i64, f64)> {
    // imageproc works in (x, y) = (col, row).
    #[allow(clippy::cast_precision_loss)]
    let iter = imageproc::drawing::BresenhamLineIter::new(
        (start.col as f32, start.row as f32),
        (end.col as f32, end.row as f32),
    );
    iter.map(|(x, y)| (i64::from(y), i64::from(x), 1.0)).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const BOUNDS: Dimensions = Dimensions::new(20, 20);

    fn p(row: i32, col: i32) -> NailPosition {
        NailPosition::new(row, col)
    }

    #[test]
    fn default_is_antialiased() {
        assert_eq!(RasterizerKind::default(), RasterizerKind::Antialiased);
    }

    #[test]
    fn degenerate_line_is_one_full_pixel() {
        let line = RasterizerKind::Antialiased.line(p(5, 5), p(5, 5), BOUNDS);
        assert_eq!(line.pixels().collect::<Vec<_>>(), vec![(5, 5)]);
        assert_eq!(line.intensities(), &[1.0]);
    }

    #[test]
    fn horizontal_line_has_full_coverage() {
        let line = RasterizerKind::Antialiased.line(p(3, 2), p(3, 8), BOUNDS);
        assert_eq!(line.len(), 7);
        assert!(line.pixels().all(|(row, _)| row == 3));
        assert!(line.intensities().iter().all(|&v| (v - 1.0).abs() < 1e-12));
    }

    #[test]
    fn diagonal_line_covers_both_endpoints() {
        let line = RasterizerKind::Antialiased.line(p(0, 0), p(7, 3), BOUNDS);
        let pixels: Vec<_> = line.pixels().collect();
        assert!(pixels.contains(&(0, 0)));
        assert!(pixels.contains(&(7, 3)));
        assert!(line.intensities().iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert!(line.intensities().iter().any(|&v| v < 1.0));
    }

    #[test]
    fn lines_are_symmetric() {
        let pairs = [
            (p(0, 0), p(19, 13)),
            (p(2, 17), p(15, 1)),
            (p(19, 10), p(0, 10)),
            (p(4, 0), p(11, 19)),
        ];
        for kind in [RasterizerKind::Antialiased, RasterizerKind::Aliased] {
            for (a, b) in pairs {
                assert_eq!(kind.line(a, b, BOUNDS), kind.line(b, a, BOUNDS), "{kind:?} {a:?} {b:?}");
            }
        }
    }

    #[test]
    fn samples_outside_bounds_are_clipped() {
        // The anti-aliasing neighbours of an edge line fall outside.
        let line = RasterizerKind::Antialiased.line(p(0, 0), p(19, 5), BOUNDS);
        assert!(line.pixels().all(|(row, col)| row < 20 && col < 20));
    }

    #[test]
    fn aliased_line_is_full_coverage() {
        let line = RasterizerKind::Aliased.line(p(0, 0), p(5, 5), BOUNDS);
        assert_eq!(line.len(), 6);
        assert!(line.intensities().iter().all(|&v| (v - 1.0).abs() < f64::EPSILON));
    }

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&RasterizerKind::Aliased).unwrap(),
            r#""aliased""#
        );
    }
}
