//! Nail placement around the canvas.
//!
//! Positions are integer `(row, col)` pixel coordinates. Fractional
//! coordinates are truncated toward zero, so every nail lands inside the
//! canvas.

use std::f64::consts::TAU;

use crate::nails::NailSet;
use crate::types::{Dimensions, Layout, NailPosition, StringArtError};

/// Place nails for `layout` on a canvas of `dimensions`.
///
/// # Errors
///
/// See [`rectangle_nails`] and [`circle_nails`].
pub fn nails_for_layout(
    layout: Layout,
    dimensions: Dimensions,
    num_nails: usize,
) -> Result<NailSet, StringArtError> {
    match layout {
        Layout::Rectangle => rectangle_nails(dimensions, num_nails),
        Layout::Circle => circle_nails(dimensions, num_nails),
    }
}

/// Place nails along the four edges of the canvas.
///
/// Each side receives a share of `num_nails` proportional to its length,
/// rounded down, so the total may fall slightly short of `num_nails`.
/// Nails are ordered clockwise: top edge left to right, right edge top to
/// bottom, bottom edge right to left, left edge bottom to top.
///
/// # Errors
///
/// Returns [`StringArtError::InvalidArgument`] if `num_nails` is zero, the
/// canvas is empty, or fewer than two nails would be placed.
pub fn rectangle_nails(
    dimensions: Dimensions,
    num_nails: usize,
) -> Result<NailSet, StringArtError> {
    check_inputs(dimensions, num_nails)?;

    let height = f64::from(dimensions.height);
    let width = f64::from(dimensions.width);
    let perimeter = 2.0 * (height + width);
    #[allow(clippy::cast_precision_loss)]
    let n = num_nails as f64;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let top_num = (n * width / perimeter) as usize;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let side_num = (n * height / perimeter) as usize;

    let last_row = trunc(height - 1.0);
    let last_col = trunc(width - 1.0);

    let mut positions = Vec::with_capacity(2 * (top_num + side_num));
    positions.extend(
        steps(top_num, width).map(|offset| NailPosition::new(0, trunc(offset))),
    );
    positions.extend(
        steps(side_num, height).map(|offset| NailPosition::new(trunc(offset), last_col)),
    );
    positions.extend(
        steps(top_num, width)
            .map(|offset| NailPosition::new(last_row, trunc(width - 1.0 - offset))),
    );
    positions.extend(
        steps(side_num, height)
            .map(|offset| NailPosition::new(trunc(height - 1.0 - offset), 0)),
    );

    if positions.len() < 2 {
        return Err(StringArtError::invalid(format!(
            "{num_nails} nails on a {}x{} rectangle leaves fewer than 2 nails",
            dimensions.width, dimensions.height
        )));
    }
    NailSet::new(positions)
}

/// Place `num_nails` nails evenly around the largest circle inscribed in
/// the canvas, starting at angle 0 (the rightmost point) and walking
/// counter-clockwise on screen.
///
/// The returned set carries the nail angles `2πk / num_nails`.
///
/// # Errors
///
/// Returns [`StringArtError::InvalidArgument`] if `num_nails` is below
/// two, the canvas is empty, or the canvas is too small to hold a circle
/// of positive radius.
pub fn circle_nails(dimensions: Dimensions, num_nails: usize) -> Result<NailSet, StringArtError> {
    check_inputs(dimensions, num_nails)?;

    let center_row = dimensions.height / 2;
    let center_col = dimensions.width / 2;
    // One pixel of margin so truncation never leaves the canvas.
    let radius = center_row.min(center_col).saturating_sub(1);
    if radius == 0 {
        return Err(StringArtError::invalid(format!(
            "a {}x{} canvas is too small for a circular layout",
            dimensions.width, dimensions.height
        )));
    }
    let radius = f64::from(radius);
    let center_row = f64::from(center_row);
    let center_col = f64::from(center_col);

    #[allow(clippy::cast_precision_loss)]
    let angles: Vec<f64> = (0..num_nails)
        .map(|k| TAU * k as f64 / num_nails as f64)
        .collect();
    let positions = angles
        .iter()
        .map(|&angle| {
            NailPosition::new(
                trunc(center_row) - trunc(radius * angle.sin()),
                trunc(center_col) + trunc(radius * angle.cos()),
            )
        })
        .collect();

    NailSet::with_angles(positions, angles)
}

fn check_inputs(dimensions: Dimensions, num_nails: usize) -> Result<(), StringArtError> {
    if num_nails == 0 {
        return Err(StringArtError::invalid("num_nails must be positive"));
    }
    if dimensions.is_empty() {
        return Err(StringArtError::invalid(format!(
            "canvas dimensions must be positive; got {}x{}",
            dimensions.width, dimensions.height
        )));
    }
    Ok(())
}

/// `count` evenly spaced offsets `k * length / count` for `k` in `0..count`.
fn steps(count: usize, length: f64) -> impl Iterator<Item = f64> {
    #[allow(clippy::cast_precision_loss)]
    (0..count).map(move |k| k as f64 * length / count as f64)
}

#[allow(clippy::cast_possible_truncation)]
fn trunc(value: f64) -> i32 {
    value as i32
}
