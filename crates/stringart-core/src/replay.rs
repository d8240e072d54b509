//! Rebuilding a canvas from a nail sequence.

use crate::cache::check_strength;
use crate::nails::NailSet;
use crate::plane::Plane;
use crate::raster::Rasterizer;
use crate::types::{Dimensions, StringArtError};

/// Draw the strings between consecutive nails of `sequence` onto a blank
/// canvas of `dimensions`.
///
/// With the nails, dimensions, strength, and rasterizer of a search, this
/// reproduces the search's final canvas exactly. With nails placed on a
/// larger canvas and a proportionally larger strength, it renders the
/// result at that resolution.
///
/// A sequence of zero or one nails draws no string and yields a white
/// canvas; this is what a search that stops before its first string
/// produces.
///
/// # Errors
///
/// Returns [`StringArtError::InvalidArgument`] if `strength` is not a
/// positive finite number or `dimensions` is empty;
/// [`StringArtError::IndexOutOfRange`] if an entry is not a nail of
/// `nails`.
pub fn render_sequence<R: Rasterizer + ?Sized>(
    sequence: &[usize],
    nails: &NailSet,
    dimensions: Dimensions,
    strength: f64,
    rasterizer: &R,
) -> Result<Plane, StringArtError> {
    check_strength(strength)?;
    if dimensions.is_empty() {
        return Err(StringArtError::invalid(format!(
            "canvas dimensions must be positive; got {}x{}",
            dimensions.width, dimensions.height
        )));
    }
    let positions = sequence
        .iter()
        .map(|&index| nails.position(index))
        .collect::<Result<Vec<_>, _>>()?;

    let mut canvas = Plane::white(dimensions);
    for pair in positions.windows(2) {
        rasterizer
            .line(pair[0], pair[1], dimensions)
            .draw(&mut canvas, strength);
    }
    Ok(canvas)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::raster::RasterizerKind;
    use crate::types::NailPosition;

    const DIMS: Dimensions = Dimensions::new(10, 10);

    fn nails() -> NailSet {
        NailSet::new(vec![
            NailPosition::new(0, 5),
            NailPosition::new(5, 9),
            NailPosition::new(9, 5),
        ])
        .unwrap()
    }

    #[test]
    fn sequence_without_strings_is_a_white_canvas() {
        let raster = RasterizerKind::Antialiased;
        for sequence in [&[][..], &[0][..], &[2][..]] {
            let canvas = render_sequence(sequence, &nails(), DIMS, 0.1, &raster).unwrap();
            assert_eq!(canvas, Plane::white(DIMS));
        }
    }

    #[test]
    fn lone_nail_is_still_checked() {
        let result = render_sequence(&[3], &nails(), DIMS, 0.1, &RasterizerKind::Antialiased);
        assert!(matches!(
            result,
            Err(StringArtError::IndexOutOfRange { index: 3, len: 3 })
        ));
    }

    #[test]
    fn rejects_unknown_nail() {
        let result = render_sequence(&[0, 3], &nails(), DIMS, 0.1, &RasterizerKind::Antialiased);
        assert!(matches!(
            result,
            Err(StringArtError::IndexOutOfRange { index: 3, len: 3 })
        ));
    }

    #[test]
    fn rejects_non_positive_strength() {
        let result = render_sequence(&[0, 1], &nails(), DIMS, 0.0, &RasterizerKind::Antialiased);
        assert!(result.is_err());
    }

    #[test]
    fn draws_each_consecutive_pair() {
        let raster = RasterizerKind::Aliased;
        let canvas = render_sequence(&[0, 1, 2], &nails(), DIMS, 0.25, &raster).unwrap();
        // Both endpoints of 0->1 and 1->2 are darkened; nail 1 twice.
        assert!((canvas.get(0, 5).unwrap() - 0.75).abs() < f64::EPSILON);
        assert!((canvas.get(5, 9).unwrap() - 0.5).abs() < f64::EPSILON);
        assert!((canvas.get(9, 5).unwrap() - 0.75).abs() < f64::EPSILON);
        assert!((canvas.get(9, 0).unwrap() - 1.0).abs() < f64::EPSILON);
    }
}
