//! Rasterized line geometry and the line-draw formula.
//!
//! A [`LineGeometry`] is the set of pixels a string between two nails
//! covers, with one coverage weight per pixel. It depends only on the two
//! endpoints and the canvas bounds, never on canvas or target content, so
//! it can be cached freely. Applying it to a canvas is never cached: the
//! darkened value of a pixel depends on how dark the canvas already is.

use crate::plane::Plane;
use crate::types::Dimensions;

/// Pixels covered by one string, sorted by row-major offset, each with a
/// coverage weight in `[0, 1]`.
#[derive(Debug, Default, PartialEq)]
pub struct LineGeometry {
    width: u32,
    offsets: Vec<usize>,
    intensities: Vec<f64>,
}

impl LineGeometry {
    /// Build from raw `(row, col, weight)` samples.
    ///
    /// Samples outside `bounds` are dropped, weights are clamped to
    /// `[0, 1]`, and a pixel sampled more than once keeps its largest
    /// weight.
    #[must_use]
    pub fn from_samples(
        samples: impl IntoIterator<Item = (i64, i64, f64)>,
        bounds: Dimensions,
    ) -> Self {
        let width = i64::from(bounds.width);
        let mut pixels: Vec<(usize, f64)> = samples
            .into_iter()
            .filter(|&(row, col, _)| bounds.contains(row, col))
            .map(|(row, col, weight)| {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let offset = (row * width + col) as usize;
                (offset, weight.clamp(0.0, 1.0))
            })
            .collect();
        pixels.sort_by_key(|&(offset, _)| offset);

        let mut offsets = Vec::with_capacity(pixels.len());
        let mut intensities: Vec<f64> = Vec::with_capacity(pixels.len());
        for (offset, weight) in pixels {
            if offsets.last() == Some(&offset) {
                if let Some(last) = intensities.last_mut() {
                    *last = last.max(weight);
                }
            } else {
                offsets.push(offset);
                intensities.push(weight);
            }
        }

        Self {
            width: bounds.width,
            offsets,
            intensities,
        }
    }

    /// Number of covered pixels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Whether the line covers no pixel of the canvas.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Covered pixels as `(row, col)`, in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let width = self.width as usize;
        self.offsets.iter().map(move |&offset| {
            #[allow(clippy::cast_possible_truncation)]
            let pixel = ((offset / width) as u32, (offset % width) as u32);
            pixel
        })
    }

    /// Coverage weights, parallel to [`pixels`](Self::pixels).
    #[must_use]
    pub fn intensities(&self) -> &[f64] {
        &self.intensities
    }

    /// Reduction in summed squared error against `target` if this line
    /// were drawn onto `canvas` with `strength`.
    ///
    /// Only covered pixels are visited; every other pixel contributes
    /// identically to both sums. Positive means the line helps.
    #[must_use]
    pub fn improvement(&self, canvas: &Plane, target: &Plane, strength: f64) -> f64 {
        debug_assert_eq!(canvas.dimensions(), target.dimensions());
        let canvas = canvas.as_slice();
        let target = target.as_slice();
        self.offsets
            .iter()
            .zip(&self.intensities)
            .map(|(&offset, &weight)| {
                let before = canvas[offset];
                let goal = target[offset];
                let after = darken(before, strength, weight);
                (before - goal).mul_add(before - goal, -(after - goal) * (after - goal))
            })
            .sum()
    }

    /// Draw this line onto `canvas` with `strength`.
    pub fn draw(&self, canvas: &mut Plane, strength: f64) {
        let pixels = canvas.as_mut_slice();
        for (&offset, &weight) in self.offsets.iter().zip(&self.intensities) {
            pixels[offset] = darken(pixels[offset], strength, weight);
        }
    }

    /// Heap bytes held by this geometry.
    #[must_use]
    pub fn heap_size(&self) -> usize {
        self.offsets.capacity() * std::mem::size_of::<usize>()
            + self.intensities.capacity() * std::mem::size_of::<f64>()
    }
}

impl Clone for LineGeometry {
    fn clone(&self) -> Self {
        Self {
            width: self.width,
            offsets: self.offsets.clone(),
            intensities: self.intensities.clone(),
        }
    }

    // Reuses the existing buffers; the search copies its running winner
    // through here.
    fn clone_from(&mut self, source: &Self) {
        self.width = source.width;
        self.offsets.clone_from(&source.offsets);
        self.intensities.clone_from(&source.intensities);
    }
}

/// The line-draw formula: `clamp(value − strength × weight, 0, 1)`.
#[must_use]
pub fn darken(value: f64, strength: f64, weight: f64) -> f64 {
    strength.mul_add(-weight, value).clamp(0.0, 1.0)
}
