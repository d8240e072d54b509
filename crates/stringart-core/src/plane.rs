//! Floating-point grayscale planes used for the canvas and the target.
//!
//! Values are intensities in `[0, 1]` with `1.0` meaning white. Storage is
//! row-major, so pixel `(row, col)` lives at `row * width + col`.

use image::{GrayImage, Luma};

use crate::types::{Dimensions, StringArtError};

/// A row-major 2D matrix of `f64` intensities.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    dimensions: Dimensions,
    data: Vec<f64>,
}

impl Plane {
    /// A plane filled with `value`.
    #[must_use]
    pub fn filled(dimensions: Dimensions, value: f64) -> Self {
        Self {
            dimensions,
            data: vec![value; dimensions.pixel_count()],
        }
    }

    /// An all-white (all-ones) plane, the blank string art canvas.
    #[must_use]
    pub fn white(dimensions: Dimensions) -> Self {
        Self::filled(dimensions, 1.0)
    }

    /// Wrap row-major `data` as a plane.
    ///
    /// # Errors
    ///
    /// Returns [`StringArtError::InvalidArgument`] if the length of `data`
    /// does not match `dimensions`, if the plane is empty, or if any value
    /// lies outside `[0, 1]`.
    pub fn from_vec(dimensions: Dimensions, data: Vec<f64>) -> Result<Self, StringArtError> {
        if dimensions.is_empty() {
            return Err(StringArtError::invalid(format!(
                "plane must be non-empty; got {}x{}",
                dimensions.width, dimensions.height
            )));
        }
        if data.len() != dimensions.pixel_count() {
            return Err(StringArtError::invalid(format!(
                "plane data has {} values but {}x{} needs {}",
                data.len(),
                dimensions.width,
                dimensions.height,
                dimensions.pixel_count()
            )));
        }
        let plane = Self { dimensions, data };
        plane.check_unit_range()?;
        Ok(plane)
    }

    /// Convert an 8-bit grayscale image, mapping `0..=255` onto `[0, 1]`.
    #[must_use]
    pub fn from_gray_image(image: &GrayImage) -> Self {
        Self {
            dimensions: Dimensions::new(image.width(), image.height()),
            data: image
                .pixels()
                .map(|p| f64::from(p.0[0]) / 255.0)
                .collect(),
        }
    }

    /// Quantize to an 8-bit grayscale image (values are clamped first).
    #[must_use]
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.dimensions.width, self.dimensions.height, |x, y| {
            let v = self.data[self.offset(y, x)].clamp(0.0, 1.0);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let byte = (v * 255.0).round() as u8;
            Luma([byte])
        })
    }

    /// Width and height.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Row-major pixel values.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Mutable row-major pixel values.
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Value at `(row, col)`, or `None` outside the plane.
    #[must_use]
    pub fn get(&self, row: u32, col: u32) -> Option<f64> {
        (row < self.dimensions.height && col < self.dimensions.width)
            .then(|| self.data[self.offset(row, col)])
    }

    /// Fail unless every value lies in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`StringArtError::InvalidArgument`] naming the first bad
    /// value.
    pub fn check_unit_range(&self) -> Result<(), StringArtError> {
        match self
            .data
            .iter()
            .position(|v| !(0.0..=1.0).contains(v))
        {
            None => Ok(()),
            Some(i) => Err(StringArtError::invalid(format!(
                "plane values must be in [0, 1]; found {} at offset {i}",
                self.data[i]
            ))),
        }
    }

    /// Mean squared error against `other`.
    ///
    /// Both planes must have the same dimensions.
    #[must_use]
    pub fn mse(&self, other: &Self) -> f64 {
        debug_assert_eq!(self.dimensions, other.dimensions);
        if self.data.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        #[allow(clippy::cast_precision_loss)]
        let n = self.data.len() as f64;
        sum / n
    }

    fn offset(&self, row: u32, col: u32) -> usize {
        row as usize * self.dimensions.width as usize + col as usize
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn white_plane_is_all_ones() {
        let plane = Plane::white(Dimensions::new(3, 2));
        assert_eq!(plane.as_slice().len(), 6);
        assert!(plane.as_slice().iter().all(|&v| (v - 1.0).abs() < f64::EPSILON));
    }

    #[test]
    fn from_vec_rejects_length_mismatch() {
        let result = Plane::from_vec(Dimensions::new(2, 2), vec![0.0; 3]);
        assert!(matches!(result, Err(StringArtError::InvalidArgument(_))));
    }

    #[test]
    fn from_vec_rejects_out_of_range_values() {
        let result = Plane::from_vec(Dimensions::new(2, 1), vec![0.5, 1.5]);
        assert!(matches!(result, Err(StringArtError::InvalidArgument(_))));
        let result = Plane::from_vec(Dimensions::new(2, 1), vec![f64::NAN, 0.5]);
        assert!(result.is_err());
    }

    #[test]
    fn from_vec_rejects_empty_plane() {
        let result = Plane::from_vec(Dimensions::new(0, 3), Vec::new());
        assert!(matches!(result, Err(StringArtError::InvalidArgument(_))));
    }

    #[test]
    fn get_is_row_major() {
        let plane = Plane::from_vec(Dimensions::new(3, 2), vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5])
            .unwrap();
        assert!((plane.get(1, 2).unwrap() - 0.5).abs() < f64::EPSILON);
        assert!((plane.get(0, 1).unwrap() - 0.1).abs() < f64::EPSILON);
        assert!(plane.get(2, 0).is_none());
        assert!(plane.get(0, 3).is_none());
    }

    #[test]
    fn mse_of_white_against_black_is_one() {
        let dims = Dimensions::new(4, 4);
        let white = Plane::white(dims);
        let black = Plane::filled(dims, 0.0);
        assert!((white.mse(&black) - 1.0).abs() < f64::EPSILON);
        assert!(white.mse(&white).abs() < f64::EPSILON);
    }

    #[test]
    fn gray_image_round_trip_preserves_extremes() {
        let mut img = GrayImage::new(2, 1);
        img.put_pixel(0, 0, Luma([0]));
        img.put_pixel(1, 0, Luma([255]));
        let plane = Plane::from_gray_image(&img);
        assert!(plane.get(0, 0).unwrap().abs() < f64::EPSILON);
        assert!((plane.get(0, 1).unwrap() - 1.0).abs() < f64::EPSILON);
        assert_eq!(plane.to_gray_image(), img);
    }
}
