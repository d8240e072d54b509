//! The ordered set of nails a string can be anchored to.

use std::f64::consts::TAU;
use std::hash::{Hash, Hasher};

use siphasher::sip::SipHasher13;

use crate::types::{NailPosition, StringArtError};

/// Ordered nail positions, plus their angles for circular layouts.
///
/// Immutable once built. Nail `i` is `positions()[i]`; when angles are
/// present, `angles()[i]` is the angle of the same nail in radians.
#[derive(Debug, Clone, PartialEq)]
pub struct NailSet {
    positions: Vec<NailPosition>,
    angles: Option<Vec<f64>>,
}

impl NailSet {
    /// Build a nail set without angles.
    ///
    /// # Errors
    ///
    /// Returns [`StringArtError::InvalidArgument`] if fewer than two
    /// positions are given.
    pub fn new(positions: Vec<NailPosition>) -> Result<Self, StringArtError> {
        if positions.len() < 2 {
            return Err(StringArtError::invalid(format!(
                "a nail set needs at least 2 nails; got {}",
                positions.len()
            )));
        }
        Ok(Self {
            positions,
            angles: None,
        })
    }

    /// Build a nail set with one angle per nail.
    ///
    /// # Errors
    ///
    /// Returns [`StringArtError::InvalidArgument`] if fewer than two
    /// positions are given, if the lengths differ, or if an angle lies
    /// outside `[0, 2π)`.
    pub fn with_angles(
        positions: Vec<NailPosition>,
        angles: Vec<f64>,
    ) -> Result<Self, StringArtError> {
        let mut set = Self::new(positions)?;
        if angles.len() != set.positions.len() {
            return Err(StringArtError::invalid(format!(
                "got {} angles for {} nails",
                angles.len(),
                set.positions.len()
            )));
        }
        if let Some(bad) = angles.iter().find(|a| !(0.0..TAU).contains(*a)) {
            return Err(StringArtError::invalid(format!(
                "nail angles must be in [0, 2*pi); got {bad}"
            )));
        }
        set.angles = Some(angles);
        Ok(set)
    }

    /// Number of nails.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Always `false`; a nail set holds at least two nails.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Nail positions in index order.
    #[must_use]
    pub fn positions(&self) -> &[NailPosition] {
        &self.positions
    }

    /// Nail angles in index order, if this is a circular layout.
    #[must_use]
    pub fn angles(&self) -> Option<&[f64]> {
        self.angles.as_deref()
    }

    /// Position of nail `index`.
    ///
    /// # Errors
    ///
    /// Returns [`StringArtError::IndexOutOfRange`] for a bad index.
    pub fn position(&self, index: usize) -> Result<NailPosition, StringArtError> {
        self.positions
            .get(index)
            .copied()
            .ok_or(StringArtError::IndexOutOfRange {
                index,
                len: self.positions.len(),
            })
    }

    /// Content fingerprint over every position and angle.
    ///
    /// Two nail sets with the same content have the same fingerprint.
    /// Computing it walks the whole set.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = SipHasher13::new();
        self.positions.hash(&mut hasher);
        if let Some(angles) = &self.angles {
            angles.len().hash(&mut hasher);
            for angle in angles {
                angle.to_bits().hash(&mut hasher);
            }
        }
        hasher.finish()
    }
}
