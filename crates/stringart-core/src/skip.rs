//! Rules deciding which nail pairs a string may connect.
//!
//! A [`SkipRule`] names the rule and its parameters; a [`SkipPolicy`]
//! binds a rule to a concrete [`NailSet`] and answers `skip(i, j)`.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::nails::NailSet;
use crate::types::{Layout, NailPosition, StringArtError, check_index, validate_min_angle_diff};

/// Which pairs of nails are illegal to connect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "lowercase")]
pub enum SkipRule {
    /// Skip a nail paired with itself and any two nails sharing a row or a
    /// column, i.e. lying on the same side of the rectangle.
    Rectangle,
    /// Skip pairs whose circular angular distance is strictly below
    /// `min_angle_diff` radians. A minimum of exactly zero skips nothing.
    Circle {
        /// Minimum legal angular distance, in `[0, 2π]`.
        min_angle_diff: f64,
    },
}

impl SkipRule {
    /// The rule matching a nail layout. `min_angle_diff` is ignored for
    /// rectangles.
    #[must_use]
    pub const fn for_layout(layout: Layout, min_angle_diff: f64) -> Self {
        match layout {
            Layout::Rectangle => Self::Rectangle,
            Layout::Circle => Self::Circle { min_angle_diff },
        }
    }
}

/// A [`SkipRule`] bound to the nails it judges.
#[derive(Debug, Clone, PartialEq)]
pub struct SkipPolicy {
    bound: Bound,
}

#[derive(Debug, Clone, PartialEq)]
enum Bound {
    Rectangle(Vec<NailPosition>),
    Circle { angles: Vec<f64>, min_angle_diff: f64 },
}

impl SkipPolicy {
    /// Bind `rule` to `nails`.
    ///
    /// # Errors
    ///
    /// Returns [`StringArtError::InvalidArgument`] if a circle rule's
    /// minimum angle lies outside `[0, 2π]` or if a circle rule is bound to
    /// nails without angles.
    pub fn new(rule: SkipRule, nails: &NailSet) -> Result<Self, StringArtError> {
        let bound = match rule {
            SkipRule::Rectangle => Bound::Rectangle(nails.positions().to_vec()),
            SkipRule::Circle { min_angle_diff } => {
                validate_min_angle_diff(min_angle_diff)?;
                let angles = nails.angles().ok_or_else(|| {
                    StringArtError::invalid("the circle skip rule needs nail angles")
                })?;
                Bound::Circle {
                    angles: angles.to_vec(),
                    min_angle_diff,
                }
            }
        };
        Ok(Self { bound })
    }

    /// The bound rule.
    #[must_use]
    pub const fn rule(&self) -> SkipRule {
        match self.bound {
            Bound::Rectangle(_) => SkipRule::Rectangle,
            Bound::Circle { min_angle_diff, .. } => SkipRule::Circle { min_angle_diff },
        }
    }

    /// Number of nails the policy was built for.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.bound {
            Bound::Rectangle(positions) => positions.len(),
            Bound::Circle { angles, .. } => angles.len(),
        }
    }

    /// Always `false`; policies are built from non-empty nail sets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether connecting nails `i` and `j` is illegal.
    ///
    /// # Errors
    ///
    /// Returns [`StringArtError::IndexOutOfRange`] if either index is not a
    /// nail of the bound set.
    pub fn skip(&self, i: usize, j: usize) -> Result<bool, StringArtError> {
        let len = self.len();
        check_index(i, len)?;
        check_index(j, len)?;
        Ok(self.skip_unchecked(i, j))
    }

    /// [`skip`](Self::skip) for indices already known to be in range.
    pub(crate) fn skip_unchecked(&self, i: usize, j: usize) -> bool {
        debug_assert!(i < self.len() && j < self.len());
        match &self.bound {
            Bound::Rectangle(positions) => {
                let (a, b) = (positions[i], positions[j]);
                i == j || a.row == b.row || a.col == b.col
            }
            Bound::Circle { min_angle_diff, .. } if *min_angle_diff == 0.0 => false,
            Bound::Circle {
                angles,
                min_angle_diff,
            } => circular_distance(angles[i], angles[j]) < *min_angle_diff,
        }
    }
}

/// Shortest distance between two angles around the circle, in `[0, π]`.
#[must_use]
pub fn circular_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).abs() % TAU;
    d.min(TAU - d)
}
