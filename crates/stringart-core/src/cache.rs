//! Line geometry caching.
//!
//! Two interchangeable strategies sit behind the [`LineSource`] trait the
//! search pulls geometry from:
//!
//! - [`StandardLines`] asks the [`SkipPolicy`] on every lookup and either
//!   rasterizes directly or memoizes through a [`LazyLineCache`].
//! - [`PrecomputedLines`] rasterizes every legal pair once, up front, and
//!   answers lookups from a table keyed by the unordered pair. A pair
//!   missing from the table is an illegal move.
//!
//! Neither strategy caches the *drawn* line: applying geometry to the
//! canvas always goes through [`LineGeometry::improvement`] and
//! [`LineGeometry::draw`] against the live canvas.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use rayon::prelude::*;

use crate::geometry::LineGeometry;
use crate::nails::NailSet;
use crate::raster::Rasterizer;
use crate::skip::SkipPolicy;
use crate::types::{Dimensions, StringArtError};

/// Where the search gets line geometry from.
pub trait LineSource {
    /// Number of nails this source covers.
    fn nail_count(&self) -> usize;

    /// Geometry of the string from nail `from` to nail `to`, or `None` if
    /// that move is illegal.
    ///
    /// Both indices are below [`nail_count`](Self::nail_count).
    fn line(&mut self, from: usize, to: usize) -> Option<&LineGeometry>;

    /// Cache hit and miss counts, when the source memoizes lazily.
    fn cache_stats(&self) -> Option<CacheStats> {
        None
    }
}

/// Lookup counters for a [`LazyLineCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that had to rasterize.
    pub misses: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct LazyKey {
    from: usize,
    to: usize,
    fingerprint: u64,
    bounds: Dimensions,
}

/// On-demand memoization of line geometry.
///
/// Entries are keyed by the ordered pair, the nail set's content
/// fingerprint, and the canvas bounds, so one cache can safely serve
/// several nail sets. The fingerprint is recomputed on every lookup, which
/// walks the whole nail set. Entries are never evicted; growth is bounded
/// by the number of distinct ordered pairs looked up.
///
/// A cache must only ever be fed by one rasterizer.
#[derive(Debug, Default)]
pub struct LazyLineCache {
    entries: HashMap<LazyKey, LineGeometry>,
    stats: CacheStats,
}

impl LazyLineCache {
    /// An empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Geometry for `from -> to`, rasterizing and storing it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`StringArtError::IndexOutOfRange`] if either index is not a
    /// nail of `nails`.
    pub fn get_or_rasterize<R: Rasterizer + ?Sized>(
        &mut self,
        from: usize,
        to: usize,
        nails: &NailSet,
        bounds: Dimensions,
        rasterizer: &R,
    ) -> Result<&LineGeometry, StringArtError> {
        let a = nails.position(from)?;
        let b = nails.position(to)?;
        let key = LazyKey {
            from,
            to,
            fingerprint: nails.fingerprint(),
            bounds,
        };
        Ok(match self.entries.entry(key) {
            Entry::Occupied(entry) => {
                self.stats.hits += 1;
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                self.stats.misses += 1;
                entry.insert(rasterizer.line(a, b, bounds))
            }
        })
    }

    /// Number of stored lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been stored yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lookup counters since creation or the last [`clear`](Self::clear).
    #[must_use]
    pub const fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Drop every entry and reset the counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.stats = CacheStats::default();
    }
}

/// Line source for the standard pipeline.
///
/// Consults the skip policy on every lookup, then either rasterizes the
/// line from scratch or goes through a borrowed [`LazyLineCache`].
pub struct StandardLines<'a, R: Rasterizer + ?Sized> {
    nails: &'a NailSet,
    skip: &'a SkipPolicy,
    rasterizer: &'a R,
    bounds: Dimensions,
    cache: Option<&'a mut LazyLineCache>,
    scratch: Option<LineGeometry>,
}

impl<'a, R: Rasterizer + ?Sized> StandardLines<'a, R> {
    /// Build a line source over `nails`.
    ///
    /// # Errors
    ///
    /// Returns [`StringArtError::InvalidArgument`] if `skip` was built for
    /// a different number of nails or `bounds` is empty.
    pub fn new(
        nails: &'a NailSet,
        skip: &'a SkipPolicy,
        rasterizer: &'a R,
        bounds: Dimensions,
        cache: Option<&'a mut LazyLineCache>,
    ) -> Result<Self, StringArtError> {
        check_skip_matches(skip, nails)?;
        check_bounds(bounds)?;
        Ok(Self {
            nails,
            skip,
            rasterizer,
            bounds,
            cache,
            scratch: None,
        })
    }
}

impl<R: Rasterizer + ?Sized> LineSource for StandardLines<'_, R> {
    fn nail_count(&self) -> usize {
        self.nails.len()
    }

    fn line(&mut self, from: usize, to: usize) -> Option<&LineGeometry> {
        if self.skip.skip_unchecked(from, to) {
            return None;
        }
        match self.cache.as_deref_mut() {
            Some(cache) => cache
                .get_or_rasterize(from, to, self.nails, self.bounds, self.rasterizer)
                .ok(),
            None => {
                let positions = self.nails.positions();
                let line = self
                    .rasterizer
                    .line(positions[from], positions[to], self.bounds);
                Some(&*self.scratch.insert(line))
            }
        }
    }

    fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_deref().map(LazyLineCache::stats)
    }
}

/// Canonical unordered pair key: `(min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PairKey(usize, usize);

impl PairKey {
    fn new(i: usize, j: usize) -> Self {
        if i <= j { Self(i, j) } else { Self(j, i) }
    }
}

/// Eagerly built table of every legal line.
///
/// Built once from a nail set, skip policy, and string strength; then
/// reusable across searches that share all three. Lookups hash only the
/// two indices.
#[derive(Debug, Clone)]
pub struct PrecomputedLines {
    lines: HashMap<PairKey, LineGeometry>,
    nail_count: usize,
    fingerprint: u64,
    bounds: Dimensions,
    strength: f64,
}

impl PrecomputedLines {
    /// Rasterize every unordered pair `(i, j)`, `i < j`, that `skip`
    /// allows. Pairs are rasterized in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`StringArtError::InvalidArgument`] if `strength` is not a
    /// positive finite number, `bounds` is empty, or `skip` was built for a
    /// different number of nails.
    pub fn build<R: Rasterizer + ?Sized>(
        nails: &NailSet,
        strength: f64,
        bounds: Dimensions,
        skip: &SkipPolicy,
        rasterizer: &R,
    ) -> Result<Self, StringArtError> {
        check_strength(strength)?;
        check_bounds(bounds)?;
        check_skip_matches(skip, nails)?;

        let n = nails.len();
        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
            .filter(|&(i, j)| !skip.skip_unchecked(i, j))
            .collect();
        log::debug!(
            "precomputing {} of {} nail pairs on a {}x{} canvas",
            pairs.len(),
            n * (n - 1) / 2,
            bounds.width,
            bounds.height
        );

        let positions = nails.positions();
        let lines = pairs
            .into_par_iter()
            .map(|(i, j)| {
                (
                    PairKey(i, j),
                    rasterizer.line(positions[i], positions[j], bounds),
                )
            })
            .collect();

        Ok(Self {
            lines,
            nail_count: n,
            fingerprint: nails.fingerprint(),
            bounds,
            strength,
        })
    }

    /// Geometry for the unordered pair `{i, j}`, or `None` if the pair was
    /// skipped (or is out of range).
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> Option<&LineGeometry> {
        self.lines.get(&PairKey::new(i, j))
    }

    /// Whether the pair `{i, j}` has a stored line.
    #[must_use]
    pub fn contains(&self, i: usize, j: usize) -> bool {
        self.lines.contains_key(&PairKey::new(i, j))
    }

    /// Number of stored lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether every pair was skipped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of nails the table was built for.
    #[must_use]
    pub const fn nail_count(&self) -> usize {
        self.nail_count
    }

    /// Canvas bounds the lines were clipped to.
    #[must_use]
    pub const fn bounds(&self) -> Dimensions {
        self.bounds
    }

    /// String strength the table was built for.
    #[must_use]
    pub const fn strength(&self) -> f64 {
        self.strength
    }

    /// Approximate heap bytes held by the stored geometry.
    #[must_use]
    pub fn heap_size(&self) -> usize {
        self.lines.values().map(LineGeometry::heap_size).sum()
    }

    /// Fail unless this table was built for `nails` on a canvas of
    /// `bounds`.
    ///
    /// # Errors
    ///
    /// Returns [`StringArtError::InvalidArgument`] on a mismatch.
    pub fn check_compatible(
        &self,
        nails: &NailSet,
        bounds: Dimensions,
    ) -> Result<(), StringArtError> {
        if self.nail_count != nails.len() || self.fingerprint != nails.fingerprint() {
            return Err(StringArtError::invalid(
                "precomputed line table was built for a different nail set",
            ));
        }
        if self.bounds != bounds {
            return Err(StringArtError::invalid(format!(
                "precomputed line table was built for a {}x{} canvas, not {}x{}",
                self.bounds.width, self.bounds.height, bounds.width, bounds.height
            )));
        }
        Ok(())
    }
}

impl LineSource for &PrecomputedLines {
    fn nail_count(&self) -> usize {
        self.nail_count
    }

    fn line(&mut self, from: usize, to: usize) -> Option<&LineGeometry> {
        if from == to {
            return None;
        }
        self.get(from, to)
    }
}

pub(crate) fn check_strength(strength: f64) -> Result<(), StringArtError> {
    if strength.is_finite() && strength > 0.0 {
        Ok(())
    } else {
        Err(StringArtError::invalid(format!(
            "strength must be a positive finite number; got {strength}"
        )))
    }
}

fn check_bounds(bounds: Dimensions) -> Result<(), StringArtError> {
    if bounds.is_empty() {
        Err(StringArtError::invalid(format!(
            "canvas dimensions must be positive; got {}x{}",
            bounds.width, bounds.height
        )))
    } else {
        Ok(())
    }
}

fn check_skip_matches(skip: &SkipPolicy, nails: &NailSet) -> Result<(), StringArtError> {
    if skip.len() == nails.len() {
        Ok(())
    } else {
        Err(StringArtError::invalid(format!(
            "skip policy covers {} nails but the nail set has {}",
            skip.len(),
            nails.len()
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::layout::circle_nails;
    use crate::raster::RasterizerKind;
    use crate::skip::SkipRule;
    use crate::types::NailPosition;

    const BOUNDS: Dimensions = Dimensions::new(20, 20);

    fn square() -> NailSet {
        NailSet::new(vec![
            NailPosition::new(0, 10),
            NailPosition::new(10, 19),
            NailPosition::new(19, 10),
            NailPosition::new(10, 0),
        ])
        .unwrap()
    }

    fn circle() -> (NailSet, SkipPolicy) {
        let nails = circle_nails(BOUNDS, 16).unwrap();
        let skip = SkipPolicy::new(SkipRule::Circle { min_angle_diff: 0.5 }, &nails).unwrap();
        (nails, skip)
    }

    #[test]
    fn lazy_cache_counts_hits_and_misses() {
        let nails = square();
        let mut cache = LazyLineCache::new();
        let raster = RasterizerKind::Antialiased;
        let first = cache
            .get_or_rasterize(0, 2, &nails, BOUNDS, &raster)
            .unwrap()
            .clone();
        let second = cache
            .get_or_rasterize(0, 2, &nails, BOUNDS, &raster)
            .unwrap()
            .clone();
        assert_eq!(first, second);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });

        // The reverse direction is a distinct key.
        cache.get_or_rasterize(2, 0, &nails, BOUNDS, &raster).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn lazy_cache_separates_nail_sets() {
        let a = square();
        let mut moved = a.positions().to_vec();
        moved[2] = NailPosition::new(19, 5);
        let b = NailSet::new(moved).unwrap();

        let mut cache = LazyLineCache::new();
        let raster = RasterizerKind::Antialiased;
        let line_a = cache.get_or_rasterize(0, 2, &a, BOUNDS, &raster).unwrap().clone();
        let line_b = cache.get_or_rasterize(0, 2, &b, BOUNDS, &raster).unwrap().clone();
        assert_ne!(line_a, line_b);
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn lazy_cache_rejects_bad_index() {
        let mut cache = LazyLineCache::new();
        let result = cache.get_or_rasterize(0, 9, &square(), BOUNDS, &RasterizerKind::Antialiased);
        assert!(matches!(
            result,
            Err(StringArtError::IndexOutOfRange { index: 9, len: 4 })
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_resets_cache() {
        let mut cache = LazyLineCache::new();
        cache
            .get_or_rasterize(1, 3, &square(), BOUNDS, &RasterizerKind::Antialiased)
            .unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn precomputed_table_skips_illegal_pairs() {
        let (nails, skip) = circle();
        let table =
            PrecomputedLines::build(&nails, 0.1, BOUNDS, &skip, &RasterizerKind::Antialiased)
                .unwrap();
        for i in 0..nails.len() {
            for j in 0..nails.len() {
                if i != j {
                    assert_eq!(table.contains(i, j), !skip.skip(i, j).unwrap(), "{i} {j}");
                }
            }
        }
        // Neighbours are 2π/16 ≈ 0.39 apart, below the 0.5 minimum.
        assert!(!table.contains(0, 1));
        assert!(table.contains(0, 2));
    }

    #[test]
    fn precomputed_lookup_is_order_independent() {
        let (nails, skip) = circle();
        let table =
            PrecomputedLines::build(&nails, 0.1, BOUNDS, &skip, &RasterizerKind::Antialiased)
                .unwrap();
        assert_eq!(table.get(3, 9), table.get(9, 3));
        assert!(table.get(3, 9).is_some());
    }

    #[test]
    fn lazy_and_precomputed_agree() {
        let (nails, skip) = circle();
        let raster = RasterizerKind::Antialiased;
        let table = PrecomputedLines::build(&nails, 0.1, BOUNDS, &skip, &raster).unwrap();
        let mut cache = LazyLineCache::new();
        for i in 0..nails.len() {
            for j in 0..nails.len() {
                if let Some(eager) = table.get(i, j) {
                    let lazy = cache.get_or_rasterize(i, j, &nails, BOUNDS, &raster).unwrap();
                    assert_eq!(lazy, eager, "{i} {j}");
                }
            }
        }
    }

    #[test]
    fn precomputed_build_validates_inputs() {
        let (nails, skip) = circle();
        let raster = RasterizerKind::Antialiased;
        assert!(PrecomputedLines::build(&nails, 0.0, BOUNDS, &skip, &raster).is_err());
        assert!(PrecomputedLines::build(&nails, f64::NAN, BOUNDS, &skip, &raster).is_err());
        assert!(
            PrecomputedLines::build(&nails, 0.1, Dimensions::new(0, 20), &skip, &raster).is_err()
        );
        let other = SkipPolicy::new(SkipRule::Rectangle, &square()).unwrap();
        assert!(PrecomputedLines::build(&nails, 0.1, BOUNDS, &other, &raster).is_err());
    }

    #[test]
    fn compatibility_check_catches_other_nails_and_bounds() {
        let (nails, skip) = circle();
        let table =
            PrecomputedLines::build(&nails, 0.1, BOUNDS, &skip, &RasterizerKind::Antialiased)
                .unwrap();
        assert!(table.check_compatible(&nails, BOUNDS).is_ok());
        assert!(table.check_compatible(&square(), BOUNDS).is_err());
        assert!(table.check_compatible(&nails, Dimensions::new(21, 20)).is_err());
    }

    #[test]
    fn standard_lines_honour_skip_policy() {
        let nails = square();
        let skip = SkipPolicy::new(SkipRule::Rectangle, &nails).unwrap();
        let raster = RasterizerKind::Antialiased;
        let mut lines = StandardLines::new(&nails, &skip, &raster, BOUNDS, None).unwrap();
        assert!(lines.line(0, 0).is_none());
        assert!(lines.line(0, 2).is_some());
        assert!(lines.cache_stats().is_none());
    }

    #[test]
    fn standard_lines_with_cache_report_stats() {
        let nails = square();
        let skip = SkipPolicy::new(SkipRule::Rectangle, &nails).unwrap();
        let raster = RasterizerKind::Antialiased;
        let mut cache = LazyLineCache::new();
        let mut lines =
            StandardLines::new(&nails, &skip, &raster, BOUNDS, Some(&mut cache)).unwrap();
        lines.line(1, 3);
        lines.line(1, 3);
        assert_eq!(lines.cache_stats(), Some(CacheStats { hits: 1, misses: 1 }));
    }
}
