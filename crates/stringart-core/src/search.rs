//! Greedy nail sequence search.
//!
//! Starting from nail 0 on a blank canvas, every iteration tries every
//! legal string leaving the current nail, keeps the one that lowers the
//! squared error against the target the most, draws it, and moves to its
//! far nail. A string is only a candidate when its improvement beats
//! [`MIN_ACCEPTED_IMPROVEMENT`]. The search stops when it runs out of
//! iterations, when no candidate string exists, when improvements stay below `epsilon` for
//! `patience` iterations in a row, or when an observer cancels it.
//!
//! The iteration that exhausts the patience is *not* committed: its
//! winning string is dropped along with the decision to stop.
//!
//! Two pipelines wrap the state machine:
//!
//! - [`search`] looks up geometry per iteration, either rasterizing from
//!   scratch or through a [`LazyLineCache`].
//! - [`search_precomputed`] looks up geometry in a [`PrecomputedLines`]
//!   table, built on the spot or supplied by the caller.

use std::fmt;
use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};

use crate::cache::{
    CacheStats, LazyLineCache, LineSource, PrecomputedLines, StandardLines, check_strength,
};
use crate::geometry::LineGeometry;
use crate::nails::NailSet;
use crate::plane::Plane;
use crate::raster::Rasterizer;
use crate::skip::{SkipPolicy, SkipRule};
use crate::types::StringArtError;

const MAX_PREALLOCATED_STEPS: usize = 1 << 16;

/// Improvement a string must strictly exceed to be chosen at all.
///
/// Slightly harmful strings still count as moves (and as stale
/// iterations), but an iteration whose best string would raise the summed
/// squared error by 1 or more stops the search without drawing it.
pub const MIN_ACCEPTED_IMPROVEMENT: f64 = -1.0;

/// Tuning knobs of one search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Darkening applied by one string over a pixel of full coverage.
    pub strength: f64,
    /// Upper bound on the number of committed strings.
    pub max_iterations: usize,
    /// Consecutive below-`epsilon` iterations that stop the search. Zero
    /// stops at the first iteration.
    pub patience: usize,
    /// Smallest improvement in summed squared error counted as progress.
    pub epsilon: f64,
}

impl SearchParams {
    /// Check every field against its legal range.
    ///
    /// # Errors
    ///
    /// Returns [`StringArtError::InvalidArgument`] if `strength` or
    /// `epsilon` is not a positive finite number, or `max_iterations` is 0.
    pub fn validate(&self) -> Result<(), StringArtError> {
        check_strength(self.strength)?;
        if self.max_iterations == 0 {
            return Err(StringArtError::invalid("max_iterations must be positive"));
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(StringArtError::invalid(format!(
                "epsilon must be a positive finite number; got {}",
                self.epsilon
            )));
        }
        Ok(())
    }
}

/// Why a search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// `max_iterations` strings were committed.
    MaxIterationsReached,
    /// No legal string leaving the current nail improves on
    /// [`MIN_ACCEPTED_IMPROVEMENT`], or none exists at all.
    NoLegalMove,
    /// Improvements stayed below `epsilon` for `patience` iterations.
    PatienceExhausted,
    /// A [`SearchObserver`] asked to stop.
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxIterationsReached => f.write_str("max iterations reached"),
            Self::NoLegalMove => f.write_str("no legal move"),
            Self::PatienceExhausted => f.write_str("patience exhausted"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Lifecycle of a [`GreedySearch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    /// More iterations may run.
    Running,
    /// The search is over.
    Terminated(StopReason),
}

/// Snapshot handed to a [`SearchObserver`] before each iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// 1-based number of the iteration about to run.
    pub iteration: usize,
    /// Strings committed so far.
    pub committed_steps: usize,
    /// Nail the next string will leave from.
    pub current_nail: usize,
    /// Mean squared error of the canvas against the target.
    pub mse: f64,
    /// Iteration bound of this search.
    pub max_iterations: usize,
}

/// Per-iteration hook, also the cooperative cancellation point.
pub trait SearchObserver {
    /// Called before every iteration. Returning
    /// [`ControlFlow::Break`] stops the search with
    /// [`StopReason::Cancelled`], keeping everything committed so far.
    fn on_iteration(&mut self, progress: &Progress) -> ControlFlow<()>;
}

impl<F: FnMut(&Progress) -> ControlFlow<()>> SearchObserver for F {
    fn on_iteration(&mut self, progress: &Progress) -> ControlFlow<()> {
        self(progress)
    }
}

/// Observer that never interrupts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SearchObserver for NoopObserver {
    fn on_iteration(&mut self, _progress: &Progress) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

/// Work counters of one search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Iterations started, including the one that tripped a stop.
    pub iterations: usize,
    /// Candidate strings scored.
    pub candidate_evaluations: u64,
    /// Lazy cache counters, when a lazy cache was used.
    pub cache: Option<CacheStats>,
}

/// What a finished search hands back.
///
/// `sequence` and `errors` hold exactly one entry per committed step plus
/// the initial entry: `sequence[0]` is nail 0 and `errors[0]` is the MSE
/// of the blank canvas.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Visited nails, in order.
    pub sequence: Vec<usize>,
    /// The canvas after every committed string.
    pub canvas: Plane,
    /// MSE against the target after each committed step.
    pub errors: Vec<f64>,
    /// Why the search stopped.
    pub reason: StopReason,
    /// Work counters.
    pub stats: SearchStats,
}

impl SearchOutcome {
    /// Number of strings drawn.
    #[must_use]
    pub fn committed_steps(&self) -> usize {
        self.sequence.len().saturating_sub(1)
    }
}

/// The greedy search state machine.
#[derive(Debug)]
pub struct GreedySearch<'t> {
    target: &'t Plane,
    canvas: Plane,
    params: SearchParams,
    current: usize,
    stale: usize,
    sequence: Vec<usize>,
    errors: Vec<f64>,
    state: SearchState,
    stats: SearchStats,
    winner: LineGeometry,
}

impl<'t> GreedySearch<'t> {
    /// Start a search at nail 0.
    ///
    /// # Errors
    ///
    /// Returns [`StringArtError::InvalidArgument`] if `params` are out of
    /// range, the planes differ in size, or either plane holds values
    /// outside `[0, 1]`.
    pub fn new(
        canvas: Plane,
        target: &'t Plane,
        params: SearchParams,
    ) -> Result<Self, StringArtError> {
        params.validate()?;
        if canvas.dimensions() != target.dimensions() {
            let (c, t) = (canvas.dimensions(), target.dimensions());
            return Err(StringArtError::invalid(format!(
                "canvas is {}x{} but target is {}x{}",
                c.width, c.height, t.width, t.height
            )));
        }
        if canvas.dimensions().is_empty() {
            return Err(StringArtError::invalid("canvas must be non-empty"));
        }
        canvas.check_unit_range()?;
        target.check_unit_range()?;

        let initial = canvas.mse(target);
        let capacity = params.max_iterations.min(MAX_PREALLOCATED_STEPS) + 1;
        let mut sequence = Vec::with_capacity(capacity);
        let mut errors = Vec::with_capacity(capacity);
        sequence.push(0);
        errors.push(initial);

        Ok(Self {
            target,
            canvas,
            params,
            current: 0,
            stale: 0,
            sequence,
            errors,
            state: SearchState::Running,
            stats: SearchStats::default(),
            winner: LineGeometry::default(),
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SearchState {
        self.state
    }

    /// The canvas as drawn so far.
    #[must_use]
    pub const fn canvas(&self) -> &Plane {
        &self.canvas
    }

    /// Nails visited so far.
    #[must_use]
    pub fn sequence(&self) -> &[usize] {
        &self.sequence
    }

    /// MSE trace so far.
    #[must_use]
    pub fn errors(&self) -> &[f64] {
        &self.errors
    }

    /// Strings committed so far.
    #[must_use]
    pub fn committed_steps(&self) -> usize {
        self.sequence.len() - 1
    }

    /// Observer snapshot of the next iteration.
    #[must_use]
    pub fn progress(&self) -> Progress {
        Progress {
            iteration: self.stats.iterations + 1,
            committed_steps: self.committed_steps(),
            current_nail: self.current,
            mse: self.errors.last().copied().unwrap_or_default(),
            max_iterations: self.params.max_iterations,
        }
    }

    /// Run one iteration against `lines`.
    ///
    /// Does nothing once terminated.
    pub fn step<S: LineSource + ?Sized>(&mut self, lines: &mut S) -> SearchState {
        if self.state != SearchState::Running {
            return self.state;
        }
        if self.committed_steps() >= self.params.max_iterations {
            return self.terminate(StopReason::MaxIterationsReached);
        }
        self.stats.iterations += 1;

        let from = self.current;
        if from >= lines.nail_count() {
            return self.terminate(StopReason::NoLegalMove);
        }

        // Each candidate is looked up exactly once; the running winner's
        // geometry is kept in `self.winner` for the draw below.
        let mut best: Option<(usize, f64)> = None;
        for to in 0..lines.nail_count() {
            if to == from {
                continue;
            }
            let Some(line) = lines.line(from, to) else {
                continue;
            };
            self.stats.candidate_evaluations += 1;
            let gain = line.improvement(&self.canvas, self.target, self.params.strength);
            // Strict comparison keeps the lowest index on ties.
            if gain > best.map_or(MIN_ACCEPTED_IMPROVEMENT, |(_, top)| top) {
                best = Some((to, gain));
                self.winner.clone_from(line);
            }
        }

        let Some((next, gain)) = best else {
            log::info!(
                "no string leaving nail {from} improves on {MIN_ACCEPTED_IMPROVEMENT}; stopping"
            );
            return self.terminate(StopReason::NoLegalMove);
        };

        if gain < self.params.epsilon {
            self.stale += 1;
        } else {
            self.stale = 0;
        }
        if self.stale >= self.params.patience {
            log::info!(
                "improvement below {} for {} iterations; stopping after {} strings",
                self.params.epsilon,
                self.stale,
                self.committed_steps()
            );
            return self.terminate(StopReason::PatienceExhausted);
        }

        self.winner.draw(&mut self.canvas, self.params.strength);
        self.current = next;
        self.sequence.push(next);
        self.errors.push(self.canvas.mse(self.target));
        SearchState::Running
    }

    /// Iterate until termination, consulting `observer` before each
    /// iteration.
    pub fn run<S, O>(mut self, lines: &mut S, observer: &mut O) -> SearchOutcome
    where
        S: LineSource + ?Sized,
        O: SearchObserver + ?Sized,
    {
        while self.state == SearchState::Running {
            if self.committed_steps() >= self.params.max_iterations {
                self.terminate(StopReason::MaxIterationsReached);
                break;
            }
            if observer.on_iteration(&self.progress()).is_break() {
                log::info!("search cancelled after {} strings", self.committed_steps());
                self.terminate(StopReason::Cancelled);
                break;
            }
            self.step(lines);
        }
        self.stats.cache = lines.cache_stats();
        self.finish()
    }

    /// Stop now (if still running) and hand back the results.
    #[must_use]
    pub fn finish(mut self) -> SearchOutcome {
        let reason = match self.state {
            SearchState::Terminated(reason) => reason,
            SearchState::Running => {
                self.state = SearchState::Terminated(StopReason::Cancelled);
                StopReason::Cancelled
            }
        };
        SearchOutcome {
            sequence: self.sequence,
            canvas: self.canvas,
            errors: self.errors,
            reason,
            stats: self.stats,
        }
    }

    fn terminate(&mut self, reason: StopReason) -> SearchState {
        self.state = SearchState::Terminated(reason);
        self.state
    }
}

/// Everything a pipeline needs besides its geometry source.
#[derive(Debug, Clone)]
pub struct SearchInput<'a> {
    /// Starting canvas, usually [`Plane::white`].
    pub canvas: Plane,
    /// Image to approximate.
    pub target: &'a Plane,
    /// Nails the strings run between.
    pub nails: &'a NailSet,
    /// Which nail pairs are illegal.
    pub skip_rule: SkipRule,
    /// Search tuning.
    pub params: SearchParams,
}

/// Standard pipeline: geometry is fetched per iteration, through
/// `cache` when given, otherwise rasterized from scratch every time.
///
/// # Errors
///
/// Returns [`StringArtError::InvalidArgument`] for invalid parameters,
/// mismatched planes, or a skip rule that does not fit the nails.
pub fn search<R, O>(
    input: SearchInput<'_>,
    rasterizer: &R,
    cache: Option<&mut LazyLineCache>,
    observer: &mut O,
) -> Result<SearchOutcome, StringArtError>
where
    R: Rasterizer + ?Sized,
    O: SearchObserver + ?Sized,
{
    let skip = SkipPolicy::new(input.skip_rule, input.nails)?;
    let bounds = input.canvas.dimensions();
    let engine = GreedySearch::new(input.canvas, input.target, input.params)?;
    let mut lines = StandardLines::new(input.nails, &skip, rasterizer, bounds, cache)?;
    Ok(engine.run(&mut lines, observer))
}

/// Precache pipeline: every lookup is a table hit.
///
/// Uses `table` when given, after checking it was built for the same nails
/// and canvas size. Otherwise builds one from `input.skip_rule` first.
///
/// # Errors
///
/// Returns [`StringArtError::InvalidArgument`] for invalid parameters,
/// mismatched planes, a skip rule that does not fit the nails, or a table
/// built for other nails or another canvas size.
pub fn search_precomputed<R, O>(
    input: SearchInput<'_>,
    rasterizer: &R,
    table: Option<&PrecomputedLines>,
    observer: &mut O,
) -> Result<SearchOutcome, StringArtError>
where
    R: Rasterizer + ?Sized,
    O: SearchObserver + ?Sized,
{
    let skip = SkipPolicy::new(input.skip_rule, input.nails)?;
    let bounds = input.canvas.dimensions();
    let strength = input.params.strength;
    let engine = GreedySearch::new(input.canvas, input.target, input.params)?;

    let built;
    let mut lines = match table {
        Some(table) => {
            table.check_compatible(input.nails, bounds)?;
            if (table.strength() - strength).abs() > f64::EPSILON {
                log::warn!(
                    "line table was built for strength {} but the search uses {}",
                    table.strength(),
                    strength
                );
            }
            table
        }
        None => {
            built = PrecomputedLines::build(input.nails, strength, bounds, &skip, rasterizer)?;
            &built
        }
    };
    Ok(engine.run(&mut lines, observer))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::raster::RasterizerKind;
    use crate::types::{Dimensions, NailPosition};

    const DIMS: Dimensions = Dimensions::new(20, 20);

    fn params(max_iterations: usize) -> SearchParams {
        SearchParams {
            strength: 0.5,
            max_iterations,
            patience: 20,
            epsilon: 1e-6,
        }
    }

    fn square() -> NailSet {
        NailSet::new(vec![
            NailPosition::new(0, 10),
            NailPosition::new(10, 19),
            NailPosition::new(19, 10),
            NailPosition::new(10, 0),
        ])
        .unwrap()
    }

    fn black() -> Plane {
        Plane::filled(DIMS, 0.0)
    }

    /// Two nails; the k-th lookup serves the k-th scripted geometry.
    struct Scripted {
        lines: Vec<LineGeometry>,
        calls: usize,
    }

    impl Scripted {
        fn new(lines: Vec<LineGeometry>) -> Self {
            Self { lines, calls: 0 }
        }
    }

    impl LineSource for Scripted {
        fn nail_count(&self) -> usize {
            2
        }

        fn line(&mut self, _from: usize, _to: usize) -> Option<&LineGeometry> {
            let k = self.calls;
            self.calls += 1;
            self.lines.get(k)
        }
    }

    struct Counting<'a, S> {
        inner: &'a mut S,
        calls: u64,
    }

    impl<S: LineSource> LineSource for Counting<'_, S> {
        fn nail_count(&self) -> usize {
            self.inner.nail_count()
        }

        fn line(&mut self, from: usize, to: usize) -> Option<&LineGeometry> {
            self.calls += 1;
            self.inner.line(from, to)
        }
    }

    fn input<'a>(target: &'a Plane, nails: &'a NailSet, params: SearchParams) -> SearchInput<'a> {
        SearchInput {
            canvas: Plane::white(DIMS),
            target,
            nails,
            skip_rule: SkipRule::Rectangle,
            params,
        }
    }

    #[test]
    fn params_validation() {
        assert!(params(10).validate().is_ok());
        assert!(params(0).validate().is_err());
        assert!(SearchParams { strength: 0.0, ..params(1) }.validate().is_err());
        assert!(SearchParams { strength: f64::INFINITY, ..params(1) }.validate().is_err());
        assert!(SearchParams { epsilon: 0.0, ..params(1) }.validate().is_err());
        assert!(SearchParams { epsilon: -1.0, ..params(1) }.validate().is_err());
    }

    #[test]
    fn new_rejects_mismatched_planes() {
        let target = Plane::filled(Dimensions::new(5, 5), 0.0);
        let result = GreedySearch::new(Plane::white(DIMS), &target, params(5));
        assert!(matches!(result, Err(StringArtError::InvalidArgument(_))));
    }

    #[test]
    fn initial_entry_is_nail_zero_on_blank_canvas() {
        let target = black();
        let engine = GreedySearch::new(Plane::white(DIMS), &target, params(5)).unwrap();
        assert_eq!(engine.sequence(), &[0]);
        assert!((engine.errors()[0] - 1.0).abs() < f64::EPSILON);
        assert_eq!(engine.state(), SearchState::Running);
    }

    #[test]
    fn stops_at_max_iterations() {
        let target = black();
        let nails = square();
        let outcome = search(
            input(&target, &nails, params(3)),
            &RasterizerKind::Antialiased,
            None,
            &mut NoopObserver,
        )
        .unwrap();
        assert_eq!(outcome.reason, StopReason::MaxIterationsReached);
        assert_eq!(outcome.sequence.len(), 4);
        assert_eq!(outcome.errors.len(), 4);
        assert_eq!(outcome.committed_steps(), 3);
    }

    #[test]
    fn first_move_breaks_ties_toward_lowest_index() {
        // Nails 1 and 3 mirror each other about nail 0's column, so both
        // strings cover the same number of full-coverage pixels and score
        // exactly the same on a white target. Nail 2 shares nail 0's column
        // and covers more pixels. A light strength keeps every loss above
        // the acceptance floor.
        let dims = Dimensions::new(21, 21);
        let nails = NailSet::new(vec![
            NailPosition::new(0, 10),
            NailPosition::new(10, 20),
            NailPosition::new(20, 10),
            NailPosition::new(10, 0),
        ])
        .unwrap();
        let target = Plane::white(dims);
        let outcome = search(
            SearchInput {
                canvas: Plane::white(dims),
                target: &target,
                nails: &nails,
                skip_rule: SkipRule::Rectangle,
                params: SearchParams { strength: 0.1, ..params(1) },
            },
            &RasterizerKind::Aliased,
            None,
            &mut NoopObserver,
        )
        .unwrap();
        assert_eq!(outcome.sequence, vec![0, 1]);
        assert_eq!(outcome.reason, StopReason::MaxIterationsReached);
    }

    #[test]
    fn white_target_on_white_canvas_draws_nothing() {
        // Every string would only darken an already perfect canvas, by far
        // more than the acceptance floor allows.
        let target = Plane::white(DIMS);
        let nails = square();
        let outcome = search(
            input(&target, &nails, SearchParams { strength: 1.0, ..params(10) }),
            &RasterizerKind::Antialiased,
            None,
            &mut NoopObserver,
        )
        .unwrap();
        assert_eq!(outcome.sequence, vec![0]);
        assert_eq!(outcome.errors, vec![0.0]);
        assert_eq!(outcome.reason, StopReason::NoLegalMove);
        assert_eq!(outcome.stats.iterations, 1);
        assert_eq!(outcome.stats.candidate_evaluations, 3);
        assert_eq!(outcome.canvas, Plane::white(DIMS));
    }

    #[test]
    fn slightly_harmful_string_is_still_drawn() {
        // One pixel, weight 0.5, strength 0.4 on a white target: the
        // string costs 0.04, well above the floor.
        let dims = Dimensions::new(2, 1);
        let target = Plane::white(dims);
        let mut lines = Scripted::new(vec![LineGeometry::from_samples([(0, 0, 0.5)], dims)]);
        let p = SearchParams { strength: 0.4, ..params(1) };
        let mut engine = GreedySearch::new(Plane::white(dims), &target, p).unwrap();
        assert_eq!(engine.step(&mut lines), SearchState::Running);
        assert_eq!(engine.sequence(), &[0, 1]);
        assert!((engine.canvas().get(0, 0).unwrap() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn string_at_the_floor_is_rejected() {
        // A full-coverage black string on one white pixel of a white
        // target raises the summed error by exactly 1.
        let dims = Dimensions::new(2, 1);
        let target = Plane::white(dims);
        let mut lines = Scripted::new(vec![LineGeometry::from_samples([(0, 1, 1.0)], dims)]);
        let p = SearchParams { strength: 1.0, ..params(5) };
        let mut engine = GreedySearch::new(Plane::white(dims), &target, p).unwrap();
        assert_eq!(
            engine.step(&mut lines),
            SearchState::Terminated(StopReason::NoLegalMove)
        );
        assert_eq!(engine.sequence(), &[0]);
        assert_eq!(engine.canvas(), &Plane::white(dims));
    }

    #[test]
    fn each_candidate_is_fetched_once_per_iteration() {
        let target = black();
        let nails = square();
        let skip = SkipPolicy::new(SkipRule::Rectangle, &nails).unwrap();
        let raster = RasterizerKind::Antialiased;
        let mut inner = StandardLines::new(&nails, &skip, &raster, DIMS, None).unwrap();
        let mut lines = Counting { inner: &mut inner, calls: 0 };
        let outcome = GreedySearch::new(Plane::white(DIMS), &target, params(5))
            .unwrap()
            .run(&mut lines, &mut NoopObserver);
        assert_eq!(outcome.committed_steps(), 5);
        assert_eq!(lines.calls, outcome.stats.candidate_evaluations);
    }

    #[test]
    fn patience_zero_stops_before_drawing() {
        let target = black();
        let nails = square();
        let outcome = search(
            input(&target, &nails, SearchParams { patience: 0, ..params(10) }),
            &RasterizerKind::Antialiased,
            None,
            &mut NoopObserver,
        )
        .unwrap();
        assert_eq!(outcome.reason, StopReason::PatienceExhausted);
        assert_eq!(outcome.sequence, vec![0]);
        assert_eq!(outcome.stats.iterations, 1);
    }

    #[test]
    fn observer_can_cancel() {
        let target = black();
        let nails = square();
        let mut seen = Vec::new();
        let mut observer = |progress: &Progress| {
            seen.push(progress.iteration);
            if progress.committed_steps == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        };
        let outcome = search(
            input(&target, &nails, params(10)),
            &RasterizerKind::Antialiased,
            None,
            &mut observer,
        )
        .unwrap();
        assert_eq!(outcome.reason, StopReason::Cancelled);
        assert_eq!(outcome.committed_steps(), 2);
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn step_after_termination_is_inert() {
        let target = black();
        let nails = square();
        let skip = SkipPolicy::new(SkipRule::Rectangle, &nails).unwrap();
        let raster = RasterizerKind::Antialiased;
        let mut lines = StandardLines::new(&nails, &skip, &raster, DIMS, None).unwrap();
        let mut engine = GreedySearch::new(Plane::white(DIMS), &target, params(1)).unwrap();
        assert_eq!(engine.step(&mut lines), SearchState::Running);
        let done = engine.step(&mut lines);
        assert_eq!(done, SearchState::Terminated(StopReason::MaxIterationsReached));
        assert_eq!(engine.step(&mut lines), done);
        assert_eq!(engine.sequence().len(), 2);
    }

    #[test]
    fn lazy_cache_is_reused_across_iterations() {
        let target = black();
        let nails = square();
        let mut cache = LazyLineCache::new();
        let outcome = search(
            input(&target, &nails, params(6)),
            &RasterizerKind::Antialiased,
            Some(&mut cache),
            &mut NoopObserver,
        )
        .unwrap();
        let stats = outcome.stats.cache.unwrap();
        assert!(stats.hits > 0);
        assert_eq!(stats.misses as usize, cache.len());
        assert_eq!(stats.hits + stats.misses, outcome.stats.candidate_evaluations);
    }

    #[test]
    fn precomputed_and_standard_pipelines_agree() {
        let target = black();
        let nails = square();
        let raster = RasterizerKind::Antialiased;
        let standard = search(input(&target, &nails, params(8)), &raster, None, &mut NoopObserver)
            .unwrap();
        let eager =
            search_precomputed(input(&target, &nails, params(8)), &raster, None, &mut NoopObserver)
                .unwrap();
        assert_eq!(standard.sequence, eager.sequence);
        assert_eq!(standard.errors, eager.errors);
        assert_eq!(standard.canvas, eager.canvas);
    }

    #[test]
    fn precomputed_pipeline_rejects_foreign_table() {
        let target = black();
        let nails = square();
        let raster = RasterizerKind::Antialiased;
        let other = NailSet::new(vec![NailPosition::new(0, 3), NailPosition::new(19, 7)]).unwrap();
        let skip = SkipPolicy::new(SkipRule::Rectangle, &other).unwrap();
        let table = PrecomputedLines::build(&other, 0.5, DIMS, &skip, &raster).unwrap();
        let result = search_precomputed(
            input(&target, &nails, params(3)),
            &raster,
            Some(&table),
            &mut NoopObserver,
        );
        assert!(matches!(result, Err(StringArtError::InvalidArgument(_))));
    }
}
