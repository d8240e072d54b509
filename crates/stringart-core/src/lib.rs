//! stringart-core: String art nail sequence search (sans-IO).
//!
//! Approximates a grayscale image with a single thread wound around
//! nails on the canvas edge. The pieces, bottom up:
//!
//! - [`layout`] places the nails; [`skip`] decides which pairs of nails a
//!   string may connect.
//! - [`raster`] turns a nail pair into [`LineGeometry`]; [`cache`] stores
//!   that geometry lazily or builds a full table up front.
//! - [`search`] runs the greedy loop that picks the next nail.
//! - [`prepare`] turns image bytes into a target; [`replay`] rebuilds a
//!   canvas from a finished sequence.
//!
//! This crate has **no I/O dependencies**: it works on in-memory byte
//! slices and planes and never touches the filesystem or the wall clock.

pub mod cache;
pub mod diagnostics;
pub mod geometry;
pub mod layout;
pub mod nails;
pub mod plane;
pub mod prepare;
pub mod raster;
pub mod replay;
pub mod search;
pub mod skip;
pub mod types;

pub use cache::{CacheStats, LazyLineCache, LineSource, PrecomputedLines, StandardLines};
pub use diagnostics::{Clock, NullClock, RunDiagnostics};
pub use geometry::LineGeometry;
pub use nails::NailSet;
pub use plane::Plane;
pub use raster::{Rasterizer, RasterizerKind};
pub use search::{
    GreedySearch, MIN_ACCEPTED_IMPROVEMENT, NoopObserver, Progress, SearchInput, SearchObserver,
    SearchOutcome, SearchParams, SearchState, SearchStats, StopReason,
};
pub use skip::{SkipPolicy, SkipRule};
pub use types::{
    CacheStrategy, Dimensions, Layout, NailPosition, StringArt, StringArtConfig, StringArtError,
};

use diagnostics::{RunSummary, StageDiagnostics, StageMetrics};

/// Turn image bytes into string art.
///
/// See [`create_string_art_with_diagnostics`] for the steps.
///
/// # Errors
///
/// Same as [`create_string_art_with_diagnostics`].
pub fn create_string_art(
    image_bytes: &[u8],
    config: &StringArtConfig,
) -> Result<StringArt, StringArtError> {
    create_string_art_with_diagnostics(image_bytes, config, &NullClock, &mut NoopObserver)
        .map(|(art, _)| art)
}

/// Turn image bytes into string art, timing each stage with `clock` and
/// reporting search progress to `observer`.
///
/// # Steps
///
/// 1. Validate the config
/// 2. Prepare the target (decode, composite, luminance, crop, downscale)
/// 3. Place the nails for the configured layout
/// 4. Build the precomputed line table (precomputed strategy only)
/// 5. Run the greedy search through the pipeline the strategy selects
///
/// # Errors
///
/// Returns [`StringArtError::InvalidArgument`] for an invalid config or a
/// layout that does not fit the prepared image, and
/// [`StringArtError::EmptyInput`] or [`StringArtError::ImageDecode`] for
/// unusable image bytes.
pub fn create_string_art_with_diagnostics<C, O>(
    image_bytes: &[u8],
    config: &StringArtConfig,
    clock: &C,
    observer: &mut O,
) -> Result<(StringArt, RunDiagnostics), StringArtError>
where
    C: Clock,
    O: SearchObserver + ?Sized,
{
    config.validate()?;
    let run_start = clock.now();

    // 1. Target preparation.
    let t = clock.now();
    let prepared = prepare::prepare_target(
        image_bytes,
        config.layout,
        config.background,
        config.downscale_factor,
    )?;
    let dims = prepared.target.dimensions();
    let preparation = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Preparation {
            input_bytes: image_bytes.len(),
            source_width: prepared.source.width,
            source_height: prepared.source.height,
            working_width: dims.width,
            working_height: dims.height,
            downscale_factor: config.downscale_factor,
        },
    };

    // 2. Nails and skip rule.
    let nails = layout::nails_for_layout(config.layout, dims, config.num_nails)?;
    let skip_rule = SkipRule::for_layout(config.layout, config.min_angle_diff);
    let params = config.search_params();
    let rasterizer = config.rasterizer;
    let input = SearchInput {
        canvas: Plane::white(dims),
        target: &prepared.target,
        nails: &nails,
        skip_rule,
        params,
    };

    // 3. Search, through the pipeline the strategy selects.
    let (outcome, line_table, search_duration) = match config.line_cache {
        CacheStrategy::Precomputed => {
            let t = clock.now();
            let skip = SkipPolicy::new(skip_rule, &nails)?;
            let table = PrecomputedLines::build(&nails, params.strength, dims, &skip, &rasterizer)?;
            let n = nails.len();
            let table_stage = StageDiagnostics {
                duration: clock.elapsed(&t),
                metrics: StageMetrics::LineTable {
                    pair_count: n * (n - 1) / 2,
                    stored_lines: table.len(),
                    heap_bytes: table.heap_size(),
                },
            };
            let t = clock.now();
            let outcome = search::search_precomputed(input, &rasterizer, Some(&table), observer)?;
            (outcome, Some(table_stage), clock.elapsed(&t))
        }
        CacheStrategy::Lazy => {
            let mut cache = LazyLineCache::new();
            let t = clock.now();
            let outcome = search::search(input, &rasterizer, Some(&mut cache), observer)?;
            (outcome, None, clock.elapsed(&t))
        }
        CacheStrategy::Disabled => {
            let t = clock.now();
            let outcome = search::search(input, &rasterizer, None, observer)?;
            (outcome, None, clock.elapsed(&t))
        }
    };

    let initial_mse = outcome.errors.first().copied().unwrap_or_default();
    let final_mse = outcome.errors.last().copied().unwrap_or_default();
    let search_stage = StageDiagnostics {
        duration: search_duration,
        metrics: StageMetrics::Search {
            strategy: config.line_cache,
            iterations: outcome.stats.iterations,
            committed_steps: outcome.committed_steps(),
            candidate_evaluations: outcome.stats.candidate_evaluations,
            cache_hits: outcome.stats.cache.map(|c| c.hits),
            cache_misses: outcome.stats.cache.map(|c| c.misses),
            initial_mse,
            final_mse,
        },
    };
    log::debug!(
        "search stopped ({}) after {} strings; mse {initial_mse:.6} -> {final_mse:.6}",
        outcome.reason,
        outcome.committed_steps()
    );

    let diagnostics = RunDiagnostics {
        preparation,
        line_table,
        search: search_stage,
        total_duration: clock.elapsed(&run_start),
        summary: RunSummary {
            layout: config.layout,
            num_nails: nails.len(),
            committed_steps: outcome.committed_steps(),
            stop_reason: outcome.reason,
            final_mse,
        },
    };

    Ok((
        StringArt {
            outcome,
            nails,
            target: prepared.target,
            full_dimensions: prepared.full,
        },
        diagnostics,
    ))
}
