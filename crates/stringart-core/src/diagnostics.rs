//! Run diagnostics: timing, counts, and other metrics for each stage.
//!
//! Every call to
//! [`create_string_art_with_diagnostics`](crate::create_string_art_with_diagnostics)
//! collects these alongside the result. The core never reads the wall
//! clock itself; callers pass a [`Clock`].
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::search::StopReason;
use crate::types::{CacheStrategy, Layout};

/// Source of timestamps for stage timing.
pub trait Clock {
    /// An opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// A clock that never advances. Every stage reports zero duration.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullClock;

impl Clock for NullClock {
    type Instant = ();

    fn now(&self) {}

    fn elapsed(&self, _since: &()) -> Duration {
        Duration::ZERO
    }
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single end-to-end run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunDiagnostics {
    /// Decoding and preparing the target image.
    pub preparation: StageDiagnostics,
    /// Building the precomputed line table (precomputed strategy only).
    pub line_table: Option<StageDiagnostics>,
    /// The greedy search loop.
    pub search: StageDiagnostics,
    /// Total wall-clock duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Headline numbers.
    pub summary: RunSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Target preparation metrics.
    Preparation {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Decoded width in pixels.
        source_width: u32,
        /// Decoded height in pixels.
        source_height: u32,
        /// Width the search ran at.
        working_width: u32,
        /// Height the search ran at.
        working_height: u32,
        /// Scale factor applied after cropping.
        downscale_factor: f64,
    },
    /// Precomputed line table metrics.
    LineTable {
        /// Unordered nail pairs considered.
        pair_count: usize,
        /// Pairs that survived the skip rule and were rasterized.
        stored_lines: usize,
        /// Approximate heap bytes held by the table.
        heap_bytes: usize,
    },
    /// Search loop metrics.
    Search {
        /// Geometry caching strategy.
        strategy: CacheStrategy,
        /// Iterations started.
        iterations: usize,
        /// Strings committed.
        committed_steps: usize,
        /// Candidate strings scored.
        candidate_evaluations: u64,
        /// Lazy cache hits, when a lazy cache was used.
        cache_hits: Option<u64>,
        /// Lazy cache misses, when a lazy cache was used.
        cache_misses: Option<u64>,
        /// MSE of the blank canvas.
        initial_mse: f64,
        /// MSE of the final canvas.
        final_mse: f64,
    },
}

/// High-level summary of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Nail arrangement.
    pub layout: Layout,
    /// Nails actually placed.
    pub num_nails: usize,
    /// Strings drawn.
    pub committed_steps: usize,
    /// Why the search stopped.
    pub stop_reason: StopReason,
    /// MSE of the final canvas at working resolution.
    pub final_mse: f64,
}

impl RunDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("String Art Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Layout: {} ({} nails)  |  Strings: {}  |  Stop: {}",
            self.summary.layout,
            self.summary.num_nails,
            self.summary.committed_steps,
            self.summary.stop_reason,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);

        let mut stages = vec![("Preparation", &self.preparation)];
        if let Some(ref table) = self.line_table {
            stages.push(("Line Table", table));
        }
        stages.push(("Search", &self.search));

        for (name, diag) in &stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!("Final MSE: {:.7}", self.summary.final_mse));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Preparation {
            input_bytes,
            source_width,
            source_height,
            working_width,
            working_height,
            downscale_factor,
        } => format!(
            "{input_bytes} bytes -> {source_width}x{source_height} -> {working_width}x{working_height} (x{downscale_factor})"
        ),
        StageMetrics::LineTable {
            pair_count,
            stored_lines,
            heap_bytes,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let mib = *heap_bytes as f64 / (1024.0 * 1024.0);
            format!("{stored_lines}/{pair_count} pairs, {mib:.1} MiB")
        }
        StageMetrics::Search {
            strategy,
            iterations,
            committed_steps,
            candidate_evaluations,
            cache_hits,
            cache_misses,
            initial_mse,
            final_mse,
        } => {
            let cache = match (cache_hits, cache_misses) {
                (Some(hits), Some(misses)) => format!(" hits={hits} misses={misses}"),
                _ => String::new(),
            };
            format!(
                "{strategy} iters={iterations} strings={committed_steps} evals={candidate_evaluations}{cache} mse={initial_mse:.5}->{final_mse:.5}"
            )
        }
    }
}
