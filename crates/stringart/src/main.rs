//! stringart: approximate an image with one long string wound around nails.
//!
//! Runs the greedy nail-sequence search on an image file and writes any of:
//!
//! - the drawing, re-rendered at the cropped source resolution (PNG or SVG)
//! - the nail sequence, one index per line
//! - the error trace, one value per line
//!
//! Per-stage diagnostics are printed to stdout as a report or as JSON.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin stringart -- -i cat.png -o out/ --string-order out/
//! ```
//!
//! Logging goes through `env_logger`; set `RUST_LOG=debug` for stage
//! details.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use stringart_core::diagnostics::Clock;
use stringart_core::{CacheStrategy, Layout, Progress, RasterizerKind, StringArt, StringArtConfig};

/// Default file names used when an output path is a directory.
const DEFAULT_IMAGE_NAME: &str = "output.png";
const DEFAULT_SEQUENCE_NAME: &str = "string_idx_order.txt";
const DEFAULT_DISTANCE_NAME: &str = "distance.txt";

/// Image extensions `--output` accepts; the first is the fallback.
const IMAGE_EXTENSIONS: &[&str] = &["png", "svg"];
const TEXT_EXTENSIONS: &[&str] = &["txt"];

/// Iterations between progress log lines.
const PROGRESS_INTERVAL: usize = 500;

/// Approximate an image with one long string looped around nails on a
/// canvas.
#[derive(Parser)]
#[command(name = "stringart", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the drawing (.png or .svg). A directory gets
    /// "output.png".
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Where to write the nail sequence. A directory gets
    /// "string_idx_order.txt".
    #[arg(long, visible_alias = "string_order")]
    string_order: Option<PathBuf>,

    /// Where to write the error trace. A directory gets "distance.txt".
    #[arg(long)]
    distance: Option<PathBuf>,

    /// Number of nails.
    #[arg(short = 'n', long, default_value_t = StringArtConfig::DEFAULT_NUM_NAILS)]
    nails: usize,

    /// Scale factor in (0, 1] applied to the image before searching.
    #[arg(short = 'd', long, default_value_t = StringArtConfig::DEFAULT_DOWNSCALE_FACTOR)]
    downscale: f64,

    /// Darkening applied by one string.
    #[arg(short, long, default_value_t = StringArtConfig::DEFAULT_STRENGTH)]
    strength: f64,

    /// Maximum number of strings.
    #[arg(long, visible_alias = "maxiter", default_value_t = StringArtConfig::DEFAULT_MAX_ITERATIONS)]
    max_iter: usize,

    /// Nail arrangement.
    #[arg(short, long, value_enum, default_value_t = LayoutArg::Circle)]
    layout: LayoutArg,

    /// Rasterize every line from scratch instead of caching it.
    #[arg(long)]
    no_cache: bool,

    /// Cache lines as they are needed instead of all up front.
    #[arg(long)]
    no_precache: bool,

    /// Minimum angle in radians between connected nails (circle layout).
    #[arg(long, default_value_t = StringArtConfig::DEFAULT_MIN_ANGLE_DIFF)]
    min_angle_diff: f64,

    /// RGB colour placed under transparent pixels.
    #[arg(
        long,
        num_args = 3,
        value_names = ["R", "G", "B"],
        default_values_t = StringArtConfig::DEFAULT_BACKGROUND
    )]
    background_color: Vec<u8>,

    /// Negligible-improvement iterations tolerated before stopping early.
    #[arg(short, long, default_value_t = StringArtConfig::DEFAULT_PATIENCE)]
    patience: usize,

    /// Smallest improvement counted as progress.
    #[arg(short, long, default_value_t = StringArtConfig::DEFAULT_EPSILON)]
    epsilon: f64,

    /// Line drawing algorithm.
    #[arg(long, value_enum, default_value_t = RasterizerArg::Antialiased)]
    rasterizer: RasterizerArg,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Full config as a JSON string.
    ///
    /// When provided, all other search parameter flags are ignored.
    /// Missing fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,
}

/// Nail arrangement selection.
#[derive(Clone, Copy, ValueEnum)]
enum LayoutArg {
    /// Nails evenly spaced on the largest centred circle.
    Circle,
    /// Nails along the four edges.
    Rectangle,
}

/// Line drawing algorithm selection.
#[derive(Clone, Copy, ValueEnum)]
enum RasterizerArg {
    /// Anti-aliased lines (Zingl's algorithm).
    Antialiased,
    /// One-pixel Bresenham lines.
    Aliased,
}

/// Build a [`StringArtConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<StringArtConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    let background: [u8; 3] = cli
        .background_color
        .as_slice()
        .try_into()
        .map_err(|_| "--background-color takes exactly three values".to_owned())?;

    Ok(StringArtConfig {
        num_nails: cli.nails,
        layout: match cli.layout {
            LayoutArg::Circle => Layout::Circle,
            LayoutArg::Rectangle => Layout::Rectangle,
        },
        strength: cli.strength,
        max_iterations: cli.max_iter,
        line_cache: if cli.no_cache {
            CacheStrategy::Disabled
        } else if cli.no_precache {
            CacheStrategy::Lazy
        } else {
            CacheStrategy::Precomputed
        },
        rasterizer: match cli.rasterizer {
            RasterizerArg::Antialiased => RasterizerKind::Antialiased,
            RasterizerArg::Aliased => RasterizerKind::Aliased,
        },
        min_angle_diff: cli.min_angle_diff,
        background,
        downscale_factor: cli.downscale,
        patience: cli.patience,
        epsilon: cli.epsilon,
    })
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.input) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.input.display());
            return ExitCode::FAILURE;
        }
    };

    log::info!(
        "image: {} ({} bytes), {} nails on a {}, {} strings max",
        cli.input.display(),
        image_bytes.len(),
        config.num_nails,
        config.layout,
        config.max_iterations
    );

    let mut observer = |progress: &Progress| {
        if progress.iteration.is_multiple_of(PROGRESS_INTERVAL) {
            log::info!(
                "iteration {}/{}: mse {:.6}",
                progress.iteration,
                progress.max_iterations,
                progress.mse
            );
        }
        ControlFlow::Continue(())
    };

    let (art, diagnostics) = match stringart_core::create_string_art_with_diagnostics(
        &image_bytes,
        &config,
        &StdClock,
        &mut observer,
    ) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Search error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.json {
        match serde_json::to_string_pretty(&diagnostics) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing diagnostics: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{}", diagnostics.report());
    }

    let mut status = ExitCode::SUCCESS;

    if let Some(ref user_path) = cli.output {
        let path = resolve_output_path(user_path, DEFAULT_IMAGE_NAME, IMAGE_EXTENSIONS);
        let written =
            render_output(&cli, &config, &art, &path).and_then(|bytes| write_file(&path, &bytes));
        match written {
            Ok(()) => eprintln!("Saved output image to {}.", path.display()),
            Err(msg) => {
                eprintln!("{msg}");
                status = ExitCode::FAILURE;
            }
        }
    }

    if let Some(ref user_path) = cli.string_order {
        let path = resolve_output_path(user_path, DEFAULT_SEQUENCE_NAME, TEXT_EXTENSIONS);
        let text = stringart_export::sequence_to_text(&art.outcome.sequence);
        match write_file(&path, text.as_bytes()) {
            Ok(()) => eprintln!("Saved string index order to {}.", path.display()),
            Err(msg) => {
                eprintln!("{msg}");
                status = ExitCode::FAILURE;
            }
        }
    }

    if let Some(ref user_path) = cli.distance {
        let path = resolve_output_path(user_path, DEFAULT_DISTANCE_NAME, TEXT_EXTENSIONS);
        let text = stringart_export::errors_to_text(&art.outcome.errors);
        match write_file(&path, text.as_bytes()) {
            Ok(()) => eprintln!("Saved distance vector to {}.", path.display()),
            Err(msg) => {
                eprintln!("{msg}");
                status = ExitCode::FAILURE;
            }
        }
    }

    status
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Render the result at the cropped source resolution, as PNG or SVG
/// depending on the extension of `path`.
///
/// Nails are placed again for the larger canvas and the string strength
/// is divided by the downscale factor, so a string covers the same
/// fraction of the picture as it did during the search.
fn render_output(
    cli: &Cli,
    config: &StringArtConfig,
    art: &StringArt,
    path: &Path,
) -> Result<Vec<u8>, String> {
    let full = art.full_dimensions;
    let nails = stringart_core::layout::nails_for_layout(config.layout, full, config.num_nails)
        .map_err(|e| format!("Error placing nails at full resolution: {e}"))?;

    if has_extension(path, "svg") {
        let title = cli
            .input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("stringart");
        let desc = format!(
            "{} nails ({}), {} strings, strength {}",
            nails.len(),
            config.layout,
            art.outcome.committed_steps(),
            config.strength
        );
        let config_json = serde_json::to_string(config).ok();
        let metadata = stringart_export::SvgMetadata {
            title: Some(title),
            description: Some(&desc),
            config_json: config_json.as_deref(),
        };
        stringart_export::to_svg(&art.outcome.sequence, &nails, full, &metadata)
            .map(String::into_bytes)
            .map_err(|e| format!("Error building SVG: {e}"))
    } else {
        let canvas = stringart_core::replay::render_sequence(
            &art.outcome.sequence,
            &nails,
            full,
            config.strength / config.downscale_factor,
            &config.rasterizer,
        )
        .map_err(|e| format!("Error rendering output: {e}"))?;
        stringart_export::to_png(&canvas).map_err(|e| format!("Error encoding PNG: {e}"))
    }
}

/// Write `bytes` to `path`, creating missing parent directories.
fn write_file(path: &Path, bytes: &[u8]) -> Result<(), String> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Error creating {}: {e}", parent.display()))?;
    }
    std::fs::write(path, bytes).map_err(|e| format!("Error writing {}: {e}", path.display()))
}

/// Whether `path` ends in `.ext`, ignoring case.
fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Turn a user-supplied output path into a file path.
///
/// An existing directory, or a path without an extension, gets
/// `default_name` appended. A file name whose extension is not in
/// `allowed` (compared case-insensitively) has its extension replaced by
/// the first allowed one.
fn resolve_output_path(user_path: &Path, default_name: &str, allowed: &[&str]) -> PathBuf {
    let mut path = if user_path.is_dir() || user_path.extension().is_none() {
        user_path.join(default_name)
    } else {
        user_path.to_path_buf()
    };
    if !allowed.iter().any(|ext| has_extension(&path, ext))
        && let Some(first) = allowed.first()
    {
        path.set_extension(first);
    }
    path
}
