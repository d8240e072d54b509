//! Plain-text dumps of a run, one value per line.

use std::fmt::Write;

/// The nail sequence, one index per line.
#[must_use]
pub fn sequence_to_text(sequence: &[usize]) -> String {
    let mut out = String::with_capacity(sequence.len() * 4);
    for index in sequence {
        let _ = writeln!(out, "{index}");
    }
    out
}

/// The error trace, one value per line with seven decimals.
#[must_use]
pub fn errors_to_text(errors: &[f64]) -> String {
    let mut out = String::with_capacity(errors.len() * 10);
    for error in errors {
        let _ = writeln!(out, "{error:.7}");
    }
    out
}
