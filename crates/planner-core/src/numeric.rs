//! Rounding and ratio helpers shared by the analyzers

use crate::error::{Error, Result};

/// Round `value` to `places` decimal places, ties to even
///
/// Values too large to scale by `10^places` are returned unchanged; they
/// carry no fractional digits to round.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    let rounded = scaled.round_ties_even() / factor;
    // normalise -0.0 so serialized reports never show a signed zero
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Pass `value` through, or fail the analysis when it is infinite or NaN
///
/// Validated inputs are finite, but their products and sums can still
/// overflow.
pub fn ensure_finite(what: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::AnalysisFailed(format!("{what} is out of range")))
    }
}

/// `part` as a percentage of `whole`, or 0 when `whole` is not positive
pub fn percent_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole * 100.0 } else { 0.0 }
}
