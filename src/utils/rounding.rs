/// Round to a fixed number of decimals, ties to even.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/// `part / whole * 100`, or `None` when the denominator is zero.
pub fn percentage(part: u64, whole: u64) -> Option<f64> {
    if whole == 0 {
        None
    } else {
        Some(part as f64 / whole as f64 * 100.0)
    }
}

/// Round an estimated count, ties to even, never below zero.
pub fn round_count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round_ties_even() as u64
    } else {
        0
    }
}
