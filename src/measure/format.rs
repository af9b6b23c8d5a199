//! Numeric presentation helpers
//!
//! Rounding happens only here, at the presentation boundary. Callers keep the
//! full-precision value for arithmetic.

/// Values closer to zero than this are printed as zero (no "-0.000")
const ZERO_CLAMP: f64 = 1e-12;

/// Placeholder printed for values that cannot be shown
pub const MISSING: &str = "-";

/// Format a number with a fixed number of decimal places
pub fn format_fixed(value: f64, digits: usize) -> String {
    if !value.is_finite() {
        return MISSING.to_string();
    }
    let value = if value.abs() < ZERO_CLAMP { 0.0 } else { value };
    let formatted = format!("{:.*}", digits, value);
    // Rounding can still produce a negative zero, e.g. -0.0004 at 3 digits
    if formatted.starts_with('-') && formatted[1..].chars().all(|c| c == '0' || c == '.') {
        formatted[1..].to_string()
    } else {
        formatted
    }
}

/// Format a percentage value with a fixed number of decimal places
pub fn format_percent(value: f64, digits: usize) -> String {
    if !value.is_finite() {
        return MISSING.to_string();
    }
    format!("{}%", format_fixed(value, digits))
}

/// Parse a user-entered number, accepting a comma as decimal separator
pub fn parse_numeric(input: &str, default: f64) -> f64 {
    input
        .trim()
        .replacen(',', ".", 1)
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}
