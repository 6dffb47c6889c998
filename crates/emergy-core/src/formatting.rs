/// Format a value in scientific notation with two mantissa decimals, an
/// uppercase `E`, an explicit exponent sign and at least two exponent digits.
///
/// Non-finite values render as `NAN`, `INF` or `-INF`.
///
/// # Examples
///
/// ```
/// use emergy_core::formatting::format_scientific;
///
/// assert_eq!(format_scientific(1.0e7), "1.00E+07");
/// assert_eq!(format_scientific(0.0), "0.00E+00");
/// assert_eq!(format_scientific(-2.5e-3), "-2.50E-03");
/// assert_eq!(format_scientific(9.999e99), "1.00E+100");
/// ```
pub fn format_scientific(value: f64) -> String {
    if value.is_nan() {
        return "NAN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "INF" } else { "-INF" }.to_string();
    }

    // `{:.2e}` yields e.g. "1.00e7" / "2.50e-3"; the mantissa rounding (and
    // any carry into the exponent) is already done at this point.
    let raw = format!("{:.2e}", value);
    let (mantissa, exponent) = match raw.split_once('e') {
        Some(parts) => parts,
        None => (raw.as_str(), "0"),
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };

    format!("{}E{}{:02}", mantissa, sign, exponent.abs())
}

/// Parse a formatted emergy value back into a float.
///
/// Accepts anything [`format_scientific`] produces as well as plain numbers
/// such as `"0"`.
///
/// ```
/// use emergy_core::formatting::parse_scientific;
///
/// assert_eq!(parse_scientific("1.00E+07"), Some(1.0e7));
/// assert_eq!(parse_scientific(" 0 "), Some(0.0));
/// assert_eq!(parse_scientific("abc"), None);
/// ```
pub fn parse_scientific(value: &str) -> Option<f64> {
    match value.trim() {
        "NAN" => Some(f64::NAN),
        "INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        other => other.parse::<f64>().ok(),
    }
}

/// Round `value` to `decimals` places.
///
/// Rounding is done on the exact binary value with ties to even, the same
/// rule [`format_scientific`] applies to the mantissa.
///
/// ```
/// use emergy_core::formatting::round_to;
///
/// assert_eq!(round_to(1.333333, 2), 1.33);
/// assert_eq!(round_to(1.125, 2), 1.12);
/// assert_eq!(round_to(4.0, 2), 4.0);
/// ```
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{:.*}", decimals as usize, value)
        .parse()
        .unwrap_or(value)
}
