/// Parse a dollar amount such as `"$1.50"` or `" 2 "` into cents.
/// Blank or unparsable input is zero.
pub fn parse_dollar_amount(value: &str) -> i64 {
    let cleaned = value.replace('$', "");
    let cleaned = cleaned.trim().replace(',', "");
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| (v * 100.0).round() as i64)
        .unwrap_or(0)
}

/// Render cents as `$D.CC`.
pub fn format_dollars(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.abs();
    format!("{sign}${}.{:02}", abs / 100, abs % 100)
}

/// Render an optional amount with two decimals, empty when absent.
pub fn format_amount(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_default()
}
