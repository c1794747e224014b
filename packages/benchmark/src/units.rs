//! Parsing of the human-readable durations and data sizes Trino reports,
//! e.g. `1.23s`, `456.78ms`, `256.5MB`.

/// Splits `"12.5ms"` into `(12.5, "ms")`. Whitespace between the number
/// and the unit is allowed.
fn split_quantity(raw: &str) -> Option<(f64, &str)> {
    let raw = raw.trim();
    let unit_start = raw
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(raw.len());
    let (number, unit) = raw.split_at(unit_start);
    let value: f64 = number.trim().parse().ok()?;
    value.is_finite().then_some((value, unit.trim()))
}

/// Converts a duration string to seconds.
///
/// Accepts the units `ns`, `us`, `ms`, `s`, `m`, `h` and `d`; a bare number
/// is taken as seconds. Returns `None` for empty, unparseable or
/// unknown-unit input.
#[must_use]
pub fn parse_duration_seconds(raw: &str) -> Option<f64> {
    let (value, unit) = split_quantity(raw)?;
    let factor = match unit {
        "ns" => 1e-9,
        "us" => 1e-6,
        "ms" => 1e-3,
        "" | "s" => 1.0,
        "m" => 60.0,
        "h" => 3_600.0,
        "d" => 86_400.0,
        _ => return None,
    };
    Some(value * factor)
}

/// Converts a data size string to MiB.
///
/// Units are binary (`kB` = 1024 bytes) and matched case-insensitively:
/// `B`, `kB`, `MB`, `GB`, `TB`, `PB`. A bare number is taken as bytes.
#[must_use]
pub fn parse_data_size_mb(raw: &str) -> Option<f64> {
    const KIB: f64 = 1_024.0;
    let (value, unit) = split_quantity(raw)?;
    let factor = match unit.to_ascii_uppercase().as_str() {
        "" | "B" => 1.0 / (KIB * KIB),
        "KB" => 1.0 / KIB,
        "MB" => 1.0,
        "GB" => KIB,
        "TB" => KIB * KIB,
        "PB" => KIB * KIB * KIB,
        _ => return None,
    };
    Some(value * factor)
}
