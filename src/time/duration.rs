/// A span of simulated time.
pub use std::time::Duration;

/// Nanoseconds per unit.
const UNITS: [(&str, f64); 6] = [
    ("", 1e9),
    ("s", 1e9),
    ("ms", 1e6),
    ("us", 1e3),
    ("ns", 1.0),
    ("min", 6e10),
];

/// Parses durations written as `<number><unit>`, for example `1s`,
/// `250ms`, `10us`, `5ns` or `2min`. Without a unit the number is
/// taken as seconds.
///
/// Negative, non-finite and malformed values yield `None`.
#[must_use]
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    // The unit is the trailing run of letters, so exponents stay with the number.
    let unit_start = s.trim_end_matches(|c: char| c.is_ascii_alphabetic()).len();
    let (number, unit) = s.split_at(unit_start);

    let value: f64 = number.trim().parse().ok()?;
    let (_, scale) = UNITS.iter().find(|(name, _)| *name == unit.trim())?;
    let nanos = (value * scale).round();
    if !(nanos >= 0.0 && nanos < u64::MAX as f64) {
        return None;
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let nanos = nanos as u64;
    Some(Duration::from_nanos(nanos))
}
