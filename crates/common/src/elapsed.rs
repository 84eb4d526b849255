//! Human-readable elapsed-time strings for the result ledger.
//!
//! Durations are rendered as `<value><unit>` with the unit drawn from
//! `{ns, ms, s, m}`: `"500000ns"`, `"123ms"`, `"4.56s"`, `"2.10m"`.
//! Sub-millisecond durations stay in integer nanoseconds; milliseconds are
//! rounded to whole numbers; seconds and minutes carry two decimals.
//! Downstream consumers parse this format back with [`parse_elapsed`].

use std::time::Duration;

const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;
const NANOS_PER_MIN: u128 = 60_000_000_000;

/// Formats a duration as a short human string.
pub fn format_elapsed(elapsed: Duration) -> String {
    let ns = elapsed.as_nanos();
    if ns < NANOS_PER_MILLI {
        format!("{ns}ns")
    } else if ns < NANOS_PER_SEC {
        format!("{:.0}ms", ns as f64 / NANOS_PER_MILLI as f64)
    } else if ns < NANOS_PER_MIN {
        format!("{:.2}s", ns as f64 / NANOS_PER_SEC as f64)
    } else {
        format!("{:.2}m", ns as f64 / NANOS_PER_MIN as f64)
    }
}

/// Parses a string produced by [`format_elapsed`] back into a duration.
///
/// Accepts leading/trailing whitespace; returns `None` for anything that is
/// not `<number><unit>` with a known unit suffix.
pub fn parse_elapsed(text: &str) -> Option<Duration> {
    let s = text.trim();
    let unit_start = s.find(|c: char| !c.is_ascii_digit() && c != '.')?;
    let (value, unit) = s.split_at(unit_start);
    let value: f64 = value.parse().ok()?;
    let scale = match unit {
        "ns" => 1.0,
        "ms" => NANOS_PER_MILLI as f64,
        "s" => NANOS_PER_SEC as f64,
        "m" => NANOS_PER_MIN as f64,
        _ => return None,
    };
    Some(Duration::from_nanos((value * scale) as u64))
}

/// Serde adapter for `Duration` fields stored in the human format.
pub mod serde_elapsed {
    use super::{format_elapsed, parse_elapsed};
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(elapsed: &Duration, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&format_elapsed(*elapsed))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(de)?;
        parse_elapsed(&text)
            .ok_or_else(|| de::Error::custom(format!("invalid elapsed string: {text:?}")))
    }
}
