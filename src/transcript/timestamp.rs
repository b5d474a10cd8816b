// Transcript offset parsing and formatting
use std::time::Duration;

/// Parse an offset like `01:02:03`, `02:03`, `00:00:01.5` or `00:00:01,500`.
///
/// Minutes and seconds must be below 60. Hours are unbounded so transcripts
/// longer than a day still parse. The fractional part may have up to nine
/// digits.
pub fn parse_timestamp(value: &str) -> Option<Duration> {
    let value = value.trim();
    let (clock, fraction) = match value.find(|c: char| c == '.' || c == ',') {
        Some(pos) => (&value[..pos], Some(&value[pos + 1..])),
        None => (value, None),
    };

    let fields: Vec<&str> = clock.split(':').collect();
    let (hours, minutes, seconds) = match fields.as_slice() {
        [h, m, s] => (parse_field(h)?, parse_field(m)?, parse_field(s)?),
        [m, s] => (0, parse_field(m)?, parse_field(s)?),
        _ => return None,
    };

    if minutes >= 60 || seconds >= 60 {
        return None;
    }

    let nanos = match fraction {
        Some(f) => parse_fraction(f)?,
        None => 0,
    };

    let total_secs = hours.checked_mul(3600)?.checked_add(minutes * 60 + seconds)?;
    Some(Duration::from_secs(total_secs) + Duration::from_nanos(nanos))
}

fn parse_field(field: &str) -> Option<u64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

fn parse_fraction(fraction: &str) -> Option<u64> {
    if fraction.is_empty() || fraction.len() > 9 {
        return None;
    }
    parse_field(&format!("{:0<9}", fraction))
}

/// Format an offset as `HH:MM:SS`, dropping sub-second precision.
pub fn format_timestamp(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}
