//! Presentation of simulated times and delays.
//!
//! These are the only places nanoseconds are rounded to minutes.

use trainmap_network::Nanoseconds;

pub const NANOS_PER_MINUTE: Nanoseconds = 60_000_000_000;
const MINUTES_PER_DAY: i64 = 24 * 60;

/// `HH:MM` of the simulated day, wrapping past midnight.
pub fn format_clock(time: Nanoseconds) -> String {
    let minutes = time.div_euclid(NANOS_PER_MINUTE).rem_euclid(MINUTES_PER_DAY);
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Whole minutes between a planned and an actual time, rounded down.
pub fn delay_minutes(planned: Nanoseconds, actual: Nanoseconds) -> i64 {
    (actual - planned).div_euclid(NANOS_PER_MINUTE)
}

/// Signed delay label: `0`, `+5min`, `-3min`, `+1h`, `+1h5`.
///
/// Rounds to whole minutes first, halves toward positive infinity.
pub fn format_delay(minutes: f64) -> String {
    let rounded = (minutes + 0.5).floor() as i64;
    if rounded == 0 {
        return "0".to_owned();
    }

    let sign = if rounded > 0 { '+' } else { '-' };
    let magnitude = rounded.abs();
    if magnitude < 60 {
        return format!("{sign}{magnitude}min");
    }

    match (magnitude / 60, magnitude % 60) {
        (hours, 0) => format!("{sign}{hours}h"),
        (hours, rest) => format!("{sign}{hours}h{rest}"),
    }
}

/// Duration label: `45s`, `12min`, `1h05`.
pub fn format_duration(duration: Nanoseconds) -> String {
    let seconds = duration.max(0) / 1_000_000_000;
    if seconds < 60 {
        return format!("{seconds}s");
    }

    let minutes = seconds / 60;
    if minutes < 60 {
        format!("{minutes}min")
    } else {
        format!("{}h{:02}", minutes / 60, minutes % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Nanoseconds = 60 * NANOS_PER_MINUTE;

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(8 * HOUR + 5 * NANOS_PER_MINUTE), "08:05");
        // Seconds are truncated, not rounded
        assert_eq!(format_clock(NANOS_PER_MINUTE * 2 - 1), "00:01");
        assert_eq!(format_clock(25 * HOUR), "01:00");
    }

    #[test]
    fn test_delay_minutes_floors() {
        assert_eq!(delay_minutes(0, 90_000_000_000), 1);
        assert_eq!(delay_minutes(0, 0), 0);
        assert_eq!(delay_minutes(90_000_000_000, 0), -2);
        assert_eq!(delay_minutes(0, 5 * NANOS_PER_MINUTE), 5);
    }

    #[test]
    fn test_format_delay() {
        assert_eq!(format_delay(0.0), "0");
        assert_eq!(format_delay(5.0), "+5min");
        assert_eq!(format_delay(-3.0), "-3min");
        assert_eq!(format_delay(60.0), "+1h");
        assert_eq!(format_delay(65.0), "+1h5");
        assert_eq!(format_delay(-125.0), "-2h5");
        assert_eq!(format_delay(2.5), "+3min");
        assert_eq!(format_delay(-2.5), "-2min");
    }

    #[test]
    fn test_format_delay_decides_on_rounded_minutes() {
        assert_eq!(format_delay(-0.4), "0");
        assert_eq!(format_delay(-0.5), "0");
        assert_eq!(format_delay(59.6), "+1h");
        assert_eq!(format_delay(119.6), "+2h");
        assert_eq!(format_delay(-59.6), "-1h");
        assert_eq!(format_delay(64.7), "+1h5");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(45_000_000_000), "45s");
        assert_eq!(format_duration(12 * NANOS_PER_MINUTE), "12min");
        assert_eq!(format_duration(65 * NANOS_PER_MINUTE), "1h05");
    }
}
