//! Timing and rate formatting helpers for run summaries

use std::time::Duration;

/// Format a duration in human-readable form
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use mandelband::util::time::format_duration;
///
/// assert_eq!(format_duration(Duration::from_nanos(500)), "500ns");
/// assert_eq!(format_duration(Duration::from_micros(2500)), "2.50ms");
/// assert_eq!(format_duration(Duration::from_secs(5)), "5.00s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();

    if nanos < 1_000 {
        format!("{}ns", nanos)
    } else if nanos < 1_000_000 {
        format!("{:.2}us", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.2}ms", nanos as f64 / 1_000_000.0)
    } else {
        format!("{:.2}s", nanos as f64 / 1_000_000_000.0)
    }
}

/// Items per second over `duration`, or 0 for an empty duration
pub fn rate_per_sec(count: u64, duration: Duration) -> f64 {
    let seconds = duration.as_secs_f64();
    if seconds > 0.0 {
        count as f64 / seconds
    } else {
        0.0
    }
}

/// Format a pixel rate with a metric suffix
///
/// ```
/// use mandelband::util::time::format_pixel_rate;
///
/// assert_eq!(format_pixel_rate(640.0), "640 px/s");
/// assert_eq!(format_pixel_rate(2_500_000.0), "2.50 Mpx/s");
/// ```
pub fn format_pixel_rate(rate: f64) -> String {
    if rate < 1_000.0 {
        format!("{:.0} px/s", rate)
    } else if rate < 1_000_000.0 {
        format!("{:.2} Kpx/s", rate / 1_000.0)
    } else if rate < 1_000_000_000.0 {
        format!("{:.2} Mpx/s", rate / 1_000_000.0)
    } else {
        format!("{:.2} Gpx/s", rate / 1_000_000_000.0)
    }
}

/// Format an integer with thousands separators
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_nanos(500)), "500ns");
        assert_eq!(format_duration(Duration::from_nanos(1500)), "1.50us");
        assert_eq!(format_duration(Duration::from_micros(1500)), "1.50ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    }

    #[test]
    fn test_rate_per_sec() {
        assert_eq!(rate_per_sec(640_000, Duration::from_secs(2)), 320_000.0);
        assert_eq!(rate_per_sec(1000, Duration::ZERO), 0.0);
    }

    #[test]
    fn test_format_pixel_rate() {
        assert_eq!(format_pixel_rate(1500.0), "1.50 Kpx/s");
        assert_eq!(format_pixel_rate(3_000_000_000.0), "3.00 Gpx/s");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(640_000), "640,000");
        assert_eq!(format_count(1_234_567), "1,234,567");
    }
}
