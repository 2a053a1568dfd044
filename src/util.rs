pub fn mean(data: &[f64]) -> Option<f64> {
    match data.len() {
        0 => None,
        count => Some(data.iter().sum::<f64>() / count as f64),
    }
}

/// `MM:SS`, with minutes allowed past 59.
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Signed mood change, e.g. `+3` or `-1`.
pub fn format_delta(delta: i16) -> String {
    if delta > 0 {
        format!("+{delta}")
    } else {
        delta.to_string()
    }
}

/// Share of `part` in `whole` as a 0..=1 ratio for gauges.
pub fn ratio(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[10., 20., 30.]), Some(20.0));
        assert_eq!(mean(&[-2.0, 2.0, 3.0]), Some(1.0));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(59), "00:59");
        assert_eq!(format_clock(1200), "20:00");
        assert_eq!(format_clock(3599), "59:59");
        assert_eq!(format_clock(3600), "60:00");
    }

    #[test]
    fn test_format_delta() {
        assert_eq!(format_delta(3), "+3");
        assert_eq!(format_delta(0), "0");
        assert_eq!(format_delta(-2), "-2");
    }

    #[test]
    fn test_ratio() {
        assert_eq!(ratio(300, 600), 0.5);
        assert_eq!(ratio(5, 0), 0.0);
        assert_eq!(ratio(9, 3), 1.0);
    }
}
