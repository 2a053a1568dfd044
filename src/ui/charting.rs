use zazen::stats::DailyMinutes;

/// Weekday labels and minutes for the weekly bar chart
pub fn weekly_bars(days: &[DailyMinutes]) -> Vec<(String, u64)> {
    days.iter()
        .map(|d| (d.date.format("%a").to_string(), d.minutes as u64))
        .collect()
}

/// Upper bound for the bar chart: never below one hour so short weeks stay short
pub fn bar_ceiling(bars: &[(String, u64)]) -> u64 {
    bars.iter().map(|(_, v)| *v).max().unwrap_or(0).max(60)
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.1}")
    }
}
