pub mod dashboard;
pub mod subject_detail;
pub mod subjects;
pub mod test_list;

use chrono::{DateTime, Local, Utc};
use ratatui::style::Color;

use studytrack::models::Urgency;

pub fn urgency_color(urgency: Urgency) -> Color {
    match urgency {
        Urgency::Critical => Color::Red,
        Urgency::High => Color::LightRed,
        Urgency::Elevated => Color::Yellow,
        Urgency::Normal => Color::Green,
    }
}

pub fn progress_color(percentage: f64) -> Color {
    if percentage >= 100.0 {
        Color::Green
    } else if percentage >= 50.0 {
        Color::Cyan
    } else if percentage > 0.0 {
        Color::Yellow
    } else {
        Color::DarkGray
    }
}

/// Fixed-width text bar, e.g. `██████░░░░` for 60% at width 10.
pub fn progress_bar(percentage: f64, width: usize) -> String {
    let filled = ((percentage.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

pub fn format_when(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%a %d %b %H:%M").to_string()
}
