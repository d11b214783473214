//! Plain-text rendering of a [`WeatherView`].

use chrono::{NaiveDate, NaiveDateTime};
use nowcast_core::{WeatherView, repository::HOUR_FORMAT, view::degrees};
use std::fmt::Write;

const BAR_WIDTH: usize = 20;

pub fn view_text(view: &WeatherView) -> String {
    let mut out = String::new();

    if !view.title.is_empty() {
        let _ = writeln!(out, "{}", view.title);
    }
    let _ = writeln!(out, "{}  {}", view.temperature_text, view.condition_text);
    let _ = writeln!(out, "{}", view.min_max_text);
    let _ = writeln!(out, "{}", view.auxiliary_text);

    if !view.hourly.is_empty() {
        let _ = writeln!(out, "\nHourly");
        for hour in &view.hourly {
            let _ = writeln!(
                out,
                "  {:<9}  {:>4}°  {}",
                hour_label(&hour.timestamp),
                degrees(hour.temperature_c),
                hour.condition.text
            );
        }
    }

    if !view.daily.is_empty() {
        let _ = writeln!(out, "\nDaily");
        for day in &view.daily {
            let high = format!("{}°", degrees(day.max_temp_c));
            let _ = writeln!(
                out,
                "  {:<10}  {:>4}°  {}  {:<4}  {}",
                day_label(&day.date),
                degrees(day.min_temp_c),
                range_bar(day.min_temp_c, day.max_temp_c, view.range_min, view.range_max),
                high,
                day.condition_text
            );
        }
    }

    out
}

/// `Fri 13:00`; unparseable timestamps are shown as-is.
fn hour_label(timestamp: &str) -> String {
    NaiveDateTime::parse_from_str(timestamp, HOUR_FORMAT)
        .map(|t| t.format("%a %H:%M").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}

fn day_label(date: &str) -> String {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%a %d %b").to_string())
        .unwrap_or_else(|_| date.to_string())
}

/// A day's min..max span drawn inside the overall range.
fn range_bar(min: f64, max: f64, lo: f64, hi: f64) -> String {
    let span = hi - lo;
    if span <= 0.0 || !span.is_finite() {
        return "─".repeat(BAR_WIDTH);
    }

    let width = BAR_WIDTH as f64;
    let cell = |t: f64| (((t - lo) / span) * width).round().clamp(0.0, width) as usize;
    let end = cell(max).max(cell(min) + 1).min(BAR_WIDTH);
    let start = cell(min).min(end - 1);

    (0..BAR_WIDTH).map(|i| if (start..end).contains(&i) { '█' } else { '─' }).collect()
}
