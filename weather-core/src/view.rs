//! Display-ready fields derived from the latest snapshot.

use crate::model::{DaySummary, HourSample, WeatherSnapshot};

const PLACEHOLDER: &str = "—";

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherView {
    pub title: String,
    pub temperature_text: String,
    pub condition_text: String,
    /// Today's high and low.
    pub min_max_text: String,
    /// Wind and humidity.
    pub auxiliary_text: String,
    /// Lowest minimum across all daily buckets, for range bars.
    pub range_min: f64,
    /// Highest maximum across all daily buckets.
    pub range_max: f64,
    pub hourly: Vec<HourSample>,
    pub daily: Vec<DaySummary>,
}

impl Default for WeatherView {
    fn default() -> Self {
        Self {
            title: String::new(),
            temperature_text: PLACEHOLDER.to_string(),
            condition_text: PLACEHOLDER.to_string(),
            min_max_text: PLACEHOLDER.to_string(),
            auxiliary_text: PLACEHOLDER.to_string(),
            range_min: 0.0,
            range_max: 0.0,
            hourly: Vec::new(),
            daily: Vec::new(),
        }
    }
}

impl WeatherView {
    pub fn from_snapshot(snapshot: &WeatherSnapshot) -> Self {
        let current = &snapshot.current;

        let min_max_text = snapshot
            .daily
            .first()
            .map(|today| {
                format!("H: {}°  L: {}°", degrees(today.max_temp_c), degrees(today.min_temp_c))
            })
            .unwrap_or_else(|| PLACEHOLDER.to_string());

        let range_min = snapshot.daily.iter().map(|d| d.min_temp_c).reduce(f64::min);
        let range_max = snapshot.daily.iter().map(|d| d.max_temp_c).reduce(f64::max);

        Self {
            title: snapshot.location_name.clone(),
            temperature_text: format!("{}°", degrees(current.temperature_c)),
            condition_text: current.condition_text.clone(),
            min_max_text,
            auxiliary_text: format!(
                "wind {} km/h   humidity {}%",
                degrees(current.wind_kph),
                current.humidity_pct
            ),
            range_min: range_min.unwrap_or(0.0),
            range_max: range_max.unwrap_or(0.0),
            hourly: snapshot.hourly.clone(),
            daily: snapshot.daily.clone(),
        }
    }
}

/// Whole-number rendering, truncating toward zero.
pub fn degrees(value: f64) -> i64 {
    value.trunc() as i64
}
