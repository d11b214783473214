use serde::{Deserialize, Serialize};
use url::Url;

/// Geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// `(0, 0)` is what the store holds when nothing was ever saved.
    pub fn is_unset(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// `lat,lon` as expected by the `q` query parameter.
    pub fn query(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Text + protocol-relative icon path, as delivered by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub text: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature_c: f64,
    pub condition_text: String,
    pub condition_icon_path: String,
    pub wind_kph: f64,
    pub humidity_pct: i64,
}

/// One hour of forecast. `timestamp` is local time, `yyyy-MM-dd HH:mm`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourSample {
    pub timestamp: String,
    pub temperature_c: f64,
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    /// `yyyy-MM-dd`
    pub date: String,
    pub min_temp_c: f64,
    pub max_temp_c: f64,
    pub condition_text: String,
    pub icon_url: Option<Url>,
}

/// Merged result of one successful fetch; also the unit that gets cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub current: CurrentConditions,
    pub location_name: String,
    #[serde(default)]
    pub hourly: Vec<HourSample>,
    #[serde(default)]
    pub daily: Vec<DaySummary>,
}

/// Turns the API's `//cdn...` icon path into an absolute https URL.
pub fn icon_url(protocol_relative: &str) -> Option<Url> {
    Url::parse(&format!("https:{protocol_relative}")).ok()
}
