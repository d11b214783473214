//! Wire types for the weatherapi.com `current.json` and `forecast.json`
//! endpoints, plus their mapping into the domain model.

use serde::Deserialize;

use crate::model::{Condition, CurrentConditions, DaySummary, HourSample, icon_url};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CurrentPayload {
    pub location: LocationPayload,
    pub current: CurrentBlock,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ForecastPayload {
    pub location: LocationPayload,
    pub forecast: ForecastBlock,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LocationPayload {
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lon: f64,
    #[serde(default)]
    pub localtime: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConditionPayload {
    pub text: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CurrentBlock {
    pub temp_c: f64,
    pub condition: ConditionPayload,
    pub wind_kph: f64,
    pub humidity: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ForecastBlock {
    #[serde(default)]
    pub forecastday: Vec<ForecastDay>,
}

/// One day bucket: daily aggregate plus its hourly samples.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ForecastDay {
    pub date: String,
    pub day: DayPayload,
    #[serde(default)]
    pub hour: Vec<HourPayload>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DayPayload {
    #[serde(default)]
    pub avgtemp_c: f64,
    pub maxtemp_c: f64,
    pub mintemp_c: f64,
    pub condition: ConditionPayload,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HourPayload {
    pub time: String,
    pub temp_c: f64,
    pub condition: ConditionPayload,
}

impl From<ConditionPayload> for Condition {
    fn from(c: ConditionPayload) -> Self {
        Condition { text: c.text, icon: c.icon }
    }
}

impl From<CurrentBlock> for CurrentConditions {
    fn from(c: CurrentBlock) -> Self {
        CurrentConditions {
            temperature_c: c.temp_c,
            condition_text: c.condition.text,
            condition_icon_path: c.condition.icon,
            wind_kph: c.wind_kph,
            humidity_pct: c.humidity,
        }
    }
}

impl From<HourPayload> for HourSample {
    fn from(h: HourPayload) -> Self {
        HourSample {
            timestamp: h.time,
            temperature_c: h.temp_c,
            condition: h.condition.into(),
        }
    }
}

impl From<&ForecastDay> for DaySummary {
    fn from(d: &ForecastDay) -> Self {
        DaySummary {
            date: d.date.clone(),
            min_temp_c: d.day.mintemp_c,
            max_temp_c: d.day.maxtemp_c,
            condition_text: d.day.condition.text.clone(),
            icon_url: icon_url(&d.day.condition.icon),
        }
    }
}
