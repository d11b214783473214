//! Fixtures and doubles shared by the unit tests.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use parking_lot::Mutex;
use std::{
    collections::VecDeque,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use crate::{
    error::NetworkError,
    model::{Condition, Coordinate, CurrentConditions, DaySummary, HourSample, WeatherSnapshot},
    payload::{
        ConditionPayload, CurrentBlock, CurrentPayload, DayPayload, ForecastBlock, ForecastDay,
        ForecastPayload, HourPayload, LocationPayload,
    },
    position::{Authorization, LocationSensor},
    provider::WeatherService,
    repository::Clock,
};

const ICON: &str = "//cdn.weatherapi.com/weather/64x64/day/113.png";

fn condition(text: &str) -> ConditionPayload {
    ConditionPayload { text: text.to_string(), icon: ICON.to_string() }
}

fn location(name: &str) -> LocationPayload {
    LocationPayload {
        name: name.to_string(),
        country: "Russia".to_string(),
        lat: 55.75,
        lon: 37.62,
        localtime: "2025-05-16 12:30".to_string(),
    }
}

pub fn current_payload(name: &str, temp_c: f64) -> CurrentPayload {
    CurrentPayload {
        location: location(name),
        current: CurrentBlock {
            temp_c,
            condition: condition("Sunny"),
            wind_kph: 10.0,
            humidity: 55,
        },
    }
}

pub fn hours(date: &str, range: std::ops::Range<u32>) -> Vec<HourPayload> {
    range
        .map(|h| HourPayload {
            time: format!("{date} {h:02}:00"),
            temp_c: 10.0 + f64::from(h % 10),
            condition: condition("Clear"),
        })
        .collect()
}

pub fn forecast_day(date: &str, hour: Vec<HourPayload>) -> ForecastDay {
    ForecastDay {
        date: date.to_string(),
        day: DayPayload {
            avgtemp_c: 18.0,
            maxtemp_c: 25.0,
            mintemp_c: 11.0,
            condition: condition("Partly cloudy"),
        },
        hour,
    }
}

/// `days` buckets starting 2025-05-16, 24 hours each.
pub fn forecast_payload(days: u32) -> ForecastPayload {
    let forecastday = (0..days)
        .map(|i| {
            let date = format!("2025-05-{:02}", 16 + i);
            forecast_day(&date, hours(&date, 0..24))
        })
        .collect();

    ForecastPayload { location: location("Moscow"), forecast: ForecastBlock { forecastday } }
}

pub fn snapshot_named(name: &str) -> WeatherSnapshot {
    WeatherSnapshot {
        current: CurrentConditions {
            temperature_c: 20.5,
            condition_text: "Clear".to_string(),
            condition_icon_path: ICON.to_string(),
            wind_kph: 10.0,
            humidity_pct: 55,
        },
        location_name: name.to_string(),
        hourly: vec![HourSample {
            timestamp: "2025-05-16 13:00".to_string(),
            temperature_c: 21.0,
            condition: Condition { text: "Clear".to_string(), icon: ICON.to_string() },
        }],
        daily: vec![DaySummary {
            date: "2025-05-16".to_string(),
            min_temp_c: 11.0,
            max_temp_c: 25.0,
            condition_text: "Clear".to_string(),
            icon_url: crate::model::icon_url(ICON),
        }],
    }
}

#[derive(Debug)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

type ErrorFactory = Box<dyn Fn() -> NetworkError + Send + Sync>;

/// Weather service double with per-endpoint delay and failure.
pub struct StubService {
    current: CurrentPayload,
    forecast: ForecastPayload,
    current_error: Option<ErrorFactory>,
    forecast_error: Option<ErrorFactory>,
    current_delay: Duration,
    forecast_delay: Duration,
    calls: AtomicUsize,
    coordinates: Mutex<Vec<Coordinate>>,
}

impl std::fmt::Debug for StubService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StubService").field("calls", &self.calls).finish_non_exhaustive()
    }
}

impl StubService {
    /// Moscow, 20.5°C now, three forecast days.
    pub fn succeeding() -> Self {
        Self::with_payloads(current_payload("Moscow", 20.5), forecast_payload(3))
    }

    pub fn with_payloads(current: CurrentPayload, forecast: ForecastPayload) -> Self {
        Self {
            current,
            forecast,
            current_error: None,
            forecast_error: None,
            current_delay: Duration::ZERO,
            forecast_delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            coordinates: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_current(mut self, f: impl Fn() -> NetworkError + Send + Sync + 'static) -> Self {
        self.current_error = Some(Box::new(f));
        self
    }

    pub fn fail_forecast(mut self, f: impl Fn() -> NetworkError + Send + Sync + 'static) -> Self {
        self.forecast_error = Some(Box::new(f));
        self
    }

    pub fn delay_current(mut self, delay: Duration) -> Self {
        self.current_delay = delay;
        self
    }

    pub fn delay_forecast(mut self, delay: Duration) -> Self {
        self.forecast_delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn coordinates(&self) -> Vec<Coordinate> {
        self.coordinates.lock().clone()
    }

    fn record(&self, coordinate: Coordinate) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.coordinates.lock().push(coordinate);
    }
}

#[async_trait]
impl WeatherService for StubService {
    async fn fetch_current(&self, coordinate: Coordinate) -> Result<CurrentPayload, NetworkError> {
        self.record(coordinate);
        tokio::time::sleep(self.current_delay).await;
        match &self.current_error {
            Some(f) => Err(f()),
            None => Ok(self.current.clone()),
        }
    }

    async fn fetch_forecast(
        &self,
        coordinate: Coordinate,
    ) -> Result<ForecastPayload, NetworkError> {
        self.record(coordinate);
        tokio::time::sleep(self.forecast_delay).await;
        match &self.forecast_error {
            Some(f) => Err(f()),
            None => Ok(self.forecast.clone()),
        }
    }
}

/// Sensor double answering queued requests after a delay. An empty queue
/// never answers.
#[derive(Debug)]
pub struct ScriptedSensor {
    authorization: Authorization,
    script: Mutex<VecDeque<(Duration, Result<Vec<Coordinate>, String>)>>,
    location_requests: AtomicUsize,
    authorization_requests: AtomicUsize,
    stop_calls: AtomicUsize,
}

impl ScriptedSensor {
    pub fn authorized() -> Self {
        Self::with_authorization(Authorization::Authorized)
    }

    pub fn with_authorization(authorization: Authorization) -> Self {
        Self {
            authorization,
            script: Mutex::new(VecDeque::new()),
            location_requests: AtomicUsize::new(0),
            authorization_requests: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, delay: Duration, result: Result<Vec<Coordinate>, String>) {
        self.script.lock().push_back((delay, result));
    }

    pub fn location_requests(&self) -> usize {
        self.location_requests.load(Ordering::SeqCst)
    }

    pub fn authorization_requests(&self) -> usize {
        self.authorization_requests.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocationSensor for ScriptedSensor {
    fn authorization(&self) -> Authorization {
        self.authorization
    }

    fn request_authorization(&self) {
        self.authorization_requests.fetch_add(1, Ordering::SeqCst);
    }

    async fn request_location(&self) -> Result<Vec<Coordinate>, String> {
        self.location_requests.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front();
        match next {
            Some((delay, result)) => {
                tokio::time::sleep(delay).await;
                result
            }
            None => std::future::pending().await,
        }
    }

    fn stop_updating(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
    }
}
