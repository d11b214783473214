//! Fetch-and-merge of current conditions and forecast, with offline
//! fallback to the cached snapshot.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use parking_lot::Mutex;
use std::{fmt::Debug, sync::Arc};

use crate::{
    connectivity::Connectivity,
    error::{NetworkError, WeatherError},
    model::{Coordinate, DaySummary, HourSample, WeatherSnapshot},
    payload::{CurrentPayload, ForecastDay, ForecastPayload, LocationPayload},
    provider::WeatherService,
    store::WeatherCache,
};

/// Format of `HourSample::timestamp`.
pub const HOUR_FORMAT: &str = "%Y-%m-%d %H:%M";

#[async_trait]
pub trait WeatherRepository: Send + Sync + Debug {
    async fn fetch_weather(&self, coordinate: Coordinate) -> Result<WeatherSnapshot, WeatherError>;
}

/// Fallback source of "now" for the hourly window, used when the payload
/// carries no usable `localtime`. `LocalClock` reads the machine's zone,
/// which differs from the queried location's zone for distant places.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

#[derive(Debug)]
pub struct CachedWeatherRepository {
    service: Arc<dyn WeatherService>,
    cache: Arc<dyn WeatherCache>,
    connectivity: Arc<dyn Connectivity>,
    clock: Arc<dyn Clock>,
}

impl CachedWeatherRepository {
    pub fn new(
        service: Arc<dyn WeatherService>,
        cache: Arc<dyn WeatherCache>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Self {
        Self { service, cache, connectivity, clock: Arc::new(LocalClock) }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

#[async_trait]
impl WeatherRepository for CachedWeatherRepository {
    /// Offline: the cached snapshot or [`WeatherError::NoData`], no network.
    ///
    /// Online: both requests run concurrently and are both awaited. If
    /// either fails the whole fetch fails; when both fail, the error
    /// recorded last is returned, which is whichever branch finished second
    /// and is not deterministic. On success the merged snapshot is written
    /// to the cache; a failed write is logged and ignored.
    async fn fetch_weather(&self, coordinate: Coordinate) -> Result<WeatherSnapshot, WeatherError> {
        if !self.connectivity.is_connected() {
            tracing::info!("Offline, serving cached weather");
            return self.cache.cached_snapshot().await.ok_or(WeatherError::NoData);
        }

        let last_error: Mutex<Option<NetworkError>> = Mutex::new(None);
        let record = |e: NetworkError| {
            tracing::warn!(error = %e, "Weather request failed");
            *last_error.lock() = Some(e);
        };

        let (current, forecast) = tokio::join!(
            async {
                self.service.fetch_current(coordinate).await.map_err(&record).ok()
            },
            async {
                self.service.fetch_forecast(coordinate).await.map_err(&record).ok()
            },
        );

        let (Some(current), Some(forecast)) = (current, forecast) else {
            let err = last_error.into_inner().unwrap_or(NetworkError::Unknown);
            return Err(err.into());
        };

        let now = location_now(&current.location).unwrap_or_else(|| self.clock.now());
        let snapshot = build_snapshot(current, forecast, now);
        tracing::info!(
            location = %snapshot.location_name,
            hours = snapshot.hourly.len(),
            days = snapshot.daily.len(),
            "Weather fetched"
        );

        if let Err(e) = self.cache.save_snapshot(&snapshot).await {
            tracing::warn!(error = %e, "Failed to cache weather snapshot");
        }

        Ok(snapshot)
    }
}

/// Merges the two payloads into one snapshot.
pub fn build_snapshot(
    current: CurrentPayload,
    forecast: ForecastPayload,
    now: NaiveDateTime,
) -> WeatherSnapshot {
    let days = forecast.forecast.forecastday;

    WeatherSnapshot {
        hourly: rolling_hourly_window(&days, now),
        daily: days.iter().map(DaySummary::from).collect(),
        location_name: current.location.name,
        current: current.current.into(),
    }
}

/// Current wall-clock time at the queried location, in the same zone as the
/// hour timestamps.
pub fn location_now(location: &LocationPayload) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(location.localtime.trim(), HOUR_FORMAT).ok()
}

/// Hours of the first bucket strictly after `now`, followed by every hour
/// of the second bucket. Source order is kept; unparseable timestamps in
/// the first bucket are dropped.
pub fn rolling_hourly_window(days: &[ForecastDay], now: NaiveDateTime) -> Vec<HourSample> {
    let Some(today) = days.first() else {
        return Vec::new();
    };

    let remaining_today = today.hour.iter().filter(|h| {
        NaiveDateTime::parse_from_str(&h.time, HOUR_FORMAT).is_ok_and(|t| t > now)
    });
    let tomorrow = days.get(1).map(|d| d.hour.as_slice()).unwrap_or_default();

    remaining_today.chain(tomorrow).cloned().map(HourSample::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        connectivity::ConnectivityMonitor,
        error::StoreError,
        store::MemoryStore,
        testing::{
            FixedClock, StubService, current_payload, forecast_day, forecast_payload, hours,
            snapshot_named,
        },
    };
    use std::time::Duration;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, HOUR_FORMAT).unwrap()
    }

    fn repository(
        service: &Arc<StubService>,
        cache: &Arc<MemoryStore>,
        online: bool,
    ) -> CachedWeatherRepository {
        CachedWeatherRepository::new(
            service.clone(),
            cache.clone(),
            Arc::new(ConnectivityMonitor::fixed(online)),
        )
        .with_clock(Arc::new(FixedClock(at("2025-05-16 12:30"))))
    }

    #[derive(Debug)]
    struct BrokenCache;

    #[async_trait]
    impl WeatherCache for BrokenCache {
        async fn save_snapshot(&self, _: &WeatherSnapshot) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk full")))
        }

        async fn cached_snapshot(&self) -> Option<WeatherSnapshot> {
            None
        }
    }

    #[tokio::test]
    async fn offline_serves_cached_snapshot_without_network() {
        let service = Arc::new(StubService::succeeding());
        let cache = Arc::new(MemoryStore::new().with_snapshot(snapshot_named("Moscow")));
        let repo = repository(&service, &cache, false);

        let snapshot = repo.fetch_weather(Coordinate::new(10.0, 20.0)).await.unwrap();

        assert_eq!(snapshot, snapshot_named("Moscow"));
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn offline_without_cache_is_no_data() {
        let service = Arc::new(StubService::succeeding());
        let cache = Arc::new(MemoryStore::new());
        let repo = repository(&service, &cache, false);

        let err = repo.fetch_weather(Coordinate::new(10.0, 20.0)).await.unwrap_err();

        assert!(matches!(err, WeatherError::NoData));
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn online_merges_both_payloads_and_caches() {
        let service = Arc::new(StubService::succeeding());
        let cache = Arc::new(MemoryStore::new());
        let repo = repository(&service, &cache, true);

        let snapshot = repo.fetch_weather(Coordinate::new(55.75, 37.62)).await.unwrap();

        assert_eq!(snapshot.location_name, "Moscow");
        assert_eq!(snapshot.current.temperature_c, 20.5);
        let dates: Vec<_> = snapshot.daily.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, ["2025-05-16", "2025-05-17", "2025-05-18"]);
        assert_eq!(service.calls(), 2);
        assert_eq!(service.coordinates(), vec![Coordinate::new(55.75, 37.62); 2]);
        assert_eq!(cache.cached_snapshot().await, Some(snapshot));
    }

    #[tokio::test]
    async fn online_failure_is_not_masked_by_cache() {
        let service = Arc::new(StubService::succeeding().fail_current(|| NetworkError::EmptyResponse));
        let cache = Arc::new(MemoryStore::new().with_snapshot(snapshot_named("Moscow")));
        let repo = repository(&service, &cache, true);

        let err = repo.fetch_weather(Coordinate::new(1.0, 1.0)).await.unwrap_err();

        assert!(matches!(err, WeatherError::Network(NetworkError::EmptyResponse)));
        assert_eq!(cache.cached_snapshot().await, Some(snapshot_named("Moscow")));
    }

    #[tokio::test]
    async fn forecast_failure_fails_whole_fetch() {
        let service = Arc::new(StubService::succeeding().fail_forecast(|| NetworkError::Api {
            status: 500,
            message: "boom".into(),
        }));
        let cache = Arc::new(MemoryStore::new());
        let repo = repository(&service, &cache, true);

        let err = repo.fetch_weather(Coordinate::new(1.0, 1.0)).await.unwrap_err();

        assert!(matches!(err, WeatherError::Network(NetworkError::Api { status: 500, .. })));
        assert_eq!(service.calls(), 2);
        assert_eq!(cache.cached_snapshot().await, None);
    }

    #[tokio::test]
    async fn both_failing_surfaces_one_of_the_errors() {
        let service = Arc::new(
            StubService::succeeding()
                .fail_current(|| NetworkError::EmptyResponse)
                .fail_forecast(|| NetworkError::Unknown),
        );
        let cache = Arc::new(MemoryStore::new());
        let repo = repository(&service, &cache, true);

        let err = repo.fetch_weather(Coordinate::new(1.0, 1.0)).await.unwrap_err();

        assert!(matches!(
            err,
            WeatherError::Network(NetworkError::EmptyResponse | NetworkError::Unknown)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_the_slower_request() {
        let service = Arc::new(
            StubService::succeeding()
                .delay_current(Duration::from_millis(10))
                .delay_forecast(Duration::from_secs(2)),
        );
        let cache = Arc::new(MemoryStore::new());
        let repo = repository(&service, &cache, true);

        let started = tokio::time::Instant::now();
        let snapshot = repo.fetch_weather(Coordinate::new(1.0, 1.0)).await.unwrap();

        assert_eq!(started.elapsed(), Duration::from_secs(2));
        assert_eq!(snapshot.daily.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_failure_still_fails_after_fast_success() {
        let service = Arc::new(
            StubService::succeeding()
                .delay_forecast(Duration::from_secs(1))
                .fail_forecast(|| NetworkError::EmptyResponse),
        );
        let cache = Arc::new(MemoryStore::new());
        let repo = repository(&service, &cache, true);

        assert!(repo.fetch_weather(Coordinate::new(1.0, 1.0)).await.is_err());
        assert_eq!(cache.cached_snapshot().await, None);
    }

    #[tokio::test]
    async fn cache_write_failure_is_swallowed() {
        let service = Arc::new(StubService::succeeding());
        let repo = CachedWeatherRepository::new(
            service.clone(),
            Arc::new(BrokenCache),
            Arc::new(ConnectivityMonitor::fixed(true)),
        );

        let snapshot = repo.fetch_weather(Coordinate::new(1.0, 1.0)).await.unwrap();
        assert_eq!(snapshot.location_name, "Moscow");
    }

    #[test]
    fn window_keeps_future_hours_of_today_then_all_of_tomorrow() {
        let days = vec![
            forecast_day("2025-05-16", hours("2025-05-16", 0..24)),
            forecast_day("2025-05-17", hours("2025-05-17", 0..24)),
            forecast_day("2025-05-18", hours("2025-05-18", 0..24)),
        ];

        let window = rolling_hourly_window(&days, at("2025-05-16 12:30"));

        assert_eq!(window.len(), 11 + 24);
        assert_eq!(window[0].timestamp, "2025-05-16 13:00");
        assert_eq!(window[10].timestamp, "2025-05-16 23:00");
        assert_eq!(window[11].timestamp, "2025-05-17 00:00");
        assert_eq!(window.last().map(|h| h.timestamp.as_str()), Some("2025-05-17 23:00"));
    }

    #[test]
    fn window_excludes_the_current_instant() {
        let days = vec![forecast_day("2025-05-16", hours("2025-05-16", 10..14))];

        let window = rolling_hourly_window(&days, at("2025-05-16 12:00"));

        let stamps: Vec<_> = window.iter().map(|h| h.timestamp.as_str()).collect();
        assert_eq!(stamps, ["2025-05-16 13:00"]);
    }

    #[test]
    fn window_takes_tomorrow_unfiltered_even_if_now_is_later() {
        let days = vec![
            forecast_day("2025-05-16", hours("2025-05-16", 0..2)),
            forecast_day("2025-05-17", hours("2025-05-17", 0..3)),
        ];

        let window = rolling_hourly_window(&days, at("2025-05-20 00:00"));

        assert_eq!(window.len(), 3);
        assert_eq!(window[0].timestamp, "2025-05-17 00:00");
    }

    #[test]
    fn window_is_empty_without_buckets() {
        assert!(rolling_hourly_window(&[], at("2025-05-16 12:00")).is_empty());
    }

    #[test]
    fn window_drops_unparseable_today_hours() {
        let mut today = hours("2025-05-16", 13..15);
        today[0].time = "16/05/2025 13:00".to_string();
        let days = vec![forecast_day("2025-05-16", today)];

        let window = rolling_hourly_window(&days, at("2025-05-16 12:00"));

        assert_eq!(window.len(), 1);
        assert_eq!(window[0].timestamp, "2025-05-16 14:00");
    }

    #[test]
    fn build_snapshot_keeps_today_in_daily() {
        let forecast = forecast_payload(3);
        let snapshot =
            build_snapshot(current_payload("Kazan", 3.0), forecast, at("2025-05-16 23:30"));

        assert_eq!(snapshot.location_name, "Kazan");
        assert_eq!(snapshot.daily.len(), 3);
        assert_eq!(snapshot.daily[0].date, "2025-05-16");
        assert!(snapshot.daily[0].icon_url.is_some());
        assert_eq!(snapshot.hourly.len(), 24);
    }

    #[tokio::test]
    async fn window_follows_the_location_clock_not_the_machine() {
        let mut current = current_payload("Tokyo", 18.0);
        current.location.localtime = "2025-05-16 20:15".to_string();
        let service = Arc::new(StubService::with_payloads(current, forecast_payload(2)));
        let cache = Arc::new(MemoryStore::new());
        // Machine clock says 12:30; the location is already at 20:15.
        let repo = repository(&service, &cache, true);

        let snapshot = repo.fetch_weather(Coordinate::new(35.68, 139.69)).await.unwrap();

        assert_eq!(snapshot.hourly.len(), 3 + 24);
        assert_eq!(snapshot.hourly[0].timestamp, "2025-05-16 21:00");
    }

    #[tokio::test]
    async fn missing_localtime_falls_back_to_clock() {
        let mut current = current_payload("Moscow", 20.5);
        current.location.localtime = String::new();
        let service = Arc::new(StubService::with_payloads(current, forecast_payload(2)));
        let cache = Arc::new(MemoryStore::new());
        let repo = repository(&service, &cache, true);

        let snapshot = repo.fetch_weather(Coordinate::new(55.75, 37.62)).await.unwrap();

        assert_eq!(snapshot.hourly[0].timestamp, "2025-05-16 13:00");
        assert_eq!(snapshot.hourly.len(), 11 + 24);
    }

    #[test]
    fn location_now_accepts_unpadded_hours() {
        let mut location = current_payload("Moscow", 1.0).location;
        location.localtime = "2025-05-16 9:05".to_string();
        assert_eq!(location_now(&location), Some(at("2025-05-16 09:05")));

        location.localtime = "soon".to_string();
        assert_eq!(location_now(&location), None);
    }
}
