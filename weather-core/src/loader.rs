//! One load cycle: position → weather, with the cached/fallback ladder, and
//! the lifecycle events the presentation layer listens to.

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    config::DEFAULT_FALLBACK,
    error::{LoadError, PositionError, WeatherError},
    model::{Coordinate, WeatherSnapshot},
    position::PositionProvider,
    usecase::FetchWeather,
    view::WeatherView,
};

/// Notifications for the presentation layer, in delivery order.
#[derive(Debug)]
pub enum LoadEvent {
    Started,
    Finished,
    DataUpdated(Arc<WeatherSnapshot>),
    Failed(LoadError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Done,
    Failed,
}

/// Emits `Started` on creation and `Finished` exactly once when dropped.
struct Attempt<'a> {
    loader: &'a WeatherLoader,
}

impl<'a> Attempt<'a> {
    fn begin(loader: &'a WeatherLoader) -> Self {
        *loader.state.write() = LoadState::Loading;
        loader.emit(LoadEvent::Started);
        Self { loader }
    }

    fn finish(self) {}
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        self.loader.emit(LoadEvent::Finished);
    }
}

#[derive(Debug)]
pub struct WeatherLoader {
    position: Arc<PositionProvider>,
    fetch: Arc<dyn FetchWeather>,
    fallback: Coordinate,
    events: UnboundedSender<LoadEvent>,
    state: RwLock<LoadState>,
    latest: RwLock<Option<Arc<WeatherSnapshot>>>,
}

impl WeatherLoader {
    pub fn new(
        position: Arc<PositionProvider>,
        fetch: Arc<dyn FetchWeather>,
        events: UnboundedSender<LoadEvent>,
    ) -> Self {
        Self {
            position,
            fetch,
            fallback: DEFAULT_FALLBACK,
            events,
            state: RwLock::new(LoadState::Idle),
            latest: RwLock::new(None),
        }
    }

    pub fn with_fallback(mut self, fallback: Coordinate) -> Self {
        self.fallback = fallback;
        self
    }

    /// Runs one full load. Call again to retry.
    ///
    /// When the position cannot be resolved, weather is fetched for the
    /// cached location (or the fallback coordinate) in a second attempt,
    /// and the position error is reported after that attempt's result.
    pub async fn load(&self) {
        let attempt = Attempt::begin(self);

        let err = match self.position.resolve().await {
            Ok(coordinate) => {
                let result = self.fetch.execute(coordinate).await;
                attempt.finish();
                self.deliver(result);
                return;
            }
            Err(PositionError::Superseded) => {
                tracing::debug!("Load superseded by a newer one");
                return;
            }
            Err(err) => err,
        };
        attempt.finish();

        let coordinate = match self.position.cached_location().await {
            Some(cached) => cached,
            None => self.fallback,
        };
        tracing::info!(
            error = %err,
            lat = coordinate.latitude,
            lon = coordinate.longitude,
            "Position unavailable, loading weather for substitute location"
        );

        let retry = Attempt::begin(self);
        let result = self.fetch.execute(coordinate).await;
        retry.finish();
        self.deliver(result);

        self.emit(LoadEvent::Failed(err.into()));
    }

    pub fn state(&self) -> LoadState {
        *self.state.read()
    }

    pub fn latest(&self) -> Option<Arc<WeatherSnapshot>> {
        self.latest.read().clone()
    }

    /// Display fields for the latest delivered snapshot.
    pub fn view(&self) -> WeatherView {
        self.latest.read().as_deref().map(WeatherView::from_snapshot).unwrap_or_default()
    }

    fn deliver(&self, result: Result<WeatherSnapshot, WeatherError>) {
        match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                *self.latest.write() = Some(Arc::clone(&snapshot));
                *self.state.write() = LoadState::Done;
                self.emit(LoadEvent::DataUpdated(snapshot));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Weather load failed");
                *self.state.write() = LoadState::Failed;
                self.emit(LoadEvent::Failed(e.into()));
            }
        }
    }

    fn emit(&self, event: LoadEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("Load event dropped, no listener");
        }
    }
}
