//! Position resolution: one sensor request raced against a fixed timeout.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
    fmt::Debug,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio_util::sync::CancellationToken;

use crate::{error::PositionError, model::Coordinate, store::LocationCache};

pub mod ip;

pub use ip::IpSensor;

pub const DEFAULT_LOCATION_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    NotDetermined,
    Denied,
    Restricted,
    Authorized,
}

/// Platform location source.
#[async_trait]
pub trait LocationSensor: Send + Sync + Debug {
    fn authorization(&self) -> Authorization;

    /// Ask for permission. The answer arrives out of band; the sensor's
    /// `authorization()` reflects it on a later call.
    fn request_authorization(&self);

    /// One location request. Fixes are ordered oldest first.
    async fn request_location(&self) -> Result<Vec<Coordinate>, String>;

    /// Called when the request is abandoned (timeout).
    fn stop_updating(&self);
}

/// Always-authorized sensor reporting one fixed coordinate.
#[derive(Debug, Clone, Copy)]
pub struct StaticSensor {
    coordinate: Coordinate,
}

impl StaticSensor {
    pub fn new(coordinate: Coordinate) -> Self {
        Self { coordinate }
    }
}

#[async_trait]
impl LocationSensor for StaticSensor {
    fn authorization(&self) -> Authorization {
        Authorization::Authorized
    }

    fn request_authorization(&self) {}

    async fn request_location(&self) -> Result<Vec<Coordinate>, String> {
        Ok(vec![self.coordinate])
    }

    fn stop_updating(&self) {}
}

#[derive(Debug)]
struct Pending {
    id: u64,
    token: CancellationToken,
}

/// Resolves the device position, falling back to nothing: callers decide
/// what to do with a failure.
#[derive(Debug)]
pub struct PositionProvider {
    sensor: Arc<dyn LocationSensor>,
    cache: Arc<dyn LocationCache>,
    timeout: Duration,
    next_id: AtomicU64,
    pending: Mutex<Option<Pending>>,
}

impl PositionProvider {
    pub fn new(sensor: Arc<dyn LocationSensor>, cache: Arc<dyn LocationCache>) -> Self {
        Self {
            sensor,
            cache,
            timeout: DEFAULT_LOCATION_TIMEOUT,
            next_id: AtomicU64::new(0),
            pending: Mutex::new(None),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolves one coordinate.
    ///
    /// The sensor fix and the timeout race; the loser is dropped, so at most
    /// one outcome is produced. A newer call cancels an older pending one,
    /// which then returns [`PositionError::Superseded`].
    pub async fn resolve(&self) -> Result<Coordinate, PositionError> {
        match self.sensor.authorization() {
            Authorization::NotDetermined => {
                tracing::info!("Location permission not determined, requesting it");
                self.sensor.request_authorization();
                return Err(PositionError::AwaitingPermission);
            }
            Authorization::Denied | Authorization::Restricted => {
                return Err(PositionError::PermissionDenied);
            }
            Authorization::Authorized => {}
        }

        let (id, token) = self.arm();

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => Err(PositionError::Superseded),
            fix = self.sensor.request_location() => match fix {
                Ok(fixes) => newest_fix(fixes),
                Err(e) => Err(PositionError::Sensor(e)),
            },
            _ = tokio::time::sleep(self.timeout) => {
                self.sensor.stop_updating();
                Err(PositionError::Timeout)
            }
        };

        self.disarm(id);

        match outcome {
            Ok(coordinate) => {
                tracing::info!(
                    lat = coordinate.latitude,
                    lon = coordinate.longitude,
                    "Location resolved"
                );
                if let Err(e) = self.cache.save_location(coordinate).await {
                    tracing::warn!(error = %e, "Failed to cache location");
                }
                Ok(coordinate)
            }
            Err(e) => {
                tracing::debug!(error = %e, "Location resolution failed");
                Err(e)
            }
        }
    }

    /// Last successfully resolved coordinate, if any.
    pub async fn cached_location(&self) -> Option<Coordinate> {
        self.cache.last_location().await
    }

    fn arm(&self) -> (u64, CancellationToken) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        let previous = self.pending.lock().replace(Pending { id, token: token.clone() });
        if let Some(previous) = previous {
            tracing::debug!(superseded = previous.id, "Cancelling pending location request");
            previous.token.cancel();
        }

        (id, token)
    }

    fn disarm(&self, id: u64) {
        let mut pending = self.pending.lock();
        if pending.as_ref().is_some_and(|p| p.id == id) {
            *pending = None;
        }
    }
}

fn newest_fix(fixes: Vec<Coordinate>) -> Result<Coordinate, PositionError> {
    match fixes.last() {
        None => Err(PositionError::Sensor("no location reported".to_string())),
        Some(c) if !c.is_finite() || c.is_unset() => {
            Err(PositionError::Sensor(format!("invalid location reported: {c:?}")))
        }
        Some(c) => Ok(*c),
    }
}
