//! Durable single-slot storage for the last resolved coordinate and the
//! last merged weather snapshot.
//!
//! Both slots are whole-value overwrites. The coordinate slot treats
//! `(0, 0)` as "nothing stored".

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{
    fmt::Debug,
    path::{Path, PathBuf},
};

use crate::{
    Config,
    error::StoreError,
    model::{Coordinate, WeatherSnapshot},
};

const LOCATION_FILE: &str = "location.json";
const SNAPSHOT_FILE: &str = "snapshot.json";

#[async_trait]
pub trait LocationCache: Send + Sync + Debug {
    async fn save_location(&self, coordinate: Coordinate) -> Result<(), StoreError>;

    /// Last saved coordinate, `None` if nothing (or the sentinel) is stored.
    async fn last_location(&self) -> Option<Coordinate>;
}

#[async_trait]
pub trait WeatherCache: Send + Sync + Debug {
    async fn save_snapshot(&self, snapshot: &WeatherSnapshot) -> Result<(), StoreError>;

    async fn cached_snapshot(&self) -> Option<WeatherSnapshot>;
}

/// On-disk layout of the coordinate slot.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct StoredLocation {
    lat: f64,
    lon: f64,
}

/// JSON files in a single directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(config.data_dir()?))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn write_atomic(&self, file: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let target = self.dir.join(file);
        let tmp = self.dir.join(format!("{file}.tmp"));

        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &target).await?;
        Ok(())
    }

    async fn read(&self, file: &str) -> Option<Vec<u8>> {
        let path = self.dir.join(file);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read store file");
                None
            }
        }
    }
}

#[async_trait]
impl LocationCache for FileStore {
    async fn save_location(&self, coordinate: Coordinate) -> Result<(), StoreError> {
        let stored = StoredLocation { lat: coordinate.latitude, lon: coordinate.longitude };
        self.write_atomic(LOCATION_FILE, serde_json::to_vec(&stored)?).await
    }

    async fn last_location(&self) -> Option<Coordinate> {
        let bytes = self.read(LOCATION_FILE).await?;
        let stored: StoredLocation = match serde_json::from_slice(&bytes) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable cached location");
                return None;
            }
        };

        let coordinate = Coordinate::new(stored.lat, stored.lon);
        (!coordinate.is_unset()).then_some(coordinate)
    }
}

#[async_trait]
impl WeatherCache for FileStore {
    async fn save_snapshot(&self, snapshot: &WeatherSnapshot) -> Result<(), StoreError> {
        self.write_atomic(SNAPSHOT_FILE, serde_json::to_vec(snapshot)?).await
    }

    async fn cached_snapshot(&self) -> Option<WeatherSnapshot> {
        let bytes = self.read(SNAPSHOT_FILE).await?;
        match serde_json::from_slice(&bytes) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable cached snapshot");
                None
            }
        }
    }
}

/// In-process store with the same semantics as [`FileStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    location: Mutex<Option<Coordinate>>,
    snapshot: Mutex<Option<WeatherSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_location(self, coordinate: Coordinate) -> Self {
        *self.location.lock() = Some(coordinate);
        self
    }

    pub fn with_snapshot(self, snapshot: WeatherSnapshot) -> Self {
        *self.snapshot.lock() = Some(snapshot);
        self
    }
}

#[async_trait]
impl LocationCache for MemoryStore {
    async fn save_location(&self, coordinate: Coordinate) -> Result<(), StoreError> {
        *self.location.lock() = Some(coordinate);
        Ok(())
    }

    async fn last_location(&self) -> Option<Coordinate> {
        self.location.lock().filter(|c| !c.is_unset())
    }
}

#[async_trait]
impl WeatherCache for MemoryStore {
    async fn save_snapshot(&self, snapshot: &WeatherSnapshot) -> Result<(), StoreError> {
        *self.snapshot.lock() = Some(snapshot.clone());
        Ok(())
    }

    async fn cached_snapshot(&self) -> Option<WeatherSnapshot> {
        self.snapshot.lock().clone()
    }
}
