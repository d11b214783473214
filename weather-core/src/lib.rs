//! Core library for the `nowcast` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Position resolution with a timeout and a cached/fallback ladder
//! - The WeatherAPI client and the cache-aware weather repository
//! - Shared domain models and the display view derived from them
//!
//! It is used by `nowcast-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod connectivity;
pub mod error;
pub mod loader;
pub mod model;
pub mod payload;
pub mod position;
pub mod provider;
pub mod repository;
pub mod store;
pub mod usecase;
pub mod view;

#[cfg(test)]
mod testing;

pub use config::{Config, DEFAULT_FALLBACK};
pub use connectivity::{Connectivity, ConnectivityMonitor};
pub use error::{LoadError, NetworkError, PositionError, StoreError, WeatherError};
pub use loader::{LoadEvent, LoadState, WeatherLoader};
pub use model::{Coordinate, WeatherSnapshot};
pub use position::{Authorization, LocationSensor, PositionProvider};
pub use provider::WeatherService;
pub use repository::{CachedWeatherRepository, WeatherRepository};
pub use store::{FileStore, LocationCache, MemoryStore, WeatherCache};
pub use usecase::{FetchWeather, FetchWeatherUseCase};
pub use view::WeatherView;
