//! Error types for the acquisition pipeline.
//!
//! Each stage has its own enum; `LoadError` is what the load orchestration
//! hands to the presentation layer. `user_message()` gives a short text
//! suitable for display next to a retry action.

use thiserror::Error;

/// Failures of the position provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location request timed out")]
    Timeout,

    #[error("Location sensor error: {0}")]
    Sensor(String),

    /// Permission was requested during this call; no coordinate yet.
    #[error("Waiting for location permission")]
    AwaitingPermission,

    /// A newer `resolve()` invalidated this one.
    #[error("Location request superseded by a newer one")]
    Superseded,
}

impl PositionError {
    pub fn user_message(&self) -> &'static str {
        match self {
            PositionError::PermissionDenied => {
                "Location access is off. Showing weather for a saved or default place."
            }
            PositionError::Timeout => {
                "Could not determine your location in time. Showing weather for a saved or default place."
            }
            PositionError::Sensor(_) => {
                "Location is unavailable. Showing weather for a saved or default place."
            }
            PositionError::AwaitingPermission => {
                "Location permission is pending. Showing weather for a saved or default place."
            }
            PositionError::Superseded => "A newer location request is in progress.",
        }
    }
}

/// Failures of a single request to the remote weather API.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Weather API returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("No data received")]
    EmptyResponse,

    #[error("Failed to decode weather data: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Unknown error")]
    Unknown,
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::Transport(e) if e.is_timeout() => {
                "The weather service took too long to respond. Please try again."
            }
            NetworkError::Transport(_) => "Could not reach the weather service. Check your connection.",
            NetworkError::Api { status: 401 | 403, .. } => {
                "The weather service rejected the API key. Run `nowcast configure`."
            }
            NetworkError::Api { .. } => "The weather service returned an error. Please try again.",
            NetworkError::EmptyResponse => "The weather service returned no data. Please try again.",
            NetworkError::Decode(_) => "Received weather data could not be read. Please try again.",
            NetworkError::InvalidRequest(_) | NetworkError::Unknown => {
                "Something went wrong. Please try again."
            }
        }
    }
}

/// Failures of `fetch_weather` / `execute`.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// Offline and nothing cached.
    #[error("No weather data available offline")]
    NoData,

    #[error(transparent)]
    Network(#[from] NetworkError),
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::NoData => "You are offline and no saved weather is available.",
            WeatherError::Network(e) => e.user_message(),
        }
    }
}

/// Local store read/write failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Surfaced to the presentation layer through `LoadEvent::Failed`.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Position(#[from] PositionError),

    #[error(transparent)]
    Weather(#[from] WeatherError),
}

impl LoadError {
    pub fn user_message(&self) -> &'static str {
        match self {
            LoadError::Position(e) => e.user_message(),
            LoadError::Weather(e) => e.user_message(),
        }
    }
}
