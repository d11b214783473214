use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

use crate::{
    Config,
    error::NetworkError,
    model::Coordinate,
    payload::{CurrentPayload, ForecastPayload},
    provider::weatherapi::WeatherApiClient,
};

pub mod weatherapi;

/// The two independent remote calls the repository joins on.
///
/// Implementations never retry; each call is a single attempt.
#[async_trait]
pub trait WeatherService: Send + Sync + Debug {
    async fn fetch_current(&self, coordinate: Coordinate) -> Result<CurrentPayload, NetworkError>;

    async fn fetch_forecast(&self, coordinate: Coordinate)
    -> Result<ForecastPayload, NetworkError>;
}

/// Construct the weatherapi.com client from config.
pub fn service_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherService>> {
    Ok(Arc::new(WeatherApiClient::from_config(config)?))
}
