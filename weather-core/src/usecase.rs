use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

use crate::{
    error::WeatherError,
    model::{Coordinate, WeatherSnapshot},
    repository::WeatherRepository,
};

/// Entry point used by the load orchestration.
#[async_trait]
pub trait FetchWeather: Send + Sync + Debug {
    async fn execute(&self, coordinate: Coordinate) -> Result<WeatherSnapshot, WeatherError>;
}

#[derive(Debug, Clone)]
pub struct FetchWeatherUseCase {
    repository: Arc<dyn WeatherRepository>,
}

impl FetchWeatherUseCase {
    pub fn new(repository: Arc<dyn WeatherRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl FetchWeather for FetchWeatherUseCase {
    async fn execute(&self, coordinate: Coordinate) -> Result<WeatherSnapshot, WeatherError> {
        self.repository.fetch_weather(coordinate).await
    }
}
