use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use url::Url;

use crate::{
    Config,
    error::NetworkError,
    model::Coordinate,
    payload::{CurrentPayload, ForecastPayload},
};

use super::WeatherService;

pub const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com/v1";
const FORECAST_DAYS: &str = "3";

/// Client for weatherapi.com `current.json` / `forecast.json`.
#[derive(Debug, Clone)]
pub struct WeatherApiClient {
    api_key: String,
    lang: String,
    base_url: String,
    http: Client,
}

impl WeatherApiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            lang: "en".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            http: Client::new(),
        }
    }

    /// Builds a client with the configured key, language, endpoint and
    /// per-request timeout.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            api_key: config.api_key()?.to_owned(),
            lang: config.lang.clone(),
            base_url: config.base_url.clone(),
            http,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    fn endpoint(&self, name: &str) -> Result<Url, NetworkError> {
        let raw = format!("{}/{}", self.base_url.trim_end_matches('/'), name);
        Url::parse(&raw).map_err(|e| NetworkError::InvalidRequest(format!("{raw}: {e}")))
    }

    async fn fetch<T>(
        &self,
        name: &str,
        coordinate: Coordinate,
        extra: &[(&str, &str)],
    ) -> Result<T, NetworkError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        if !coordinate.is_finite() {
            return Err(NetworkError::InvalidRequest(format!(
                "coordinate is not finite: {coordinate:?}"
            )));
        }
        let url = self.endpoint(name)?;
        let q = coordinate.query();

        let mut query: Vec<(&str, &str)> = vec![("key", self.api_key.as_str()), ("q", q.as_str())];
        query.extend_from_slice(extra);
        query.push(("lang", self.lang.as_str()));

        tracing::debug!(
            endpoint = name,
            lat = coordinate.latitude,
            lon = coordinate.longitude,
            "Requesting weather data"
        );

        let res = self
            .http
            .get(url)
            .query(&query)
            .send()
            .await
            .map_err(NetworkError::Transport)?;

        let status = res.status();
        let body = res.bytes().await.map_err(NetworkError::Transport)?;
        tracing::debug!(endpoint = name, status = %status, bytes = body.len(), "Received response");

        if !status.is_success() {
            return Err(NetworkError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        if body.is_empty() {
            return Err(NetworkError::EmptyResponse);
        }

        decode_off_thread(body).await
    }
}

#[async_trait]
impl WeatherService for WeatherApiClient {
    async fn fetch_current(&self, coordinate: Coordinate) -> Result<CurrentPayload, NetworkError> {
        self.fetch("current.json", coordinate, &[]).await
    }

    async fn fetch_forecast(
        &self,
        coordinate: Coordinate,
    ) -> Result<ForecastPayload, NetworkError> {
        self.fetch("forecast.json", coordinate, &[("days", FORECAST_DAYS)]).await
    }
}

/// Parses on the blocking pool; the awaiting task gets the result.
async fn decode_off_thread<T, B>(body: B) -> Result<T, NetworkError>
where
    T: DeserializeOwned + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    tokio::task::spawn_blocking(move || serde_json::from_slice::<T>(body.as_ref()))
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Decode task failed");
            NetworkError::Unknown
        })?
        .map_err(NetworkError::Decode)
}

#[derive(Debug, Deserialize)]
struct WaErrorBody {
    error: WaError,
}

#[derive(Debug, Deserialize)]
struct WaError {
    message: String,
}

/// The API reports failures as `{"error": {"code": .., "message": ..}}`.
fn api_error_message(body: &[u8]) -> String {
    match serde_json::from_slice::<WaErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => truncate_body(&String::from_utf8_lossy(body)),
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
