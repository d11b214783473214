use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{Authorization, LocationSensor};
use crate::{Config, model::Coordinate};

/// Approximate position from the public IP address (ip-api.com format).
///
/// Permission is the user's recorded consent: `None` means never asked.
#[derive(Debug, Clone)]
pub struct IpSensor {
    http: Client,
    url: String,
    consent: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
}

impl IpSensor {
    pub fn new(url: impl Into<String>, consent: Option<bool>) -> Self {
        Self { http: Client::new(), url: url.into(), consent }
    }

    pub fn from_config(config: &Config) -> Self {
        let http = Client::builder()
            .timeout(config.location_timeout() + Duration::from_secs(1))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client for IP lookup");
                Client::new()
            });

        Self { http, url: config.ip_locator_url.clone(), consent: config.location_consent }
    }
}

#[async_trait]
impl LocationSensor for IpSensor {
    fn authorization(&self) -> Authorization {
        match self.consent {
            None => Authorization::NotDetermined,
            Some(true) => Authorization::Authorized,
            Some(false) => Authorization::Denied,
        }
    }

    fn request_authorization(&self) {
        tracing::info!("IP-based location needs consent; run `nowcast configure` to grant it");
    }

    async fn request_location(&self) -> Result<Vec<Coordinate>, String> {
        let res = self.http.get(&self.url).send().await.map_err(|e| e.to_string())?;
        let status = res.status();
        if !status.is_success() {
            return Err(format!("IP locator returned status {status}"));
        }

        let body: IpApiResponse = res.json().await.map_err(|e| e.to_string())?;
        if body.status != "success" {
            return Err(body.message.unwrap_or_else(|| "IP lookup failed".to_string()));
        }

        match (body.lat, body.lon) {
            (Some(lat), Some(lon)) => Ok(vec![Coordinate::new(lat, lon)]),
            _ => Ok(Vec::new()),
        }
    }

    fn stop_updating(&self) {
        tracing::debug!("IP location request abandoned");
    }
}
