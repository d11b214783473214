use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use nowcast_core::{
    Authorization, CachedWeatherRepository, Config, ConnectivityMonitor, Coordinate,
    FetchWeatherUseCase, FileStore, LoadError, LoadEvent, LoadState, LocationCache,
    LocationSensor, MemoryStore, PositionError, PositionProvider, WeatherCache, WeatherLoader,
    WeatherService, WeatherView,
    position::StaticSensor,
    provider::{self, weatherapi::WeatherApiClient},
};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::{render, sensor::ConsentSensor};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "nowcast", version, about = "Current weather and short forecast for where you are")]
pub struct Cli {
    /// Log debug output to stderr (overrides RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the API key, language and location consent.
    Configure,

    /// Show weather for the current (or given) location.
    Show {
        /// Latitude; skips location lookup. Requires --lon.
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Longitude. Requires --lat.
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        /// Don't touch the network for weather; use the saved snapshot.
        #[arg(long)]
        offline: bool,

        /// Keep location and weather in memory only; nothing is read or saved.
        #[arg(long)]
        no_cache: bool,
    },

    /// Print the saved location and weather snapshot.
    Cached,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { lat, lon, offline, no_cache } => {
                let at = lat.zip(lon).map(|(lat, lon)| Coordinate::new(lat, lon));
                show(at, offline, no_cache).await
            }
            Command::Cached => cached().await,
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let key = inquire::Password::new("weatherapi.com API key:")
        .without_confirmation()
        .with_display_mode(inquire::PasswordDisplayMode::Masked)
        .with_help_message(if config.api_key.is_some() {
            "Leave empty to keep the current key"
        } else {
            "Get a free key at https://www.weatherapi.com"
        })
        .prompt()
        .context("Failed to read API key")?;
    if !key.trim().is_empty() {
        config.set_api_key(key.trim().to_string());
    }

    let lang = inquire::Text::new("Language code for condition text:")
        .with_default(&config.lang)
        .prompt()
        .context("Failed to read language")?;
    config.lang = lang.trim().to_string();

    let consent = inquire::Confirm::new("Use your IP address to approximate your location?")
        .with_default(config.location_consent.unwrap_or(true))
        .prompt()
        .context("Failed to read location consent")?;
    config.location_consent = Some(consent);

    config.save()?;
    println!("Configuration saved to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn show(
    at: Option<Coordinate>,
    offline: bool,
    no_cache: bool,
) -> anyhow::Result<()> {
    let config = Config::load()?;

    let service: Arc<dyn WeatherService> = match provider::service_from_config(&config) {
        Ok(service) => service,
        // No request is made offline, so a missing key doesn't matter.
        Err(e) if offline => {
            tracing::debug!(error = %e, "No usable API key, continuing offline");
            Arc::new(WeatherApiClient::new(String::new()))
        }
        Err(e) => return Err(e),
    };

    let (locations, snapshots): (Arc<dyn LocationCache>, Arc<dyn WeatherCache>) = if no_cache {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), store)
    } else {
        let store = Arc::new(FileStore::from_config(&config)?);
        (store.clone(), store)
    };

    let connectivity = if offline {
        ConnectivityMonitor::fixed(false)
    } else {
        let monitor =
            ConnectivityMonitor::start(&config.connectivity_probe, config.connectivity_interval());
        monitor.refresh().await;
        monitor
    };
    let connectivity = Arc::new(connectivity);

    let sensor: Arc<dyn LocationSensor> = match at {
        Some(coordinate) => Arc::new(StaticSensor::new(coordinate)),
        None => Arc::new(ConsentSensor::new(config.clone())),
    };
    let position = Arc::new(
        PositionProvider::new(Arc::clone(&sensor), locations)
            .with_timeout(config.location_timeout()),
    );
    let repository = Arc::new(CachedWeatherRepository::new(service, snapshots, connectivity.clone()));

    let (tx, rx) = mpsc::unbounded_channel();
    let loader = WeatherLoader::new(position, Arc::new(FetchWeatherUseCase::new(repository)), tx)
        .with_fallback(config.fallback);
    let reporter = tokio::spawn(report(rx));

    let asked = sensor.authorization() == Authorization::NotDetermined;
    loader.load().await;
    let answered = asked && sensor.authorization() != Authorization::NotDetermined;
    // Consent just granted: try again with a real position.
    if answered && sensor.authorization() == Authorization::Authorized {
        loader.load().await;
    }

    let state = loader.state();
    let view = loader.view();
    drop(loader);
    connectivity.shutdown();
    let failures = reporter.await.context("Event reporter task failed")?;

    print!("{}", render::view_text(&view));
    report_failures(&failures, answered);

    if state == LoadState::Failed {
        bail!("No weather data to show. Run `nowcast show` again to retry.");
    }
    Ok(())
}

/// Prints progress to stderr and collects failures for the summary. New
/// data clears failures of earlier loads.
async fn report(mut rx: UnboundedReceiver<LoadEvent>) -> Vec<LoadError> {
    let mut failures = Vec::new();

    while let Some(event) = rx.recv().await {
        match event {
            LoadEvent::Started => eprintln!("Loading weather..."),
            LoadEvent::Finished => tracing::debug!("Load attempt finished"),
            LoadEvent::DataUpdated(snapshot) => {
                tracing::debug!(location = %snapshot.location_name, "Weather updated");
                failures.clear();
            }
            LoadEvent::Failed(e) => failures.push(e),
        }
    }

    failures
}

fn report_failures(failures: &[LoadError], consent_answered: bool) {
    for failure in failures {
        if consent_answered
            && matches!(failure, LoadError::Position(PositionError::AwaitingPermission))
        {
            continue;
        }
        eprintln!("\n{}", failure.user_message());
        tracing::debug!(error = %failure, "Load failure");
    }
}

async fn cached() -> anyhow::Result<()> {
    let config = Config::load()?;
    let store = FileStore::from_config(&config)?;

    match store.last_location().await {
        Some(location) => println!("Last location: {location}"),
        None => println!("No saved location."),
    }

    match store.cached_snapshot().await {
        Some(snapshot) => {
            println!();
            print!("{}", render::view_text(&WeatherView::from_snapshot(&snapshot)));
        }
        None => println!("No saved weather. Run `nowcast show` while online."),
    }

    println!("\nData directory: {}", store.dir().display());
    Ok(())
}
