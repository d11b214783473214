use async_trait::async_trait;
use nowcast_core::{Authorization, Config, Coordinate, LocationSensor, position::IpSensor};
use parking_lot::Mutex;
use tokio::runtime::{Handle, RuntimeFlavor};

type Prompt = Box<dyn Fn() -> Option<bool> + Send + Sync>;
type Persist = Box<dyn Fn(&Config) -> anyhow::Result<()> + Send + Sync>;

/// IP-based sensor that asks for consent on the terminal and records the
/// answer in the config file.
pub struct ConsentSensor {
    locator: IpSensor,
    config: Mutex<Config>,
    prompt: Prompt,
    persist: Persist,
}

impl std::fmt::Debug for ConsentSensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsentSensor")
            .field("locator", &self.locator)
            .field("consent", &self.config.lock().location_consent)
            .finish_non_exhaustive()
    }
}

impl ConsentSensor {
    pub fn new(config: Config) -> Self {
        Self::with_hooks(config, ask_on_terminal, Config::save)
    }

    pub fn with_hooks(
        config: Config,
        prompt: impl Fn() -> Option<bool> + Send + Sync + 'static,
        persist: impl Fn(&Config) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            locator: IpSensor::from_config(&config),
            config: Mutex::new(config),
            prompt: Box::new(prompt),
            persist: Box::new(persist),
        }
    }
}

fn ask_on_terminal() -> Option<bool> {
    inquire::Confirm::new("Use your IP address to approximate your location?")
        .with_default(true)
        .with_help_message("The answer is saved; change it later with `nowcast configure`.")
        .prompt()
        .inspect_err(|e| tracing::warn!(error = %e, "Location consent prompt failed"))
        .ok()
}

/// Runs blocking terminal work without stalling other tasks on this worker.
fn blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

#[async_trait]
impl LocationSensor for ConsentSensor {
    fn authorization(&self) -> Authorization {
        match self.config.lock().location_consent {
            None => Authorization::NotDetermined,
            Some(true) => Authorization::Authorized,
            Some(false) => Authorization::Denied,
        }
    }

    fn request_authorization(&self) {
        let Some(granted) = blocking(|| (self.prompt)()) else {
            return;
        };

        let config = {
            let mut config = self.config.lock();
            config.location_consent = Some(granted);
            config.clone()
        };

        if let Err(e) = blocking(|| (self.persist)(&config)) {
            tracing::warn!(error = %e, "Failed to save location consent");
        }
    }

    async fn request_location(&self) -> Result<Vec<Coordinate>, String> {
        self.locator.request_location().await
    }

    fn stop_updating(&self) {
        self.locator.stop_updating();
    }
}
