//! Network reachability flag, written by a background observer and read
//! synchronously by anyone holding the monitor.

use std::{
    fmt::Debug,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

pub trait Connectivity: Send + Sync + Debug {
    fn is_connected(&self) -> bool;
}

#[derive(Debug, Clone)]
struct Probe {
    addr: String,
    interval: Duration,
}

/// Owns the observer task; dropping the monitor (or calling
/// [`shutdown`](Self::shutdown)) stops it.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    connected: Arc<AtomicBool>,
    probe: Option<Probe>,
    cancel: CancellationToken,
}

impl ConnectivityMonitor {
    /// A monitor with no observer; the flag changes only via `set_connected`.
    pub fn fixed(connected: bool) -> Self {
        Self {
            connected: Arc::new(AtomicBool::new(connected)),
            probe: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Starts observing reachability of `addr` (`host:port`) every `interval`.
    ///
    /// Must be called from within a tokio runtime. The flag starts out as
    /// connected until the first probe completes.
    pub fn start(addr: impl Into<String>, interval: Duration) -> Self {
        let probe = Probe { addr: addr.into(), interval };
        let connected = Arc::new(AtomicBool::new(true));
        let cancel = CancellationToken::new();

        tokio::spawn(observe(probe.clone(), Arc::clone(&connected), cancel.clone()));
        tracing::debug!(probe = %probe.addr, ?interval, "Connectivity monitor started");

        Self { connected, probe: Some(probe), cancel }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    /// Probes once right now and updates the flag. Fixed monitors just
    /// report their current value.
    pub async fn refresh(&self) -> bool {
        match &self.probe {
            Some(probe) => {
                let reachable = probe_once(probe).await;
                update(&self.connected, reachable);
                reachable
            }
            None => self.is_connected(),
        }
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Connectivity for ConnectivityMonitor {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

impl Drop for ConnectivityMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn observe(probe: Probe, connected: Arc<AtomicBool>, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(probe.interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let reachable = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    r = probe_once(&probe) => r,
                };
                update(&connected, reachable);
            }
        }
    }

    tracing::debug!(probe = %probe.addr, "Connectivity monitor stopped");
}

async fn probe_once(probe: &Probe) -> bool {
    matches!(
        tokio::time::timeout(probe.interval, TcpStream::connect(probe.addr.as_str())).await,
        Ok(Ok(_))
    )
}

fn update(flag: &AtomicBool, reachable: bool) {
    let previous = flag.swap(reachable, Ordering::AcqRel);
    if previous != reachable {
        tracing::info!(connected = reachable, "Network reachability changed");
    }
}
