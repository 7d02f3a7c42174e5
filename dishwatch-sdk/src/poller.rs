//! Background poller driving the accumulator.

use std::sync::{Arc, Once};
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::source::with_timeout;
use crate::{Accumulator, HistorySource, SourceError, UpdateOutcome};

/// Lifecycle of a [`Poller`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    /// Built but not started.
    Idle,
    /// Ticking.
    Running,
    /// Stop requested; the loop exits at the next tick boundary.
    Stopping,
    /// The loop has exited.
    Stopped,
}

/// The accumulator's single writer.
///
/// Once started, the poller makes one history call per tick and feeds the
/// result to [`Accumulator::update`]. A failed or timed-out call is recorded
/// on the accumulator and the poller waits for the next tick; failures are
/// never retried faster than the interval and never end the loop.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use dishwatch_sdk::{Accumulator, HistorySource, Poller};
///
/// # async fn run(dish: Arc<dyn HistorySource>) {
/// let accumulator = Arc::new(Accumulator::new());
/// let handle = Poller::builder(dish, accumulator.clone())
///     .fetch_timeout(Duration::from_secs(5))
///     .build()
///     .start();
///
/// // ... serve scrapes ...
///
/// handle.stop().await;
/// # }
/// ```
pub struct Poller {
    source: Arc<dyn HistorySource>,
    accumulator: Arc<Accumulator>,
    interval: Duration,
    fetch_timeout: Duration,
    shutdown: Option<watch::Receiver<bool>>,
    state: Arc<RwLock<PollerState>>,
}

impl Poller {
    /// Create a poller with a 1 second interval and 10 second fetch timeout.
    pub fn new(source: Arc<dyn HistorySource>, accumulator: Arc<Accumulator>) -> Self {
        Self::builder(source, accumulator).build()
    }

    /// Create a builder for configuring the poller.
    pub fn builder(source: Arc<dyn HistorySource>, accumulator: Arc<Accumulator>) -> PollerBuilder {
        PollerBuilder::new(source, accumulator)
    }

    pub fn state(&self) -> PollerState {
        *self.state.read()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    /// Make a single history call and apply it to the accumulator.
    ///
    /// This is what every tick does. It is public so callers can drive the
    /// accumulator manually, e.g. in tests.
    pub async fn poll_once(&self) -> Result<UpdateOutcome, SourceError> {
        match with_timeout(self.fetch_timeout, self.source.history()).await {
            Ok(history) => Ok(self.accumulator.update(&history)),
            Err(e) => {
                warn!(error = %e, "Failed to get history");
                self.accumulator.record_error(e.clone());
                Err(e)
            }
        }
    }

    /// Start background polling.
    ///
    /// This spawns a tokio task that ticks until [`PollerHandle::stop`] is
    /// called, the handle is dropped, or the external shutdown signal fires.
    pub fn start(self) -> PollerHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let state = self.state.clone();

        *state.write() = PollerState::Running;
        let task = tokio::spawn(self.run(stop_rx));

        PollerHandle {
            stop_tx,
            stop_once: Once::new(),
            task: tokio::sync::Mutex::new(Some(task)),
            state,
        }
    }

    async fn run(mut self, mut stop_rx: watch::Receiver<bool>) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            "History poller started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut shutdown = self.shutdown.take();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let _ = self.poll_once().await;
                }
                _ = stop_rx.changed() => {
                    break;
                }
                _ = shutdown_requested(&mut shutdown) => {
                    *self.state.write() = PollerState::Stopping;
                    break;
                }
            }
        }

        info!("History poller stopping");
        *self.state.write() = PollerState::Stopped;
    }
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("interval", &self.interval)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("state", &self.state())
            .finish()
    }
}

async fn shutdown_requested(shutdown: &mut Option<watch::Receiver<bool>>) {
    match shutdown {
        Some(rx) => wait_for_shutdown(rx).await,
        None => std::future::pending().await,
    }
}

/// Resolves once the signal is set to `true` or its sender is gone.
pub(crate) async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Builder for configuring a [`Poller`].
pub struct PollerBuilder {
    source: Arc<dyn HistorySource>,
    accumulator: Arc<Accumulator>,
    interval: Option<Duration>,
    fetch_timeout: Option<Duration>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl PollerBuilder {
    /// Create a new builder.
    pub fn new(source: Arc<dyn HistorySource>, accumulator: Arc<Accumulator>) -> Self {
        Self {
            source,
            accumulator,
            interval: None,
            fetch_timeout: None,
            shutdown: None,
        }
    }

    /// Set the polling interval.
    ///
    /// Defaults to 1 second, the device's sample period.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Set the timeout for each history call (default: 10 seconds).
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Stop polling when this signal becomes `true`.
    pub fn shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Build the poller.
    pub fn build(self) -> Poller {
        Poller {
            source: self.source,
            accumulator: self.accumulator,
            interval: self.interval.unwrap_or(Duration::from_secs(1)),
            fetch_timeout: self.fetch_timeout.unwrap_or(Duration::from_secs(10)),
            shutdown: self.shutdown,
            state: Arc::new(RwLock::new(PollerState::Idle)),
        }
    }
}

/// Handle for controlling a running [`Poller`].
///
/// Drop this handle to stop polling, or call `stop()` to stop and wait.
pub struct PollerHandle {
    stop_tx: watch::Sender<bool>,
    stop_once: Once,
    task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    state: Arc<RwLock<PollerState>>,
}

impl PollerHandle {
    /// Stop polling and wait for the loop to exit.
    ///
    /// Safe to call any number of times, from any number of tasks. The stop
    /// signal is sent once; every caller returns only after the loop has
    /// exited, so no update can race the shutdown.
    pub async fn stop(&self) {
        self.stop_once.call_once(|| {
            {
                let mut state = self.state.write();
                if *state == PollerState::Running {
                    *state = PollerState::Stopping;
                }
            }
            let _ = self.stop_tx.send(true);
        });

        let mut task = self.task.lock().await;
        if let Some(handle) = task.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "History poller task failed");
                *self.state.write() = PollerState::Stopped;
            }
        }
    }

    pub fn state(&self) -> PollerState {
        *self.state.read()
    }
}

impl std::fmt::Debug for PollerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollerHandle")
            .field("state", &self.state())
            .finish()
    }
}
