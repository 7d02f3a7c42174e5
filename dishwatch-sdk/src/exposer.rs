//! Scrape-time rendering of counters and live gauges.

use dishwatch_types::StatusSnapshot;

use crate::{Registry, Totals};

#[cfg(feature = "tokio")]
use std::sync::Arc;
#[cfg(feature = "tokio")]
use std::time::Duration;

#[cfg(feature = "tokio")]
use tracing::{debug, error};

#[cfg(feature = "tokio")]
use crate::source::with_timeout;
#[cfg(feature = "tokio")]
use crate::{Accumulator, StatusSource};

/// Render one scrape in the Prometheus text exposition format.
///
/// With `status` present the output carries `up 1`, the six counters, every
/// gauge and the `info` series. Without it the output is `up 0` plus the
/// counters only, so counter continuity survives a device outage.
pub fn render(registry: &Registry, totals: &Totals, status: Option<&StatusSnapshot>) -> String {
    let mut output = String::new();

    registry
        .up
        .write(&mut output, if status.is_some() { 1.0 } else { 0.0 });

    for (desc, value) in registry.counters().into_iter().zip(totals.values()) {
        desc.write(&mut output, value);
    }

    let Some(status) = status else {
        return output;
    };

    registry
        .downlink_throughput_bps
        .write(&mut output, status.downlink_throughput_bps);
    registry
        .uplink_throughput_bps
        .write(&mut output, status.uplink_throughput_bps);
    registry
        .pop_ping_latency_ms
        .write(&mut output, status.pop_ping_latency_ms);
    registry
        .uptime_seconds
        .write(&mut output, status.uptime_seconds());
    registry
        .obstruction_fraction
        .write(&mut output, status.obstruction_stats.fraction_obstructed);
    registry
        .obstruction_valid_seconds
        .write(&mut output, status.obstruction_stats.valid_s);
    registry
        .gps_satellites
        .write(&mut output, status.gps_stats.gps_sats as f64);
    registry
        .gps_valid
        .write(&mut output, bool_gauge(status.gps_stats.gps_valid));
    registry
        .eth_speed_mbps
        .write(&mut output, status.eth_speed_mbps as f64);
    registry
        .snr_above_noise_floor
        .write(&mut output, bool_gauge(status.is_snr_above_noise_floor));

    let info = &status.device_info;
    registry.info.write_labeled(
        &mut output,
        &[
            info.id.as_str(),
            info.hardware_version.as_str(),
            info.software_version.as_str(),
            info.country_code.as_str(),
        ],
        1.0,
    );

    output
}

fn bool_gauge(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Read-only scrape path.
///
/// Each [`Exposer::scrape`] makes one status call and copies the
/// accumulator's totals; it never integrates anything. Scrapes may run
/// concurrently.
#[cfg(feature = "tokio")]
pub struct Exposer {
    status: Arc<dyn StatusSource>,
    accumulator: Arc<Accumulator>,
    registry: Arc<Registry>,
    fetch_timeout: Duration,
}

#[cfg(feature = "tokio")]
impl Exposer {
    /// Create an exposer with the default 10 second status timeout.
    pub fn new(
        status: Arc<dyn StatusSource>,
        accumulator: Arc<Accumulator>,
        registry: Arc<Registry>,
    ) -> Self {
        Self {
            status,
            accumulator,
            registry,
            fetch_timeout: Duration::from_secs(10),
        }
    }

    /// Set the per-scrape status timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Fetch status once and render the full exposition.
    pub async fn scrape(&self) -> String {
        debug!("Prometheus scrape started");

        let status = with_timeout(self.fetch_timeout, self.status.status()).await;
        let totals = self.accumulator.totals();

        if let Err(e) = &status {
            error!(error = %e, "Failed to get status");
        }

        let output = render(&self.registry, &totals, status.as_ref().ok());

        debug!(
            up = status.is_ok(),
            download_bytes = totals.download_bytes,
            upload_bytes = totals.upload_bytes,
            "Prometheus scrape completed"
        );

        output
    }
}

#[cfg(feature = "tokio")]
impl std::fmt::Debug for Exposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exposer")
            .field("fetch_timeout", &self.fetch_timeout)
            .finish()
    }
}
