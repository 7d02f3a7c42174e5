//! Example: Exporting a synthetic dish
//!
//! This example runs the full exporter pipeline against a simulated dish
//! whose history buffer advances one slot per second, so the counters can
//! be watched growing without real hardware.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p dishwatch-sdk --features prometheus --example synthetic_dish
//! curl http://127.0.0.1:9999/metrics
//! ```

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use dishwatch_sdk::prometheus::{MetricsServer, PrometheusConfig};
use dishwatch_sdk::{
    Accumulator, Exposer, HistorySnapshot, HistorySource, Poller, SourceError, StatusSnapshot,
    StatusSource,
};
use tokio::sync::watch;

const BUFFER_LEN: usize = 900;

/// A dish that produces one synthetic sample per second since startup.
struct SyntheticDish {
    started: Instant,
}

impl SyntheticDish {
    fn sequence(&self) -> u64 {
        1_000 + self.started.elapsed().as_secs()
    }
}

#[async_trait]
impl HistorySource for SyntheticDish {
    async fn history(&self) -> Result<HistorySnapshot, SourceError> {
        let sequence = self.sequence();
        let mut history = HistorySnapshot::with_capacity(sequence, BUFFER_LEN);

        for i in 0..BUFFER_LEN {
            // A slow sine wave keeps the numbers interesting
            let phase = (i as f64 / BUFFER_LEN as f64) * std::f64::consts::TAU;
            history.downlink_throughput_bps[i] = 40_000_000.0 + 20_000_000.0 * phase.sin();
            history.uplink_throughput_bps[i] = 6_000_000.0 + 2_000_000.0 * phase.cos();
            history.power_in[i] = 45.0;
            history.pop_ping_latency_ms[i] = 28.0 + 6.0 * phase.sin().abs();
            history.pop_ping_drop_rate[i] = if i % 97 == 0 { 0.25 } else { 0.0 };
        }

        Ok(history)
    }
}

#[async_trait]
impl StatusSource for SyntheticDish {
    async fn status(&self) -> Result<StatusSnapshot, SourceError> {
        let mut status = StatusSnapshot::default();
        status.device_info.id = "ut-synthetic-0001".to_string();
        status.device_info.hardware_version = "rev4_synthetic".to_string();
        status.device_info.software_version = "0.0.0-example".to_string();
        status.device_info.country_code = "XX".to_string();
        status.device_state.uptime_s = self.started.elapsed().as_secs();
        status.downlink_throughput_bps = 40_000_000.0;
        status.uplink_throughput_bps = 6_000_000.0;
        status.pop_ping_latency_ms = 31.0;
        status.gps_stats.gps_valid = true;
        status.gps_stats.gps_sats = 12;
        status.eth_speed_mbps = 1000;
        status.is_snr_above_noise_floor = true;
        Ok(status)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Synthetic dish example");

    let dish = Arc::new(SyntheticDish {
        started: Instant::now(),
    });
    let accumulator = Arc::new(Accumulator::new());

    let poller = Poller::new(dish.clone(), accumulator.clone()).start();

    let config = PrometheusConfig::builder()
        .listen_addr("127.0.0.1:9999")
        .build();
    let exposer = Arc::new(Exposer::new(
        dish,
        accumulator,
        Arc::new(config.registry()),
    ));
    let server = MetricsServer::bind(&config, exposer).await?;
    println!("Metrics at http://{}{}", server.local_addr(), config.metrics_path);
    println!("Press Ctrl-C to stop\n");

    let (stop_tx, stop_rx) = watch::channel(false);
    let serve = tokio::spawn(server.serve(stop_rx));

    tokio::signal::ctrl_c().await?;

    let _ = stop_tx.send(true);
    serve.await??;
    poller.stop().await;

    println!("Stopped");
    Ok(())
}
