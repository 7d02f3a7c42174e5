//! End-to-end flow: scripted device, background poller, real HTTP scrapes.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dishwatch_sdk::prometheus::{MetricsServer, PrometheusConfig};
use dishwatch_sdk::{
    Accumulator, Exposer, HistorySnapshot, HistorySource, Poller, PollerState, SourceError,
    StatusSnapshot, StatusSource,
};
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;

/// Serves scripted history snapshots in order, then repeats the last one.
struct ScriptedDish {
    history: Mutex<VecDeque<HistorySnapshot>>,
    last: Mutex<Option<HistorySnapshot>>,
    status_up: Mutex<bool>,
}

impl ScriptedDish {
    fn new(history: Vec<HistorySnapshot>) -> Arc<Self> {
        Arc::new(Self {
            history: Mutex::new(history.into()),
            last: Mutex::new(None),
            status_up: Mutex::new(true),
        })
    }

    fn set_status_up(&self, up: bool) {
        *self.status_up.lock() = up;
    }
}

#[async_trait]
impl HistorySource for ScriptedDish {
    async fn history(&self) -> Result<HistorySnapshot, SourceError> {
        let next = self.history.lock().pop_front();
        let snapshot = match next {
            Some(snapshot) => snapshot,
            None => self.last.lock().clone().ok_or(SourceError::Timeout)?,
        };
        *self.last.lock() = Some(snapshot.clone());
        Ok(snapshot)
    }
}

#[async_trait]
impl StatusSource for ScriptedDish {
    async fn status(&self) -> Result<StatusSnapshot, SourceError> {
        if !*self.status_up.lock() {
            return Err(SourceError::Connection("connection refused".to_string()));
        }
        let mut status = StatusSnapshot::default();
        status.device_info.id = "ut-test".to_string();
        status.device_info.country_code = "NZ".to_string();
        status.gps_stats.gps_sats = 9;
        Ok(status)
    }
}

fn history(sequence: u64, len: usize, downlink_bps: f64) -> HistorySnapshot {
    let mut history = HistorySnapshot::with_capacity(sequence, len);
    history.downlink_throughput_bps.fill(downlink_bps);
    history.power_in.fill(10.0);
    history
}

async fn http_get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, addr
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

async fn start_server(
    dish: Arc<ScriptedDish>,
    accumulator: Arc<Accumulator>,
) -> (SocketAddr, watch::Sender<bool>, tokio::task::JoinHandle<()>) {
    let config = PrometheusConfig::builder()
        .listen_addr("127.0.0.1:0")
        .build();
    let exposer = Arc::new(Exposer::new(
        dish,
        accumulator,
        Arc::new(config.registry()),
    ));
    let server = MetricsServer::bind(&config, exposer).await.unwrap();
    let addr = server.local_addr();

    let (stop_tx, stop_rx) = watch::channel(false);
    let task = tokio::spawn(async move {
        server.serve(stop_rx).await.unwrap();
    });

    (addr, stop_tx, task)
}

#[tokio::test]
async fn scrape_reflects_integrated_history() {
    let dish = ScriptedDish::new(vec![
        history(500, 100, 8_000.0),
        history(510, 100, 8_000.0),
        history(530, 100, 8_000.0),
    ]);
    let accumulator = Arc::new(Accumulator::new());

    // Drive the accumulator by hand so the totals are deterministic
    let poller = Poller::new(dish.clone(), accumulator.clone());
    for _ in 0..3 {
        poller.poll_once().await.unwrap();
    }

    let (addr, stop_tx, server) = start_server(dish, accumulator).await;

    let response = http_get(addr, "/metrics").await;
    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.contains("text/plain; version=0.0.4; charset=utf-8"));
    // 30 new slots at 8000 bit/s = 30 * 1000 bytes
    assert!(response.contains("starlink_download_bytes_total 30000\n"));
    assert!(response.contains("starlink_energy_joules_total 300\n"));
    assert!(response.contains("starlink_ping_latency_seconds_count 30\n"));
    assert!(response.contains("starlink_up 1\n"));
    assert!(response.contains("starlink_gps_satellites 9\n"));
    assert!(response.contains("starlink_info{id=\"ut-test\""));

    stop_tx.send(true).unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn device_outage_keeps_counters_and_drops_gauges() {
    let dish = ScriptedDish::new(vec![history(1, 10, 800.0), history(4, 10, 800.0)]);
    let accumulator = Arc::new(Accumulator::new());
    let poller = Poller::new(dish.clone(), accumulator.clone());
    poller.poll_once().await.unwrap();
    poller.poll_once().await.unwrap();

    let (addr, stop_tx, server) = start_server(dish.clone(), accumulator).await;

    dish.set_status_up(false);
    let response = http_get(addr, "/metrics").await;

    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.contains("starlink_up 0\n"));
    assert!(response.contains("starlink_download_bytes_total 300\n"));
    assert!(!response.contains("starlink_gps_satellites"));
    assert!(!response.contains("starlink_info"));

    dish.set_status_up(true);
    let response = http_get(addr, "/metrics").await;
    assert!(response.contains("starlink_up 1\n"));
    assert!(response.contains("starlink_download_bytes_total 300\n"));

    stop_tx.send(true).unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn health_and_unknown_paths() {
    let dish = ScriptedDish::new(vec![]);
    let (addr, stop_tx, server) = start_server(dish, Arc::new(Accumulator::new())).await;

    let health = http_get(addr, "/health").await;
    assert!(health.starts_with("HTTP/1.1 200 OK"));
    assert!(health.ends_with("OK"));

    let healthz = http_get(addr, "/healthz").await;
    assert!(healthz.starts_with("HTTP/1.1 200 OK"));

    let missing = http_get(addr, "/nope").await;
    assert!(missing.starts_with("HTTP/1.1 404 Not Found"));

    stop_tx.send(true).unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn background_poller_and_server_shut_down_cleanly() {
    let dish = ScriptedDish::new(vec![history(10, 20, 80.0), history(12, 20, 80.0)]);
    let accumulator = Arc::new(Accumulator::new());

    let handle = Poller::builder(dish.clone(), accumulator.clone())
        .interval(Duration::from_millis(20))
        .build()
        .start();
    let (addr, stop_tx, server) = start_server(dish, accumulator.clone()).await;

    // Wait for both scripted snapshots to be integrated
    for _ in 0..100 {
        if accumulator.last_sequence() == Some(12) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(accumulator.last_sequence(), Some(12));

    let response = http_get(addr, "/metrics").await;
    assert!(response.contains("starlink_download_bytes_total 20\n"));

    stop_tx.send(true).unwrap();
    server.await.unwrap();
    handle.stop().await;
    assert_eq!(handle.state(), PollerState::Stopped);

    // Nothing accepts connections after shutdown
    assert!(TcpStream::connect(addr).await.is_err());
}
