//! Exporter lifecycle: wire the pieces together, serve, shut down.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use dishwatch_adapters::gateway::GatewayClient;
use dishwatch_adapters::grpc::GrpcClient;
use dishwatch_sdk::prometheus::{MetricsServer, PrometheusConfig};
use dishwatch_sdk::{Accumulator, Exposer, HistorySource, Poller, StatusSource};
use tokio::sync::watch;
use tracing::{error, info};

use crate::config::Settings;

/// Run the exporter until Ctrl-C or SIGTERM.
pub async fn run(settings: Settings) -> Result<()> {
    run_until(settings, shutdown_signal()).await
}

/// Run the exporter until `shutdown` resolves or the server fails.
///
/// On the way out the HTTP server stops accepting first, then the poller is
/// stopped and awaited, so no update lands after this returns.
pub async fn run_until(settings: Settings, shutdown: impl Future<Output = ()>) -> Result<()> {
    let dish = connect(&settings)?;
    let accumulator = Arc::new(Accumulator::new());

    let prometheus = PrometheusConfig::builder()
        .listen_addr(&settings.listen)
        .metrics_path(&settings.metrics_path)
        .namespace(&settings.namespace)
        .build();
    let exposer = Arc::new(
        Exposer::new(
            dish.status.clone(),
            accumulator.clone(),
            Arc::new(prometheus.registry()),
        )
        .with_fetch_timeout(settings.request_timeout()),
    );

    let server = MetricsServer::bind(&prometheus, exposer)
        .await
        .with_context(|| format!("failed to start metrics server on {}", settings.listen))?;

    info!(
        address = %server.local_addr(),
        dish = %dish.endpoint,
        transport = dish.transport,
        path = %prometheus.metrics_path,
        "Starting Starlink exporter"
    );

    let poller = Poller::builder(dish.history, accumulator)
        .fetch_timeout(settings.request_timeout())
        .build()
        .start();

    let (stop_tx, stop_rx) = watch::channel(false);
    let mut server_task = tokio::spawn(server.serve(stop_rx));

    let finished = tokio::select! {
        _ = shutdown => {
            info!("Shutdown signal received, stopping gracefully...");
            None
        }
        result = &mut server_task => Some(result),
    };

    let served = match finished {
        Some(result) => result,
        None => {
            let _ = stop_tx.send(true);
            server_task.await
        }
    };

    poller.stop().await;
    info!("Exporter stopped");

    served
        .context("metrics server task panicked")?
        .context("metrics server failed")
}

/// The dish seen through whichever transport is configured.
struct Dish {
    history: Arc<dyn HistorySource>,
    status: Arc<dyn StatusSource>,
    endpoint: String,
    transport: &'static str,
}

/// Native gRPC to `dish`, or the JSON gateway when one is configured.
fn connect(settings: &Settings) -> Result<Dish> {
    match settings.gateway() {
        Some(gateway) => {
            let client = Arc::new(
                GatewayClient::builder()
                    .endpoint(gateway)
                    .timeout(settings.request_timeout())
                    .build()
                    .context("failed to create gateway client")?,
            );
            Ok(Dish {
                endpoint: client.endpoint().to_string(),
                history: client.clone(),
                status: client,
                transport: "gateway",
            })
        }
        None => {
            let client = Arc::new(
                GrpcClient::builder()
                    .endpoint(&settings.dish)
                    .timeout(settings.request_timeout())
                    .build()
                    .context("failed to create dish client")?,
            );
            Ok(Dish {
                endpoint: client.endpoint().to_string(),
                history: client.clone(),
                status: client,
                transport: "grpc",
            })
        }
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn settings(listen: &str) -> Settings {
        Settings {
            listen: listen.to_string(),
            // Nothing listens on the discard port
            dish: "127.0.0.1:9".to_string(),
            gateway: None,
            log_level: "info".to_string(),
            metrics_path: "/metrics".to_string(),
            namespace: "starlink".to_string(),
            request_timeout_secs: 1,
        }
    }

    #[tokio::test]
    async fn stops_cleanly_on_shutdown() {
        let result = run_until(
            settings("127.0.0.1:0"),
            tokio::time::sleep(Duration::from_millis(200)),
        )
        .await;

        assert!(result.is_ok(), "{:?}", result);
    }

    #[tokio::test]
    async fn stops_cleanly_through_gateway() {
        let settings = Settings {
            gateway: Some("127.0.0.1:9".to_string()),
            ..settings("127.0.0.1:0")
        };

        let result = run_until(settings, tokio::time::sleep(Duration::from_millis(200))).await;

        assert!(result.is_ok(), "{:?}", result);
    }

    #[tokio::test]
    async fn picks_transport_from_settings() {
        let grpc = connect(&settings("127.0.0.1:0")).unwrap();
        assert_eq!(grpc.transport, "grpc");
        assert_eq!(grpc.endpoint, "http://127.0.0.1:9");

        let gateway = connect(&Settings {
            gateway: Some("http://gateway.lan:8080/".to_string()),
            ..settings("127.0.0.1:0")
        })
        .unwrap();
        assert_eq!(gateway.transport, "gateway");
        assert_eq!(gateway.endpoint, "http://gateway.lan:8080");
    }

    #[tokio::test]
    async fn invalid_listen_address_fails_fast() {
        let result = run_until(settings("not-an-address"), std::future::pending()).await;

        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("invalid listen address"));
    }

    #[tokio::test]
    async fn occupied_port_fails_fast() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap().to_string();

        let result = run_until(settings(&addr), std::future::pending()).await;

        assert!(result.is_err());
    }
}
