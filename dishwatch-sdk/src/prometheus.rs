//! Prometheus HTTP endpoint.
//!
//! This module serves the [`Exposer`]'s output over HTTP so it can be scraped
//! by Prometheus or compatible monitoring systems. Every request to the
//! metrics path triggers exactly one status call; the counters come from the
//! shared [`Accumulator`](crate::Accumulator) and are never recomputed here.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dishwatch_sdk::{Accumulator, Exposer, StatusSource};
//! use dishwatch_sdk::prometheus::{MetricsServer, PrometheusConfig};
//! use tokio::sync::watch;
//!
//! # async fn run(dish: Arc<dyn StatusSource>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = PrometheusConfig::builder()
//!     .listen_addr(":9999")
//!     .metrics_path("/metrics")
//!     .namespace("starlink")
//!     .build();
//!
//! let accumulator = Arc::new(Accumulator::new());
//! let exposer = Arc::new(Exposer::new(dish, accumulator, Arc::new(config.registry())));
//!
//! let server = MetricsServer::bind(&config, exposer).await?;
//! let (_stop_tx, stop_rx) = watch::channel(false);
//! server.serve(stop_rx).await?;
//! # Ok(())
//! # }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::poller::wait_for_shutdown;
use crate::{Exposer, Registry};

/// Content type of the text exposition format.
pub const CONTENT_TYPE_TEXT: &str = "text/plain; version=0.0.4; charset=utf-8";

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:9999";
const DEFAULT_METRICS_PATH: &str = "/metrics";
const DEFAULT_NAMESPACE: &str = "starlink";

/// Errors from the metrics HTTP server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid listen address {0:?}")]
    InvalidAddr(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to accept connection: {0}")]
    Accept(#[source] std::io::Error),
}

/// Configuration for the Prometheus metrics endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrometheusConfig {
    /// Address to listen on (e.g., "0.0.0.0:9999" or ":9999")
    pub listen_addr: String,
    /// Path for metrics endpoint (e.g., "/metrics")
    pub metrics_path: String,
    /// Optional namespace prefix for all metrics
    pub namespace: Option<String>,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl PrometheusConfig {
    /// Create a new builder for PrometheusConfig.
    pub fn builder() -> PrometheusConfigBuilder {
        PrometheusConfigBuilder::default()
    }

    /// Build the metric registry for this namespace.
    pub fn registry(&self) -> Registry {
        Registry::new(self.namespace.as_deref())
    }
}

/// Builder for PrometheusConfig.
#[derive(Debug, Default)]
pub struct PrometheusConfigBuilder {
    listen_addr: Option<String>,
    metrics_path: Option<String>,
    namespace: Option<String>,
}

impl PrometheusConfigBuilder {
    /// Set the listen address. A bare `:port` listens on all interfaces.
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = Some(addr.into());
        self
    }

    /// Set the metrics path.
    pub fn metrics_path(mut self, path: impl Into<String>) -> Self {
        self.metrics_path = Some(path.into());
        self
    }

    /// Set the namespace prefix for all metrics (default: "starlink").
    ///
    /// An empty namespace disables the prefix.
    pub fn namespace(mut self, ns: impl Into<String>) -> Self {
        self.namespace = Some(ns.into());
        self
    }

    /// Build the PrometheusConfig.
    pub fn build(self) -> PrometheusConfig {
        let metrics_path = match self.metrics_path {
            Some(path) if path.starts_with('/') => path,
            Some(path) => format!("/{}", path),
            None => DEFAULT_METRICS_PATH.to_string(),
        };

        PrometheusConfig {
            listen_addr: self
                .listen_addr
                .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string()),
            metrics_path,
            namespace: Some(
                self.namespace
                    .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            )
            .filter(|ns| !ns.is_empty()),
        }
    }
}

/// Parse a listen address, accepting the `:port` shorthand for all interfaces.
pub fn parse_listen_addr(addr: &str) -> Result<SocketAddr, ServerError> {
    let addr = addr.trim();
    let full = if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    };

    full.parse()
        .map_err(|_| ServerError::InvalidAddr(addr.to_string()))
}

/// A bound metrics server, ready to serve.
#[derive(Debug)]
pub struct MetricsServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    metrics_path: Arc<str>,
    exposer: Arc<Exposer>,
}

impl MetricsServer {
    /// Bind the listener. Binding failures are reported here, before serving.
    pub async fn bind(config: &PrometheusConfig, exposer: Arc<Exposer>) -> Result<Self, ServerError> {
        let addr = parse_listen_addr(&config.listen_addr)?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;

        Ok(Self {
            listener,
            local_addr,
            metrics_path: Arc::from(config.metrics_path.as_str()),
            exposer,
        })
    }

    /// The address actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until `shutdown` becomes `true` or its sender is dropped.
    ///
    /// Each connection is served on its own task; connections already
    /// accepted are allowed to finish.
    pub async fn serve(self, mut shutdown: watch::Receiver<bool>) -> Result<(), ServerError> {
        info!(
            addr = %self.local_addr,
            path = %self.metrics_path,
            "Metrics server listening"
        );

        loop {
            let (stream, peer) = tokio::select! {
                accepted = self.listener.accept() => accepted.map_err(ServerError::Accept)?,
                _ = wait_for_shutdown(&mut shutdown) => break,
            };

            let io = TokioIo::new(stream);
            let metrics_path = self.metrics_path.clone();
            let exposer = self.exposer.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                    let metrics_path = metrics_path.clone();
                    let exposer = exposer.clone();

                    async move { handle_request(req, &metrics_path, &exposer).await }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!(peer = %peer, error = %e, "Metrics connection error");
                }
            });
        }

        info!("Metrics server stopped");
        Ok(())
    }
}

async fn handle_request<B>(
    req: Request<B>,
    metrics_path: &str,
    exposer: &Exposer,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path();

    let response = if path == metrics_path {
        let body = exposer.scrape().await;
        text_response(StatusCode::OK, CONTENT_TYPE_TEXT, body)
    } else if path == "/health" || path == "/healthz" {
        text_response(StatusCode::OK, "text/plain", "OK")
    } else {
        text_response(StatusCode::NOT_FOUND, "text/plain", "Not Found")
    };

    Ok(response)
}

fn text_response(
    status: StatusCode,
    content_type: &'static str,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}
