//! Client for a gRPC-JSON gateway in front of the dish.
//!
//! The dish itself only speaks gRPC. Setups that already run a transcoding
//! proxy (grpc-gateway, Envoy's `grpc_json_transcoder`) can point this
//! client at it instead: it posts the JSON form of `getHistory` and
//! `getStatus` to `{gateway}/SpaceX.API.Device.Device/Handle` and decodes
//! the protobuf-JSON replies with [`crate::proto_json`].
//!
//! There is no default address; the gateway has to be named explicitly.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dishwatch_adapters::gateway::GatewayClient;
//! use dishwatch_sdk::{Accumulator, Poller};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dish = Arc::new(GatewayClient::builder().endpoint("http://gateway.lan:8080").build()?);
//!     let accumulator = Arc::new(Accumulator::new());
//!
//!     let poller = Poller::new(dish, accumulator.clone()).start();
//!     tokio::time::sleep(std::time::Duration::from_secs(5)).await;
//!     poller.stop().await;
//!
//!     println!("{:?}", accumulator.totals());
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::debug;

use dishwatch_sdk::{HistorySource, SourceError, StatusSource};
use dishwatch_types::{HistorySnapshot, StatusSnapshot};

use crate::proto_json::{parse_history, parse_status, HISTORY_REQUEST, STATUS_REQUEST};
use crate::{normalize_endpoint, AdapterError};

const HANDLE_PATH: &str = "/SpaceX.API.Device.Device/Handle";

/// Client for one dish reached through a JSON gateway.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl GatewayClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> GatewayClientBuilder {
        GatewayClientBuilder::default()
    }

    /// Base URL requests are sent to, scheme included.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch the history buffer.
    pub async fn get_history(&self) -> Result<HistorySnapshot, AdapterError> {
        let body = self.handle(HISTORY_REQUEST).await?;
        let history = parse_history(&body)?;
        debug!(
            current = history.sequence,
            buffer_len = history.buffer_len(),
            "Fetched history"
        );
        Ok(history)
    }

    /// Fetch the current status.
    pub async fn get_status(&self) -> Result<StatusSnapshot, AdapterError> {
        let body = self.handle(STATUS_REQUEST).await?;
        parse_status(&body)
    }

    async fn handle(&self, request: &'static str) -> Result<Vec<u8>, AdapterError> {
        let url = format!("{}{}", self.endpoint, HANDLE_PATH);

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AdapterError::Http(format!(
                "Gateway returned status {}",
                response.status()
            )));
        }

        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl HistorySource for GatewayClient {
    async fn history(&self) -> Result<HistorySnapshot, SourceError> {
        Ok(self.get_history().await?)
    }
}

#[async_trait]
impl StatusSource for GatewayClient {
    async fn status(&self) -> Result<StatusSnapshot, SourceError> {
        Ok(self.get_status().await?)
    }
}

/// Builder for GatewayClient.
#[derive(Debug, Default)]
pub struct GatewayClientBuilder {
    endpoint: Option<String>,
    timeout: Option<Duration>,
}

impl GatewayClientBuilder {
    /// Set the gateway address. Required.
    ///
    /// A bare `host:port` is treated as `http://host:port`.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<GatewayClient, AdapterError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AdapterError::Config(e.to_string()))?;

        let endpoint = self
            .endpoint
            .as_deref()
            .filter(|endpoint| !endpoint.trim().is_empty())
            .ok_or_else(|| AdapterError::Config("gateway endpoint is required".to_string()))?;

        Ok(GatewayClient {
            client,
            endpoint: normalize_endpoint(endpoint),
            timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and return the request that was received.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let task = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;

            let response = format!(
                "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            request
        });

        (addr, task)
    }

    /// Read headers plus a Content-Length body.
    async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let content_length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + content_length {
                    break;
                }
            }
        }

        String::from_utf8_lossy(&buf).to_string()
    }

    #[test]
    fn test_builder_requires_endpoint() {
        let err = GatewayClient::builder().build().unwrap_err();
        assert!(matches!(err, AdapterError::Config(_)));

        let err = GatewayClient::builder().endpoint("  ").build().unwrap_err();
        assert!(matches!(err, AdapterError::Config(_)));
    }

    #[test]
    fn test_builder_default_timeout() {
        let client = GatewayClient::builder()
            .endpoint("gateway.lan:8080")
            .build()
            .unwrap();
        assert_eq!(client.endpoint(), "http://gateway.lan:8080");
        assert_eq!(client.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_builder_custom() {
        let client = GatewayClient::builder()
            .endpoint("https://dish.lan:9201/")
            .timeout(Duration::from_secs(3))
            .build()
            .unwrap();

        assert_eq!(client.endpoint(), "https://dish.lan:9201");
        assert_eq!(client.timeout(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_history_round_trip_over_http() {
        let (addr, server) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"dishGetHistory":{"current":"12","powerIn":[1,2,3],"downlinkThroughputBps":[0,0,0],"uplinkThroughputBps":[0,0,0],"popPingLatencyMs":[0,0,0],"popPingDropRate":[0,0,0]}}"#,
        )
        .await;

        let client = GatewayClient::builder().endpoint(addr).build().unwrap();
        let history = client.history().await.unwrap();

        assert_eq!(history.sequence, 12);
        assert_eq!(history.power_in, vec![1.0, 2.0, 3.0]);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /SpaceX.API.Device.Device/Handle HTTP/1.1"));
        assert!(request.ends_with(HISTORY_REQUEST));
    }

    #[tokio::test]
    async fn test_status_round_trip_over_http() {
        let (addr, server) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"dishGetStatus":{"deviceInfo":{"id":"ut-9"},"gpsStats":{"gpsSats":7}}}"#,
        )
        .await;

        let client = GatewayClient::builder().endpoint(addr).build().unwrap();
        let status = client.status().await.unwrap();

        assert_eq!(status.device_info.id, "ut-9");
        assert_eq!(status.gps_stats.gps_sats, 7);

        let request = server.await.unwrap();
        assert!(request.ends_with(STATUS_REQUEST));
    }

    #[tokio::test]
    async fn test_error_status_is_http_error() {
        let (addr, _server) = serve_once("HTTP/1.1 503 Service Unavailable", "{}").await;

        let client = GatewayClient::builder().endpoint(addr).build().unwrap();
        let err = client.history().await.unwrap_err();

        assert!(matches!(err, SourceError::Http(_)));
    }

    #[tokio::test]
    async fn test_wrong_payload_is_missing_payload() {
        let (addr, _server) = serve_once("HTTP/1.1 200 OK", r#"{"dishGetStatus":{}}"#).await;

        let client = GatewayClient::builder().endpoint(addr).build().unwrap();
        let err = client.history().await.unwrap_err();

        assert_eq!(err, SourceError::MissingPayload("dishGetHistory"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_connection_error() {
        // Bind then drop to get a port nothing listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let client = GatewayClient::builder()
            .endpoint(addr)
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        let err = client.history().await.unwrap_err();

        assert!(matches!(err, SourceError::Connection(_)), "{:?}", err);
    }
}
