//! Native gRPC client for the dish.
//!
//! The dish serves `SpaceX.API.Device.Device/Handle` over plaintext HTTP/2
//! on port 9200. Each call sends a [`proto::Request`] naming the operation
//! and gets back a [`proto::Response`] carrying the matching payload.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dishwatch_adapters::grpc::GrpcClient;
//! use dishwatch_sdk::StatusSource;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dish = GrpcClient::builder().endpoint("192.168.100.1:9200").build()?;
//!
//!     let status = dish.status().await?;
//!     println!("{} up {}s", status.device_info.id, status.device_state.uptime_s);
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tracing::debug;

use dishwatch_sdk::{HistorySource, SourceError, StatusSource};
use dishwatch_types::{HistorySnapshot, StatusSnapshot};

use crate::proto::{self, response};
use crate::{normalize_endpoint, AdapterError};

/// Default dish address on the local network.
pub const DEFAULT_ENDPOINT: &str = "192.168.100.1:9200";

const HANDLE_PATH: &str = "/SpaceX.API.Device.Device/Handle";

/// gRPC client for a single dish.
///
/// Cheap to clone; clones share one HTTP/2 connection.
#[derive(Debug, Clone)]
pub struct GrpcClient {
    channel: Channel,
    endpoint: String,
    timeout: Duration,
}

impl GrpcClient {
    pub fn builder() -> GrpcClientBuilder {
        GrpcClientBuilder::default()
    }

    /// URI the channel connects to, scheme included.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch the history buffer.
    pub async fn get_history(&self) -> Result<HistorySnapshot, AdapterError> {
        match self.handle(proto::Request::get_history()).await? {
            Some(response::Response::DishGetHistory(history)) => {
                let history = HistorySnapshot::from(history);
                debug!(
                    current = history.sequence,
                    buffer_len = history.buffer_len(),
                    "Fetched history"
                );
                Ok(history)
            }
            _ => Err(AdapterError::MissingPayload("dishGetHistory")),
        }
    }

    /// Fetch the current status.
    pub async fn get_status(&self) -> Result<StatusSnapshot, AdapterError> {
        match self.handle(proto::Request::get_status()).await? {
            Some(response::Response::DishGetStatus(status)) => Ok(status.into()),
            _ => Err(AdapterError::MissingPayload("dishGetStatus")),
        }
    }

    async fn handle(
        &self,
        request: proto::Request,
    ) -> Result<Option<response::Response>, AdapterError> {
        let mut grpc = Grpc::new(self.channel.clone());
        grpc.ready()
            .await
            .map_err(|e| AdapterError::Connection(e.to_string()))?;

        let codec: ProstCodec<proto::Request, proto::Response> = ProstCodec::default();
        let response = grpc
            .unary(
                tonic::Request::new(request),
                PathAndQuery::from_static(HANDLE_PATH),
                codec,
            )
            .await?;

        Ok(response.into_inner().response)
    }
}

#[async_trait]
impl HistorySource for GrpcClient {
    async fn history(&self) -> Result<HistorySnapshot, SourceError> {
        Ok(self.get_history().await?)
    }
}

#[async_trait]
impl StatusSource for GrpcClient {
    async fn status(&self) -> Result<StatusSnapshot, SourceError> {
        Ok(self.get_status().await?)
    }
}

/// Builder for GrpcClient.
#[derive(Debug, Default)]
pub struct GrpcClientBuilder {
    endpoint: Option<String>,
    timeout: Option<Duration>,
}

impl GrpcClientBuilder {
    /// Set the dish address (default: "192.168.100.1:9200").
    ///
    /// A bare `host:port` is treated as `http://host:port`.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the per-call and connect timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client.
    ///
    /// The connection is opened lazily on the first call, so a dish that is
    /// offline at startup is not an error. Must be called inside a Tokio
    /// runtime.
    pub fn build(self) -> Result<GrpcClient, AdapterError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));
        let endpoint = normalize_endpoint(self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT));

        let channel = Endpoint::from_shared(endpoint.clone())
            .map_err(|e| AdapterError::Config(format!("invalid dish address {}: {}", endpoint, e)))?
            .connect_timeout(timeout)
            .timeout(timeout)
            .connect_lazy();

        Ok(GrpcClient {
            channel,
            endpoint,
            timeout,
        })
    }
}
