//! # dishwatch-adapters
//!
//! Device clients that implement the `dishwatch-sdk` source traits.
//!
//! ## Supported Transports
//!
//! - **gRPC** (`grpc` feature, on by default) - Calls the dish's native
//!   `SpaceX.API.Device.Device/Handle` method over HTTP/2 with protobuf
//!   messages. This is what the dish serves on port 9200.
//! - **JSON gateway** (`gateway` feature, on by default) - Posts the JSON
//!   form of the same requests to a gRPC-JSON transcoding proxy placed in
//!   front of the dish
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dishwatch_adapters::grpc::GrpcClient;
//! use dishwatch_sdk::HistorySource;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dish = GrpcClient::builder()
//!         .endpoint("192.168.100.1:9200")
//!         .timeout(Duration::from_secs(10))
//!         .build()?;
//!
//!     let history = dish.history().await?;
//!     println!("Buffer holds {} samples", history.buffer_len());
//!     Ok(())
//! }
//! ```

pub mod error;

#[cfg(feature = "grpc")]
pub mod grpc;
#[cfg(feature = "grpc")]
pub mod proto;

#[cfg(feature = "gateway")]
pub mod gateway;
pub mod proto_json;

pub use error::AdapterError;

// Re-export types for convenience
pub use dishwatch_types::{HistorySnapshot, StatusSnapshot};

/// Prefix `http://` when no scheme is given and drop any trailing slash.
#[cfg_attr(not(any(feature = "grpc", feature = "gateway")), allow(dead_code))]
pub(crate) fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    }
}
