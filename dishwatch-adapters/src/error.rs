//! Error types for adapters.

use dishwatch_sdk::SourceError;
use thiserror::Error;

/// Errors that can occur when talking to the device.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The device answered a gRPC call with a non-OK status.
    #[error("RPC failed: {0}")]
    Rpc(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// The response did not carry the expected payload.
    #[error("No {0} in response")]
    MissingPayload(&'static str),

    /// The HTTP client could not be built.
    #[error("Invalid client configuration: {0}")]
    Config(String),
}

#[cfg(feature = "gateway")]
impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AdapterError::Timeout
        } else if err.is_connect() {
            AdapterError::Connection(err.to_string())
        } else if err.is_decode() {
            AdapterError::Parse(err.to_string())
        } else {
            AdapterError::Http(err.to_string())
        }
    }
}

#[cfg(feature = "grpc")]
impl From<tonic::Status> for AdapterError {
    fn from(status: tonic::Status) -> Self {
        use tonic::Code;

        match status.code() {
            // Client-side deadlines surface as Cancelled
            Code::DeadlineExceeded | Code::Cancelled => AdapterError::Timeout,
            Code::Unavailable => AdapterError::Connection(status.message().to_string()),
            Code::Internal | Code::DataLoss => AdapterError::Parse(status.message().to_string()),
            code => AdapterError::Rpc(format!("{:?}: {}", code, status.message())),
        }
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        AdapterError::Parse(err.to_string())
    }
}

impl From<AdapterError> for SourceError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Http(msg) | AdapterError::Rpc(msg) => SourceError::Http(msg),
            AdapterError::Parse(msg) => SourceError::Parse(msg),
            AdapterError::Connection(msg) | AdapterError::Config(msg) => {
                SourceError::Connection(msg)
            }
            AdapterError::Timeout => SourceError::Timeout,
            AdapterError::MissingPayload(what) => SourceError::MissingPayload(what),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_into_source_error() {
        assert_eq!(
            SourceError::from(AdapterError::Timeout),
            SourceError::Timeout
        );
        assert_eq!(
            SourceError::from(AdapterError::MissingPayload("dishGetHistory")),
            SourceError::MissingPayload("dishGetHistory")
        );
        assert_eq!(
            SourceError::from(AdapterError::Parse("bad".to_string())),
            SourceError::Parse("bad".to_string())
        );
    }

    #[test]
    fn json_errors_are_parse_errors() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(AdapterError::from(err), AdapterError::Parse(_)));
    }

    #[cfg(feature = "grpc")]
    #[test]
    fn grpc_status_codes_map_to_errors() {
        assert!(matches!(
            AdapterError::from(tonic::Status::deadline_exceeded("slow")),
            AdapterError::Timeout
        ));
        assert!(matches!(
            AdapterError::from(tonic::Status::unavailable("down")),
            AdapterError::Connection(_)
        ));
        assert!(matches!(
            AdapterError::from(tonic::Status::unimplemented("nope")),
            AdapterError::Rpc(_)
        ));
        assert_eq!(
            SourceError::from(AdapterError::Rpc("NotFound: x".to_string())),
            SourceError::Http("NotFound: x".to_string())
        );
    }
}
