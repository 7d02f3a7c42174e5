//! Error types for device sources and the accumulator.

use dishwatch_types::LengthMismatch;
use thiserror::Error;

/// Errors a history or status source can return.
///
/// None of these are fatal: the poller records them and tries again on the
/// next tick, the exposer reports `up 0` for the scrape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// The device answered without the expected payload.
    #[error("No {0} in response")]
    MissingPayload(&'static str),
}

/// The last error seen by the accumulator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AccumulatorError {
    /// Fetching history from the device failed.
    #[error("failed to get history: {0}")]
    Fetch(#[from] SourceError),

    /// The history snapshot was empty or its series had different lengths.
    #[error("invalid history: {0}")]
    Validation(LengthMismatch),
}

impl From<LengthMismatch> for AccumulatorError {
    fn from(err: LengthMismatch) -> Self {
        AccumulatorError::Validation(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_wraps_source_message() {
        let err = AccumulatorError::from(SourceError::Timeout);
        assert_eq!(err.to_string(), "failed to get history: Request timed out");
    }

    #[test]
    fn validation_error_describes_lengths() {
        let err = AccumulatorError::from(LengthMismatch::default());
        assert_eq!(err.to_string(), "invalid history: empty history arrays");
    }

    #[test]
    fn missing_payload_names_the_field() {
        let err = SourceError::MissingPayload("dishGetStatus");
        assert_eq!(err.to_string(), "No dishGetStatus in response");
    }
}
