//! Device source abstraction.
//!
//! The engine never talks to the network itself. It asks a [`HistorySource`]
//! for the rolling sample buffer and a [`StatusSource`] for live gauges;
//! implementations live in `dishwatch-adapters` or in your own code.

use std::sync::Arc;

use async_trait::async_trait;
use dishwatch_types::{HistorySnapshot, StatusSnapshot};

use crate::SourceError;

/// Provides the device's history buffer on demand.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Fetch the current history snapshot.
    ///
    /// May wait on network I/O. Callers bound the call with their own
    /// timeout; implementations should also apply one at the transport.
    async fn history(&self) -> Result<HistorySnapshot, SourceError>;
}

/// Provides the device's instantaneous status on demand.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetch the current status snapshot.
    async fn status(&self) -> Result<StatusSnapshot, SourceError>;
}

#[async_trait]
impl<T: HistorySource + ?Sized> HistorySource for Arc<T> {
    async fn history(&self) -> Result<HistorySnapshot, SourceError> {
        (**self).history().await
    }
}

#[async_trait]
impl<T: StatusSource + ?Sized> StatusSource for Arc<T> {
    async fn status(&self) -> Result<StatusSnapshot, SourceError> {
        (**self).status().await
    }
}

/// Run a source call, turning an elapsed deadline into [`SourceError::Timeout`].
#[cfg(feature = "tokio")]
pub(crate) async fn with_timeout<T, F>(
    timeout: std::time::Duration,
    call: F,
) -> Result<T, SourceError>
where
    F: std::future::Future<Output = Result<T, SourceError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(SourceError::Timeout),
    }
}
