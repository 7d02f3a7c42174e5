//! # dishwatch-sdk
//!
//! Sample-integration engine for dish telemetry.
//!
//! The dish keeps a rolling, fixed-size buffer of per-second samples
//! (throughput, power, ping). This crate turns that buffer into monotonic
//! cumulative counters that can be scraped at any time, and renders them
//! together with live status gauges in the Prometheus text format.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dishwatch_sdk::{Accumulator, Exposer, HistorySource, Poller, Registry, SourceError, StatusSource};
//! use dishwatch_types::{HistorySnapshot, StatusSnapshot};
//!
//! struct Dish;
//!
//! #[async_trait::async_trait]
//! impl HistorySource for Dish {
//!     async fn history(&self) -> Result<HistorySnapshot, SourceError> {
//!         Ok(HistorySnapshot::with_capacity(0, 900))
//!     }
//! }
//!
//! #[async_trait::async_trait]
//! impl StatusSource for Dish {
//!     async fn status(&self) -> Result<StatusSnapshot, SourceError> {
//!         Ok(StatusSnapshot::default())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let dish = Arc::new(Dish);
//!     let accumulator = Arc::new(Accumulator::new());
//!
//!     // Integrate the history buffer once per second in the background
//!     let poller = Poller::new(dish.clone(), accumulator.clone()).start();
//!
//!     // Render a scrape on demand
//!     let registry = Arc::new(Registry::new(Some("starlink")));
//!     let exposer = Exposer::new(dish, accumulator, registry);
//!     println!("{}", exposer.scrape().await);
//!
//!     poller.stop().await;
//! }
//! ```
//!
//! ## Components
//!
//! - **[`Accumulator`]**: owns the cumulative totals; the only place integration happens
//! - **[`Poller`]**: the accumulator's single writer, ticking at a fixed cadence
//! - **[`Exposer`]**: read-only scrape path rendering counters and gauges
//! - **[`Registry`]**: metric descriptors, built once and shared with the exposer
//! - **[`Window`]**: circular index iteration over the history buffer

mod accumulator;
mod error;
mod exposer;
mod registry;
mod source;
mod window;

#[cfg(feature = "tokio")]
mod poller;

#[cfg(feature = "prometheus")]
pub mod prometheus;

pub use accumulator::{Accumulator, AccumulatorState, Totals, UpdateOutcome};
pub use error::{AccumulatorError, SourceError};
pub use exposer::render;
pub use registry::{MetricDesc, MetricKind, Registry};
pub use source::{HistorySource, StatusSource};
pub use window::Window;

#[cfg(feature = "tokio")]
pub use exposer::Exposer;

#[cfg(feature = "tokio")]
pub use poller::{Poller, PollerBuilder, PollerHandle, PollerState};

// Re-export types for convenience
pub use dishwatch_types::{HistorySnapshot, LengthMismatch, StatusSnapshot};
