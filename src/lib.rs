//! # dishwatch
//!
//! Prometheus exporter for a Starlink dish.
//!
//! The dish reports rates (throughput, power, ping) in a rolling one-second
//! history buffer. The exporter polls that buffer in the background, folds
//! every new sample into monotonic counters, and serves them together with
//! live status gauges over HTTP.
//!
//! ```text
//!  dish ──history──▶ Poller ──▶ Accumulator ──totals──┐
//!   │                                                 ▼
//!   └─────status──────────────────────────────────▶ Exposer ──▶ /metrics
//! ```
//!
//! - **[`config`]**: layered settings from defaults, TOML file, environment and flags
//! - **[`logging`]**: `tracing` subscriber setup
//! - **[`app`]**: startup, serving and graceful shutdown
//!
//! The engine lives in `dishwatch-sdk`; the dish client in `dishwatch-adapters`.

pub mod app;
pub mod config;
pub mod logging;
