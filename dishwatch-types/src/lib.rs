//! # dishwatch-types
//!
//! Core data model for dish telemetry. This crate defines the snapshots that
//! a device source hands to the dishwatch integration engine and exposer.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any serialization framework
//! - **Optional serialization**: Enable the `serde` feature to derive `Serialize`/`Deserialize`
//! - **Transport agnostic**: Snapshots carry plain numbers, not wire messages
//!
//! ## Features
//!
//! - `std` (default): Standard library support
//! - `serde`: JSON/etc. serialization via serde (camelCase field names)
//!
//! ## Example
//!
//! ```rust
//! use dishwatch_types::HistorySnapshot;
//!
//! // A 900-slot ring buffer whose newest valid slot is 1003 % 900
//! let mut history = HistorySnapshot::with_capacity(1003, 900);
//! history.downlink_throughput_bps[103] = 8_000.0;
//!
//! assert_eq!(history.buffer_len(), 900);
//! assert_eq!(history.newest_index(), Some(103));
//! assert!(history.validate().is_ok());
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod history;
mod status;

pub use history::*;
pub use status::*;
