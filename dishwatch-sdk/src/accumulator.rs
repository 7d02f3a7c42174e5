//! Cumulative state built from the device's history buffer.
//!
//! The device only reports rates: bits per second, watts, milliseconds of
//! latency, fraction of pings dropped. Each history slot covers one second,
//! so integrating a slot is a unit conversion followed by an addition. The
//! [`Accumulator`] remembers the last sequence number it integrated and, on
//! every update, folds in exactly the slots that appeared since then.

use std::ops::AddAssign;

use dishwatch_types::{HistorySnapshot, LengthMismatch};
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use crate::window::Window;
use crate::AccumulatorError;

/// The six all-time totals exposed as counters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Totals {
    /// Bytes downloaded.
    pub download_bytes: f64,
    /// Bytes uploaded.
    pub upload_bytes: f64,
    /// Energy consumed, joules (watt-seconds).
    pub energy_joules: f64,
    /// Sum of ping latencies, seconds.
    pub ping_latency_seconds_sum: f64,
    /// Number of ping samples integrated.
    pub ping_sample_count: f64,
    /// Dropped pings (sum of per-second drop fractions).
    pub ping_drop_count: f64,
}

impl Totals {
    /// The six totals in counter exposition order: download, upload,
    /// energy, latency sum, sample count, drops.
    pub fn values(&self) -> [f64; 6] {
        [
            self.download_bytes,
            self.upload_bytes,
            self.energy_joules,
            self.ping_latency_seconds_sum,
            self.ping_sample_count,
            self.ping_drop_count,
        ]
    }

    /// Integrate the given slots of a history snapshot.
    ///
    /// Every visited slot counts as one ping sample. A non-finite sample
    /// contributes nothing to its own series.
    fn integrate(history: &HistorySnapshot, window: Window) -> Self {
        let mut delta = Totals::default();

        for idx in window {
            delta.download_bytes += finite(history.downlink_throughput_bps[idx]) / 8.0;
            delta.upload_bytes += finite(history.uplink_throughput_bps[idx]) / 8.0;
            delta.energy_joules += finite(history.power_in[idx]);
            delta.ping_latency_seconds_sum += finite(history.pop_ping_latency_ms[idx]) / 1000.0;
            delta.ping_drop_count += finite(history.pop_ping_drop_rate[idx]);
            delta.ping_sample_count += 1.0;
        }

        delta
    }
}

impl AddAssign for Totals {
    fn add_assign(&mut self, rhs: Self) {
        self.download_bytes += rhs.download_bytes;
        self.upload_bytes += rhs.upload_bytes;
        self.energy_joules += rhs.energy_joules;
        self.ping_latency_seconds_sum += rhs.ping_latency_seconds_sum;
        self.ping_sample_count += rhs.ping_sample_count;
        self.ping_drop_count += rhs.ping_drop_count;
    }
}

fn finite(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Everything the accumulator knows, as a consistent copy.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AccumulatorState {
    /// Whether a first valid snapshot has been seen.
    pub initialized: bool,
    /// Sequence number of the last integrated snapshot.
    pub last_sequence: u64,
    /// History buffer length of the last valid snapshot.
    pub buffer_len: Option<usize>,
    pub totals: Totals,
    /// Error from the most recent poll, if it failed.
    pub last_error: Option<AccumulatorError>,
}

/// What a call to [`Accumulator::update`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// First valid snapshot: the sequence was recorded, nothing integrated.
    Initialized { sequence: u64 },
    /// Same sequence as last time; no new samples.
    Unchanged,
    /// The sequence went backwards (device restart). Totals were kept.
    Reset { previous: u64, current: u64 },
    /// New samples were integrated.
    Integrated {
        /// Slots integrated.
        samples: u64,
        /// Slots that scrolled out of the buffer before they could be read.
        skipped: u64,
        /// Contribution of this update alone.
        delta: Totals,
    },
    /// The snapshot failed validation and was discarded.
    Rejected(LengthMismatch),
}

/// Thread-safe integrator of history snapshots into cumulative totals.
///
/// `update` is the only integration path and is meant to be driven by a
/// single writer (see [`crate::Poller`]). Readers take a shared lock just
/// long enough to copy the state out, so a scrape never observes a partial
/// update and never waits on network I/O.
#[derive(Debug, Default)]
pub struct Accumulator {
    state: RwLock<AccumulatorState>,
}

impl Accumulator {
    /// Create an uninitialized accumulator with zero totals.
    pub fn new() -> Self {
        Self::default()
    }

    /// Integrate a freshly fetched history snapshot.
    ///
    /// Calling this again with an unchanged sequence is a no-op. A snapshot
    /// with empty or mismatched series is discarded and recorded as the last
    /// error; any other call clears the last error.
    pub fn update(&self, history: &HistorySnapshot) -> UpdateOutcome {
        let outcome = {
            let mut state = self.state.write();
            let outcome = apply(&mut state, history);
            state.last_error = match &outcome {
                UpdateOutcome::Rejected(lengths) => Some(AccumulatorError::Validation(*lengths)),
                _ => None,
            };
            outcome
        };

        log_outcome(&outcome, history);
        outcome
    }

    /// Record a failed fetch. Totals are not touched.
    pub fn record_error(&self, err: impl Into<AccumulatorError>) {
        self.state.write().last_error = Some(err.into());
    }

    /// Consistent copy of the six totals.
    pub fn totals(&self) -> Totals {
        self.state.read().totals
    }

    /// Error from the most recent poll, if it failed.
    pub fn last_error(&self) -> Option<AccumulatorError> {
        self.state.read().last_error.clone()
    }

    /// Last integrated sequence number, once initialized.
    pub fn last_sequence(&self) -> Option<u64> {
        let state = self.state.read();
        state.initialized.then_some(state.last_sequence)
    }

    pub fn is_initialized(&self) -> bool {
        self.state.read().initialized
    }

    /// Consistent copy of the full state.
    pub fn state(&self) -> AccumulatorState {
        self.state.read().clone()
    }
}

/// Remember the length of a valid snapshot, returning the previous length
/// when it differs.
fn observe_buffer_len(state: &mut AccumulatorState, history: &HistorySnapshot) -> Option<usize> {
    let len = history.validate().ok()?;
    let previous = state.buffer_len.replace(len)?;
    (previous != len).then_some(previous)
}

fn apply(state: &mut AccumulatorState, history: &HistorySnapshot) -> UpdateOutcome {
    let buffer_len = match history.validate() {
        Ok(len) => len as u64,
        Err(lengths) => return UpdateOutcome::Rejected(lengths),
    };

    let current = history.sequence;

    if !state.initialized {
        state.last_sequence = current;
        state.initialized = true;
        return UpdateOutcome::Initialized { sequence: current };
    }

    if current < state.last_sequence {
        let previous = state.last_sequence;
        state.last_sequence = current;
        return UpdateOutcome::Reset { previous, current };
    }

    let elapsed = current - state.last_sequence;
    if elapsed == 0 {
        return UpdateOutcome::Unchanged;
    }

    let samples = elapsed.min(buffer_len);
    let window = Window::new(state.last_sequence, samples, history.buffer_len());
    let delta = Totals::integrate(history, window);

    state.totals += delta;
    state.last_sequence = current;

    UpdateOutcome::Integrated {
        samples,
        skipped: elapsed - samples,
        delta,
    }
}

fn log_outcome(outcome: &UpdateOutcome, history: &HistorySnapshot) {
    let buffer_len = history.buffer_len();

    match outcome {
        UpdateOutcome::Initialized { sequence } => {
            info!(
                current = sequence,
                buffer_len,
                newest_slot = ?history.newest_index(),
                "Accumulator initialized"
            );
        }
        UpdateOutcome::Unchanged => {}
        UpdateOutcome::Reset { previous, current } => {
            warn!(
                previous,
                current, "Counter reset detected (device restart?), keeping totals"
            );
        }
        UpdateOutcome::Integrated {
            samples,
            skipped,
            delta,
        } => {
            if *skipped > 0 {
                warn!(
                    delta = samples + skipped,
                    buffer_len, skipped, "Sequence delta exceeds history buffer size, possible data loss"
                );
            }
            let previous = history.sequence - (samples + skipped);
            let sample_indices: Vec<usize> =
                Window::new(previous, (*samples).min(3), buffer_len).collect();
            debug!(
                samples,
                ?sample_indices,
                download_delta_bytes = delta.download_bytes,
                upload_delta_bytes = delta.upload_bytes,
                energy_delta_joules = delta.energy_joules,
                ping_latency_delta_seconds = delta.ping_latency_seconds_sum,
                ping_drop_delta = delta.ping_drop_count,
                "Metrics update"
            );
        }
        UpdateOutcome::Rejected(lengths) => {
            error!(
                downlink = lengths.downlink,
                uplink = lengths.uplink,
                power = lengths.power,
                ping_latency = lengths.ping_latency,
                ping_drop = lengths.ping_drop,
                "Discarding history snapshot: {}",
                lengths
            );
        }
    }
}
