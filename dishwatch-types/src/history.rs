//! History snapshot - the device's rolling per-second sample buffer.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

/// A copy of the device's circular history buffer.
///
/// The device keeps the last `N` one-second samples for each series in
/// fixed-size arrays. `sequence` counts samples since the device booted; the
/// newest valid sample lives at `sequence % N` and older ones wrap around
/// behind it. All five series share the same length.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase", default)
)]
pub struct HistorySnapshot {
    /// Monotonic sample counter identifying the newest valid slot.
    #[cfg_attr(feature = "serde", serde(rename = "current"))]
    pub sequence: u64,

    /// Downlink throughput samples, bits per second.
    pub downlink_throughput_bps: Vec<f64>,

    /// Uplink throughput samples, bits per second.
    pub uplink_throughput_bps: Vec<f64>,

    /// Input power samples, watts.
    pub power_in: Vec<f64>,

    /// Ping latency to the point of presence, milliseconds.
    pub pop_ping_latency_ms: Vec<f64>,

    /// Fraction of pings dropped during each second (0.0 - 1.0).
    pub pop_ping_drop_rate: Vec<f64>,
}

impl HistorySnapshot {
    /// Create a zero-filled snapshot with `capacity` slots per series.
    pub fn with_capacity(sequence: u64, capacity: usize) -> Self {
        Self {
            sequence,
            downlink_throughput_bps: vec![0.0; capacity],
            uplink_throughput_bps: vec![0.0; capacity],
            power_in: vec![0.0; capacity],
            pop_ping_latency_ms: vec![0.0; capacity],
            pop_ping_drop_rate: vec![0.0; capacity],
        }
    }

    /// Buffer capacity, taken from the downlink series.
    pub fn buffer_len(&self) -> usize {
        self.downlink_throughput_bps.len()
    }

    /// Slot holding the newest sample, or `None` for an empty buffer.
    pub fn newest_index(&self) -> Option<usize> {
        let len = self.buffer_len() as u64;
        if len == 0 {
            return None;
        }
        Some((self.sequence % len) as usize)
    }

    /// Check that every series is non-empty and equally long.
    ///
    /// Returns the shared buffer length on success.
    pub fn validate(&self) -> Result<usize, LengthMismatch> {
        let lengths = self.lengths();
        let expected = lengths.downlink;

        if expected == 0 {
            return Err(lengths);
        }

        let consistent = lengths.uplink == expected
            && lengths.power == expected
            && lengths.ping_latency == expected
            && lengths.ping_drop == expected;

        if consistent {
            Ok(expected)
        } else {
            Err(lengths)
        }
    }

    /// Lengths of all five series.
    pub fn lengths(&self) -> LengthMismatch {
        LengthMismatch {
            downlink: self.downlink_throughput_bps.len(),
            uplink: self.uplink_throughput_bps.len(),
            power: self.power_in.len(),
            ping_latency: self.pop_ping_latency_ms.len(),
            ping_drop: self.pop_ping_drop_rate.len(),
        }
    }
}

/// Series lengths of a history snapshot that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LengthMismatch {
    pub downlink: usize,
    pub uplink: usize,
    pub power: usize,
    pub ping_latency: usize,
    pub ping_drop: usize,
}

impl LengthMismatch {
    /// True when the buffer has no samples at all.
    pub fn is_empty(&self) -> bool {
        self.downlink == 0
    }
}

impl fmt::Display for LengthMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "empty history arrays");
        }
        write!(
            f,
            "history array length mismatch (downlink={}, uplink={}, power={}, ping_latency={}, ping_drop={})",
            self.downlink, self.uplink, self.power, self.ping_latency, self.ping_drop
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LengthMismatch {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_capacity_zero_fills_every_series() {
        let history = HistorySnapshot::with_capacity(7, 4);
        assert_eq!(history.sequence, 7);
        assert_eq!(history.validate(), Ok(4));
        assert!(history.power_in.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn newest_index_wraps_sequence() {
        let history = HistorySnapshot::with_capacity(1000, 900);
        assert_eq!(history.newest_index(), Some(100));

        let empty = HistorySnapshot::default();
        assert_eq!(empty.newest_index(), None);
    }

    #[test]
    fn validate_rejects_empty_buffer() {
        let err = HistorySnapshot::default().validate().unwrap_err();
        assert!(err.is_empty());
        assert_eq!(err.to_string(), "empty history arrays");
    }

    #[test]
    fn validate_reports_every_length() {
        let mut history = HistorySnapshot::with_capacity(1, 3);
        history.power_in.pop();

        let err = history.validate().unwrap_err();
        assert_eq!(err.downlink, 3);
        assert_eq!(err.power, 2);
        assert!(err.to_string().contains("power=2"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_uses_device_field_names() {
        let history = HistorySnapshot::with_capacity(42, 1);
        let json = serde_json::to_value(&history).unwrap();

        assert_eq!(json["current"], 42);
        assert!(json.get("downlinkThroughputBps").is_some());
        assert!(json.get("popPingDropRate").is_some());
    }
}
