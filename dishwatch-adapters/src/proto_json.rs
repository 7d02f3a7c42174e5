//! Decoding of protobuf-JSON `Device/Handle` responses.
//!
//! A gRPC-JSON gateway in front of the dish answers `Device/Handle` requests
//! with the JSON mapping of the dish's protobuf messages. That mapping
//! encodes 64-bit integers as strings and non-finite floats as `"NaN"`,
//! `"Infinity"` or `"-Infinity"`, and omits fields holding their zero value.
//! The decoders here accept all of those forms and fill omitted fields with
//! zero.

use dishwatch_types::{
    DeviceInfo, DeviceState, GpsStats, HistorySnapshot, ObstructionStats, StatusSnapshot,
};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

use crate::AdapterError;

/// Request body asking for the history buffer.
pub const HISTORY_REQUEST: &str = r#"{"getHistory":{}}"#;

/// Request body asking for the current status.
pub const STATUS_REQUEST: &str = r#"{"getStatus":{}}"#;

/// Decode a `Device/Handle` response carrying `dishGetHistory`.
pub fn parse_history(body: &[u8]) -> Result<HistorySnapshot, AdapterError> {
    let response: HandleResponse = serde_json::from_slice(body)?;
    response
        .dish_get_history
        .map(HistoryWire::into_snapshot)
        .ok_or(AdapterError::MissingPayload("dishGetHistory"))
}

/// Decode a `Device/Handle` response carrying `dishGetStatus`.
pub fn parse_status(body: &[u8]) -> Result<StatusSnapshot, AdapterError> {
    let response: HandleResponse = serde_json::from_slice(body)?;
    response
        .dish_get_status
        .map(StatusWire::into_snapshot)
        .ok_or(AdapterError::MissingPayload("dishGetStatus"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HandleResponse {
    dish_get_history: Option<HistoryWire>,
    dish_get_status: Option<StatusWire>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct HistoryWire {
    #[serde(deserialize_with = "lenient_u64")]
    current: u64,
    #[serde(deserialize_with = "lenient_f64_vec")]
    downlink_throughput_bps: Vec<f64>,
    #[serde(deserialize_with = "lenient_f64_vec")]
    uplink_throughput_bps: Vec<f64>,
    #[serde(deserialize_with = "lenient_f64_vec")]
    power_in: Vec<f64>,
    #[serde(deserialize_with = "lenient_f64_vec")]
    pop_ping_latency_ms: Vec<f64>,
    #[serde(deserialize_with = "lenient_f64_vec")]
    pop_ping_drop_rate: Vec<f64>,
}

impl HistoryWire {
    fn into_snapshot(self) -> HistorySnapshot {
        HistorySnapshot {
            sequence: self.current,
            downlink_throughput_bps: self.downlink_throughput_bps,
            uplink_throughput_bps: self.uplink_throughput_bps,
            power_in: self.power_in,
            pop_ping_latency_ms: self.pop_ping_latency_ms,
            pop_ping_drop_rate: self.pop_ping_drop_rate,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StatusWire {
    device_info: DeviceInfo,
    device_state: DeviceStateWire,
    obstruction_stats: ObstructionStatsWire,
    #[serde(deserialize_with = "lenient_f64")]
    downlink_throughput_bps: f64,
    #[serde(deserialize_with = "lenient_f64")]
    uplink_throughput_bps: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pop_ping_latency_ms: f64,
    #[serde(deserialize_with = "lenient_f64")]
    boresight_azimuth_deg: f64,
    #[serde(deserialize_with = "lenient_f64")]
    boresight_elevation_deg: f64,
    gps_stats: GpsStats,
    eth_speed_mbps: u32,
    is_snr_above_noise_floor: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DeviceStateWire {
    #[serde(deserialize_with = "lenient_u64")]
    uptime_s: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ObstructionStatsWire {
    #[serde(deserialize_with = "lenient_f64")]
    fraction_obstructed: f64,
    #[serde(deserialize_with = "lenient_f64")]
    valid_s: f64,
    #[serde(deserialize_with = "lenient_f64")]
    time_obstructed: f64,
}

impl StatusWire {
    fn into_snapshot(self) -> StatusSnapshot {
        StatusSnapshot {
            device_info: self.device_info,
            device_state: DeviceState {
                uptime_s: self.device_state.uptime_s,
            },
            obstruction_stats: ObstructionStats {
                fraction_obstructed: self.obstruction_stats.fraction_obstructed,
                valid_s: self.obstruction_stats.valid_s,
                time_obstructed: self.obstruction_stats.time_obstructed,
            },
            downlink_throughput_bps: self.downlink_throughput_bps,
            uplink_throughput_bps: self.uplink_throughput_bps,
            pop_ping_latency_ms: self.pop_ping_latency_ms,
            boresight_azimuth_deg: self.boresight_azimuth_deg,
            boresight_elevation_deg: self.boresight_elevation_deg,
            gps_stats: self.gps_stats,
            eth_speed_mbps: self.eth_speed_mbps,
            is_snr_above_noise_floor: self.is_snr_above_noise_floor,
        }
    }
}

/// A float as either a JSON number or one of its string spellings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonFloat {
    Number(f64),
    Text(String),
}

impl JsonFloat {
    fn to_f64(&self) -> Result<f64, String> {
        match self {
            JsonFloat::Number(value) => Ok(*value),
            // str::parse accepts "NaN", "Infinity" and "-Infinity"
            JsonFloat::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| format!("invalid float {:?}", text)),
        }
    }
}

/// A 64-bit unsigned integer as either a JSON number or a decimal string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonUint {
    Number(u64),
    Text(String),
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match Option::<JsonUint>::deserialize(deserializer)? {
        None => Ok(0),
        Some(JsonUint::Number(value)) => Ok(value),
        Some(JsonUint::Text(text)) => text
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid uint64 {:?}", text))),
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match Option::<JsonFloat>::deserialize(deserializer)? {
        None => Ok(0.0),
        Some(value) => value.to_f64().map_err(D::Error::custom),
    }
}

fn lenient_f64_vec<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
    Option::<Vec<JsonFloat>>::deserialize(deserializer)?
        .unwrap_or_default()
        .iter()
        .map(JsonFloat::to_f64)
        .collect::<Result<Vec<_>, _>>()
        .map_err(D::Error::custom)
}
