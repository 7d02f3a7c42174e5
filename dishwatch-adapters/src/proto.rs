//! Protobuf messages for the dish's `SpaceX.API.Device.Device/Handle` RPC.
//!
//! Only the fields the exporter reads are declared. Field tags match the
//! messages the dish serves over gRPC reflection; everything else in a reply
//! is skipped as an unknown field when decoding.

use dishwatch_types::{
    DeviceInfo as DeviceInfoSnapshot, DeviceState as DeviceStateSnapshot, GpsStats,
    HistorySnapshot, ObstructionStats, StatusSnapshot,
};

/// Envelope sent to `Device/Handle`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Request {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(oneof = "request::Request", tags = "1004, 1007")]
    pub request: ::core::option::Option<request::Request>,
}

pub mod request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Request {
        #[prost(message, tag = "1004")]
        GetStatus(super::GetStatusRequest),
        #[prost(message, tag = "1007")]
        GetHistory(super::GetHistoryRequest),
    }
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetStatusRequest {}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetHistoryRequest {}

/// Envelope returned by `Device/Handle`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Response {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(uint64, tag = "3")]
    pub api_version: u64,
    #[prost(oneof = "response::Response", tags = "2004, 2006")]
    pub response: ::core::option::Option<response::Response>,
}

pub mod response {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Response {
        #[prost(message, tag = "2004")]
        DishGetStatus(super::DishGetStatusResponse),
        #[prost(message, tag = "2006")]
        DishGetHistory(super::DishGetHistoryResponse),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DishGetHistoryResponse {
    #[prost(uint64, tag = "1")]
    pub current: u64,
    #[prost(float, repeated, tag = "1001")]
    pub pop_ping_drop_rate: ::prost::alloc::vec::Vec<f32>,
    #[prost(float, repeated, tag = "1002")]
    pub pop_ping_latency_ms: ::prost::alloc::vec::Vec<f32>,
    #[prost(float, repeated, tag = "1003")]
    pub downlink_throughput_bps: ::prost::alloc::vec::Vec<f32>,
    #[prost(float, repeated, tag = "1004")]
    pub uplink_throughput_bps: ::prost::alloc::vec::Vec<f32>,
    #[prost(float, repeated, tag = "1010")]
    pub power_in: ::prost::alloc::vec::Vec<f32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DishGetStatusResponse {
    #[prost(message, optional, tag = "1")]
    pub device_info: ::core::option::Option<DeviceInfo>,
    #[prost(message, optional, tag = "2")]
    pub device_state: ::core::option::Option<DeviceState>,
    #[prost(message, optional, tag = "1004")]
    pub obstruction_stats: ::core::option::Option<DishObstructionStats>,
    #[prost(float, tag = "1007")]
    pub downlink_throughput_bps: f32,
    #[prost(float, tag = "1008")]
    pub uplink_throughput_bps: f32,
    #[prost(float, tag = "1009")]
    pub pop_ping_latency_ms: f32,
    #[prost(float, tag = "1011")]
    pub boresight_azimuth_deg: f32,
    #[prost(float, tag = "1012")]
    pub boresight_elevation_deg: f32,
    #[prost(message, optional, tag = "1015")]
    pub gps_stats: ::core::option::Option<DishGpsStats>,
    #[prost(int32, tag = "1016")]
    pub eth_speed_mbps: i32,
    #[prost(bool, tag = "1018")]
    pub is_snr_above_noise_floor: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeviceInfo {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub hardware_version: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub software_version: ::prost::alloc::string::String,
    #[prost(string, tag = "4")]
    pub country_code: ::prost::alloc::string::String,
    #[prost(int32, tag = "8")]
    pub bootcount: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct DeviceState {
    #[prost(uint64, tag = "1")]
    pub uptime_s: u64,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct DishObstructionStats {
    #[prost(float, tag = "1")]
    pub fraction_obstructed: f32,
    #[prost(float, tag = "4")]
    pub valid_s: f32,
    #[prost(float, tag = "9")]
    pub time_obstructed: f32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct DishGpsStats {
    #[prost(bool, tag = "1")]
    pub gps_valid: bool,
    #[prost(uint32, tag = "2")]
    pub gps_sats: u32,
}

impl Request {
    pub fn get_history() -> Self {
        Self {
            id: 0,
            request: Some(request::Request::GetHistory(GetHistoryRequest {})),
        }
    }

    pub fn get_status() -> Self {
        Self {
            id: 0,
            request: Some(request::Request::GetStatus(GetStatusRequest {})),
        }
    }
}

fn widen(samples: Vec<f32>) -> Vec<f64> {
    samples.into_iter().map(f64::from).collect()
}

impl From<DishGetHistoryResponse> for HistorySnapshot {
    fn from(history: DishGetHistoryResponse) -> Self {
        HistorySnapshot {
            sequence: history.current,
            downlink_throughput_bps: widen(history.downlink_throughput_bps),
            uplink_throughput_bps: widen(history.uplink_throughput_bps),
            power_in: widen(history.power_in),
            pop_ping_latency_ms: widen(history.pop_ping_latency_ms),
            pop_ping_drop_rate: widen(history.pop_ping_drop_rate),
        }
    }
}

impl From<DishGetStatusResponse> for StatusSnapshot {
    fn from(status: DishGetStatusResponse) -> Self {
        let info = status.device_info.unwrap_or_default();
        let obstruction = status.obstruction_stats.unwrap_or_default();
        let gps = status.gps_stats.unwrap_or_default();

        StatusSnapshot {
            device_info: DeviceInfoSnapshot {
                id: info.id,
                hardware_version: info.hardware_version,
                software_version: info.software_version,
                country_code: info.country_code,
                boot_count: u32::try_from(info.bootcount).unwrap_or(0),
            },
            device_state: DeviceStateSnapshot {
                uptime_s: status.device_state.map(|s| s.uptime_s).unwrap_or(0),
            },
            obstruction_stats: ObstructionStats {
                fraction_obstructed: f64::from(obstruction.fraction_obstructed),
                valid_s: f64::from(obstruction.valid_s),
                time_obstructed: f64::from(obstruction.time_obstructed),
            },
            downlink_throughput_bps: f64::from(status.downlink_throughput_bps),
            uplink_throughput_bps: f64::from(status.uplink_throughput_bps),
            pop_ping_latency_ms: f64::from(status.pop_ping_latency_ms),
            boresight_azimuth_deg: f64::from(status.boresight_azimuth_deg),
            boresight_elevation_deg: f64::from(status.boresight_elevation_deg),
            gps_stats: GpsStats {
                gps_valid: gps.gps_valid,
                gps_sats: gps.gps_sats,
            },
            eth_speed_mbps: u32::try_from(status.eth_speed_mbps).unwrap_or(0),
            is_snr_above_noise_floor: status.is_snr_above_noise_floor,
        }
    }
}
