//! Status snapshot - instantaneous device gauges.

use alloc::string::String;

/// Point-in-time status of the device.
///
/// Status is fetched once per scrape and has no relation to the history
/// buffer beyond being read in the same cycle.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase", default)
)]
pub struct StatusSnapshot {
    pub device_info: DeviceInfo,
    pub device_state: DeviceState,
    pub obstruction_stats: ObstructionStats,
    /// Current downlink throughput, bits per second.
    pub downlink_throughput_bps: f64,
    /// Current uplink throughput, bits per second.
    pub uplink_throughput_bps: f64,
    /// Current ping latency to the point of presence, milliseconds.
    pub pop_ping_latency_ms: f64,
    pub boresight_azimuth_deg: f64,
    pub boresight_elevation_deg: f64,
    pub gps_stats: GpsStats,
    /// Negotiated ethernet link speed, Mbps.
    pub eth_speed_mbps: u32,
    pub is_snr_above_noise_floor: bool,
}

/// Device identity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase", default)
)]
pub struct DeviceInfo {
    pub id: String,
    pub hardware_version: String,
    pub software_version: String,
    pub country_code: String,
    #[cfg_attr(feature = "serde", serde(rename = "bootcount"))]
    pub boot_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase", default)
)]
pub struct DeviceState {
    /// Seconds since the device last booted.
    pub uptime_s: u64,
}

/// Sky obstruction statistics.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase", default)
)]
pub struct ObstructionStats {
    /// Fraction of time the view of the sky was obstructed.
    pub fraction_obstructed: f64,
    /// Seconds of observation the fraction is based on.
    pub valid_s: f64,
    pub time_obstructed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase", default)
)]
pub struct GpsStats {
    pub gps_valid: bool,
    pub gps_sats: u32,
}

impl StatusSnapshot {
    /// Device uptime as a float, for gauge exposition.
    pub fn uptime_seconds(&self) -> f64 {
        self.device_state.uptime_s as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_status_is_zeroed() {
        let status = StatusSnapshot::default();
        assert_eq!(status.uptime_seconds(), 0.0);
        assert!(!status.gps_stats.gps_valid);
        assert!(status.device_info.id.is_empty());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn device_info_deserializes_from_device_json() {
        let json = r#"{
            "id": "ut01000000-00000000-00abcdef",
            "hardwareVersion": "rev3_proto2",
            "softwareVersion": "2024.01.01.mr30000",
            "countryCode": "US",
            "bootcount": 12
        }"#;

        let info: DeviceInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.hardware_version, "rev3_proto2");
        assert_eq!(info.country_code, "US");
        assert_eq!(info.boot_count, 12);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let stats: GpsStats = serde_json::from_str(r#"{"gpsSats": 9}"#).unwrap();
        assert_eq!(stats.gps_sats, 9);
        assert!(!stats.gps_valid);
    }
}
