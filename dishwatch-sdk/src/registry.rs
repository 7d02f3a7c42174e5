//! Metric descriptors for the Prometheus exposition.
//!
//! A [`Registry`] is built once at startup with an optional namespace and
//! handed to the [`crate::Exposer`]. It owns no values, only names, help
//! text and types, so any number of scrapes can share it.

/// Prometheus metric type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
        }
    }
}

/// Description of one metric family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDesc {
    name: String,
    help: &'static str,
    kind: MetricKind,
    labels: &'static [&'static str],
}

impl MetricDesc {
    fn new(
        prefix: &str,
        name: &str,
        help: &'static str,
        kind: MetricKind,
        labels: &'static [&'static str],
    ) -> Self {
        Self {
            name: format!("{}{}", prefix, name),
            help,
            kind,
            labels,
        }
    }

    /// Fully qualified metric name, including the namespace.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        self.help
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    /// Append the `# HELP` and `# TYPE` lines.
    pub(crate) fn write_header(&self, output: &mut String) {
        output.push_str(&format!("# HELP {} {}\n", self.name, self.help));
        output.push_str(&format!("# TYPE {} {}\n", self.name, self.kind.as_str()));
    }

    /// Append the header and a single unlabeled sample.
    pub(crate) fn write(&self, output: &mut String, value: f64) {
        self.write_header(output);
        output.push_str(&format!("{} {}\n", self.name, format_value(value)));
    }

    /// Append the header and a single labeled sample.
    ///
    /// `values` pairs up with the descriptor's label names by position.
    pub(crate) fn write_labeled(&self, output: &mut String, values: &[&str], value: f64) {
        self.write_header(output);

        let labels = self
            .labels
            .iter()
            .zip(values)
            .map(|(name, value)| format!("{}=\"{}\"", name, escape_label_value(value)))
            .collect::<Vec<_>>()
            .join(",");

        output.push_str(&format!(
            "{}{{{}}} {}\n",
            self.name,
            labels,
            format_value(value)
        ));
    }
}

/// The full set of metrics the exporter can emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    // Counters integrated from history
    pub download_bytes_total: MetricDesc,
    pub upload_bytes_total: MetricDesc,
    pub energy_joules_total: MetricDesc,
    pub ping_latency_seconds_sum: MetricDesc,
    pub ping_latency_seconds_count: MetricDesc,
    pub ping_drop_total: MetricDesc,

    // Gauges from the current status
    pub downlink_throughput_bps: MetricDesc,
    pub uplink_throughput_bps: MetricDesc,
    pub pop_ping_latency_ms: MetricDesc,
    pub uptime_seconds: MetricDesc,
    pub obstruction_fraction: MetricDesc,
    pub obstruction_valid_seconds: MetricDesc,
    pub gps_satellites: MetricDesc,
    pub gps_valid: MetricDesc,
    pub eth_speed_mbps: MetricDesc,
    pub snr_above_noise_floor: MetricDesc,

    pub up: MetricDesc,
    pub info: MetricDesc,
}

impl Registry {
    /// Build the registry, prefixing every name with `namespace_`.
    pub fn new(namespace: Option<&str>) -> Self {
        use MetricKind::{Counter, Gauge};

        let prefix = namespace
            .filter(|n| !n.is_empty())
            .map(|n| format!("{}_", n))
            .unwrap_or_default();
        let p = prefix.as_str();

        Self {
            download_bytes_total: MetricDesc::new(
                p,
                "download_bytes_total",
                "Total bytes downloaded",
                Counter,
                &[],
            ),
            upload_bytes_total: MetricDesc::new(
                p,
                "upload_bytes_total",
                "Total bytes uploaded",
                Counter,
                &[],
            ),
            energy_joules_total: MetricDesc::new(
                p,
                "energy_joules_total",
                "Total energy consumed (joules)",
                Counter,
                &[],
            ),
            ping_latency_seconds_sum: MetricDesc::new(
                p,
                "ping_latency_seconds_sum",
                "Sum of ping latencies in seconds (summary metric)",
                Counter,
                &[],
            ),
            ping_latency_seconds_count: MetricDesc::new(
                p,
                "ping_latency_seconds_count",
                "Count of ping samples (summary metric)",
                Counter,
                &[],
            ),
            ping_drop_total: MetricDesc::new(p, "ping_drop_total", "Total ping drops", Counter, &[]),

            downlink_throughput_bps: MetricDesc::new(
                p,
                "downlink_throughput_bps",
                "Current downlink throughput in bits per second",
                Gauge,
                &[],
            ),
            uplink_throughput_bps: MetricDesc::new(
                p,
                "uplink_throughput_bps",
                "Current uplink throughput in bits per second",
                Gauge,
                &[],
            ),
            pop_ping_latency_ms: MetricDesc::new(
                p,
                "pop_ping_latency_ms",
                "Current ping latency to POP in milliseconds",
                Gauge,
                &[],
            ),
            uptime_seconds: MetricDesc::new(
                p,
                "uptime_seconds",
                "Device uptime in seconds",
                Gauge,
                &[],
            ),
            obstruction_fraction: MetricDesc::new(
                p,
                "obstruction_fraction",
                "Fraction of time obstructed",
                Gauge,
                &[],
            ),
            obstruction_valid_seconds: MetricDesc::new(
                p,
                "obstruction_valid_seconds",
                "Valid observation time for obstruction stats",
                Gauge,
                &[],
            ),
            gps_satellites: MetricDesc::new(
                p,
                "gps_satellites",
                "Number of GPS satellites",
                Gauge,
                &[],
            ),
            gps_valid: MetricDesc::new(
                p,
                "gps_valid",
                "GPS validity (1 = valid, 0 = invalid)",
                Gauge,
                &[],
            ),
            eth_speed_mbps: MetricDesc::new(
                p,
                "eth_speed_mbps",
                "Ethernet speed in Mbps",
                Gauge,
                &[],
            ),
            snr_above_noise_floor: MetricDesc::new(
                p,
                "snr_above_noise_floor",
                "SNR above noise floor (1 = yes, 0 = no)",
                Gauge,
                &[],
            ),

            up: MetricDesc::new(
                p,
                "up",
                "Whether the last scrape of device status was successful (1 = success, 0 = failure)",
                Gauge,
                &[],
            ),
            info: MetricDesc::new(
                p,
                "info",
                "Device information",
                Gauge,
                &["id", "hardware_version", "software_version", "country_code"],
            ),
        }
    }

    /// Every descriptor, in exposition order.
    #[cfg(test)]
    pub(crate) fn descs(&self) -> [&MetricDesc; 18] {
        [
            &self.up,
            &self.download_bytes_total,
            &self.upload_bytes_total,
            &self.energy_joules_total,
            &self.ping_latency_seconds_sum,
            &self.ping_latency_seconds_count,
            &self.ping_drop_total,
            &self.downlink_throughput_bps,
            &self.uplink_throughput_bps,
            &self.pop_ping_latency_ms,
            &self.uptime_seconds,
            &self.obstruction_fraction,
            &self.obstruction_valid_seconds,
            &self.gps_satellites,
            &self.gps_valid,
            &self.eth_speed_mbps,
            &self.snr_above_noise_floor,
            &self.info,
        ]
    }

    /// The counters integrated from history, in exposition order.
    pub fn counters(&self) -> [&MetricDesc; 6] {
        [
            &self.download_bytes_total,
            &self.upload_bytes_total,
            &self.energy_joules_total,
            &self.ping_latency_seconds_sum,
            &self.ping_latency_seconds_count,
            &self.ping_drop_total,
        ]
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Format a sample value the way Prometheus parses it.
pub(crate) fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

/// Escape a label value for Prometheus format.
/// Backslash, double-quote, and newline must be escaped.
pub(crate) fn escape_label_value(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
