use std::time::Duration;

/// Upper bound on a single datagram read (Ethernet MTU headroom).
/// Oversized payloads are truncated and end up classified invalid.
pub const MAX_DATAGRAM: usize = 1500;

/// Filler byte appended after the sequence record, and stripped from the
/// end of received payloads before parsing.
pub const FILLER: u8 = 0;

/// Receive poll timeout; bounds how late a report boundary can fire when
/// the group goes quiet.
pub const RECV_POLL: Duration = Duration::from_millis(100);

/// Configuration for the sending role. Built once from the CLI and
/// immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct EmitterConfig {
    pub group: String,
    pub port: u16,
    /// TTL (IPv4) / hop limit (IPv6) for outgoing multicast packets.
    pub ttl: u32,
    pub packet_interval: Duration,
}

/// Configuration for the receiving role.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub group: String,
    pub port: u16,
    pub report_interval: Duration,
}

/// InfluxDB v2 connection parameters for the metrics sink.
#[derive(Debug, Clone)]
pub struct InfluxConfig {
    /// Base URL of the InfluxDB server. Empty disables the sink.
    pub url: String,
    pub org: String,
    pub bucket: String,
    pub token: String,
}

impl InfluxConfig {
    pub fn is_enabled(&self) -> bool {
        !self.url.is_empty()
    }
}
