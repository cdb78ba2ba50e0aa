//! InfluxDB v2 metrics sink.
//!
//! Each interval snapshot becomes one Line Protocol point:
//!
//! ```text
//! traffic,group=239.1.1.1 total_received=51i,total_good=50i,total_invalid=0i,total_lost=1i 1700000000000000000
//! ```
//!
//! Writes are fire-and-forget: a sink that is down, slow, or rejecting
//! auth must never stall or kill the receive loop. The writer task owns
//! the HTTP client and consumes snapshots from an unbounded channel, so
//! ordering is preserved and the collector never blocks on sink I/O.

use crate::config::InfluxConfig;
use crate::tracker::Snapshot;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};

/// Measurement name every interval point is written under.
pub const MEASUREMENT: &str = "traffic";

const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Render one snapshot as a Line Protocol point. Integer fields carry the
/// `i` suffix; the group tag is escaped per the Line Protocol rules.
pub fn to_line_protocol(group: &str, snapshot: &Snapshot, timestamp_ns: u128) -> String {
    format!(
        "{},group={} total_received={}i,total_good={}i,total_invalid={}i,total_lost={}i {}",
        escape_measurement(MEASUREMENT),
        escape_tag_value(group),
        snapshot.total_received,
        snapshot.total_good,
        snapshot.total_invalid,
        snapshot.total_lost,
        timestamp_ns,
    )
}

/// Measurement names must escape commas and spaces.
fn escape_measurement(s: &str) -> String {
    s.replace(',', "\\,").replace(' ', "\\ ")
}

/// Tag values must escape commas, equals signs and spaces.
fn escape_tag_value(s: &str) -> String {
    s.replace(',', "\\,").replace('=', "\\=").replace(' ', "\\ ")
}

pub struct InfluxSink {
    config: InfluxConfig,
    group: String,
    write_url: String,
}

impl InfluxSink {
    pub fn new(config: InfluxConfig, group: String) -> Self {
        let write_url = format!(
            "{}/api/v2/write?org={}&bucket={}&precision=ns",
            config.url.trim_end_matches('/'),
            config.org,
            config.bucket,
        );
        Self {
            config,
            group,
            write_url,
        }
    }

    /// Consume snapshots until the channel closes.
    ///
    /// With the sink disabled (empty URL) or an HTTP client that cannot be
    /// built, the task still drains the channel so the collector side
    /// never sees a closed sender during normal operation.
    pub async fn run(self, mut reports: UnboundedReceiver<Snapshot>) {
        if !self.config.is_enabled() {
            debug!("Metrics sink disabled, reports are logged only");
            while reports.recv().await.is_some() {}
            return;
        }

        let client = match reqwest::Client::builder().timeout(WRITE_TIMEOUT).build() {
            Ok(client) => client,
            Err(e) => {
                warn!("Metrics sink unavailable, dropping all reports: {}", e);
                while reports.recv().await.is_some() {}
                return;
            }
        };

        while let Some(snapshot) = reports.recv().await {
            self.write(&client, &snapshot).await;
        }
    }

    async fn write(&self, client: &reqwest::Client, snapshot: &Snapshot) {
        let timestamp_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let line = to_line_protocol(&self.group, snapshot, timestamp_ns);

        let result = client
            .post(&self.write_url)
            .header("Authorization", format!("Token {}", self.config.token))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(line)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!("Wrote interval report for group {}", self.group);
            }
            Ok(response) => {
                warn!("Metrics write rejected: {}", response.status());
            }
            Err(e) => {
                warn!("Metrics write failed: {}", e);
            }
        }
    }
}
