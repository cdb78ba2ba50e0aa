//! Receive loop: pulls datagrams, drives the tracker, snapshots the
//! counters at every report boundary.

use crate::config::{CollectorConfig, MAX_DATAGRAM};
use crate::payload;
use crate::tracker::{Classification, SequenceTracker, Snapshot};
use std::io::ErrorKind;
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

pub struct Collector {
    config: CollectorConfig,
    socket: UdpSocket,
    tracker: SequenceTracker,
    reports: UnboundedSender<Snapshot>,
}

impl Collector {
    pub fn new(
        config: CollectorConfig,
        socket: UdpSocket,
        reports: UnboundedSender<Snapshot>,
    ) -> Self {
        Self {
            config,
            socket,
            tracker: SequenceTracker::new(),
            reports,
        }
    }

    /// Receive until `running` drops.
    ///
    /// The boundary check runs before every receive; the socket's read
    /// timeout guarantees the check comes around even when the group is
    /// completely idle, so quiet intervals still report on schedule (as
    /// all-zero snapshots). Per-packet and per-report failures never
    /// leave this loop.
    pub fn run(&mut self, running: &AtomicBool) {
        info!(
            "Receiving packets, group = {}, port = {}",
            self.config.group, self.config.port
        );

        let mut buf = [0u8; MAX_DATAGRAM];
        let mut last_report = Instant::now();

        while running.load(Ordering::Relaxed) {
            if last_report.elapsed() >= self.config.report_interval {
                self.flush_report();
                last_report = Instant::now();
            }

            let (len, sender) = match self.socket.recv_from(&mut buf) {
                Ok(received) => received,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    continue;
                }
                Err(e) => {
                    warn!("Receive error: {}", e);
                    continue;
                }
            };

            let seq_num = payload::parse(&buf[..len]);
            match (seq_num, self.tracker.observe(seq_num)) {
                (Some(n), Classification::Good) => {
                    debug!("Received packet from {}, seq_num = {}", sender, n);
                }
                (Some(n), Classification::Gap { lost }) => {
                    debug!(
                        "Sequence jump from {}, seq_num = {}, estimated lost = {}",
                        sender, n, lost
                    );
                }
                _ => {
                    debug!("Invalid packet from {}, {} bytes", sender, len);
                }
            }
        }

        // Hand the tail interval to the sink before shutting down.
        self.flush_report();
    }

    fn flush_report(&mut self) {
        let snapshot = self.tracker.take_snapshot();
        debug!(
            "Report: {} total, {} lost, {} invalid, {} good",
            snapshot.total_received,
            snapshot.total_lost,
            snapshot.total_invalid,
            snapshot.total_good
        );

        // The sink applies no backpressure; a closed channel only means
        // shutdown is already underway.
        if self.reports.send(snapshot).is_err() {
            warn!("Metrics channel closed, dropping report");
        }
    }
}
