//! Packet generator: floods the group with sequence-numbered datagrams.

use crate::config::EmitterConfig;
use crate::payload;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tracing::{debug, info, warn};

pub struct Emitter {
    config: EmitterConfig,
    socket: UdpSocket,
    group_addr: SocketAddr,
}

impl Emitter {
    pub fn new(config: EmitterConfig, socket: UdpSocket, group_addr: SocketAddr) -> Self {
        Self {
            config,
            socket,
            group_addr,
        }
    }

    /// Send one datagram per inter-packet interval until `running` drops.
    ///
    /// UDP has no backpressure, and loss is the very signal this tool
    /// exists to measure, so a failed send is logged and the loop keeps
    /// going. The sequence counter advances either way; the receiver sees
    /// a send that never made it as a gap.
    pub fn run(&self, running: &AtomicBool) {
        info!(
            "Sending packets, group = {}, interval = {:?}",
            self.group_addr, self.config.packet_interval
        );

        let mut seq_num: u64 = 1;
        let mut sent: u64 = 0;
        let mut errors: u64 = 0;

        while running.load(Ordering::Relaxed) {
            let datagram = payload::encode(seq_num);
            match self.socket.send_to(&datagram, self.group_addr) {
                Ok(_) => {
                    sent += 1;
                    debug!("Sent packet to {}, seq_num = {}", self.group_addr, seq_num);
                }
                Err(e) => {
                    errors += 1;
                    warn!(
                        "Send to {} failed, seq_num = {}: {}",
                        self.group_addr, seq_num, e
                    );
                }
            }

            seq_num += 1;
            thread::sleep(self.config.packet_interval);
        }

        info!("Emitter stopped, {} sent, {} send errors", sent, errors);
    }
}
