//! mcast-probe - multicast network troubleshooting tool
//!
//! One role (`send`) injects a continuous stream of sequence-numbered UDP
//! datagrams into a multicast group; the other role (`recv`) joins the group,
//! tracks the incoming sequence, and derives loss/duplication/corruption
//! statistics over rolling reporting intervals. Each interval is shipped to
//! InfluxDB as a single measurement point.

pub mod collector;
pub mod config;
pub mod emitter;
pub mod error;
pub mod influx;
pub mod payload;
pub mod socket;
pub mod tracker;

pub use config::{CollectorConfig, EmitterConfig, InfluxConfig};
pub use error::SetupError;
