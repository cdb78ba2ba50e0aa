use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mcast_probe::collector::Collector;
use mcast_probe::config::{CollectorConfig, EmitterConfig, InfluxConfig};
use mcast_probe::emitter::Emitter;
use mcast_probe::influx::InfluxSink;
use mcast_probe::socket;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "mcast-probe")]
#[command(about = "Multicast troubleshooting tool with InfluxDB output")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Increase output verbosity
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send sequence-numbered packets to a multicast group
    Send {
        /// Multicast group (IPv4/IPv6 literal or hostname)
        group: String,

        /// UDP port
        #[arg(short, long)]
        port: u16,

        /// TTL (IPv4) / hop limit (IPv6) for outgoing packets
        #[arg(short, long, default_value = "8")]
        ttl: u32,

        /// Inter-packet interval in seconds
        #[arg(short = 'i', long, default_value = "0.1")]
        packet_interval: f64,
    },
    /// Join a multicast group and derive loss statistics from the stream
    Recv {
        /// Multicast group (IPv4/IPv6 literal or hostname)
        group: String,

        /// UDP port
        #[arg(short, long)]
        port: u16,

        /// Reporting interval in seconds
        #[arg(short = 'r', long, default_value = "5")]
        report_interval: u64,

        /// InfluxDB base URL (empty string disables the sink)
        #[arg(long, default_value = "http://127.0.0.1:8086")]
        influx_url: String,

        /// InfluxDB organization
        #[arg(long, default_value = "mcast")]
        influx_org: String,

        /// InfluxDB bucket
        #[arg(long, default_value = "mcast")]
        influx_bucket: String,

        /// InfluxDB API token
        #[arg(long, default_value = "")]
        influx_token: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    match args.command {
        Commands::Send {
            group,
            port,
            ttl,
            packet_interval,
        } => {
            let config = EmitterConfig {
                group,
                port,
                ttl,
                packet_interval: Duration::from_secs_f64(packet_interval.max(0.0)),
            };
            run_emitter(config).await
        }
        Commands::Recv {
            group,
            port,
            report_interval,
            influx_url,
            influx_org,
            influx_bucket,
            influx_token,
        } => {
            let config = CollectorConfig {
                group,
                port,
                report_interval: Duration::from_secs(report_interval),
            };
            let influx = InfluxConfig {
                url: influx_url,
                org: influx_org,
                bucket: influx_bucket,
                token: influx_token,
            };
            run_collector(config, influx).await
        }
    }
}

async fn run_emitter(config: EmitterConfig) -> Result<()> {
    info!(
        "Starting as sender, group = {}, port = {}",
        config.group, config.port
    );

    let group_addr = socket::resolve_group(&config.group, config.port)?;
    let sock = socket::send_socket(&group_addr, config.ttl)?;

    let running = Arc::new(AtomicBool::new(true));
    let emitter = Emitter::new(config, sock, group_addr);
    let handle = {
        let running = running.clone();
        thread::spawn(move || emitter.run(&running))
    };

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    info!("Received Ctrl+C, shutting down");

    running.store(false, Ordering::Relaxed);
    handle
        .join()
        .map_err(|_| anyhow::anyhow!("emitter thread panicked"))?;
    Ok(())
}

async fn run_collector(config: CollectorConfig, influx: InfluxConfig) -> Result<()> {
    info!(
        "Starting as receiver, group = {}, port = {}",
        config.group, config.port
    );

    let group_addr = socket::resolve_group(&config.group, config.port)?;
    let sock = socket::recv_socket(&group_addr)?;

    let (reports_tx, reports_rx) = tokio::sync::mpsc::unbounded_channel();
    let sink = InfluxSink::new(influx, config.group.clone());
    let sink_handle = tokio::spawn(sink.run(reports_rx));

    let running = Arc::new(AtomicBool::new(true));
    let mut collector = Collector::new(config, sock, reports_tx);
    let handle = {
        let running = running.clone();
        thread::spawn(move || collector.run(&running))
    };

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    info!("Received Ctrl+C, shutting down");

    running.store(false, Ordering::Relaxed);
    handle
        .join()
        .map_err(|_| anyhow::anyhow!("collector thread panicked"))?;

    // Collector is gone, so the channel is closed; wait for the sink to
    // drain the tail report before exiting.
    sink_handle.await.context("sink task panicked")?;
    Ok(())
}
