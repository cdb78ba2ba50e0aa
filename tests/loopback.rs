//! End-to-end checks over real loopback multicast sockets.
//!
//! These exercise the full send -> join -> receive -> classify -> report
//! path. Sandboxes without a multicast route fail the initial probe send;
//! the tests skip themselves there instead of reporting false failures.

use mcast_probe::collector::Collector;
use mcast_probe::config::{CollectorConfig, EmitterConfig};
use mcast_probe::emitter::Emitter;
use mcast_probe::payload;
use mcast_probe::socket;
use mcast_probe::tracker::Snapshot;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

fn multicast_available() -> bool {
    let addr = socket::resolve_group("239.255.90.90", 49999).expect("resolve probe group");
    match socket::send_socket(&addr, 1) {
        Ok(sock) => sock.send_to(b"probe", addr).is_ok(),
        Err(_) => false,
    }
}

struct TestCollector {
    running: Arc<AtomicBool>,
    handle: thread::JoinHandle<()>,
    reports: UnboundedReceiver<Snapshot>,
    group_addr: SocketAddr,
    send: UdpSocket,
}

fn start_collector(group: &str, port: u16) -> TestCollector {
    let group_addr = socket::resolve_group(group, port).expect("resolve group");
    let recv = socket::recv_socket(&group_addr).expect("recv socket");
    let send = socket::send_socket(&group_addr, 1).expect("send socket");

    let (reports_tx, reports) = unbounded_channel();
    let config = CollectorConfig {
        group: group.to_string(),
        port,
        report_interval: Duration::from_millis(100),
    };
    let mut collector = Collector::new(config, recv, reports_tx);

    let running = Arc::new(AtomicBool::new(true));
    let handle = {
        let running = running.clone();
        thread::spawn(move || collector.run(&running))
    };

    // Give the join and the receive loop a moment to settle.
    thread::sleep(Duration::from_millis(50));

    TestCollector {
        running,
        handle,
        reports,
        group_addr,
        send,
    }
}

fn accumulate(reports: &mut UnboundedReceiver<Snapshot>, totals: &mut Snapshot) {
    while let Ok(snapshot) = reports.try_recv() {
        totals.total_received += snapshot.total_received;
        totals.total_good += snapshot.total_good;
        totals.total_invalid += snapshot.total_invalid;
        totals.total_lost += snapshot.total_lost;
    }
}

fn wait_until(
    reports: &mut UnboundedReceiver<Snapshot>,
    totals: &mut Snapshot,
    done: impl Fn(&Snapshot) -> bool,
) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        accumulate(reports, totals);
        if done(totals) {
            return;
        }
        thread::sleep(Duration::from_millis(25));
    }
}

/// Stop the collector and fold its tail report into the totals.
fn stop(mut test: TestCollector, totals: &mut Snapshot) {
    test.running.store(false, Ordering::Relaxed);
    test.handle.join().expect("collector thread");
    accumulate(&mut test.reports, totals);
}

#[test]
fn test_clean_stream_is_lossless() {
    if !multicast_available() {
        eprintln!("skipping: no multicast route on this host");
        return;
    }

    let mut test = start_collector("239.255.90.1", 47891);
    for n in 1..=100u64 {
        test.send
            .send_to(&payload::encode(n), test.group_addr)
            .expect("send");
        thread::sleep(Duration::from_micros(300));
    }

    let mut totals = Snapshot::default();
    wait_until(&mut test.reports, &mut totals, |t| t.total_good >= 100);
    stop(test, &mut totals);

    assert_eq!(totals.total_good, 100);
    assert_eq!(totals.total_lost, 0);
    assert_eq!(totals.total_invalid, 0);
    assert_eq!(totals.total_received, 100);
}

#[test]
fn test_gap_and_duplicate_accounting() {
    if !multicast_available() {
        eprintln!("skipping: no multicast route on this host");
        return;
    }

    let mut test = start_collector("239.255.90.2", 47892);
    for n in [1u64, 2, 3, 7, 7] {
        test.send
            .send_to(&payload::encode(n), test.group_addr)
            .expect("send");
        thread::sleep(Duration::from_millis(2));
    }

    let mut totals = Snapshot::default();
    // 5 datagrams plus the 4 slots consumed by the jump to 7.
    wait_until(&mut test.reports, &mut totals, |t| t.total_received >= 9);
    stop(test, &mut totals);

    assert_eq!(totals.total_good, 3);
    assert_eq!(totals.total_lost, 3);
    assert_eq!(totals.total_invalid, 0);
    assert_eq!(totals.total_received, 9);
}

#[test]
fn test_garbage_payloads_count_invalid() {
    if !multicast_available() {
        eprintln!("skipping: no multicast route on this host");
        return;
    }

    let mut test = start_collector("239.255.90.3", 47893);
    for datagram in [&b"garbage"[..], &b"\0\0"[..], &payload::encode(5)[..]] {
        test.send
            .send_to(datagram, test.group_addr)
            .expect("send");
        thread::sleep(Duration::from_millis(2));
    }

    let mut totals = Snapshot::default();
    wait_until(&mut test.reports, &mut totals, |t| t.total_received >= 3);
    stop(test, &mut totals);

    assert_eq!(totals.total_invalid, 2);
    assert_eq!(totals.total_good, 1);
    assert_eq!(totals.total_lost, 0);
}

#[test]
fn test_emitter_to_collector() {
    if !multicast_available() {
        eprintln!("skipping: no multicast route on this host");
        return;
    }

    let mut test = start_collector("239.255.90.4", 47894);

    let config = EmitterConfig {
        group: "239.255.90.4".to_string(),
        port: 47894,
        ttl: 1,
        packet_interval: Duration::from_millis(2),
    };
    let group_addr = test.group_addr;
    let send = socket::send_socket(&group_addr, config.ttl).expect("send socket");
    let emitter = Emitter::new(config, send, group_addr);

    let emitting = Arc::new(AtomicBool::new(true));
    let emitter_handle = {
        let emitting = emitting.clone();
        thread::spawn(move || emitter.run(&emitting))
    };

    let mut totals = Snapshot::default();
    wait_until(&mut test.reports, &mut totals, |t| t.total_good >= 20);

    emitting.store(false, Ordering::Relaxed);
    emitter_handle.join().expect("emitter thread");
    stop(test, &mut totals);

    // The emitter starts at 1 and nothing is lost on loopback, so every
    // observed packet is next-in-sequence.
    assert!(totals.total_good >= 20);
    assert_eq!(totals.total_lost, 0);
    assert_eq!(totals.total_invalid, 0);
    assert_eq!(totals.total_received, totals.total_good);
}
