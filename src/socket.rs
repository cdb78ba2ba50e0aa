//! Multicast socket construction for both roles.
//!
//! Resolving the group fixes the address family, and the family selects
//! which option set applies downstream: `IP_MULTICAST_TTL` /
//! `IP_ADD_MEMBERSHIP` for IPv4, `IPV6_MULTICAST_HOPS` / `IPV6_JOIN_GROUP`
//! for IPv6.

use crate::config::RECV_POLL;
use crate::error::SetupError;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use tracing::debug;

/// Resolve the multicast group (hostname or literal) to a concrete
/// address. Resolution failure is fatal; neither role can proceed.
pub fn resolve_group(group: &str, port: u16) -> Result<SocketAddr, SetupError> {
    let mut addrs = (group, port)
        .to_socket_addrs()
        .map_err(|e| SetupError::Resolution {
            group: group.to_string(),
            reason: e.to_string(),
        })?;

    addrs.next().ok_or_else(|| SetupError::Resolution {
        group: group.to_string(),
        reason: "no usable address family".to_string(),
    })
}

/// Sending socket: TTL/hop-limit applied for the resolved family, loopback
/// delivery enabled so a collector on the same host sees the stream. Not
/// bound to the group; used purely as a client writing to it.
pub fn send_socket(group_addr: &SocketAddr, ttl: u32) -> Result<UdpSocket, SetupError> {
    let socket = new_socket(group_addr)?;

    match group_addr.ip() {
        IpAddr::V4(_) => {
            socket
                .set_multicast_ttl_v4(ttl)
                .map_err(|e| setup("set multicast TTL", e))?;
            socket
                .set_multicast_loop_v4(true)
                .map_err(|e| setup("set multicast loopback", e))?;
        }
        IpAddr::V6(_) => {
            socket
                .set_multicast_hops_v6(ttl)
                .map_err(|e| setup("set multicast hops", e))?;
            socket
                .set_multicast_loop_v6(true)
                .map_err(|e| setup("set multicast loopback", e))?;
        }
    }

    debug!("send socket ready, group = {}, ttl = {}", group_addr, ttl);
    Ok(socket.into())
}

/// Receiving socket: address reuse enabled (multiple probe instances can
/// coexist on one host), bound to the wildcard address on the group port,
/// joined to the group on the default interface.
///
/// The read timeout keeps the collector's report boundary live while the
/// group is idle; it is not visible to callers beyond `WouldBlock` reads.
pub fn recv_socket(group_addr: &SocketAddr) -> Result<UdpSocket, SetupError> {
    let socket = new_socket(group_addr)?;

    socket
        .set_reuse_address(true)
        .map_err(|e| setup("set address reuse", e))?;

    let wildcard: SocketAddr = match group_addr.ip() {
        IpAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, group_addr.port()).into(),
        IpAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, group_addr.port()).into(),
    };
    socket
        .bind(&wildcard.into())
        .map_err(|e| setup("bind", e))?;

    match group_addr.ip() {
        IpAddr::V4(group) => socket
            .join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)
            .map_err(|e| setup("join group", e))?,
        IpAddr::V6(group) => socket
            .join_multicast_v6(&group, 0)
            .map_err(|e| setup("join group", e))?,
    }

    socket
        .set_read_timeout(Some(RECV_POLL))
        .map_err(|e| setup("set read timeout", e))?;

    debug!(
        "recv socket ready, group = {}, port = {}",
        group_addr.ip(),
        group_addr.port()
    );
    Ok(socket.into())
}

fn new_socket(group_addr: &SocketAddr) -> Result<Socket, SetupError> {
    Socket::new(
        Domain::for_address(*group_addr),
        Type::DGRAM,
        Some(Protocol::UDP),
    )
    .map_err(|e| setup("create", e))
}

fn setup(stage: &'static str, source: io::Error) -> SetupError {
    SetupError::Socket { stage, source }
}
