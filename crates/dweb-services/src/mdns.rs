//! mDNS responder.
//!
//! Answers multicast A queries for any name under the configured host
//! (`*.dweb.local` by default) with this machine's non-loopback IPv4
//! addresses, so nodes on the LAN can reach the daemon by name. The host
//! name itself is not answered, only names below it.
//!
//! Addresses are read once at startup.

use std::net::{Ipv4Addr, SocketAddrV4};

use anyhow::{Context, Result};
use nix::net::if_::InterfaceFlags;
use simple_dns::rdata::{RData, A};
use simple_dns::{Packet, PacketFlag, ResourceRecord, CLASS, QTYPE, TYPE};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use dweb_core::config::MdnsConfig;

pub const MDNS_ADDR: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);
pub const MDNS_PORT: u16 = 5353;

/// IPv4 addresses of every interface that is up and not loopback.
pub fn external_ipv4() -> Result<Vec<Ipv4Addr>> {
    let mut addrs = Vec::new();
    for ifa in nix::ifaddrs::getifaddrs().context("getifaddrs()")? {
        if ifa.flags.contains(InterfaceFlags::IFF_LOOPBACK)
            || !ifa.flags.contains(InterfaceFlags::IFF_UP)
        {
            continue;
        }
        let Some(sin) = ifa.address.as_ref().and_then(|a| a.as_sockaddr_in()) else {
            continue;
        };
        let ip = Ipv4Addr::from(sin.ip());
        if !ip.is_loopback() && !addrs.contains(&ip) {
            addrs.push(ip);
        }
    }
    Ok(addrs)
}

/// Encoded reply to one received packet, or `None` if nothing in it is ours.
///
/// Every A question whose name ends in `.<host>` gets one record per address.
/// Records carry the cache-flush bit since we are the only owner of the name.
pub fn answer(packet: &[u8], host: &str, ttl: u32, addrs: &[Ipv4Addr]) -> Option<Vec<u8>> {
    if addrs.is_empty() {
        return None;
    }
    let query = Packet::parse(packet).ok()?;
    if query.has_flags(PacketFlag::RESPONSE) {
        return None;
    }

    let suffix = format!(".{}", normalize(host));
    // Multicast responses carry id 0.
    let mut reply = Packet::new_reply(0);
    reply.set_flags(PacketFlag::AUTHORITATIVE_ANSWER);

    for question in &query.questions {
        if question.qtype != QTYPE::TYPE(TYPE::A) {
            continue;
        }
        if !normalize(&question.qname.to_string()).ends_with(&suffix) {
            continue;
        }
        for ip in addrs {
            let mut record = ResourceRecord::new(
                question.qname.clone(),
                CLASS::IN,
                ttl,
                RData::A(A {
                    address: u32::from(*ip),
                }),
            );
            record.cache_flush = true;
            reply.answers.push(record);
        }
    }

    if reply.answers.is_empty() {
        return None;
    }
    match reply.build_bytes_vec() {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::warn!(error = %e, "failed to encode mDNS reply");
            None
        }
    }
}

fn normalize(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

/// Answer queries on 224.0.0.251:5353 until `cancel` fires.
pub async fn serve(config: MdnsConfig, addrs: Vec<Ipv4Addr>, cancel: CancellationToken) -> Result<()> {
    let socket = make_socket().context("failed to create mDNS socket")?;
    let socket = UdpSocket::from_std(socket).context("failed to convert to tokio UdpSocket")?;
    let group = SocketAddrV4::new(MDNS_ADDR, MDNS_PORT);
    let mut buf = vec![0u8; 9000];

    tracing::info!(host = %config.host, addrs = ?addrs, "mDNS responder starting");

    loop {
        let (len, from) = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("mDNS responder stopped");
                return Ok(());
            }
            r = socket.recv_from(&mut buf) => match r {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(error = %e, "mDNS recv_from failed");
                    continue;
                }
            },
        };

        let Some(reply) = answer(&buf[..len], &config.host, config.ttl, &addrs) else {
            continue;
        };
        tracing::debug!(%from, bytes = reply.len(), "answering mDNS query");
        if let Err(e) = socket.send_to(&reply, group).await {
            tracing::warn!(error = %e, "mDNS send_to failed");
        }
    }
}

/// UDP socket bound to the mDNS port and joined to the IPv4 group. Shares
/// the port with any other responder on the host.
fn make_socket() -> Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).context("socket()")?;

    socket.set_reuse_address(true).context("SO_REUSEADDR")?;
    #[cfg(unix)]
    socket.set_reuse_port(true).context("SO_REUSEPORT")?;
    socket.set_nonblocking(true).context("set_nonblocking")?;

    let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, MDNS_PORT);
    socket.bind(&bind_addr.into()).context("bind()")?;
    socket
        .join_multicast_v4(&MDNS_ADDR, &Ipv4Addr::UNSPECIFIED)
        .context("IP_ADD_MEMBERSHIP")?;
    socket.set_multicast_loop_v4(true).context("IP_MULTICAST_LOOP")?;

    Ok(socket.into())
}
