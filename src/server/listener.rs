use std::io::ErrorKind;
use std::net::{SocketAddr, SocketAddrV4};

use mio::Registry;
use mio::net::TcpListener;

use crate::config::Tuning;
use crate::connection::ConnectionTable;

/// Accepts connections until none are pending.
///
/// Returns the number of connections added to the table. Connections that
/// don't fit, or whose peer has no IPv4 address, are closed immediately.
pub fn accept_pending(
    listener: &TcpListener,
    table: &mut ConnectionTable,
    registry: &Registry,
    tuning: &Tuning,
) -> usize {
    let mut accepted = 0;

    loop {
        let (stream, peer) = match listener.accept() {
            Ok(pair) => pair,
            Err(e) if e.kind() == ErrorKind::WouldBlock => break,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::error!(error = %e, "Accept failed");
                break;
            }
        };

        let Some(peer_v4) = ipv4_peer(peer) else {
            tracing::warn!(%peer, "Rejected connection without an IPv4 address");
            continue;
        };

        if table.is_full() {
            tracing::warn!(%peer, open = table.len(), "Connection table full, rejecting");
            continue;
        }

        match table.insert(registry, stream, peer_v4, tuning) {
            Ok(slot) => {
                tracing::info!(slot, %peer, open = table.len(), "Accepted connection");
                accepted += 1;
            }
            Err(e) => tracing::error!(%peer, error = %e, "Failed to register connection"),
        }
    }

    accepted
}

/// Envelopes carry 4 address bytes, so only IPv4 (or IPv4-mapped) peers fit.
fn ipv4_peer(peer: SocketAddr) -> Option<SocketAddrV4> {
    match peer {
        SocketAddr::V4(v4) => Some(v4),
        SocketAddr::V6(v6) => v6
            .ip()
            .to_ipv4_mapped()
            .map(|ip| SocketAddrV4::new(ip, v6.port())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr, SocketAddrV6};

    #[test]
    fn mapped_v6_peer_becomes_v4() {
        let mapped = Ipv4Addr::new(10, 1, 2, 3).to_ipv6_mapped();
        let peer = SocketAddr::V6(SocketAddrV6::new(mapped, 4242, 0, 0));

        assert_eq!(ipv4_peer(peer), Some(SocketAddrV4::new(Ipv4Addr::new(10, 1, 2, 3), 4242)));
    }

    #[test]
    fn native_v6_peer_is_rejected() {
        let peer = SocketAddr::V6(SocketAddrV6::new(Ipv6Addr::LOCALHOST, 4242, 0, 0));

        assert_eq!(ipv4_peer(peer), None);
    }
}
