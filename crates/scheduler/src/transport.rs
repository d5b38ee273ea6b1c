//! UDP multicast transmit path.
//!
//! Probes are sent to the well-known multicast group; the socket is
//! configured through `socket2` before being handed to tokio.

use crate::ports::PacketTransmit;
use async_trait::async_trait;
use multicast_probe_domain::{ProbeError, TransportConfig};
use multicast_probe_wire::ProbePacket;
use std::net::{IpAddr, SocketAddr};
use tokio::net::UdpSocket;
use tracing::debug;

/// Per-packet overhead reserved for the IP and UDP headers when deriving
/// the payload budget from the link MTU.
const PACKET_OVERHEAD: usize = 48;

/// Sends probe packets to the multicast group of one interface.
pub struct MulticastTransport {
    socket: UdpSocket,
    group: SocketAddr,
    mtu: usize,
}

impl MulticastTransport {
    /// Must be called from within a tokio runtime.
    pub fn new(config: &TransportConfig) -> Result<Self, ProbeError> {
        let group: SocketAddr = config.multicast_group.parse().map_err(|_| {
            ProbeError::ConfigError(format!(
                "invalid multicast group: {}",
                config.multicast_group
            ))
        })?;
        let socket = create_socket(&group, config)?;

        Ok(Self {
            socket,
            group,
            mtu: config.mtu,
        })
    }

    fn payload_budget(mtu: usize) -> usize {
        mtu.saturating_sub(PACKET_OVERHEAD)
    }
}

fn create_socket(group: &SocketAddr, config: &TransportConfig) -> Result<UdpSocket, ProbeError> {
    use socket2::{Domain, Protocol, Socket, Type};

    let domain = if group.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP)).map_err(io_error)?;
    socket.set_reuse_address(true).map_err(io_error)?;

    let bind_addr: SocketAddr = match &config.bind_address {
        Some(address) => address.parse().map_err(|_| {
            ProbeError::ConfigError(format!("invalid bind address: {}", address))
        })?,
        None => {
            if group.is_ipv4() {
                "0.0.0.0:0".parse().unwrap()
            } else {
                "[::]:0".parse().unwrap()
            }
        }
    };

    if group.is_ipv4() {
        socket
            .set_multicast_ttl_v4(config.hop_limit)
            .map_err(io_error)?;
        socket
            .set_multicast_loop_v4(config.loopback)
            .map_err(io_error)?;
        // an explicit local address also selects the outgoing interface
        if let IpAddr::V4(local) = bind_addr.ip() {
            if !local.is_unspecified() {
                socket.set_multicast_if_v4(&local).map_err(io_error)?;
            }
        }
    } else {
        socket
            .set_multicast_hops_v6(config.hop_limit)
            .map_err(io_error)?;
        socket
            .set_multicast_loop_v6(config.loopback)
            .map_err(io_error)?;
    }

    socket.bind(&bind_addr.into()).map_err(io_error)?;
    socket.set_nonblocking(true).map_err(io_error)?;

    UdpSocket::from_std(socket.into()).map_err(io_error)
}

fn io_error(e: std::io::Error) -> ProbeError {
    ProbeError::IoError(e.to_string())
}

#[async_trait]
impl PacketTransmit for MulticastTransport {
    fn mtu(&self) -> usize {
        Self::payload_budget(self.mtu)
    }

    async fn send(&self, packet: ProbePacket) -> Result<(), ProbeError> {
        let bytes = packet.into_bytes();
        let bytes_sent = self
            .socket
            .send_to(&bytes, self.group)
            .await
            .map_err(io_error)?;

        debug!(
            group = %self.group,
            bytes_sent = bytes_sent,
            "probe packet sent"
        );
        Ok(())
    }
}
