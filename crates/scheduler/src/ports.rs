use async_trait::async_trait;
use multicast_probe_domain::ProbeError;
use multicast_probe_wire::ProbePacket;

/// Outgoing packet path of one network interface.
#[async_trait]
pub trait PacketTransmit: Send + Sync {
    /// Usable DNS payload budget for one packet on this interface,
    /// including the DNS header.
    fn mtu(&self) -> usize;

    /// Hands the packet over for transmission. The scheduler treats the
    /// send as fire-and-forget; failures are logged, never retried.
    async fn send(&self, packet: ProbePacket) -> Result<(), ProbeError>;
}
