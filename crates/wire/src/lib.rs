//! Wire codec for outgoing probe packets.
//!
//! Builds DNS query packets incrementally against a fixed size budget. The
//! scheduler reserves space with the conservative [`EstimateSize`] figures
//! and the append operations re-check the exact encoded size, so a full
//! packet is reported by a `false` return instead of a partial write.
pub mod packet;
pub mod size;

pub use packet::ProbePacket;
pub use size::EstimateSize;

/// Fixed DNS header size in octets.
pub const DNS_PACKET_HEADER_SIZE: usize = 12;

/// Absolute ceiling for one packet, including the header. Larger payloads
/// cannot be sent at all.
pub const DNS_PACKET_MAX_SIZE: usize = 9000;
