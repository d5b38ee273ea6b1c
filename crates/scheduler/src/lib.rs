//! Probe scheduling for multicast name claiming.
//!
//! Before a host may claim a resource record on the local segment it
//! queries the network for existing owners. This crate batches those
//! probe queries, defers them briefly so related probes share a packet,
//! and packs them onto the wire within the interface's size budget.
mod job;
mod queue;

pub mod ports;
pub mod scheduler;
pub mod transport;

pub use ports::PacketTransmit;
pub use scheduler::ProbeScheduler;
pub use transport::MulticastTransport;
