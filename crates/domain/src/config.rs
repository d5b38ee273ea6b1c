use serde::{Deserialize, Serialize};

/// Scheduling parameters for outgoing probes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProbeConfig {
    /// How long a non-immediate probe is deferred before delivery, giving
    /// near-simultaneous probes a chance to share one packet.
    #[serde(default = "default_defer_millis")]
    pub defer_millis: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            defer_millis: default_defer_millis(),
        }
    }
}

fn default_defer_millis() -> u64 {
    70
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportConfig {
    /// Multicast group probes are sent to.
    #[serde(default = "default_multicast_group")]
    pub multicast_group: String,

    /// Local address to bind the sending socket to. An explicit IPv4
    /// address also selects the outgoing interface for multicast.
    #[serde(default)]
    pub bind_address: Option<String>,

    /// Link MTU of the bound interface, in bytes.
    #[serde(default = "default_mtu")]
    pub mtu: usize,

    /// Multicast TTL / hop limit. Link-local protocols use 255.
    #[serde(default = "default_hop_limit")]
    pub hop_limit: u32,

    /// Whether sent packets loop back to the local host.
    #[serde(default = "default_false")]
    pub loopback: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            multicast_group: default_multicast_group(),
            bind_address: None,
            mtu: default_mtu(),
            hop_limit: default_hop_limit(),
            loopback: default_false(),
        }
    }
}

fn default_multicast_group() -> String {
    "224.0.0.251:5353".to_string()
}

fn default_mtu() -> usize {
    1500
}

fn default_hop_limit() -> u32 {
    255
}

fn default_false() -> bool {
    false
}
