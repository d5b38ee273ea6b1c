use multicast_probe_domain::{ProbeRecord, RecordData, RecordKey};

/// Conservative wire-size reservation for packet assembly.
///
/// The figures assume an uncompressed name and ignore the exact label
/// layout, so they can be off by a few octets in either direction. Packet
/// assembly treats them as reservations only; the appends themselves
/// re-check against the real encoding.
pub trait EstimateSize {
    fn estimate_size(&self) -> usize;
}

impl EstimateSize for RecordKey {
    /// Name plus type and class.
    fn estimate_size(&self) -> usize {
        self.name().as_str().len() + 1 + 4
    }
}

impl EstimateSize for ProbeRecord {
    /// Name plus type, class, TTL and rdata length, plus the rdata itself.
    fn estimate_size(&self) -> usize {
        self.key().name().as_str().len() + 1 + 10 + rdata_wire_len(self.data())
    }
}

/// Exact encoded length of a record's rdata. Names inside rdata are never
/// compressed, so this does not depend on packet state.
pub(crate) fn rdata_wire_len(data: &RecordData) -> usize {
    match data {
        RecordData::A(_) => 4,
        RecordData::AAAA(_) => 16,
        RecordData::PTR(target) => target.as_str().len() + 2,
        RecordData::SRV { target, .. } => 6 + target.as_str().len() + 2,
        RecordData::TXT(strings) => {
            if strings.is_empty() {
                // an empty TXT is a single zero-length character-string
                1
            } else {
                strings.iter().map(|s| 1 + s.len()).sum()
            }
        }
    }
}
