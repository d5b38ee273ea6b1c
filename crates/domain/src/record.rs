use crate::errors::ProbeError;
use crate::key::{DnsClass, RecordKey, RecordType};
use crate::name::DomainName;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Maximum length of a single TXT character-string.
const MAX_TXT_STRING_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    A(Ipv4Addr),
    AAAA(Ipv6Addr),
    PTR(DomainName),
    SRV {
        priority: u16,
        weight: u16,
        port: u16,
        target: DomainName,
    },
    TXT(Vec<String>),
}

impl RecordData {
    pub fn record_type(&self) -> RecordType {
        match self {
            RecordData::A(_) => RecordType::A,
            RecordData::AAAA(_) => RecordType::AAAA,
            RecordData::PTR(_) => RecordType::PTR,
            RecordData::SRV { .. } => RecordType::SRV,
            RecordData::TXT(_) => RecordType::TXT,
        }
    }
}

/// A concrete resource record proposed for ownership on the local segment.
///
/// The key's type is always derived from the payload, so a record can never
/// carry a wildcard key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRecord {
    key: RecordKey,
    data: RecordData,
    ttl: u32,
}

impl ProbeRecord {
    pub fn new(
        name: DomainName,
        class: DnsClass,
        ttl: u32,
        data: RecordData,
    ) -> Result<Self, ProbeError> {
        if let RecordData::TXT(strings) = &data {
            for s in strings {
                if s.len() > MAX_TXT_STRING_LEN {
                    return Err(ProbeError::InvalidRecordData(format!(
                        "TXT string exceeds {} octets",
                        MAX_TXT_STRING_LEN
                    )));
                }
            }
        }

        let key = RecordKey::new(name, class, data.record_type());
        Ok(Self { key, data, ttl })
    }

    #[inline]
    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    #[inline]
    pub fn data(&self) -> &RecordData {
        &self.data
    }

    #[inline]
    pub fn ttl(&self) -> u32 {
        self.ttl
    }
}

impl fmt::Display for ProbeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (ttl {})", self.key, self.ttl)
    }
}
