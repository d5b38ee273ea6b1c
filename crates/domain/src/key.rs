use crate::name::DomainName;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DnsClass {
    IN,
    ANY,
}

impl DnsClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DnsClass::IN => "IN",
            DnsClass::ANY => "ANY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    A,
    AAAA,
    PTR,
    SRV,
    TXT,
    ANY,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::AAAA => "AAAA",
            RecordType::PTR => "PTR",
            RecordType::SRV => "SRV",
            RecordType::TXT => "TXT",
            RecordType::ANY => "ANY",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "A" => Some(RecordType::A),
            "AAAA" => Some(RecordType::AAAA),
            "PTR" => Some(RecordType::PTR),
            "SRV" => Some(RecordType::SRV),
            "TXT" => Some(RecordType::TXT),
            "ANY" => Some(RecordType::ANY),
            _ => None,
        }
    }
}

/// The (name, class, type) identity of a resource record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    name: DomainName,
    class: DnsClass,
    record_type: RecordType,
}

impl RecordKey {
    pub fn new(name: DomainName, class: DnsClass, record_type: RecordType) -> Self {
        Self {
            name,
            class,
            record_type,
        }
    }

    #[inline]
    pub fn name(&self) -> &DomainName {
        &self.name
    }

    #[inline]
    pub fn class(&self) -> DnsClass {
        self.class
    }

    #[inline]
    pub fn record_type(&self) -> RecordType {
        self.record_type
    }

    /// A key with an ANY type or class matches record sets rather than one
    /// concrete record. Pattern keys appear in questions only.
    pub fn is_wildcard(&self) -> bool {
        self.record_type == RecordType::ANY || self.class == DnsClass::ANY
    }

    /// The ANY-type query key for this key's name and class.
    pub fn to_any(&self) -> RecordKey {
        RecordKey {
            name: self.name.clone(),
            class: self.class,
            record_type: RecordType::ANY,
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.name,
            self.class.as_str(),
            self.record_type.as_str()
        )
    }
}
