use crate::errors::ProbeError;
use compact_str::CompactString;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Maximum length of a domain name in presentation format.
const MAX_NAME_LEN: usize = 253;

/// Maximum length of a single label.
const MAX_LABEL_LEN: usize = 63;

/// A validated DNS domain name.
///
/// Stored without the trailing root dot, original case preserved. Equality
/// and hashing are ASCII case-insensitive, matching how names compare on
/// the wire.
#[derive(Debug, Clone, Eq)]
pub struct DomainName(CompactString);

impl DomainName {
    pub fn new(name: &str) -> Result<Self, ProbeError> {
        let name = name.strip_suffix('.').unwrap_or(name);

        if name.is_empty() {
            return Err(ProbeError::InvalidDomainName("empty name".into()));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(ProbeError::InvalidDomainName(format!(
                "name exceeds {} octets: {}",
                MAX_NAME_LEN, name
            )));
        }
        for label in name.split('.') {
            if label.is_empty() {
                return Err(ProbeError::InvalidDomainName(format!(
                    "empty label in: {}",
                    name
                )));
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(ProbeError::InvalidDomainName(format!(
                    "label exceeds {} octets in: {}",
                    MAX_LABEL_LEN, name
                )));
            }
        }

        Ok(Self(CompactString::from(name)))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Labels in order, root excluded.
    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.split('.')
    }
}

impl PartialEq for DomainName {
    #[inline]
    fn eq(&self, other: &DomainName) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Hash for DomainName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.0.as_bytes() {
            b.to_ascii_lowercase().hash(state);
        }
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainName {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
