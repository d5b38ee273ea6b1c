use multicast_probe_domain::{DomainName, ProbeError};
use std::str::FromStr;

#[test]
fn test_valid_name() {
    let name = DomainName::new("printer.local").unwrap();
    assert_eq!(name.as_str(), "printer.local");
    assert_eq!(name.labels().collect::<Vec<_>>(), vec!["printer", "local"]);
}

#[test]
fn test_trailing_root_dot_is_stripped() {
    let name = DomainName::new("printer.local.").unwrap();
    assert_eq!(name.as_str(), "printer.local");
}

#[test]
fn test_equality_is_case_insensitive() {
    let a = DomainName::new("Printer.Local").unwrap();
    let b = DomainName::new("printer.local").unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_hash_agrees_with_equality() {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let hash = |name: &DomainName| {
        let mut h = DefaultHasher::new();
        name.hash(&mut h);
        h.finish()
    };

    let a = DomainName::new("Printer.Local").unwrap();
    let b = DomainName::new("printer.local").unwrap();
    assert_eq!(hash(&a), hash(&b));
}

#[test]
fn test_empty_name_rejected() {
    assert!(matches!(
        DomainName::new(""),
        Err(ProbeError::InvalidDomainName(_))
    ));
    assert!(matches!(
        DomainName::new("."),
        Err(ProbeError::InvalidDomainName(_))
    ));
}

#[test]
fn test_empty_label_rejected() {
    assert!(DomainName::new("printer..local").is_err());
}

#[test]
fn test_oversized_label_rejected() {
    let label = "a".repeat(64);
    assert!(DomainName::new(&format!("{}.local", label)).is_err());

    let label = "a".repeat(63);
    assert!(DomainName::new(&format!("{}.local", label)).is_ok());
}

#[test]
fn test_oversized_name_rejected() {
    let long = format!("{}.{}.{}.{}.local", "a".repeat(63), "b".repeat(63), "c".repeat(63), "d".repeat(63));
    assert!(DomainName::new(&long).is_err());
}

#[test]
fn test_from_str() {
    let name = DomainName::from_str("host.local").unwrap();
    assert_eq!(name.as_str(), "host.local");
}
