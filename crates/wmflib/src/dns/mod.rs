//! DNS lookups.
//!
//! `Dns` answers the handful of questions operational scripts ask (addresses,
//! PTR, CNAME) on top of a [`Lookup`] backend. The default backend is the
//! blocking `hickory-resolver` client, configured either from the host's
//! resolv.conf or from an explicit list of nameservers.

mod lookup;

pub use lookup::{HickoryLookup, Lookup};

use crate::constants::PUBLIC_AUTHDNS;
use hickory_resolver::proto::rr::{RData, RecordType};
use hickory_resolver::Name;
use std::net::IpAddr;

#[derive(Debug, thiserror::Error)]
pub enum DnsError {
    /// The name has no record of the requested type (NXDOMAIN or empty answer).
    #[error("Record {record_type} not found for {name}")]
    NotFound { record_type: String, name: String },

    #[error("Unable to resolve {record_type} record for {name}")]
    Resolve {
        record_type: String,
        name: String,
        #[source]
        source: hickory_resolver::error::ResolveError,
    },

    #[error("Found multiple CNAMEs target for {name}: {targets:?}")]
    MultipleTargets { name: String, targets: Vec<String> },

    #[error("Unsupported relative target {0} found")]
    RelativeTarget(String),

    #[error("invalid name or address: {0}")]
    InvalidName(String),

    #[error("unable to set up the DNS resolver")]
    Setup(#[source] std::io::Error),
}

impl DnsError {
    /// True for failures that may go away on a second try (timeouts, SERVFAIL...).
    pub fn is_transient(&self) -> bool {
        matches!(self, DnsError::Resolve { .. })
    }
}

/// DNS client.
#[derive(Debug)]
pub struct Dns<L = HickoryLookup> {
    lookup: L,
}

impl Dns<HickoryLookup> {
    /// Use the host's resolver configuration.
    pub fn new() -> Result<Self, DnsError> {
        Ok(Self::from_lookup(HickoryLookup::from_system_conf()?))
    }

    /// Use the given nameservers, on `port` (53 when `None`).
    pub fn with_nameservers(addresses: &[IpAddr], port: Option<u16>) -> Result<Self, DnsError> {
        Ok(Self::from_lookup(HickoryLookup::with_nameservers(addresses, port)?))
    }

    /// Use the WMF public authoritative nameservers.
    pub fn public_authdns() -> Result<Self, DnsError> {
        let addresses = PUBLIC_AUTHDNS
            .iter()
            .map(|a| a.parse().map_err(|_| DnsError::InvalidName(a.to_string())))
            .collect::<Result<Vec<IpAddr>, _>>()?;
        Self::with_nameservers(&addresses, None)
    }
}

impl<L: Lookup> Dns<L> {
    pub fn from_lookup(lookup: L) -> Self {
        Self { lookup }
    }

    /// A records for `name`, as strings.
    pub fn resolve_ipv4(&self, name: &str) -> Result<Vec<String>, DnsError> {
        self.resolve_addresses(name, RecordType::A)
    }

    /// AAAA records for `name`, as strings.
    pub fn resolve_ipv6(&self, name: &str) -> Result<Vec<String>, DnsError> {
        self.resolve_addresses(name, RecordType::AAAA)
    }

    /// A and AAAA records for `name`. Single-stack names are fine; only when
    /// both families are missing is `NotFound` returned.
    pub fn resolve_ips(&self, name: &str) -> Result<Vec<String>, DnsError> {
        let mut addresses = Vec::new();
        for record_type in [RecordType::A, RecordType::AAAA] {
            match self.resolve_addresses(name, record_type) {
                Ok(found) => addresses.extend(found),
                Err(DnsError::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        if addresses.is_empty() {
            return Err(DnsError::NotFound {
                record_type: "A or AAAA".to_string(),
                name: name.to_string(),
            });
        }
        Ok(addresses)
    }

    /// PTR targets for an IPv4 or IPv6 address, without the trailing dot.
    pub fn resolve_ptr(&self, address: &str) -> Result<Vec<String>, DnsError> {
        let ip: IpAddr = address
            .parse()
            .map_err(|_| DnsError::InvalidName(address.to_string()))?;
        let records = self.lookup_name(Name::from(ip), RecordType::PTR)?;
        parse_targets(&records)
    }

    /// The single CNAME target of `name`, without the trailing dot.
    pub fn resolve_cname(&self, name: &str) -> Result<String, DnsError> {
        let records = self.resolve(name, RecordType::CNAME)?;
        let mut targets = parse_targets(&records)?;
        if targets.len() != 1 {
            return Err(DnsError::MultipleTargets {
                name: name.to_string(),
                targets,
            });
        }
        Ok(targets.remove(0))
    }

    /// Raw records of `record_type` for `name`.
    pub fn resolve(&self, name: &str, record_type: RecordType) -> Result<Vec<RData>, DnsError> {
        let qname = Name::from_utf8(name).map_err(|_| DnsError::InvalidName(name.to_string()))?;
        self.lookup_name(qname, record_type)
    }

    fn lookup_name(&self, name: Name, record_type: RecordType) -> Result<Vec<RData>, DnsError> {
        // Answers reached through an alias also carry the CNAME chain.
        let records: Vec<RData> = self
            .lookup
            .lookup(&name, record_type)?
            .into_iter()
            .filter(|rdata| rdata.record_type() == record_type)
            .collect();
        if records.is_empty() {
            return Err(DnsError::NotFound {
                record_type: record_type.to_string(),
                name: name.to_string(),
            });
        }
        tracing::debug!("Resolved {} record for {}: {:?}", record_type, name, records);
        Ok(records)
    }

    fn resolve_addresses(&self, name: &str, record_type: RecordType) -> Result<Vec<String>, DnsError> {
        let records = self.resolve(name, record_type)?;
        Ok(records
            .iter()
            .filter_map(|rdata| match rdata {
                RData::A(a) => Some(a.0.to_string()),
                RData::AAAA(aaaa) => Some(aaaa.0.to_string()),
                _ => None,
            })
            .collect())
    }
}

/// Absolute target names of PTR/CNAME records, trailing dot removed.
fn parse_targets(records: &[RData]) -> Result<Vec<String>, DnsError> {
    let mut targets = Vec::new();
    for rdata in records {
        let target = match rdata {
            RData::PTR(ptr) => ptr.0.to_utf8(),
            RData::CNAME(cname) => cname.0.to_utf8(),
            _ => continue,
        };
        match target.strip_suffix('.') {
            Some(absolute) => targets.push(absolute.to_string()),
            None => return Err(DnsError::RelativeTarget(target)),
        }
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_resolver::proto::rr::rdata::{A, AAAA, CNAME, PTR};
    use std::collections::HashMap;
    use std::net::{Ipv4Addr, Ipv6Addr};

    /// Canned answers keyed by (name, type); missing keys are NXDOMAIN.
    #[derive(Default)]
    struct FakeLookup {
        answers: HashMap<(String, RecordType), Vec<RData>>,
    }

    impl FakeLookup {
        fn with(mut self, name: &str, record_type: RecordType, records: Vec<RData>) -> Self {
            self.answers.insert((name.to_string(), record_type), records);
            self
        }
    }

    impl Lookup for FakeLookup {
        fn lookup(&self, name: &Name, record_type: RecordType) -> Result<Vec<RData>, DnsError> {
            Ok(self
                .answers
                .get(&(name.to_string(), record_type))
                .cloned()
                .unwrap_or_default())
        }
    }

    fn name(s: &str) -> Name {
        Name::from_ascii(s).unwrap()
    }

    fn v4(s: &str) -> RData {
        RData::A(A(s.parse::<Ipv4Addr>().unwrap()))
    }

    fn v6(s: &str) -> RData {
        RData::AAAA(AAAA(s.parse::<Ipv6Addr>().unwrap()))
    }

    #[test]
    fn ipv4_addresses_are_returned() {
        let dns = Dns::from_lookup(FakeLookup::default().with(
            "host1001.example.org",
            RecordType::A,
            vec![v4("10.0.0.1"), v4("10.0.0.2")],
        ));
        assert_eq!(
            dns.resolve_ipv4("host1001.example.org").unwrap(),
            vec!["10.0.0.1", "10.0.0.2"]
        );
    }

    #[test]
    fn missing_record_is_not_found() {
        let dns = Dns::from_lookup(FakeLookup::default());
        let err = dns.resolve_ipv6("nothing.example.org").unwrap_err();
        assert!(matches!(err, DnsError::NotFound { .. }));
        assert_eq!(err.to_string(), "Record AAAA not found for nothing.example.org");
        assert!(!err.is_transient());
    }

    #[test]
    fn ips_combine_both_families() {
        let dns = Dns::from_lookup(
            FakeLookup::default()
                .with("dual.example.org", RecordType::A, vec![v4("10.0.0.1")])
                .with("dual.example.org", RecordType::AAAA, vec![v6("2001:db8::1")]),
        );
        assert_eq!(
            dns.resolve_ips("dual.example.org").unwrap(),
            vec!["10.0.0.1", "2001:db8::1"]
        );
    }

    #[test]
    fn ips_accept_single_stack() {
        let dns = Dns::from_lookup(FakeLookup::default().with(
            "v6only.example.org",
            RecordType::AAAA,
            vec![v6("2001:db8::2")],
        ));
        assert_eq!(dns.resolve_ips("v6only.example.org").unwrap(), vec!["2001:db8::2"]);
    }

    #[test]
    fn ips_without_any_address_is_not_found() {
        let dns = Dns::from_lookup(FakeLookup::default());
        let err = dns.resolve_ips("nothing.example.org").unwrap_err();
        assert_eq!(err.to_string(), "Record A or AAAA not found for nothing.example.org");
    }

    #[test]
    fn ptr_targets_lose_trailing_dot() {
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        let dns = Dns::from_lookup(FakeLookup::default().with(
            &Name::from(ip).to_string(),
            RecordType::PTR,
            vec![RData::PTR(PTR(name("host1001.example.org.")))],
        ));
        assert_eq!(dns.resolve_ptr("10.0.0.1").unwrap(), vec!["host1001.example.org"]);
    }

    #[test]
    fn ptr_through_classless_delegation_skips_the_alias() {
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        let dns = Dns::from_lookup(FakeLookup::default().with(
            &Name::from(ip).to_string(),
            RecordType::PTR,
            vec![
                RData::CNAME(CNAME(name("1.0-25.0.0.10.in-addr.arpa."))),
                RData::PTR(PTR(name("host1001.example.org."))),
            ],
        ));
        assert_eq!(dns.resolve_ptr("10.0.0.1").unwrap(), vec!["host1001.example.org"]);
    }

    #[test]
    fn alias_without_addresses_is_not_found() {
        let dns = Dns::from_lookup(FakeLookup::default().with(
            "alias.example.org",
            RecordType::A,
            vec![RData::CNAME(CNAME(name("target.example.org.")))],
        ));
        let err = dns.resolve_ipv4("alias.example.org").unwrap_err();
        assert!(matches!(err, DnsError::NotFound { .. }));
        assert_eq!(err.to_string(), "Record A not found for alias.example.org");
    }

    #[test]
    fn raw_resolve_keeps_only_the_requested_type() {
        let dns = Dns::from_lookup(FakeLookup::default().with(
            "alias.example.org",
            RecordType::A,
            vec![
                RData::CNAME(CNAME(name("target.example.org."))),
                v4("10.0.0.5"),
            ],
        ));
        assert_eq!(
            dns.resolve("alias.example.org", RecordType::A).unwrap(),
            vec![v4("10.0.0.5")]
        );
    }

    #[test]
    fn ptr_of_garbage_is_rejected() {
        let dns = Dns::from_lookup(FakeLookup::default());
        assert!(matches!(
            dns.resolve_ptr("not-an-ip"),
            Err(DnsError::InvalidName(_))
        ));
    }

    #[test]
    fn cname_returns_the_single_target() {
        let dns = Dns::from_lookup(FakeLookup::default().with(
            "puppet.example.org",
            RecordType::CNAME,
            vec![RData::CNAME(CNAME(name("puppetserver1001.example.org.")))],
        ));
        assert_eq!(
            dns.resolve_cname("puppet.example.org").unwrap(),
            "puppetserver1001.example.org"
        );
    }

    #[test]
    fn multiple_cname_targets_are_an_error() {
        let dns = Dns::from_lookup(FakeLookup::default().with(
            "alias.example.org",
            RecordType::CNAME,
            vec![
                RData::CNAME(CNAME(name("a.example.org."))),
                RData::CNAME(CNAME(name("b.example.org."))),
            ],
        ));
        assert!(matches!(
            dns.resolve_cname("alias.example.org"),
            Err(DnsError::MultipleTargets { .. })
        ));
    }

    #[test]
    fn relative_targets_are_rejected() {
        let dns = Dns::from_lookup(FakeLookup::default().with(
            "alias.example.org",
            RecordType::CNAME,
            vec![RData::CNAME(CNAME(name("relative")))],
        ));
        assert!(matches!(
            dns.resolve_cname("alias.example.org"),
            Err(DnsError::RelativeTarget(t)) if t == "relative"
        ));
    }
}
