//! Lookup backends.

use super::DnsError;
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::proto::rr::{RData, RecordType};
use hickory_resolver::{Name, Resolver};
use std::net::IpAddr;

/// Something able to answer a single DNS question.
///
/// Returning an empty list means "no such record"; `Dns` turns it into
/// `DnsError::NotFound`.
pub trait Lookup {
    fn lookup(&self, name: &Name, record_type: RecordType) -> Result<Vec<RData>, DnsError>;
}

/// Blocking `hickory-resolver` backend.
pub struct HickoryLookup {
    resolver: Resolver,
}

impl std::fmt::Debug for HickoryLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HickoryLookup").finish_non_exhaustive()
    }
}

impl HickoryLookup {
    /// Read nameservers and options from the host configuration (resolv.conf).
    pub fn from_system_conf() -> Result<Self, DnsError> {
        let resolver = Resolver::from_system_conf().map_err(DnsError::Setup)?;
        Ok(Self { resolver })
    }

    /// Query only `addresses`, on `port` (53 when `None`).
    pub fn with_nameservers(addresses: &[IpAddr], port: Option<u16>) -> Result<Self, DnsError> {
        let group = NameServerConfigGroup::from_ips_clear(addresses, port.unwrap_or(53), true);
        let config = ResolverConfig::from_parts(None, vec![], group);
        let resolver = Resolver::new(config, ResolverOpts::default()).map_err(DnsError::Setup)?;
        Ok(Self { resolver })
    }
}

impl Lookup for HickoryLookup {
    fn lookup(&self, name: &Name, record_type: RecordType) -> Result<Vec<RData>, DnsError> {
        match self.resolver.lookup(name.clone(), record_type) {
            Ok(answer) => Ok(answer.iter().cloned().collect()),
            // NXDOMAIN and NOERROR without answers both land here.
            Err(e) if matches!(e.kind(), ResolveErrorKind::NoRecordsFound { .. }) => Ok(Vec::new()),
            Err(e) => Err(DnsError::Resolve {
                record_type: record_type.to_string(),
                name: name.to_string(),
                source: e,
            }),
        }
    }
}
