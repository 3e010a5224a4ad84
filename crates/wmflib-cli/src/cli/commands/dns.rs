//! `wmflib dns` – resolve names and addresses.

use anyhow::Result;
use clap::ValueEnum;
use std::net::IpAddr;
use wmflib::dns::{Dns, DnsError};
use wmflib::retry::retry;
use wmflib::settings::WmflibConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RecordKind {
    /// IPv4 addresses.
    A,
    /// IPv6 addresses.
    Aaaa,
    /// IPv4 and IPv6 addresses.
    Ips,
    /// Reverse lookup of an address.
    Ptr,
    /// Canonical name.
    Cname,
}

pub fn run_dns(
    cfg: &WmflibConfig,
    query: &str,
    record: RecordKind,
    nameservers: &[IpAddr],
    public: bool,
) -> Result<()> {
    let dns = if public {
        Dns::public_authdns()?
    } else if nameservers.is_empty() {
        Dns::new()?
    } else {
        Dns::with_nameservers(nameservers, None)?
    };

    // Only resolver failures are worth another try; NXDOMAIN is an answer.
    let policy = cfg
        .retry_config()
        .builder::<DnsError>()?
        .failure_message(format!("DNS lookup of {query} failed"))
        .retry_on(DnsError::is_transient)
        .build()?;

    let answers = retry(&policy, || match record {
        RecordKind::A => dns.resolve_ipv4(query),
        RecordKind::Aaaa => dns.resolve_ipv6(query),
        RecordKind::Ips => dns.resolve_ips(query),
        RecordKind::Ptr => dns.resolve_ptr(query),
        RecordKind::Cname => dns.resolve_cname(query).map(|name| vec![name]),
    })?;

    for answer in answers {
        println!("{answer}");
    }
    Ok(())
}
