//! Static facts about the WMF infrastructure.

/// All WMF datacenters.
pub const ALL_DATACENTERS: [&str; 6] = ["eqiad", "codfw", "esams", "ulsfo", "eqsin", "drmrs"];

/// WMF core datacenters.
pub const CORE_DATACENTERS: [&str; 2] = ["eqiad", "codfw"];

/// Publicly authoritative DNS servers for the WMF domains.
pub const PUBLIC_AUTHDNS: [&str; 3] = ["208.80.154.238", "208.80.153.231", "91.198.174.239"];

/// Hostname digit prefix of numbered servers, per datacenter.
pub const DATACENTER_NUMBERING_PREFIX: [(&str, &str); 6] = [
    ("eqiad", "1"),
    ("codfw", "2"),
    ("esams", "3"),
    ("ulsfo", "4"),
    ("eqsin", "5"),
    ("drmrs", "6"),
];

/// Numbering prefix for `datacenter`, if known.
pub fn datacenter_numbering_prefix(datacenter: &str) -> Option<&'static str> {
    DATACENTER_NUMBERING_PREFIX
        .iter()
        .find(|(dc, _)| *dc == datacenter)
        .map(|(_, prefix)| *prefix)
}

pub fn is_datacenter(name: &str) -> bool {
    ALL_DATACENTERS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    #[test]
    fn core_datacenters_are_datacenters() {
        for dc in CORE_DATACENTERS {
            assert!(is_datacenter(dc));
        }
        assert!(!is_datacenter("nowhere"));
    }

    #[test]
    fn every_datacenter_has_a_unique_prefix() {
        let mut prefixes: Vec<_> = ALL_DATACENTERS
            .iter()
            .map(|dc| datacenter_numbering_prefix(dc).unwrap())
            .collect();
        prefixes.sort_unstable();
        prefixes.dedup();
        assert_eq!(prefixes.len(), ALL_DATACENTERS.len());
        assert_eq!(datacenter_numbering_prefix("codfw"), Some("2"));
        assert_eq!(datacenter_numbering_prefix("unknown"), None);
    }

    #[test]
    fn public_authdns_are_ip_addresses() {
        for addr in PUBLIC_AUTHDNS {
            assert!(addr.parse::<IpAddr>().is_ok(), "{addr}");
        }
    }
}
