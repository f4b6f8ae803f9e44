//! Signal-set derivation.
//!
//! Collapses a domain's unified resolution state plus enrichment lookups
//! into the flat, deduplicated signal set the classification engine
//! consumes. Derived immediately before classification, never stored.

use std::collections::BTreeSet;
use std::net::IpAddr;

use crate::dns::RecordSet;
use crate::geoip::{AsnLookup, IpLocator};

/// Per-target classification inputs.
#[derive(Debug, Clone, Default)]
pub struct ProviderSignalSet {
    /// Unique resolved addresses (A ∪ AAAA)
    pub addresses: BTreeSet<String>,
    /// Unique autonomous-system numbers of the resolved addresses
    pub asns: BTreeSet<u64>,
    /// Organization names of the matched autonomous systems
    pub asn_orgs: BTreeSet<String>,
    /// Unique observed CNAME strings
    pub cnames: BTreeSet<String>,
    /// Unique geolocation labels of the resolved addresses
    pub locations: BTreeSet<String>,
}

impl ProviderSignalSet {
    /// Derives signals for a domain target from its unified record sets.
    pub fn from_record_set(
        records: &RecordSet,
        locator: &dyn IpLocator,
        asn_lookup: &dyn AsnLookup,
    ) -> Self {
        let mut signals = Self {
            cnames: records.cname.clone(),
            ..Default::default()
        };
        for value in records.a.iter().chain(records.aaaa.iter()) {
            signals.add_address(value, locator, asn_lookup);
        }
        signals
    }

    /// Derives signals for a bare IP target (no DNS step).
    pub fn from_address(
        address: &str,
        locator: &dyn IpLocator,
        asn_lookup: &dyn AsnLookup,
    ) -> Self {
        let mut signals = Self::default();
        signals.add_address(address, locator, asn_lookup);
        signals
    }

    fn add_address(&mut self, address: &str, locator: &dyn IpLocator, asn_lookup: &dyn AsnLookup) {
        self.addresses.insert(address.to_string());

        let Ok(ip) = address.parse::<IpAddr>() else {
            return;
        };
        let label = locator.locate(ip);
        if !label.is_empty() {
            self.locations.insert(label);
        }
        if let Some(info) = asn_lookup.find_asn(ip) {
            self.asns.insert(info.number);
            if !info.organization.is_empty() {
                self.asn_orgs.insert(info.organization);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geoip::{AsnInfo, NoEnrichment};
    use hickory_proto::rr::RecordType;

    struct StubEnricher;

    impl IpLocator for StubEnricher {
        fn locate(&self, ip: IpAddr) -> String {
            if ip.is_ipv4() {
                "United States California".to_string()
            } else {
                String::new()
            }
        }
    }

    impl AsnLookup for StubEnricher {
        fn find_asn(&self, _ip: IpAddr) -> Option<AsnInfo> {
            Some(AsnInfo {
                number: 54113,
                organization: "Fastly, Inc.".to_string(),
            })
        }
    }

    #[test]
    fn test_signals_union_address_families() {
        let mut records = RecordSet::default();
        records.insert(
            RecordType::A,
            ["151.101.1.57".to_string(), "151.101.65.57".to_string()],
        );
        records.insert(RecordType::AAAA, ["2a04:4e42::485".to_string()]);
        records.insert(RecordType::CNAME, ["edge.fastly.net".to_string()]);

        let signals = ProviderSignalSet::from_record_set(&records, &StubEnricher, &StubEnricher);
        assert_eq!(signals.addresses.len(), 3);
        assert_eq!(signals.cnames.len(), 1);
        // IPv6 label is empty and therefore dropped
        assert_eq!(signals.locations.len(), 1);
        assert_eq!(signals.asns, BTreeSet::from([54113]));
        assert!(signals.asn_orgs.contains("Fastly, Inc."));
    }

    #[test]
    fn test_signals_for_bare_ip_target() {
        let signals = ProviderSignalSet::from_address("93.184.216.34", &StubEnricher, &StubEnricher);
        assert_eq!(signals.addresses.len(), 1);
        assert!(signals.cnames.is_empty());
        assert_eq!(signals.asns, BTreeSet::from([54113]));
    }

    #[test]
    fn test_unparseable_address_skips_enrichment() {
        let signals =
            ProviderSignalSet::from_address("wildcard.example.com", &NoEnrichment, &NoEnrichment);
        // Still counted as an address, but no enrichment is attempted
        assert_eq!(signals.addresses.len(), 1);
        assert!(signals.locations.is_empty());
        assert!(signals.asns.is_empty());
    }
}
