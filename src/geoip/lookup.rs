//! Enrichment lookup contracts.
//!
//! The resolution engine never reads location or ASN databases itself; it
//! consumes these two interfaces. Keeping them as traits keeps the
//! classification pipeline testable without database fixtures.

use std::net::IpAddr;

use serde::Serialize;

/// ASN lookup result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AsnInfo {
    /// Autonomous-system number
    pub number: u64,
    /// Owning organization name (may be empty)
    pub organization: String,
}

/// Maps an IP address to a human-readable location label.
pub trait IpLocator {
    /// Returns the location label for `ip`, or an empty string when the
    /// address is unknown.
    fn locate(&self, ip: IpAddr) -> String;
}

/// Maps an IP address to its autonomous system.
pub trait AsnLookup {
    /// Returns the ASN entry for `ip`, or `None` when the address is not
    /// covered by the database.
    fn find_asn(&self, ip: IpAddr) -> Option<AsnInfo>;
}

/// Enricher that knows nothing; classification then runs on DNS signals
/// alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEnrichment;

impl IpLocator for NoEnrichment {
    fn locate(&self, _ip: IpAddr) -> String {
        String::new()
    }
}

impl AsnLookup for NoEnrichment {
    fn find_asn(&self, _ip: IpAddr) -> Option<AsnInfo> {
        None
    }
}
