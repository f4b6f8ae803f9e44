//! MaxMind-backed enrichment.
//!
//! Wraps optional GeoLite2 City and ASN readers behind the lookup traits.
//! Both readers are optional and independent; a missing database simply
//! degrades to empty labels / no ASN data. The readers are opened once and
//! injected; there is no global registry.

use std::net::IpAddr;
use std::path::Path;

use log::debug;
use maxminddb::Reader;

use crate::error_handling::DatabaseError;
use crate::geoip::lookup::{AsnInfo, AsnLookup, IpLocator};

/// Enricher backed by MaxMind databases.
pub struct GeoEnricher {
    city_reader: Option<Reader<Vec<u8>>>,
    asn_reader: Option<Reader<Vec<u8>>>,
}

impl GeoEnricher {
    /// Opens the configured databases. Either path may be absent; lookups
    /// against a missing database return empty results.
    pub fn open(city_db: Option<&Path>, asn_db: Option<&Path>) -> Result<Self, DatabaseError> {
        let city_reader = city_db.map(Reader::open_readfile).transpose()?;
        let asn_reader = asn_db.map(Reader::open_readfile).transpose()?;
        Ok(Self {
            city_reader,
            asn_reader,
        })
    }

    /// An enricher with no databases loaded.
    pub fn disabled() -> Self {
        Self {
            city_reader: None,
            asn_reader: None,
        }
    }

    /// Whether any database is loaded.
    pub fn is_enabled(&self) -> bool {
        self.city_reader.is_some() || self.asn_reader.is_some()
    }
}

impl IpLocator for GeoEnricher {
    fn locate(&self, ip: IpAddr) -> String {
        let Some(reader) = self.city_reader.as_ref() else {
            return String::new();
        };

        let lookup = match reader.lookup(ip) {
            Ok(result) => result,
            Err(e) => {
                debug!("City lookup failed for {ip}: {e}");
                return String::new();
            }
        };
        if !lookup.has_data() {
            return String::new();
        }
        let city: maxminddb::geoip2::City = match lookup.decode() {
            Ok(Some(city)) => city,
            _ => return String::new(),
        };

        // "Country Region City", skipping whichever parts are missing
        let mut parts: Vec<String> = Vec::new();
        if let Some(country) = city.country.names.english {
            parts.push(country.to_string());
        }
        if let Some(subdivision) = city.subdivisions.first() {
            if let Some(region) = subdivision.names.english {
                parts.push(region.to_string());
            }
        }
        if let Some(name) = city.city.names.english {
            parts.push(name.to_string());
        }
        parts.join(" ")
    }
}

impl AsnLookup for GeoEnricher {
    fn find_asn(&self, ip: IpAddr) -> Option<AsnInfo> {
        let reader = self.asn_reader.as_ref()?;

        let lookup = match reader.lookup(ip) {
            Ok(result) => result,
            Err(e) => {
                debug!("ASN lookup failed for {ip}: {e}");
                return None;
            }
        };
        if !lookup.has_data() {
            return None;
        }
        let asn: maxminddb::geoip2::Asn = match lookup.decode() {
            Ok(Some(asn)) => asn,
            _ => return None,
        };

        Some(AsnInfo {
            number: u64::from(asn.autonomous_system_number?),
            organization: asn
                .autonomous_system_organization
                .map(|s| s.to_string())
                .unwrap_or_default(),
        })
    }
}
