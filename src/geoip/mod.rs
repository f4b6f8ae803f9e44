//! IP enrichment: geolocation labels and ASN data.

mod lookup;
mod maxmind;

pub use lookup::{AsnInfo, AsnLookup, IpLocator, NoEnrichment};
pub use maxmind::GeoEnricher;
