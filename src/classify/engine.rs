//! Category evaluation.
//!
//! For each of the three categories the engine checks, in strict order,
//! CNAME patterns, geolocation keywords, ASNs, and CIDR ranges; the first
//! provider match wins and no later signal can override it. The
//! address-count heuristic runs independently and is reported alongside,
//! never merged into a category verdict.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::classify::matcher::{CompiledCategory, CompiledProviderDb};
use crate::classify::signals::ProviderSignalSet;
use crate::config::constants::ADDRESS_COUNT_THRESHOLD;

/// Per-target classification verdict. A provider name is non-empty if and
/// only if the corresponding flag is true.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    /// Target is served through a known CDN
    pub is_cdn: bool,
    /// Matching CDN provider ("" when `is_cdn` is false)
    pub cdn_provider: String,

    /// Target is fronted by a known WAF
    pub is_waf: bool,
    /// Matching WAF provider ("" when `is_waf` is false)
    pub waf_provider: String,

    /// Target is hosted on a known cloud provider
    pub is_cloud: bool,
    /// Matching cloud provider ("" when `is_cloud` is false)
    pub cloud_provider: String,

    /// Address-count heuristic: more distinct addresses than the
    /// threshold. Informational only, never a confirmed category match.
    pub address_count_exceeded: bool,
    /// Number of distinct resolved addresses
    pub address_count: usize,
}

/// Classifies one target's signals against the compiled database.
pub fn classify(signals: &ProviderSignalSet, db: &CompiledProviderDb) -> ClassificationResult {
    let mut result = ClassificationResult::default();

    if let Some(provider) = evaluate_category(&db.cdn, signals) {
        result.is_cdn = true;
        result.cdn_provider = provider.to_string();
    }
    if let Some(provider) = evaluate_category(&db.waf, signals) {
        result.is_waf = true;
        result.waf_provider = provider.to_string();
    }
    if let Some(provider) = evaluate_category(&db.cloud, signals) {
        result.is_cloud = true;
        result.cloud_provider = provider.to_string();
    }

    let (exceeded, count) = address_count_heuristic(&signals.addresses, ADDRESS_COUNT_THRESHOLD);
    result.address_count_exceeded = exceeded;
    result.address_count = count;

    result
}

/// Evaluates one category in strict CNAME → keyword → ASN → CIDR order,
/// stopping at the first match.
fn evaluate_category<'a>(
    category: &'a CompiledCategory,
    signals: &'a ProviderSignalSet,
) -> Option<&'a str> {
    category
        .match_cname(signals.cnames.iter().map(String::as_str))
        .or_else(|| category.match_keys(signals.locations.iter().map(String::as_str)))
        .or_else(|| category.match_asn(&signals.asns))
        .or_else(|| category.match_cidr(signals.addresses.iter().map(String::as_str)))
}

/// The supplementary weak signal: does the target resolve to more distinct
/// addresses than `threshold`? Returns the flag and the count.
pub fn address_count_heuristic(
    addresses: &BTreeSet<String>,
    threshold: usize,
) -> (bool, usize) {
    let count = addresses.len();
    (count > threshold, count)
}
