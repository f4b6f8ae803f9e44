//! Compiled provider matching.
//!
//! `CompiledProviderDb` is built once from a loaded `ProviderDatabase` and
//! is immutable afterwards: string patterns become substring/regex
//! matchers (regexes compiled once per distinct pattern string, shared
//! across categories), ASN lists become normalized integer sets, and CIDR
//! lists become longest-prefix tries. Classification then runs against
//! this structure with no hidden global state.

use std::collections::{BTreeSet, HashMap};
use std::net::IpAddr;

use ipnet::{Ipv4Net, Ipv6Net};
use iprange::IpRange;
use log::debug;
use regex::Regex;

use crate::classify::database::{CategoryTables, PatternTable, ProviderDatabase};

/// Characters that mark a pattern as a regular expression rather than a
/// plain substring.
const REGEX_MARKS: [char; 10] = [']', ')', '}', '*', '+', '^', '$', '?', '|', '\\'];

/// A single compiled pattern.
#[derive(Debug, Clone)]
enum Pattern {
    /// Case-insensitive substring containment (stored lowercase)
    Substring(String),
    /// Case-insensitive compiled regex
    Regex(Regex),
}

impl Pattern {
    fn matches(&self, candidate: &str, candidate_lower: &str) -> bool {
        match self {
            Pattern::Substring(needle) => candidate_lower.contains(needle.as_str()),
            Pattern::Regex(regex) => regex.is_match(candidate),
        }
    }
}

/// One provider's compiled pattern list.
#[derive(Debug, Clone)]
struct ProviderPatterns {
    provider: String,
    patterns: Vec<Pattern>,
}

/// One provider's compiled CIDR tries (both IP families).
#[derive(Clone)]
struct ProviderRanges {
    provider: String,
    v4: IpRange<Ipv4Net>,
    v6: IpRange<Ipv6Net>,
}

/// One category's compiled tables, providers in deterministic (sorted)
/// order so ties always break the same way.
#[derive(Clone, Default)]
pub struct CompiledCategory {
    cname: Vec<ProviderPatterns>,
    keys: Vec<ProviderPatterns>,
    asn: Vec<(String, BTreeSet<u64>)>,
    ranges: Vec<ProviderRanges>,
}

impl CompiledCategory {
    fn compile(tables: &CategoryTables, regex_cache: &mut RegexCache) -> Self {
        Self {
            cname: compile_patterns(&tables.cname, regex_cache),
            keys: compile_patterns(&tables.keys, regex_cache),
            asn: tables
                .asn
                .iter()
                .map(|(provider, asns)| {
                    let numbers = asns.iter().filter_map(|s| normalize_asn(s)).collect();
                    (provider.clone(), numbers)
                })
                .collect(),
            ranges: tables
                .ip
                .iter()
                .map(|(provider, cidrs)| compile_ranges(provider, cidrs))
                .collect(),
        }
    }

    /// Matches a set of candidate strings against the CNAME tables.
    pub(crate) fn match_cname<'a>(
        &'a self,
        candidates: impl IntoIterator<Item = &'a str> + Clone,
    ) -> Option<&'a str> {
        match_patterns(&self.cname, candidates)
    }

    /// Matches a set of location labels against the keyword tables.
    pub(crate) fn match_keys<'a>(
        &'a self,
        candidates: impl IntoIterator<Item = &'a str> + Clone,
    ) -> Option<&'a str> {
        match_patterns(&self.keys, candidates)
    }

    /// Matches resolved ASNs against the provider ASN sets.
    pub(crate) fn match_asn(&self, asns: &BTreeSet<u64>) -> Option<&str> {
        for (provider, numbers) in &self.asn {
            if asns.iter().any(|asn| numbers.contains(asn)) {
                return Some(provider);
            }
        }
        None
    }

    /// Matches resolved addresses against the provider CIDR tries.
    pub(crate) fn match_cidr<'a>(
        &'a self,
        addresses: impl IntoIterator<Item = &'a str>,
    ) -> Option<&'a str> {
        let parsed: Vec<IpAddr> = addresses
            .into_iter()
            .filter_map(|addr| addr.parse().ok())
            .collect();
        for ranges in &self.ranges {
            for addr in &parsed {
                let contained = match addr {
                    IpAddr::V4(v4) => ranges.v4.contains(v4),
                    IpAddr::V6(v6) => ranges.v6.contains(v6),
                };
                if contained {
                    return Some(&ranges.provider);
                }
            }
        }
        None
    }
}

/// The whole compiled database: three categories plus nothing else.
#[derive(Clone, Default)]
pub struct CompiledProviderDb {
    /// Compiled CDN tables
    pub cdn: CompiledCategory,
    /// Compiled WAF tables
    pub waf: CompiledCategory,
    /// Compiled cloud tables
    pub cloud: CompiledCategory,
}

impl CompiledProviderDb {
    /// Compiles a loaded database. Each distinct regex pattern string is
    /// compiled exactly once, even when it recurs across providers and
    /// categories.
    pub fn compile(db: &ProviderDatabase) -> Self {
        let mut regex_cache = RegexCache::new();
        Self {
            cdn: CompiledCategory::compile(&db.cdn, &mut regex_cache),
            waf: CompiledCategory::compile(&db.waf, &mut regex_cache),
            cloud: CompiledCategory::compile(&db.cloud, &mut regex_cache),
        }
    }
}

/// Compile-time regex cache keyed by the original pattern string.
/// `None` marks a pattern that failed to compile (substring fallback).
struct RegexCache {
    compiled: HashMap<String, Option<Regex>>,
}

impl RegexCache {
    fn new() -> Self {
        Self {
            compiled: HashMap::new(),
        }
    }

    fn get(&mut self, pattern: &str) -> Option<Regex> {
        self.compiled
            .entry(pattern.to_string())
            .or_insert_with(|| match Regex::new(&format!("(?i){pattern}")) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    debug!("Pattern {pattern:?} is not a valid regex, matching as substring: {e}");
                    None
                }
            })
            .clone()
    }
}

fn compile_patterns(table: &PatternTable, regex_cache: &mut RegexCache) -> Vec<ProviderPatterns> {
    table
        .iter()
        .map(|(provider, raw_patterns)| ProviderPatterns {
            provider: provider.clone(),
            patterns: raw_patterns
                .iter()
                .map(|raw| {
                    if raw.contains(&REGEX_MARKS[..]) {
                        match regex_cache.get(raw) {
                            Some(regex) => Pattern::Regex(regex),
                            None => Pattern::Substring(raw.to_lowercase()),
                        }
                    } else {
                        Pattern::Substring(raw.to_lowercase())
                    }
                })
                .collect(),
        })
        .collect()
}

fn compile_ranges(provider: &str, cidrs: &[String]) -> ProviderRanges {
    let mut v4: IpRange<Ipv4Net> = IpRange::new();
    let mut v6: IpRange<Ipv6Net> = IpRange::new();
    for cidr in cidrs {
        if let Ok(net) = cidr.parse::<Ipv4Net>() {
            v4.add(net);
        } else if let Ok(net) = cidr.parse::<Ipv6Net>() {
            v6.add(net);
        } else {
            debug!("Skipping unparseable CIDR {cidr:?} for provider {provider}");
        }
    }
    v4.simplify();
    v6.simplify();
    ProviderRanges {
        provider: provider.to_string(),
        v4,
        v6,
    }
}

fn match_patterns<'a>(
    providers: &'a [ProviderPatterns],
    candidates: impl IntoIterator<Item = &'a str> + Clone,
) -> Option<&'a str> {
    for entry in providers {
        for candidate in candidates.clone() {
            let trimmed = candidate.trim_matches('.');
            let trimmed_lower = trimmed.to_lowercase();
            if entry
                .patterns
                .iter()
                .any(|pattern| pattern.matches(trimmed, &trimmed_lower))
            {
                return Some(&entry.provider);
            }
        }
    }
    None
}

/// Normalizes an ASN string (trim, uppercase, strip a leading "AS") to an
/// integer. Unparseable entries are dropped.
pub(crate) fn normalize_asn(asn: &str) -> Option<u64> {
    let asn = asn.trim().to_uppercase();
    let asn = asn.strip_prefix("AS").unwrap_or(&asn);
    asn.parse().ok()
}
