//! Core data types shared across the pipeline.
//!
//! A run flows `TargetEntry` → resolution → enrichment → classification →
//! `CheckRecord`. The record is the produced interface: everything a
//! downstream writer needs to serialize, with no further lookups.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::classify::ClassificationResult;

/// A classified input target, produced by the input splitter (or any
/// external caller). Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetEntry {
    /// Original input string (possibly a URL or host:port form)
    pub raw: String,
    /// Normalized form: a bare IP or bare domain
    pub normalized: String,
    /// Whether the normalized form is an IPv4 address
    pub is_ipv4: bool,
    /// Whether the input arrived as a URL
    pub from_url: bool,
}

impl TargetEntry {
    /// Builds a domain entry with an already-normalized name.
    pub fn domain(raw: impl Into<String>, normalized: impl Into<String>, from_url: bool) -> Self {
        Self {
            raw: raw.into(),
            normalized: normalized.into(),
            is_ipv4: false,
            from_url,
        }
    }

    /// Builds an IP entry with an already-normalized address.
    pub fn ip(
        raw: impl Into<String>,
        normalized: impl Into<String>,
        is_ipv4: bool,
        from_url: bool,
    ) -> Self {
        Self {
            raw: raw.into(),
            normalized: normalized.into(),
            is_ipv4,
            from_url,
        }
    }
}

/// Per-target output record combining the raw input, the unified DNS
/// signal set, enrichment data, and the classification verdict.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckRecord {
    /// Original input string
    pub raw: String,
    /// Normalized target (bare IP or domain)
    pub fmt: String,
    /// Whether the target is an IPv4 address
    pub is_ipv4: bool,
    /// Whether the input arrived as a URL
    pub from_url: bool,

    /// Resolved A records
    pub a: BTreeSet<String>,
    /// Resolved AAAA records
    pub aaaa: BTreeSet<String>,
    /// Observed CNAME targets (records and chain entries)
    pub cname: BTreeSet<String>,
    /// Observed NS names
    pub ns: BTreeSet<String>,
    /// Observed MX entries (`"preference exchange"`)
    pub mx: BTreeSet<String>,
    /// Observed TXT strings
    pub txt: BTreeSet<String>,
    /// Per-source error messages recorded during resolution
    pub errors: BTreeMap<String, String>,

    /// Geolocation labels for resolved addresses (empty labels dropped)
    pub locations: BTreeSet<String>,
    /// Autonomous-system numbers for resolved addresses
    pub asns: BTreeSet<u64>,
    /// Autonomous-system organization names for resolved addresses
    pub asn_orgs: BTreeSet<String>,

    /// Classification verdict
    #[serde(flatten)]
    pub classification: ClassificationResult,
}

impl CheckRecord {
    /// Creates an empty record for a target. A target with no resolvable
    /// records still produces a well-formed record with all fields
    /// empty/false, never an omission.
    pub fn for_target(entry: &TargetEntry) -> Self {
        Self {
            raw: entry.raw.clone(),
            fmt: entry.normalized.clone(),
            is_ipv4: entry.is_ipv4,
            from_url: entry.from_url,
            ..Default::default()
        }
    }
}
