//! Batch resolution orchestration.
//!
//! Fans a batch of domains out across (resolver × record type) for plain
//! DNS and across (vantage point × name server × record type) for EDNS
//! probing, bounded by a shared semaphore, and folds every partial result
//! into one unified state per domain.
//!
//! Every spawned task returns a value (success with data or failure with
//! a reason), so the failure path is type-checked; a panicking task is
//! absorbed at the join and logged. Merges are set unions: commutative,
//! idempotent, never destructive of values gathered elsewhere.

use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use hickory_proto::rr::RecordType;
use log::{debug, warn};
use serde::Serialize;
use tokio::sync::Semaphore;

use crate::config::constants::WELL_KNOWN_RESOLVER;
use crate::config::VantagePoint;
use crate::initialization::init_semaphore;
use crate::dns::chain::{find_authoritative_servers, follow_cname_chain};
use crate::dns::edns::{probe_with_subnet, ProbeFragment};
use crate::dns::resolver::{ensure_port, resolve_record};
use crate::input::looks_like_domain;

/// The six record types queried for every domain.
pub const DEFAULT_RECORD_TYPES: [RecordType; 6] = [
    RecordType::A,
    RecordType::AAAA,
    RecordType::CNAME,
    RecordType::NS,
    RecordType::MX,
    RecordType::TXT,
];

/// Per-(domain, resolver) query result: one deduplicated set per record
/// type, plus an error message per record type that failed. Grown only by
/// set union after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordSet {
    /// A records
    pub a: BTreeSet<String>,
    /// AAAA records
    pub aaaa: BTreeSet<String>,
    /// CNAME targets
    pub cname: BTreeSet<String>,
    /// NS names
    pub ns: BTreeSet<String>,
    /// MX entries as `"preference exchange"`
    pub mx: BTreeSet<String>,
    /// TXT strings
    pub txt: BTreeSet<String>,
    /// Error message per failed source, keyed by a synthetic label
    pub errors: BTreeMap<String, String>,
}

impl RecordSet {
    /// Inserts values under the set for `record_type`.
    pub fn insert(&mut self, record_type: RecordType, values: impl IntoIterator<Item = String>) {
        if let Some(set) = self.set_mut(record_type) {
            set.extend(values);
        }
    }

    /// Records an error under a synthetic source label.
    pub fn record_error(&mut self, label: impl Into<String>, message: impl Into<String>) {
        self.errors.insert(label.into(), message.into());
    }

    /// Unions another set into this one. Errors are carried over without
    /// displacing existing entries' values.
    pub fn merge(&mut self, other: &RecordSet) {
        self.a.extend(other.a.iter().cloned());
        self.aaaa.extend(other.aaaa.iter().cloned());
        self.cname.extend(other.cname.iter().cloned());
        self.ns.extend(other.ns.iter().cloned());
        self.mx.extend(other.mx.iter().cloned());
        self.txt.extend(other.txt.iter().cloned());
        self.errors
            .extend(other.errors.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    /// True when no record of any type was collected.
    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
            && self.aaaa.is_empty()
            && self.cname.is_empty()
            && self.ns.is_empty()
            && self.mx.is_empty()
            && self.txt.is_empty()
    }

    fn set_mut(&mut self, record_type: RecordType) -> Option<&mut BTreeSet<String>> {
        match record_type {
            RecordType::A => Some(&mut self.a),
            RecordType::AAAA => Some(&mut self.aaaa),
            RecordType::CNAME => Some(&mut self.cname),
            RecordType::NS => Some(&mut self.ns),
            RecordType::MX => Some(&mut self.mx),
            RecordType::TXT => Some(&mut self.txt),
            _ => None,
        }
    }
}

/// One EDNS probe outcome, keyed by vantage-point label and name server.
/// Exists only to be folded into the per-domain merge.
#[derive(Debug, Clone)]
pub struct VantagePointProbe {
    /// Vantage-point city label
    pub city: String,
    /// Name server the probe was sent to
    pub server: String,
    /// Records extracted from the probe
    pub records: RecordSet,
    /// Transport errors encountered by the probe
    pub errors: Vec<String>,
}

impl VantagePointProbe {
    fn from_fragment(city: &str, server: &str, fragment: ProbeFragment) -> Self {
        let mut records = RecordSet::default();
        records.insert(fragment.record_type, fragment.values);
        Self {
            city: city.to_string(),
            server: server.to_string(),
            records,
            errors: fragment.error.into_iter().collect(),
        }
    }
}

/// Per-domain aggregate of everything resolution discovered: the CNAME
/// chain and its tail, the authoritative server set, and the union of
/// every record set and probe observed for the domain.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DomainResolutionState {
    /// The domain as queried
    pub domain: String,
    /// Tail of the CNAME chain (the domain itself when there is none)
    pub final_domain: String,
    /// Authoritative name servers discovered for the chain tail
    pub name_servers: BTreeSet<String>,
    /// CNAME chain starting at the domain, each name exactly once
    pub cname_chain: Vec<String>,
    /// Unified record sets
    pub records: RecordSet,
    /// Union of every probe location label (`"{city}@{server}"`)
    pub locations: BTreeSet<String>,
    /// Union of every error string observed for the domain
    pub errors: BTreeSet<String>,
}

impl DomainResolutionState {
    /// Creates a state for `domain` with the chain degenerate at the
    /// domain itself.
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            final_domain: domain.to_string(),
            cname_chain: vec![domain.to_string()],
            ..Default::default()
        }
    }

    /// Folds one probe into the state. Folding the same probe twice
    /// leaves the state unchanged (set union).
    pub fn absorb_probe(&mut self, probe: &VantagePointProbe) {
        self.locations
            .insert(format!("{}@{}", probe.city, probe.server));
        self.records.merge(&probe.records);
        self.errors.extend(probe.errors.iter().cloned());
    }

    /// Folds a plain-DNS record set into the state.
    pub fn absorb_record_set(&mut self, records: &RecordSet) {
        self.records.merge(records);
    }
}

/// Result of the pre-probe chain discovery for one domain.
#[derive(Debug, Clone)]
struct ChainDiscovery {
    final_domain: String,
    name_servers: Vec<String>,
    cname_chain: Vec<String>,
}

impl ChainDiscovery {
    fn fallback(domain: &str) -> Self {
        Self {
            final_domain: domain.to_string(),
            name_servers: Vec::new(),
            cname_chain: vec![domain.to_string()],
        }
    }
}

/// Resolves every (domain × resolver × record type) triple with bounded
/// concurrency.
///
/// Results are keyed by domain, then resolver. A failed query records its
/// error under the record-type key of that resolver's `RecordSet`; values
/// already collected from other resolvers are never removed. The call
/// returns only after every scheduled task has completed.
pub async fn resolve_batch(
    domains: &[String],
    resolvers: &[String],
    record_types: &[RecordType],
    timeout: Duration,
    max_concurrency: usize,
) -> BTreeMap<String, BTreeMap<String, RecordSet>> {
    let record_types = if record_types.is_empty() {
        &DEFAULT_RECORD_TYPES[..]
    } else {
        record_types
    };

    // Result containers exist up front so an all-failure run still yields
    // a well-formed (empty) entry per domain and resolver.
    let mut results: BTreeMap<String, BTreeMap<String, RecordSet>> = BTreeMap::new();
    for domain in domains {
        let per_resolver = results.entry(domain.clone()).or_default();
        for resolver in resolvers {
            per_resolver.entry(resolver.clone()).or_default();
        }
    }

    let semaphore = init_semaphore(max_concurrency);
    let mut tasks = FuturesUnordered::new();

    for domain in domains {
        for resolver in resolvers {
            for &record_type in record_types {
                let permit = match Arc::clone(&semaphore).acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => continue,
                };
                let domain = domain.clone();
                let resolver = resolver.clone();
                tasks.push(tokio::spawn(async move {
                    let _permit = permit;
                    let outcome = resolve_record(&domain, &resolver, record_type, timeout)
                        .await
                        .map_err(|e| e.to_string());
                    (domain, resolver, record_type, outcome)
                }));
            }
        }
    }

    while let Some(joined) = tasks.next().await {
        match joined {
            Ok((domain, resolver, record_type, outcome)) => {
                let record_set = results
                    .entry(domain)
                    .or_default()
                    .entry(resolver)
                    .or_default();
                match outcome {
                    Ok(values) => record_set.insert(record_type, values),
                    Err(message) => record_set.record_error(record_type.to_string(), message),
                }
            }
            Err(join_error) => {
                warn!("Resolution task panicked: {join_error:?}");
            }
        }
    }

    results
}

/// Merges per-resolver record sets into one set per domain.
///
/// Values union across resolvers; each resolver's errors are retained
/// under a `"{resolver}/{record type}"` label so a timeout on one resolver
/// never hides answers from another.
pub fn merge_resolver_sets(
    results: BTreeMap<String, BTreeMap<String, RecordSet>>,
) -> BTreeMap<String, RecordSet> {
    let mut merged = BTreeMap::new();
    for (domain, per_resolver) in results {
        let unified: &mut RecordSet = merged.entry(domain).or_default();
        for (resolver, record_set) in per_resolver {
            unified.a.extend(record_set.a);
            unified.aaaa.extend(record_set.aaaa);
            unified.cname.extend(record_set.cname);
            unified.ns.extend(record_set.ns);
            unified.mx.extend(record_set.mx);
            unified.txt.extend(record_set.txt);
            for (record_type, message) in record_set.errors {
                unified.record_error(format!("{resolver}/{record_type}"), message);
            }
        }
    }
    merged
}

/// Probes every domain from every vantage point with bounded concurrency.
///
/// When chain discovery is enabled, each domain's CNAME-chain tail and
/// authoritative servers are discovered first (falling back to the
/// original name and the well-known public resolver on failure), and the
/// probes fan out over (vantage point × servers × six record types). All
/// fragments for a domain merge into one `DomainResolutionState`;
/// transport errors accumulate without suppressing sibling probes.
pub async fn probe_batch_with_geo_subnet(
    domains: &[String],
    vantage_points: &[VantagePoint],
    timeout: Duration,
    max_concurrency: usize,
    use_chain_discovery: bool,
    use_system_ns: bool,
) -> BTreeMap<String, DomainResolutionState> {
    let semaphore = init_semaphore(max_concurrency);
    let discovery_resolver = if use_system_ns {
        system_resolver()
    } else {
        WELL_KNOWN_RESOLVER.to_string()
    };

    let mut pipelines = FuturesUnordered::new();
    for domain in domains {
        let domain = domain.clone();
        let vantage_points = vantage_points.to_vec();
        let semaphore = Arc::clone(&semaphore);
        let discovery_resolver = discovery_resolver.clone();
        pipelines.push(tokio::spawn(async move {
            probe_domain(
                domain,
                vantage_points,
                timeout,
                semaphore,
                use_chain_discovery,
                discovery_resolver,
            )
            .await
        }));
    }

    let mut states = BTreeMap::new();
    while let Some(joined) = pipelines.next().await {
        match joined {
            Ok(state) => {
                states.insert(state.domain.clone(), state);
            }
            Err(join_error) => {
                warn!("EDNS pipeline panicked: {join_error:?}");
            }
        }
    }

    // Domains whose pipeline task died still get a well-formed empty state.
    for domain in domains {
        states
            .entry(domain.clone())
            .or_insert_with(|| DomainResolutionState::new(domain));
    }

    states
}

/// One domain's EDNS pipeline: chain discovery, probe fan-out, merge.
async fn probe_domain(
    domain: String,
    vantage_points: Vec<VantagePoint>,
    timeout: Duration,
    semaphore: Arc<Semaphore>,
    use_chain_discovery: bool,
    discovery_resolver: String,
) -> DomainResolutionState {
    let discovery = if use_chain_discovery {
        discover_chain(&domain, &discovery_resolver, timeout, &semaphore).await
    } else {
        ChainDiscovery::fallback(&domain)
    };

    // The well-known resolver always participates so a domain with
    // undiscoverable authoritative servers still gets geo answers.
    let mut servers: Vec<String> = vec![WELL_KNOWN_RESOLVER.to_string()];
    for server in &discovery.name_servers {
        let server = ensure_port(server);
        if !servers.contains(&server) {
            servers.push(server);
        }
    }

    let mut state = DomainResolutionState::new(&domain);
    state.final_domain = discovery.final_domain.clone();
    state.cname_chain = discovery.cname_chain.clone();
    state.name_servers = servers.iter().cloned().collect();
    // Chain hops beyond the queried name are themselves CNAME evidence.
    state
        .records
        .cname
        .extend(discovery.cname_chain.iter().skip(1).cloned());

    let mut probes = FuturesUnordered::new();
    for vantage in &vantage_points {
        for server in &servers {
            for &record_type in &DEFAULT_RECORD_TYPES {
                let permit = match Arc::clone(&semaphore).acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => continue,
                };
                let final_domain = discovery.final_domain.clone();
                let city = vantage.city.clone();
                let vantage_addr = vantage.ip.clone();
                let server = server.clone();
                probes.push(tokio::spawn(async move {
                    let _permit = permit;
                    let fragment = probe_with_subnet(
                        &final_domain,
                        &vantage_addr,
                        &server,
                        record_type,
                        timeout,
                    )
                    .await;
                    VantagePointProbe::from_fragment(&city, &server, fragment)
                }));
            }
        }
    }

    while let Some(joined) = probes.next().await {
        match joined {
            Ok(probe) => state.absorb_probe(&probe),
            Err(join_error) => {
                warn!("EDNS probe for {domain} panicked: {join_error:?}");
            }
        }
    }

    state
}

/// Walks the CNAME chain and discovers authoritative servers for its
/// tail, holding one concurrency permit for the whole sequential walk.
async fn discover_chain(
    domain: &str,
    resolver: &str,
    timeout: Duration,
    semaphore: &Arc<Semaphore>,
) -> ChainDiscovery {
    let _permit = match semaphore.acquire().await {
        Ok(permit) => permit,
        Err(_) => return ChainDiscovery::fallback(domain),
    };

    let cname_chain = follow_cname_chain(domain, resolver, timeout).await;
    let final_domain = cname_chain
        .last()
        .cloned()
        .unwrap_or_else(|| domain.to_string());

    let name_servers = match find_authoritative_servers(&final_domain, resolver, timeout).await {
        Ok(servers) => servers,
        Err(e) => {
            debug!("Authoritative-server discovery failed for {final_domain}: {e}");
            Vec::new()
        }
    };

    ChainDiscovery {
        final_domain,
        name_servers,
        cname_chain,
    }
}

/// First name server from the system resolver configuration, falling back
/// to the well-known public resolver when none can be read.
pub fn system_resolver() -> String {
    match hickory_resolver::system_conf::read_system_conf() {
        Ok((config, _)) => config
            .name_servers()
            .first()
            .map(|ns| ns.socket_addr.to_string())
            .unwrap_or_else(|| WELL_KNOWN_RESOLVER.to_string()),
        Err(e) => {
            debug!("Failed to read system resolver configuration: {e}");
            WELL_KNOWN_RESOLVER.to_string()
        }
    }
}

/// Moves A/AAAA entries that are syntactically domain names into the
/// CNAME set.
///
/// Broken or wildcard zones sometimes answer address queries with names;
/// leaving them in the address sets would poison CIDR matching and the
/// address-count heuristic.
pub fn normalize_address_records(records: &mut RecordSet) {
    let misplaced_a: Vec<String> = records
        .a
        .iter()
        .filter(|value| is_domain_shaped(value))
        .cloned()
        .collect();
    for value in misplaced_a {
        records.a.remove(&value);
        records.cname.insert(value);
    }

    let misplaced_aaaa: Vec<String> = records
        .aaaa
        .iter()
        .filter(|value| is_domain_shaped(value))
        .cloned()
        .collect();
    for value in misplaced_aaaa {
        records.aaaa.remove(&value);
        records.cname.insert(value);
    }
}

fn is_domain_shaped(value: &str) -> bool {
    let value = value.trim();
    value.parse::<IpAddr>().is_err() && looks_like_domain(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record_set() -> RecordSet {
        let mut records = RecordSet::default();
        records.insert(
            RecordType::A,
            ["93.184.216.34".to_string(), "93.184.216.35".to_string()],
        );
        records.insert(RecordType::CNAME, ["edge.fastly.net".to_string()]);
        records.record_error("A", "timeout");
        records
    }

    #[test]
    fn test_merge_is_idempotent() {
        let sample = sample_record_set();
        let mut once = RecordSet::default();
        once.merge(&sample);
        let mut twice = once.clone();
        twice.merge(&sample);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_absorb_probe_is_idempotent() {
        let probe = VantagePointProbe {
            city: "Beijing".to_string(),
            server: "8.8.8.8:53".to_string(),
            records: sample_record_set(),
            errors: vec!["probe timed out".to_string()],
        };

        let mut once = DomainResolutionState::new("example.com");
        once.absorb_probe(&probe);
        let mut twice = once.clone();
        twice.absorb_probe(&probe);

        assert_eq!(once.records, twice.records);
        assert_eq!(once.locations, twice.locations);
        assert_eq!(once.errors, twice.errors);
        assert!(once.locations.contains("Beijing@8.8.8.8:53"));
    }

    #[test]
    fn test_merge_resolver_sets_unions_and_relabels_errors() {
        let mut per_resolver = BTreeMap::new();
        let mut first = RecordSet::default();
        first.insert(RecordType::A, ["1.1.1.1".to_string()]);
        let mut second = RecordSet::default();
        second.insert(RecordType::A, ["2.2.2.2".to_string()]);
        second.record_error("AAAA", "timeout");
        per_resolver.insert("8.8.8.8:53".to_string(), first);
        per_resolver.insert("9.9.9.9:53".to_string(), second);

        let mut results = BTreeMap::new();
        results.insert("example.com".to_string(), per_resolver);

        let merged = merge_resolver_sets(results);
        let record_set = &merged["example.com"];
        assert_eq!(record_set.a.len(), 2);
        assert_eq!(
            record_set.errors.get("9.9.9.9:53/AAAA"),
            Some(&"timeout".to_string())
        );
    }

    #[test]
    fn test_error_on_one_resolver_keeps_values_from_another() {
        let mut per_resolver = BTreeMap::new();
        let mut good = RecordSet::default();
        good.insert(RecordType::A, ["1.1.1.1".to_string()]);
        let mut bad = RecordSet::default();
        bad.record_error("A", "connection refused");
        per_resolver.insert("good:53".to_string(), good);
        per_resolver.insert("bad:53".to_string(), bad);

        let mut results = BTreeMap::new();
        results.insert("example.com".to_string(), per_resolver);

        let merged = merge_resolver_sets(results);
        assert!(merged["example.com"].a.contains("1.1.1.1"));
        assert!(!merged["example.com"].errors.is_empty());
    }

    #[test]
    fn test_normalize_moves_domain_shaped_addresses() {
        let mut records = RecordSet::default();
        records.insert(
            RecordType::A,
            [
                "93.184.216.34".to_string(),
                "oops.wildcard.example.com".to_string(),
            ],
        );
        records.insert(RecordType::CNAME, ["oops.wildcard.example.com".to_string()]);

        normalize_address_records(&mut records);

        assert_eq!(records.a.len(), 1);
        assert!(records.a.contains("93.184.216.34"));
        // Deduplicated against the existing CNAME entry
        assert_eq!(records.cname.len(), 1);
    }

    #[test]
    fn test_record_set_is_empty_ignores_errors() {
        let mut records = RecordSet::default();
        records.record_error("A", "timeout");
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_batch_unreachable_resolver_yields_error_entries() {
        // TEST-NET-3 with a tiny timeout: every query times out, but each
        // domain must still come back with per-type error entries rather
        // than being dropped.
        let domains = vec!["example.com".to_string()];
        let resolvers = vec!["203.0.113.1:53".to_string()];
        let results = resolve_batch(
            &domains,
            &resolvers,
            &[RecordType::A, RecordType::AAAA],
            Duration::from_millis(50),
            4,
        )
        .await;

        let record_set = &results["example.com"]["203.0.113.1:53"];
        assert!(record_set.is_empty());
        assert_eq!(record_set.errors.len(), 2);
        assert!(record_set.errors.contains_key("A"));
        assert!(record_set.errors.contains_key("AAAA"));
    }
}
