//! cdn_radar library: DNS/EDNS reconnaissance and provider classification.
//!
//! This library resolves batches of targets across multiple resolvers and
//! simulated geographic vantage points (EDNS Client Subnet), enriches the
//! answers with ASN and geolocation data, and classifies every target
//! against a CDN/WAF/Cloud provider database.
//!
//! # Example
//!
//! ```no_run
//! use cdn_radar::{classify_targets, run_check, CompiledProviderDb, Config, ProviderDatabase};
//! use cdn_radar::geoip::NoEnrichment;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let targets = classify_targets(["example.com", "93.184.216.34"]);
//! let db = CompiledProviderDb::compile(&ProviderDatabase::default());
//!
//! let report = run_check(&config, targets, &db, &NoEnrichment, &NoEnrichment).await?;
//! println!("{} targets checked", report.records.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! The resolution entry points need a Tokio runtime; use `#[tokio::main]`
//! or call them from within an async context.

#![warn(missing_docs)]

pub mod classify;
pub mod config;
pub mod dns;
mod error_handling;
pub mod export;
pub mod geoip;
mod initialization;
mod input;
mod models;

// Re-export public API
pub use classify::{
    address_count_heuristic, classify, ClassificationResult, CompiledProviderDb,
    ProviderDatabase, ProviderSignalSet,
};
pub use config::{Config, LogFormat, LogLevel, VantagePoint};
pub use error_handling::{DatabaseError, InitializationError};
pub use initialization::init_logger_with;
pub use input::{classify_targets, ClassifiedTargets};
pub use models::{CheckRecord, TargetEntry};
pub use run::{run_check, CheckReport};

// Internal run module (wires resolution, enrichment, and classification)
mod run {
    use std::collections::BTreeSet;
    use std::time::Instant;

    use anyhow::Result;
    use log::{info, warn};

    use crate::classify::{classify, CompiledProviderDb, ProviderSignalSet};
    use crate::config::Config;
    use crate::dns::{
        merge_resolver_sets, normalize_address_records, probe_batch_with_geo_subnet,
        resolve_batch, DomainResolutionState, DEFAULT_RECORD_TYPES,
    };
    use crate::error_handling::InitializationError;
    use crate::geoip::{AsnLookup, IpLocator};
    use crate::input::ClassifiedTargets;
    use crate::models::CheckRecord;

    /// Results of a batch check.
    #[derive(Debug)]
    pub struct CheckReport {
        /// One record per valid target, in input-bucket order (domains
        /// first, then IPs)
        pub records: Vec<CheckRecord>,
        /// Lines that classified as neither IP nor domain
        pub invalid: Vec<String>,
        /// Elapsed wall-clock seconds
        pub elapsed_seconds: f64,
    }

    /// Runs the full pipeline for a classified target batch.
    ///
    /// Domain targets go through the resolution orchestrator (plain DNS
    /// fan-out and, when vantage points are configured, EDNS probing);
    /// IP targets skip straight to enrichment. Every valid target yields
    /// a record; an unresolvable domain produces one with empty values
    /// and populated error entries, never an omission.
    ///
    /// # Errors
    ///
    /// Fails only on unusable configuration (no resolvers). Individual
    /// query failures are recorded in the per-target records.
    pub async fn run_check(
        config: &Config,
        targets: ClassifiedTargets,
        provider_db: &CompiledProviderDb,
        locator: &dyn IpLocator,
        asn_lookup: &dyn AsnLookup,
    ) -> Result<CheckReport> {
        if config.resolvers.is_empty() {
            return Err(InitializationError::NoResolvers.into());
        }

        let start = Instant::now();
        let domains: Vec<String> = targets
            .domains
            .iter()
            .map(|entry| entry.normalized.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        info!(
            "Checking {} domain(s) and {} IP(s) against {} resolver(s), {} vantage point(s)",
            domains.len(),
            targets.ips.len(),
            config.resolvers.len(),
            config.vantage_points.len()
        );

        // Plain DNS and EDNS fan-outs are independent; run them side by
        // side, each bounded by its own concurrency ceiling.
        let dns_batch = resolve_batch(
            &domains,
            &config.resolvers,
            &DEFAULT_RECORD_TYPES,
            config.timeout,
            config.dns_concurrency,
        );
        let edns_batch = probe_batch_with_geo_subnet(
            &domains,
            &config.vantage_points,
            config.timeout,
            config.edns_concurrency,
            config.use_chain_discovery,
            config.use_system_ns,
        );
        let (dns_results, edns_states) = if config.vantage_points.is_empty() {
            (dns_batch.await, Default::default())
        } else {
            tokio::join!(dns_batch, edns_batch)
        };
        let dns_merged = merge_resolver_sets(dns_results);

        let mut records = Vec::with_capacity(targets.domains.len() + targets.ips.len());

        for entry in &targets.domains {
            // Looked up rather than consumed: the same normalized domain
            // may appear behind several raw inputs.
            let mut state = edns_states
                .get(&entry.normalized)
                .cloned()
                .unwrap_or_else(|| DomainResolutionState::new(&entry.normalized));
            if let Some(record_set) = dns_merged.get(&entry.normalized) {
                state.absorb_record_set(record_set);
            }
            for (i, message) in state.errors.iter().enumerate() {
                state.records.record_error(format!("edns_error_{i}"), message.clone());
            }
            normalize_address_records(&mut state.records);

            if state.records.is_empty() {
                warn!("No DNS records resolved for {}", entry.normalized);
            }

            let signals =
                ProviderSignalSet::from_record_set(&state.records, locator, asn_lookup);

            let mut record = CheckRecord::for_target(entry);
            record.a = state.records.a.clone();
            record.aaaa = state.records.aaaa.clone();
            record.cname = state.records.cname.clone();
            record.ns = state.records.ns.clone();
            record.mx = state.records.mx.clone();
            record.txt = state.records.txt.clone();
            record.errors = state.records.errors.clone();
            record.locations = signals.locations.clone();
            record.asns = signals.asns.clone();
            record.asn_orgs = signals.asn_orgs.clone();
            record.classification = classify(&signals, provider_db);
            records.push(record);
        }

        for entry in &targets.ips {
            let signals = ProviderSignalSet::from_address(&entry.normalized, locator, asn_lookup);

            let mut record = CheckRecord::for_target(entry);
            if entry.is_ipv4 {
                record.a.insert(entry.normalized.clone());
            } else {
                record.aaaa.insert(entry.normalized.clone());
            }
            record.locations = signals.locations.clone();
            record.asns = signals.asns.clone();
            record.asn_orgs = signals.asn_orgs.clone();
            record.classification = classify(&signals, provider_db);
            records.push(record);
        }

        let elapsed_seconds = start.elapsed().as_secs_f64();
        let matched = records
            .iter()
            .filter(|r| {
                r.classification.is_cdn || r.classification.is_waf || r.classification.is_cloud
            })
            .count();
        info!(
            "Checked {} target(s) in {:.1}s ({} matched a provider)",
            records.len(),
            elapsed_seconds,
            matched
        );

        Ok(CheckReport {
            records,
            invalid: targets.invalid,
            elapsed_seconds,
        })
    }
}
