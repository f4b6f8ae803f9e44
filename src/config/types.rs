//! Configuration types.
//!
//! This module defines enums and structs used for command-line argument
//! parsing and library configuration.

use std::time::Duration;

use clap::ValueEnum;
use serde::Deserialize;

use crate::config::constants::{
    DNS_CONCURRENCY, DNS_TIMEOUT, EDNS_CONCURRENCY, WELL_KNOWN_RESOLVER,
};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to
/// most verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// A simulated client location used to elicit geo-varying DNS answers.
///
/// The representative address is advertised in the EDNS Client-Subnet
/// option so the answering server returns results appropriate for that
/// network, without any traffic originating there.
#[derive(Debug, Clone, Deserialize)]
pub struct VantagePoint {
    /// Human-readable location label, e.g. "Frankfurt"
    #[serde(alias = "City")]
    pub city: String,
    /// Representative IPv4 address for the location
    #[serde(alias = "IP")]
    pub ip: String,
}

impl VantagePoint {
    /// Convenience constructor used widely in tests.
    pub fn new(city: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            ip: ip.into(),
        }
    }
}

/// Library configuration (no CLI dependencies).
///
/// This is the core configuration struct consumed by the resolution
/// orchestrator. It can be constructed programmatically without any CLI
/// dependencies; loading resolver/vantage-point lists from files is the
/// binary's concern.
#[derive(Debug, Clone)]
pub struct Config {
    /// Resolver addresses for plain DNS fan-out (port optional)
    pub resolvers: Vec<String>,

    /// Vantage points for EDNS Client-Subnet probing
    pub vantage_points: Vec<VantagePoint>,

    /// Per-query timeout
    pub timeout: Duration,

    /// Maximum in-flight plain DNS queries
    pub dns_concurrency: usize,

    /// Maximum in-flight EDNS probes
    pub edns_concurrency: usize,

    /// Discover CNAME-chain tails and authoritative name servers before
    /// EDNS probing. Edge networks honor Client-Subnet on their own
    /// authoritative servers; querying only the origin's resolvers tends
    /// to return uniform, non-geo-varying answers.
    pub use_chain_discovery: bool,

    /// Use the system-configured name server for chain discovery instead
    /// of the well-known public resolver.
    pub use_system_ns: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resolvers: vec![WELL_KNOWN_RESOLVER.to_string()],
            vantage_points: Vec::new(),
            timeout: DNS_TIMEOUT,
            dns_concurrency: DNS_CONCURRENCY,
            edns_concurrency: EDNS_CONCURRENCY,
            use_chain_discovery: true,
            use_system_ns: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Error),
            log::LevelFilter::Error
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Warn),
            log::LevelFilter::Warn
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Info),
            log::LevelFilter::Info
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Debug),
            log::LevelFilter::Debug
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Trace),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.resolvers, vec![WELL_KNOWN_RESOLVER.to_string()]);
        assert_eq!(config.dns_concurrency, DNS_CONCURRENCY);
        assert_eq!(config.edns_concurrency, EDNS_CONCURRENCY);
        assert!(config.use_chain_discovery);
        assert!(!config.use_system_ns);
    }

    #[test]
    fn test_vantage_point_deserialize_aliases() {
        // Vantage-point files in the wild use capitalized keys
        let vp: VantagePoint =
            serde_json::from_str(r#"{"City": "Beijing", "IP": "114.114.114.114"}"#)
                .expect("Failed to deserialize");
        assert_eq!(vp.city, "Beijing");
        assert_eq!(vp.ip, "114.114.114.114");

        let vp: VantagePoint = serde_json::from_str(r#"{"city": "Lagos", "ip": "41.58.0.1"}"#)
            .expect("Failed to deserialize");
        assert_eq!(vp.city, "Lagos");
    }
}
