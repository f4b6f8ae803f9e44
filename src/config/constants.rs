//! Configuration constants.
//!
//! This module defines the defaults used throughout the crate: network
//! timeouts, concurrency ceilings, and classification thresholds.

use std::time::Duration;

/// Conventional DNS port, appended to resolver addresses that carry none.
pub const DNS_PORT: u16 = 53;

/// Well-known public resolver used for chain discovery and as the EDNS
/// fallback when no authoritative servers were found.
pub const WELL_KNOWN_RESOLVER: &str = "8.8.8.8:53";

/// Per-query DNS timeout.
///
/// Most queries complete in well under a second; 3s provides buffer while
/// still failing fast on unresponsive resolvers.
pub const DNS_TIMEOUT: Duration = Duration::from_secs(3);

/// Maximum in-flight plain DNS queries (semaphore limit).
pub const DNS_CONCURRENCY: usize = 50;

/// Maximum in-flight EDNS probes (semaphore limit).
///
/// Sized larger than the plain DNS ceiling because the EDNS cross-product
/// (domain × vantage point × name server × record type) is much wider.
pub const EDNS_CONCURRENCY: usize = 100;

/// Number of distinct resolved addresses above which the address-count
/// heuristic flags a target. The flag is informational only and is never
/// merged into a confirmed category match.
pub const ADDRESS_COUNT_THRESHOLD: usize = 3;

/// UDP payload size advertised in EDNS queries and used for receive buffers.
pub const MAX_DNS_PAYLOAD: u16 = 4096;

/// EDNS Client-Subnet source prefix length advertised in probes.
pub const ECS_SOURCE_PREFIX: u8 = 24;
