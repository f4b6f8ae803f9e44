//! DNS resolution engine.
//!
//! Layered bottom-up:
//! - `resolver`: one UDP query of one record type against one resolver
//! - `chain`: CNAME chain walking and authoritative-server discovery
//! - `edns`: EDNS Client-Subnet probing against specific name servers
//! - `orchestrator`: bounded-concurrency batch fan-out and merging

mod chain;
mod edns;
mod orchestrator;
mod resolver;

pub use chain::{find_authoritative_servers, follow_cname_chain};
pub use edns::{probe_with_subnet, ProbeFragment};
pub use orchestrator::{
    merge_resolver_sets, normalize_address_records, probe_batch_with_geo_subnet, resolve_batch,
    system_resolver, DomainResolutionState, RecordSet, VantagePointProbe, DEFAULT_RECORD_TYPES,
};
pub use resolver::resolve_record;
