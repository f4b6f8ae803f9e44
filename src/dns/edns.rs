//! EDNS Client-Subnet probing.
//!
//! A probe carries an EDNS Client-Subnet option that presents the query as
//! originating from a vantage point's network, so topology-aware name
//! servers answer with the addresses they would hand a client there.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Result};
use hickory_proto::op::{Edns, Message};
use hickory_proto::rr::rdata::opt::{ClientSubnet, EdnsOption};
use hickory_proto::rr::{RData, RecordType};

use crate::config::constants::{ECS_SOURCE_PREFIX, MAX_DNS_PAYLOAD};
use crate::dns::resolver::{build_query, exchange, record_to_string, strip_dot};

/// Outcome of a single EDNS probe. A transport failure yields an empty
/// value list plus the error string; it never aborts sibling probes.
#[derive(Debug, Clone)]
pub struct ProbeFragment {
    /// Record type the probe asked for
    pub record_type: RecordType,
    /// Normalized answers of the requested type
    pub values: Vec<String>,
    /// Error message when the exchange failed
    pub error: Option<String>,
}

impl ProbeFragment {
    fn failed(record_type: RecordType, error: String) -> Self {
        Self {
            record_type,
            values: Vec::new(),
            error: Some(error),
        }
    }
}

/// Builds a query for `domain`/`record_type` carrying an EDNS
/// Client-Subnet option for the vantage address: IPv4 family, /24 source
/// prefix, scope 0.
pub(crate) fn build_subnet_query(
    domain: &str,
    vantage_addr: &str,
    record_type: RecordType,
) -> Result<Message> {
    let subnet = ClientSubnet::from_str(&format!("{vantage_addr}/{ECS_SOURCE_PREFIX}"))
        .map_err(|e| anyhow!("Invalid vantage address {vantage_addr}: {e}"))?;

    let mut message = build_query(domain, record_type)?;
    let edns = message.extensions_mut().get_or_insert_with(Edns::new);
    edns.set_max_payload(MAX_DNS_PAYLOAD);
    edns.set_version(0);
    edns.options_mut().insert(EdnsOption::Subnet(subnet));
    Ok(message)
}

/// Issues one EDNS Client-Subnet probe against a specific name server.
///
/// Extracts answers of the requested type; NS probes additionally scan the
/// authority section, where delegating servers place NS and SOA records.
pub async fn probe_with_subnet(
    domain: &str,
    vantage_addr: &str,
    name_server: &str,
    record_type: RecordType,
    timeout: Duration,
) -> ProbeFragment {
    let message = match build_subnet_query(domain, vantage_addr, record_type) {
        Ok(message) => message,
        Err(e) => return ProbeFragment::failed(record_type, e.to_string()),
    };

    let response = match exchange(&message, name_server, timeout).await {
        Ok(response) => response,
        Err(e) => return ProbeFragment::failed(record_type, e.to_string()),
    };

    let mut values: Vec<String> = response
        .answers()
        .iter()
        .filter(|record| record.record_type() == record_type)
        .filter_map(record_to_string)
        .collect();

    if record_type == RecordType::NS {
        for record in response.name_servers() {
            match record.data() {
                RData::NS(ns) => values.push(strip_dot(&ns.0.to_utf8())),
                RData::SOA(soa) => values.push(strip_dot(&soa.mname().to_utf8())),
                _ => {}
            }
        }
    }

    ProbeFragment {
        record_type,
        values,
        error: None,
    }
}
