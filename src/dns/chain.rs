//! CNAME chain walking and authoritative name-server discovery.
//!
//! CDN-fronted domains are usually a CNAME away from the real edge
//! network, and it is that network's authoritative servers which honor
//! EDNS Client-Subnet. Both procedures here exist to find the right name
//! and the right servers to probe.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{anyhow, Result};
use hickory_proto::rr::{RData, RecordType};
use log::debug;

use crate::dns::resolver::{build_query, exchange, resolve_record, strip_dot};

/// Follows the CNAME chain from `domain` until no further alias is found
/// or a name repeats.
///
/// The returned chain always starts with the input name, so it has length
/// ≥ 1 even when every query fails. A visited set guarantees termination
/// on cyclic alias graphs: the chain contains each distinct name exactly
/// once, in discovery order.
pub async fn follow_cname_chain(domain: &str, resolver: &str, timeout: Duration) -> Vec<String> {
    let mut chain = Vec::new();
    let mut visited = HashSet::new();
    let mut current = domain.trim_end_matches('.').to_string();

    loop {
        if !visited.insert(current.clone()) {
            break;
        }
        chain.push(current.clone());

        match resolve_record(&current, resolver, RecordType::CNAME, timeout).await {
            Ok(cnames) => match cnames.into_iter().next() {
                Some(next) => current = next,
                None => break,
            },
            Err(e) => {
                debug!("CNAME lookup failed for {current}: {e}");
                break;
            }
        }
    }

    chain
}

/// Finds the authoritative name servers for `domain` by walking up the
/// label hierarchy.
///
/// For each suffix of the name (the full name first, then each parent
/// toward the root) the suffix is queried for NS records; the first level
/// that yields any server names wins. Answer-section NS targets are
/// preferred; when a level answers with only an authority section, its NS
/// targets and SOA primary name server are used instead.
///
/// Fails only when no ancestor produced a result.
pub async fn find_authoritative_servers(
    domain: &str,
    resolver: &str,
    timeout: Duration,
) -> Result<Vec<String>> {
    let domain = domain.trim_matches('.');
    let labels: Vec<&str> = domain.split('.').collect();

    for i in 0..labels.len() {
        let parent = labels[i..].join(".");
        match query_ns_servers(&parent, resolver, timeout).await {
            Ok(servers) if !servers.is_empty() => return Ok(servers),
            Ok(_) => continue,
            Err(e) => {
                debug!("NS lookup failed for {parent}: {e}");
                continue;
            }
        }
    }

    Err(anyhow!("no NS record found for any parent of {domain}"))
}

/// One NS query: answer-section NS records, falling back to the authority
/// section (NS targets and SOA MNAME).
async fn query_ns_servers(domain: &str, resolver: &str, timeout: Duration) -> Result<Vec<String>> {
    let message = build_query(domain, RecordType::NS)?;
    let response = exchange(&message, resolver, timeout).await?;

    let mut servers: Vec<String> = response
        .answers()
        .iter()
        .filter_map(|record| match record.data() {
            RData::NS(ns) => Some(strip_dot(&ns.0.to_utf8())),
            _ => None,
        })
        .collect();

    if servers.is_empty() {
        for record in response.name_servers() {
            match record.data() {
                RData::NS(ns) => servers.push(strip_dot(&ns.0.to_utf8())),
                RData::SOA(soa) => servers.push(strip_dot(&soa.mname().to_utf8())),
                _ => {}
            }
        }
    }

    Ok(servers)
}
