//! Single-record DNS resolution over UDP.
//!
//! This is the lowest layer of the resolution engine: one query of one
//! record type against one resolver, with a per-call timeout. Answers are
//! normalized into plain strings so the layers above never touch wire
//! types.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{Name, RData, Record, RecordType};
use tokio::net::UdpSocket;

use crate::config::constants::{DNS_PORT, MAX_DNS_PAYLOAD};

/// Appends the conventional DNS port to a server address that has none,
/// and strips trailing dots left over from NS-record answers.
pub(crate) fn ensure_port(server: &str) -> String {
    let server = server.trim_end_matches('.').to_lowercase();
    if server.contains(':') {
        return server;
    }
    format!("{server}:{DNS_PORT}")
}

/// Builds a plain recursive query for `domain` / `record_type`.
pub(crate) fn build_query(domain: &str, record_type: RecordType) -> Result<Message> {
    let mut name = Name::from_utf8(domain)
        .with_context(|| format!("Invalid domain name: {domain}"))?;
    name.set_fqdn(true);

    let mut message = Message::new();
    message
        .set_id(rand::random::<u16>())
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true)
        .add_query(Query::query(name, record_type));
    Ok(message)
}

/// Resolves a server specification into a socket address. Discovered
/// authoritative servers arrive as hostnames, so a non-literal address
/// falls back to system resolution.
async fn server_socket_addr(server: &str, timeout: Duration) -> Result<SocketAddr> {
    let server = ensure_port(server);
    if let Ok(addr) = server.parse() {
        return Ok(addr);
    }
    let mut addrs = tokio::time::timeout(timeout, tokio::net::lookup_host(&server))
        .await
        .map_err(|_| anyhow!("Resolving name server {server} timed out"))?
        .with_context(|| format!("Failed to resolve name server {server}"))?;
    addrs
        .next()
        .ok_or_else(|| anyhow!("No address found for name server {server}"))
}

/// Sends a DNS message to `server` over UDP and waits for the response.
///
/// A fresh ephemeral socket is used per exchange; the timeout covers the
/// round trip. Responses whose id does not match the query are dropped
/// until the deadline expires.
pub(crate) async fn exchange(
    message: &Message,
    server: &str,
    timeout: Duration,
) -> Result<Message> {
    let server_addr = server_socket_addr(server, timeout).await?;

    let bind_addr = if server_addr.is_ipv4() {
        "0.0.0.0:0"
    } else {
        "[::]:0"
    };
    let socket = UdpSocket::bind(bind_addr)
        .await
        .context("Failed to bind UDP socket")?;

    let payload = message.to_vec().context("Failed to encode DNS query")?;
    socket
        .send_to(&payload, server_addr)
        .await
        .with_context(|| format!("Failed to send query to {server_addr}"))?;

    let mut buf = vec![0u8; MAX_DNS_PAYLOAD as usize];
    tokio::time::timeout(timeout, async {
        loop {
            let (len, from) = socket
                .recv_from(&mut buf)
                .await
                .context("Failed to receive DNS response")?;
            if from != server_addr {
                continue;
            }
            let response =
                Message::from_vec(&buf[..len]).context("Failed to decode DNS response")?;
            if response.id() == message.id() {
                return Ok::<Message, anyhow::Error>(response);
            }
        }
    })
    .await
    .map_err(|_| anyhow!("Query to {server_addr} timed out after {timeout:?}"))?
}

/// Resolves one record type for a domain against a specific resolver.
///
/// Returns the normalized answer strings. Every answer-section record of a
/// supported type is included, so an A query that traverses a CNAME also
/// surfaces the alias targets. Errors (timeouts, transport failures, bad
/// names) are returned as values for the caller to record per type.
pub async fn resolve_record(
    domain: &str,
    resolver: &str,
    record_type: RecordType,
    timeout: Duration,
) -> Result<Vec<String>> {
    let message = build_query(domain, record_type)?;
    let response = exchange(&message, resolver, timeout).await?;
    Ok(extract_answers(response.answers()))
}

/// Normalizes a slice of answer records into strings.
///
/// Names lose their trailing dot so later case-insensitive string
/// comparisons behave; MX renders as `"preference exchange"`; the
/// character strings of a TXT record are joined.
pub(crate) fn extract_answers(records: &[Record]) -> Vec<String> {
    records.iter().filter_map(record_to_string).collect()
}

pub(crate) fn record_to_string(record: &Record) -> Option<String> {
    match record.data() {
        RData::A(a) => Some(a.0.to_string()),
        RData::AAAA(aaaa) => Some(aaaa.0.to_string()),
        RData::CNAME(cname) => Some(strip_dot(&cname.0.to_utf8())),
        RData::NS(ns) => Some(strip_dot(&ns.0.to_utf8())),
        RData::MX(mx) => Some(format!(
            "{} {}",
            mx.preference(),
            strip_dot(&mx.exchange().to_utf8())
        )),
        RData::TXT(txt) => Some(
            txt.iter()
                .map(|bytes| String::from_utf8_lossy(bytes).to_string())
                .collect::<Vec<_>>()
                .join(""),
        ),
        _ => None,
    }
}

pub(crate) fn strip_dot(name: &str) -> String {
    name.trim_end_matches('.').to_string()
}
