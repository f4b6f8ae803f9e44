//! Input target splitting.
//!
//! Raw input lines arrive as bare domains, bare IPs, `host:port` pairs, or
//! full URLs. This module normalizes each line and buckets it into typed
//! IP / domain entries (invalid lines are kept for reporting).

use std::net::IpAddr;

use log::debug;
use url::Url;

use crate::models::TargetEntry;

/// Split result: typed entries plus the lines that fit neither bucket.
#[derive(Debug, Default)]
pub struct ClassifiedTargets {
    /// Targets that normalized to an IP address
    pub ips: Vec<TargetEntry>,
    /// Targets that normalized to a domain name
    pub domains: Vec<TargetEntry>,
    /// Lines that could not be normalized
    pub invalid: Vec<String>,
}

impl ClassifiedTargets {
    /// Total number of classified lines.
    pub fn total(&self) -> usize {
        self.ips.len() + self.domains.len() + self.invalid.len()
    }
}

/// Splits raw target strings into IP, domain, and invalid buckets.
pub fn classify_targets<I, S>(targets: I) -> ClassifiedTargets
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut classified = ClassifiedTargets::default();

    for target in targets {
        let raw = target.as_ref().trim();
        if raw.is_empty() || raw.starts_with('#') {
            continue;
        }

        let (host, from_url) = extract_host(raw);
        let Some(host) = host else {
            debug!("Unclassifiable target: {raw}");
            classified.invalid.push(raw.to_string());
            continue;
        };

        match host.parse::<IpAddr>() {
            Ok(addr) => classified.ips.push(TargetEntry::ip(
                raw,
                addr.to_string(),
                addr.is_ipv4(),
                from_url,
            )),
            Err(_) if looks_like_domain(&host) => {
                classified
                    .domains
                    .push(TargetEntry::domain(raw, host.to_lowercase(), from_url));
            }
            Err(_) => {
                debug!("Unclassifiable target: {raw}");
                classified.invalid.push(raw.to_string());
            }
        }
    }

    classified
}

/// Pulls the host out of a raw target, unwrapping URL and `host:port`
/// forms. Returns the host and whether the input was a URL.
fn extract_host(raw: &str) -> (Option<String>, bool) {
    if raw.contains("://") {
        let host = Url::parse(raw)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.trim_matches(&['[', ']'][..]).to_string()));
        return (host, true);
    }

    // Bare IPv6 addresses contain colons; only treat a single colon as a
    // port separator.
    if raw.matches(':').count() == 1 {
        if let Some((host, port)) = raw.rsplit_once(':') {
            if port.chars().all(|c| c.is_ascii_digit()) && !port.is_empty() {
                return (Some(host.to_string()), false);
            }
        }
    }

    (Some(raw.to_string()), false)
}

/// Loose domain shape check: dot-separated labels of letters, digits,
/// hyphens, underscores, or wildcard stars.
pub(crate) fn looks_like_domain(s: &str) -> bool {
    let s = s.trim_end_matches('.');
    if !s.contains('.') {
        return false;
    }
    s.split('.').all(|label| {
        !label.is_empty()
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '*'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_buckets() {
        let classified = classify_targets([
            "example.com",
            "93.184.216.34",
            "https://cdn.example.org/path?x=1",
            "http://10.0.0.1:8080/admin",
            "host.example.net:443",
            "2606:4700::6810:84e5",
            "not a target",
            "",
            "# comment",
        ]);

        assert_eq!(classified.domains.len(), 3);
        assert_eq!(classified.ips.len(), 3);
        assert_eq!(classified.invalid, vec!["not a target".to_string()]);
        assert_eq!(classified.total(), 7);
    }

    #[test]
    fn test_url_targets_marked_from_url() {
        let classified = classify_targets(["https://Example.COM/login"]);
        let entry = &classified.domains[0];
        assert!(entry.from_url);
        assert_eq!(entry.normalized, "example.com");
        assert_eq!(entry.raw, "https://Example.COM/login");
    }

    #[test]
    fn test_ipv6_not_split_on_colon() {
        let classified = classify_targets(["2001:db8::1"]);
        assert_eq!(classified.ips.len(), 1);
        assert!(!classified.ips[0].is_ipv4);
    }

    #[test]
    fn test_port_stripped_from_ipv4() {
        let classified = classify_targets(["192.0.2.7:8443"]);
        assert_eq!(classified.ips.len(), 1);
        assert_eq!(classified.ips[0].normalized, "192.0.2.7");
        assert!(classified.ips[0].is_ipv4);
    }

    #[test]
    fn test_wildcard_domain_accepted() {
        let classified = classify_targets(["*.edge.example.com"]);
        assert_eq!(classified.domains.len(), 1);
    }
}
