//! Outbound request guard.
//!
//! Every resolved tool URL passes through [`check_egress`] before a request is
//! built. The private-host check runs first and cannot be overridden by the
//! allow-list: a definition listing `localhost` still cannot reach it.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use url::{Host, Url};

use crate::safety::HostAllowlist;

/// Well-known cloud metadata endpoints.
const METADATA_IPV4: &[Ipv4Addr] = &[
    Ipv4Addr::new(169, 254, 169, 254), // AWS, GCP, Azure, OpenStack
    Ipv4Addr::new(100, 100, 100, 200), // Alibaba Cloud
];

/// AWS IMDS over IPv6.
const METADATA_IPV6: Ipv6Addr = Ipv6Addr::new(0xfd00, 0x0ec2, 0, 0, 0, 0, 0, 0x0254);

/// Hostnames that always refer to the local machine or provider internals.
const BLOCKED_HOSTNAMES: &[&str] = &["localhost", "metadata", "instance-data"];

/// Suffixes reserved for local or internal name resolution.
const BLOCKED_SUFFIXES: &[&str] = &[".localhost", ".local", ".internal", ".localdomain"];

/// Why an outbound request was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EgressDenial {
    #[error("unsupported URL scheme '{0}' (only http and https are allowed)")]
    UnsupportedScheme(String),

    #[error("URL has no host")]
    MissingHost,

    #[error("host '{0}' is a blocked private/internal address")]
    PrivateHost(String),

    #[error("host '{host}' is not in the allowed hosts list {allowed}")]
    NotAllowed { host: String, allowed: String },
}

/// Validate a resolved URL against the private-host blocklist and the allow-list.
///
/// Returns the normalized host on success.
pub fn check_egress(url: &Url, allowlist: &HostAllowlist) -> Result<String, EgressDenial> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(EgressDenial::UnsupportedScheme(url.scheme().to_string()));
    }

    let host = match url.host() {
        Some(Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.').to_lowercase();
            if is_blocked_hostname(&domain) {
                return Err(EgressDenial::PrivateHost(domain));
            }
            domain
        }
        Some(Host::Ipv4(ip)) => {
            if is_blocked_ip(&IpAddr::V4(ip)) {
                return Err(EgressDenial::PrivateHost(ip.to_string()));
            }
            ip.to_string()
        }
        Some(Host::Ipv6(ip)) => {
            if is_blocked_ip(&IpAddr::V6(ip)) {
                return Err(EgressDenial::PrivateHost(ip.to_string()));
            }
            ip.to_string()
        }
        None => return Err(EgressDenial::MissingHost),
    };

    if !allowlist.is_allowed(&host) {
        return Err(EgressDenial::NotAllowed {
            host,
            allowed: allowlist.to_string(),
        });
    }

    Ok(host)
}

/// Whether a hostname (already lowercased) names a local or internal target.
pub fn is_blocked_hostname(host: &str) -> bool {
    if host.is_empty() || BLOCKED_HOSTNAMES.contains(&host) {
        return true;
    }
    if BLOCKED_SUFFIXES.iter().any(|suffix| host.ends_with(suffix)) {
        return true;
    }
    // Bare IP text that slipped past URL normalization.
    host.parse::<IpAddr>().is_ok_and(|ip| is_blocked_ip(&ip))
}

/// Whether an IP address is private, loopback, link-local or otherwise non-public.
pub fn is_blocked_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_blocked_ipv4(v4),
        IpAddr::V6(v6) => {
            if let Some(embedded) = embedded_ipv4(v6)
                && is_blocked_ipv4(&embedded)
            {
                return true;
            }
            v6.is_loopback()
                || v6.is_unspecified()
                || v6.is_multicast()
                || v6.is_unique_local()
                || v6.is_unicast_link_local()
                // fec0::/10 deprecated site-local
                || (v6.segments()[0] & 0xffc0) == 0xfec0
                || *v6 == METADATA_IPV6
        }
    }
}

/// IPv4 address carried inside an IPv6 one, if any.
///
/// Covers IPv4-mapped `::ffff:a.b.c.d`, IPv4-compatible `::a.b.c.d`,
/// NAT64 `64:ff9b::/96` and 6to4 `2002::/16`.
fn embedded_ipv4(v6: &Ipv6Addr) -> Option<Ipv4Addr> {
    let [s0, s1, s2, s3, s4, s5, s6, s7] = v6.segments();
    let from_segments = |hi: u16, lo: u16| Ipv4Addr::from((u32::from(hi) << 16) | u32::from(lo));
    match (s0, s1, s2, s3, s4, s5) {
        (0, 0, 0, 0, 0, 0 | 0xffff) => Some(from_segments(s6, s7)),
        (0x64, 0xff9b, 0, 0, 0, 0) => Some(from_segments(s6, s7)),
        (0x2002, ..) => Some(from_segments(s1, s2)),
        _ => None,
    }
}

fn is_blocked_ipv4(v4: &Ipv4Addr) -> bool {
    let [a, b, ..] = v4.octets();
    v4.is_private()
        || v4.is_loopback()
        || v4.is_link_local()
        || v4.is_multicast()
        || v4.is_unspecified()
        || v4.is_broadcast()
        // 0.0.0.0/8 "this network"
        || a == 0
        // 100.64.0.0/10 carrier-grade NAT
        || (a == 100 && (b & 0xc0) == 64)
        || METADATA_IPV4.contains(v4)
}
