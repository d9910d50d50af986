//! DNS resolution that refuses private answers.
//!
//! [`check_egress`](crate::safety::check_egress) only sees the hostname text.
//! An allow-listed name can still resolve to a loopback or metadata address,
//! so the executor's client resolves through [`GuardedResolver`], which fails
//! the lookup when any answer is blocked. The check happens at connect time,
//! so a name cannot change its answer between the check and the request.

use std::net::SocketAddr;

use reqwest::dns::{Addrs, Name, Resolve, Resolving};

use crate::safety::is_blocked_ip;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A resolved name that pointed at a non-public address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("host '{host}' resolves to blocked address {addr}")]
pub struct BlockedResolution {
    pub host: String,
    pub addr: std::net::IpAddr,
}

/// System resolver with the private-address blocklist applied to every answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuardedResolver;

impl Resolve for GuardedResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(resolve_guarded(name.as_str().to_string()))
    }
}

async fn resolve_guarded(host: String) -> Result<Addrs, BoxError> {
    let addrs = tokio::net::lookup_host((host.as_str(), 0)).await?;
    let addrs: Addrs = Box::new(screen_addrs(&host, addrs)?.into_iter());
    Ok(addrs)
}

/// Reject the whole answer if any address is blocked.
pub fn screen_addrs(
    host: &str,
    addrs: impl IntoIterator<Item = SocketAddr>,
) -> Result<Vec<SocketAddr>, BlockedResolution> {
    let addrs: Vec<SocketAddr> = addrs.into_iter().collect();
    if let Some(blocked) = addrs.iter().find(|addr| is_blocked_ip(&addr.ip())) {
        tracing::warn!(host, addr = %blocked.ip(), "DNS answer points at a blocked address");
        return Err(BlockedResolution {
            host: host.to_string(),
            addr: blocked.ip(),
        });
    }
    Ok(addrs)
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use super::*;

    fn addr(ip: &str) -> SocketAddr {
        SocketAddr::new(ip.parse().unwrap(), 0)
    }

    #[test]
    fn test_public_answer_passes() {
        let addrs = screen_addrs("api.example.com", [addr("93.184.216.34")]).unwrap();
        assert_eq!(addrs, vec![addr("93.184.216.34")]);
    }

    #[test]
    fn test_loopback_answer_rejected() {
        let err = screen_addrs("rebind.example.com", [addr("127.0.0.1")]).unwrap_err();
        assert_eq!(err.addr, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert!(err.to_string().contains("rebind.example.com"));
    }

    #[test]
    fn test_mixed_answer_rejected() {
        let answer = [addr("93.184.216.34"), addr("169.254.169.254")];
        assert!(screen_addrs("api.example.com", answer).is_err());

        let answer = [addr("2606:4700::1111"), addr("::ffff:10.0.0.1")];
        assert!(screen_addrs("api.example.com", answer).is_err());
    }

    #[tokio::test]
    async fn test_resolver_refuses_loopback() {
        // A literal needs no DNS server; the answer is the loopback address itself.
        let err = resolve_guarded("127.0.0.1".to_string()).await.err().unwrap();
        assert!(err.to_string().contains("blocked address 127.0.0.1"), "{err}");
    }
}
