//! Client address resolution behind reverse proxies.
//!
//! Forwarding headers are only honoured when the peer that sent them is
//! trusted. With [`ProxyTrust::None`] the peer address is the client.

use std::net::IpAddr;
use std::str::FromStr;

use http::header::{HeaderMap, HeaderName};
use thiserror::Error;

/// `X-Forwarded-For`.
pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// `X-Real-IP`.
pub const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");

/// Returned when a trusted range does not parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid trusted proxy range `{input}`: {reason}")]
pub struct InvalidRange {
    /// The rejected text.
    pub input: String,
    /// Why it was rejected.
    pub reason: &'static str,
}

/// An address or CIDR block, e.g. `10.0.0.0/8`, `::1` or `fd00::/8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrustedRange {
    network: IpAddr,
    prefix: u8,
}

impl TrustedRange {
    /// Returns true if `ip` falls inside the range.
    #[must_use]
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.network, canonical(ip)) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let mask = prefix_mask_u32(self.prefix);
                u32::from(net) & mask == u32::from(ip) & mask
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let mask = prefix_mask_u128(self.prefix);
                u128::from(net) & mask == u128::from(ip) & mask
            }
            _ => false,
        }
    }

    /// Returns the prefix length in bits.
    #[must_use]
    pub const fn prefix_len(&self) -> u8 {
        self.prefix
    }
}

impl FromStr for TrustedRange {
    type Err = InvalidRange;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| InvalidRange {
            input: s.to_owned(),
            reason,
        };
        let (addr, prefix) = match s.trim().split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (s.trim(), None),
        };
        let network = canonical(addr.parse::<IpAddr>().map_err(|_| invalid("not an IP address"))?);
        let max = if network.is_ipv4() { 32 } else { 128 };
        let prefix = match prefix {
            Some(p) => p.parse::<u8>().map_err(|_| invalid("prefix is not a number"))?,
            None => max,
        };
        if prefix > max {
            return Err(invalid("prefix is longer than the address"));
        }
        Ok(Self { network, prefix })
    }
}

/// Maps IPv4-mapped IPv6 addresses onto plain IPv4.
fn canonical(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map_or(ip, IpAddr::V4),
        IpAddr::V4(_) => ip,
    }
}

fn prefix_mask_u32(prefix: u8) -> u32 {
    u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0)
}

fn prefix_mask_u128(prefix: u8) -> u128 {
    u128::MAX.checked_shl(128 - u32::from(prefix)).unwrap_or(0)
}

/// Which peers may supply forwarding headers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProxyTrust {
    /// Ignore forwarding headers.
    #[default]
    None,
    /// Trust every peer.
    All,
    /// Trust peers inside the listed ranges.
    Listed(Vec<TrustedRange>),
}

/// Client address resolution settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyOptions {
    /// Trust mode.
    pub trust: ProxyTrust,
    /// Header carrying the forwarding chain.
    pub forwarded_for: HeaderName,
    /// Header carrying a single client address.
    pub real_ip: HeaderName,
}

impl Default for ProxyOptions {
    fn default() -> Self {
        Self {
            trust: ProxyTrust::None,
            forwarded_for: X_FORWARDED_FOR,
            real_ip: X_REAL_IP,
        }
    }
}

impl ProxyOptions {
    /// Trusts forwarding headers from every peer.
    #[must_use]
    pub fn trust_all() -> Self {
        Self {
            trust: ProxyTrust::All,
            ..Self::default()
        }
    }

    /// Trusts forwarding headers from peers inside `ranges`.
    #[must_use]
    pub fn trust_listed(ranges: impl IntoIterator<Item = TrustedRange>) -> Self {
        Self {
            trust: ProxyTrust::Listed(ranges.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Returns true if `ip` is a trusted proxy.
    #[must_use]
    pub fn is_trusted(&self, ip: IpAddr) -> bool {
        match &self.trust {
            ProxyTrust::None => false,
            ProxyTrust::All => true,
            ProxyTrust::Listed(ranges) => ranges.iter().any(|r| r.contains(ip)),
        }
    }

    /// Resolves the client address of a request received from `peer`.
    #[must_use]
    pub fn client_ip(&self, peer: Option<IpAddr>, headers: &HeaderMap) -> Option<IpAddr> {
        let peer_trusted = match (&self.trust, peer) {
            (ProxyTrust::None, _) => false,
            (ProxyTrust::All, _) => true,
            (ProxyTrust::Listed(_), Some(ip)) => self.is_trusted(ip),
            (ProxyTrust::Listed(_), None) => false,
        };
        if !peer_trusted {
            return peer;
        }

        let chain = self.forwarded_chain(headers);
        let from_chain = match self.trust {
            ProxyTrust::Listed(_) => chain
                .iter()
                .rev()
                .copied()
                .find(|ip| !self.is_trusted(*ip))
                .or_else(|| chain.first().copied()),
            _ => chain.first().copied(),
        };

        from_chain
            .or_else(|| header_ip(headers, &self.real_ip))
            .or(peer)
    }

    fn forwarded_chain(&self, headers: &HeaderMap) -> Vec<IpAddr> {
        headers
            .get_all(&self.forwarded_for)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .filter_map(parse_forwarded)
            .collect()
    }
}

fn header_ip(headers: &HeaderMap, name: &HeaderName) -> Option<IpAddr> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_forwarded)
}

/// Parses `1.2.3.4`, `1.2.3.4:80`, `::1` or `[::1]:80`.
fn parse_forwarded(raw: &str) -> Option<IpAddr> {
    let raw = raw.trim();
    raw.parse::<IpAddr>()
        .ok()
        .or_else(|| raw.parse::<std::net::SocketAddr>().ok().map(|s| s.ip()))
        .map(canonical)
}
