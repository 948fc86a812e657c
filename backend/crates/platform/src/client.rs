//! Client identification utilities
//!
//! Resolves the caller's IP behind a reverse proxy and checks it against
//! CIDR allow lists (payment gateways publish the ranges they post from).

use axum::http::HeaderMap;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

/// Extract client IP address from headers
///
/// Checks `X-Forwarded-For` (first hop), then `X-Real-IP`, then falls back
/// to the direct connection address.
pub fn extract_client_ip(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> Option<IpAddr> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|xff| xff.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<IpAddr>().ok())
    };

    forwarded.or_else(real_ip).or(direct_ip)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid IPv4 CIDR: {0}")]
pub struct InvalidCidr(pub String);

/// IPv4 network in CIDR notation. A bare address is a /32.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Cidr {
    network: u32,
    prefix: u8,
}

impl Ipv4Cidr {
    fn mask(&self) -> u32 {
        if self.prefix == 0 {
            0
        } else {
            u32::MAX << (32 - self.prefix)
        }
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        (u32::from(ip) & self.mask()) == (self.network & self.mask())
    }
}

impl FromStr for Ipv4Cidr {
    type Err = InvalidCidr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (addr, prefix) = match s.split_once('/') {
            Some((addr, prefix)) => (
                addr,
                prefix.parse::<u8>().map_err(|_| InvalidCidr(s.to_string()))?,
            ),
            None => (s, 32),
        };
        if prefix > 32 {
            return Err(InvalidCidr(s.to_string()));
        }
        let addr: Ipv4Addr = addr.parse().map_err(|_| InvalidCidr(s.to_string()))?;
        Ok(Self {
            network: u32::from(addr),
            prefix,
        })
    }
}

/// Set of IPv4 ranges. IPv6 callers and IPv4-mapped addresses are handled.
#[derive(Debug, Clone, Default)]
pub struct IpAllowList {
    ranges: Vec<Ipv4Cidr>,
}

impl IpAllowList {
    pub fn parse<I, S>(ranges: I) -> Result<Self, InvalidCidr>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ranges = ranges
            .into_iter()
            .map(|r| r.as_ref().parse())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { ranges })
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        let v4 = match ip {
            IpAddr::V4(v4) => v4,
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => v4,
                None => return false,
            },
        };
        self.ranges.iter().any(|range| range.contains(v4))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn client_ip_from_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("197.97.145.150, 10.0.0.1"),
        );
        let ip = extract_client_ip(&headers, None);
        assert_eq!(ip, Some("197.97.145.150".parse().unwrap()));
    }

    #[test]
    fn client_ip_from_real_ip_then_direct() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("41.74.179.200"));
        assert_eq!(
            extract_client_ip(&headers, None),
            Some("41.74.179.200".parse().unwrap())
        );

        let direct: IpAddr = "127.0.0.1".parse().unwrap();
        assert_eq!(extract_client_ip(&HeaderMap::new(), Some(direct)), Some(direct));
    }

    #[test]
    fn cidr_contains() {
        let range: Ipv4Cidr = "197.97.145.144/28".parse().unwrap();
        assert!(range.contains("197.97.145.144".parse().unwrap()));
        assert!(range.contains("197.97.145.159".parse().unwrap()));
        assert!(!range.contains("197.97.145.160".parse().unwrap()));
    }

    #[test]
    fn bare_address_is_single_host() {
        let range: Ipv4Cidr = "144.126.193.139".parse().unwrap();
        assert!(range.contains("144.126.193.139".parse().unwrap()));
        assert!(!range.contains("144.126.193.140".parse().unwrap()));
    }

    #[test]
    fn invalid_cidr() {
        assert!("10.0.0.0/33".parse::<Ipv4Cidr>().is_err());
        assert!("not-an-ip".parse::<Ipv4Cidr>().is_err());
    }

    #[test]
    fn allow_list_handles_mapped_ipv6() {
        let list = IpAllowList::parse(["41.74.179.192/27"]).unwrap();
        assert!(list.contains("41.74.179.200".parse().unwrap()));
        assert!(list.contains("::ffff:41.74.179.200".parse().unwrap()));
        assert!(!list.contains("::1".parse().unwrap()));
        assert!(!list.contains("8.8.8.8".parse().unwrap()));
    }
}
