use crate::PingError;
use std::net::{IpAddr, Ipv4Addr};

/// Resolves `host`, an IPv4 literal or a hostname, to its first IPv4 address.
pub fn lookup_host_v4(host: &str) -> Result<Ipv4Addr, PingError> {
    if let Ok(ip) = host.parse::<Ipv4Addr>() {
        return Ok(ip);
    }
    let ips: Vec<IpAddr> = dns_lookup::lookup_host(host).map_err(|error| PingError {
        message: format!("could not resolve hostname {host}: {error}"),
        source: Some(Box::new(error)),
    })?;
    ips.into_iter()
        .find_map(|ip| match ip {
            IpAddr::V4(ipv4) => Some(ipv4),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(|| PingError::new(format!("could not resolve hostname {host} to IPv4")))
}
