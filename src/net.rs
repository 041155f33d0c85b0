//! Local address discovery for the advertised URL

use std::net::{IpAddr, Ipv4Addr};

/// First non-loopback IPv4 address of this host, or `127.0.0.1`.
///
/// Best effort only: interface enumeration errors fall back silently.
pub fn local_ipv4() -> Ipv4Addr {
    match get_if_addrs::get_if_addrs() {
        Ok(interfaces) => first_lan_ipv4(interfaces.iter().map(|iface| iface.ip())),
        Err(e) => {
            tracing::debug!("Interface enumeration failed: {}", e);
            Ipv4Addr::LOCALHOST
        }
    }
}

/// Pick the first usable IPv4 address
pub fn first_lan_ipv4(addrs: impl IntoIterator<Item = IpAddr>) -> Ipv4Addr {
    addrs
        .into_iter()
        .find_map(|addr| match addr {
            IpAddr::V4(v4) if !v4.is_loopback() && !v4.is_unspecified() => Some(v4),
            _ => None,
        })
        .unwrap_or(Ipv4Addr::LOCALHOST)
}

/// `http://<ip>:<port>`
pub fn http_url(ip: Ipv4Addr, port: u16) -> String {
    format!("http://{}:{}", ip, port)
}
