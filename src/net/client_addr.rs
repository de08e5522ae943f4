//! Client address resolution.
//!
//! Turns the transport peer address (and, behind a trusted proxy, the
//! `X-Forwarded-For` header) into the client key that rate limiting and
//! soul assignment are keyed on.

use std::net::{IpAddr, SocketAddr};

/// Header consulted when the peer is a trusted (loopback/private) proxy.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Resolve the canonical client key for a request.
///
/// `remote` is the peer address as seen by the listener, with or without a
/// port. The forwarded header is only honoured when `trust_forwarded` is set
/// and the peer itself is loopback or private; its first entry must parse as
/// an IP address, otherwise the peer address is used.
pub fn resolve(remote: &str, forwarded: Option<&str>, trust_forwarded: bool) -> String {
    let peer = parse_host(remote);
    let peer_key = match peer {
        Some(ip) => ip.to_string(),
        None => strip_port(remote).to_string(),
    };

    if !trust_forwarded || !peer.is_some_and(is_internal) {
        return peer_key;
    }

    forwarded
        .and_then(|value| value.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok())
        .map(|ip| ip.to_canonical().to_string())
        .unwrap_or(peer_key)
}

/// Resolve from a connected socket address.
pub fn resolve_socket(remote: SocketAddr, forwarded: Option<&str>, trust_forwarded: bool) -> String {
    resolve(&remote.to_string(), forwarded, trust_forwarded)
}

/// Loopback or private-range address (RFC 1918, IPv6 unique-local).
pub fn is_internal(ip: IpAddr) -> bool {
    match ip.to_canonical() {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_private(),
        IpAddr::V6(v6) => v6.is_loopback() || (v6.segments()[0] & 0xfe00) == 0xfc00,
    }
}

fn parse_host(remote: &str) -> Option<IpAddr> {
    if let Ok(sock) = remote.parse::<SocketAddr>() {
        return Some(sock.ip().to_canonical());
    }
    remote
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .ok()
        .map(|ip| ip.to_canonical())
}

// Best effort for hosts that are not IP literals.
fn strip_port(remote: &str) -> &str {
    match remote.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') && port.chars().all(|c| c.is_ascii_digit()) => {
            host
        }
        _ => remote,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trusted_private_peer_uses_first_forwarded_entry() {
        let key = resolve("10.0.0.5:41234", Some("203.0.113.7, 10.0.0.5"), true);
        assert_eq!(key, "203.0.113.7");
    }

    #[test]
    fn test_untrusted_ignores_forwarded_header() {
        let key = resolve("10.0.0.5:41234", Some("203.0.113.7, 10.0.0.5"), false);
        assert_eq!(key, "10.0.0.5");
    }

    #[test]
    fn test_public_peer_ignores_forwarded_header() {
        let key = resolve("198.51.100.20:80", Some("203.0.113.7"), true);
        assert_eq!(key, "198.51.100.20");
    }

    #[test]
    fn test_invalid_forwarded_entry_falls_back_to_peer() {
        assert_eq!(resolve("127.0.0.1:9000", Some("garbage, 1.2.3.4"), true), "127.0.0.1");
        assert_eq!(resolve("127.0.0.1:9000", Some(""), true), "127.0.0.1");
        assert_eq!(resolve("127.0.0.1:9000", None, true), "127.0.0.1");
    }

    #[test]
    fn test_port_is_stripped() {
        assert_eq!(resolve("192.0.2.1:8080", None, false), "192.0.2.1");
        assert_eq!(resolve("192.0.2.1", None, false), "192.0.2.1");
        assert_eq!(resolve("[2001:db8::1]:443", None, false), "2001:db8::1");
        assert_eq!(resolve("2001:db8::1", None, false), "2001:db8::1");
        assert_eq!(resolve("example.internal:80", None, false), "example.internal");
    }

    #[test]
    fn test_ipv6_loopback_and_unique_local_are_trusted() {
        assert_eq!(resolve("[::1]:80", Some("203.0.113.9"), true), "203.0.113.9");
        assert_eq!(resolve("[fd00::2]:80", Some("203.0.113.9"), true), "203.0.113.9");
        assert_eq!(resolve("[2001:db8::2]:80", Some("203.0.113.9"), true), "2001:db8::2");
    }

    #[test]
    fn test_mapped_ipv4_is_canonicalized() {
        assert_eq!(resolve("[::ffff:10.1.2.3]:80", None, false), "10.1.2.3");
        assert!(is_internal("::ffff:192.168.1.1".parse().unwrap()));
    }

    #[test]
    fn test_resolve_socket() {
        let addr: SocketAddr = "127.0.0.1:5555".parse().unwrap();
        assert_eq!(resolve_socket(addr, Some("198.51.100.1"), true), "198.51.100.1");
    }
}
