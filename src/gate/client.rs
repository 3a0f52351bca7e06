//! Client identity derived from transport metadata.

// std
use std::net::{IpAddr, SocketAddr};
// self
use crate::auth::{ClientId, IdentifierError};

impl ClientId {
	/// Resolves the rate-limit key for a request.
	///
	/// Prefers the first public address listed in `X-Forwarded-For`, then `X-Real-IP`, then the
	/// peer address of the connection (with any port stripped).
	pub fn from_transport(
		forwarded_for: Option<&str>,
		real_ip: Option<&str>,
		remote_addr: &str,
	) -> Result<Self, IdentifierError> {
		if let Some(public) = forwarded_for.into_iter().flat_map(|list| list.split(',')).find_map(
			|candidate| candidate.trim().parse::<IpAddr>().ok().filter(|ip| !is_internal(ip)),
		) {
			return Self::new(public.to_string());
		}
		if let Some(real_ip) = real_ip.map(str::trim).filter(|value| !value.is_empty()) {
			return Self::new(real_ip);
		}

		match remote_addr.parse::<SocketAddr>() {
			Ok(socket) => Self::new(socket.ip().to_string()),
			Err(_) => Self::new(remote_addr.trim()),
		}
	}
}

fn is_internal(ip: &IpAddr) -> bool {
	match ip {
		IpAddr::V4(v4) =>
			v4.is_private()
				|| v4.is_loopback()
				|| v4.is_link_local()
				|| v4.is_unspecified()
				|| v4.is_broadcast(),
		IpAddr::V6(v6) => {
			let head = v6.segments()[0];

			v6.is_loopback()
				|| v6.is_unspecified()
				// fc00::/7 unique local, fe80::/10 link local.
				|| head & 0xfe00 == 0xfc00
				|| head & 0xffc0 == 0xfe80
		},
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn resolve(forwarded_for: Option<&str>, real_ip: Option<&str>, remote: &str) -> String {
		ClientId::from_transport(forwarded_for, real_ip, remote)
			.expect("Transport metadata should resolve.")
			.to_string()
	}

	#[test]
	fn first_public_forwarded_address_wins() {
		assert_eq!(
			resolve(Some("10.0.0.3, 192.168.1.1, 203.0.113.7, 198.51.100.2"), None, "10.0.0.1:80"),
			"203.0.113.7"
		);
		assert_eq!(resolve(Some("fd00::1, 2001:db8::5"), None, "[::1]:80"), "2001:db8::5");
	}

	#[test]
	fn falls_back_to_real_ip_then_peer() {
		assert_eq!(
			resolve(Some("10.0.0.3, unknown"), Some("198.51.100.9"), "10.0.0.1:80"),
			"198.51.100.9"
		);
		assert_eq!(resolve(None, None, "198.51.100.10:54321"), "198.51.100.10");
		assert_eq!(resolve(None, Some("  "), "[2001:db8::1]:443"), "2001:db8::1");
		assert_eq!(resolve(None, None, "unix-socket"), "unix-socket");
	}

	#[test]
	fn empty_peer_address_is_rejected() {
		assert!(ClientId::from_transport(None, None, "").is_err());
	}
}
