use std::net::{IpAddr, SocketAddr};

use crate::error::Error;
use crate::transport::Resolver;

/// Port every resolver is queried on.
const DNS_PORT: u16 = 53;

/// Name shown for resolvers missing from the provider table.
pub const UNKNOWN_PROVIDER: &str = "Unknown";

/// Built-in resolvers in launch order, with their provider names.
const DEFAULT_RESOLVERS: &[(&str, &str)] = &[
	("8.8.8.8", "Google"),
	("1.1.1.1", "Cloudflare"),
	("9.9.9.9", "Quad9"),
	("114.114.114.114", "114dns"),
	("119.29.29.29", "DNSPod"),
	("180.76.76.76", "Baidu"),
	("208.67.222.222", "OpenDNS"),
	("199.85.126.20", "Norton"),
	("185.228.168.168", "Clean Browsing"),
	("8.26.56.26", "Comodo"),
	("[2001:4860:4860::8888]", "Google"),
	("[2606:4700:4700::1111]", "Cloudflare"),
	("[2620:fe::fe]", "Quad9"),
	// https://www.opendns.com/about/innovations/ipv6/
	("[2620:0:ccc::2]", "OpenDNS"),
	("[2a0d:2a00:1::]", "Clean Browsing"),
];

/// Provider name for a resolver identity, by exact string match.
pub fn provider_name(addr: &str) -> &'static str {
	DEFAULT_RESOLVERS.iter()
		.find(|(a, _)| *a == addr)
		.map(|(_, name)| *name)
		.unwrap_or(UNKNOWN_PROVIDER)
}

/// Parse a resolver address string into a Resolver.
///
/// Supports formats:
///   "1.1.1.1"                  -- IPv4
///   "[2606:4700:4700::1111]"   -- bracketed IPv6
///   "2606:4700:4700::1111"     -- bare IPv6, normalised to bracketed form
///
/// Resolvers are always queried on port 53.
pub fn parse_resolver(input: &str) -> Result<Resolver, Error> {
	let trimmed = input.trim();
	if trimmed.is_empty() {
		return Err(invalid(input, "empty resolver address"));
	}

	let inner = trimmed
		.strip_prefix('[')
		.and_then(|rest| rest.strip_suffix(']'))
		.unwrap_or(trimmed);
	let ip: IpAddr = inner.parse()
		.map_err(|e| invalid(input, &format!("{}", e)))?;

	let addr = match ip {
		IpAddr::V4(v4) => {
			if inner != trimmed {
				return Err(invalid(input, "brackets are only valid around IPv6 addresses"));
			}
			v4.to_string()
		}
		// Keep the user's spelling so provider lookups match the default table
		IpAddr::V6(_) => format!("[{}]", inner),
	};

	Ok(Resolver {
		name: provider_name(&addr).to_string(),
		socket: SocketAddr::new(ip, DNS_PORT),
		addr,
	})
}

fn invalid(input: &str, why: &str) -> Error {
	Error::InvalidResolver { input: input.to_string(), why: why.to_string() }
}

/// Return the built-in resolver list.
pub fn default_resolvers() -> Vec<Resolver> {
	DEFAULT_RESOLVERS.iter()
		.filter_map(|(addr, _)| parse_resolver(addr).ok())
		.collect()
}

/// Append `additions` to `base`, skipping any address already present.
///
/// Order of first appearance is preserved.
pub fn merge_resolvers(base: Vec<Resolver>, additions: Vec<Resolver>) -> Vec<Resolver> {
	let mut merged = base;
	for resolver in additions {
		if !merged.iter().any(|r| r.addr == resolver.addr) {
			merged.push(resolver);
		}
	}
	merged
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_ipv4() {
		let r = parse_resolver("8.8.8.8").unwrap();
		assert_eq!(r.addr, "8.8.8.8");
		assert_eq!(r.name, "Google");
		assert_eq!(r.socket.port(), 53);
	}

	#[test]
	fn test_ipv6_bracketed() {
		let r = parse_resolver("[2606:4700:4700::1111]").unwrap();
		assert_eq!(r.addr, "[2606:4700:4700::1111]");
		assert_eq!(r.name, "Cloudflare");
		assert!(r.socket.is_ipv6());
	}

	#[test]
	fn test_ipv6_bare_is_bracketed() {
		let r = parse_resolver("2620:fe::fe").unwrap();
		assert_eq!(r.addr, "[2620:fe::fe]");
		assert_eq!(r.name, "Quad9");
	}

	#[test]
	fn test_unknown_provider() {
		let r = parse_resolver("192.0.2.53").unwrap();
		assert_eq!(r.name, UNKNOWN_PROVIDER);
	}

	#[test]
	fn test_invalid_input() {
		assert!(parse_resolver("not-an-ip").is_err());
		assert!(parse_resolver("").is_err());
		assert!(parse_resolver("[8.8.8.8]").is_err());
		assert!(parse_resolver("8.8.8.8:53").is_err());
	}

	#[test]
	fn test_defaults() {
		let defaults = default_resolvers();
		assert_eq!(defaults.len(), DEFAULT_RESOLVERS.len());
		assert_eq!(defaults[0].addr, "8.8.8.8");
		assert!(defaults.iter().all(|r| r.name != UNKNOWN_PROVIDER));
	}

	#[test]
	fn test_merge_skips_duplicates() {
		let defaults = default_resolvers();
		let before: Vec<String> = defaults.iter().map(|r| r.addr.clone()).collect();
		let additions = vec![
			parse_resolver("1.1.1.1").unwrap(),
			parse_resolver("192.0.2.1").unwrap(),
			parse_resolver("192.0.2.1").unwrap(),
		];
		let merged = merge_resolvers(defaults, additions);
		assert_eq!(merged.len(), before.len() + 1);
		let merged_addrs: Vec<String> = merged.iter().map(|r| r.addr.clone()).collect();
		assert_eq!(&merged_addrs[..before.len()], &before[..]);
		assert_eq!(merged_addrs.last().unwrap(), "192.0.2.1");
	}

	#[test]
	fn test_merge_existing_only_keeps_set() {
		let defaults = default_resolvers();
		let len = defaults.len();
		let merged = merge_resolvers(defaults, vec![parse_resolver("9.9.9.9").unwrap()]);
		assert_eq!(merged.len(), len);
		assert_eq!(merged[2].addr, "9.9.9.9");
	}
}
