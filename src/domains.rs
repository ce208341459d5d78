use std::collections::{BTreeMap, HashSet};
use std::net::Ipv4Addr;

use rand::Rng;
use rand::seq::SliceRandom;

/// Reserved probe key for the cache-hit sample.
pub const RESOLVER_HIT: &str = "ResolverHit";

/// Length of the random label prepended to authoritative probe hostnames.
pub const RANDOM_LABEL_LEN: usize = 15;

/// Hostnames expected to already sit in a busy resolver's cache.
const CACHE_HIT_HOSTNAMES: &[&str] = &[
	"fixed.turbobytes.net.",
	"fixed2.turbobytes.net.",
];

/// One delegation per authoritative DNS operator.
///
/// Queried with a random prefix so each lookup walks the delegation chain.
const AUTHORITATIVE_HOSTNAMES: &[(&str, &str)] = &[
	("NS1", "tbrum3.com."),
	("Google", "tbrum4.com."),
	("AWS Route53", "tbrum5.com."),
	("DNSimple", "tbrum14.com."),
	("GoDaddy", "tbrum2.com."),
	("Akamai", "tbrum9.com."),
	("Dyn", "tbrum10.com."),
	("CloudFlare", "tbrum8.com."),
	("EasyDNS", "tbrum16.com."),
	("Ultradns", "tbrum22.com."),
	("Azure", "tbrum25.com."),
];

/// Every probe hostname resolves to one of these. Anything else is suspect.
const EXPECTED_ANSWERS: &[Ipv4Addr] = &[
	Ipv4Addr::new(138, 197, 54, 54),
	Ipv4Addr::new(138, 197, 53, 4),
];

/// The fixed set of hostnames queried against every resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeCatalog {
	pub cache_hit: Vec<String>,
	/// Operator name to hostname; iteration order is sorted by operator.
	pub authoritative: BTreeMap<String, String>,
	pub expected_answers: HashSet<Ipv4Addr>,
}

impl Default for ProbeCatalog {
	fn default() -> Self {
		ProbeCatalog {
			cache_hit: CACHE_HIT_HOSTNAMES.iter().map(|h| h.to_string()).collect(),
			authoritative: AUTHORITATIVE_HOSTNAMES.iter()
				.map(|(op, host)| (op.to_string(), host.to_string()))
				.collect(),
			expected_answers: EXPECTED_ANSWERS.iter().copied().collect(),
		}
	}
}

impl ProbeCatalog {
	/// Pick the cache-hit hostname used for a resolver's whole run.
	pub fn pick_cache_hit<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
		self.cache_hit.choose(rng)
			.map(|s| s.as_str())
			.unwrap_or(CACHE_HIT_HOSTNAMES[0])
	}

	/// Probe keys in report order: the cache-hit key, then operators sorted.
	pub fn probe_keys(&self) -> impl Iterator<Item = &str> {
		std::iter::once(RESOLVER_HIT).chain(self.authoritative.keys().map(|k| k.as_str()))
	}

	pub fn is_expected(&self, addr: Ipv4Addr) -> bool {
		self.expected_answers.contains(&addr)
	}
}

/// Generate a random lowercase label to defeat resolver caching.
pub fn random_label<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
	(0..len)
		.map(|_| rng.gen_range(b'a'..=b'z') as char)
		.collect()
}

/// Prefix `host` with a fresh random label.
pub fn randomized_hostname<R: Rng + ?Sized>(rng: &mut R, host: &str) -> String {
	format!("{}.{}", random_label(rng, RANDOM_LABEL_LEN), host)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	#[test]
	fn test_authoritative_sorted() {
		let catalog = ProbeCatalog::default();
		let keys: Vec<&String> = catalog.authoritative.keys().collect();
		let mut sorted = keys.clone();
		sorted.sort();
		assert_eq!(keys, sorted);
		assert_eq!(catalog.authoritative.len(), 11);
		assert_eq!(keys[0], "AWS Route53");
	}

	#[test]
	fn test_probe_keys_start_with_hit() {
		let catalog = ProbeCatalog::default();
		let keys: Vec<&str> = catalog.probe_keys().collect();
		assert_eq!(keys[0], RESOLVER_HIT);
		assert_eq!(keys.len(), 12);
	}

	#[test]
	fn test_expected_answers() {
		let catalog = ProbeCatalog::default();
		assert!(catalog.is_expected(Ipv4Addr::new(138, 197, 54, 54)));
		assert!(catalog.is_expected(Ipv4Addr::new(138, 197, 53, 4)));
		assert!(!catalog.is_expected(Ipv4Addr::new(1, 2, 3, 4)));
	}

	#[test]
	fn test_random_label_shape() {
		let mut rng = StdRng::seed_from_u64(7);
		let label = random_label(&mut rng, RANDOM_LABEL_LEN);
		assert_eq!(label.len(), 15);
		assert!(label.chars().all(|c| c.is_ascii_lowercase()));
	}

	#[test]
	fn test_randomized_hostname_differs() {
		let mut rng = StdRng::seed_from_u64(7);
		let a = randomized_hostname(&mut rng, "tbrum3.com.");
		let b = randomized_hostname(&mut rng, "tbrum3.com.");
		assert!(a.ends_with(".tbrum3.com."));
		assert_eq!(a.len(), 15 + 1 + "tbrum3.com.".len());
		assert_ne!(a, b);
	}

	#[test]
	fn test_pick_cache_hit_from_set() {
		let catalog = ProbeCatalog::default();
		let mut rng = StdRng::seed_from_u64(1);
		for _ in 0..10 {
			let host = catalog.pick_cache_hit(&mut rng);
			assert!(catalog.cache_hit.iter().any(|h| h == host));
		}
	}
}
