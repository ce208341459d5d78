use std::net::SocketAddr;
use std::time::Duration;

use crate::domains::ProbeCatalog;
use crate::error::ProbeError;

/// A recursive resolver under test.
///
/// `addr` is the identity used everywhere in output: an IPv4 literal or a
/// bracketed IPv6 literal, exactly as configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolver {
	pub addr: String,
	pub name: String,
	pub socket: SocketAddr,
}

/// Result of a single validated DNS query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
	Success { latency: Duration },
	Failed { cause: ProbeError },
}

impl QueryOutcome {
	/// Duration that enters the statistics; failures count as `fail_duration`.
	pub fn duration(&self, fail_duration: Duration) -> Duration {
		match self {
			QueryOutcome::Success { latency } => *latency,
			QueryOutcome::Failed { .. } => fail_duration,
		}
	}

	pub fn is_failure(&self) -> bool {
		matches!(self, QueryOutcome::Failed { .. })
	}
}

/// Benchmark configuration, built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
	pub resolvers: Vec<Resolver>,
	pub catalog: ProbeCatalog,
	pub samples_per_probe: usize,
	pub priming_queries: usize,
	pub query_timeout: Duration,
	pub fail_duration: Duration,
	pub launch_stagger: Duration,
	pub max_workers: usize,
	pub max_queries: usize,
	pub seed: Option<u64>,
}

impl BenchmarkConfig {
	/// Configuration with the standard protocol constants.
	///
	/// A `max_workers` of `None` means one worker per resolver.
	pub fn new(
		resolvers: Vec<Resolver>,
		max_workers: Option<usize>,
		max_queries: usize,
		seed: Option<u64>,
	) -> BenchmarkConfig {
		let max_workers = max_workers.unwrap_or(resolvers.len()).max(1);
		BenchmarkConfig {
			resolvers,
			catalog: ProbeCatalog::default(),
			samples_per_probe: 15,
			priming_queries: 5,
			query_timeout: Duration::from_secs(1),
			fail_duration: Duration::from_secs(10),
			launch_stagger: Duration::from_millis(50),
			max_workers,
			max_queries: max_queries.max(1),
			seed,
		}
	}
}
