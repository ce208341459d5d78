use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info};

use crate::dns::{validate_answers, DnsExchange, DnsQuery};
use crate::domains::randomized_hostname;
use crate::error::{Error, ProbeError};
use crate::stats::{RecursiveResults, SampleSummary};
use crate::transport::{BenchmarkConfig, QueryOutcome, Resolver};

/// Benchmark engine: shared config, DNS client and the two concurrency limits.
///
/// The worker limit bounds how many resolvers are tested at once; the query
/// limit bounds in-flight DNS queries across all resolvers combined.
pub struct Bench<E> {
	config: Arc<BenchmarkConfig>,
	exchanger: Arc<E>,
	worker_limit: Arc<Semaphore>,
	query_limit: Arc<Semaphore>,
}

impl<E> Clone for Bench<E> {
	fn clone(&self) -> Self {
		Bench {
			config: Arc::clone(&self.config),
			exchanger: Arc::clone(&self.exchanger),
			worker_limit: Arc::clone(&self.worker_limit),
			query_limit: Arc::clone(&self.query_limit),
		}
	}
}

impl<E: DnsExchange> Bench<E> {
	pub fn new(config: BenchmarkConfig, exchanger: E) -> Bench<E> {
		let worker_limit = Arc::new(Semaphore::new(config.max_workers));
		let query_limit = Arc::new(Semaphore::new(config.max_queries));
		Bench {
			config: Arc::new(config),
			exchanger: Arc::new(exchanger),
			worker_limit,
			query_limit,
		}
	}

	pub fn config(&self) -> &BenchmarkConfig {
		&self.config
	}

	/// Send one query for `hostname` to `resolver` and validate the answer.
	///
	/// Holds one query-limit permit for the duration of the exchange. Query
	/// failures come back as `QueryOutcome::Failed`; only a closed limiter
	/// is an `Err`.
	pub async fn probe(&self, hostname: &str, resolver: &Resolver) -> Result<QueryOutcome, Error> {
		let _permit = self.query_limit.acquire().await
			.map_err(|_| Error::LimiterClosed { limiter: "query" })?;

		let query = DnsQuery::recursive_a(hostname, self.config.query_timeout);
		let exchange = tokio::time::timeout(
			self.config.query_timeout,
			self.exchanger.exchange(&query, resolver.socket),
		).await;

		let outcome = match exchange {
			Ok(Ok(reply)) => match validate_answers(&reply.answers, &self.config.catalog) {
				Ok(_) => QueryOutcome::Success { latency: reply.rtt },
				Err(cause) => QueryOutcome::Failed { cause },
			},
			Ok(Err(cause)) => QueryOutcome::Failed { cause },
			Err(_) => QueryOutcome::Failed { cause: ProbeError::Timeout },
		};
		if let QueryOutcome::Failed { cause } = &outcome {
			debug!("{} -> {}: {}", resolver.addr, hostname, cause);
		}
		Ok(outcome)
	}

	/// Query one (resolver, hostname) pair `samples_per_probe` times in a row.
	///
	/// With `randomize` set every query gets a fresh random label in front
	/// of `host`.
	pub async fn run_samples(
		&self,
		host: &str,
		resolver: &Resolver,
		randomize: bool,
		rng: &mut StdRng,
	) -> Result<SampleSummary, Error> {
		let mut outcomes = Vec::with_capacity(self.config.samples_per_probe);
		for _ in 0..self.config.samples_per_probe {
			let hostname = if randomize {
				randomized_hostname(rng, host)
			} else {
				host.to_string()
			};
			outcomes.push(self.probe(&hostname, resolver).await?);
		}
		Ok(SampleSummary::from_outcomes(&outcomes, self.config.fail_duration))
	}

	/// Run every probe against one resolver, strictly in sequence.
	///
	/// Warms the resolver's cache with unmeasured queries for a randomly
	/// chosen cache-hit hostname, samples that hostname, then samples each
	/// authoritative operator in name order.
	pub async fn test_recursive(&self, resolver: &Resolver, rng: &mut StdRng) -> Result<RecursiveResults, Error> {
		let catalog = &self.config.catalog;
		let hit_host = catalog.pick_cache_hit(rng).to_string();

		for _ in 0..self.config.priming_queries {
			self.probe(&hit_host, resolver).await?;
		}
		let hit = self.run_samples(&hit_host, resolver, false, rng).await?;

		let mut auths = BTreeMap::new();
		for (operator, host) in &catalog.authoritative {
			let summary = self.run_samples(host, resolver, true, rng).await?;
			auths.insert(operator.clone(), summary);
		}
		let results = RecursiveResults { hit, auths };
		debug_assert!(catalog.probe_keys().all(|k| results.get(k).is_some()));
		Ok(results)
	}

	/// Benchmark every configured resolver.
	///
	/// Launches are staggered by `launch_stagger`; each task holds a worker
	/// permit while it runs. Returns results in configured resolver order.
	pub async fn run(&self) -> Result<Vec<(Resolver, RecursiveResults)>, Error> {
		let resolvers = &self.config.resolvers;
		let expected = resolvers.len();
		let (tx, mut rx) = mpsc::channel(expected.max(1));

		for (index, resolver) in resolvers.iter().enumerate() {
			tokio::time::sleep(self.config.launch_stagger).await;

			let bench = self.clone();
			let resolver = resolver.clone();
			let tx = tx.clone();
			let mut rng = match self.config.seed {
				Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
				None => StdRng::from_entropy(),
			};
			tokio::spawn(async move {
				let result = bench.run_worker(&resolver, &mut rng).await;
				// The receiver only goes away once the run has already failed
				let _ = tx.send(result.map(|r| (resolver, r))).await;
			});
		}
		drop(tx);

		let mut collected: HashMap<String, RecursiveResults> = HashMap::with_capacity(expected);
		for received in 0..expected {
			let (resolver, results) = rx.recv().await
				.ok_or(Error::CollectorClosed { received, expected })??;
			info!("[{}/{}] got results for {}", received + 1, expected, resolver.addr);
			collected.insert(resolver.addr, results);
		}

		resolvers.iter()
			.map(|r| {
				collected.remove(&r.addr)
					.map(|res| (r.clone(), res))
					.ok_or(Error::CollectorClosed { received: expected, expected })
			})
			.collect()
	}

	async fn run_worker(&self, resolver: &Resolver, rng: &mut StdRng) -> Result<RecursiveResults, Error> {
		let _permit = self.worker_limit.acquire().await
			.map_err(|_| Error::LimiterClosed { limiter: "worker" })?;
		info!("issuing tests for {}", resolver.addr);
		self.test_recursive(resolver, rng).await
	}
}
