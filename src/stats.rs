use std::collections::BTreeMap;
use std::time::Duration;

use crate::domains::RESOLVER_HIT;
use crate::transport::{QueryOutcome, Resolver};

/// Weight of the cache-hit probe relative to a single authoritative probe.
pub const CACHE_HIT_WEIGHT: f64 = 5.0;

/// Summary of the repeated queries for one (resolver, probe) pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleSummary {
	pub mean: Duration,
	pub median: Duration,
	/// Failed queries divided by queries issued, in [0, 1]
	pub fail_ratio: f64,
}

impl SampleSummary {
	/// Reduce query outcomes to a summary.
	///
	/// Failures enter mean and median as `fail_duration`.
	pub fn from_outcomes(outcomes: &[QueryOutcome], fail_duration: Duration) -> SampleSummary {
		let nanos: Vec<f64> = outcomes.iter()
			.map(|o| o.duration(fail_duration).as_nanos() as f64)
			.collect();
		let fails = outcomes.iter().filter(|o| o.is_failure()).count();
		let fail_ratio = if outcomes.is_empty() {
			0.0
		} else {
			fails as f64 / outcomes.len() as f64
		};
		SampleSummary {
			mean: nanos_to_duration(mean(&nanos).unwrap_or(0.0)),
			median: nanos_to_duration(median(&nanos).unwrap_or(0.0)),
			fail_ratio,
		}
	}

	pub fn mean_ms(&self) -> f64 {
		as_ms(self.mean)
	}

	pub fn median_ms(&self) -> f64 {
		as_ms(self.median)
	}

	pub fn fail_pct(&self) -> f64 {
		self.fail_ratio * 100.0
	}
}

fn nanos_to_duration(nanos: f64) -> Duration {
	Duration::from_nanos(nanos.round().max(0.0) as u64)
}

/// Duration as fractional milliseconds.
pub fn as_ms(d: Duration) -> f64 {
	d.as_secs_f64() * 1000.0
}

/// Calculate the arithmetic mean of a slice of values.
pub fn mean(values: &[f64]) -> Option<f64> {
	if values.is_empty() {
		return None;
	}
	let sum: f64 = values.iter().sum();
	Some(sum / values.len() as f64)
}

/// Calculate the median of a slice of values.
///
/// Even-length input yields the average of the two middle values.
pub fn median(values: &[f64]) -> Option<f64> {
	if values.is_empty() {
		return None;
	}
	let mut sorted = values.to_vec();
	sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
	let mid = sorted.len() / 2;
	if sorted.len() % 2 == 0 {
		Some((sorted[mid - 1] + sorted[mid]) / 2.0)
	} else {
		Some(sorted[mid])
	}
}

/// All samples for one resolver: the cache-hit probe plus one per operator.
#[derive(Debug, Clone, PartialEq)]
pub struct RecursiveResults {
	pub hit: SampleSummary,
	pub auths: BTreeMap<String, SampleSummary>,
}

impl RecursiveResults {
	/// Look up a sample by probe key (`ResolverHit` or an operator name).
	pub fn get(&self, probe: &str) -> Option<&SampleSummary> {
		if probe == RESOLVER_HIT {
			Some(&self.hit)
		} else {
			self.auths.get(probe)
		}
	}

	/// Samples in report order: cache-hit first, then operators sorted by name.
	pub fn entries(&self) -> impl Iterator<Item = (&str, &SampleSummary)> {
		std::iter::once((RESOLVER_HIT, &self.hit))
			.chain(self.auths.iter().map(|(k, v)| (k.as_str(), v)))
	}

	/// Weighted latency score, lower is better.
	///
	/// score = 5 * (hit mean + hit median) + sum over operators of (mean + median),
	/// all in milliseconds. Failure ratio does not enter the score.
	pub fn score(&self) -> f64 {
		let hit = CACHE_HIT_WEIGHT * (self.hit.mean_ms() + self.hit.median_ms());
		let auths: f64 = self.auths.values()
			.map(|s| s.mean_ms() + s.median_ms())
			.sum();
		hit + auths
	}
}

/// Scored and ranked resolver
#[derive(Debug, Clone)]
pub struct ScoredResolver {
	pub rank: usize,
	pub resolver: Resolver,
	pub score: f64,
}

/// Rank resolvers by score, ascending.
///
/// The sort is stable, so equal scores keep the input order.
pub fn rank_resolvers(results: &[(Resolver, RecursiveResults)]) -> Vec<ScoredResolver> {
	let mut scored: Vec<(Resolver, f64)> = results.iter()
		.map(|(resolver, res)| (resolver.clone(), res.score()))
		.collect();
	scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
	scored.into_iter()
		.enumerate()
		.map(|(i, (resolver, score))| ScoredResolver {
			rank: i + 1,
			resolver,
			score,
		})
		.collect()
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use crate::error::ProbeError;
	use crate::resolver::parse_resolver;

	const FAIL: Duration = Duration::from_secs(10);

	pub(crate) fn summary(mean_ms: u64, median_ms: u64, fail_ratio: f64) -> SampleSummary {
		SampleSummary {
			mean: Duration::from_millis(mean_ms),
			median: Duration::from_millis(median_ms),
			fail_ratio,
		}
	}

	pub(crate) fn results(hit: SampleSummary, auth: SampleSummary) -> RecursiveResults {
		let auths = ["Akamai", "NS1"].iter()
			.map(|k| (k.to_string(), auth))
			.collect();
		RecursiveResults { hit, auths }
	}

	fn ok(ms: u64) -> QueryOutcome {
		QueryOutcome::Success { latency: Duration::from_millis(ms) }
	}

	fn failed() -> QueryOutcome {
		QueryOutcome::Failed { cause: ProbeError::Timeout }
	}

	#[test]
	fn test_mean() {
		assert_eq!(mean(&[1.0, 2.0, 3.0, 4.0, 5.0]), Some(3.0));
		assert_eq!(mean(&[]), None);
	}

	#[test]
	fn test_median_odd_even() {
		assert_eq!(median(&[5.0, 1.0, 3.0]), Some(3.0));
		assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
		assert_eq!(median(&[42.0]), Some(42.0));
		assert_eq!(median(&[]), None);
	}

	#[test]
	fn test_summary_all_success() {
		let outcomes: Vec<QueryOutcome> = (0..15).map(|_| ok(10)).collect();
		let s = SampleSummary::from_outcomes(&outcomes, FAIL);
		assert_eq!(s.mean, Duration::from_millis(10));
		assert_eq!(s.median, Duration::from_millis(10));
		assert_eq!(s.fail_ratio, 0.0);
		assert!(s.mean < FAIL && s.median < FAIL);
	}

	#[test]
	fn test_summary_all_failed() {
		let outcomes: Vec<QueryOutcome> = (0..15).map(|_| failed()).collect();
		let s = SampleSummary::from_outcomes(&outcomes, FAIL);
		assert_eq!(s.fail_ratio, 1.0);
		assert_eq!(s.mean, FAIL);
		assert_eq!(s.median, FAIL);
	}

	#[test]
	fn test_summary_failures_bias_mean() {
		let mut outcomes: Vec<QueryOutcome> = (0..14).map(|_| ok(20)).collect();
		outcomes.push(failed());
		let s = SampleSummary::from_outcomes(&outcomes, FAIL);
		// (14 * 20 + 10000) / 15 = 685.33 ms
		assert!((s.mean_ms() - 685.333).abs() < 0.01);
		assert_eq!(s.median, Duration::from_millis(20));
		assert!((s.fail_ratio - 1.0 / 15.0).abs() < 1e-9);
	}

	#[test]
	fn test_score_formula() {
		let r = results(summary(10, 10, 0.0), summary(30, 20, 0.0));
		// 5 * (10 + 10) + 2 * (30 + 20)
		assert!((r.score() - 200.0).abs() < 1e-9);
	}

	#[test]
	fn test_score_ignores_fail_ratio() {
		let clean = results(summary(10, 10, 0.0), summary(30, 20, 0.0));
		let flaky = results(summary(10, 10, 0.9), summary(30, 20, 0.5));
		assert_eq!(clean.score(), flaky.score());
	}

	#[test]
	fn test_score_hit_weighted_five_times() {
		let base = results(summary(10, 10, 0.0), summary(30, 20, 0.0));
		let slower_mean = results(summary(13, 10, 0.0), summary(30, 20, 0.0));
		let slower_median = results(summary(10, 12, 0.0), summary(30, 20, 0.0));
		assert!((slower_mean.score() - base.score() - 15.0).abs() < 1e-9);
		assert!((slower_median.score() - base.score() - 10.0).abs() < 1e-9);
	}

	#[test]
	fn test_entries_order() {
		let r = results(summary(1, 1, 0.0), summary(2, 2, 0.0));
		let keys: Vec<&str> = r.entries().map(|(k, _)| k).collect();
		assert_eq!(keys, vec![RESOLVER_HIT, "Akamai", "NS1"]);
		assert_eq!(r.get(RESOLVER_HIT), Some(&r.hit));
		assert!(r.get("Dyn").is_none());
	}

	#[test]
	fn test_ranking_order() {
		let input = vec![
			(parse_resolver("192.0.2.1").unwrap(), results(summary(100, 100, 0.0), summary(1, 1, 0.0))),
			(parse_resolver("192.0.2.2").unwrap(), results(summary(10, 10, 0.0), summary(1, 1, 0.0))),
			(parse_resolver("192.0.2.3").unwrap(), results(summary(50, 50, 0.0), summary(1, 1, 0.0))),
		];
		let ranked = rank_resolvers(&input);
		let order: Vec<&str> = ranked.iter().map(|r| r.resolver.addr.as_str()).collect();
		assert_eq!(order, vec!["192.0.2.2", "192.0.2.3", "192.0.2.1"]);
		assert_eq!(ranked[0].rank, 1);
		assert_eq!(ranked[2].rank, 3);
		assert!(ranked.windows(2).all(|w| w[0].score <= w[1].score));
	}
}
