use std::collections::HashSet;
use std::time::Duration;

use comfy_table::{Table, ContentArrangement, presets::UTF8_FULL};

use anyhow::Result;

use crate::http::HttpResult;
use crate::resolver::provider_name;
use crate::stats::{RecursiveResults, ScoredResolver};
use crate::transport::{BenchmarkConfig, Resolver};

const FAIL: &str = "FAIL";

/// Print a summary of the benchmark configuration before running.
pub fn print_config_summary(config: &BenchmarkConfig) {
	println!("DNS Benchmark Configuration");
	println!("===========================");
	println!("Resolvers:      {}", config.resolvers.len());
	for r in &config.resolvers {
		println!("  - {} ({})", r.addr, r.name);
	}
	println!("Cache-hit:      {}", config.catalog.cache_hit.join(", "));
	println!("Auth probes:    {}", config.catalog.authoritative.len());
	println!("Samples:        {} per probe", config.samples_per_probe);
	println!("Timeout:        {} ms", config.query_timeout.as_millis());
	println!("Workers:        {}", config.max_workers);
	println!("Queries:        {}", config.max_queries);
	if let Some(seed) = config.seed {
		println!("Seed:           {}", seed);
	}
	println!();
}

/// Format a duration rounded to whole milliseconds, e.g. `12ms` or `1.234s`.
pub fn format_duration(d: Duration) -> String {
	let ms = (d.as_nanos() + 500_000) / 1_000_000;
	if ms == 0 {
		return "0s".to_string();
	}
	if ms < 1000 {
		return format!("{}ms", ms);
	}
	let secs = ms / 1000;
	let frac = ms % 1000;
	if frac == 0 {
		format!("{}s", secs)
	} else {
		let frac = format!("{:03}", frac);
		format!("{}.{}s", secs, frac.trim_end_matches('0'))
	}
}

fn new_table(header: Vec<&str>) -> Table {
	let mut table = Table::new();
	table.load_preset(UTF8_FULL);
	table.set_content_arrangement(ContentArrangement::Dynamic);
	table.set_header(header);
	table
}

fn label(addr: &str, name: &str) -> String {
	format!("{} ({})", addr, name)
}

/// Render one resolver's per-probe table.
pub fn render_resolver_table(resolver: &Resolver, results: &RecursiveResults) -> String {
	let mut table = new_table(vec!["Auth", "Mean", "Median", "Fail"]);
	for (probe, s) in results.entries() {
		table.add_row(vec![
			probe.to_string(),
			format_duration(s.mean),
			format_duration(s.median),
			format!("{:.2}%", s.fail_pct()),
		]);
	}
	format!("========== {} ({}) ===========\n{table}\n", resolver.addr, resolver.name)
}

/// Render one resolver's samples as `Raw` lines.
pub fn render_resolver_raw(resolver: &Resolver, results: &RecursiveResults) -> String {
	let mut out = String::new();
	for (probe, s) in results.entries() {
		out.push_str(&format!(
			"Raw\t{}\t{}\t{:.2}\t{:.2}\t{:.2}\n",
			resolver.addr, probe, s.mean_ms(), s.median_ms(), s.fail_pct(),
		));
	}
	out
}

/// Render the ranked scores and the recommendation.
///
/// `ranked` must already be sorted by ascending score.
pub fn render_summary(ranked: &[ScoredResolver], raw: bool) -> String {
	let mut out = String::new();
	if raw {
		for r in ranked {
			out.push_str(&format!("Score\t{}\t{:.0}\n", r.resolver.addr, r.score));
		}
		if let Some(best) = ranked.first() {
			out.push_str(&format!("Recommendation\t{}\n", best.resolver.addr));
		}
		return out;
	}

	let mut table = new_table(vec!["Resolver", "Performance Score"]);
	for r in ranked {
		table.add_row(vec![
			label(&r.resolver.addr, &r.resolver.name),
			format!("{:.0}", r.score),
		]);
	}
	out.push_str("========== Summary ===========\n");
	out.push_str("Scores (lower is better)\n");
	out.push_str(&format!("{table}\n"));
	if let Some(best) = ranked.first() {
		out.push_str(&format!(
			"You should probably use {} as your default resolver\n",
			best.resolver.addr,
		));
	}
	out
}

/// Render HTTP test timings; resolvers missing from `results` get a FAIL row.
pub fn render_http_table(results: &[HttpResult], resolvers: &[Resolver]) -> String {
	let mut table = new_table(vec![
		"Resolver", "Remote", "DNS", "Connect", "TLS", "TTFB", "Transfer", "TOTAL",
	]);
	let mut found = HashSet::new();
	for res in results {
		let t = &res.timings;
		table.add_row(vec![
			label(&res.server, provider_name(&res.server)),
			t.addr.clone(),
			format_duration(t.dns),
			format_duration(t.connect),
			format_duration(t.tls),
			format_duration(t.ttfb),
			format_duration(t.transfer),
			format_duration(t.total),
		]);
		found.insert(res.server.as_str());
	}
	for resolver in resolvers {
		if !found.contains(resolver.addr.as_str()) {
			let mut row = vec![label(&resolver.addr, &resolver.name)];
			row.extend(std::iter::repeat(FAIL.to_string()).take(7));
			table.add_row(row);
		}
	}
	format!("{table}\n")
}

/// Write every probe summary and score to a CSV file.
pub fn write_csv(
	path: &str,
	ranked: &[ScoredResolver],
	results: &[(Resolver, RecursiveResults)],
) -> Result<()> {
	let mut writer = csv::Writer::from_path(path)?;

	writer.write_record([
		"rank", "resolver", "provider", "score",
		"probe", "mean_ms", "median_ms", "fail_pct",
	])?;

	for r in ranked {
		let Some((_, res)) = results.iter().find(|(res, _)| res.addr == r.resolver.addr) else {
			continue;
		};
		for (probe, s) in res.entries() {
			writer.write_record([
				r.rank.to_string(),
				r.resolver.addr.clone(),
				r.resolver.name.clone(),
				format!("{:.2}", r.score),
				probe.to_string(),
				format!("{:.2}", s.mean_ms()),
				format!("{:.2}", s.median_ms()),
				format!("{:.2}", s.fail_pct()),
			])?;
		}
	}

	writer.flush()?;
	Ok(())
}
