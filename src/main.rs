mod bench;
mod cli;
mod dns;
mod domains;
mod error;
mod http;
mod logging;
mod output;
mod resolver;
mod stats;
mod transport;

use clap::Parser;
use std::time::Duration;
use tracing::info;

use crate::bench::Bench;
use crate::cli::Cli;
use crate::dns::UdpExchange;
use crate::http::{HttpBench, HttpTimer};
use crate::logging::Logging;
use crate::transport::{BenchmarkConfig, Resolver};

/// Upper bound on one HTTP fetch through one resolver.
const HTTP_TEST_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	if cli.version {
		println!("{}", env!("CARGO_PKG_VERSION"));
		println!("{}", option_env!("RUSTC_VERSION").unwrap_or("unknown"));
		return Ok(());
	}

	Logging::new(cli.verbosity).start()?;

	// Built-in resolvers first, then additions in the order given
	let additions = cli.resolvers.iter()
		.map(|r| resolver::parse_resolver(r))
		.collect::<Result<Vec<_>, _>>()?;
	let resolvers = resolver::merge_resolvers(resolver::default_resolvers(), additions);

	if let Some(target) = &cli.httptest {
		return run_http_test(target, &resolvers).await;
	}

	let config = BenchmarkConfig::new(resolvers, cli.workers, cli.queries, cli.seed);
	let bench = Bench::new(config, UdpExchange);
	if !cli.raw {
		output::print_config_summary(bench.config());
	}

	let results = bench.run().await?;

	for (resolver, res) in &results {
		if cli.raw {
			print!("{}", output::render_resolver_raw(resolver, res));
		} else {
			print!("{}", output::render_resolver_table(resolver, res));
		}
	}

	let ranked = stats::rank_resolvers(&results);
	print!("{}", output::render_summary(&ranked, cli.raw));

	if let Some(path) = &cli.output {
		output::write_csv(path, &ranked, &results)?;
		info!("results written to {}", path);
	}

	Ok(())
}

/// Time an HTTP fetch of `target` with each resolver doing the DNS lookup.
async fn run_http_test(target: &str, resolvers: &[Resolver]) -> anyhow::Result<()> {
	let url = http::parse_test_url(target)?;
	let timer = HttpBench::new(HTTP_TEST_TIMEOUT)?;
	info!("timing {} over {} resolvers", url, resolvers.len());
	let results = timer.time_over_resolvers(&url, resolvers).await;
	print!("{}", output::render_http_table(&results, resolvers));
	Ok(())
}
