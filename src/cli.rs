use clap::{ArgAction, Parser};

/// Recursive DNS resolver benchmark
#[derive(Parser, Debug)]
#[command(name = "dnsperfbench")]
#[command(about = "Rank recursive DNS resolvers by cache-hit and authoritative lookup latency")]
#[command(disable_version_flag = true)]
pub struct Cli {
	/// Additional resolver to test (repeatable, e.g. 192.0.2.53 or [2001:db8::53])
	#[arg(long = "resolver")]
	pub resolvers: Vec<String>,

	/// Output raw tab-separated results
	#[arg(short = 'r', long = "raw")]
	pub raw: bool,

	/// Number of resolvers to test at once [default: number of resolvers]
	#[arg(long = "workers")]
	pub workers: Option<usize>,

	/// Limit the number of DNS queries in flight at a time
	#[arg(long = "queries", default_value = "5")]
	pub queries: usize,

	/// URL to time over HTTP through each resolver instead of the DNS test
	#[arg(long = "httptest")]
	pub httptest: Option<String>,

	/// Print version and exit
	#[arg(long = "version")]
	pub version: bool,

	/// Random seed for reproducible hostname selection
	#[arg(short = 's', long = "seed")]
	pub seed: Option<u64>,

	/// Output CSV file path
	#[arg(short = 'o', long = "output")]
	pub output: Option<String>,

	/// Increase log verbosity (-v debug, -vv trace)
	#[arg(short = 'v', action = ArgAction::Count)]
	pub verbosity: u8,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let cli = Cli::parse_from(["dnsperfbench"]);
		assert!(cli.resolvers.is_empty());
		assert!(!cli.raw);
		assert_eq!(cli.queries, 5);
		assert_eq!(cli.workers, None);
		assert_eq!(cli.verbosity, 0);
	}

	#[test]
	fn test_repeated_resolvers() {
		let cli = Cli::parse_from([
			"dnsperfbench", "--resolver", "192.0.2.1", "--resolver", "[2001:db8::1]", "-r", "-vv",
		]);
		assert_eq!(cli.resolvers, vec!["192.0.2.1", "[2001:db8::1]"]);
		assert!(cli.raw);
		assert_eq!(cli.verbosity, 2);
	}

	#[test]
	fn test_version_flag() {
		let cli = Cli::parse_from(["dnsperfbench", "--version"]);
		assert!(cli.version);
	}
}
