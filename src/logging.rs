use anyhow::Result;
use tracing::subscriber::set_global_default;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

/// Diagnostic logging to stderr, so stdout carries only results.
pub struct Logging {
	verbosity: u8,
	rust_log: bool,
}

impl Logging {
	pub fn new(verbosity: u8) -> Logging {
		Logging {
			verbosity,
			rust_log: std::env::var_os("RUST_LOG").is_some(),
		}
	}

	fn log_level(verbosity: u8) -> LevelFilter {
		match verbosity {
			0 => LevelFilter::INFO,
			1 => LevelFilter::DEBUG,
			_ => LevelFilter::TRACE,
		}
	}

	pub fn start(self) -> Result<()> {
		let filter = if self.rust_log {
			// RUST_LOG overrides the -v flags
			EnvFilter::from_default_env()
		} else {
			EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), Logging::log_level(self.verbosity)))
		};

		let fmt = fmt::layer()
			.with_writer(std::io::stderr)
			.with_target(self.verbosity > 1);

		let registry = tracing_subscriber::registry().with(filter).with(fmt);
		set_global_default(registry)?;

		Ok(())
	}
}
