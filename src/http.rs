use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::Resolver as LookupResolver;
use reqwest::Url;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

use crate::error::Error;
use crate::transport::Resolver;

/// Time spent in each phase of one HTTP fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionTimings {
	/// Remote socket address the request went to
	pub addr: String,
	pub dns: Duration,
	pub connect: Duration,
	pub tls: Duration,
	pub ttfb: Duration,
	pub transfer: Duration,
	pub total: Duration,
}

/// Timings of a fetch whose hostname lookup went through `server`
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResult {
	pub server: String,
	pub timings: ConnectionTimings,
}

/// Fetches a URL once per resolver and reports phase timings.
///
/// Resolvers whose fetch failed are left out of the returned list.
pub trait HttpTimer {
	fn time_over_resolvers(
		&self,
		url: &Url,
		resolvers: &[Resolver],
	) -> impl Future<Output = Vec<HttpResult>> + Send;
}

type UrlParseError = <Url as FromStr>::Err;

/// Validate a test URL: it must parse, use http or https, and name a host.
pub fn parse_test_url(input: &str) -> Result<Url, Error> {
	let url = Url::parse(input).map_err(|e| match e {
		UrlParseError::EmptyHost => Error::MissingHost { url: input.to_string() },
		_ => Error::InvalidUrl { url: input.to_string(), why: e.to_string() },
	})?;
	if url.scheme() != "http" && url.scheme() != "https" {
		return Err(Error::UnsupportedScheme { scheme: url.scheme().to_string() });
	}
	match url.host_str() {
		Some(host) if !host.is_empty() => Ok(url),
		_ => Err(Error::MissingHost { url: input.to_string() }),
	}
}

/// HTTP/1.1 fetches over a fresh connection per resolver.
pub struct HttpBench {
	timeout: Duration,
	tls: TlsConnector,
}

impl HttpBench {
	pub fn new(timeout: Duration) -> Result<HttpBench, Error> {
		let roots = RootCertStore {
			roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
		};
		let provider = Arc::new(rustls::crypto::ring::default_provider());
		let config = ClientConfig::builder_with_provider(provider)
			.with_safe_default_protocol_versions()
			.map_err(|e| Error::Tls { reason: e.to_string() })?
			.with_root_certificates(roots)
			.with_no_client_auth();
		Ok(HttpBench {
			timeout,
			tls: TlsConnector::from(Arc::new(config)),
		})
	}

	async fn fetch(&self, url: &Url, server: SocketAddr) -> anyhow::Result<ConnectionTimings> {
		let host = bare_host(url);
		let port = url.port_or_known_default().unwrap_or(80);
		let start = Instant::now();

		let ip = match host.parse::<IpAddr>() {
			Ok(ip) => ip,
			Err(_) => lookup(host, server, self.timeout).await?,
		};
		let dns = start.elapsed();

		let remote = SocketAddr::new(ip, port);
		let tcp = TcpStream::connect(remote).await?;
		let connect = start.elapsed() - dns;

		let request = build_request(url);
		let (tls, ttfb, transfer) = if url.scheme() == "https" {
			let name = ServerName::try_from(host.to_string())?;
			let stream = self.tls.connect(name, tcp).await?;
			let tls = start.elapsed() - dns - connect;
			let (ttfb, transfer) = exchange_http(stream, &request).await?;
			(tls, ttfb, transfer)
		} else {
			let (ttfb, transfer) = exchange_http(tcp, &request).await?;
			(Duration::ZERO, ttfb, transfer)
		};

		Ok(ConnectionTimings {
			addr: remote.to_string(),
			dns,
			connect,
			tls,
			ttfb,
			transfer,
			total: start.elapsed(),
		})
	}
}

impl HttpTimer for HttpBench {
	fn time_over_resolvers(
		&self,
		url: &Url,
		resolvers: &[Resolver],
	) -> impl Future<Output = Vec<HttpResult>> + Send {
		async move {
			let mut results = Vec::new();
			// One at a time so fetches do not compete for bandwidth
			for resolver in resolvers {
				debug!("fetching {} via {}", url, resolver.addr);
				match tokio::time::timeout(self.timeout, self.fetch(url, resolver.socket)).await {
					Ok(Ok(timings)) => results.push(HttpResult {
						server: resolver.addr.clone(),
						timings,
					}),
					Ok(Err(e)) => warn!("HTTP test via {} failed: {}", resolver.addr, e),
					Err(_) => warn!("HTTP test via {} timed out", resolver.addr),
				}
			}
			results
		}
	}
}

/// URL host with the brackets around an IPv6 literal removed.
fn bare_host(url: &Url) -> &str {
	url.host_str()
		.unwrap_or_default()
		.trim_start_matches('[')
		.trim_end_matches(']')
}

/// Resolve `host` through one specific resolver, bypassing any cache.
async fn lookup(host: &str, server: SocketAddr, timeout: Duration) -> anyhow::Result<IpAddr> {
	let group = NameServerConfigGroup::from_ips_clear(&[server.ip()], server.port(), true);
	let config = ResolverConfig::from_parts(None, vec![], group);
	let mut opts = ResolverOpts::default();
	opts.cache_size = 0;
	opts.timeout = timeout;
	opts.attempts = 1;
	let resolver = LookupResolver::builder_with_config(config, TokioConnectionProvider::default())
		.with_options(opts)
		.build();
	let ips = resolver.lookup_ip(host).await?;
	ips.iter()
		.next()
		.ok_or_else(|| anyhow::anyhow!("no addresses for {}", host))
}

fn build_request(url: &Url) -> Vec<u8> {
	let mut target = url.path().to_string();
	if let Some(query) = url.query() {
		target.push('?');
		target.push_str(query);
	}
	let host = match url.port() {
		Some(port) => format!("{}:{}", url.host_str().unwrap_or_default(), port),
		None => url.host_str().unwrap_or_default().to_string(),
	};
	format!(
		"GET {} HTTP/1.1\r\nHost: {}\r\nUser-Agent: {}/{}\r\nAccept: */*\r\nConnection: close\r\n\r\n",
		target, host, env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"),
	).into_bytes()
}

/// Send `request` and read the response until the server closes.
///
/// Returns (time to first byte, time from first byte to end of body).
async fn exchange_http<S>(mut stream: S, request: &[u8]) -> std::io::Result<(Duration, Duration)>
where
	S: AsyncRead + AsyncWrite + Unpin,
{
	let start = Instant::now();
	stream.write_all(request).await?;
	stream.flush().await?;

	let mut buf = vec![0u8; 16 * 1024];
	let first = stream.read(&mut buf).await?;
	let ttfb = start.elapsed();
	if first == 0 {
		return Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "empty response"));
	}

	loop {
		match stream.read(&mut buf).await {
			Ok(0) => break,
			Ok(_) => continue,
			// Servers commonly drop TLS connections without close_notify
			Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
			Err(e) => return Err(e),
		}
	}
	Ok((ttfb, start.elapsed() - ttfb))
}
