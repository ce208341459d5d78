use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use hickory_proto::op::{Message, MessageType, Query};
use hickory_proto::rr::{Name, RData, Record, RecordType};
use tokio::net::UdpSocket;

use crate::domains::ProbeCatalog;
use crate::error::ProbeError;

/// One question to put to a resolver.
#[derive(Debug, Clone)]
pub struct DnsQuery {
	pub hostname: String,
	pub record_type: RecordType,
	pub recursion_desired: bool,
	pub timeout: Duration,
}

impl DnsQuery {
	/// Recursive A query with the given timeout.
	pub fn recursive_a(hostname: &str, timeout: Duration) -> DnsQuery {
		DnsQuery {
			hostname: hostname.to_string(),
			record_type: RecordType::A,
			recursion_desired: true,
			timeout,
		}
	}
}

/// Answer section and round-trip time of a completed exchange
#[derive(Debug, Clone)]
pub struct Exchange {
	pub answers: Vec<Record>,
	pub rtt: Duration,
}

/// Single-query DNS client.
pub trait DnsExchange: Send + Sync + 'static {
	fn exchange(
		&self,
		query: &DnsQuery,
		server: SocketAddr,
	) -> impl Future<Output = Result<Exchange, ProbeError>> + Send;
}

/// Build a DNS query message for the given question.
///
/// Returns the serialized query bytes ready to send over UDP.
pub fn build_query(query: &DnsQuery, txid: u16) -> Result<Vec<u8>, ProbeError> {
	let name = Name::from_ascii(&query.hostname)
		.map_err(|e| ProbeError::Transport {
			reason: format!("invalid domain name '{}': {}", query.hostname, e),
		})?;

	let mut message = Message::new();
	message.set_id(txid);
	message.set_recursion_desired(query.recursion_desired);
	message.add_query(Query::query(name, query.record_type));

	message.to_vec()
		.map_err(|e| ProbeError::Transport {
			reason: format!("failed to serialize DNS query: {}", e),
		})
}

/// Parse a DNS response, validating the transaction ID.
///
/// Returns the answer records of a matching response.
pub fn parse_response(bytes: &[u8], expected_txid: u16) -> Result<Vec<Record>, ProbeError> {
	let message = Message::from_vec(bytes)
		.map_err(|e| ProbeError::Transport {
			reason: format!("failed to parse DNS response: {}", e),
		})?;

	if message.id() != expected_txid {
		return Err(ProbeError::Transport {
			reason: format!("txid mismatch: expected {}, got {}", expected_txid, message.id()),
		});
	}
	if message.message_type() != MessageType::Response {
		return Err(ProbeError::Transport {
			reason: "received a query instead of a response".to_string(),
		});
	}

	Ok(message.answers().to_vec())
}

/// Check an answer section against the probe expectations.
///
/// Exactly one A record pointing into the expected address set passes.
pub fn validate_answers(answers: &[Record], catalog: &ProbeCatalog) -> Result<Ipv4Addr, ProbeError> {
	if answers.len() != 1 {
		return Err(ProbeError::WrongAnswerCount { count: answers.len() });
	}
	let record = &answers[0];
	let addr = match record.data() {
		RData::A(a) => a.0,
		_ => {
			return Err(ProbeError::WrongRecordType { record_type: record.record_type() });
		}
	};
	if !catalog.is_expected(addr) {
		return Err(ProbeError::UnexpectedAnswer { addr: addr.into() });
	}
	Ok(addr)
}

/// Plain DNS over UDP, one dedicated socket per query.
///
/// A dedicated socket avoids response stealing between concurrent tasks
/// querying the same resolver.
#[derive(Debug, Clone, Default)]
pub struct UdpExchange;

impl UdpExchange {
	async fn send_udp_query(query: &DnsQuery, server: SocketAddr) -> Result<Exchange, ProbeError> {
		let txid: u16 = rand::random();
		let query_bytes = build_query(query, txid)?;

		let bind_addr = if server.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
		let socket = UdpSocket::bind(bind_addr).await
			.map_err(|e| ProbeError::Transport { reason: format!("bind failed: {}", e) })?;
		// Connected sockets only deliver datagrams sent from `server`
		socket.connect(server).await
			.map_err(|e| ProbeError::Transport { reason: format!("connect failed: {}", e) })?;

		let start = Instant::now();
		socket.send(&query_bytes).await
			.map_err(|e| ProbeError::Transport { reason: format!("send failed: {}", e) })?;

		// 4096 bytes covers EDNS-sized responses; keep reading past stray
		// datagrams whose txid does not match ours
		let mut buf = vec![0u8; 4096];
		let max_reads = 3;
		let mut last_error = ProbeError::Timeout;
		for _ in 0..max_reads {
			let elapsed = start.elapsed();
			if elapsed >= query.timeout {
				return Err(ProbeError::Timeout);
			}
			let remaining = query.timeout - elapsed;

			match tokio::time::timeout(remaining, socket.recv(&mut buf)).await {
				Ok(Ok(len)) => {
					let rtt = start.elapsed();
					match parse_response(&buf[..len], txid) {
						Ok(answers) => return Ok(Exchange { answers, rtt }),
						Err(e) => last_error = e,
					}
				}
				Ok(Err(e)) => {
					return Err(ProbeError::Transport { reason: format!("recv failed: {}", e) });
				}
				Err(_) => return Err(ProbeError::Timeout),
			}
		}
		Err(last_error)
	}
}

impl DnsExchange for UdpExchange {
	fn exchange(
		&self,
		query: &DnsQuery,
		server: SocketAddr,
	) -> impl Future<Output = Result<Exchange, ProbeError>> + Send {
		Self::send_udp_query(query, server)
	}
}
