use std::net::IpAddr;

use hickory_proto::rr::RecordType;
use thiserror::Error;

/// Why a single DNS query counted as a failure.
///
/// These never abort a run; they are recorded as failed samples.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
	#[error("transport error: {reason}")]
	Transport { reason: String },
	#[error("query timed out")]
	Timeout,
	#[error("wrong answer count: expected 1, got {count}")]
	WrongAnswerCount { count: usize },
	#[error("wrong record type: expected A, got {record_type}")]
	WrongRecordType { record_type: RecordType },
	#[error("unexpected answer {addr}, possible hijack")]
	UnexpectedAnswer { addr: IpAddr },
}

/// Fatal errors that stop the process.
#[derive(Debug, Error)]
pub enum Error {
	#[error("failed to acquire {limiter} limiter: semaphore closed")]
	LimiterClosed { limiter: &'static str },
	#[error("result channel closed after {received} of {expected} results")]
	CollectorClosed { received: usize, expected: usize },
	#[error("invalid resolver address '{input}': {why}")]
	InvalidResolver { input: String, why: String },
	#[error("invalid URL '{url}': {why}")]
	InvalidUrl { url: String, why: String },
	#[error("only http:// and https:// schemes supported, got '{scheme}'")]
	UnsupportedScheme { scheme: String },
	#[error("invalid URL '{url}': missing host")]
	MissingHost { url: String },
	#[error("failed to set up TLS: {reason}")]
	Tls { reason: String },
}
