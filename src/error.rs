//! Error types for the burrow DNS client.

use std::io;
use std::net::{AddrParseError, IpAddr};

use thiserror::Error;

/// Main error type for burrow operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("DNS protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("metrics error: {0}")]
    Metrics(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[source] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("invalid root server address: {0}")]
    InvalidRootServer(#[source] AddrParseError),

    #[error("query_timeout_seconds must be greater than 0")]
    ZeroQueryTimeout,
}

/// Wire-format errors raised while encoding queries or decoding responses.
///
/// A decoding error aborts the response it occurred in; the resolver treats
/// the affected query step as having produced nothing.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("label {label:?} exceeds 63 bytes")]
    LabelTooLong { label: String },

    #[error("host name {host:?} is not plain ASCII")]
    NonAsciiName { host: String },

    #[error("host name {host:?} contains an empty label")]
    EmptyLabel { host: String },

    #[error("message ends early at offset {offset}")]
    UnexpectedEnd { offset: usize },

    #[error("reserved label flags at offset {offset}")]
    BadLabel { offset: usize },

    #[error("compression pointer to offset {offset} is out of range")]
    BadPointer { offset: usize },

    #[error("compression pointer chain exceeds {max} hops")]
    PointerLoop { max: usize },

    #[error("address record carries {found} RDATA bytes, expected {expected}")]
    AddressLength { expected: usize, found: usize },
}

/// Transport-level failures while talking to a server.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no response from {server} after retry")]
    Timeout { server: IpAddr },

    #[error("socket error: {0}")]
    Socket(#[from] io::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;
