//! Error types for the IRC client engine.
//!
//! This module defines error types for message parsing failures,
//! line framing, configuration problems, and the client-level errors
//! returned by hooks and the connection API.

use thiserror::Error;

/// Convenience type alias for Results using the crate-level [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level errors surfaced by the client API and by hook handlers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Line framing or transport failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Failed to parse an IRC message.
    #[error("invalid message: {0}")]
    Parse(#[from] MessageParseError),

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A message that must carry a prefix arrived without one.
    #[error("missing prefix in {0}")]
    MissingPrefix(String),

    /// A connection attempt did not complete in time.
    #[error("timed out connecting to {0}")]
    Timeout(String),
}

/// Errors raised while framing lines on a byte stream.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Line exceeded maximum allowed length.
    #[error("message too long: {0} bytes")]
    MessageTooLong(usize),
}

/// Errors encountered when parsing IRC messages.
///
/// The wire grammar itself is forgiving; only tag value escapes can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum MessageParseError {
    /// A tag value ended in the middle of an escape sequence.
    #[error("unexpected end of string while parsing: {0}")]
    UnexpectedEnd(String),
}

/// Errors detected while validating a client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// SASL PLAIN was requested without credentials.
    #[error("sasl credentials are required when using SASL PLAIN")]
    MissingSaslCredentials,

    /// The configured SASL mechanism cannot be performed.
    #[error("unsupported sasl mechanism: {0}")]
    UnsupportedSaslMechanism(String),

    /// The candidate server list is empty.
    #[error("no servers configured")]
    NoServers,

    /// The nickname is empty.
    #[error("nickname must not be empty")]
    EmptyNick,

    /// Session state was needed while no connection is active.
    #[error("session state missing")]
    MissingSession,
}
