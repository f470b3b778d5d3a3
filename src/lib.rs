//! # slirc-engine
//!
//! An async IRC client engine: it keeps a connection to one of several
//! candidate servers, negotiates IRCv3 capabilities, authenticates with
//! SASL, and routes structured messages to registered hooks.
//!
//! ## Features
//!
//! - IRC message parsing and serialization with tags, prefixes and
//!   trailing parameters
//! - IRCv3 capability negotiation (`CAP LS 302`, `NEW`, `DEL`)
//! - SASL PLAIN and EXTERNAL
//! - Ping based lag monitoring with automatic reconnect
//! - Randomized exponential backoff across a round robin of servers
//! - TCP, TLS (tokio-rustls) and Unix socket transports, or your own
//!   [`Connector`]
//!
//! The message types build without the default `tokio` feature; the
//! connection core needs it.

#![deny(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! ## Quick Start
//!
//! ### Parsing and building messages
//!
//! ```rust
//! use slirc_engine::{Message, Prefix};
//!
//! let raw = "@time=2023-01-01T12:00:00Z :nick!user@host PRIVMSG #channel :Hello!";
//! let message: Message = raw.parse().expect("valid IRC message");
//! assert_eq!(message.tag_value("time"), Some("2023-01-01T12:00:00Z"));
//! assert_eq!(message.source_nickname(), Some("nick"));
//!
//! let reply = Message::new("PRIVMSG", ["#channel", "Hello back"])
//!     .with_tag("+draft/reply", Some("abc"))
//!     .with_prefix(Prefix::parse("bot!bot@example.com").unwrap());
//! assert_eq!(
//!     reply.to_string(),
//!     "@+draft/reply=abc :bot!bot@example.com PRIVMSG #channel :Hello back"
//! );
//! ```

pub mod caps;
pub mod error;
pub mod isupport;
pub mod message;
pub mod prefix;
pub mod sasl;
pub mod session;

#[cfg(feature = "tokio")]
pub mod backoff;
#[cfg(feature = "tokio")]
pub mod client;
#[cfg(feature = "tokio")]
pub mod codec;
#[cfg(feature = "tokio")]
pub mod server;
#[cfg(feature = "tokio")]
pub mod transport;

pub use self::caps::{Cap, CapList, CapState, Capability, NegotiationVersion};
pub use self::error::{ConfigError, Error, MessageParseError, ProtocolError, Result};
pub use self::isupport::Isupport;
pub use self::message::{Message, Tag, Tags};
pub use self::prefix::Prefix;
pub use self::sasl::{SaslCredentials, SaslMechanism, SaslState};
pub use self::session::{CapTable, Liveness, Session};

#[cfg(feature = "tokio")]
pub use self::backoff::Delayer;
#[cfg(feature = "tokio")]
pub use self::client::{
    CapHandler, Client, ClientConfig, ConnectionState, Handler, HookFuture, HookId, Trigger,
    Waiter,
};
#[cfg(feature = "tokio")]
pub use self::codec::{LineCodec, MAX_IRC_LINE_LEN};
#[cfg(feature = "tokio")]
pub use self::server::{Endpoint, ServerDescriptor, TlsOptions};
#[cfg(feature = "tokio")]
pub use self::transport::{AsyncStream, BoxedStream, Connector, NetConnector};
