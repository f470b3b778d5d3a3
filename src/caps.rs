//! IRCv3 capability negotiation types.
//!
//! This module provides the values exchanged during `CAP` negotiation: the
//! capabilities a server offers ([`Cap`], [`CapList`]), the client-side
//! tri-state tracked for each requested capability ([`CapState`]), and
//! names for well-known capabilities ([`Capability`]).
//!
//! # Reference
//! - IRCv3 Capability Negotiation: <https://ircv3.net/specs/extensions/capability-negotiation>

use std::fmt;

const CAP_SEPARATOR: char = ' ';
const CAP_VALUE_SEPARATOR: char = '=';

/// A single capability as offered by a server, e.g. `sasl=PLAIN,EXTERNAL`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cap {
    pub name: String,
    pub value: Option<String>,
}

impl Cap {
    pub fn new(name: impl Into<String>, value: Option<String>) -> Self {
        Self {
            name: name.into(),
            value: value.filter(|v| !v.is_empty()),
        }
    }

    /// Parse `name[=value]`, splitting on the first `=`.
    pub fn parse(text: &str) -> Self {
        match text.split_once(CAP_VALUE_SEPARATOR) {
            Some((name, value)) => Self::new(name, Some(value.to_owned())),
            None => Self::new(text, None),
        }
    }
}

impl fmt::Display for Cap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}{}{}", self.name, CAP_VALUE_SEPARATOR, value),
            None => f.write_str(&self.name),
        }
    }
}

/// An ordered list of capabilities from a space-separated token list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CapList(pub Vec<Cap>);

impl CapList {
    /// Parse each space-separated token independently.
    pub fn parse(text: &str) -> Self {
        Self(
            text.split(CAP_SEPARATOR)
                .filter(|token| !token.is_empty())
                .map(Cap::parse)
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cap> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for CapList {
    type Item = Cap;
    type IntoIter = std::vec::IntoIter<Cap>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for CapList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cap) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", CAP_SEPARATOR)?;
            }
            write!(f, "{}", cap)?;
        }
        Ok(())
    }
}

/// Negotiation state of a capability the client asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CapState {
    /// Offered by the server and requested; no ACK/NAK yet.
    Pending,
    /// Acknowledged by the server.
    Enabled,
    /// Rejected by the server, or withdrawn with `CAP DEL`.
    Disabled,
}

impl CapState {
    /// Whether the server has answered for this capability.
    pub fn is_decided(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Capability names the engine or its demo request by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Show all user prefix modes in NAMES
    MultiPrefix,
    /// SASL authentication
    Sasl,
    /// Server-time message tags
    ServerTime,
    /// Any other capability
    Custom(String),
}

impl AsRef<str> for Capability {
    fn as_ref(&self) -> &str {
        match self {
            Self::MultiPrefix => "multi-prefix",
            Self::Sasl => "sasl",
            Self::ServerTime => "server-time",
            Self::Custom(s) => s,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<&str> for Capability {
    fn from(s: &str) -> Self {
        match s {
            "multi-prefix" => Self::MultiPrefix,
            "sasl" => Self::Sasl,
            "server-time" => Self::ServerTime,
            other => Self::Custom(other.to_string()),
        }
    }
}

/// CAP negotiation version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationVersion {
    /// CAP 3.1
    V301,
    /// CAP 3.2
    V302,
}

impl NegotiationVersion {
    /// Get the numeric version value.
    pub fn version(&self) -> u32 {
        match self {
            Self::V301 => 301,
            Self::V302 => 302,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cap_list() {
        let parsed = CapList::parse("blah blah-blah cap-1 test-cap=value-data");
        let expected = [
            ("blah", None),
            ("blah-blah", None),
            ("cap-1", None),
            ("test-cap", Some("value-data")),
        ];

        assert_eq!(parsed.len(), expected.len());
        for ((name, value), actual) in expected.iter().zip(parsed.iter()) {
            assert_eq!(actual.name, *name);
            assert_eq!(actual.value.as_deref(), *value);
        }
    }

    #[test]
    fn test_cap_vendor_name() {
        let cap = Cap::parse("vendor.example.org/cap-name");
        assert_eq!(cap.name, "vendor.example.org/cap-name");
        assert_eq!(cap.value, None);
    }

    #[test]
    fn test_cap_value_splits_on_first_equals() {
        let cap = Cap::parse("sts=port=6697,duration=300");
        assert_eq!(cap.name, "sts");
        assert_eq!(cap.value.as_deref(), Some("port=6697,duration=300"));
        assert_eq!(cap.to_string(), "sts=port=6697,duration=300");

        assert_eq!(Cap::parse("empty=").value, None);
    }

    #[test]
    fn test_cap_list_display() {
        let list = CapList::parse("foo  sasl=PLAIN bar");
        assert_eq!(list.to_string(), "foo sasl=PLAIN bar");
    }

    #[test]
    fn test_cap_state_decided() {
        assert!(!CapState::Pending.is_decided());
        assert!(CapState::Enabled.is_decided());
        assert!(CapState::Disabled.is_decided());
    }

    #[test]
    fn test_capability_names() {
        assert_eq!(Capability::Sasl.as_ref(), "sasl");
        assert_eq!(Capability::from("multi-prefix"), Capability::MultiPrefix);
        assert_eq!(Capability::ServerTime.to_string(), "server-time");
        assert_eq!(
            Capability::from("unknown-cap"),
            Capability::Custom("unknown-cap".to_string())
        );
        assert_eq!(NegotiationVersion::V302.version(), 302);
        assert_eq!(NegotiationVersion::V301.version(), 301);
    }
}
