use crate::prefix::Prefix;

use super::serialize::needs_colon_prefix;
use super::tags::{Tag, Tags};

/// A parsed or constructed IRC line.
///
/// Messages are immutable once built; the `with_*` methods consume and
/// return a new value.
///
/// ```
/// use slirc_engine::Message;
///
/// let msg: Message = "@id=1 :nick!user@host privmsg #rust :hello there".parse().unwrap();
/// assert_eq!(msg.command(), "PRIVMSG");
/// assert_eq!(msg.params(), ["#rust", "hello there"]);
/// assert_eq!(msg.tag_value("id"), Some("1"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Message {
    pub(super) tags: Tags,
    pub(super) prefix: Option<Prefix>,
    pub(super) command: String,
    pub(super) params: Vec<String>,
    pub(super) trailing: bool,
}

impl Message {
    /// Build a message from a command and its parameters.
    ///
    /// The command is upper-cased. The last parameter is marked trailing
    /// whenever it could not be sent as a middle parameter.
    pub fn new<I, S>(command: &str, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_parts(
            Tags::new(),
            None,
            command.to_ascii_uppercase(),
            params.into_iter().map(Into::into).collect(),
            false,
        )
    }

    pub(super) fn from_parts(
        tags: Tags,
        prefix: Option<Prefix>,
        command: String,
        params: Vec<String>,
        trailing: bool,
    ) -> Self {
        let trailing = match params.last() {
            Some(last) => trailing || needs_colon_prefix(last),
            None => false,
        };
        Self {
            tags,
            prefix,
            command,
            params,
            trailing,
        }
    }

    /// Add or replace a tag.
    #[must_use]
    pub fn with_tag(mut self, name: &str, value: Option<&str>) -> Self {
        self.tags.insert(Tag::new(name, value));
        self
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: Prefix) -> Self {
        self.prefix = Some(prefix);
        self
    }

    /// Force the last parameter to be sent with a leading `:`.
    #[must_use]
    pub fn with_trailing(mut self) -> Self {
        self.trailing = !self.params.is_empty();
        self
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Value of a tag, if the tag is present and has one.
    pub fn tag_value(&self, name: &str) -> Option<&str> {
        self.tags.get(name).flatten()
    }

    pub fn prefix(&self) -> Option<&Prefix> {
        self.prefix.as_ref()
    }

    /// Nickname (or server name) of the message source.
    pub fn source_nickname(&self) -> Option<&str> {
        self.prefix.as_ref().map(|p| p.nick.as_str())
    }

    /// The upper-cased command or numeric.
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// Whether the last parameter is a trailing parameter.
    pub fn has_trailing(&self) -> bool {
        self.trailing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes_command_and_trailing() {
        let msg = Message::new("privmsg", ["#foo", "bar baz"]);
        assert_eq!(msg.command(), "PRIVMSG");
        assert!(msg.has_trailing());

        let msg = Message::new("PONG", ["foobar"]);
        assert!(!msg.has_trailing());
        assert!(msg.with_trailing().has_trailing());

        assert!(!Message::new("QUIT", Vec::<String>::new()).with_trailing().has_trailing());
    }

    #[test]
    fn test_builders() {
        let msg = Message::new("PRIVMSG", ["#chan", "hi"])
            .with_tag("msgid", Some("abc"))
            .with_tag("msgid", Some("def"))
            .with_prefix(Prefix::new("bot", None, Some("example.com".into())));

        assert_eq!(msg.tags().len(), 1);
        assert_eq!(msg.tag_value("msgid"), Some("def"));
        assert_eq!(msg.source_nickname(), Some("bot"));
        assert_eq!(msg.param(0), Some("#chan"));
        assert_eq!(msg.param(2), None);
    }
}
