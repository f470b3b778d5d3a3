//! IRC message prefix (source) types.

use std::fmt;

const USER_SEPARATOR: char = '!';
const HOST_SEPARATOR: char = '@';

/// The source of a message: `nick[!user][@host]`.
///
/// Server names parse as a bare nick.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Prefix {
    pub nick: String,
    pub user: Option<String>,
    pub host: Option<String>,
}

impl Prefix {
    pub fn new(nick: impl Into<String>, user: Option<String>, host: Option<String>) -> Self {
        Self {
            nick: nick.into(),
            user: user.filter(|u| !u.is_empty()),
            host: host.filter(|h| !h.is_empty()),
        }
    }

    /// Parse a prefix without its leading `:`.
    ///
    /// The nick is the shortest non-empty run before `!` or `@`, the user runs
    /// from `!` to the next `@`, and the host is everything after that `@`.
    /// Returns `None` for an empty string.
    pub fn parse(text: &str) -> Option<Self> {
        Self::from_mask(text.strip_prefix(':').unwrap_or(text))
    }

    /// Parse the text of a message's prefix block, which has already lost
    /// its `:`. A further leading `:` belongs to the nick.
    pub(crate) fn from_mask(text: &str) -> Option<Self> {
        let first = text.chars().next()?;

        let start = first.len_utf8();
        let nick_end = text[start..]
            .find([USER_SEPARATOR, HOST_SEPARATOR])
            .map_or(text.len(), |i| i + start);
        let (nick, rest) = text.split_at(nick_end);

        let (user, host) = match rest.strip_prefix(USER_SEPARATOR) {
            Some(after) => {
                let skip = after.chars().next().map_or(0, char::len_utf8);
                match after[skip..].find(HOST_SEPARATOR) {
                    Some(i) => (Some(&after[..i + skip]), Some(&after[i + skip + 1..])),
                    None => (Some(after), None),
                }
            }
            None => (None, rest.strip_prefix(HOST_SEPARATOR)),
        };

        Some(Self::new(nick, user.map(str::to_owned), host.map(str::to_owned)))
    }

    /// The complete `nick!user@host` mask, omitting absent parts.
    pub fn mask(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.nick)?;
        if let Some(user) = &self.user {
            write!(f, "{}{}", USER_SEPARATOR, user)?;
        }
        if let Some(host) = &self.host {
            write!(f, "{}{}", HOST_SEPARATOR, host)?;
        }
        Ok(())
    }
}
