//! RPL_ISUPPORT (005) token tracking.
//!
//! Servers advertise features and limits as `NAME[=value]` tokens, sent over
//! one or more 005 replies. A token of the form `-NAME` withdraws a
//! previously advertised feature.

use std::collections::HashMap;

/// Accumulated ISUPPORT tokens for one session, keyed by upper-cased name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Isupport {
    tokens: HashMap<String, Option<String>>,
}

impl Isupport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the parameters of a 005 reply.
    ///
    /// The first parameter (our nick) and the last one (the human readable
    /// "are supported by this server") are not tokens.
    pub fn apply_reply(&mut self, params: &[String]) {
        if params.len() < 2 {
            return;
        }
        for token in &params[1..params.len() - 1] {
            self.apply_token(token);
        }
    }

    /// Apply a single token.
    pub fn apply_token(&mut self, token: &str) {
        if let Some(name) = token.strip_prefix('-') {
            self.tokens.remove(&name.to_ascii_uppercase());
            return;
        }
        let (name, value) = match token.split_once('=') {
            Some((name, value)) => (name, Some(value).filter(|v| !v.is_empty())),
            None => (token, None),
        };
        if !name.is_empty() {
            self.tokens
                .insert(name.to_ascii_uppercase(), value.map(str::to_owned));
        }
    }

    /// Look up a token. The outer `Option` is presence, the inner one the value.
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.tokens
            .get(&key.to_ascii_uppercase())
            .map(|v| v.as_deref())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.tokens.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_apply_reply() {
        let mut isupport = Isupport::new();
        isupport.apply_reply(&params(&[
            "nick",
            "NETWORK=Libera.Chat",
            "casemapping=rfc1459",
            "EXCEPTS",
            "PREFIX=(ov)@+",
            "CHANMODES=eIbq,k,flj,CFLMPQScgimnprstuz",
            "NICKLEN=16",
            "are supported by this server",
        ]));

        assert_eq!(isupport.get("NETWORK"), Some(Some("Libera.Chat")));
        assert_eq!(isupport.get("CASEMAPPING"), Some(Some("rfc1459")));
        assert_eq!(isupport.get("excepts"), Some(None));
        assert_eq!(isupport.get("PREFIX"), Some(Some("(ov)@+")));
        assert_eq!(isupport.len(), 6);
        assert!(!isupport.contains("are supported by this server"));
    }

    #[test]
    fn test_negated_token_removes() {
        let mut isupport = Isupport::new();
        isupport.apply_token("EXCEPTS=e");
        isupport.apply_token("WHOX");
        assert_eq!(isupport.len(), 2);

        isupport.apply_token("-excepts");
        assert!(!isupport.contains("EXCEPTS"));
        assert!(isupport.contains("WHOX"));
    }

    #[test]
    fn test_empty_value_is_none() {
        let mut isupport = Isupport::new();
        isupport.apply_token("STATUSMSG=");
        assert_eq!(isupport.get("STATUSMSG"), Some(None));
    }

    #[test]
    fn test_short_reply_is_ignored() {
        let mut isupport = Isupport::new();
        isupport.apply_reply(&params(&["nick"]));
        assert!(isupport.is_empty());
    }
}
