//! Property-based tests for IRC message parsing.
//!
//! Uses proptest to generate random IRC components and verify that:
//! 1. Serialized messages re-parse to an equal message
//! 2. Tag escaping is an exact inverse
//! 3. Parsing never panics on arbitrary text

use proptest::prelude::*;
use slirc_engine::message::tags::{escape, unescape};
use slirc_engine::{CapList, Message, Prefix};

// =============================================================================
// STRATEGIES - Generators for valid IRC components
// =============================================================================

/// Valid IRC nickname: starts with letter or special char, followed by
/// letters, digits, or special chars.
fn nickname_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z\\[\\]\\\\^_`{|}][a-zA-Z0-9\\-\\[\\]\\\\^_`{|}]{0,15}")
        .expect("valid regex")
}

/// Valid IRC username (ident): alphanumeric, no spaces or @ or !
fn username_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("~?[a-zA-Z][a-zA-Z0-9]{0,9}").expect("valid regex")
}

fn hostname_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9]+(\\.[a-z0-9]+)*").expect("valid regex")
}

fn channel_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[#&][a-zA-Z0-9_\\-]{1,49}").expect("valid regex")
}

/// Message text that doesn't contain CR/LF/NUL
fn message_text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[^\r\n\0]{0,400}").expect("valid regex")
}

/// A middle parameter: no spaces, and no leading `:`.
fn middle_param_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[^\r\n\0 :][^\r\n\0 ]{0,20}").expect("valid regex")
}

fn command_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::string::string_regex("[A-Z]{3,10}").expect("valid regex"),
        prop::string::string_regex("[0-9]{3}").expect("valid regex"),
    ]
}

fn tag_key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("\\+?([a-z0-9.\\-]+/)?[a-zA-Z][a-zA-Z0-9\\-]{0,30}")
        .expect("valid regex")
}

/// Tag values may contain anything; reserved characters are escaped.
fn tag_value_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[^\0]{0,100}").expect("valid regex")
}

fn prefix_strategy() -> impl Strategy<Value = Prefix> {
    prop_oneof![
        // Server name
        prop::string::string_regex("[a-z]+\\.[a-z]+\\.[a-z]+")
            .expect("valid regex")
            .prop_map(|server| Prefix::new(server, None, None)),
        // nick!user@host
        (nickname_strategy(), username_strategy(), hostname_strategy())
            .prop_map(|(nick, user, host)| Prefix::new(nick, Some(user), Some(host))),
        // nick@host
        (nickname_strategy(), hostname_strategy())
            .prop_map(|(nick, host)| Prefix::new(nick, None, Some(host))),
    ]
}

fn message_strategy() -> impl Strategy<Value = Message> {
    (
        prop::collection::vec((tag_key_strategy(), prop::option::of(tag_value_strategy())), 0..5),
        prop::option::of(prefix_strategy()),
        command_strategy(),
        prop::collection::vec(middle_param_strategy(), 0..4),
        prop::option::of(message_text_strategy()),
        any::<bool>(),
    )
        .prop_map(|(tags, prefix, command, mut params, trailing, force)| {
            params.extend(trailing);
            let mut msg = Message::new(&command, params);
            for (key, value) in &tags {
                msg = msg.with_tag(key, value.as_deref());
            }
            if let Some(prefix) = prefix {
                msg = msg.with_prefix(prefix);
            }
            if force {
                msg = msg.with_trailing();
            }
            msg
        })
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// The fundamental roundtrip property: serialize → parse = identity
    #[test]
    fn message_roundtrip(msg in message_strategy()) {
        let serialized = msg.to_string();
        let parsed: Message = serialized.parse()
            .expect("Serialized message should be parseable");
        prop_assert_eq!(&msg, &parsed,
            "Roundtrip failed for serialized: {}", serialized);
    }

    /// Re-serializing a parsed message is stable.
    #[test]
    fn serialization_is_stable(msg in message_strategy()) {
        let once = msg.to_string();
        let parsed: Message = once.parse().expect("Should parse");
        prop_assert_eq!(parsed.to_string(), once);
    }

    #[test]
    fn prefix_roundtrip(prefix in prefix_strategy()) {
        let serialized = prefix.to_string();
        prop_assert_eq!(Prefix::parse(&serialized), Some(prefix),
            "Prefix roundtrip failed for: {}", serialized);
    }

    #[test]
    fn escape_roundtrip(value in "\\PC*") {
        prop_assert_eq!(unescape(&escape(&value)).unwrap(), value);
    }

    /// Escaped values never contain the characters that delimit tags.
    #[test]
    fn escaped_values_are_wire_safe(value in tag_value_strategy()) {
        let escaped = escape(&value);
        prop_assert!(!escaped.contains([' ', ';', '\r', '\n']));
    }

    #[test]
    fn tag_value_roundtrip(
        key in tag_key_strategy(),
        value in prop::option::of(tag_value_strategy())
    ) {
        let msg = Message::new("PING", ["test"]).with_tag(&key, value.as_deref());
        let parsed: Message = msg.to_string().parse().expect("Tagged message should parse");

        let expected = value.as_deref().filter(|v| !v.is_empty());
        prop_assert_eq!(parsed.tag_value(&key), expected);
        prop_assert!(parsed.tags().get(&key).is_some());
    }

    #[test]
    fn source_nickname_extraction(
        nick in nickname_strategy(),
        user in username_strategy(),
        host in hostname_strategy()
    ) {
        let line = format!(":{}!{}@{} PING test", nick, user, host);
        let msg: Message = line.parse().expect("Should parse");
        prop_assert_eq!(msg.source_nickname(), Some(nick.as_str()));
    }

    /// Arbitrary text either parses or fails with a tag escape error.
    #[test]
    fn parse_never_panics(line in "[^\r\n]{0,600}") {
        let _ = line.parse::<Message>();
    }

    /// Whatever parses, however odd, survives another trip unchanged.
    #[test]
    fn parsed_lines_round_trip(line in "[@: ]{0,2}[^\r\n]{0,200}") {
        if let Ok(msg) = line.parse::<Message>() {
            let reparsed: Message = msg.to_string().parse()
                .expect("Serialized message should be parseable");
            prop_assert_eq!(msg, reparsed, "Roundtrip failed for: {:?}", line);
        }
    }

    #[test]
    fn cap_list_keeps_every_token(names in prop::collection::vec("[a-z][a-z\\-/.]{0,20}", 0..10)) {
        let list = CapList::parse(&names.join(" "));
        prop_assert_eq!(list.len(), names.len());
        for (cap, name) in list.iter().zip(&names) {
            prop_assert_eq!(&cap.name, name);
            prop_assert_eq!(cap.value.as_deref(), None);
        }
    }
}

// =============================================================================
// EDGE CASE TESTS
// =============================================================================

proptest! {
    /// Empty trailing text must keep its colon.
    #[test]
    fn empty_message_text_roundtrip(target in channel_strategy()) {
        let msg = Message::new("PRIVMSG", [target.as_str(), ""]);
        let serialized = msg.to_string();
        prop_assert!(serialized.ends_with(" :"));
        let parsed: Message = serialized.parse().expect("Should parse");
        prop_assert_eq!(msg, parsed);
    }

    #[test]
    fn privmsg_roundtrip(
        prefix in prefix_strategy(),
        target in channel_strategy(),
        text in message_text_strategy()
    ) {
        let msg = Message::new("PRIVMSG", [target, text]).with_prefix(prefix);
        let parsed: Message = msg.to_string().parse().expect("PRIVMSG should parse");
        prop_assert_eq!(msg, parsed);
    }
}
