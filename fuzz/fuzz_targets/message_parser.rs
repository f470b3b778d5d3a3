//! Fuzz target for IRC message parsing
//!
//! This fuzzer tests the robustness of the IRC message parser by feeding it
//! randomly generated input data and ensuring it doesn't panic or crash.

#![no_main]

use libfuzzer_sys::fuzz_target;
use slirc_engine::{CapList, Message, Prefix, Tag};
use std::str;

fuzz_target!(|data: &[u8]| {
    // Only fuzz valid UTF-8 strings to focus on protocol-level issues
    if let Ok(input) = str::from_utf8(data) {
        if input.is_empty() || input.len() > 8191 {
            return;
        }

        // Serializing whatever parsed must not panic either.
        if let Ok(message) = input.parse::<Message>() {
            let _ = message.to_string().parse::<Message>();
        }

        let _ = Tag::parse(input);
        let _ = Prefix::parse(input);
        let _ = CapList::parse(input);
    }
});
