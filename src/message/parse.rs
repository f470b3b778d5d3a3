//! Nom-based IRC message parser.
//!
//! The grammar is deliberately forgiving: every part of a line is optional
//! and structural oddities fall back to empty defaults. Only tag value
//! escapes can make a parse fail.

use std::str::FromStr;

use nom::{
    bytes::complete::take_till,
    character::complete::char,
    combinator::opt,
    sequence::{preceded, terminated},
    IResult,
};

use crate::error::MessageParseError;
use crate::prefix::Prefix;

use super::tags::Tags;
use super::types::Message;

const TAGS_SENTINEL: char = '@';
const PREFIX_SENTINEL: char = ':';
const TRAIL_SENTINEL: char = ':';
const PARAM_SEPARATOR: char = ' ';

fn is_separator(c: char) -> bool {
    c == PARAM_SEPARATOR
}

/// A run introduced by `sentinel` up to the first space, plus that space.
fn block(sentinel: char) -> impl FnMut(&str) -> IResult<&str, Option<&str>> {
    move |input| {
        opt(terminated(
            preceded(char(sentinel), take_till(is_separator)),
            opt(char(PARAM_SEPARATOR)),
        ))(input)
    }
}

fn command(input: &str) -> IResult<&str, &str> {
    terminated(take_till(is_separator), opt(char(PARAM_SEPARATOR)))(input)
}

/// Split a line into its raw tag block, prefix, command and parameter text.
fn header(input: &str) -> IResult<&str, (Option<&str>, Option<&str>, &str)> {
    let (input, tags) = block(TAGS_SENTINEL)(input)?;
    let (input, prefix) = block(PREFIX_SENTINEL)(input)?;
    let (input, command) = command(input)?;
    Ok((input, (tags, prefix, command)))
}

/// Split the parameter text. Returns the parameters and whether the last
/// one was introduced by `:`.
fn params(mut rest: &str) -> (Vec<String>, bool) {
    let mut params = Vec::new();
    while !rest.is_empty() {
        if let Some(trailing) = rest.strip_prefix(TRAIL_SENTINEL) {
            params.push(trailing.to_owned());
            return (params, true);
        }
        let (param, remainder) = rest.split_once(PARAM_SEPARATOR).unwrap_or((rest, ""));
        if !param.is_empty() {
            params.push(param.to_owned());
        }
        rest = remainder;
    }
    (params, false)
}

impl FromStr for Message {
    type Err = MessageParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim_end_matches(['\r', '\n']);
        // The header combinators only fail on incomplete input, which
        // complete-mode parsers never report.
        let (rest, (tags, prefix, command)) = header(text).unwrap_or(("", (None, None, text)));

        let tags = match tags {
            Some(block) => Tags::parse(block)?,
            None => Tags::new(),
        };
        let prefix = prefix.and_then(Prefix::from_mask);
        let (params, trailing) = params(rest);

        Ok(Message::from_parts(
            tags,
            prefix,
            command.to_ascii_uppercase(),
            params,
            trailing,
        ))
    }
}
