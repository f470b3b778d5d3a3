//! IRCv3 message tags and tag value escaping.

use std::fmt::{self, Result as FmtResult, Write};

use crate::error::MessageParseError;

/// Separator between tags in a tag block.
pub const TAG_SEPARATOR: char = ';';

/// Escape a tag value for serialization.
///
/// Escapes special characters according to the IRCv3 message-tags spec.
pub fn escape_tag_value(f: &mut dyn Write, value: &str) -> FmtResult {
    for c in value.chars() {
        match c {
            ';' => f.write_str("\\:")?,
            ' ' => f.write_str("\\s")?,
            '\\' => f.write_str("\\\\")?,
            '\r' => f.write_str("\\r")?,
            '\n' => f.write_str("\\n")?,
            c => f.write_char(c)?,
        }
    }
    Ok(())
}

/// Escape a tag value into a new string.
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    // Writing to a String cannot fail.
    let _ = escape_tag_value(&mut escaped, value);
    escaped
}

/// Unescape a tag value from wire format.
///
/// Reverses the escaping applied by [`escape_tag_value`]. Unknown escape
/// sequences yield the escaped character itself. A lone backslash at the
/// end of the value is an error.
pub fn unescape(value: &str) -> Result<String, MessageParseError> {
    let mut unescaped = String::with_capacity(value.len());
    let mut iter = value.chars();
    while let Some(c) = iter.next() {
        let r = if c == '\\' {
            match iter.next() {
                Some(':') => ';',
                Some('s') => ' ',
                Some('\\') => '\\',
                Some('r') => '\r',
                Some('n') => '\n',
                Some(c) => c,
                None => return Err(MessageParseError::UnexpectedEnd(value.to_owned())),
            }
        } else {
            c
        };
        unescaped.push(r);
    }
    Ok(unescaped)
}

/// A single message tag: a name and an optional, unescaped value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tag {
    name: String,
    value: Option<String>,
}

impl Tag {
    /// Create a tag. An empty value is normalized to no value.
    pub fn new(name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        let value = value.map(Into::into).filter(|v: &String| !v.is_empty());
        Self {
            name: name.into(),
            value,
        }
    }

    /// Parse a single `name[=escaped-value]` entry.
    pub fn parse(text: &str) -> Result<Self, MessageParseError> {
        let (name, value) = match text.split_once('=') {
            Some((name, value)) if !value.is_empty() => (name, Some(unescape(value)?)),
            Some((name, _)) => (name, None),
            None => (text, None),
        };
        Ok(Self::new(name, value))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(value) = &self.value {
            f.write_char('=')?;
            escape_tag_value(f, value)?;
        }
        Ok(())
    }
}

/// Ordered tag set with unique names.
///
/// Inserting a name that is already present replaces its value in place,
/// keeping the original position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tags(Vec<Tag>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the body of a tag block (without the leading `@`).
    pub fn parse(text: &str) -> Result<Self, MessageParseError> {
        let mut tags = Self::new();
        for entry in text.split(TAG_SEPARATOR).filter(|e| !e.is_empty()) {
            let tag = Tag::parse(entry)?;
            // A nameless tag cannot be written back out.
            if !tag.name.is_empty() {
                tags.insert(tag);
            }
        }
        Ok(tags)
    }

    pub fn insert(&mut self, tag: Tag) {
        match self.0.iter_mut().find(|t| t.name == tag.name) {
            Some(existing) => existing.value = tag.value,
            None => self.0.push(tag),
        }
    }

    /// Look up a tag. The outer `Option` is presence, the inner one the value.
    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.0.iter().find(|t| t.name == name).map(Tag::value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Tag> for Tags {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        let mut tags = Self::new();
        for tag in iter {
            tags.insert(tag);
        }
        tags
    }
}

impl fmt::Display for Tags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, tag) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_char(TAG_SEPARATOR)?;
            }
            write!(f, "{}", tag)?;
        }
        Ok(())
    }
}
