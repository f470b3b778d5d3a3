use std::fmt::{self, Write};

use super::types::Message;

/// Check if a string needs colon-prefixing as a trailing IRC argument.
#[inline]
pub(crate) fn needs_colon_prefix(s: &str) -> bool {
    s.is_empty() || s.contains(' ') || s.starts_with(':')
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // A command starting with a sentinel needs an empty block in front
        // of it to read back as a command.
        let tags_sentinel = self.prefix.is_none() && self.command.starts_with('@');
        if !self.tags.is_empty() {
            write!(f, "@{} ", self.tags)?;
        } else if tags_sentinel {
            f.write_str("@ ")?;
        }
        if let Some(prefix) = &self.prefix {
            write!(f, ":{} ", prefix)?;
        } else if self.command.starts_with(':') {
            f.write_str(": ")?;
        }
        f.write_str(&self.command)?;

        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            f.write_char(' ')?;
            if i == last && self.trailing {
                f.write_char(':')?;
            }
            f.write_str(param)?;
        }
        Ok(())
    }
}
