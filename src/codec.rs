//! Line framing for IRC byte streams.
//!
//! [`LineCodec`] splits inbound bytes on `\n`, strips an optional `\r`, and
//! terminates outbound lines with `\r\n`. Parsing into [`Message`](crate::Message)
//! happens above the codec so that malformed lines can be logged and skipped
//! without tearing down the stream.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::error::ProtocolError;

/// Maximum accepted length of a single inbound line, tags included.
pub const MAX_IRC_LINE_LEN: usize = 8191;

/// Newline-delimited UTF-8 text codec.
///
/// Lines longer than the limit are dropped with a warning and decoding
/// resumes after their terminator, so one bad line never ends the stream.
#[derive(Clone, Debug)]
pub struct LineCodec {
    max_line_len: usize,
    /// Bytes already scanned for a newline.
    next_index: usize,
    /// Inside an over-long line; drop everything up to the next newline.
    discarding: bool,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::with_max_line_len(MAX_IRC_LINE_LEN)
    }

    pub fn with_max_line_len(max_line_len: usize) -> Self {
        Self {
            max_line_len,
            next_index: 0,
            discarding: false,
        }
    }

    pub fn max_line_len(&self) -> usize {
        self.max_line_len
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_line(mut line: &[u8]) -> String {
    if let [rest @ .., b'\r'] = line {
        line = rest;
    }
    String::from_utf8_lossy(line).into_owned()
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let found = src[self.next_index..].iter().position(|&b| b == b'\n');
            let Some(offset) = found else {
                if self.discarding {
                    src.clear();
                    self.next_index = 0;
                } else if src.len() > self.max_line_len {
                    warn!("skipping line: {}", ProtocolError::MessageTooLong(src.len()));
                    src.clear();
                    self.next_index = 0;
                    self.discarding = true;
                } else {
                    self.next_index = src.len();
                }
                return Ok(None);
            };

            let end = self.next_index + offset;
            self.next_index = 0;
            if self.discarding {
                src.advance(end + 1);
                self.discarding = false;
                continue;
            }
            if end > self.max_line_len {
                warn!("skipping line: {}", ProtocolError::MessageTooLong(end));
                src.advance(end + 1);
                continue;
            }

            let line = src.split_to(end + 1);
            let text = decode_line(&line[..end]);
            if text.is_empty() {
                continue;
            }
            return Ok(Some(text));
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        // A final line without a terminator.
        self.next_index = 0;
        self.discarding = false;
        if src.is_empty() {
            return Ok(None);
        }
        let line = src.split();
        let text = decode_line(&line);
        Ok(Some(text).filter(|t| !t.is_empty()))
    }
}

impl<T: AsRef<str>> Encoder<T> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, line: T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = line.as_ref().trim_end_matches(['\r', '\n']);
        dst.reserve(line.len() + 2);
        dst.put_slice(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
