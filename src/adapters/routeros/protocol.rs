//! RouterOS API wire protocol.
//!
//! The API is a stream of *sentences*; a sentence is a sequence of
//! length-prefixed *words* terminated by a zero-length word. Word lengths
//! use a variable-width prefix: the count of leading one-bits in the first
//! byte selects how many bytes the length occupies. Replies open with a
//! category word (`!re`, `!done`, `!trap`, `!fatal`) followed by `=key=value`
//! attribute words.
//!
//! This module is pure bytes-in/bytes-out; the client owns the socket.

use std::collections::HashMap;

use crate::ports::RouterError;

/// Encodes a word length into its variable-width prefix.
pub fn encode_length(len: u32) -> Vec<u8> {
    if len < 0x80 {
        vec![len as u8]
    } else if len < 0x4000 {
        let v = len | 0x8000;
        vec![(v >> 8) as u8, v as u8]
    } else if len < 0x20_0000 {
        let v = len | 0xC0_0000;
        vec![(v >> 16) as u8, (v >> 8) as u8, v as u8]
    } else if len < 0x1000_0000 {
        let v = len | 0xE000_0000;
        vec![(v >> 24) as u8, (v >> 16) as u8, (v >> 8) as u8, v as u8]
    } else {
        vec![
            0xF0,
            (len >> 24) as u8,
            (len >> 16) as u8,
            (len >> 8) as u8,
            len as u8,
        ]
    }
}

/// How many bytes follow the first length byte.
pub fn length_tail_size(first: u8) -> Result<usize, RouterError> {
    match first {
        0x00..=0x7F => Ok(0),
        0x80..=0xBF => Ok(1),
        0xC0..=0xDF => Ok(2),
        0xE0..=0xEF => Ok(3),
        0xF0 => Ok(4),
        _ => Err(RouterError::ProtocolError(format!(
            "invalid length prefix byte 0x{first:02X}"
        ))),
    }
}

/// Decodes a word length from its first byte plus the tail bytes
/// `length_tail_size` asked for.
pub fn decode_length(first: u8, tail: &[u8]) -> Result<u32, RouterError> {
    let expected = length_tail_size(first)?;
    if tail.len() != expected {
        return Err(RouterError::ProtocolError(format!(
            "length prefix expected {expected} tail bytes, got {}",
            tail.len()
        )));
    }

    let mut value: u32 = match expected {
        0 => u32::from(first),
        1 => u32::from(first & 0x3F),
        2 => u32::from(first & 0x1F),
        3 => u32::from(first & 0x0F),
        _ => 0,
    };
    for byte in tail {
        value = (value << 8) | u32::from(*byte);
    }
    Ok(value)
}

/// An outbound sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    words: Vec<String>,
}

impl Sentence {
    /// Starts a sentence with a command word, e.g. `/ip/hotspot/user/add`.
    pub fn command(path: impl Into<String>) -> Self {
        Self {
            words: vec![path.into()],
        }
    }

    /// Appends an attribute word `=key=value`.
    pub fn attribute(mut self, key: &str, value: &str) -> Self {
        self.words.push(format!("={key}={value}"));
        self
    }

    /// Appends a query word `?key=value` (print filter).
    pub fn filter(mut self, key: &str, value: &str) -> Self {
        self.words.push(format!("?{key}={value}"));
        self
    }

    /// Restricts reply rows to the given fields.
    pub fn proplist(mut self, fields: &[&str]) -> Self {
        if !fields.is_empty() {
            self.words.push(format!("=.proplist={}", fields.join(",")));
        }
        self
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Serializes the sentence, including the terminating empty word.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for word in &self.words {
            out.extend_from_slice(&encode_length(word.len() as u32));
            out.extend_from_slice(word.as_bytes());
        }
        out.push(0x00);
        out
    }
}

/// Reply category word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// One data row; more sentences follow.
    Re,
    /// End of reply, command succeeded.
    Done,
    /// The device rejected the command.
    Trap,
    /// The connection is dead.
    Fatal,
}

/// One parsed reply sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub kind: ReplyKind,
    pub attributes: HashMap<String, String>,
}

impl Reply {
    /// Parses the words of one received sentence.
    pub fn parse(words: &[String]) -> Result<Self, RouterError> {
        let (first, rest) = words.split_first().ok_or_else(|| {
            RouterError::ProtocolError("empty reply sentence".to_string())
        })?;

        let kind = match first.as_str() {
            "!re" => ReplyKind::Re,
            "!done" => ReplyKind::Done,
            "!trap" => ReplyKind::Trap,
            "!fatal" => ReplyKind::Fatal,
            other => {
                return Err(RouterError::ProtocolError(format!(
                    "unexpected reply word: {other}"
                )))
            }
        };

        let mut attributes = HashMap::new();
        for word in rest {
            // Attribute words look like `=key=value`; `.tag` words and
            // anything else we do not use are skipped.
            if let Some(body) = word.strip_prefix('=') {
                if let Some((key, value)) = body.split_once('=') {
                    attributes.insert(key.to_string(), value.to_string());
                }
            }
        }

        Ok(Self { kind, attributes })
    }

    /// The trap's error message, when present.
    pub fn message(&self) -> Option<&str> {
        self.attributes.get("message").map(String::as_str)
    }
}
