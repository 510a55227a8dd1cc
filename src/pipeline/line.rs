//! The unit handed from connection readers to the sink.

use std::fmt;

/// Default line terminator.
pub const DEFAULT_DELIMITER: u8 = b'\n';

/// One framed log line.
///
/// Always ends with exactly one delimiter byte and contains no other delimiter.
/// Immutable once built; ownership moves through the hand-off channel.
#[derive(Clone, PartialEq, Eq)]
pub struct Line {
    bytes: Vec<u8>,
}

/// Result of framing a raw chunk.
#[derive(Debug, PartialEq, Eq)]
pub struct Framed {
    pub line: Line,
    /// The chunk ended without a delimiter and one was appended.
    pub normalized: bool,
}

impl Line {
    /// Frame a chunk produced by a read-until-delimiter.
    ///
    /// The chunk may only contain `delimiter` as its last byte. Returns `None` for an
    /// empty chunk; otherwise appends the delimiter if it is missing.
    pub fn frame(mut chunk: Vec<u8>, delimiter: u8) -> Option<Framed> {
        let last = *chunk.last()?;
        debug_assert!(
            !chunk[..chunk.len() - 1].contains(&delimiter),
            "chunk contains an embedded delimiter"
        );

        let normalized = last != delimiter;
        if normalized {
            chunk.push(delimiter);
        }

        Some(Framed {
            line: Line { bytes: chunk },
            normalized,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; a line holds at least its delimiter.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl AsRef<[u8]> for Line {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Line")
            .field(&String::from_utf8_lossy(&self.bytes))
            .finish()
    }
}
