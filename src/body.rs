//! Message body storage with re-arm-on-read semantics.
//!
//! A body is logically one byte sequence behind a one-shot stream. Reading
//! it through a modifier must not consume it for later stages, so a full
//! drain replaces the stream with a fresh view over the captured bytes.

use std::fmt;
use std::io::Read;

use bytes::Bytes;

/// In-memory or streamed message body.
pub struct Body {
    kind: Kind,
}

enum Kind {
    Empty,
    Bytes(Bytes),
    Reader(Box<dyn Read + Send>, Option<u64>),
}

impl Body {
    /// An empty body.
    pub fn empty() -> Body {
        Body { kind: Kind::Empty }
    }

    /// Adopt a reader whose total length is not known in advance.
    ///
    /// Downstream stages see the missing length as an unbounded/streamed
    /// body. Use [`Body::sized`] when the length is known so content-length
    /// bookkeeping can follow the stream.
    pub fn new<R: Read + Send + 'static>(reader: R) -> Body {
        Body {
            kind: Kind::Reader(Box::new(reader), None),
        }
    }

    /// Adopt a reader with a statically known total length.
    pub fn sized<R: Read + Send + 'static>(reader: R, len: u64) -> Body {
        Body {
            kind: Kind::Reader(Box::new(reader), Some(len)),
        }
    }

    /// Total length in bytes, when statically knowable.
    pub fn len_hint(&self) -> Option<u64> {
        match &self.kind {
            Kind::Empty => Some(0),
            Kind::Bytes(b) => Some(b.len() as u64),
            Kind::Reader(_, len) => *len,
        }
    }

    /// Whether the body is known to be empty.
    pub fn is_empty(&self) -> bool {
        matches!(self.len_hint(), Some(0))
    }

    /// Drain the body fully and re-arm it over the captured bytes.
    ///
    /// After a successful read the body holds the same bytes again, so
    /// stages running after a modifier still observe the full payload. On
    /// failure the body is left empty and the error propagates to the
    /// caller.
    pub fn read_all(&mut self) -> std::io::Result<Bytes> {
        match &mut self.kind {
            Kind::Empty => Ok(Bytes::new()),
            Kind::Bytes(b) => Ok(b.clone()),
            Kind::Reader(reader, _) => {
                let mut buf = Vec::new();
                match reader.read_to_end(&mut buf) {
                    Ok(_) => {
                        let bytes = Bytes::from(buf);
                        self.kind = Kind::Bytes(bytes.clone());
                        Ok(bytes)
                    }
                    Err(e) => {
                        self.kind = Kind::Empty;
                        Err(e)
                    }
                }
            }
        }
    }
}

impl Default for Body {
    fn default() -> Body {
        Body::empty()
    }
}

impl From<Bytes> for Body {
    fn from(b: Bytes) -> Body {
        Body {
            kind: Kind::Bytes(b),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(v: Vec<u8>) -> Body {
        Bytes::from(v).into()
    }
}

impl From<String> for Body {
    fn from(s: String) -> Body {
        Bytes::from(s).into()
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Body {
        Bytes::copy_from_slice(s.as_bytes()).into()
    }
}

impl From<&[u8]> for Body {
    fn from(s: &[u8]) -> Body {
        Bytes::copy_from_slice(s).into()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Empty => f.write_str("Body::Empty"),
            Kind::Bytes(b) => f.debug_tuple("Body::Bytes").field(&b.len()).finish(),
            Kind::Reader(_, len) => f.debug_tuple("Body::Reader").field(len).finish(),
        }
    }
}
