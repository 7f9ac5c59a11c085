//! Git pkt-line format implementation.
//!
//! Each line is prefixed with a 4-character hex length that counts the prefix
//! itself, or "0000" for flush.

use crate::{GitError, Result};
use bytes::{BufMut, BytesMut};
use std::ops::Range;

/// Size of the length prefix.
pub const PREFIX_LEN: usize = 4;

/// Largest payload that still fits a 4-digit length prefix.
pub const MAX_PAYLOAD_LEN: usize = 0xffff - PREFIX_LEN;

/// A pkt-line packet borrowed from an input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PktLine<'a> {
    /// Flush packet (0000).
    Flush,
    /// Data line, payload only.
    Data(&'a [u8]),
}

impl<'a> PktLine<'a> {
    /// Appends the framed packet to `out`.
    pub fn encode_into(&self, out: &mut BytesMut) -> Result<()> {
        match self {
            Self::Flush => {
                out.put_slice(b"0000");
                Ok(())
            }
            Self::Data(data) => write_data(out, data),
        }
    }

    /// Encodes the packet to bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = BytesMut::new();
        self.encode_into(&mut out)?;
        Ok(out.to_vec())
    }
}

/// Appends `payload` to `out` with its lowercase length prefix.
pub fn write_data(out: &mut BytesMut, payload: &[u8]) -> Result<()> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(GitError::LineTooLong(payload.len()));
    }
    let len = payload.len() + PREFIX_LEN;
    out.reserve(len);
    out.put_slice(format!("{:04x}", len).as_bytes());
    out.put_slice(payload);
    Ok(())
}

/// A packet together with the byte range it occupies in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Range of the whole line, prefix included.
    pub span: Range<usize>,
    /// The decoded packet.
    pub line: PktLine<'a>,
}

/// Walks a buffer one validated pkt-line at a time.
///
/// Yields an error once on the first framing violation and then stops.
#[derive(Debug, Clone)]
pub struct PktLineCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> PktLineCursor<'a> {
    /// Creates a cursor at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            done: false,
        }
    }

    fn read_frame(&mut self) -> Result<Frame<'a>> {
        let start = self.pos;
        let remaining = &self.buf[start..];
        if remaining.len() < PREFIX_LEN {
            return Err(GitError::corrupt(start, "truncated length prefix"));
        }

        let mut len_buf = [0u8; 2];
        hex::decode_to_slice(&remaining[..PREFIX_LEN], &mut len_buf).map_err(|_| {
            GitError::corrupt(
                start,
                format!(
                    "invalid length prefix {:?}",
                    String::from_utf8_lossy(&remaining[..PREFIX_LEN])
                ),
            )
        })?;
        let len = usize::from(u16::from_be_bytes(len_buf));

        let line = match len {
            0 => {
                self.pos = start + PREFIX_LEN;
                PktLine::Flush
            }
            1..=3 => {
                return Err(GitError::corrupt(start, format!("length {len} too small")));
            }
            _ if len > remaining.len() => {
                return Err(GitError::corrupt(
                    start,
                    format!(
                        "line of {len} bytes exceeds the {} remaining",
                        remaining.len()
                    ),
                ));
            }
            _ => {
                self.pos = start + len;
                PktLine::Data(&remaining[PREFIX_LEN..len])
            }
        };

        Ok(Frame {
            span: start..self.pos,
            line,
        })
    }
}

impl<'a> Iterator for PktLineCursor<'a> {
    type Item = Result<Frame<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.buf.len() {
            return None;
        }
        let frame = self.read_frame();
        if frame.is_err() {
            self.done = true;
        }
        Some(frame)
    }
}

impl std::iter::FusedIterator for PktLineCursor<'_> {}
