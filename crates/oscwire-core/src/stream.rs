//! Primitive OSC wire readers and writers
//!
//! Every field on the wire is aligned to 4 bytes. Numbers are big-endian,
//! strings are NUL-terminated and NUL-padded, blobs carry a 32-bit length
//! prefix followed by the padded payload.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::value::Rgba;
use crate::{Error, Result};

/// Number of NUL bytes needed to bring `len` up to a 4-byte boundary
#[inline(always)]
pub fn padding(len: usize) -> usize {
    (4 - (len % 4)) % 4
}

/// Encoded size of a string, terminator and padding included
#[inline]
pub fn padded_string_len(s: &str) -> usize {
    let n = s.len() + 1;
    n + padding(n)
}

/// Encoded size of a blob, length prefix and padding included
#[inline]
pub fn padded_blob_len(data: &[u8]) -> usize {
    4 + data.len() + padding(data.len())
}

// ============================================================================
// WRITER
// ============================================================================

/// Growable big-endian writer over a [`BytesMut`]
#[derive(Debug, Default)]
pub struct StreamWriter {
    buf: BytesMut,
}

impl StreamWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Bytes written so far
    #[inline]
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    #[inline]
    pub fn write_i32(&mut self, v: i32) {
        self.buf.put_i32(v);
    }

    #[inline]
    pub fn write_u32(&mut self, v: u32) {
        self.buf.put_u32(v);
    }

    #[inline]
    pub fn write_i64(&mut self, v: i64) {
        self.buf.put_i64(v);
    }

    #[inline]
    pub fn write_f32(&mut self, v: f32) {
        self.buf.put_f32(v);
    }

    #[inline]
    pub fn write_f64(&mut self, v: f64) {
        self.buf.put_f64(v);
    }

    #[inline]
    pub fn write_time_tag(&mut self, v: u64) {
        self.buf.put_u64(v);
    }

    /// ASCII character in a full 32-bit word
    #[inline]
    pub fn write_char(&mut self, c: u8) {
        self.buf.put_u32(c as u32);
    }

    #[inline]
    pub fn write_color(&mut self, color: Rgba) {
        self.buf.put_slice(&[color.r, color.g, color.b, color.a]);
    }

    pub fn write_string(&mut self, s: &str) -> Result<()> {
        if s.as_bytes().contains(&0) {
            return Err(Error::InvalidString(format!(
                "embedded NUL in {:?}",
                s
            )));
        }
        let n = s.len() + 1;
        self.buf.put_slice(s.as_bytes());
        self.buf.put_bytes(0, 1 + padding(n));
        Ok(())
    }

    pub fn write_blob(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > i32::MAX as usize {
            return Err(Error::PacketTooLarge(data.len()));
        }
        self.buf.put_i32(data.len() as i32);
        self.buf.put_slice(data);
        self.buf.put_bytes(0, padding(data.len()));
        Ok(())
    }

    pub fn write_raw(&mut self, data: &[u8]) {
        self.buf.put_slice(data);
    }

    /// Reserve a 32-bit slot to be filled in later with [`patch_u32`](Self::patch_u32).
    pub fn reserve_u32(&mut self) -> usize {
        let at = self.buf.len();
        self.buf.put_u32(0);
        at
    }

    pub fn patch_u32(&mut self, at: usize, v: u32) {
        self.buf[at..at + 4].copy_from_slice(&v.to_be_bytes());
    }

    /// Drop everything written after `len`.
    pub fn truncate(&mut self, len: usize) {
        self.buf.truncate(len);
    }
}

// ============================================================================
// READER
// ============================================================================

/// Bounds-checked big-endian reader over a borrowed buffer.
///
/// Reads never go past the end of the slice; running short yields
/// [`Error::BufferTooSmall`] instead of a panic.
#[derive(Debug, Clone)]
pub struct StreamReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> StreamReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes consumed so far
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Unread bytes, without consuming them
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::BufferTooSmall {
                needed: n,
                have: self.remaining(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Split off the next `len` bytes as an independent reader.
    pub fn sub_reader(&mut self, len: usize) -> Result<StreamReader<'a>> {
        self.take(len).map(StreamReader::new)
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    #[inline]
    pub fn read_i32(&mut self) -> Result<i32> {
        let mut b = self.take(4)?;
        Ok(b.get_i32())
    }

    #[inline]
    pub fn read_u32(&mut self) -> Result<u32> {
        let mut b = self.take(4)?;
        Ok(b.get_u32())
    }

    #[inline]
    pub fn read_i64(&mut self) -> Result<i64> {
        let mut b = self.take(8)?;
        Ok(b.get_i64())
    }

    #[inline]
    pub fn read_f32(&mut self) -> Result<f32> {
        let mut b = self.take(4)?;
        Ok(b.get_f32())
    }

    #[inline]
    pub fn read_f64(&mut self) -> Result<f64> {
        let mut b = self.take(8)?;
        Ok(b.get_f64())
    }

    #[inline]
    pub fn read_time_tag(&mut self) -> Result<u64> {
        let mut b = self.take(8)?;
        Ok(b.get_u64())
    }

    pub fn read_char(&mut self) -> Result<u8> {
        let word = self.read_u32()?;
        Ok((word & 0xFF) as u8)
    }

    pub fn read_color(&mut self) -> Result<Rgba> {
        let b = self.take(4)?;
        Ok(Rgba::new(b[0], b[1], b[2], b[3]))
    }

    /// Read a NUL-terminated, padded string.
    ///
    /// Padding cut off by the end of the buffer is tolerated; the
    /// terminator is not.
    pub fn read_string(&mut self) -> Result<&'a str> {
        let rest = self.rest();
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| Error::InvalidString("missing NUL terminator".to_string()))?;
        let text = std::str::from_utf8(&rest[..nul])
            .map_err(|e| Error::InvalidString(e.to_string()))?;
        let consumed = (nul + 1 + padding(nul + 1)).min(rest.len());
        self.pos += consumed;
        Ok(text)
    }

    pub fn read_blob(&mut self) -> Result<&'a [u8]> {
        let len = self.read_u32()? as usize;
        let data = self.take(len)?;
        let pad = padding(len).min(self.remaining());
        self.pos += pad;
        Ok(data)
    }
}
