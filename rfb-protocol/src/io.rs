//! Byte-slice readers and writers for the VMnc record format.
//!
//! Records are decoded from an already-delimited byte range rather than from a
//! socket, so reading never blocks: when a read runs past the end of the range
//! the reader reports [`DecodeError::InsufficientData`] with the total length
//! it would have needed. All multi-byte values are in network byte order.
//!
//! # Examples
//!
//! ```
//! use rfb_protocol::io::{RfbReader, RfbWriter};
//!
//! let mut out = RfbWriter::new();
//! out.write_u8(0);
//! out.write_u16(1024);
//! let bytes = out.freeze();
//!
//! let mut input = RfbReader::new(&bytes);
//! assert_eq!(input.read_u8().unwrap(), 0);
//! assert_eq!(input.read_u16().unwrap(), 1024);
//! assert!(input.read_u8().is_err());
//! ```

use crate::DecodeError;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Cursor over a borrowed byte range.
///
/// The reader position only advances on a successful read, so a failed read
/// leaves the reader where it was.
#[derive(Debug, Clone)]
pub struct RfbReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> RfbReader<'a> {
    /// Create a reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of bytes left after the current position.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Total length of the underlying range.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the underlying range is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Fail with `InsufficientData` unless `n` more bytes are available.
    ///
    /// # Errors
    ///
    /// The error's `needed` is the total range length required to satisfy
    /// the request.
    pub fn ensure(&self, n: usize) -> Result<(), DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::InsufficientData {
                needed: self.pos.saturating_add(n),
            });
        }
        Ok(())
    }

    /// Borrow the next `n` bytes and advance past them.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        self.ensure(n)?;
        let data = self.data;
        let slice = &data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_bytes(1)?.get_u8())
    }

    /// Read a 16-bit unsigned integer in network byte order.
    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(self.read_bytes(2)?.get_u16())
    }

    /// Read a 32-bit unsigned integer in network byte order.
    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(self.read_bytes(4)?.get_u32())
    }

    /// Skip `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<(), DecodeError> {
        self.read_bytes(n).map(|_| ())
    }
}

/// Growable big-endian writer used to serialise records and rectangles.
///
/// The decoder never writes to the wire itself; this exists so that records
/// can be built for tests, fixtures and tools in the same byte layout the
/// reader consumes.
#[derive(Debug, Default)]
pub struct RfbWriter {
    buffer: BytesMut,
}

impl RfbWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a single byte.
    pub fn write_u8(&mut self, value: u8) {
        self.buffer.put_u8(value);
    }

    /// Write a 16-bit unsigned integer in network byte order.
    pub fn write_u16(&mut self, value: u16) {
        self.buffer.put_u16(value);
    }

    /// Write a 32-bit unsigned integer in network byte order.
    pub fn write_u32(&mut self, value: u32) {
        self.buffer.put_u32(value);
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buffer.put_slice(data);
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// True if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Finish writing and return the bytes.
    pub fn freeze(self) -> Bytes {
        self.buffer.freeze()
    }
}
