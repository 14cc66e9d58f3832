//! Bounds-checked reads over a borrowed byte window.
//!
//! A [`ByteCursor`] never owns data: it holds a slice of the caller's buffer, the absolute
//! offset of that slice's first byte (`base_offset`) and a read position. Every read either
//! returns a value and advances by exactly its width, or fails with
//! [`CursorError::OutOfBounds`] and leaves the position untouched.
//!
//! Nested records are walked through [`ByteCursor::sub_slice`]: the child cursor covers only
//! the bytes its parent declared for it, so a handler cannot read past its record even if it
//! tries to.

use crate::field::ByteRange;
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Byte order for multi-byte reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Big,
    Little,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CursorError {
    #[error("read of {wanted} bytes at offset {offset} exceeds the {available} bytes available")]
    OutOfBounds {
        offset: usize,
        wanted: usize,
        available: usize,
    },
}

/// Read cursor over a bounded window of a borrowed buffer.
#[derive(Debug, Clone, Copy)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    base_offset: usize,
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteCursor { data, base_offset: 0, pos: 0 }
    }

    /// Cursor over `data[start..]`; offsets stay absolute to `data`.
    /// A start past the end yields an empty cursor.
    pub fn at(data: &'a [u8], start: usize) -> Self {
        let start = start.min(data.len());
        ByteCursor { data: &data[start..], base_offset: start, pos: 0 }
    }

    /// Absolute offset of the next byte to read.
    pub fn offset(&self) -> usize {
        self.base_offset + self.pos
    }

    pub fn base_offset(&self) -> usize {
        self.base_offset
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Absolute range covering the whole window.
    pub fn window(&self) -> ByteRange {
        ByteRange::new(self.base_offset, self.data.len())
    }

    /// Absolute range of the next `len` bytes, without checking bounds.
    pub fn range_ahead(&self, len: usize) -> ByteRange {
        ByteRange::new(self.offset(), len)
    }

    fn check(&self, wanted: usize) -> Result<(), CursorError> {
        if wanted > self.remaining() {
            return Err(CursorError::OutOfBounds {
                offset: self.offset(),
                wanted,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, CursorError> {
        self.check(1)?;
        let v = self.data[self.pos];
        self.pos += 1;
        Ok(v)
    }

    pub fn read_u16(&mut self, endianness: Endianness) -> Result<u16, CursorError> {
        let v = self.peek_u16(endianness)?;
        self.pos += 2;
        Ok(v)
    }

    /// Reads a u16 without advancing.
    pub fn peek_u16(&self, endianness: Endianness) -> Result<u16, CursorError> {
        self.check(2)?;
        let b = &self.data[self.pos..];
        Ok(match endianness {
            Endianness::Big => BigEndian::read_u16(b),
            Endianness::Little => LittleEndian::read_u16(b),
        })
    }

    pub fn read_u32(&mut self, endianness: Endianness) -> Result<u32, CursorError> {
        self.check(4)?;
        let b = &self.data[self.pos..];
        let v = match endianness {
            Endianness::Big => BigEndian::read_u32(b),
            Endianness::Little => LittleEndian::read_u32(b),
        };
        self.pos += 4;
        Ok(v)
    }

    pub fn read_u64(&mut self, endianness: Endianness) -> Result<u64, CursorError> {
        self.check(8)?;
        let b = &self.data[self.pos..];
        let v = match endianness {
            Endianness::Big => BigEndian::read_u64(b),
            Endianness::Little => LittleEndian::read_u64(b),
        };
        self.pos += 8;
        Ok(v)
    }

    /// Borrows the next `len` bytes and advances past them.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CursorError> {
        self.check(len)?;
        let b = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(b)
    }

    /// Fixed-width, NUL-padded string field; invalid UTF-8 is replaced.
    pub fn read_padded_str(&mut self, len: usize) -> Result<String, CursorError> {
        let b = self.read_bytes(len)?;
        let end = b.iter().position(|&c| c == 0).unwrap_or(b.len());
        Ok(String::from_utf8_lossy(&b[..end]).into_owned())
    }

    pub fn skip(&mut self, len: usize) -> Result<(), CursorError> {
        self.check(len)?;
        self.pos += len;
        Ok(())
    }

    /// Child cursor over the next `len` bytes; this cursor advances past them.
    pub fn sub_slice(&mut self, len: usize) -> Result<ByteCursor<'a>, CursorError> {
        let base_offset = self.offset();
        let data = self.read_bytes(len)?;
        Ok(ByteCursor { data, base_offset, pos: 0 })
    }

    /// Child cursor over everything left; this cursor ends up exhausted.
    pub fn rest(&mut self) -> ByteCursor<'a> {
        let base_offset = self.offset();
        let data = &self.data[self.pos..];
        self.pos = self.data.len();
        ByteCursor { data, base_offset, pos: 0 }
    }

    /// Unread bytes, without advancing.
    pub fn remaining_bytes(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}
