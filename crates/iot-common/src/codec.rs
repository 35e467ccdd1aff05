// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Big-endian cursor helpers for wire structures
//!
//! Every multi-byte integer the SDK puts on the wire or into storage is
//! big-endian. Short input is reported as [`Error::IncorrectArgument`],
//! short output as [`Error::BufferTooSmall`].

use crate::errors::{Error, Result};

/// Read cursor over a borrowed byte slice
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Start reading at offset zero
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes consumed so far
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Take the next `len` bytes
    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(Error::IncorrectArgument)?;
        let out = self.data.get(self.pos..end).ok_or(Error::IncorrectArgument)?;
        self.pos = end;
        Ok(out)
    }

    /// Take a fixed-size array
    pub fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Read one byte
    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read a big-endian `u16`
    pub fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    /// Read a big-endian `u32`
    pub fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    /// Everything that has not been read yet
    pub fn rest(&mut self) -> &'a [u8] {
        let out = &self.data[self.pos..];
        self.pos = self.data.len();
        out
    }
}

/// Write cursor over a borrowed output buffer
#[derive(Debug)]
pub struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    /// Start writing at offset zero
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes written so far
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Append raw bytes
    pub fn put(&mut self, bytes: &[u8]) -> Result<&mut Self> {
        let end = self.pos + bytes.len();
        self.buf
            .get_mut(self.pos..end)
            .ok_or(Error::BufferTooSmall)?
            .copy_from_slice(bytes);
        self.pos = end;
        Ok(self)
    }

    /// Append one byte
    pub fn u8(&mut self, v: u8) -> Result<&mut Self> {
        self.put(&[v])
    }

    /// Append a big-endian `u16`
    pub fn u16(&mut self, v: u16) -> Result<&mut Self> {
        self.put(&v.to_be_bytes())
    }

    /// Append a big-endian `u32`
    pub fn u32(&mut self, v: u32) -> Result<&mut Self> {
        self.put(&v.to_be_bytes())
    }

    /// Consume the writer, returning the written length
    #[must_use]
    pub const fn finish(self) -> usize {
        self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_short_input() {
        let mut r = Reader::new(&[0x12, 0x34, 0x56]);
        assert_eq!(r.u16(), Ok(0x1234));
        assert_eq!(r.u32(), Err(Error::IncorrectArgument));
        assert_eq!(r.remaining(), 1);
    }

    #[test]
    fn test_writer_overflow() {
        let mut buf = [0u8; 5];
        let mut w = Writer::new(&mut buf);
        w.u32(0xDEAD_BEEF).unwrap();
        assert_eq!(w.u16(1).err(), Some(Error::BufferTooSmall));
        assert_eq!(w.finish(), 4);
        assert_eq!(&buf[..4], &[0xDE, 0xAD, 0xBE, 0xEF]);
    }
}
