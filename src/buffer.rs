//! A cursor over a fixed byte slice, used by the wire codec.
//!
//! See the `protocol` module for the format this is reading and writing.

/// A read-only, randomly-seekable cursor over a byte slice.
///
/// Cloning is cheap (a borrowed slice plus a `usize`), which lets the
/// name decoder follow a compression pointer into a fresh cursor
/// without disturbing the outer one.
#[derive(Debug, Clone, Copy)]
pub struct ConsumableBuffer<'a> {
    octets: &'a [u8],
    position: usize,
}

impl<'a> ConsumableBuffer<'a> {
    pub fn new(octets: &'a [u8]) -> Self {
        Self {
            octets,
            position: 0,
        }
    }

    /// The current absolute offset into the backing slice.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn next_u8(&mut self) -> Result<u8, Error> {
        if self.position < self.octets.len() {
            let a = self.octets[self.position];
            self.position += 1;
            Ok(a)
        } else {
            Err(Error::InputTruncated)
        }
    }

    pub fn next_u16(&mut self) -> Result<u16, Error> {
        let a = self.next_u8()?;
        let b = self.next_u8()?;
        Ok(u16::from_be_bytes([a, b]))
    }

    pub fn next_u32(&mut self) -> Result<u32, Error> {
        let a = self.next_u16()?;
        let b = self.next_u16()?;
        Ok(u32::from_be_bytes([
            (a >> 8) as u8,
            a as u8,
            (b >> 8) as u8,
            b as u8,
        ]))
    }

    /// Read `size` bytes, advancing the cursor.
    pub fn take(&mut self, size: usize) -> Result<&'a [u8], Error> {
        if self.octets.len() >= self.position + size {
            let slice = &self.octets[self.position..self.position + size];
            self.position += size;
            Ok(slice)
        } else {
            Err(Error::InputTruncated)
        }
    }

    /// Move the cursor directly to `position`, without reading anything.
    ///
    /// Used by the name decoder to resume after a run of compression
    /// pointers: the pointers are followed with throwaway cursors (see
    /// `at_offset`), and the outer cursor only needs to know where the
    /// name's encoding ended.
    pub fn advance_to(&mut self, position: usize) {
        self.position = position;
    }

    /// A fresh cursor over the same backing slice, positioned at `position`.
    ///
    /// Does not itself fail if `position` is out of range: the next read
    /// from the returned cursor will fail instead.
    pub fn at_offset(&self, position: usize) -> Self {
        Self {
            octets: self.octets,
            position,
        }
    }
}

/// A growable buffer for writing wire-format bytes into.
#[derive(Debug, Clone, Default)]
pub struct WritableBuffer {
    pub octets: Vec<u8>,
}

impl WritableBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self) -> usize {
        self.octets.len()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.octets.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.octets.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.octets.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_octets(&mut self, octets: &[u8]) {
        self.octets.extend_from_slice(octets);
    }

    /// Overwrite the two bytes at `index` (used to backfill rdlength once
    /// rdata has been written).
    pub fn patch_u16(&mut self, index: usize, value: u16) {
        let bytes = value.to_be_bytes();
        self.octets[index] = bytes[0];
        self.octets[index + 1] = bytes[1];
    }
}

/// Errors from reading or interpreting wire bytes.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Error {
    /// The buffer ran out of bytes before a field could be fully read.
    InputTruncated,

    /// A domain name was invalid: a reserved label-length pattern, a
    /// pointer to an offset that wasn't strictly earlier in the buffer, or
    /// more than 255 bytes of wire data.
    MalformedName,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InputTruncated => write!(f, "input truncated"),
            Error::MalformedName => write!(f, "malformed domain name"),
        }
    }
}

impl std::error::Error for Error {}
