//! Little-endian byte reader for Nitro sound data

use crate::error::{Error, Result};

/// Cursor over a borrowed byte slice
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a new reader positioned at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Create a reader positioned at `pos`
    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    /// Check if we've reached the end of data
    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Get current position
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Seek to a position
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Skip `len` bytes
    pub fn skip(&mut self, len: usize) {
        self.pos += len;
    }

    /// Total length of the underlying data
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read a single byte
    pub fn read_u8(&mut self) -> Result<u8> {
        if self.pos >= self.data.len() {
            return Err(Error::SdatParse(format!(
                "Unexpected end of data at offset {:#x}",
                self.pos
            )));
        }
        let b = self.data[self.pos];
        self.pos += 1;
        Ok(b)
    }

    /// Read a 16-bit little-endian value
    pub fn read_u16_le(&mut self) -> Result<u16> {
        let lo = self.read_u8()? as u16;
        let hi = self.read_u8()? as u16;
        Ok(lo | (hi << 8))
    }

    /// Read a 32-bit little-endian value
    pub fn read_u32_le(&mut self) -> Result<u32> {
        let lo = self.read_u16_le()? as u32;
        let hi = self.read_u16_le()? as u32;
        Ok(lo | (hi << 16))
    }

    /// Read a 4-byte block identifier
    pub fn read_magic(&mut self) -> Result<[u8; 4]> {
        let bytes = self.read_slice(4)?;
        Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    /// Borrow `len` bytes and advance
    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                Error::SdatParse(format!(
                    "Read of {} bytes at offset {:#x} runs past end of data",
                    len, self.pos
                ))
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    /// Read bytes into a new buffer
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        Ok(self.read_slice(len)?.to_vec())
    }

    /// Read a NUL-terminated ASCII string
    pub fn read_cstring(&mut self) -> Result<String> {
        let start = self.pos;
        while self.read_u8()? != 0 {}
        let bytes = &self.data[start..self.pos - 1];
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}
