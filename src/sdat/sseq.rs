//! SSEQ (sequence) file

use super::header::{NdsStdHeader, NDS_STD_MAGIC};
use super::reader::ByteReader;
use crate::error::{Error, Result};

/// Size of the DATA block header (magic, size, data offset)
const DATA_BLOCK_HEADER: u32 = 12;

/// A decoded sequence: the byte-coded event stream of one song
#[derive(Debug, Clone, Default)]
pub struct Sseq {
    pub data: Vec<u8>,
}

impl Sseq {
    /// Decode an SSEQ file
    pub fn read(file: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(file);
        NdsStdHeader::read(&mut reader)?.verify(b"SSEQ", NDS_STD_MAGIC)?;

        if &reader.read_magic()? != b"DATA" {
            return Err(Error::SdatParse("SSEQ DATA structure invalid".into()));
        }
        let size = reader.read_u32_le()?;
        let data_offset = reader.read_u32_le()? as usize;
        let len = size.checked_sub(DATA_BLOCK_HEADER).ok_or_else(|| {
            Error::SdatParse(format!("SSEQ DATA block size {} is too small", size))
        })?;

        reader.seek(data_offset);
        let data = reader.read_bytes(len as usize)?;
        Ok(Self { data })
    }

    /// Build the on-disk SSEQ file around a raw event stream
    pub fn to_bytes(&self) -> Vec<u8> {
        let data_offset = 0x1C_u32;
        let file_size = data_offset + self.data.len() as u32;
        let mut out = Vec::with_capacity(file_size as usize);
        NdsStdHeader::new(b"SSEQ", file_size, 0x10, 1).write(&mut out);
        out.extend_from_slice(b"DATA");
        out.extend_from_slice(&(self.data.len() as u32 + DATA_BLOCK_HEADER).to_le_bytes());
        out.extend_from_slice(&data_offset.to_le_bytes());
        out.extend_from_slice(&self.data);
        out
    }
}
