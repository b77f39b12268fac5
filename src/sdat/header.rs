//! Nitro standard file header shared by SDAT, SSEQ, SBNK and SWAR

use super::reader::ByteReader;
use crate::error::{Error, Result};

/// Byte-order mark plus version 1.00, as stored little-endian
pub const NDS_STD_MAGIC: u32 = 0x0100FEFF;

/// Size of the standard header in bytes
pub const NDS_STD_HEADER_SIZE: usize = 16;

/// Standard header at the start of every Nitro sound file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdsStdHeader {
    pub kind: [u8; 4],
    pub magic: u32,
    pub file_size: u32,
    pub header_size: u16,
    pub blocks: u16,
}

impl NdsStdHeader {
    pub fn new(kind: &[u8; 4], file_size: u32, header_size: u16, blocks: u16) -> Self {
        Self {
            kind: *kind,
            magic: NDS_STD_MAGIC,
            file_size,
            header_size,
            blocks,
        }
    }

    pub fn read(reader: &mut ByteReader) -> Result<Self> {
        Ok(Self {
            kind: reader.read_magic()?,
            magic: reader.read_u32_le()?,
            file_size: reader.read_u32_le()?,
            header_size: reader.read_u16_le()?,
            blocks: reader.read_u16_le()?,
        })
    }

    /// Check the block kind and magic number
    pub fn verify(&self, kind: &[u8; 4], magic: u32) -> Result<()> {
        if &self.kind != kind {
            return Err(Error::SdatParse(format!(
                "Expected {} header, found {:?}",
                String::from_utf8_lossy(kind),
                String::from_utf8_lossy(&self.kind)
            )));
        }
        if self.magic != magic {
            return Err(Error::SdatParse(format!(
                "{} header magic {:#010x} does not equal {:#010x}",
                String::from_utf8_lossy(kind),
                self.magic,
                magic
            )));
        }
        Ok(())
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.kind);
        out.extend_from_slice(&self.magic.to_le_bytes());
        out.extend_from_slice(&self.file_size.to_le_bytes());
        out.extend_from_slice(&self.header_size.to_le_bytes());
        out.extend_from_slice(&self.blocks.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_rejects_wrong_kind() {
        let mut bytes = Vec::new();
        NdsStdHeader::new(b"SBNK", 0x40, 0x10, 1).write(&mut bytes);
        let header = NdsStdHeader::read(&mut ByteReader::new(&bytes)).unwrap();
        assert!(header.verify(b"SBNK", NDS_STD_MAGIC).is_ok());
        assert!(header.verify(b"SSEQ", NDS_STD_MAGIC).is_err());
        assert!(header.verify(b"SBNK", 0x0100FFFE).is_err());
    }
}
