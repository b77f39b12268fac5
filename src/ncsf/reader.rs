//! NCSF file reader

use super::tags::{TagList, TAG_MARKER};
use super::NCSF_VERSION;
use crate::error::{Error, Result};
use flate2::read::ZlibDecoder;
use flate2::Crc;
use std::io::Read;
use std::path::Path;

/// PSF header size in bytes
pub const PSF_HEADER_SIZE: usize = 16;

/// Decoded NCSF file
#[derive(Debug, Clone)]
pub struct NcsfFile {
    pub version: u8,
    pub reserved: Vec<u8>,
    pub compressed_size: u32,
    pub crc: u32,
    /// Decompressed program section
    pub program: Vec<u8>,
    pub tags: TagList,
}

impl NcsfFile {
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::read(&data)
    }

    /// Validate and decode an NCSF image
    pub fn read(data: &[u8]) -> Result<Self> {
        if data.len() < 4 {
            return Err(Error::Psf("File is too small".into()));
        }
        if &data[0..3] != b"PSF" {
            return Err(Error::Psf("Not a PSF file".into()));
        }
        let version = data[3];
        if version != NCSF_VERSION {
            return Err(Error::Psf(format!(
                "Version byte of {:#04x} does not equal what we were looking for ({:#04x})",
                version, NCSF_VERSION
            )));
        }
        if data.len() < PSF_HEADER_SIZE {
            return Err(Error::Psf("File is too small".into()));
        }

        let reserved_size = u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize;
        let compressed_size = u32::from_le_bytes([data[8], data[9], data[10], data[11]]);
        let crc = u32::from_le_bytes([data[12], data[13], data[14], data[15]]);

        let reserved_end = PSF_HEADER_SIZE + reserved_size;
        let program_end = reserved_end + compressed_size as usize;
        if data.len() < program_end {
            return Err(Error::Psf("File is too small".into()));
        }

        let reserved = data[PSF_HEADER_SIZE..reserved_end].to_vec();
        let compressed = &data[reserved_end..program_end];

        let program = if compressed.is_empty() {
            Vec::new()
        } else {
            let mut actual = Crc::new();
            actual.update(compressed);
            if actual.sum() != crc {
                return Err(Error::Psf(format!(
                    "Program CRC {:#010x} does not match header CRC {:#010x}",
                    actual.sum(),
                    crc
                )));
            }
            let mut program = Vec::new();
            ZlibDecoder::new(compressed)
                .read_to_end(&mut program)
                .map_err(|e| Error::Compression(e.to_string()))?;
            program
        };

        let tail = &data[program_end..];
        let tags = tail
            .windows(TAG_MARKER.len())
            .position(|w| w == TAG_MARKER)
            .map(|start| TagList::parse(&tail[start + TAG_MARKER.len()..]))
            .unwrap_or_default();

        Ok(Self {
            version,
            reserved,
            compressed_size,
            crc,
            program,
            tags,
        })
    }

    /// Sequence number stored in a minincsf reserved section
    pub fn sequence_number(&self) -> Option<u32> {
        let bytes: [u8; 4] = self.reserved.as_slice().try_into().ok()?;
        Some(u32::from_le_bytes(bytes))
    }
}
