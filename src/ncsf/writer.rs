//! NCSF file writer

use super::tags::{TagList, TAG_MARKER};
use super::NCSF_VERSION;
use crate::error::{Error, Result};
use flate2::write::ZlibEncoder;
use flate2::{Compression, Crc};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Compress a program section with zlib at maximum compression
pub fn compress_program(program: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(program)
        .map_err(|e| Error::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| Error::Compression(e.to_string()))
}

/// Build a complete NCSF image
///
/// Layout: `PSF` + version byte, reserved size, compressed program size,
/// CRC-32 of the compressed program, reserved section, compressed program,
/// then the optional tag section.
pub fn build_ncsf(reserved: &[u8], program: &[u8], tags: &TagList) -> Result<Vec<u8>> {
    let compressed = if program.is_empty() {
        Vec::new()
    } else {
        compress_program(program)?
    };

    let crc = if compressed.is_empty() {
        0
    } else {
        let mut crc = Crc::new();
        crc.update(&compressed);
        crc.sum()
    };

    let mut data = Vec::with_capacity(16 + reserved.len() + compressed.len());
    data.extend_from_slice(b"PSF");
    data.push(NCSF_VERSION);
    data.extend_from_slice(&(reserved.len() as u32).to_le_bytes());
    data.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
    data.extend_from_slice(&crc.to_le_bytes());
    data.extend_from_slice(reserved);
    data.extend_from_slice(&compressed);

    if !tags.is_empty() {
        data.extend_from_slice(TAG_MARKER);
        data.extend_from_slice(&tags.to_bytes());
    }

    Ok(data)
}

/// Write an NCSF file to disk
pub fn write_ncsf(path: &Path, reserved: &[u8], program: &[u8], tags: &TagList) -> Result<()> {
    let data = build_ncsf(reserved, program, tags)?;
    let mut file = File::create(path)?;
    file.write_all(&data)?;
    file.flush()?;
    Ok(())
}
