//! SWAR (wave archive) file
//!
//! Sample payloads are not kept; the length detector only needs to know
//! how long a non-looping wave plays before it runs out.

use super::header::{NdsStdHeader, NDS_STD_MAGIC};
use super::reader::ByteReader;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveFormat {
    Pcm8,
    Pcm16,
    Adpcm,
}

impl WaveFormat {
    fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Pcm8),
            1 => Ok(Self::Pcm16),
            2 => Ok(Self::Adpcm),
            other => Err(Error::SdatParse(format!("Unknown SWAV format {}", other))),
        }
    }

    /// Samples stored per 32-bit word
    fn samples_per_word(&self) -> u32 {
        match self {
            Self::Pcm8 => 4,
            Self::Pcm16 => 2,
            Self::Adpcm => 8,
        }
    }
}

/// Wave header information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wave {
    pub format: WaveFormat,
    pub looped: bool,
    pub sample_rate: u16,
    pub time: u16,
    /// Loop start in 32-bit words
    pub loop_offset: u16,
    /// Length after the loop start in 32-bit words
    pub non_loop_len: u32,
}

impl Wave {
    fn read(reader: &mut ByteReader) -> Result<Self> {
        Ok(Self {
            format: WaveFormat::from_u8(reader.read_u8()?)?,
            looped: reader.read_u8()? != 0,
            sample_rate: reader.read_u16_le()?,
            time: reader.read_u16_le()?,
            loop_offset: reader.read_u16_le()?,
            non_loop_len: reader.read_u32_le()?,
        })
    }

    /// Number of playable samples
    pub fn sample_count(&self) -> u32 {
        let mut words = self.loop_offset as u32 + self.non_loop_len;
        if self.format == WaveFormat::Adpcm {
            // First word is the ADPCM initial state
            words = words.saturating_sub(1);
        }
        words * self.format.samples_per_word()
    }

    /// Seconds a non-looping wave plays when pitched `semitones` away from
    /// its base key. Looping waves never run out.
    pub fn play_seconds(&self, semitones: i32) -> Option<f64> {
        if self.looped || self.sample_rate == 0 {
            return None;
        }
        let rate = self.sample_rate as f64 * 2f64.powf(semitones as f64 / 12.0);
        Some(self.sample_count() as f64 / rate)
    }
}

/// Decoded wave archive
#[derive(Debug, Clone, Default)]
pub struct Swar {
    pub waves: Vec<Wave>,
}

impl Swar {
    pub fn read(file: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(file);
        NdsStdHeader::read(&mut reader)?.verify(b"SWAR", NDS_STD_MAGIC)?;

        if &reader.read_magic()? != b"DATA" {
            return Err(Error::SdatParse("SWAR DATA structure invalid".into()));
        }
        reader.skip(4 + 32);
        let count = reader.read_u32_le()? as usize;

        let mut offsets = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            offsets.push(reader.read_u32_le()? as usize);
        }

        let waves = offsets
            .into_iter()
            .map(|offset| Wave::read(&mut ByteReader::at(file, offset)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { waves })
    }

    pub fn wave(&self, index: usize) -> Option<&Wave> {
        self.waves.get(index)
    }
}
