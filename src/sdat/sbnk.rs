//! SBNK (instrument bank) file
//!
//! Only the parts the length detector needs are kept: for every program,
//! the note definition (wave reference, base key, envelope) per key range.

use super::header::{NdsStdHeader, NDS_STD_MAGIC};
use super::reader::ByteReader;
use crate::error::{Error, Result};

/// Instrument record types
pub mod record {
    pub const EMPTY: u8 = 0;
    pub const PCM: u8 = 1;
    pub const PSG: u8 = 2;
    pub const NOISE: u8 = 3;
    pub const DIRECT_PCM: u8 = 4;
    pub const NULL: u8 = 5;
    pub const DRUM_SET: u8 = 16;
    pub const KEY_SPLIT: u8 = 17;
}

/// Sound source for a note definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteSource {
    /// Sample `swav` of wave archive slot `swar`
    Pcm { swav: u16, swar: u16 },
    /// Square wave generator
    Psg,
    Noise,
}

/// Parameters for one playable key range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteDefinition {
    pub source: NoteSource,
    pub base_key: u8,
    pub attack: u8,
    pub decay: u8,
    pub sustain: u8,
    pub release: u8,
    pub pan: u8,
}

impl NoteDefinition {
    fn read(record_type: u8, reader: &mut ByteReader) -> Result<Option<Self>> {
        let swav = reader.read_u16_le()?;
        let swar = reader.read_u16_le()?;
        let base_key = reader.read_u8()?;
        let attack = reader.read_u8()?;
        let decay = reader.read_u8()?;
        let sustain = reader.read_u8()?;
        let release = reader.read_u8()?;
        let pan = reader.read_u8()?;

        let source = match record_type {
            record::PCM | record::DIRECT_PCM => NoteSource::Pcm { swav, swar },
            record::PSG => NoteSource::Psg,
            record::NOISE => NoteSource::Noise,
            _ => return Ok(None),
        };

        Ok(Some(Self {
            source,
            base_key,
            attack,
            decay,
            sustain,
            release,
            pan,
        }))
    }
}

/// Key range of an instrument, inclusive on both ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    pub low: u8,
    pub high: u8,
    pub definition: NoteDefinition,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Instrument {
    pub ranges: Vec<KeyRange>,
}

impl Instrument {
    pub fn definition_for(&self, key: u8) -> Option<&NoteDefinition> {
        self.ranges
            .iter()
            .find(|r| (r.low..=r.high).contains(&key))
            .map(|r| &r.definition)
    }
}

/// Decoded instrument bank
#[derive(Debug, Clone, Default)]
pub struct Sbnk {
    pub instruments: Vec<Option<Instrument>>,
}

impl Sbnk {
    pub fn read(file: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(file);
        NdsStdHeader::read(&mut reader)?.verify(b"SBNK", NDS_STD_MAGIC)?;

        if &reader.read_magic()? != b"DATA" {
            return Err(Error::SdatParse("SBNK DATA structure invalid".into()));
        }
        reader.skip(4 + 32);
        let count = reader.read_u32_le()? as usize;

        let mut headers = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            let record_type = reader.read_u8()?;
            let offset = reader.read_u16_le()? as usize;
            reader.skip(1);
            headers.push((record_type, offset));
        }

        let mut instruments = Vec::with_capacity(headers.len());
        for (record_type, offset) in headers {
            let mut inst_reader = ByteReader::at(file, offset);
            instruments.push(Self::read_instrument(record_type, &mut inst_reader)?);
        }

        Ok(Self { instruments })
    }

    fn read_instrument(record_type: u8, reader: &mut ByteReader) -> Result<Option<Instrument>> {
        let mut ranges = Vec::new();
        match record_type {
            record::EMPTY | record::NULL => return Ok(None),
            record::PCM | record::PSG | record::NOISE | record::DIRECT_PCM => {
                if let Some(definition) = NoteDefinition::read(record_type, reader)? {
                    ranges.push(KeyRange {
                        low: 0,
                        high: 127,
                        definition,
                    });
                }
            }
            record::DRUM_SET => {
                let low = reader.read_u8()?;
                let high = reader.read_u8()?;
                for key in low..=high {
                    let sub_type = reader.read_u16_le()? as u8;
                    if let Some(definition) = NoteDefinition::read(sub_type, reader)? {
                        ranges.push(KeyRange {
                            low: key,
                            high: key,
                            definition,
                        });
                    }
                }
            }
            record::KEY_SPLIT => {
                let regions = reader.read_slice(8)?;
                let mut low = 0u8;
                for &high in regions.iter().take_while(|&&h| h != 0) {
                    let sub_type = reader.read_u16_le()? as u8;
                    if let Some(definition) = NoteDefinition::read(sub_type, reader)? {
                        ranges.push(KeyRange {
                            low,
                            high,
                            definition,
                        });
                    }
                    low = high.saturating_add(1);
                }
            }
            other => {
                return Err(Error::SdatParse(format!(
                    "Unknown SBNK instrument type {}",
                    other
                )))
            }
        }
        Ok(Some(Instrument { ranges }))
    }

    /// Look up the definition used for `key` on `program`
    pub fn note_definition(&self, program: usize, key: u8) -> Option<&NoteDefinition> {
        self.instruments
            .get(program)
            .and_then(|i| i.as_ref())
            .and_then(|i| i.definition_for(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition_bytes(record_type: u8, swav: u16, base_key: u8, adsr: [u8; 4]) -> Vec<u8> {
        let mut out = Vec::new();
        if record_type != 0 {
            out.extend_from_slice(&(record_type as u16).to_le_bytes());
        }
        out.extend_from_slice(&swav.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.push(base_key);
        out.extend_from_slice(&adsr);
        out.push(64);
        out
    }

    fn build_bank(instruments: &[(u8, Vec<u8>)]) -> Vec<u8> {
        let table_start = 16 + 4 + 4 + 32 + 4;
        let mut offset = table_start + instruments.len() * 4;
        let mut table = Vec::new();
        let mut bodies = Vec::new();
        for (record_type, body) in instruments {
            table.push(*record_type);
            table.extend_from_slice(&(offset as u16).to_le_bytes());
            table.push(0);
            offset += body.len();
            bodies.extend_from_slice(body);
        }

        let mut out = Vec::new();
        NdsStdHeader::new(b"SBNK", offset as u32, 0x10, 1).write(&mut out);
        out.extend_from_slice(b"DATA");
        out.extend_from_slice(&((offset - 16) as u32).to_le_bytes());
        out.extend_from_slice(&[0; 32]);
        out.extend_from_slice(&(instruments.len() as u32).to_le_bytes());
        out.extend_from_slice(&table);
        out.extend_from_slice(&bodies);
        out
    }

    #[test]
    fn test_single_and_key_split() {
        let single = definition_bytes(0, 4, 60, [127, 100, 90, 80]);

        let mut split = vec![59, 127, 0, 0, 0, 0, 0, 0];
        split.extend(definition_bytes(record::PCM, 1, 48, [120, 0, 127, 0]));
        split.extend(definition_bytes(record::PSG, 3, 72, [127, 127, 127, 127]));

        let bank = build_bank(&[
            (record::PCM, single),
            (record::EMPTY, Vec::new()),
            (record::KEY_SPLIT, split),
        ]);
        let sbnk = Sbnk::read(&bank).unwrap();
        assert_eq!(sbnk.instruments.len(), 3);

        let def = sbnk.note_definition(0, 100).unwrap();
        assert_eq!(def.source, NoteSource::Pcm { swav: 4, swar: 0 });
        assert_eq!(def.release, 80);

        assert!(sbnk.note_definition(1, 60).is_none());
        assert_eq!(sbnk.note_definition(2, 40).unwrap().base_key, 48);
        assert_eq!(sbnk.note_definition(2, 59).unwrap().base_key, 48);
        assert_eq!(sbnk.note_definition(2, 60).unwrap().source, NoteSource::Psg);
    }

    #[test]
    fn test_drum_set() {
        let mut drums = vec![36, 37];
        drums.extend(definition_bytes(record::PCM, 10, 36, [127, 127, 0, 127]));
        drums.extend(definition_bytes(record::NOISE, 0, 37, [127, 127, 0, 127]));
        let sbnk = Sbnk::read(&build_bank(&[(record::DRUM_SET, drums)])).unwrap();

        assert!(sbnk.note_definition(0, 35).is_none());
        assert_eq!(
            sbnk.note_definition(0, 36).unwrap().source,
            NoteSource::Pcm { swav: 10, swar: 0 }
        );
        assert_eq!(sbnk.note_definition(0, 37).unwrap().source, NoteSource::Noise);
    }
}
