//! INFO block records
//!
//! Each INFO record is a table of offsets to fixed-size entries. Only the
//! record kinds the converter needs are decoded; the rest are skipped.

use super::reader::ByteReader;
use crate::error::{Error, Result};

/// Value used in bank wave-archive slots that reference nothing
pub const NO_WAVE_ARC: u16 = 0xFFFF;

/// INFO record kinds, in the order their offsets appear in the block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordKind {
    Seq = 0,
    SeqArc = 1,
    Bank = 2,
    WaveArc = 3,
    Player = 4,
    Group = 5,
    Player2 = 6,
    Strm = 7,
}

impl RecordKind {
    /// Number of record offsets stored in INFO and SYMB blocks
    pub const COUNT: usize = 8;

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Seq),
            1 => Some(Self::SeqArc),
            2 => Some(Self::Bank),
            3 => Some(Self::WaveArc),
            4 => Some(Self::Player),
            5 => Some(Self::Group),
            6 => Some(Self::Player2),
            7 => Some(Self::Strm),
            _ => None,
        }
    }

    /// Whether entries of this kind are decoded
    pub fn is_supported(&self) -> bool {
        matches!(
            self,
            Self::Seq | Self::Bank | Self::WaveArc | Self::Player
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoSeq {
    pub file_id: u16,
    pub unknown: u16,
    pub bank: u16,
    pub vol: u8,
    pub cpr: u8,
    pub ppr: u8,
    pub ply: u8,
    pub unknown2: [u8; 2],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoBank {
    pub file_id: u16,
    pub unknown: u16,
    pub wave_arc: [u16; 4],
}

impl Default for InfoBank {
    fn default() -> Self {
        Self {
            file_id: 0,
            unknown: 0,
            wave_arc: [NO_WAVE_ARC; 4],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoWaveArc {
    pub file_id: u16,
    pub unknown: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoPlayer {
    pub max_seqs: u16,
    pub channel_mask: u16,
    pub heap_size: u32,
}

/// A decoded INFO entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfoEntry {
    Seq(InfoSeq),
    Bank(InfoBank),
    WaveArc(InfoWaveArc),
    Player(InfoPlayer),
}

impl InfoEntry {
    /// Read an entry of the given kind at the reader's position
    pub fn read(kind: RecordKind, reader: &mut ByteReader) -> Result<Self> {
        match kind {
            RecordKind::Seq => {
                let file_id = reader.read_u16_le()?;
                let unknown = reader.read_u16_le()?;
                let bank = reader.read_u16_le()?;
                let vol = reader.read_u8()?;
                let cpr = reader.read_u8()?;
                let ppr = reader.read_u8()?;
                let ply = reader.read_u8()?;
                let unknown2 = [reader.read_u8()?, reader.read_u8()?];
                Ok(Self::Seq(InfoSeq {
                    file_id,
                    unknown,
                    bank,
                    vol,
                    cpr,
                    ppr,
                    ply,
                    unknown2,
                }))
            }
            RecordKind::Bank => {
                let file_id = reader.read_u16_le()?;
                let unknown = reader.read_u16_le()?;
                let mut wave_arc = [NO_WAVE_ARC; 4];
                for slot in wave_arc.iter_mut() {
                    *slot = reader.read_u16_le()?;
                }
                Ok(Self::Bank(InfoBank {
                    file_id,
                    unknown,
                    wave_arc,
                }))
            }
            RecordKind::WaveArc => Ok(Self::WaveArc(InfoWaveArc {
                file_id: reader.read_u16_le()?,
                unknown: reader.read_u16_le()?,
            })),
            RecordKind::Player => Ok(Self::Player(InfoPlayer {
                max_seqs: reader.read_u16_le()?,
                channel_mask: reader.read_u16_le()?,
                heap_size: reader.read_u32_le()?,
            })),
            other => Err(Error::SdatParse(format!(
                "INFO record kind {:?} is not supported",
                other
            ))),
        }
    }

    /// Size of the entry in bytes
    pub fn size(&self) -> usize {
        match self {
            Self::Seq(_) => 12,
            Self::Bank(_) => 12,
            Self::WaveArc(_) => 4,
            Self::Player(_) => 8,
        }
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        match self {
            Self::Seq(seq) => {
                out.extend_from_slice(&seq.file_id.to_le_bytes());
                out.extend_from_slice(&seq.unknown.to_le_bytes());
                out.extend_from_slice(&seq.bank.to_le_bytes());
                out.extend_from_slice(&[seq.vol, seq.cpr, seq.ppr, seq.ply]);
                out.extend_from_slice(&seq.unknown2);
            }
            Self::Bank(bank) => {
                out.extend_from_slice(&bank.file_id.to_le_bytes());
                out.extend_from_slice(&bank.unknown.to_le_bytes());
                for arc in bank.wave_arc {
                    out.extend_from_slice(&arc.to_le_bytes());
                }
            }
            Self::WaveArc(arc) => {
                out.extend_from_slice(&arc.file_id.to_le_bytes());
                out.extend_from_slice(&arc.unknown.to_le_bytes());
            }
            Self::Player(player) => {
                out.extend_from_slice(&player.max_seqs.to_le_bytes());
                out.extend_from_slice(&player.channel_mask.to_le_bytes());
                out.extend_from_slice(&player.heap_size.to_le_bytes());
            }
        }
    }

    /// FAT file id, for entries that point at a file
    pub fn file_id(&self) -> Option<u16> {
        match self {
            Self::Seq(seq) => Some(seq.file_id),
            Self::Bank(bank) => Some(bank.file_id),
            Self::WaveArc(arc) => Some(arc.file_id),
            Self::Player(_) => None,
        }
    }
}

/// One INFO record: a table of optional entries
#[derive(Debug, Clone)]
pub struct InfoRecord {
    pub kind: RecordKind,
    pub entries: Vec<Option<InfoEntry>>,
}

impl InfoRecord {
    pub fn empty(kind: RecordKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    /// Read a record whose offset table starts at `record_offset`.
    /// Entry offsets are relative to `block_start`; zero marks an empty slot.
    pub fn read(
        kind: RecordKind,
        data: &[u8],
        block_start: usize,
        record_offset: usize,
    ) -> Result<Self> {
        let mut reader = ByteReader::at(data, block_start + record_offset);
        let count = reader.read_u32_le()? as usize;
        let mut offsets = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            offsets.push(reader.read_u32_le()? as usize);
        }

        let mut entries = Vec::with_capacity(offsets.len());
        for offset in offsets {
            if offset == 0 {
                entries.push(None);
                continue;
            }
            let mut entry_reader = ByteReader::at(data, block_start + offset);
            entries.push(Some(InfoEntry::read(kind, &mut entry_reader)?));
        }

        Ok(Self { kind, entries })
    }

    pub fn get(&self, index: usize) -> Option<&InfoEntry> {
        self.entries.get(index).and_then(|e| e.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
