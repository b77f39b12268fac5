//! SDAT sound archive parsing
//!
//! An SDAT holds a symbol table (SYMB), an info table (INFO), a file
//! allocation table (FAT) and the file payloads. Sequences refer to a bank
//! through their INFO entry, and banks refer to up to four wave archives.

pub mod header;
pub mod info;
pub mod reader;
pub mod sbnk;
pub mod sseq;
pub mod swar;

pub use info::{InfoBank, InfoEntry, InfoRecord, InfoSeq, InfoWaveArc, RecordKind, NO_WAVE_ARC};
pub use reader::ByteReader;
pub use sbnk::Sbnk;
pub use sseq::Sseq;
pub use swar::Swar;

use crate::error::{Error, Result};
use header::{NdsStdHeader, NDS_STD_MAGIC};
use std::collections::HashMap;

/// FAT entry: location of one file inside the archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatEntry {
    pub offset: u32,
    pub size: u32,
}

/// Parsed SDAT archive
#[derive(Debug, Clone)]
pub struct Sdat {
    data: Vec<u8>,
    symbols: HashMap<RecordKind, Vec<Option<String>>>,
    info: HashMap<RecordKind, InfoRecord>,
    fat: Vec<FatEntry>,
}

impl Sdat {
    /// Parse an SDAT archive, keeping the raw bytes for packaging
    pub fn read(data: Vec<u8>) -> Result<Self> {
        let mut reader = ByteReader::new(&data);
        NdsStdHeader::read(&mut reader)?.verify(b"SDAT", NDS_STD_MAGIC)?;

        let symb_offset = reader.read_u32_le()? as usize;
        let _symb_size = reader.read_u32_le()?;
        let info_offset = reader.read_u32_le()? as usize;
        let _info_size = reader.read_u32_le()?;
        let fat_offset = reader.read_u32_le()? as usize;

        let symbols = if symb_offset != 0 {
            Self::read_symbols(&data, symb_offset)?
        } else {
            HashMap::new()
        };
        let info = Self::read_info(&data, info_offset)?;
        let fat = Self::read_fat(&data, fat_offset)?;

        Ok(Self {
            data,
            symbols,
            info,
            fat,
        })
    }

    fn read_record_offsets(reader: &mut ByteReader, magic: &[u8; 4]) -> Result<Vec<usize>> {
        if &reader.read_magic()? != magic {
            return Err(Error::SdatParse(format!(
                "{} block invalid",
                String::from_utf8_lossy(magic)
            )));
        }
        reader.skip(4);
        (0..RecordKind::COUNT)
            .map(|_| reader.read_u32_le().map(|o| o as usize))
            .collect()
    }

    fn read_symbols(
        data: &[u8],
        block_start: usize,
    ) -> Result<HashMap<RecordKind, Vec<Option<String>>>> {
        let mut reader = ByteReader::at(data, block_start);
        let offsets = Self::read_record_offsets(&mut reader, b"SYMB")?;

        let mut symbols = HashMap::new();
        for (index, &offset) in offsets.iter().enumerate() {
            let Some(kind) = RecordKind::from_index(index) else {
                continue;
            };
            // The sequence-archive record nests a second table per archive
            if offset == 0 || kind == RecordKind::SeqArc {
                continue;
            }
            let mut record = ByteReader::at(data, block_start + offset);
            let count = record.read_u32_le()? as usize;
            let mut names = Vec::with_capacity(count.min(4096));
            for _ in 0..count {
                let name_offset = record.read_u32_le()? as usize;
                if name_offset == 0 {
                    names.push(None);
                } else {
                    names.push(Some(
                        ByteReader::at(data, block_start + name_offset).read_cstring()?,
                    ));
                }
            }
            symbols.insert(kind, names);
        }
        Ok(symbols)
    }

    fn read_info(data: &[u8], block_start: usize) -> Result<HashMap<RecordKind, InfoRecord>> {
        let mut reader = ByteReader::at(data, block_start);
        let offsets = Self::read_record_offsets(&mut reader, b"INFO")?;

        let mut info = HashMap::new();
        for (index, &offset) in offsets.iter().enumerate() {
            let Some(kind) = RecordKind::from_index(index) else {
                continue;
            };
            let record = if offset == 0 || !kind.is_supported() {
                InfoRecord::empty(kind)
            } else {
                InfoRecord::read(kind, data, block_start, offset)?
            };
            info.insert(kind, record);
        }
        Ok(info)
    }

    fn read_fat(data: &[u8], block_start: usize) -> Result<Vec<FatEntry>> {
        let mut reader = ByteReader::at(data, block_start);
        if &reader.read_magic()? != b"FAT " {
            return Err(Error::SdatParse("FAT block invalid".into()));
        }
        reader.skip(4);
        let count = reader.read_u32_le()? as usize;
        let mut fat = Vec::with_capacity(count.min(8192));
        for _ in 0..count {
            let offset = reader.read_u32_le()?;
            let size = reader.read_u32_le()?;
            reader.skip(8);
            fat.push(FatEntry { offset, size });
        }
        Ok(fat)
    }

    /// Raw archive bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn record(&self, kind: RecordKind) -> Option<&InfoRecord> {
        self.info.get(&kind)
    }

    fn entry(&self, kind: RecordKind, index: usize) -> Option<&InfoEntry> {
        self.info.get(&kind).and_then(|r| r.get(index))
    }

    pub fn seq_info(&self, index: usize) -> Option<&InfoSeq> {
        match self.entry(RecordKind::Seq, index) {
            Some(InfoEntry::Seq(seq)) => Some(seq),
            _ => None,
        }
    }

    pub fn bank_info(&self, index: usize) -> Option<&InfoBank> {
        match self.entry(RecordKind::Bank, index) {
            Some(InfoEntry::Bank(bank)) => Some(bank),
            _ => None,
        }
    }

    pub fn wave_arc_info(&self, index: usize) -> Option<&InfoWaveArc> {
        match self.entry(RecordKind::WaveArc, index) {
            Some(InfoEntry::WaveArc(arc)) => Some(arc),
            _ => None,
        }
    }

    /// Number of slots in the sequence record, including empty ones
    pub fn sequence_count(&self) -> usize {
        self.info.get(&RecordKind::Seq).map_or(0, InfoRecord::len)
    }

    /// Symbol name of an entry, falling back to a numbered name
    pub fn entry_name(&self, kind: RecordKind, index: usize) -> String {
        self.symbols
            .get(&kind)
            .and_then(|names| names.get(index))
            .and_then(|n| n.clone())
            .unwrap_or_else(|| {
                let prefix = match kind {
                    RecordKind::Seq => "SSEQ",
                    RecordKind::Bank => "SBNK",
                    RecordKind::WaveArc => "SWAR",
                    _ => "FILE",
                };
                format!("{}{:04}", prefix, index)
            })
    }

    /// Payload of a FAT file
    pub fn file(&self, file_id: u16) -> Result<&[u8]> {
        let entry = self.fat.get(file_id as usize).ok_or_else(|| {
            Error::SdatParse(format!("File id {} is outside the FAT", file_id))
        })?;
        let start = entry.offset as usize;
        let end = start + entry.size as usize;
        self.data.get(start..end).ok_or_else(|| {
            Error::SdatParse(format!(
                "File id {} ({:#x}..{:#x}) lies outside the archive",
                file_id, start, end
            ))
        })
    }

    pub fn sseq(&self, index: usize) -> Result<Sseq> {
        let info = self.seq_info(index).ok_or(Error::MissingSequence(index))?;
        Sseq::read(self.file(info.file_id)?)
    }

    pub fn sbnk(&self, bank: usize) -> Result<Sbnk> {
        let info = self
            .bank_info(bank)
            .ok_or_else(|| Error::SdatParse(format!("Bank {} not found", bank)))?;
        Sbnk::read(self.file(info.file_id)?)
    }

    pub fn swar(&self, wave_arc: usize) -> Result<Swar> {
        let info = self
            .wave_arc_info(wave_arc)
            .ok_or_else(|| Error::SdatParse(format!("Wave archive {} not found", wave_arc)))?;
        Swar::read(self.file(info.file_id)?)
    }
}

/// In-memory SDAT construction for tests
#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Build an archive with named sequences, one empty bank and no wave archives
    pub fn build_sdat(sequences: &[(&str, Vec<u8>, u8)]) -> Vec<u8> {
        const HEADER: usize = 0x40;

        // SYMB: offsets table then SEQ name record
        let mut symb = Vec::new();
        symb.extend_from_slice(b"SYMB");
        symb.extend_from_slice(&0u32.to_le_bytes());
        let seq_record = 8 + RecordKind::COUNT * 4 + 24;
        symb.extend_from_slice(&(seq_record as u32).to_le_bytes());
        symb.extend_from_slice(&[0; (RecordKind::COUNT - 1) * 4 + 24]);
        symb.extend_from_slice(&(sequences.len() as u32).to_le_bytes());
        let mut name_offset = seq_record + 4 + sequences.len() * 4;
        for (name, _, _) in sequences {
            symb.extend_from_slice(&(name_offset as u32).to_le_bytes());
            name_offset += name.len() + 1;
        }
        for (name, _, _) in sequences {
            symb.extend_from_slice(name.as_bytes());
            symb.push(0);
        }
        while symb.len() % 4 != 0 {
            symb.push(0);
        }

        // INFO: SEQ record followed by a one-entry BANK record
        let mut info = Vec::new();
        info.extend_from_slice(b"INFO");
        info.extend_from_slice(&0u32.to_le_bytes());
        let seq_record = 8 + RecordKind::COUNT * 4 + 24;
        let seq_entries = seq_record + 4 + sequences.len() * 4;
        let bank_record = seq_entries + sequences.len() * 12;
        let mut offsets = [0u32; RecordKind::COUNT];
        offsets[RecordKind::Seq as usize] = seq_record as u32;
        offsets[RecordKind::Bank as usize] = bank_record as u32;
        for offset in offsets {
            info.extend_from_slice(&offset.to_le_bytes());
        }
        info.extend_from_slice(&[0; 24]);
        info.extend_from_slice(&(sequences.len() as u32).to_le_bytes());
        for i in 0..sequences.len() {
            info.extend_from_slice(&((seq_entries + i * 12) as u32).to_le_bytes());
        }
        for (i, (_, _, vol)) in sequences.iter().enumerate() {
            InfoEntry::Seq(InfoSeq {
                file_id: i as u16,
                vol: *vol,
                ..Default::default()
            })
            .write(&mut info);
        }
        info.extend_from_slice(&1u32.to_le_bytes());
        info.extend_from_slice(&((bank_record + 8) as u32).to_le_bytes());
        InfoEntry::Bank(InfoBank {
            file_id: sequences.len() as u16,
            ..Default::default()
        })
        .write(&mut info);

        // Files: every SSEQ, then an empty SBNK
        let mut files: Vec<Vec<u8>> = sequences
            .iter()
            .map(|(_, data, _)| Sseq { data: data.clone() }.to_bytes())
            .collect();
        let mut bank = Vec::new();
        NdsStdHeader::new(b"SBNK", 0x3C, 0x10, 1).write(&mut bank);
        bank.extend_from_slice(b"DATA");
        bank.extend_from_slice(&0x2Cu32.to_le_bytes());
        bank.extend_from_slice(&[0; 32]);
        bank.extend_from_slice(&0u32.to_le_bytes());
        files.push(bank);

        let symb_offset = HEADER;
        let info_offset = symb_offset + symb.len();
        let fat_offset = info_offset + info.len();
        let fat_size = 12 + files.len() * 16;
        let file_offset = fat_offset + fat_size;

        let mut fat = Vec::new();
        fat.extend_from_slice(b"FAT ");
        fat.extend_from_slice(&(fat_size as u32).to_le_bytes());
        fat.extend_from_slice(&(files.len() as u32).to_le_bytes());
        let mut payload = Vec::new();
        payload.extend_from_slice(b"FILE");
        payload.extend_from_slice(&0u32.to_le_bytes());
        payload.extend_from_slice(&(files.len() as u32).to_le_bytes());
        payload.extend_from_slice(&0u32.to_le_bytes());
        for file in &files {
            let offset = file_offset + payload.len();
            fat.extend_from_slice(&(offset as u32).to_le_bytes());
            fat.extend_from_slice(&(file.len() as u32).to_le_bytes());
            fat.extend_from_slice(&[0; 8]);
            payload.extend_from_slice(file);
            while payload.len() % 4 != 0 {
                payload.push(0);
            }
        }

        let total = file_offset + payload.len();
        let mut out = Vec::with_capacity(total);
        NdsStdHeader::new(b"SDAT", total as u32, HEADER as u16, 4).write(&mut out);
        for (offset, size) in [
            (symb_offset, symb.len()),
            (info_offset, info.len()),
            (fat_offset, fat.len()),
            (file_offset, payload.len()),
        ] {
            out.extend_from_slice(&(offset as u32).to_le_bytes());
            out.extend_from_slice(&(size as u32).to_le_bytes());
        }
        out.resize(HEADER, 0);
        out.extend_from_slice(&symb);
        out.extend_from_slice(&info);
        out.extend_from_slice(&fat);
        out.extend_from_slice(&payload);
        out
    }
}
