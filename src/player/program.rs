//! Immutable inputs of a timing run

use crate::error::Result;
use crate::sdat::{Sbnk, Sdat, Swar, NO_WAVE_ARC};
use log::warn;
use std::sync::Arc;

/// A sequence's event stream plus the instruments it plays with.
///
/// Cloning is cheap; every run gets its own clone and shares the data.
#[derive(Debug, Clone)]
pub struct SequenceProgram {
    pub data: Arc<[u8]>,
    pub bank: Option<Arc<Sbnk>>,
    pub wave_archives: [Option<Arc<Swar>>; 4],
}

impl SequenceProgram {
    /// A program with no instruments attached
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            data: data.into(),
            bank: None,
            wave_archives: Default::default(),
        }
    }

    /// Load sequence `index` with its bank and wave archives.
    ///
    /// A bank or wave archive that fails to load is left out with a warning;
    /// only the sequence itself is required.
    pub fn load(sdat: &Sdat, index: usize) -> Result<Self> {
        let sseq = sdat.sseq(index)?;
        let mut program = Self::new(sseq.data);

        let Some(info) = sdat.seq_info(index) else {
            return Ok(program);
        };
        let bank = info.bank as usize;
        match sdat.sbnk(bank) {
            Ok(sbnk) => program.bank = Some(Arc::new(sbnk)),
            Err(e) => warn!("Sequence {}: bank {} unavailable: {}", index, bank, e),
        }

        if let Some(bank_info) = sdat.bank_info(bank) {
            for (slot, &arc) in bank_info.wave_arc.iter().enumerate() {
                if arc == NO_WAVE_ARC {
                    continue;
                }
                match sdat.swar(arc as usize) {
                    Ok(swar) => program.wave_archives[slot] = Some(Arc::new(swar)),
                    Err(e) => warn!("Sequence {}: wave archive {} unavailable: {}", index, arc, e),
                }
            }
        }

        Ok(program)
    }
}
