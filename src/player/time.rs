//! Playback clock rate and timing results

use serde::Serialize;

/// Sequencer timer rate: the ARM7 bus clock over 64 * 2728 cycles (~192 Hz)
pub const TICKS_PER_SECOND: f64 = 33_513_982.0 / (64.0 * 2728.0);

/// Tempo accumulator threshold for one sequence step
pub const TEMPO_BASE: u32 = 240;

/// Tempo a sequence starts with
pub const DEFAULT_TEMPO: u32 = 120;

/// How a timing run classified the sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeKind {
    /// A repeat point was found and timed to the requested loop count
    Loop,
    /// Playback ran to completion or silence
    End,
}

/// Result of one supervised timing run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Time {
    pub seconds: f64,
    pub kind: TimeKind,
}

impl Time {
    /// No result obtained (timeout, ceiling, or malformed data)
    pub const UNDETERMINED: Time = Time {
        seconds: -1.0,
        kind: TimeKind::Loop,
    };

    pub fn new(seconds: f64, kind: TimeKind) -> Self {
        Self { seconds, kind }
    }

    pub fn from_ticks(ticks: u64, kind: TimeKind) -> Self {
        Self::new(ticks as f64 / TICKS_PER_SECOND, kind)
    }

    pub fn is_determined(&self) -> bool {
        self.seconds >= 0.0
    }
}
