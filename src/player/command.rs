//! SSEQ command definitions

/// SSEQ command opcodes. Bytes below `REST` are notes.
pub mod opcode {
    pub const NOTE_MAX: u8 = 0x7F;
    pub const REST: u8 = 0x80;
    pub const PROGRAM: u8 = 0x81;
    pub const OPEN_TRACK: u8 = 0x93;
    pub const JUMP: u8 = 0x94;
    pub const CALL: u8 = 0x95;
    pub const RANDOM: u8 = 0xA0;
    pub const VARIABLE: u8 = 0xA1;
    pub const IF: u8 = 0xA2;
    pub const VAR_SET: u8 = 0xB0;
    pub const VAR_ADD: u8 = 0xB1;
    pub const VAR_SUB: u8 = 0xB2;
    pub const VAR_MUL: u8 = 0xB3;
    pub const VAR_DIV: u8 = 0xB4;
    pub const VAR_SHIFT: u8 = 0xB5;
    pub const VAR_RAND: u8 = 0xB6;
    pub const VAR_UNUSED: u8 = 0xB7;
    pub const VAR_EQ: u8 = 0xB8;
    pub const VAR_GE: u8 = 0xB9;
    pub const VAR_GT: u8 = 0xBA;
    pub const VAR_LE: u8 = 0xBB;
    pub const VAR_LT: u8 = 0xBC;
    pub const VAR_NE: u8 = 0xBD;
    pub const PAN: u8 = 0xC0;
    pub const VOLUME: u8 = 0xC1;
    pub const MASTER_VOLUME: u8 = 0xC2;
    pub const TRANSPOSE: u8 = 0xC3;
    pub const PITCH_BEND: u8 = 0xC4;
    pub const BEND_RANGE: u8 = 0xC5;
    pub const PRIORITY: u8 = 0xC6;
    pub const NOTE_WAIT: u8 = 0xC7;
    pub const TIE: u8 = 0xC8;
    pub const PORTAMENTO_KEY: u8 = 0xC9;
    pub const MOD_DEPTH: u8 = 0xCA;
    pub const MOD_SPEED: u8 = 0xCB;
    pub const MOD_TYPE: u8 = 0xCC;
    pub const MOD_RANGE: u8 = 0xCD;
    pub const PORTAMENTO: u8 = 0xCE;
    pub const PORTAMENTO_TIME: u8 = 0xCF;
    pub const ATTACK: u8 = 0xD0;
    pub const DECAY: u8 = 0xD1;
    pub const SUSTAIN: u8 = 0xD2;
    pub const RELEASE: u8 = 0xD3;
    pub const LOOP_START: u8 = 0xD4;
    pub const EXPRESSION: u8 = 0xD5;
    pub const PRINT_VAR: u8 = 0xD6;
    pub const MOD_DELAY: u8 = 0xE0;
    pub const TEMPO: u8 = 0xE1;
    pub const SWEEP_PITCH: u8 = 0xE3;
    pub const LOOP_END: u8 = 0xFC;
    pub const RETURN: u8 = 0xFD;
    pub const ALLOCATE_TRACKS: u8 = 0xFE;
    pub const END_OF_TRACK: u8 = 0xFF;
}

/// Encoding of a command's final argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    U8,
    S8,
    S16,
    VarLen,
}

/// Where a command's final argument comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgSource {
    /// Stored inline in the given encoding
    Immediate,
    /// Replaced by an inclusive s16 range to pick from
    Random,
    /// Replaced by a variable index
    Variable,
}

/// Final-argument encoding of the single-argument commands in 0xC0-0xE3
pub fn single_arg_kind(op: u8) -> Option<ArgKind> {
    use opcode::*;
    match op {
        TRANSPOSE | PITCH_BEND => Some(ArgKind::S8),
        PAN..=PRINT_VAR => Some(ArgKind::U8),
        MOD_DELAY | TEMPO | SWEEP_PITCH => Some(ArgKind::S16),
        _ => None,
    }
}
