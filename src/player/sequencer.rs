//! SSEQ interpreter
//!
//! Runs a sequence tick by tick without producing audio. Each clock tick
//! adds the tempo to an accumulator; every time it passes [`TEMPO_BASE`]
//! the sequencer takes one step, running every due track until it waits
//! again. Loop closure is found by remembering the control state of all
//! tracks at each loop boundary. In note mode an envelope model follows
//! every sounding note so the end of a one-shot sequence can be placed
//! where it actually falls silent.

use super::command::{opcode, single_arg_kind, ArgKind, ArgSource};
use super::program::SequenceProgram;
use super::scale::cnv_scale;
use super::time::{Time, TimeKind, DEFAULT_TEMPO, TEMPO_BASE, TICKS_PER_SECOND};
use super::track::{Track, TrackSnapshot, MAX_TRACKS};
use super::voice::{Envelope, Voice, VoicePool, AMPL_MIN};
use crate::error::SequenceError;
use crate::sdat::sbnk::{NoteDefinition, NoteSource};
use log::trace;
use std::collections::HashMap;

/// Commands executed between cancellation checks inside one step
pub const CANCEL_CHECK_INTERVAL: u64 = 1024;

/// Silence that still yields an end point when a render run hits its ceiling
pub const SILENCE_SECONDS: f64 = 20.0;

/// Player-local plus global sequence variables
const VARIABLE_COUNT: usize = 32;

const RANDOM_SEED: u32 = 0x1234_5678;
const LCG_MULTIPLIER: u32 = 1_664_525;
const LCG_INCREMENT: u32 = 1_013_904_223;

/// Parameters of one timing run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackOptions {
    /// Follow note envelopes for silence detection
    pub do_notes: bool,
    /// Loop count a looping sequence is timed to
    pub loops: u32,
    /// Simulated time after which the run gives up
    pub max_seconds: f64,
    /// Attenuation from the sequence's INFO volume
    pub sequence_volume: i32,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            do_notes: false,
            loops: 2,
            max_seconds: 6000.0,
            sequence_volume: 0,
        }
    }
}

/// How a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// A control state repeated; `ticks` covers the requested loop count
    Looped { ticks: u64 },
    /// All tracks ended (and, in note mode, the last note died away)
    Ended { ticks: u64 },
    CeilingReached,
    Cancelled,
}

impl RunOutcome {
    pub fn time(&self) -> Time {
        match *self {
            Self::Looped { ticks } => Time::from_ticks(ticks, TimeKind::Loop),
            Self::Ended { ticks } => Time::from_ticks(ticks, TimeKind::End),
            Self::CeilingReached | Self::Cancelled => Time::UNDETERMINED,
        }
    }
}

pub struct Sequencer<'a> {
    program: &'a SequenceProgram,
    options: PlaybackOptions,
    tracks: Vec<Track>,
    voices: VoicePool,
    variables: [i16; VARIABLE_COUNT],
    random_state: u32,
    tempo: u32,
    tempo_counter: u32,
    master_volume: u8,
    clock: u64,
    executed: u64,
    visited: HashMap<Vec<TrackSnapshot>, u64>,
    /// A voice has been audible at some point of the run
    heard: bool,
    silent_since: Option<u64>,
}

impl<'a> Sequencer<'a> {
    pub fn new(program: &'a SequenceProgram, options: PlaybackOptions) -> Self {
        let mut tracks = vec![Track::default(); MAX_TRACKS];
        tracks[0] = Track::open(0);
        Self {
            program,
            options,
            tracks,
            voices: VoicePool::new(),
            variables: [-1; VARIABLE_COUNT],
            random_state: RANDOM_SEED,
            tempo: DEFAULT_TEMPO,
            // Primed so the first tick takes a step
            tempo_counter: TEMPO_BASE,
            master_volume: 127,
            clock: 0,
            executed: 0,
            visited: HashMap::new(),
            heard: false,
            silent_since: None,
        }
    }

    /// Run until the sequence loops, ends, hits the ceiling, or `should_stop`
    /// returns `true`. `should_stop` is polled once per tick and every
    /// [`CANCEL_CHECK_INTERVAL`] commands.
    pub fn run<F: Fn() -> bool>(&mut self, should_stop: F) -> Result<RunOutcome, SequenceError> {
        let max_ticks = (self.options.max_seconds.max(0.0) * TICKS_PER_SECOND) as u64;
        loop {
            if should_stop() {
                return Ok(RunOutcome::Cancelled);
            }
            if self.clock > max_ticks {
                return Ok(match self.settled_silence() {
                    Some(ticks) => RunOutcome::Ended { ticks },
                    None => RunOutcome::CeilingReached,
                });
            }

            while self.tempo_counter >= TEMPO_BASE {
                self.tempo_counter -= TEMPO_BASE;
                if let Some(outcome) = self.step(&should_stop)? {
                    return Ok(outcome);
                }
            }
            self.tempo_counter += self.tempo;

            if self.options.do_notes {
                self.voices.update();
            }
            if let Some(outcome) = self.check_end() {
                return Ok(outcome);
            }
            self.clock += 1;
        }
    }

    fn step<F: Fn() -> bool>(&mut self, should_stop: &F) -> Result<Option<RunOutcome>, SequenceError> {
        if self.options.do_notes {
            self.voices.step();
        }

        for index in 0..MAX_TRACKS {
            let track = &mut self.tracks[index];
            if !track.active {
                continue;
            }
            if track.wait > 0 {
                track.wait -= 1;
                if track.wait > 0 {
                    continue;
                }
            }

            while self.tracks[index].active && self.tracks[index].wait == 0 {
                self.executed += 1;
                if self.executed % CANCEL_CHECK_INTERVAL == 0 && should_stop() {
                    return Ok(Some(RunOutcome::Cancelled));
                }
                if let Some(outcome) = self.execute(index)? {
                    return Ok(Some(outcome));
                }
            }
        }
        Ok(None)
    }

    fn check_end(&mut self) -> Option<RunOutcome> {
        let tracks_done = self.tracks.iter().all(|t| !t.active);
        if !self.options.do_notes {
            return tracks_done.then_some(RunOutcome::Ended { ticks: self.clock });
        }

        if self.any_audible() {
            self.heard = true;
            self.silent_since = None;
            return None;
        }
        // Silence only counts once something has sounded
        if self.heard && self.silent_since.is_none() {
            self.silent_since = Some(self.clock);
        }
        tracks_done.then(|| RunOutcome::Ended {
            ticks: self.silent_since.unwrap_or(self.clock),
        })
    }

    /// Start of a silence that has lasted at least [`SILENCE_SECONDS`]
    fn settled_silence(&self) -> Option<u64> {
        let since = self.silent_since?;
        let silence_ticks = (SILENCE_SECONDS * TICKS_PER_SECOND) as u64;
        (self.clock - since >= silence_ticks).then_some(since)
    }

    fn any_audible(&self) -> bool {
        let global = cnv_scale(self.master_volume) + self.options.sequence_volume;
        self.voices.iter().any(|voice| {
            let track = &self.tracks[voice.track];
            let level = voice.attenuation()
                + cnv_scale(voice.velocity)
                + cnv_scale(track.volume)
                + cnv_scale(track.expression)
                + global;
            level > AMPL_MIN
        })
    }

    /// Execute one command of track `index`
    fn execute(&mut self, index: usize) -> Result<Option<RunOutcome>, SequenceError> {
        let offset = self.tracks[index].pc;
        let mut op = self.read_u8(index)?;
        let mut condition = true;
        let mut source = ArgSource::Immediate;
        loop {
            match op {
                opcode::IF => {
                    condition &= self.tracks[index].compare;
                    op = self.read_u8(index)?;
                }
                opcode::RANDOM => {
                    source = ArgSource::Random;
                    op = self.read_u8(index)?;
                    break;
                }
                opcode::VARIABLE => {
                    source = ArgSource::Variable;
                    op = self.read_u8(index)?;
                    break;
                }
                _ => break,
            }
        }

        match op {
            0..=opcode::NOTE_MAX => {
                let velocity = self.read_u8(index)?;
                let duration = self.read_last(index, ArgKind::VarLen, source)?.max(0) as u32;
                if condition {
                    self.note_on(index, op, velocity, duration);
                    let track = &mut self.tracks[index];
                    if track.note_wait {
                        track.wait = duration;
                    }
                }
            }
            opcode::REST => {
                let duration = self.read_last(index, ArgKind::VarLen, source)?.max(0) as u32;
                if condition {
                    self.tracks[index].wait = duration;
                }
            }
            opcode::PROGRAM => {
                let program = self.read_last(index, ArgKind::VarLen, source)?.max(0) as u32;
                if condition {
                    self.tracks[index].program = program;
                }
            }
            opcode::OPEN_TRACK => {
                let number = self.read_u8(index)? as usize;
                let target = self.read_u24(index)? as usize;
                if condition {
                    if number >= MAX_TRACKS {
                        return Err(SequenceError::InvalidTrack { track: number, offset });
                    }
                    self.tracks[number] = Track::open(target);
                }
            }
            opcode::JUMP => {
                let target = self.read_u24(index)? as usize;
                if condition {
                    self.tracks[index].pc = target;
                    return Ok(self.loop_boundary());
                }
            }
            opcode::CALL => {
                let target = self.read_u24(index)? as usize;
                if condition {
                    let track = &mut self.tracks[index];
                    let return_pc = track.pc;
                    track.push_call(return_pc)?;
                    track.pc = target;
                }
            }
            opcode::VAR_SET..=opcode::VAR_NE => {
                let var = self.read_u8(index)? as usize;
                let value = self.read_last(index, ArgKind::S16, source)? as i16;
                if condition {
                    self.variable_op(index, op, var, value);
                }
            }
            opcode::LOOP_START => {
                let count = self.read_last(index, ArgKind::U8, source)? as u8;
                if condition {
                    self.tracks[index].push_loop(count)?;
                }
            }
            opcode::LOOP_END => {
                if condition && self.tracks[index].end_loop()? {
                    return Ok(self.loop_boundary());
                }
            }
            opcode::RETURN => {
                if condition {
                    let track = &mut self.tracks[index];
                    track.pc = track.pop_call()?;
                }
            }
            opcode::ALLOCATE_TRACKS => {
                self.read_u16(index)?;
            }
            opcode::END_OF_TRACK => {
                if condition {
                    self.tracks[index].active = false;
                    if self.options.do_notes {
                        self.voices.release_tied(index);
                    }
                }
            }
            _ => match single_arg_kind(op) {
                Some(kind) => {
                    let value = self.read_last(index, kind, source)?;
                    if condition {
                        self.apply_setting(index, op, value);
                    }
                }
                None => return Err(SequenceError::UnknownOpcode { opcode: op, offset }),
            },
        }
        Ok(None)
    }

    /// Record the control state at a loop boundary; report a loop when the
    /// same state was seen at an earlier tick
    fn loop_boundary(&mut self) -> Option<RunOutcome> {
        let snapshot: Vec<TrackSnapshot> = self.tracks.iter().map(Track::snapshot).collect();
        match self.visited.get(&snapshot) {
            Some(&first) if self.clock > first => {
                let span = self.clock - first;
                let loops = self.options.loops.max(1) as u64;
                Some(RunOutcome::Looped {
                    ticks: first + (loops - 1) * span,
                })
            }
            Some(_) => None,
            None => {
                self.visited.insert(snapshot, self.clock);
                None
            }
        }
    }

    fn apply_setting(&mut self, index: usize, op: u8, value: i32) {
        match op {
            opcode::MASTER_VOLUME => self.master_volume = value as u8,
            opcode::TEMPO => self.tempo = value as u16 as u32,
            opcode::PRINT_VAR => {
                trace!("Track {} prints variable {}", index, self.variable(value as usize))
            }
            opcode::TIE => {
                let tie = value != 0;
                self.tracks[index].tie = tie;
                if !tie && self.options.do_notes {
                    self.voices.release_tied(index);
                }
            }
            _ => {
                let track = &mut self.tracks[index];
                match op {
                    opcode::PAN => track.pan = value as u8,
                    opcode::VOLUME => track.volume = value as u8,
                    opcode::TRANSPOSE => track.transpose = value as i8,
                    opcode::NOTE_WAIT => track.note_wait = value != 0,
                    opcode::ATTACK => track.attack = Some(value as u8),
                    opcode::DECAY => track.decay = Some(value as u8),
                    opcode::SUSTAIN => track.sustain = Some(value as u8),
                    opcode::RELEASE => track.release = Some(value as u8),
                    opcode::EXPRESSION => track.expression = value as u8,
                    // Pitch, modulation, portamento and priority do not affect timing
                    _ => {}
                }
            }
        }
    }

    fn variable_op(&mut self, index: usize, op: u8, var: usize, value: i16) {
        let current = self.variable(var);
        let result = match op {
            opcode::VAR_SET => value,
            opcode::VAR_ADD => current.wrapping_add(value),
            opcode::VAR_SUB => current.wrapping_sub(value),
            opcode::VAR_MUL => current.wrapping_mul(value),
            opcode::VAR_DIV => {
                if value == 0 {
                    return;
                }
                current.wrapping_div(value)
            }
            opcode::VAR_SHIFT => {
                if value >= 0 {
                    current.wrapping_shl(value as u32)
                } else {
                    current.wrapping_shr(value.unsigned_abs() as u32)
                }
            }
            opcode::VAR_RAND => {
                let r = self.random_range(0, value.unsigned_abs() as i32);
                let signed = if value < 0 { -r } else { r };
                signed.clamp(i16::MIN as i32, i16::MAX as i32) as i16
            }
            opcode::VAR_UNUSED => return,
            _ => {
                self.tracks[index].compare = match op {
                    opcode::VAR_EQ => current == value,
                    opcode::VAR_GE => current >= value,
                    opcode::VAR_GT => current > value,
                    opcode::VAR_LE => current <= value,
                    opcode::VAR_LT => current < value,
                    _ => current != value,
                };
                return;
            }
        };
        if let Some(slot) = self.variables.get_mut(var) {
            *slot = result;
        }
    }

    fn variable(&self, var: usize) -> i16 {
        self.variables.get(var).copied().unwrap_or(-1)
    }

    fn next_random(&mut self) -> u16 {
        self.random_state = self
            .random_state
            .wrapping_mul(LCG_MULTIPLIER)
            .wrapping_add(LCG_INCREMENT);
        (self.random_state >> 16) as u16
    }

    /// Uniform value in the inclusive range between `a` and `b`
    fn random_range(&mut self, a: i32, b: i32) -> i32 {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let span = (high - low + 1) as i64;
        low + ((self.next_random() as i64 * span) >> 16) as i32
    }

    fn note_on(&mut self, index: usize, op: u8, velocity: u8, duration: u32) {
        if !self.options.do_notes {
            return;
        }
        let track = &self.tracks[index];
        let key = (op as i32 + track.transpose as i32).clamp(0, 127) as u8;
        let tie = track.tie;

        let definition = match &self.program.bank {
            Some(bank) => match bank.note_definition(track.program as usize, key) {
                Some(definition) => Some(*definition),
                // Undefined instruments are not played
                None => return,
            },
            None => None,
        };

        let mut envelope = definition.map_or_else(Envelope::default, |d| Envelope {
            attack: d.attack,
            decay: d.decay,
            sustain: d.sustain,
            release: d.release,
        });
        if let Some(attack) = track.attack {
            envelope.attack = attack;
        }
        if let Some(decay) = track.decay {
            envelope.decay = decay;
        }
        if let Some(sustain) = track.sustain {
            envelope.sustain = sustain;
        }
        if let Some(release) = track.release {
            envelope.release = release;
        }

        if tie {
            if let Some(voice) = self.voices.tied_voice_mut(index) {
                voice.velocity = velocity;
                return;
            }
        }

        let wave_ticks = definition.and_then(|d| self.wave_ticks(&d, key));
        let remaining = if tie { None } else { Some(duration) };
        let mut voice = Voice::new(index, velocity, envelope, remaining, wave_ticks, self.clock);
        voice.tied = tie;
        self.voices.note_on(voice);
    }

    /// Ticks a one-shot PCM sample plays at `key`
    fn wave_ticks(&self, definition: &NoteDefinition, key: u8) -> Option<u64> {
        let NoteSource::Pcm { swav, swar } = definition.source else {
            return None;
        };
        let archive = self.program.wave_archives.get(swar as usize)?.as_ref()?;
        let wave = archive.wave(swav as usize)?;
        let seconds = wave.play_seconds(key as i32 - definition.base_key as i32)?;
        Some((seconds * TICKS_PER_SECOND).ceil() as u64)
    }

    fn read_u8(&mut self, index: usize) -> Result<u8, SequenceError> {
        let track = &mut self.tracks[index];
        let byte = *self
            .program
            .data
            .get(track.pc)
            .ok_or(SequenceError::UnexpectedEnd { offset: track.pc })?;
        track.pc += 1;
        Ok(byte)
    }

    fn read_u16(&mut self, index: usize) -> Result<u16, SequenceError> {
        let lo = self.read_u8(index)? as u16;
        let hi = self.read_u8(index)? as u16;
        Ok(lo | (hi << 8))
    }

    fn read_u24(&mut self, index: usize) -> Result<u32, SequenceError> {
        let lo = self.read_u16(index)? as u32;
        let hi = self.read_u8(index)? as u32;
        Ok(lo | (hi << 16))
    }

    /// MIDI-style variable-length value, at most four bytes
    fn read_varlen(&mut self, index: usize) -> Result<u32, SequenceError> {
        let mut value = 0u32;
        for _ in 0..4 {
            let byte = self.read_u8(index)?;
            value = (value << 7) | (byte & 0x7F) as u32;
            if byte & 0x80 == 0 {
                break;
            }
        }
        Ok(value)
    }

    /// Read a command's final argument, honouring a random/variable prefix
    fn read_last(
        &mut self,
        index: usize,
        kind: ArgKind,
        source: ArgSource,
    ) -> Result<i32, SequenceError> {
        match source {
            ArgSource::Immediate => Ok(match kind {
                ArgKind::U8 => self.read_u8(index)? as i32,
                ArgKind::S8 => self.read_u8(index)? as i8 as i32,
                ArgKind::S16 => self.read_u16(index)? as i16 as i32,
                ArgKind::VarLen => self.read_varlen(index)? as i32,
            }),
            ArgSource::Random => {
                let min = self.read_u16(index)? as i16 as i32;
                let max = self.read_u16(index)? as i16 as i32;
                Ok(self.random_range(min, max))
            }
            ArgSource::Variable => {
                let var = self.read_u8(index)? as usize;
                Ok(self.variable(var) as i32)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Set tempo 240 so one step is one tick
    const FAST: [u8; 3] = [opcode::TEMPO, 0xF0, 0x00];

    fn fast(body: &[u8]) -> Vec<u8> {
        let mut data = FAST.to_vec();
        data.extend_from_slice(body);
        data
    }

    fn run_with(data: &[u8], options: PlaybackOptions) -> Result<RunOutcome, SequenceError> {
        let program = SequenceProgram::new(data.to_vec());
        Sequencer::new(&program, options).run(|| false)
    }

    fn run(data: &[u8]) -> Result<RunOutcome, SequenceError> {
        run_with(data, PlaybackOptions::default())
    }

    #[test]
    fn test_immediate_end() {
        assert_eq!(run(&[0xFF]).unwrap(), RunOutcome::Ended { ticks: 0 });
    }

    #[test]
    fn test_rest_then_end() {
        assert_eq!(
            run(&fast(&[0x80, 10, 0xFF])).unwrap(),
            RunOutcome::Ended { ticks: 10 }
        );
    }

    #[test]
    fn test_default_tempo_takes_two_ticks_per_step() {
        assert_eq!(
            run(&[0x80, 10, 0xFF]).unwrap(),
            RunOutcome::Ended { ticks: 20 }
        );
    }

    #[test]
    fn test_multi_byte_rest() {
        assert_eq!(
            run(&fast(&[0x80, 0x81, 0x00, 0xFF])).unwrap(),
            RunOutcome::Ended { ticks: 128 }
        );
    }

    #[test]
    fn test_infinite_loop_timed_to_two_loops() {
        // 30 tick intro, 60 tick body
        let data = fast(&[0x80, 30, opcode::LOOP_START, 0, 0x80, 60, opcode::LOOP_END]);
        assert_eq!(run(&data).unwrap(), RunOutcome::Looped { ticks: 150 });

        let three = PlaybackOptions {
            loops: 3,
            ..Default::default()
        };
        assert_eq!(
            run_with(&data, three).unwrap(),
            RunOutcome::Looped { ticks: 210 }
        );
    }

    #[test]
    fn test_jump_loop() {
        // Body at offset 5: rest 20, jump back to 5
        let data = fast(&[0x80, 5, 0x80, 20, opcode::JUMP, 5, 0, 0]);
        assert_eq!(run(&data).unwrap(), RunOutcome::Looped { ticks: 45 });
    }

    #[test]
    fn test_finite_loop_is_not_a_loop() {
        let data = fast(&[opcode::LOOP_START, 3, 0x80, 10, opcode::LOOP_END, 0xFF]);
        assert_eq!(run(&data).unwrap(), RunOutcome::Ended { ticks: 30 });
    }

    #[test]
    fn test_call_and_return() {
        // Call a subroutine at offset 12 twice, each resting 7
        let data = fast(&[
            opcode::CALL, 12, 0, 0, opcode::CALL, 12, 0, 0, 0xFF, 0x80, 7, opcode::RETURN,
        ]);
        assert_eq!(run(&data).unwrap(), RunOutcome::Ended { ticks: 14 });
    }

    #[test]
    fn test_open_track_runs_longest() {
        // Track 1 at offset 11 rests 40; track 0 rests 10
        let data = fast(&[opcode::OPEN_TRACK, 1, 11, 0, 0, 0x80, 10, 0xFF, 0x80, 40, 0xFF]);
        assert_eq!(run(&data).unwrap(), RunOutcome::Ended { ticks: 40 });
    }

    #[test]
    fn test_invalid_track_number() {
        let data = [opcode::OPEN_TRACK, 16, 0, 0, 0, 0xFF];
        assert!(matches!(
            run(&data),
            Err(SequenceError::InvalidTrack { track: 16, .. })
        ));
    }

    #[test]
    fn test_unknown_opcode() {
        assert_eq!(
            run(&[0x80, 1, 0x90]),
            Err(SequenceError::UnknownOpcode {
                opcode: 0x90,
                offset: 2
            })
        );
    }

    #[test]
    fn test_truncated_data() {
        assert!(matches!(
            run(&[0x80]),
            Err(SequenceError::UnexpectedEnd { .. })
        ));
    }

    #[test]
    fn test_recursive_call_overflows() {
        assert!(matches!(
            run(&[opcode::CALL, 0, 0, 0]),
            Err(SequenceError::CallStackOverflow { .. })
        ));
    }

    #[test]
    fn test_return_without_call() {
        assert!(matches!(
            run(&[opcode::RETURN]),
            Err(SequenceError::CallStackUnderflow { .. })
        ));
    }

    #[test]
    fn test_variables_and_if() {
        let data = fast(&[
            opcode::VAR_SET, 0, 5, 0,
            opcode::VAR_EQ, 0, 5, 0,
            opcode::IF, 0x80, 10,
            opcode::VAR_ADD, 0, 1, 0,
            opcode::VAR_EQ, 0, 5, 0,
            opcode::IF, 0x80, 100,
            0xFF,
        ]);
        assert_eq!(run(&data).unwrap(), RunOutcome::Ended { ticks: 10 });
    }

    #[test]
    fn test_variable_prefix_rest() {
        let data = fast(&[opcode::VAR_SET, 3, 25, 0, opcode::VARIABLE, 0x80, 3, 0xFF]);
        assert_eq!(run(&data).unwrap(), RunOutcome::Ended { ticks: 25 });
    }

    #[test]
    fn test_random_rest_in_range() {
        let data = fast(&[opcode::RANDOM, 0x80, 10, 0, 20, 0, 0xFF]);
        match run(&data).unwrap() {
            RunOutcome::Ended { ticks } => assert!((10..=20).contains(&ticks)),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_jump_to_self_is_cancelled() {
        let program = SequenceProgram::new(vec![opcode::JUMP, 0, 0, 0]);
        let polls = Cell::new(0);
        let outcome = Sequencer::new(&program, PlaybackOptions::default())
            .run(|| {
                polls.set(polls.get() + 1);
                polls.get() > 3
            })
            .unwrap();
        assert_eq!(outcome, RunOutcome::Cancelled);
    }

    #[test]
    fn test_ceiling() {
        let options = PlaybackOptions {
            max_seconds: 1.0,
            ..Default::default()
        };
        let outcome = run_with(&fast(&[0x80, 0xFF, 0xFF, 0x7F, 0xFF]), options).unwrap();
        assert_eq!(outcome, RunOutcome::CeilingReached);
        assert_eq!(outcome.time(), Time::UNDETERMINED);
    }

    #[test]
    fn test_note_release_extends_render() {
        // Release 100 on a 48 step note; the fall takes 314 ticks after key-off
        let data = fast(&[opcode::RELEASE, 100, 60, 127, 48, 0xFF]);
        assert_eq!(run(&data).unwrap(), RunOutcome::Ended { ticks: 48 });

        let render = PlaybackOptions {
            do_notes: true,
            ..Default::default()
        };
        assert_eq!(
            run_with(&data, render).unwrap(),
            RunOutcome::Ended { ticks: 361 }
        );
    }

    #[test]
    fn test_quiet_sequence_volume_ends_sooner() {
        let data = fast(&[opcode::RELEASE, 100, 60, 127, 48, 0xFF]);
        let quiet = PlaybackOptions {
            do_notes: true,
            sequence_volume: cnv_scale(32),
            ..Default::default()
        };
        match run_with(&data, quiet).unwrap() {
            RunOutcome::Ended { ticks } => assert!(ticks > 48 && ticks < 361),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_render_held_note_hits_ceiling() {
        // Poly mode, very long note, track ends immediately
        let data = fast(&[opcode::NOTE_WAIT, 0, 60, 127, 0xFF, 0xFF, 0x7F, 0xFF]);
        let render = PlaybackOptions {
            do_notes: true,
            max_seconds: 2.0,
            ..Default::default()
        };
        assert_eq!(run_with(&data, render).unwrap(), RunOutcome::CeilingReached);
        assert_eq!(run(&data).unwrap(), RunOutcome::Ended { ticks: 0 });
    }

    fn render() -> PlaybackOptions {
        PlaybackOptions {
            do_notes: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_long_leading_rest_before_first_note() {
        // 4800 tick rest, then a short note with the instant envelope
        let data = fast(&[0x80, 0xA5, 0x40, 60, 127, 10, 0xFF]);
        assert_eq!(run(&data).unwrap(), RunOutcome::Ended { ticks: 4810 });
        assert_eq!(
            run_with(&data, render()).unwrap(),
            RunOutcome::Ended { ticks: 4811 }
        );
    }

    #[test]
    fn test_long_gap_between_notes() {
        // Two short notes around a 6000 tick rest
        let data = fast(&[60, 127, 5, 0x80, 0xAE, 0x70, 60, 127, 5, 0xFF]);
        assert_eq!(
            run_with(&data, render()).unwrap(),
            RunOutcome::Ended { ticks: 6011 }
        );
    }

    #[test]
    fn test_render_without_notes_ends_with_tracks() {
        let data = fast(&[0x80, 50, 0xFF]);
        assert_eq!(
            run_with(&data, render()).unwrap(),
            RunOutcome::Ended { ticks: 50 }
        );
    }

    #[test]
    fn test_settled_silence_at_ceiling() {
        // The note dies at tick 6 while the track keeps resting
        let data = fast(&[60, 127, 5, 0x80, 0xFF, 0xFF, 0x7F, 0xFF]);
        let long = PlaybackOptions {
            max_seconds: 30.0,
            ..render()
        };
        assert_eq!(run_with(&data, long).unwrap(), RunOutcome::Ended { ticks: 6 });

        let short = PlaybackOptions {
            max_seconds: 10.0,
            ..render()
        };
        assert_eq!(run_with(&data, short).unwrap(), RunOutcome::CeilingReached);
    }

    #[test]
    fn test_random_variable_with_most_negative_bound() {
        let program = SequenceProgram::new(vec![0xFF]);
        let mut sequencer = Sequencer::new(&program, PlaybackOptions::default());

        // Seed the generator so the next draw is the top of its range
        let mut inverse = LCG_MULTIPLIER;
        for _ in 0..5 {
            inverse = inverse.wrapping_mul(2u32.wrapping_sub(LCG_MULTIPLIER.wrapping_mul(inverse)));
        }
        sequencer.random_state = 0xFFFF_0000u32
            .wrapping_sub(LCG_INCREMENT)
            .wrapping_mul(inverse);

        sequencer.variable_op(0, opcode::VAR_RAND, 0, i16::MIN);
        assert_eq!(sequencer.variable(0), i16::MIN);
    }

    #[test]
    fn test_random_variable_commands_run() {
        // Three nested loops drawing with a bound of -32768
        let data = [
            opcode::LOOP_START, 64,
            opcode::LOOP_START, 64,
            opcode::LOOP_START, 64,
            opcode::VAR_RAND, 0, 0x00, 0x80,
            opcode::LOOP_END,
            opcode::LOOP_END,
            opcode::LOOP_END,
            0xFF,
        ];
        assert_eq!(run(&data).unwrap(), RunOutcome::Ended { ticks: 0 });
    }
}
