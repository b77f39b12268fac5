//! Note envelope model used for silence detection
//!
//! Tracks only the amplitude envelope of each sounding note, the way the
//! DS mixer channels do; no samples are produced.

use super::scale::{cnv_attack, cnv_fall, cnv_sustain};

/// Amplitude scale constant of the envelope unit
pub const AMPL_K: i32 = 723;

/// Lowest audible attenuation
pub const AMPL_MIN: i32 = -AMPL_K;

/// Envelope amplitude at which a voice is silent
pub const AMPL_THRESHOLD: i32 = AMPL_MIN << 7;

/// Hardware channel count
pub const MAX_VOICES: usize = 16;

/// Raw ADSR parameters as stored in banks and track overrides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    pub attack: u8,
    pub decay: u8,
    pub sustain: u8,
    pub release: u8,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            attack: 127,
            decay: 127,
            sustain: 127,
            release: 127,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopePhase {
    Attack,
    Decay,
    Sustain,
    Release,
}

/// One sounding note
#[derive(Debug, Clone)]
pub struct Voice {
    pub track: usize,
    pub velocity: u8,
    pub phase: EnvelopePhase,
    pub ampl: i32,
    attack_level: i32,
    decay_rate: i32,
    sustain_level: i32,
    release_rate: i32,
    /// Sequence steps until key-off; `None` holds the note
    pub remaining_steps: Option<u32>,
    /// Ticks until a one-shot sample runs out
    pub wave_ticks: Option<u64>,
    /// Clock tick the note started on
    pub started: u64,
    pub tied: bool,
}

impl Voice {
    pub fn new(
        track: usize,
        velocity: u8,
        envelope: Envelope,
        remaining_steps: Option<u32>,
        wave_ticks: Option<u64>,
        started: u64,
    ) -> Self {
        Self {
            track,
            velocity,
            phase: EnvelopePhase::Attack,
            ampl: AMPL_THRESHOLD,
            attack_level: cnv_attack(envelope.attack),
            decay_rate: cnv_fall(envelope.decay),
            sustain_level: cnv_sustain(envelope.sustain) << 7,
            release_rate: cnv_fall(envelope.release),
            remaining_steps,
            wave_ticks,
            started,
            tied: false,
        }
    }

    pub fn release(&mut self) {
        self.phase = EnvelopePhase::Release;
        self.remaining_steps = None;
        self.tied = false;
    }

    /// Count down the note duration by one sequence step
    pub fn step(&mut self) {
        if let Some(steps) = self.remaining_steps {
            if steps <= 1 {
                self.release();
            } else {
                self.remaining_steps = Some(steps - 1);
            }
        }
    }

    /// Advance the envelope by one tick. Returns `false` once the voice is silent.
    pub fn update(&mut self) -> bool {
        if let Some(ticks) = self.wave_ticks {
            if ticks == 0 {
                return false;
            }
            self.wave_ticks = Some(ticks - 1);
        }

        match self.phase {
            EnvelopePhase::Attack => {
                self.ampl = self.attack_level * self.ampl / 256;
                if self.ampl == 0 {
                    self.phase = EnvelopePhase::Decay;
                }
            }
            EnvelopePhase::Decay => {
                self.ampl -= self.decay_rate;
                if self.ampl <= self.sustain_level {
                    self.ampl = self.sustain_level;
                    self.phase = EnvelopePhase::Sustain;
                }
            }
            EnvelopePhase::Sustain => {}
            EnvelopePhase::Release => {
                self.ampl -= self.release_rate;
                if self.ampl <= AMPL_THRESHOLD {
                    return false;
                }
            }
        }
        true
    }

    /// Envelope attenuation in volume-table units
    pub fn attenuation(&self) -> i32 {
        self.ampl >> 7
    }
}

/// Fixed pool of voices with oldest-first stealing
#[derive(Debug, Clone, Default)]
pub struct VoicePool {
    voices: Vec<Voice>,
}

impl VoicePool {
    pub fn new() -> Self {
        Self {
            voices: Vec::with_capacity(MAX_VOICES),
        }
    }

    pub fn note_on(&mut self, voice: Voice) {
        if self.voices.len() >= MAX_VOICES {
            let oldest = self
                .voices
                .iter()
                .enumerate()
                .min_by_key(|(_, v)| (v.phase != EnvelopePhase::Release, v.started))
                .map(|(i, _)| i);
            if let Some(i) = oldest {
                self.voices.swap_remove(i);
            }
        }
        self.voices.push(voice);
    }

    /// The held voice of a track in tie mode
    pub fn tied_voice_mut(&mut self, track: usize) -> Option<&mut Voice> {
        self.voices.iter_mut().find(|v| v.track == track && v.tied)
    }

    pub fn release_tied(&mut self, track: usize) {
        for voice in self.voices.iter_mut().filter(|v| v.track == track && v.tied) {
            voice.release();
        }
    }

    pub fn step(&mut self) {
        for voice in &mut self.voices {
            voice.step();
        }
    }

    pub fn update(&mut self) {
        self.voices.retain_mut(Voice::update);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Voice> {
        self.voices.iter()
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}
