//! Sequence track state

use super::SequenceError;

/// Number of tracks a sequence can open
pub const MAX_TRACKS: usize = 16;

/// Depth of the call stack and of the loop stack
pub const STACK_DEPTH: usize = 3;

/// Loop-start frame; `remaining` is `None` for an infinite loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoopFrame {
    pub pc: usize,
    pub remaining: Option<u8>,
}

/// Control state compared during loop detection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackSnapshot {
    pub active: bool,
    pub pc: usize,
    pub call_stack: Vec<usize>,
    pub loop_stack: Vec<LoopFrame>,
}

/// Per-track playback state
#[derive(Debug, Clone)]
pub struct Track {
    pub active: bool,
    /// Offset of the next command
    pub pc: usize,
    /// Sequence steps until the next command runs
    pub wait: u32,
    pub call_stack: Vec<usize>,
    pub loop_stack: Vec<LoopFrame>,
    pub volume: u8,
    pub expression: u8,
    pub pan: u8,
    pub transpose: i8,
    pub program: u32,
    /// Notes wait for their own duration (mono mode)
    pub note_wait: bool,
    pub tie: bool,
    /// Result of the last variable comparison
    pub compare: bool,
    pub attack: Option<u8>,
    pub decay: Option<u8>,
    pub sustain: Option<u8>,
    pub release: Option<u8>,
}

impl Default for Track {
    fn default() -> Self {
        Self {
            active: false,
            pc: 0,
            wait: 0,
            call_stack: Vec::with_capacity(STACK_DEPTH),
            loop_stack: Vec::with_capacity(STACK_DEPTH),
            volume: 127,
            expression: 127,
            pan: 64,
            transpose: 0,
            program: 0,
            note_wait: true,
            tie: false,
            compare: true,
            attack: None,
            decay: None,
            sustain: None,
            release: None,
        }
    }
}

impl Track {
    /// Start a fresh track at `pc`
    pub fn open(pc: usize) -> Self {
        Self {
            active: true,
            pc,
            ..Self::default()
        }
    }

    pub fn push_call(&mut self, return_pc: usize) -> Result<(), SequenceError> {
        if self.call_stack.len() >= STACK_DEPTH {
            return Err(SequenceError::CallStackOverflow { offset: self.pc });
        }
        self.call_stack.push(return_pc);
        Ok(())
    }

    pub fn pop_call(&mut self) -> Result<usize, SequenceError> {
        self.call_stack
            .pop()
            .ok_or(SequenceError::CallStackUnderflow { offset: self.pc })
    }

    /// Enter a loop whose body starts at the current pc. A count of 0 loops forever.
    pub fn push_loop(&mut self, count: u8) -> Result<(), SequenceError> {
        if self.loop_stack.len() >= STACK_DEPTH {
            return Err(SequenceError::LoopStackOverflow { offset: self.pc });
        }
        self.loop_stack.push(LoopFrame {
            pc: self.pc,
            remaining: (count != 0).then_some(count),
        });
        Ok(())
    }

    /// Close the innermost loop. Returns `true` when the jump back belongs
    /// to an infinite loop.
    pub fn end_loop(&mut self) -> Result<bool, SequenceError> {
        let frame = self
            .loop_stack
            .last_mut()
            .ok_or(SequenceError::LoopStackUnderflow { offset: self.pc })?;
        match frame.remaining {
            None => {
                self.pc = frame.pc;
                Ok(true)
            }
            Some(1) => {
                self.loop_stack.pop();
                Ok(false)
            }
            Some(n) => {
                frame.remaining = Some(n - 1);
                self.pc = frame.pc;
                Ok(false)
            }
        }
    }

    pub fn snapshot(&self) -> TrackSnapshot {
        if !self.active {
            return TrackSnapshot {
                active: false,
                pc: 0,
                call_stack: Vec::new(),
                loop_stack: Vec::new(),
            };
        }
        TrackSnapshot {
            active: true,
            pc: self.pc,
            call_stack: self.call_stack.clone(),
            loop_stack: self.loop_stack.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_stack_bounds() {
        let mut track = Track::open(0);
        for i in 0..STACK_DEPTH {
            track.push_call(i).unwrap();
        }
        assert!(matches!(
            track.push_call(9),
            Err(SequenceError::CallStackOverflow { .. })
        ));
        assert_eq!(track.pop_call().unwrap(), STACK_DEPTH - 1);
        track.call_stack.clear();
        assert!(matches!(
            track.pop_call(),
            Err(SequenceError::CallStackUnderflow { .. })
        ));
    }

    #[test]
    fn test_finite_loop_runs_count_times() {
        let mut track = Track::open(0);
        track.pc = 5;
        track.push_loop(3).unwrap();

        let mut jumps = 0;
        loop {
            track.pc = 20;
            assert!(!track.end_loop().unwrap());
            if track.pc != 5 {
                break;
            }
            jumps += 1;
        }
        assert_eq!(jumps, 2);
        assert!(track.loop_stack.is_empty());
    }

    #[test]
    fn test_infinite_loop() {
        let mut track = Track::open(0);
        track.pc = 8;
        track.push_loop(0).unwrap();
        track.pc = 30;
        assert!(track.end_loop().unwrap());
        assert_eq!(track.pc, 8);
        assert_eq!(track.loop_stack.len(), 1);
    }

    #[test]
    fn test_inactive_snapshot_is_canonical() {
        let mut a = Track::open(10);
        a.active = false;
        let b = Track::default();
        assert_eq!(a.snapshot(), b.snapshot());
    }
}
