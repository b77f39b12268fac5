//! Sequence length detection
//!
//! A headless SSEQ player that measures how long a sequence plays: the
//! loop point for looping sequences, or the moment the last note fades
//! out for one-shots. Runs are supervised on worker threads with a
//! wall-clock budget so malformed or endless data cannot hang a
//! conversion.

pub mod command;
pub mod length;
pub mod program;
pub mod scale;
pub mod sequencer;
pub mod supervisor;
pub mod time;
pub mod track;
pub mod voice;

pub use crate::error::SequenceError;
pub use length::{resolve_length, LengthConfig, LengthReport};
pub use program::SequenceProgram;
pub use scale::cnv_scale;
pub use sequencer::{PlaybackOptions, RunOutcome, Sequencer};
pub use supervisor::{run_with_timeout, PollBudget, RunHandle};
pub use time::{Time, TimeKind, TICKS_PER_SECOND};
