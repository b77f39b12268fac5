//! Length resolution: turns timing runs into `length` and `fade` tags

use super::program::SequenceProgram;
use super::scale::cnv_scale;
use super::sequencer::PlaybackOptions;
use super::supervisor::{run_with_timeout, PollBudget};
use super::time::{Time, TimeKind};
use crate::ncsf::{format_length, TagList};
use log::{info, warn};
use std::time::Duration;

/// Knobs of the length policy
#[derive(Debug, Clone, PartialEq)]
pub struct LengthConfig {
    /// Loop count a looping sequence is timed to
    pub number_of_loops: u32,
    /// Fade seconds written for a looping sequence
    pub fade_loop: u32,
    /// Fade seconds written for a one-shot sequence
    pub fade_one_shot: u32,
    /// Print per-sequence results on stdout
    pub verbose: bool,
    /// Polls granted to the scan run
    pub scan_polls: u32,
    /// Polls granted to the render run
    pub render_polls: u32,
    /// Sleep between two polls
    pub poll_interval: Duration,
    /// Simulated time a scan run may cover
    pub scan_max_seconds: f64,
    /// Simulated time a render run may cover beyond the scan length
    pub render_extra_seconds: f64,
}

impl Default for LengthConfig {
    fn default() -> Self {
        Self {
            number_of_loops: 2,
            fade_loop: 10,
            fade_one_shot: 0,
            verbose: false,
            scan_polls: 20,
            render_polls: 40,
            poll_interval: Duration::from_millis(150),
            scan_max_seconds: 6000.0,
            render_extra_seconds: 30.0,
        }
    }
}

/// Outcome of [`resolve_length`]
#[derive(Debug, Clone, PartialEq)]
pub struct LengthReport {
    pub time: Time,
    /// `false` when a one-shot sequence could not be rendered to silence
    pub silence_detected: bool,
    /// The `length` tag written, if any
    pub length: Option<String>,
}

/// Time one sequence and write its `length` and `fade` tags.
///
/// `volume` is the sequence's INFO volume. When no time can be found the
/// existing `length` and `fade` tags are removed.
pub fn resolve_length(
    name: &str,
    program: &SequenceProgram,
    volume: u8,
    tags: &mut TagList,
    config: &LengthConfig,
) -> LengthReport {
    let scan = PlaybackOptions {
        do_notes: false,
        loops: config.number_of_loops,
        max_seconds: config.scan_max_seconds,
        sequence_volume: 0,
    };
    let mut time = run_with_timeout(
        name,
        program,
        scan,
        PollBudget::new(config.scan_polls, config.poll_interval),
    );

    let mut silence_detected = true;
    if time.is_determined() && time.kind == TimeKind::End {
        let render = PlaybackOptions {
            do_notes: true,
            loops: config.number_of_loops,
            max_seconds: time.seconds + config.render_extra_seconds,
            sequence_volume: cnv_scale(volume),
        };
        let rendered = run_with_timeout(
            name,
            program,
            render,
            PollBudget::new(config.render_polls, config.poll_interval),
        );
        if rendered.is_determined() {
            time = rendered;
        } else {
            warn!("{}: no silence found after the last note", name);
            silence_detected = false;
        }
    }

    if !time.is_determined() {
        tags.remove("length");
        tags.remove("fade");
        if config.verbose {
            println!("Unable to calculate time for {}", name);
        }
        return LengthReport {
            time,
            silence_detected: false,
            length: None,
        };
    }

    let seconds = (time.seconds.ceil() as u64).max(1);
    let length = format_length(seconds);
    let fade = match time.kind {
        TimeKind::Loop => config.fade_loop,
        TimeKind::End => config.fade_one_shot,
    };
    tags.set("length", length.as_str());
    tags.set("fade", fade.to_string());
    info!("{}: {} ({:?})", name, length, time.kind);

    if config.verbose {
        let timed_to = match time.kind {
            TimeKind::Loop => format!("timed to {} loops", config.number_of_loops),
            TimeKind::End => "one-shot".to_string(),
        };
        println!("Time for {}: {} ({})", name, length, timed_to);
        if !silence_detected {
            println!(
                "(NOTE: Was unable to detect silence at the end of the track, time may be inaccurate.)"
            );
        }
    }

    LengthReport {
        time,
        silence_detected,
        length: Some(length),
    }
}
