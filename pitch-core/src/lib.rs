// pitch-core/src/lib.rs

//! The core logic for the real-time pitch monitor.
//! This crate is responsible for silence gating, autocorrelation pitch
//! estimation and musical note mapping, plus the audio capture plumbing
//! that feeds it. It is completely headless and contains no rendering code.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod fft;
pub mod gate;
pub mod history;
pub mod pitch;
pub mod tuning;

use serde::{Deserialize, Serialize};

pub use analysis::{Analyzer, FrequencyRange};
pub use config::DetectorConfig;
pub use gate::SignalGate;
pub use history::{PitchHistory, PitchSample};
pub use pitch::PitchEstimator;
pub use tuning::{NoteInfo, NoteMapper};

/// Outcome of analysing a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Detection {
    /// A pitch inside the accepted range.
    Voiced { frequency_hz: f32, note: NoteInfo },
    /// Silence, no clear period, or a pitch outside the accepted range.
    NoVoice,
}

impl Detection {
    pub fn note(&self) -> Option<&NoteInfo> {
        match self {
            Detection::Voiced { note, .. } => Some(note),
            Detection::NoVoice => None,
        }
    }

    /// The history entry for this detection, if it carries a pitch.
    pub fn to_sample(&self) -> Option<PitchSample> {
        match self {
            Detection::Voiced { frequency_hz, note } => Some(PitchSample::now(*frequency_hz, note)),
            Detection::NoVoice => None,
        }
    }
}

/// Represents the result of a single audio analysis frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub detection: Detection,
    /// Input level for metering, 0.0 to 1.0.
    pub volume: f32,
}
