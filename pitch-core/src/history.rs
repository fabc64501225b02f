//! # Pitch History Module
//!
//! Rolling window of recent detections kept by the display side for
//! charting. The estimation pipeline never reads it.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::tuning::NoteInfo;

/// Number of samples kept by default.
pub const DEFAULT_HISTORY_CAPACITY: usize = 200;

/// Minimum vertical span of a chart, in semitones.
const MIN_CHART_SPAN: i32 = 12;

/// A single charted detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchSample {
    pub frequency_hz: f32,
    pub note_index: u8,
    pub octave: i32,
    pub midi_note: i32,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
}

impl PitchSample {
    pub fn new(frequency_hz: f32, note: &NoteInfo, timestamp_ms: u64) -> Self {
        Self {
            frequency_hz,
            note_index: note.note_index,
            octave: note.octave,
            midi_note: note.midi_note,
            timestamp_ms,
        }
    }

    /// Stamps the sample with the current wall-clock time.
    pub fn now(frequency_hz: f32, note: &NoteInfo) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self::new(frequency_hz, note, timestamp_ms)
    }
}

/// Bounded FIFO of [`PitchSample`]s; the oldest entry is evicted first.
#[derive(Debug, Clone)]
pub struct PitchHistory {
    samples: VecDeque<PitchSample>,
    capacity: usize,
}

impl Default for PitchHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl PitchHistory {
    /// A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn push(&mut self, sample: PitchSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn latest(&self) -> Option<&PitchSample> {
        self.samples.back()
    }

    /// All samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &PitchSample> {
        self.samples.iter()
    }

    /// The last `n` samples, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &PitchSample> {
        self.samples.iter().skip(self.samples.len().saturating_sub(n))
    }

    /// Vertical MIDI range for charting the last `n` samples.
    ///
    /// The observed span is widened to at least an octave and centred on
    /// the observed notes. Returns `None` with no samples.
    pub fn chart_range(&self, n: usize) -> Option<(i32, i32)> {
        let (min, max) = self.recent(n).fold(None, |acc, s| match acc {
            None => Some((s.midi_note, s.midi_note)),
            Some((lo, hi)) => Some((s.midi_note.min(lo), s.midi_note.max(hi))),
        })?;
        let span = (max - min).max(MIN_CHART_SPAN);
        let low = (min + max - span).div_euclid(2);
        Some((low, low + span))
    }
}
