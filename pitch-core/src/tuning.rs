//! # Musical Tuning Module
//!
//! Maps frequencies onto 12-tone equal temperament. Every frequency
//! resolves to the nearest semitone relative to a reference A4, described by
//! its MIDI number, note index, octave and the residual offset in cents.
//!
//! ## Features
//! - Frequency to nearest note, with cent deviation
//! - Letter (`C♯`), ASCII (`C#`) and fixed-do solfège (`Do♯`) note names
//! - Target frequency of any MIDI note for a given reference pitch
//! - Tuning status bands for in-tune / sharp / flat display

use serde::{Deserialize, Serialize};

/// Standard concert pitch for A4 in Hz.
pub const REFERENCE_A4_HZ: f32 = 440.0;

/// MIDI note number of A4.
pub const A4_MIDI: i32 = 69;

/// Note names indexed from C.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C♯", "D", "D♯", "E", "F", "F♯", "G", "G♯", "A", "A♯", "B",
];

/// Note names indexed from C, using `#` for sharps.
pub const NOTE_NAMES_ASCII: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Fixed-do solfège names indexed from C.
pub const SOLFEGE_NAMES: [&str; 12] = [
    "Do", "Do♯", "Re", "Re♯", "Mi", "Fa", "Fa♯", "Sol", "Sol♯", "La", "La♯", "Si",
];

/// Offset in cents below which a note reads as in tune.
const IN_TUNE_CENTS: i32 = 5;

/// Offset in cents below which a note reads as close.
const CLOSE_CENTS: i32 = 10;

/// The nearest equal-tempered note to a frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteInfo {
    /// Pitch class, 0 = C through 11 = B.
    pub note_index: u8,
    /// Scientific pitch notation octave (A4 = 440 Hz is octave 4).
    pub octave: i32,
    pub midi_note: i32,
    /// Deviation from the note in cents, within -50..=50.
    pub cents: i32,
}

/// Naming scheme used by [`NoteInfo::name_in`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notation {
    #[default]
    Letter,
    Ascii,
    Solfege,
}

impl NoteInfo {
    /// Builds the note for a MIDI number with no cent offset.
    pub fn from_midi(midi_note: i32) -> Self {
        Self {
            note_index: midi_note.rem_euclid(12) as u8,
            octave: midi_note.div_euclid(12) - 1,
            midi_note,
            cents: 0,
        }
    }

    /// Pitch-class name, e.g. `A♯`.
    pub fn name(&self) -> &'static str {
        self.name_in(Notation::Letter)
    }

    pub fn name_in(&self, notation: Notation) -> &'static str {
        let index = self.note_index as usize;
        match notation {
            Notation::Letter => NOTE_NAMES[index],
            Notation::Ascii => NOTE_NAMES_ASCII[index],
            Notation::Solfege => SOLFEGE_NAMES[index],
        }
    }

    /// Name with octave, e.g. `A♯4`.
    pub fn label(&self) -> String {
        self.label_in(Notation::Letter)
    }

    pub fn label_in(&self, notation: Notation) -> String {
        format!("{}{}", self.name_in(notation), self.octave)
    }

    /// True for the black keys.
    pub fn is_sharp(&self) -> bool {
        matches!(self.note_index, 1 | 3 | 6 | 8 | 10)
    }

    /// Exact equal-tempered frequency of this note for the given A4.
    pub fn target_frequency(&self, reference_hz: f32) -> f32 {
        midi_to_frequency(self.midi_note, reference_hz)
    }

    pub fn status(&self) -> TuningStatus {
        TuningStatus::from_cents(self.cents)
    }
}

/// Coarse tuning verdict derived from a cent offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TuningStatus {
    /// Within 5 cents.
    InTune,
    /// Within 10 cents.
    Close,
    Sharp,
    Flat,
}

impl TuningStatus {
    pub fn from_cents(cents: i32) -> Self {
        match cents.abs() {
            c if c < IN_TUNE_CENTS => TuningStatus::InTune,
            c if c < CLOSE_CENTS => TuningStatus::Close,
            _ if cents > 0 => TuningStatus::Sharp,
            _ => TuningStatus::Flat,
        }
    }
}

/// Stateless frequency to note quantizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteMapper {
    reference_hz: f32,
}

impl Default for NoteMapper {
    fn default() -> Self {
        Self::new(REFERENCE_A4_HZ)
    }
}

impl NoteMapper {
    pub fn new(reference_hz: f32) -> Self {
        Self { reference_hz }
    }

    pub fn reference_hz(&self) -> f32 {
        self.reference_hz
    }

    /// Finds the nearest note to `frequency_hz` and the offset from it.
    ///
    /// Callers only pass frequencies that survived the range gate, so the
    /// input is assumed positive and finite.
    pub fn map_to_note(&self, frequency_hz: f32) -> NoteInfo {
        let semitones = 12.0 * (frequency_hz / self.reference_hz).log2();
        let nearest = round_half_up(semitones);
        let cents = round_half_up((semitones - nearest) * 100.0) as i32;
        let midi_note = nearest as i32 + A4_MIDI;

        NoteInfo {
            cents,
            ..NoteInfo::from_midi(midi_note)
        }
    }
}

/// Maps a frequency with the standard A4 = 440 Hz reference.
pub fn map_to_note(frequency_hz: f32) -> NoteInfo {
    NoteMapper::default().map_to_note(frequency_hz)
}

/// Equal-tempered frequency of a MIDI note.
pub fn midi_to_frequency(midi_note: i32, reference_hz: f32) -> f32 {
    reference_hz * 2.0_f32.powf((midi_note - A4_MIDI) as f32 / 12.0)
}

/// Calculates the deviation from a target frequency in cents.
///
/// Unlike [`NoteInfo::cents`] this is unrounded:
/// - 100 cents = 1 semitone
/// - 1200 cents = 1 octave
/// - Positive values indicate sharpness, negative values indicate flatness
pub fn cents_between(freq: f32, target_freq: f32) -> f32 {
    1200.0 * (freq / target_freq).log2()
}

// Ties go up, so a quarter-tone above a note and one below it land on the
// same side and cents stays within -50..=50.
fn round_half_up(x: f32) -> f32 {
    (x + 0.5).floor()
}
