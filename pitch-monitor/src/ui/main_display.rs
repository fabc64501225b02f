//! # Main Display
//!
//! Formats each frame report as a status line and summarizes the session
//! history when the monitor exits.

use pitch_core::tuning::{Notation, NoteInfo, TuningStatus};
use pitch_core::{Detection, FrameReport, PitchHistory};

use super::cent_meter;

const METER_WIDTH: usize = 41;
const VOLUME_WIDTH: usize = 10;

/// Number of recent samples the chart summary looks at.
pub const CHART_WINDOW: usize = 80;

fn status_text(status: TuningStatus) -> &'static str {
    match status {
        TuningStatus::InTune => "perfect",
        TuningStatus::Close => "good",
        TuningStatus::Sharp => "sharp ↑",
        TuningStatus::Flat => "flat ↓",
    }
}

/// One terminal line for a frame.
pub fn status_line(report: &FrameReport, notation: Notation) -> String {
    let volume = cent_meter::volume_bar(report.volume, VOLUME_WIDTH);
    match report.detection {
        Detection::Voiced { frequency_hz, note } => format!(
            "{:<5} {:>7.1} Hz  {:>+3}¢ {:<8} [{}] [{}]",
            note.label_in(notation),
            frequency_hz,
            note.cents,
            status_text(note.status()),
            cent_meter::render(Some(note.cents), METER_WIDTH),
            volume,
        ),
        Detection::NoVoice => format!(
            "{:<5} {:>10}  {:>4} {:<8} [{}] [{}]",
            "--",
            "listening",
            "",
            "",
            cent_meter::render(None, METER_WIDTH),
            volume,
        ),
    }
}

/// Closing summary of the detected pitches.
pub fn summary(history: &PitchHistory, notation: Notation) -> String {
    match history.chart_range(CHART_WINDOW) {
        Some((low, high)) => format!(
            "{}/{} pitched frames kept; recent range {} - {}",
            history.len(),
            history.capacity(),
            NoteInfo::from_midi(low).label_in(notation),
            NoteInfo::from_midi(high).label_in(notation),
        ),
        None => "no pitch detected".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitch_core::PitchSample;
    use pitch_core::tuning::map_to_note;

    #[test]
    fn voiced_line_shows_note_and_cents() {
        let report = FrameReport {
            detection: Detection::Voiced {
                frequency_hz: 440.0,
                note: map_to_note(440.0),
            },
            volume: 0.5,
        };
        let line = status_line(&report, Notation::Letter);
        assert!(line.starts_with("A4 "));
        assert!(line.contains("440.0 Hz"));
        assert!(line.contains("+0¢"));
        assert!(line.contains("perfect"));
        assert!(line.contains("[#####     ]"));
    }

    #[test]
    fn solfege_notation() {
        let report = FrameReport {
            detection: Detection::Voiced {
                frequency_hz: 261.63,
                note: map_to_note(261.63),
            },
            volume: 1.0,
        };
        assert!(status_line(&report, Notation::Solfege).starts_with("Do4"));
    }

    #[test]
    fn silent_line_has_placeholder() {
        let report = FrameReport {
            detection: Detection::NoVoice,
            volume: 0.0,
        };
        let line = status_line(&report, Notation::Letter);
        assert!(line.starts_with("--"));
        assert!(line.contains("listening"));
        assert!(!line.contains('●'));
    }

    #[test]
    fn summary_reports_range() {
        let mut history = PitchHistory::default();
        assert_eq!(summary(&history, Notation::Letter), "no pitch detected");

        let note = NoteInfo::from_midi(69);
        history.push(PitchSample::new(440.0, &note, 0));
        assert_eq!(
            summary(&history, Notation::Ascii),
            "1/200 pitched frames kept; recent range D#4 - D#5"
        );
    }
}
