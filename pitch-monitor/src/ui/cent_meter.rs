//! # Cent Meter
//!
//! Draws the deviation from the nearest note as a one-line needle gauge,
//! `-50¢` on the left edge and `+50¢` on the right.

/// Maximum cent deviation shown by the meter.
const METER_RANGE: i32 = 50;

const NEEDLE: char = '●';
const CENTER: char = '|';
const TRACK: char = '-';

/// Renders the meter `width` characters wide (at least 3). Without a
/// reading only the track and centre mark are drawn.
pub fn render(cents: Option<i32>, width: usize) -> String {
    let width = width.max(3);
    let center = width / 2;
    let needle = cents.map(|c| needle_position(c, width));

    (0..width)
        .map(|i| {
            if Some(i) == needle {
                NEEDLE
            } else if i == center {
                CENTER
            } else {
                TRACK
            }
        })
        .collect()
}

fn needle_position(cents: i32, width: usize) -> usize {
    let clamped = cents.clamp(-METER_RANGE, METER_RANGE);
    let span = (width - 1) as f32;
    ((clamped + METER_RANGE) as f32 / (2 * METER_RANGE) as f32 * span).round() as usize
}

/// Renders a volume bar of `width` cells for a 0.0..=1.0 level.
pub fn volume_bar(volume: f32, width: usize) -> String {
    let filled = (volume.clamp(0.0, 1.0) * width as f32).round() as usize;
    format!("{}{}", "#".repeat(filled), " ".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_needle_covers_center_mark() {
        assert_eq!(render(Some(0), 11), "-----●-----");
    }

    #[test]
    fn extremes_hit_the_edges() {
        assert_eq!(render(Some(-50), 11), "●----|-----");
        assert_eq!(render(Some(50), 11), "-----|----●");
        assert_eq!(render(Some(120), 11), "-----|----●");
    }

    #[test]
    fn no_reading_draws_track_only() {
        assert_eq!(render(None, 5), "--|--");
    }

    #[test]
    fn volume_bar_fills_proportionally() {
        assert_eq!(volume_bar(0.5, 10), "#####     ");
        assert_eq!(volume_bar(2.0, 4), "####");
        assert_eq!(volume_bar(0.0, 3), "   ");
    }
}
