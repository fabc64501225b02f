//! Text rendering of frame reports for the terminal.

pub mod cent_meter;
pub mod main_display;
