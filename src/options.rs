//! Options controlling the layout pipeline and the event transforms.
//!
//! One immutable `MidiOptions` value configures both sheet layout and
//! the playback/persistence transforms.  Re-applying a different value
//! always starts again from the pristine parsed file; nothing here
//! mutates parsed data.

use serde::{Deserialize, Serialize};

use crate::file::MidiFile;
use crate::time_signature::TimeSignature;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MidiOptions {
    /// Which tracks to include in the sheet (true = shown)
    pub tracks: Vec<bool>,
    /// Which tracks to mute in the transformed event stream
    pub mute: Vec<bool>,
    /// Per-track instrument overrides
    pub instruments: Vec<i32>,
    /// If true, leave the file's instruments untouched
    pub use_default_instruments: bool,
    /// Combine all tracks into a two-staff (treble/bass) grand staff
    pub two_staffs: bool,
    /// Scroll vertically: break symbols into page-width staves
    pub scroll_vert: bool,
    /// Attach lyrics to the staves
    pub show_lyrics: bool,
    /// Show measure numbers on each staff
    pub show_measures: bool,
    /// Shift all start times by this many pulses
    pub shift_time: i32,
    /// Shift all note numbers by this many semitones
    pub transpose: i32,
    /// Force this key (pitch class of the major tonic); None = guess
    pub key: Option<i32>,
    /// Force this time signature; None = the file's
    pub time: Option<TimeSignature>,
    /// Combine notes starting within this many milliseconds into a chord
    pub combine_interval: u32,
    /// Tempo override in microseconds per quarter; None = the file's
    pub tempo: Option<u32>,
    /// Drop events before this pulse time when re-serializing
    pub pause_time: u32,
}

impl MidiOptions {
    /// The default options for a parsed file: every track shown, none
    /// muted, instruments as authored.
    pub fn from_file(file: &MidiFile) -> MidiOptions {
        let count = file.tracks().len();
        MidiOptions {
            tracks: vec![true; count],
            mute: vec![false; count],
            instruments: file.tracks().iter().map(|t| t.instrument).collect(),
            ..MidiOptions::default()
        }
    }

    /// Whether track `index` is selected for display.
    pub fn track_shown(&self, index: usize) -> bool {
        self.tracks.get(index).copied().unwrap_or(true)
    }

    /// Whether track `index` is muted.
    pub fn track_muted(&self, index: usize) -> bool {
        self.mute.get(index).copied().unwrap_or(false)
    }
}

impl Default for MidiOptions {
    fn default() -> Self {
        MidiOptions {
            tracks: Vec::new(),
            mute: Vec::new(),
            instruments: Vec::new(),
            use_default_instruments: true,
            two_staffs: false,
            scroll_vert: true,
            show_lyrics: true,
            show_measures: false,
            shift_time: 0,
            transpose: 0,
            key: None,
            time: None,
            combine_interval: 40,
            tempo: None,
            pause_time: 0,
        }
    }
}
