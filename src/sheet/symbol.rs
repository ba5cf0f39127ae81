//! The music symbols a staff is made of.
//!
//! The symbol kinds form a closed set, so they are a tagged enum rather
//! than a trait object: layout matches over them exhaustively.  Every
//! symbol has a start time, a minimum width, and a rendered width; the
//! rendered width is raised (once) by the alignment pass so that
//! same-time columns line up across staves.

use serde::{Deserialize, Serialize};

use super::chord::ChordSymbol;
use super::constants::*;
use crate::clef::Clef;
use crate::key_signature::Accid;
use crate::time_signature::NoteDuration;
use crate::white_note::WhiteNote;

/// One symbol in a staff's symbol list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MusicSymbol {
    Chord(ChordSymbol),
    Rest(RestSymbol),
    Bar(BarSymbol),
    Clef(ClefSymbol),
    TimeSig(TimeSigSymbol),
    Blank(BlankSymbol),
}

impl MusicSymbol {
    /// The time (in pulses) the symbol occurs at.
    pub fn start_time(&self) -> u32 {
        match self {
            MusicSymbol::Chord(s) => s.start_time(),
            MusicSymbol::Rest(s) => s.start_time,
            MusicSymbol::Bar(s) => s.start_time,
            MusicSymbol::Clef(s) => s.start_time,
            MusicSymbol::TimeSig(s) => s.start_time,
            MusicSymbol::Blank(s) => s.start_time,
        }
    }

    /// The minimum width needed to draw the symbol.
    pub fn min_width(&self) -> i32 {
        match self {
            MusicSymbol::Chord(s) => s.min_width(),
            MusicSymbol::Rest(s) => s.min_width(),
            MusicSymbol::Bar(s) => s.min_width(),
            MusicSymbol::Clef(s) => s.min_width(),
            MusicSymbol::TimeSig(s) => s.min_width(),
            MusicSymbol::Blank(s) => s.min_width(),
        }
    }

    /// The rendered width.  Starts at the minimum width and is raised
    /// by the alignment pass.
    pub fn width(&self) -> i32 {
        match self {
            MusicSymbol::Chord(s) => s.width,
            MusicSymbol::Rest(s) => s.width,
            MusicSymbol::Bar(s) => s.width,
            MusicSymbol::Clef(s) => s.width,
            MusicSymbol::TimeSig(s) => s.width,
            MusicSymbol::Blank(s) => s.width,
        }
    }

    pub fn set_width(&mut self, width: i32) {
        match self {
            MusicSymbol::Chord(s) => s.width = width,
            MusicSymbol::Rest(s) => s.width = width,
            MusicSymbol::Bar(s) => s.width = width,
            MusicSymbol::Clef(s) => s.width = width,
            MusicSymbol::TimeSig(s) => s.width = width,
            MusicSymbol::Blank(s) => s.width = width,
        }
    }

    /// Pixels the symbol extends above the staff.
    pub fn above_staff(&self) -> i32 {
        match self {
            MusicSymbol::Chord(s) => s.above_staff(),
            MusicSymbol::Clef(s) => s.above_staff(),
            _ => 0,
        }
    }

    /// Pixels the symbol extends below the staff.
    pub fn below_staff(&self) -> i32 {
        match self {
            MusicSymbol::Chord(s) => s.below_staff(),
            MusicSymbol::Clef(s) => s.below_staff(),
            _ => 0,
        }
    }

    pub fn is_bar(&self) -> bool {
        matches!(self, MusicSymbol::Bar(_))
    }

    pub fn is_chord(&self) -> bool {
        matches!(self, MusicSymbol::Chord(_))
    }

    pub fn as_chord(&self) -> Option<&ChordSymbol> {
        match self {
            MusicSymbol::Chord(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_chord_mut(&mut self) -> Option<&mut ChordSymbol> {
        match self {
            MusicSymbol::Chord(c) => Some(c),
            _ => None,
        }
    }
}

/// A rest, drawn where a track has a gap between chords.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestSymbol {
    pub start_time: u32,
    pub duration: NoteDuration,
    pub width: i32,
}

impl RestSymbol {
    pub fn new(start_time: u32, duration: NoteDuration) -> RestSymbol {
        let mut rest = RestSymbol {
            start_time,
            duration,
            width: 0,
        };
        rest.width = rest.min_width();
        rest
    }

    pub fn min_width(&self) -> i32 {
        2 * NOTE_HEIGHT + NOTE_HEIGHT / 2
    }
}

/// A vertical bar delimiting measures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarSymbol {
    pub start_time: u32,
    pub width: i32,
}

impl BarSymbol {
    pub fn new(start_time: u32) -> BarSymbol {
        let mut bar = BarSymbol {
            start_time,
            width: 0,
        };
        bar.width = bar.min_width();
        bar
    }

    pub fn min_width(&self) -> i32 {
        2 * LINE_SPACE
    }
}

/// A treble or bass clef, either the full-size staff clef or the small
/// mid-staff clef-change marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClefSymbol {
    pub start_time: u32,
    pub clef: Clef,
    /// True for the small clef drawn on clef changes
    pub small: bool,
    pub width: i32,
}

impl ClefSymbol {
    pub fn new(clef: Clef, start_time: u32, small: bool) -> ClefSymbol {
        let mut symbol = ClefSymbol {
            start_time,
            clef,
            small,
            width: 0,
        };
        symbol.width = symbol.min_width();
        symbol
    }

    pub fn min_width(&self) -> i32 {
        if self.small {
            CLEF_WIDTH * 3 / 4
        } else {
            CLEF_WIDTH
        }
    }

    pub fn above_staff(&self) -> i32 {
        if self.clef == Clef::Treble && !self.small {
            2 * NOTE_HEIGHT
        } else {
            0
        }
    }

    pub fn below_staff(&self) -> i32 {
        match (self.clef, self.small) {
            (Clef::Treble, false) => 2 * NOTE_HEIGHT,
            (Clef::Treble, true) => NOTE_HEIGHT,
            (Clef::Bass, _) => 0,
        }
    }
}

/// The numerator-over-denominator time signature marker at the start of
/// the symbol list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSigSymbol {
    pub start_time: u32,
    pub numerator: u32,
    pub denominator: u32,
    pub width: i32,
}

impl TimeSigSymbol {
    pub fn new(numerator: u32, denominator: u32) -> TimeSigSymbol {
        let mut symbol = TimeSigSymbol {
            start_time: 0,
            numerator,
            denominator,
            width: 0,
        };
        symbol.width = symbol.min_width();
        symbol
    }

    pub fn min_width(&self) -> i32 {
        2 * NOTE_WIDTH
    }
}

/// An invisible spacer, inserted where other tracks have a symbol at a
/// start time this track does not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlankSymbol {
    pub start_time: u32,
    pub width: i32,
}

impl BlankSymbol {
    pub fn new(start_time: u32, width: i32) -> BlankSymbol {
        BlankSymbol { start_time, width }
    }

    pub fn min_width(&self) -> i32 {
        0
    }
}

/// A sharp, flat, or natural in front of a note (or in the key
/// signature at the left of a staff).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccidSymbol {
    pub accid: Accid,
    /// The white note the symbol sits on
    pub note: WhiteNote,
    pub clef: Clef,
    pub width: i32,
}

impl AccidSymbol {
    pub fn new(accid: Accid, note: WhiteNote, clef: Clef) -> AccidSymbol {
        let mut symbol = AccidSymbol {
            accid,
            note,
            clef,
            width: 0,
        };
        symbol.width = symbol.min_width();
        symbol
    }

    pub fn min_width(&self) -> i32 {
        3 * NOTE_HEIGHT / 2
    }

    pub fn above_staff(&self) -> i32 {
        let dist = self.note.dist(self.clef.top()) * NOTE_HEIGHT / 2;
        // The symbol is drawn two notes tall around its position.
        (dist + NOTE_HEIGHT).max(0)
    }

    pub fn below_staff(&self) -> i32 {
        let dist = self.clef.bottom().dist(self.note) * NOTE_HEIGHT / 2;
        (dist + NOTE_HEIGHT).max(0)
    }
}

/// A lyric syllable positioned under a staff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LyricSymbol {
    pub start_time: u32,
    pub text: String,
    /// Horizontal position within the staff
    pub x: i32,
}

impl LyricSymbol {
    pub fn new(start_time: u32, text: String) -> LyricSymbol {
        LyricSymbol {
            start_time,
            text,
            x: 0,
        }
    }

    pub fn min_width(&self) -> i32 {
        // Approximate text advance; the renderer measures exactly.
        NOTE_WIDTH * self.text.chars().count() as i32
    }
}
