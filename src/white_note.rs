//! White notes: the seven letter names and their vertical staff order.
//!
//! A `WhiteNote` is a position on the staff, independent of any
//! accidental.  Positions are totally ordered; one step is one
//! line-or-space on the staff.

use serde::{Deserialize, Serialize};

/// The note letters, ordered within an octave (octaves change at C).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    fn from_index(index: i32) -> Letter {
        match index.rem_euclid(7) {
            0 => Letter::C,
            1 => Letter::D,
            2 => Letter::E,
            3 => Letter::F,
            4 => Letter::G,
            5 => Letter::A,
            6 => Letter::B,
            _ => unreachable!(),
        }
    }

    fn index(self) -> i32 {
        self as i32
    }

    /// Semitones above C within one octave.
    fn semitones(self) -> i32 {
        match self {
            Letter::C => 0,
            Letter::D => 2,
            Letter::E => 4,
            Letter::F => 5,
            Letter::G => 7,
            Letter::A => 9,
            Letter::B => 11,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Letter::C => "C",
            Letter::D => "D",
            Letter::E => "E",
            Letter::F => "F",
            Letter::G => "G",
            Letter::A => "A",
            Letter::B => "B",
        }
    }
}

/// A staff position: letter plus octave (scientific numbering, middle C
/// is C4 = MIDI note 60).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhiteNote {
    pub letter: Letter,
    pub octave: i32,
}

impl WhiteNote {
    pub fn new(letter: Letter, octave: i32) -> WhiteNote {
        WhiteNote { letter, octave }
    }

    /// Top line of the treble staff.
    pub fn top_treble() -> WhiteNote {
        WhiteNote::new(Letter::F, 5)
    }

    /// Bottom line of the treble staff.
    pub fn bottom_treble() -> WhiteNote {
        WhiteNote::new(Letter::E, 4)
    }

    /// Top line of the bass staff.
    pub fn top_bass() -> WhiteNote {
        WhiteNote::new(Letter::A, 3)
    }

    /// Bottom line of the bass staff.
    pub fn bottom_bass() -> WhiteNote {
        WhiteNote::new(Letter::G, 2)
    }

    pub fn middle_c() -> WhiteNote {
        WhiteNote::new(Letter::C, 4)
    }

    /// Absolute staff position, one unit per line-or-space.
    fn position(self) -> i32 {
        self.octave * 7 + self.letter.index()
    }

    /// The number of staff steps from `other` up to `self` (negative if
    /// `self` is lower).
    pub fn dist(self, other: WhiteNote) -> i32 {
        self.position() - other.position()
    }

    /// The staff position `steps` above this one.
    pub fn add(self, steps: i32) -> WhiteNote {
        let pos = self.position() + steps;
        WhiteNote::new(Letter::from_index(pos), pos.div_euclid(7))
    }

    /// The MIDI note number of this white note.
    pub fn number(self) -> i32 {
        (self.octave + 1) * 12 + self.letter.semitones()
    }

    pub fn max(x: WhiteNote, y: WhiteNote) -> WhiteNote {
        if x.dist(y) >= 0 {
            x
        } else {
            y
        }
    }

    pub fn min(x: WhiteNote, y: WhiteNote) -> WhiteNote {
        if x.dist(y) <= 0 {
            x
        } else {
            y
        }
    }
}

impl Ord for WhiteNote {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.position().cmp(&other.position())
    }
}

impl PartialOrd for WhiteNote {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for WhiteNote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.letter.name(), self.octave)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_order() {
        let c4 = WhiteNote::middle_c();
        let b3 = WhiteNote::new(Letter::B, 3);
        let d4 = WhiteNote::new(Letter::D, 4);
        assert!(b3 < c4);
        assert!(c4 < d4);
        assert_eq!(c4.dist(b3), 1);
        assert_eq!(d4.dist(b3), 2);
    }

    #[test]
    fn add_crosses_octaves() {
        let b3 = WhiteNote::new(Letter::B, 3);
        assert_eq!(b3.add(1), WhiteNote::middle_c());
        assert_eq!(b3.add(8), WhiteNote::new(Letter::C, 5));
        assert_eq!(WhiteNote::middle_c().add(-1), b3);
    }

    #[test]
    fn midi_numbers() {
        assert_eq!(WhiteNote::middle_c().number(), 60);
        assert_eq!(WhiteNote::new(Letter::A, 4).number(), 69);
        assert_eq!(WhiteNote::bottom_treble().number(), 64);
        assert_eq!(WhiteNote::top_bass().number(), 57);
    }

    #[test]
    fn staff_line_spans() {
        // Both staves span eight steps from bottom line to top line.
        assert_eq!(WhiteNote::top_treble().dist(WhiteNote::bottom_treble()), 8);
        assert_eq!(WhiteNote::top_bass().dist(WhiteNote::bottom_bass()), 8);
    }
}
