//! Note stems, including the beam pairing between chords.

use serde::{Deserialize, Serialize};

use crate::time_signature::NoteDuration;
use crate::white_note::WhiteNote;

/// The direction a stem points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StemDir {
    Up,
    Down,
}

/// Which side of the noteheads the stem sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StemSide {
    Left,
    Right,
}

/// The beam link carried by the first stem of a beamed run: where the
/// run's last stem ends and how many pixels away it is.  A value, not a
/// reference — sibling stems never point at each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeamPair {
    /// The end position of the paired (last) stem
    pub end: WhiteNote,
    /// Horizontal distance to the paired chord, in pixels
    pub width: i32,
}

/// The stem of a chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stem {
    duration: NoteDuration,
    direction: StemDir,
    /// Topmost note in the chord
    top: WhiteNote,
    /// Bottommost note in the chord
    bottom: WhiteNote,
    /// Where the stem ends
    end: WhiteNote,
    /// Whether the chord's noteheads overlap
    notes_overlap: bool,
    side: StemSide,
    /// Present on the first stem of a beamed run
    pair: Option<BeamPair>,
    /// True for the later stems of a beamed run
    receiver: bool,
}

impl Stem {
    pub fn new(
        bottom: WhiteNote,
        top: WhiteNote,
        duration: NoteDuration,
        direction: StemDir,
        notes_overlap: bool,
    ) -> Stem {
        let side = if direction == StemDir::Up || notes_overlap {
            StemSide::Right
        } else {
            StemSide::Left
        };
        let mut stem = Stem {
            duration,
            direction,
            top,
            bottom,
            end: top,
            notes_overlap,
            side,
            pair: None,
            receiver: false,
        };
        stem.end = stem.calculate_end();
        stem
    }

    /// Where the stem should end: six steps past the outer note, with
    /// longer stems for sixteenth and thirty-second flags.
    fn calculate_end(&self) -> WhiteNote {
        let extra = match self.duration {
            NoteDuration::Sixteenth => 2,
            NoteDuration::ThirtySecond => 3,
            _ => 0,
        };
        match self.direction {
            StemDir::Up => self.top.add(6 + extra),
            StemDir::Down => self.bottom.add(-(6 + extra)),
        }
    }

    pub fn duration(&self) -> NoteDuration {
        self.duration
    }

    pub fn direction(&self) -> StemDir {
        self.direction
    }

    /// Change the direction, recalculating the end position.
    pub fn set_direction(&mut self, direction: StemDir) {
        self.direction = direction;
        self.side = if direction == StemDir::Up || self.notes_overlap {
            StemSide::Right
        } else {
            StemSide::Left
        };
        self.end = self.calculate_end();
    }

    pub fn top(&self) -> WhiteNote {
        self.top
    }

    pub fn bottom(&self) -> WhiteNote {
        self.bottom
    }

    pub fn end(&self) -> WhiteNote {
        self.end
    }

    pub fn set_end(&mut self, end: WhiteNote) {
        self.end = end;
    }

    pub fn side(&self) -> StemSide {
        self.side
    }

    pub fn notes_overlap(&self) -> bool {
        self.notes_overlap
    }

    pub fn pair(&self) -> Option<BeamPair> {
        self.pair
    }

    /// Link this stem to the end of its run's last stem.
    pub fn set_pair(&mut self, end: WhiteNote, width: i32) {
        self.pair = Some(BeamPair { end, width });
    }

    /// Update the pixel distance to the paired stem (widths change in
    /// the alignment pass).
    pub fn set_pair_width(&mut self, width: i32) {
        if let Some(pair) = self.pair.as_mut() {
            pair.width = width;
        }
    }

    pub fn receiver(&self) -> bool {
        self.receiver
    }

    pub fn set_receiver(&mut self, receiver: bool) {
        self.receiver = receiver;
    }

    /// Whether this stem takes part in a beam (either end of it).
    pub fn is_beam(&self) -> bool {
        self.receiver || self.pair.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::white_note::Letter;

    #[test]
    fn up_stem_ends_six_steps_above_top() {
        let c4 = WhiteNote::middle_c();
        let stem = Stem::new(c4, c4, NoteDuration::Quarter, StemDir::Up, false);
        assert_eq!(stem.end(), c4.add(6));
    }

    #[test]
    fn down_stem_ends_six_steps_below_bottom() {
        let e4 = WhiteNote::new(Letter::E, 4);
        let g4 = WhiteNote::new(Letter::G, 4);
        let stem = Stem::new(e4, g4, NoteDuration::Eighth, StemDir::Down, false);
        assert_eq!(stem.end(), e4.add(-6));
    }

    #[test]
    fn short_durations_get_longer_stems() {
        let c4 = WhiteNote::middle_c();
        let stem = Stem::new(c4, c4, NoteDuration::Sixteenth, StemDir::Up, false);
        assert_eq!(stem.end(), c4.add(8));
    }

    #[test]
    fn beam_state() {
        let c4 = WhiteNote::middle_c();
        let mut stem = Stem::new(c4, c4, NoteDuration::Eighth, StemDir::Up, false);
        assert!(!stem.is_beam());
        stem.set_pair(c4.add(6), 30);
        assert!(stem.is_beam());
    }
}
