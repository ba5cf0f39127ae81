//! Clef assignment: one clef per measure, smoothed from pitch averages.

use serde::{Deserialize, Serialize};

use crate::track::MidiNote;
use crate::white_note::WhiteNote;

/// The clefs a staff can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Clef {
    Treble,
    Bass,
}

impl Clef {
    /// The staff position of the clef's middle line, used by the stem
    /// direction rule.
    pub fn middle_line(self) -> WhiteNote {
        match self {
            Clef::Treble => WhiteNote::new(crate::white_note::Letter::B, 4),
            Clef::Bass => WhiteNote::new(crate::white_note::Letter::D, 3),
        }
    }

    /// Top line of the staff in this clef.
    pub fn top(self) -> WhiteNote {
        match self {
            Clef::Treble => WhiteNote::top_treble(),
            Clef::Bass => WhiteNote::top_bass(),
        }
    }

    /// Bottom line of the staff in this clef.
    pub fn bottom(self) -> WhiteNote {
        match self {
            Clef::Treble => WhiteNote::bottom_treble(),
            Clef::Bass => WhiteNote::bottom_bass(),
        }
    }
}

/// The clef assigned to each measure of one track.
///
/// A measure whose average pitch sits clearly in the treble range gets
/// the treble clef, clearly in the bass range the bass clef.  Averages
/// in the overlap band, and empty measures, reuse the surrounding
/// context (the track's main clef, or the previous measure) so the
/// clef does not flip on every measure.
#[derive(Debug, Clone)]
pub struct ClefMeasures {
    clefs: Vec<Clef>,
    /// The length of a measure, in pulses
    measure: u32,
}

impl ClefMeasures {
    /// Compute the clef for each measure from the notes of one track.
    pub fn new(notes: &[MidiNote], measure_len: u32) -> ClefMeasures {
        let main_clef = ClefMeasures::main_clef(notes);
        let mut clefs = Vec::new();
        let mut clef = main_clef;
        let mut pos = 0;
        let mut next_measure = measure_len;

        while pos < notes.len() {
            // Sum the notes in the current measure
            let mut sum: i64 = 0;
            let mut count: i64 = 0;
            while pos < notes.len() && notes[pos].start_time < next_measure {
                sum += i64::from(notes[pos].number);
                count += 1;
                pos += 1;
            }

            if count > 0 {
                let avg = sum / count;
                if avg >= i64::from(WhiteNote::bottom_treble().number()) {
                    clef = Clef::Treble;
                } else if avg <= i64::from(WhiteNote::top_bass().number()) {
                    clef = Clef::Bass;
                } else {
                    // Overlap band between the staves: stick with the
                    // track's dominant clef.
                    clef = main_clef;
                }
            }
            clefs.push(clef);
            next_measure += measure_len;
        }
        clefs.push(clef);

        ClefMeasures {
            clefs,
            measure: measure_len,
        }
    }

    /// One dominant clef for the whole track, from the overall average
    /// pitch against middle C.
    pub fn main_clef(notes: &[MidiNote]) -> Clef {
        if notes.is_empty() {
            return Clef::Treble;
        }
        let total: i64 = notes.iter().map(|n| i64::from(n.number)).sum();
        if total / notes.len() as i64 >= i64::from(WhiteNote::middle_c().number()) {
            Clef::Treble
        } else {
            Clef::Bass
        }
    }

    /// The clef for the measure containing `start_time`.  Times past the
    /// last computed measure use the final clef.
    pub fn get(&self, start_time: u32) -> Clef {
        let index = (start_time / self.measure) as usize;
        if index >= self.clefs.len() {
            *self.clefs.last().unwrap_or(&Clef::Treble)
        } else {
            self.clefs[index]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(start: u32, number: i32) -> MidiNote {
        MidiNote {
            start_time: start,
            duration: 120,
            channel: 0,
            number,
        }
    }

    #[test]
    fn high_notes_get_treble_low_notes_get_bass() {
        let notes = vec![note(0, 72), note(100, 76), note(2000, 40), note(2100, 43)];
        let clefs = ClefMeasures::new(&notes, 1920);
        assert_eq!(clefs.get(0), Clef::Treble);
        assert_eq!(clefs.get(2000), Clef::Bass);
    }

    #[test]
    fn empty_measure_keeps_previous_clef() {
        let notes = vec![note(0, 45), note(100, 40), note(4000, 41)];
        let clefs = ClefMeasures::new(&notes, 1920);
        assert_eq!(clefs.get(0), Clef::Bass);
        // Measure 1 has no notes: inherits bass.
        assert_eq!(clefs.get(2000), Clef::Bass);
    }

    #[test]
    fn overlap_band_uses_main_clef() {
        // Averages near middle C, but the track overall is treble-heavy.
        let notes = vec![note(0, 80), note(10, 84), note(2000, 60)];
        let clefs = ClefMeasures::new(&notes, 1920);
        assert_eq!(ClefMeasures::main_clef(&notes), Clef::Treble);
        assert_eq!(clefs.get(2000), Clef::Treble);
    }

    #[test]
    fn query_past_end_clamps_to_last_measure() {
        let notes = vec![note(0, 72)];
        let clefs = ClefMeasures::new(&notes, 1920);
        assert_eq!(clefs.get(1_000_000), Clef::Treble);
    }
}
