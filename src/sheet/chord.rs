//! Chord symbols: notehead placement, accidentals, stems, and beams.

use serde::{Deserialize, Serialize};

use super::constants::*;
use super::stem::{Stem, StemDir};
use super::symbol::AccidSymbol;
use crate::clef::Clef;
use crate::key_signature::{Accid, AccidState, KeySignature};
use crate::time_signature::{NoteDuration, TimeSignature};
use crate::track::MidiNote;
use crate::white_note::WhiteNote;

/// One note within a chord.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NoteData {
    /// The MIDI note number
    pub number: i32,
    /// The staff position to draw at
    pub white_note: WhiteNote,
    pub duration: NoteDuration,
    /// Whether the notehead sits left of the stem (the normal side)
    pub leftside: bool,
    pub accid: Accid,
}

/// One or more simultaneous notes, drawn as a single stack with up to
/// two stems.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChordSymbol {
    clef: Clef,
    start_time: u32,
    end_time: u32,
    /// The notes, in ascending number order
    notedata: Vec<NoteData>,
    accid_symbols: Vec<AccidSymbol>,
    pub width: i32,
    stem1: Option<Stem>,
    stem2: Option<Stem>,
    has_two_stems: bool,
}

impl ChordSymbol {
    /// Build a chord from notes sharing a start time, in the given key,
    /// time signature, and clef.  `state` carries the accidental
    /// overrides of the current measure.
    pub fn new(
        notes: &[MidiNote],
        key: &KeySignature,
        state: &mut AccidState,
        time: &TimeSignature,
        clef: Clef,
    ) -> ChordSymbol {
        let start_time = notes.first().map(|n| n.start_time).unwrap_or(0);
        let end_time = notes
            .iter()
            .map(|n| n.end_time())
            .max()
            .unwrap_or(start_time);

        let notedata = create_note_data(notes, key, state, time);
        let accid_symbols = create_accid_symbols(&notedata, clef);

        // A chord whose notes have two different durations splits into
        // a down-stem group (the lower notes) and an up-stem group.
        let len = notedata.len();
        let dur1 = notedata.first().map(|n| n.duration);
        let change = notedata
            .iter()
            .position(|n| Some(n.duration) != dur1)
            .unwrap_or(len);

        let mut stem1 = None;
        let mut stem2 = None;
        let mut has_two_stems = false;

        if let (Some(first), Some(last), Some(dur1)) = (notedata.first(), notedata.last(), dur1) {
            if change < len {
                has_two_stems = true;
                stem1 = make_stem(
                    first.white_note,
                    notedata[change - 1].white_note,
                    dur1,
                    StemDir::Down,
                    notes_overlap(&notedata[..change]),
                );
                stem2 = make_stem(
                    notedata[change].white_note,
                    last.white_note,
                    notedata[change].duration,
                    StemDir::Up,
                    notes_overlap(&notedata[change..]),
                );
            } else {
                let direction = stem_direction(first.white_note, last.white_note, clef);
                stem1 = make_stem(
                    first.white_note,
                    last.white_note,
                    dur1,
                    direction,
                    notes_overlap(&notedata),
                );
            }
        }

        let mut chord = ChordSymbol {
            clef,
            start_time,
            end_time,
            notedata,
            accid_symbols,
            width: 0,
            stem1,
            stem2,
            has_two_stems,
        };
        chord.width = chord.min_width();
        chord
    }

    pub fn start_time(&self) -> u32 {
        self.start_time
    }

    /// The start time plus the longest note duration.
    pub fn end_time(&self) -> u32 {
        self.end_time
    }

    pub fn clef(&self) -> Clef {
        self.clef
    }

    pub fn notes(&self) -> &[NoteData] {
        &self.notedata
    }

    pub fn accid_symbols(&self) -> &[AccidSymbol] {
        &self.accid_symbols
    }

    pub fn has_two_stems(&self) -> bool {
        self.has_two_stems
    }

    /// The principal stem (the beam-carrying one), if any.
    pub fn stem(&self) -> Option<&Stem> {
        self.stem1.as_ref()
    }

    pub fn stem_mut(&mut self) -> Option<&mut Stem> {
        self.stem1.as_mut()
    }

    pub fn second_stem(&self) -> Option<&Stem> {
        self.stem2.as_ref()
    }

    pub fn min_width(&self) -> i32 {
        let accid_width: i32 = self.accid_symbols.iter().map(|a| a.min_width()).sum();
        2 * NOTE_HEIGHT + NOTE_HEIGHT * 3 / 4 + accid_width
    }

    pub fn above_staff(&self) -> i32 {
        let mut top = match self.notedata.last() {
            Some(n) => n.white_note,
            None => return 0,
        };
        if let Some(stem) = &self.stem1 {
            top = WhiteNote::max(top, stem.end());
        }
        if let Some(stem) = &self.stem2 {
            top = WhiteNote::max(top, stem.end());
        }
        let mut result = (top.dist(self.clef.top()) * NOTE_HEIGHT / 2).max(0);
        for accid in &self.accid_symbols {
            result = result.max(accid.above_staff());
        }
        result
    }

    pub fn below_staff(&self) -> i32 {
        let mut bottom = match self.notedata.first() {
            Some(n) => n.white_note,
            None => return 0,
        };
        if let Some(stem) = &self.stem1 {
            bottom = WhiteNote::min(bottom, stem.end());
        }
        if let Some(stem) = &self.stem2 {
            bottom = WhiteNote::min(bottom, stem.end());
        }
        let mut result = (self.clef.bottom().dist(bottom) * NOTE_HEIGHT / 2).max(0);
        for accid in &self.accid_symbols {
            result = result.max(accid.below_staff());
        }
        result
    }
}

/// Whole notes carry no stem at all.
fn make_stem(
    bottom: WhiteNote,
    top: WhiteNote,
    duration: NoteDuration,
    direction: StemDir,
    overlap: bool,
) -> Option<Stem> {
    if duration == NoteDuration::Whole {
        None
    } else {
        Some(Stem::new(bottom, top, duration, direction, overlap))
    }
}

/// Per-note data in ascending number order, with notehead sides chosen
/// so adjacent staff positions do not collide: the lower of such a pair
/// stays on the normal (left) side, the upper moves across the stem.
fn create_note_data(
    notes: &[MidiNote],
    key: &KeySignature,
    state: &mut AccidState,
    time: &TimeSignature,
) -> Vec<NoteData> {
    let mut notedata: Vec<NoteData> = notes
        .iter()
        .map(|note| NoteData {
            number: note.number,
            white_note: key.get_white_note(note.number),
            duration: time.get_note_duration(note.duration),
            leftside: true,
            accid: key.get_accidental(state, note.number, time.get_measure(note.start_time)),
        })
        .collect();
    notedata.sort_by_key(|n| n.number);

    for i in 1..notedata.len() {
        let dist = notedata[i].white_note.dist(notedata[i - 1].white_note);
        if dist <= 1 {
            notedata[i].leftside = !notedata[i - 1].leftside;
        } else {
            notedata[i].leftside = true;
        }
    }
    notedata
}

/// Whether any note in the group was pushed to the far side of the stem.
fn notes_overlap(notedata: &[NoteData]) -> bool {
    notedata.iter().any(|n| !n.leftside)
}

/// One accidental symbol per altered note, de-duplicated per staff
/// position within the chord.
fn create_accid_symbols(notedata: &[NoteData], clef: Clef) -> Vec<AccidSymbol> {
    let mut symbols: Vec<AccidSymbol> = Vec::new();
    for note in notedata {
        if note.accid == Accid::None {
            continue;
        }
        if symbols.iter().any(|s| s.note == note.white_note) {
            continue;
        }
        symbols.push(AccidSymbol::new(note.accid, note.white_note, clef));
    }
    symbols
}

/// The stem direction for notes spanning `bottom..top` in a clef: Down
/// when their average position is at or above the middle line, else Up.
pub fn stem_direction(bottom: WhiteNote, top: WhiteNote, clef: Clef) -> StemDir {
    let middle = clef.middle_line();
    let dist = middle.dist(bottom) + middle.dist(top);
    if dist > 0 {
        StemDir::Up
    } else {
        StemDir::Down
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Beams
// ═══════════════════════════════════════════════════════════════════════

/// Whether `chords` may be joined under one horizontal beam.
///
/// All chords must sit in one measure, carry stems of the same beamable
/// duration (a dotted-eighth/sixteenth pair is the one mixed case), and
/// not already belong to a beam.  The run length decides the grid the
/// run must start on: triplets and 12/8 eighths in threes, 3/4 and
/// compound-time eighths in sixes, sixteenths and thirty-seconds in
/// fours on their beat, and anything else in pairs — on a quarter-note
/// beat when `on_beat` is set.
pub fn can_create_beams(chords: &[&ChordSymbol], time: &TimeSignature, on_beat: bool) -> bool {
    let num_chords = chords.len();
    let (Some(first), Some(last)) = (chords.first(), chords.last()) else {
        return false;
    };
    let (Some(first_stem), Some(last_stem)) = (first.stem(), last.stem()) else {
        return false;
    };

    let measure = time.get_measure(first.start_time());
    let dur = first_stem.duration();
    let dur2 = last_stem.duration();
    let dotted8_to_16 = num_chords == 2
        && dur == NoteDuration::DottedEighth
        && dur2 == NoteDuration::Sixteenth;

    let beamable = matches!(
        dur,
        NoteDuration::ThirtySecond
            | NoteDuration::Sixteenth
            | NoteDuration::Triplet
            | NoteDuration::Eighth
    ) || dotted8_to_16;
    if !beamable {
        return false;
    }

    let quarter = time.quarter();
    let start = first.start_time();
    let numer = time.numerator();
    let denom = time.denominator();

    match num_chords {
        6 => {
            if dur != NoteDuration::Eighth {
                return false;
            }
            let correct_time =
                matches!((numer, denom), (3, 4) | (6, 8) | (6, 4));
            if !correct_time {
                return false;
            }
            let beat = if (numer, denom) == (6, 4) {
                quarter * 3
            } else {
                time.measure()
            };
            if start % beat > quarter / 6 {
                return false;
            }
        }
        4 => {
            if (numer, denom) == (3, 8) {
                return false;
            }
            let correct_time = matches!(numer, 2 | 4 | 8);
            if !correct_time && dur != NoteDuration::Sixteenth {
                return false;
            }
            // Plain eighths beam in pairs, not fours.
            if dur == NoteDuration::Eighth {
                return false;
            }
            let beat = if dur == NoteDuration::ThirtySecond {
                quarter / 2
            } else {
                quarter
            };
            if start % beat > quarter / 6 {
                return false;
            }
        }
        3 => {
            let valid = dur == NoteDuration::Triplet
                || (dur == NoteDuration::Eighth && (numer, denom) == (12, 8));
            if !valid {
                return false;
            }
            let beat = if (numer, denom) == (12, 8) {
                quarter * 3 / 2
            } else {
                quarter
            };
            if start % beat > quarter / 6 {
                return false;
            }
        }
        2 => {
            if on_beat && start % quarter > quarter / 6 {
                return false;
            }
        }
        _ => return false,
    }

    for chord in chords {
        if time.get_measure(chord.start_time()) != measure {
            return false;
        }
        let Some(stem) = chord.stem() else {
            return false;
        };
        if stem.duration() != dur && !dotted8_to_16 {
            return false;
        }
        if stem.is_beam() {
            return false;
        }
    }

    // Chords with two stems force the beam direction; two such chords
    // must agree.
    let mut forced: Option<StemDir> = None;
    for chord in chords {
        if chord.has_two_stems() {
            let direction = chord.stem().map(|s| s.direction());
            if forced.is_some() && forced != direction {
                return false;
            }
            forced = direction;
        }
    }
    true
}

/// Join the stems of a chord run under one beam.
///
/// All stems take a single direction — `forced_direction` when a
/// two-stem chord in the run dictates it, otherwise the outer notes
/// decide — the stem ends are straightened, and the first stem is
/// paired to the last with the given horizontal spacing.  The remaining
/// stems become receivers.
pub fn create_beam(
    stems: &mut [Stem],
    start_times: &[u32],
    clef: Clef,
    spacing: i32,
    forced_direction: Option<StemDir>,
) {
    let len = stems.len();
    if len < 2 {
        return;
    }

    let new_direction = forced_direction.unwrap_or_else(|| {
        let first = &stems[0];
        let last = &stems[len - 1];
        let note1 = if first.direction() == StemDir::Up {
            first.top()
        } else {
            first.bottom()
        };
        let note2 = if last.direction() == StemDir::Up {
            last.top()
        } else {
            last.bottom()
        };
        stem_direction(WhiteNote::min(note1, note2), WhiteNote::max(note1, note2), clef)
    });

    for stem in stems.iter_mut() {
        stem.set_direction(new_direction);
    }

    if len == 2 {
        line_up_stem_ends(stems);
    } else {
        bring_stems_closer(stems, start_times);
    }

    let last_end = stems[len - 1].end();
    stems[0].set_pair(last_end, spacing);
    for stem in stems[1..].iter_mut() {
        stem.set_receiver(true);
    }
}

/// Align the end heights of exactly two beamed stems, halving the gap
/// toward the outer one.
fn line_up_stem_ends(stems: &mut [Stem]) {
    let (first, last) = (stems[0], stems[1]);

    let mut first_end = first.end();
    let mut last_end = last.end();

    // A dotted eighth beamed to a sixteenth gets a longer first stem so
    // the partial beam fits.
    if first.duration() == NoteDuration::DottedEighth
        && last.duration() == NoteDuration::Sixteenth
    {
        first_end = if first.direction() == StemDir::Up {
            first_end.add(2)
        } else {
            first_end.add(-2)
        };
    }

    let distance = first_end.dist(last_end).abs();
    if first.direction() == StemDir::Up {
        if WhiteNote::max(first_end, last_end) == first_end {
            last_end = last_end.add(distance / 2);
        } else {
            first_end = first_end.add(distance / 2);
        }
    } else if WhiteNote::min(first_end, last_end) == first_end {
        last_end = last_end.add(-(distance / 2));
    } else {
        first_end = first_end.add(-(distance / 2));
    }

    stems[0].set_end(first_end);
    stems[1].set_end(last_end);
}

/// Straighten a longer beamed run: cap the slant between the outer
/// stems at two staff steps, then interpolate every intermediate stem
/// end linearly between them by time position.
fn bring_stems_closer(stems: &mut [Stem], start_times: &[u32]) {
    let len = stems.len();
    let up = stems[0].direction() == StemDir::Up;

    // The beam must clear the tallest (or deepest) natural stem end.
    let extreme = stems
        .iter()
        .map(|s| s.end())
        .reduce(|a, b| if up { WhiteNote::max(a, b) } else { WhiteNote::min(a, b) })
        .unwrap();

    let mut first_end = stems[0].end();
    let mut last_end = stems[len - 1].end();
    let toward = |note: WhiteNote, steps: i32| if up { note.add(-steps) } else { note.add(steps) };

    if extreme == first_end && extreme.dist(last_end).abs() >= 2 {
        last_end = toward(extreme, 2);
    } else if extreme == last_end && extreme.dist(first_end).abs() >= 2 {
        first_end = toward(extreme, 2);
    } else {
        first_end = extreme;
        last_end = extreme;
    }
    stems[0].set_end(first_end);
    stems[len - 1].set_end(last_end);

    // Intermediate ends sit on the straight line between the outer
    // ends, proportional to their time position.
    let total_steps = last_end.dist(first_end);
    let t0 = start_times[0] as i64;
    let span = (start_times[len - 1] as i64 - t0).max(1);
    for i in 1..len - 1 {
        let fraction = (start_times[i] as i64 - t0) as f64 / span as f64;
        let steps = (f64::from(total_steps) * fraction).round() as i32;
        stems[i].set_end(first_end.add(steps));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chord_at(start: u32, duration: u32, numbers: &[i32], time: &TimeSignature) -> ChordSymbol {
        let key = KeySignature::new(0, 0);
        let mut state = AccidState::new();
        let notes: Vec<MidiNote> = numbers
            .iter()
            .map(|&number| MidiNote {
                start_time: start,
                duration,
                channel: 0,
                number,
            })
            .collect();
        ChordSymbol::new(&notes, &key, &mut state, time, Clef::Treble)
    }

    #[test]
    fn single_note_chord_has_one_stem() {
        let time = TimeSignature::default();
        let chord = chord_at(0, 480, &[60], &time);
        assert_eq!(chord.notes().len(), 1);
        assert!(chord.stem().is_some());
        assert!(!chord.has_two_stems());
        assert_eq!(chord.end_time(), 480);
    }

    #[test]
    fn whole_note_has_no_stem() {
        let time = TimeSignature::default();
        let chord = chord_at(0, 1920, &[60], &time);
        assert!(chord.stem().is_none());
    }

    #[test]
    fn low_notes_stem_up_high_notes_stem_down() {
        let time = TimeSignature::default();
        let low = chord_at(0, 480, &[60], &time);
        assert_eq!(low.stem().unwrap().direction(), StemDir::Up);
        let high = chord_at(0, 480, &[79], &time); // G5
        assert_eq!(high.stem().unwrap().direction(), StemDir::Down);
        // B4 sits exactly on the treble middle line: stem down.
        let middle = chord_at(0, 480, &[71], &time);
        assert_eq!(middle.stem().unwrap().direction(), StemDir::Down);
    }

    #[test]
    fn adjacent_notes_split_sides() {
        let time = TimeSignature::default();
        let chord = chord_at(0, 480, &[60, 62], &time);
        assert!(chord.notes()[0].leftside);
        assert!(!chord.notes()[1].leftside);
        assert!(chord.stem().unwrap().notes_overlap());
    }

    #[test]
    fn accidental_creates_one_symbol() {
        let time = TimeSignature::default();
        let chord = chord_at(0, 480, &[61], &time);
        assert_eq!(chord.accid_symbols().len(), 1);
        assert_eq!(chord.accid_symbols()[0].accid, Accid::Sharp);
    }

    #[test]
    fn eighth_note_fours_are_rejected_in_favor_of_pairs() {
        // Eighth-note runs of four must be rejected so the pipeline's
        // pair pass picks them up.
        let time = TimeSignature::default();
        let chords: Vec<ChordSymbol> = (0..4)
            .map(|i| chord_at(i * 240, 240, &[72], &time))
            .collect();
        let refs: Vec<&ChordSymbol> = chords.iter().collect();
        assert!(!can_create_beams(&refs, &time, true));
        assert!(can_create_beams(&refs[..2], &time, true));
    }

    #[test]
    fn four_sixteenths_on_beat_can_beam() {
        let time = TimeSignature::default();
        let chords: Vec<ChordSymbol> = (0..4)
            .map(|i| chord_at(i * 120, 120, &[72], &time))
            .collect();
        let refs: Vec<&ChordSymbol> = chords.iter().collect();
        assert!(can_create_beams(&refs, &time, true));
    }

    #[test]
    fn beam_rejected_across_measure_boundary() {
        let time = TimeSignature::default();
        // Last eighth of one measure plus first of the next.
        let chords = vec![
            chord_at(1680, 240, &[72], &time),
            chord_at(1920, 240, &[72], &time),
        ];
        let refs: Vec<&ChordSymbol> = chords.iter().collect();
        assert!(!can_create_beams(&refs, &time, false));
    }

    #[test]
    fn quarter_notes_never_beam() {
        let time = TimeSignature::default();
        let chords = vec![chord_at(0, 480, &[72], &time), chord_at(480, 480, &[72], &time)];
        let refs: Vec<&ChordSymbol> = chords.iter().collect();
        assert!(!can_create_beams(&refs, &time, true));
    }

    #[test]
    fn create_beam_links_first_to_last() {
        let time = TimeSignature::default();
        let chords: Vec<ChordSymbol> = (0..2)
            .map(|i| chord_at(i * 240, 240, &[72, 74 + 2 * i as i32], &time))
            .collect();
        let mut stems: Vec<Stem> = chords.iter().map(|c| *c.stem().unwrap()).collect();
        let starts: Vec<u32> = chords.iter().map(|c| c.start_time()).collect();
        create_beam(&mut stems, &starts, Clef::Treble, 30, None);

        assert!(stems[0].pair().is_some());
        assert!(!stems[0].receiver());
        assert!(stems[1].receiver());
        assert_eq!(stems[0].pair().unwrap().width, 30);
        // All stems agree on direction after beaming.
        assert_eq!(stems[0].direction(), stems[1].direction());
    }

    #[test]
    fn long_beam_ends_form_a_line() {
        let time = TimeSignature::default();
        let chords: Vec<ChordSymbol> = (0..4)
            .map(|i| chord_at(i * 120, 120, &[72], &time))
            .collect();
        let mut stems: Vec<Stem> = chords.iter().map(|c| *c.stem().unwrap()).collect();
        let starts: Vec<u32> = chords.iter().map(|c| c.start_time()).collect();
        create_beam(&mut stems, &starts, Clef::Treble, 60, None);

        // Equal notes: the beam is horizontal, every end equal.
        let end = stems[0].end();
        assert!(stems.iter().all(|s| s.end() == end));
    }
}
