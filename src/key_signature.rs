//! Key signatures: accidental bookkeeping and pitch spelling.
//!
//! A key signature is immutable.  The transient per-measure accidental
//! overrides (a sharp shown once holds for the rest of its measure) live
//! in an explicit [`AccidState`] threaded through
//! [`KeySignature::get_accidental`], so chord construction stays
//! reproducible and independent per track.

use serde::{Deserialize, Serialize};

use crate::white_note::{Letter, WhiteNote};

/// An accidental attached to a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Accid {
    None,
    Sharp,
    Flat,
    Natural,
}

/// Sharps in signature order, as (pitch class, naturalized pitch class):
/// F#, C#, G#, D#, A#, E#.
const SHARP_ORDER: [(usize, usize); 6] = [(6, 5), (1, 0), (8, 7), (3, 2), (10, 9), (5, 4)];

/// Flats in signature order: Bb, Eb, Ab, Db, Gb, Cb.
const FLAT_ORDER: [(usize, usize); 6] = [(10, 11), (3, 4), (8, 9), (1, 2), (6, 7), (11, 0)];

/// Letters of the sharp signature symbols, top-of-staff positions in
/// the treble clef.  Bass positions are the same letters 14 steps down.
const SHARP_POSITIONS: [(Letter, i32); 6] = [
    (Letter::F, 5),
    (Letter::C, 5),
    (Letter::G, 5),
    (Letter::D, 5),
    (Letter::A, 4),
    (Letter::E, 5),
];

const FLAT_POSITIONS: [(Letter, i32); 6] = [
    (Letter::B, 4),
    (Letter::E, 5),
    (Letter::A, 4),
    (Letter::D, 5),
    (Letter::G, 4),
    (Letter::C, 5),
];

/// A major key: 0-6 sharps or 0-6 flats (never both).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySignature {
    num_sharps: u32,
    num_flats: u32,
    /// Accidental needed to display each pitch class (C = 0) in this key
    keymap: [Accid; 12],
    /// Letter each pitch class is spelled with in this key
    letters: [Letter; 12],
}

impl KeySignature {
    /// Create a key signature with the given number of sharps or flats.
    /// One of the two must be zero; both are clamped to 6.
    pub fn new(sharps: u32, flats: u32) -> KeySignature {
        let num_sharps = if flats > 0 { 0 } else { sharps.min(6) };
        let num_flats = flats.min(6);
        let (keymap, letters) = build_maps(num_sharps, num_flats);
        KeySignature {
            num_sharps,
            num_flats,
            keymap,
            letters,
        }
    }

    /// Create a key signature from the pitch class of its major tonic
    /// (C = 0 .. B = 11).
    pub fn from_notescale(notescale: i32) -> KeySignature {
        // (sharps, flats) per tonic: C Db D Eb E F F# G Ab A Bb B
        const KEYS: [(u32, u32); 12] = [
            (0, 0),
            (0, 5),
            (2, 0),
            (0, 3),
            (4, 0),
            (0, 1),
            (6, 0),
            (1, 0),
            (0, 4),
            (3, 0),
            (0, 2),
            (5, 0),
        ];
        let (sharps, flats) = KEYS[notescale.rem_euclid(12) as usize];
        KeySignature::new(sharps, flats)
    }

    /// Guess the key from a list of MIDI note numbers: count, for each
    /// candidate key, the notes that would need an accidental symbol;
    /// the fewest wins.  Sharp keys are scanned first, so a tie prefers
    /// sharps.
    pub fn guess(notes: &[i32]) -> KeySignature {
        let mut notecount = [0u32; 12];
        for &n in notes {
            notecount[n.rem_euclid(12) as usize] += 1;
        }

        let mut best = (0u32, 0u32);
        let mut smallest = u32::MAX;
        for sharps in 0..7 {
            let (keymap, _) = build_maps(sharps, 0);
            let accids: u32 = (0..12)
                .filter(|&pc| keymap[pc] != Accid::None)
                .map(|pc| notecount[pc])
                .sum();
            if accids < smallest {
                smallest = accids;
                best = (sharps, 0);
            }
        }
        for flats in 1..7 {
            let (keymap, _) = build_maps(0, flats);
            let accids: u32 = (0..12)
                .filter(|&pc| keymap[pc] != Accid::None)
                .map(|pc| notecount[pc])
                .sum();
            if accids < smallest {
                smallest = accids;
                best = (0, flats);
            }
        }
        KeySignature::new(best.0, best.1)
    }

    pub fn num_sharps(&self) -> u32 {
        self.num_sharps
    }

    pub fn num_flats(&self) -> u32 {
        self.num_flats
    }

    /// The accidental the key itself assigns to a pitch class.
    pub fn default_accidental(&self, notenumber: i32) -> Accid {
        self.keymap[notenumber.rem_euclid(12) as usize]
    }

    /// The accidental to draw for `notenumber` in `measure`, honoring
    /// accidentals already shown earlier in the same measure.  `state`
    /// is reset whenever the measure changes: accidentals never leak
    /// into the following measure.
    pub fn get_accidental(&self, state: &mut AccidState, notenumber: i32, measure: u32) -> Accid {
        if state.measure != Some(measure) {
            state.keymap = None;
            state.measure = Some(measure);
        }
        let keymap = state
            .keymap
            .get_or_insert_with(|| std::array::from_fn(|n| self.default_accidental(n as i32)));

        let index = notenumber.rem_euclid(128) as usize;
        let result = keymap[index];
        match result {
            Accid::Sharp | Accid::Flat => {
                // Shown once; later occurrences in this measure are bare.
                keymap[index] = Accid::None;
            }
            Accid::Natural => {
                keymap[index] = Accid::None;
                // The key's altered neighbor needs its accidental again
                // if it occurs later in this measure.
                if self.num_flats > 0 {
                    if index > 0 {
                        keymap[index - 1] = Accid::Flat;
                    }
                } else if index + 1 < 128 {
                    keymap[index + 1] = Accid::Sharp;
                }
            }
            Accid::None => {}
        }
        result
    }

    /// The staff position a MIDI note number is spelled at in this key.
    /// Sharp keys spell black keys upward from the letter below, flat
    /// keys downward from the letter above; spellings never mix.
    pub fn get_white_note(&self, notenumber: i32) -> WhiteNote {
        let pc = notenumber.rem_euclid(12) as usize;
        let letter = self.letters[pc];
        let mut octave = notenumber.div_euclid(12) - 1;
        // Cb is spelled in the octave above its sounding pitch.
        if pc == 11 && letter == Letter::C {
            octave += 1;
        }
        WhiteNote::new(letter, octave)
    }

    /// The accidental symbols that draw this signature at the left of a
    /// staff, in signature order, positioned for the given clef.
    pub fn symbol_positions(&self, clef: crate::clef::Clef) -> Vec<(Accid, WhiteNote)> {
        let (accid, positions, count) = if self.num_flats > 0 {
            (Accid::Flat, &FLAT_POSITIONS, self.num_flats as usize)
        } else {
            (Accid::Sharp, &SHARP_POSITIONS, self.num_sharps as usize)
        };
        positions[..count]
            .iter()
            .map(|&(letter, octave)| {
                let note = WhiteNote::new(letter, octave);
                let note = match clef {
                    crate::clef::Clef::Treble => note,
                    crate::clef::Clef::Bass => note.add(-14),
                };
                (accid, note)
            })
            .collect()
    }

    /// Human-readable key name, e.g. "G major".
    pub fn to_name(&self) -> &'static str {
        const SHARP_NAMES: [&str; 7] = [
            "C major", "G major", "D major", "A major", "E major", "B major", "F# major",
        ];
        const FLAT_NAMES: [&str; 7] = [
            "C major", "F major", "Bb major", "Eb major", "Ab major", "Db major", "Gb major",
        ];
        if self.num_flats > 0 {
            FLAT_NAMES[self.num_flats as usize]
        } else {
            SHARP_NAMES[self.num_sharps as usize]
        }
    }
}

impl Default for KeySignature {
    fn default() -> Self {
        KeySignature::new(0, 0)
    }
}

/// Transient accidental overrides for one track's current measure.
#[derive(Debug, Clone, Default)]
pub struct AccidState {
    measure: Option<u32>,
    keymap: Option<[Accid; 128]>,
}

impl AccidState {
    pub fn new() -> AccidState {
        AccidState::default()
    }
}

/// Build the per-pitch-class accidental and spelling maps for a key.
fn build_maps(num_sharps: u32, num_flats: u32) -> ([Accid; 12], [Letter; 12]) {
    const WHITE: [Option<Letter>; 12] = [
        Some(Letter::C),
        None,
        Some(Letter::D),
        None,
        Some(Letter::E),
        Some(Letter::F),
        None,
        Some(Letter::G),
        None,
        Some(Letter::A),
        None,
        Some(Letter::B),
    ];

    let mut keymap = [Accid::None; 12];
    let mut letters = [Letter::C; 12];
    let flat_key = num_flats > 0;

    for pc in 0..12 {
        match WHITE[pc] {
            Some(letter) => {
                letters[pc] = letter;
            }
            None => {
                if flat_key {
                    // Spell downward: C# shown as Db.
                    keymap[pc] = Accid::Flat;
                    letters[pc] = WHITE[(pc + 1) % 12].unwrap();
                } else {
                    keymap[pc] = Accid::Sharp;
                    letters[pc] = WHITE[pc - 1].unwrap();
                }
            }
        }
    }

    let order = if flat_key { &FLAT_ORDER } else { &SHARP_ORDER };
    let count = if flat_key { num_flats } else { num_sharps } as usize;
    for &(in_key, naturalized) in &order[..count] {
        // The altered note is in the key: no symbol needed, while its
        // naturalized white neighbor now requires a natural sign.
        keymap[in_key] = Accid::None;
        keymap[naturalized] = Accid::Natural;
        // The sixth entry respells a white key (E# in F# major, Cb in
        // Gb major).
        if WHITE[in_key].is_some() {
            let neighbor = if flat_key { in_key + 1 } else { in_key + 11 };
            letters[in_key] = WHITE[neighbor % 12].unwrap();
        }
    }

    (keymap, letters)
}
