//! The sheet-music layout pipeline.
//!
//! Turns reconstructed tracks into positioned symbol staves, strictly
//! in this order: chords, rests, bar lines, clef changes, beams, staff
//! justification, and finally the cross-staff width alignment.  The
//! pipeline never fails: every layout heuristic has a fallback.

mod chord;
mod constants;
mod staff;
mod stem;
mod symbol;
mod widths;

use serde::Serialize;

pub use chord::{can_create_beams, create_beam, stem_direction, ChordSymbol, NoteData};
pub use constants::*;
pub use staff::{key_signature_width, Staff};
pub use stem::{BeamPair, Stem, StemDir, StemSide};
pub use symbol::{
    AccidSymbol, BarSymbol, BlankSymbol, ClefSymbol, LyricSymbol, MusicSymbol, RestSymbol,
    TimeSigSymbol,
};
pub use widths::SymbolWidths;

use crate::clef::ClefMeasures;
use crate::file::MidiFile;
use crate::key_signature::{AccidState, KeySignature};
use crate::options::MidiOptions;
use crate::time_signature::{NoteDuration, TimeSignature};
use crate::track::{MidiNote, MidiTrack};

/// A fully laid-out sheet: the staves from top to bottom.
#[derive(Debug, Clone, Serialize)]
pub struct SheetMusic {
    staffs: Vec<Staff>,
    #[serde(skip)]
    mainkey: KeySignature,
    num_tracks: usize,
    time: TimeSignature,
}

impl SheetMusic {
    /// Lay out a parsed MIDI file under the given options.
    pub fn new(file: &MidiFile, options: &MidiOptions) -> SheetMusic {
        let tracks = file.apply_options(options);
        let time = options.time.clone().unwrap_or_else(|| file.time().clone());
        let mainkey = match options.key {
            Some(notescale) => KeySignature::from_notescale(notescale),
            None => guess_key(&tracks),
        };

        let last_start = tracks
            .iter()
            .flat_map(|t| t.notes.iter().map(|n| n.end_time()))
            .max()
            .unwrap_or(0);

        let mut all_symbols: Vec<Vec<MusicSymbol>> = Vec::with_capacity(tracks.len());
        for track in &tracks {
            let clefs = ClefMeasures::new(&track.notes, time.measure());
            let chords = create_chords(&track.notes, &mainkey, &time, &clefs);
            let mut symbols = add_rests(chords, &time);
            symbols = add_bars(symbols, &time, last_start);
            symbols = add_clef_changes(symbols, &clefs);
            create_all_beams(&mut symbols, &time);
            all_symbols.push(symbols);
        }

        let lyric_symbols: Option<Vec<Vec<LyricSymbol>>> = options.show_lyrics.then(|| {
            tracks
                .iter()
                .map(|t| {
                    t.lyrics
                        .iter()
                        .map(|l| LyricSymbol::new(l.start_time, l.text.clone()))
                        .collect()
                })
                .collect()
        });

        let widths = SymbolWidths::new(&all_symbols, lyric_symbols.as_deref());
        for symbols in all_symbols.iter_mut() {
            add_blanks(symbols, &widths);
        }

        let mut track_staffs: Vec<Vec<Staff>> = all_symbols
            .into_iter()
            .enumerate()
            .map(|(tracknum, symbols)| {
                create_staffs_for_track(
                    symbols,
                    &widths,
                    &mainkey,
                    options,
                    tracknum,
                    tracks.len(),
                    time.measure(),
                )
            })
            .collect();

        align_symbols(&mut track_staffs, &widths, options);

        if let Some(lyric_symbols) = &lyric_symbols {
            for (staffs, lyrics) in track_staffs.iter_mut().zip(lyric_symbols) {
                for staff in staffs.iter_mut() {
                    staff.add_lyrics(lyrics);
                }
            }
        }

        let staffs = interleave_staffs(track_staffs);
        SheetMusic {
            staffs,
            mainkey,
            num_tracks: tracks.len(),
            time,
        }
    }

    /// The staves, from top to bottom: for multi-track files the tracks'
    /// staves interleave so simultaneous music stays adjacent.
    pub fn staffs(&self) -> &[Staff] {
        &self.staffs
    }

    pub fn main_key(&self) -> &KeySignature {
        &self.mainkey
    }

    pub fn num_tracks(&self) -> usize {
        self.num_tracks
    }

    pub fn time(&self) -> &TimeSignature {
        &self.time
    }

    /// The total height of the sheet in pixels.
    pub fn total_height(&self) -> i32 {
        self.staffs.iter().map(|s| s.height()).sum()
    }
}

/// Guess the main key from every note of every track.
fn guess_key(tracks: &[MidiTrack]) -> KeySignature {
    let notes: Vec<i32> = tracks
        .iter()
        .flat_map(|t| t.notes.iter().map(|n| n.number))
        .collect();
    KeySignature::guess(&notes)
}

// ═══════════════════════════════════════════════════════════════════════
// Chords, rests, bars, clef changes
// ═══════════════════════════════════════════════════════════════════════

/// Group simultaneous notes into chord symbols.  Notes were already
/// clustered by `round_start_times`, so equal start times identify a
/// chord window.
fn create_chords(
    notes: &[MidiNote],
    key: &KeySignature,
    time: &TimeSignature,
    clefs: &ClefMeasures,
) -> Vec<ChordSymbol> {
    let mut chords = Vec::new();
    let mut state = AccidState::new();
    let mut i = 0;
    while i < notes.len() {
        let start = notes[i].start_time;
        let mut j = i;
        while j < notes.len() && notes[j].start_time == start {
            j += 1;
        }
        chords.push(ChordSymbol::new(
            &notes[i..j],
            key,
            &mut state,
            time,
            clefs.get(start),
        ));
        i = j;
    }
    chords
}

/// Fill the gap between one chord's end and the next chord's start with
/// rest symbols.
fn add_rests(chords: Vec<ChordSymbol>, time: &TimeSignature) -> Vec<MusicSymbol> {
    let mut prev_time = 0;
    let mut symbols: Vec<MusicSymbol> = Vec::with_capacity(chords.len() * 2);
    for chord in chords {
        let start = chord.start_time();
        for rest in rest_symbols(time, prev_time, start) {
            symbols.push(MusicSymbol::Rest(rest));
        }
        prev_time = prev_time.max(chord.end_time());
        symbols.push(MusicSymbol::Chord(chord));
    }
    symbols
}

/// The rests covering [start, end): a single rest when one duration
/// fits exactly, a largest-first pair for the dotted durations, and
/// nothing for gaps shorter than a sixteenth.
fn rest_symbols(time: &TimeSignature, start: u32, end: u32) -> Vec<RestSymbol> {
    if end <= start {
        return Vec::new();
    }
    let quarter = time.quarter();
    match time.get_note_duration(end - start) {
        dur @ (NoteDuration::Whole
        | NoteDuration::Half
        | NoteDuration::Quarter
        | NoteDuration::Eighth) => vec![RestSymbol::new(start, dur)],
        NoteDuration::DottedHalf => vec![
            RestSymbol::new(start, NoteDuration::Half),
            RestSymbol::new(start + quarter * 2, NoteDuration::Quarter),
        ],
        NoteDuration::DottedQuarter => vec![
            RestSymbol::new(start, NoteDuration::Quarter),
            RestSymbol::new(start + quarter, NoteDuration::Eighth),
        ],
        NoteDuration::DottedEighth => vec![
            RestSymbol::new(start, NoteDuration::Eighth),
            RestSymbol::new(start + quarter / 2, NoteDuration::Sixteenth),
        ],
        _ => Vec::new(),
    }
}

/// Insert the time-signature marker and a bar line at every multiple of
/// the measure length, up to and including the final bar.
fn add_bars(symbols: Vec<MusicSymbol>, time: &TimeSignature, last_start: u32) -> Vec<MusicSymbol> {
    let mut result: Vec<MusicSymbol> = Vec::with_capacity(symbols.len() + 8);
    result.push(MusicSymbol::TimeSig(TimeSigSymbol::new(
        time.numerator(),
        time.denominator(),
    )));

    let mut measure_time = 0u32;
    let mut iter = symbols.into_iter().peekable();
    while let Some(symbol) = iter.peek() {
        if measure_time <= symbol.start_time() {
            result.push(MusicSymbol::Bar(BarSymbol::new(measure_time)));
            measure_time += time.measure();
        } else {
            result.push(iter.next().unwrap());
        }
    }
    while measure_time < last_start {
        result.push(MusicSymbol::Bar(BarSymbol::new(measure_time)));
        measure_time += time.measure();
    }
    result.push(MusicSymbol::Bar(BarSymbol::new(measure_time)));
    result
}

/// Insert a small clef right after each bar line whose measure uses a
/// different clef than the measure before it.
fn add_clef_changes(symbols: Vec<MusicSymbol>, clefs: &ClefMeasures) -> Vec<MusicSymbol> {
    let mut result: Vec<MusicSymbol> = Vec::with_capacity(symbols.len());
    let mut prev_clef = clefs.get(0);
    for symbol in symbols {
        let is_bar = symbol.is_bar();
        let start = symbol.start_time();
        result.push(symbol);
        if is_bar {
            let clef = clefs.get(start);
            if clef != prev_clef {
                result.push(MusicSymbol::Clef(ClefSymbol::new(clef, start, true)));
            }
            prev_clef = clef;
        }
    }
    result
}

// ═══════════════════════════════════════════════════════════════════════
// Beams
// ═══════════════════════════════════════════════════════════════════════

/// Beam every eligible chord run.  Triplet threes and compound-time
/// sixes are tried first, then sixteenth fours, then pairs on the beat,
/// then any remaining pairs.
fn create_all_beams(symbols: &mut [MusicSymbol], time: &TimeSignature) {
    for (num_chords, on_beat) in [(3, true), (6, true), (4, true), (2, true), (2, false)] {
        create_beamed_chords(symbols, time, num_chords, on_beat);
    }
}

fn create_beamed_chords(
    symbols: &mut [MusicSymbol],
    time: &TimeSignature,
    num_chords: usize,
    on_beat: bool,
) {
    let mut start_index = 0;
    while let Some((indexes, horiz)) = find_consecutive_chords(symbols, start_index, num_chords) {
        let run: Vec<&ChordSymbol> = indexes
            .iter()
            .map(|&i| symbols[i].as_chord().expect("index points at a chord"))
            .collect();

        if !can_create_beams(&run, time, on_beat) {
            start_index = indexes[0] + 1;
            continue;
        }

        let forced = run
            .iter()
            .find(|c| c.has_two_stems())
            .and_then(|c| c.stem().map(|s| s.direction()));
        let mut stems: Vec<Stem> = run
            .iter()
            .map(|c| *c.stem().expect("beam candidates carry stems"))
            .collect();
        let starts: Vec<u32> = run.iter().map(|c| c.start_time()).collect();
        let clef = run[0].clef();

        chord::create_beam(&mut stems, &starts, clef, horiz, forced);

        for (stem, &i) in stems.iter().zip(&indexes) {
            if let Some(target) = symbols[i].as_chord_mut().and_then(|c| c.stem_mut()) {
                *target = *stem;
            }
        }
        start_index = *indexes.last().unwrap() + 1;
    }
}

/// Find the next run of `num_chords` chord symbols separated only by
/// blanks, returning their indexes and the accumulated horizontal
/// distance from the first chord to the last.
fn find_consecutive_chords(
    symbols: &[MusicSymbol],
    mut i: usize,
    num_chords: usize,
) -> Option<(Vec<usize>, i32)> {
    loop {
        while i < symbols.len() && !symbols[i].is_chord() {
            i += 1;
        }
        if i >= symbols.len() {
            return None;
        }

        let mut indexes = vec![i];
        let mut horiz = 0;
        let mut j = i + 1;
        let mut blocked = None;
        while indexes.len() < num_chords {
            while j < symbols.len() && matches!(symbols[j], MusicSymbol::Blank(_)) {
                horiz += symbols[j].width();
                j += 1;
            }
            if j >= symbols.len() {
                return None;
            }
            if !symbols[j].is_chord() {
                blocked = Some(j);
                break;
            }
            horiz += symbols[j].width();
            indexes.push(j);
            j += 1;
        }

        match blocked {
            None => return Some((indexes, horiz)),
            Some(next) => i = next,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Blanks, staves, alignment
// ═══════════════════════════════════════════════════════════════════════

/// Give the track a symbol at every start time any track uses, so all
/// tracks share one time skeleton.
fn add_blanks(symbols: &mut Vec<MusicSymbol>, widths: &SymbolWidths) {
    let mut result: Vec<MusicSymbol> = Vec::with_capacity(symbols.len());
    let mut iter = std::mem::take(symbols).into_iter().peekable();

    for &start in widths.start_times() {
        // Bar lines at or before this start time flush first.
        while iter
            .peek()
            .map(|s| s.is_bar() && s.start_time() <= start)
            .unwrap_or(false)
        {
            result.push(iter.next().unwrap());
        }
        if iter
            .peek()
            .map(|s| s.start_time() == start)
            .unwrap_or(false)
        {
            while iter
                .peek()
                .map(|s| s.start_time() == start)
                .unwrap_or(false)
            {
                result.push(iter.next().unwrap());
            }
        } else {
            result.push(MusicSymbol::Blank(BlankSymbol::new(start, 0)));
        }
    }
    result.extend(iter);
    *symbols = result;
}

/// Split one track's symbols into page-width staves, breaking at bar
/// lines.  Widths are measured by the aligned column widths so every
/// track breaks at the same bars; only a single measure wider than the
/// page forces a mid-measure break.
fn create_staffs_for_track(
    symbols: Vec<MusicSymbol>,
    widths: &SymbolWidths,
    key: &KeySignature,
    options: &MidiOptions,
    tracknum: usize,
    total_tracks: usize,
    measure_length: u32,
) -> Vec<Staff> {
    let keysig_width = key_signature_width(key);
    let max_width = if options.scroll_vert { PAGE_WIDTH } else { i32::MAX };

    // Per-symbol effective widths: bars as-is, each start-time column
    // once at the global column width.
    let mut effective: Vec<i32> = Vec::with_capacity(symbols.len());
    let mut counted_start: Option<u32> = None;
    for symbol in &symbols {
        if symbol.is_bar() {
            effective.push(symbol.width());
        } else if counted_start != Some(symbol.start_time()) {
            counted_start = Some(symbol.start_time());
            effective.push(widths.max_width(symbol.start_time()).max(symbol.width()));
        } else {
            effective.push(0);
        }
    }

    let mut staffs: Vec<Staff> = Vec::new();
    let mut remaining = symbols;
    let mut offsets = effective;

    while !remaining.is_empty() {
        let mut width = keysig_width;
        let mut end = 0usize; // exclusive
        while end < remaining.len() && width + offsets[end] < max_width {
            width += offsets[end];
            end += 1;
        }
        if end == 0 {
            end = 1; // a single over-wide symbol still makes progress
        }

        // Break at the last bar line, never mid-measure, unless this
        // run has no bar at all (one measure wider than the page).
        if end < remaining.len() {
            if let Some(bar) = remaining[..end]
                .iter()
                .rposition(|s| s.is_bar())
                .filter(|&b| b > 0)
            {
                end = bar + 1;
            } else {
                log::debug!(
                    "track {tracknum}: measure exceeds page width, breaking mid-measure"
                );
            }
        }

        let rest = remaining.split_off(end);
        offsets.drain(..end);
        staffs.push(Staff::new(
            remaining,
            key,
            options,
            tracknum,
            total_tracks,
            measure_length,
        ));
        remaining = rest;
    }

    // A staff ends where the next one starts.
    for i in 0..staffs.len().saturating_sub(1) {
        let next_start = staffs[i + 1].start_time();
        staffs[i].set_end_time(next_start);
    }
    staffs
}

/// The single width-mutation pass: widen each track's column up to the
/// global maximum, refresh the beam spacings, then justify and resize
/// every staff.
fn align_symbols(
    track_staffs: &mut [Vec<Staff>],
    widths: &SymbolWidths,
    options: &MidiOptions,
) {
    for staffs in track_staffs.iter_mut() {
        for staff in staffs.iter_mut() {
            let tracknum = staff.tracknum();
            let symbols = staff.symbols_mut();

            // The extra width lands on the content symbol (the last
            // non-bar one) of each start-time group: leading markers
            // like time signatures and clef changes have equal widths
            // in every track already, so the chords and rests
            // themselves end up equal-width across staves.
            let mut i = 0;
            while i < symbols.len() {
                if symbols[i].is_bar() {
                    i += 1;
                    continue;
                }
                let start = symbols[i].start_time();
                let mut j = i;
                let mut last = i;
                while j < symbols.len() && symbols[j].start_time() == start {
                    if !symbols[j].is_bar() {
                        last = j;
                    }
                    j += 1;
                }
                let extra = widths.extra_width(tracknum, start);
                if extra > 0 {
                    symbols[last].set_width(symbols[last].width() + extra);
                }
                i = j;
            }

            refresh_beam_spacing(symbols);
            staff.calculate_width(options.scroll_vert);
            if options.scroll_vert {
                staff.full_justify();
            }
            staff.calculate_height();
        }
    }
}

/// Recompute each beam's pixel spacing from the final symbol widths.
fn refresh_beam_spacing(symbols: &mut [MusicSymbol]) {
    for i in 0..symbols.len() {
        let has_pair = symbols[i]
            .as_chord()
            .and_then(|c| c.stem())
            .map(|s| s.pair().is_some())
            .unwrap_or(false);
        if !has_pair {
            continue;
        }

        let mut horiz = 0;
        let mut pending = 0;
        for symbol in &symbols[i + 1..] {
            match symbol {
                MusicSymbol::Blank(b) => pending += b.width,
                MusicSymbol::Chord(c) if c.stem().map(|s| s.receiver()).unwrap_or(false) => {
                    horiz += pending + c.width;
                    pending = 0;
                }
                _ => break,
            }
        }

        if let Some(stem) = symbols[i].as_chord_mut().and_then(|c| c.stem_mut()) {
            stem.set_pair_width(horiz);
        }
    }
}

/// Interleave the per-track staff lists so simultaneous staves sit
/// together vertically.
fn interleave_staffs(track_staffs: Vec<Vec<Staff>>) -> Vec<Staff> {
    let max_len = track_staffs.iter().map(|s| s.len()).max().unwrap_or(0);
    let mut iters: Vec<_> = track_staffs.into_iter().map(|s| s.into_iter()).collect();
    let mut result = Vec::new();
    for _ in 0..max_len {
        for iter in iters.iter_mut() {
            if let Some(staff) = iter.next() {
                result.push(staff);
            }
        }
    }
    result
}
