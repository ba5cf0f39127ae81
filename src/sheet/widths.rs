//! The sparse start-time → width index used to align symbols across
//! staves.
//!
//! For every start time, each track contributes the total minimum width
//! of its symbols at that time (bar lines excluded — they already sit
//! on shared measure boundaries).  The alignment pass widens each
//! track's column up to the global maximum, so a vertical cut at any
//! pulse time crosses aligned symbol edges in every staff.

use std::collections::BTreeMap;

use super::symbol::{LyricSymbol, MusicSymbol};

pub struct SymbolWidths {
    /// start time -> total symbol width, one map per track
    track_widths: Vec<BTreeMap<u32, i32>>,
    /// start time -> the maximum width any track needs there
    max_widths: BTreeMap<u32, i32>,
    /// Every start time in any track, sorted
    start_times: Vec<u32>,
}

impl SymbolWidths {
    /// Build the index from every track's symbol list (and lyric lists,
    /// which also take horizontal room).
    pub fn new(tracks: &[Vec<MusicSymbol>], lyrics: Option<&[Vec<LyricSymbol>]>) -> SymbolWidths {
        let mut track_widths: Vec<BTreeMap<u32, i32>> =
            tracks.iter().map(|symbols| Self::widths_of(symbols)).collect();

        if let Some(lyrics) = lyrics {
            for (track, lyric_list) in track_widths.iter_mut().zip(lyrics) {
                for lyric in lyric_list {
                    let entry = track.entry(lyric.start_time).or_insert(0);
                    *entry = (*entry).max(lyric.min_width());
                }
            }
        }

        let mut max_widths: BTreeMap<u32, i32> = BTreeMap::new();
        for track in &track_widths {
            for (&start, &width) in track {
                let entry = max_widths.entry(start).or_insert(0);
                *entry = (*entry).max(width);
            }
        }
        let start_times: Vec<u32> = max_widths.keys().copied().collect();

        SymbolWidths {
            track_widths,
            max_widths,
            start_times,
        }
    }

    fn widths_of(symbols: &[MusicSymbol]) -> BTreeMap<u32, i32> {
        let mut widths: BTreeMap<u32, i32> = BTreeMap::new();
        for symbol in symbols {
            if symbol.is_bar() {
                continue;
            }
            *widths.entry(symbol.start_time()).or_insert(0) += symbol.min_width();
        }
        widths
    }

    /// Every start time occurring in any track, sorted ascending.
    pub fn start_times(&self) -> &[u32] {
        &self.start_times
    }

    /// The widest column any track needs at `start`.
    pub fn max_width(&self, start: u32) -> i32 {
        self.max_widths.get(&start).copied().unwrap_or(0)
    }

    /// The extra width `track` must add at `start` to match the widest
    /// track.  A track with no symbol there (a blank fills in) needs
    /// the full column width.
    pub fn extra_width(&self, track: usize, start: u32) -> i32 {
        let max = self.max_width(start);
        let own = self
            .track_widths
            .get(track)
            .and_then(|m| m.get(&start))
            .copied()
            .unwrap_or(0);
        max - own
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::symbol::{BarSymbol, RestSymbol};
    use crate::time_signature::NoteDuration;

    fn rest(start: u32) -> MusicSymbol {
        MusicSymbol::Rest(RestSymbol::new(start, NoteDuration::Quarter))
    }

    #[test]
    fn bars_are_excluded_from_the_index() {
        let track = vec![MusicSymbol::Bar(BarSymbol::new(0)), rest(0)];
        let widths = SymbolWidths::new(&[track], None);
        let rest_width = rest(0).min_width();
        assert_eq!(widths.max_width(0), rest_width);
    }

    #[test]
    fn extra_width_covers_missing_symbols() {
        let track_a = vec![rest(0), rest(480)];
        let track_b = vec![rest(0)];
        let widths = SymbolWidths::new(&[track_a, track_b], None);
        assert_eq!(widths.start_times(), &[0, 480]);
        assert_eq!(widths.extra_width(0, 0), 0);
        assert_eq!(widths.extra_width(1, 480), rest(480).min_width());
    }
}
