//! A staff: one page-width run of symbols for one track.

use serde::{Deserialize, Serialize};

use super::constants::*;
use super::symbol::{AccidSymbol, LyricSymbol, MusicSymbol};
use crate::clef::Clef;
use crate::key_signature::KeySignature;
use crate::options::MidiOptions;

/// The left-side width a key signature needs: margin, clef, and the
/// signature's accidental symbols.
pub fn key_signature_width(key: &KeySignature) -> i32 {
    let sig_width: i32 = key
        .symbol_positions(Clef::Treble)
        .iter()
        .map(|&(accid, note)| AccidSymbol::new(accid, note, Clef::Treble).min_width())
        .sum();
    LEFT_MARGIN + CLEF_WIDTH + sig_width
}

/// One staff of symbols.  Built once; only the alignment pass touches
/// the symbol widths afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    symbols: Vec<MusicSymbol>,
    lyrics: Vec<LyricSymbol>,
    /// The left-side clef
    clef: Clef,
    /// The key signature accidental symbols
    keys: Vec<AccidSymbol>,
    show_measures: bool,
    keysig_width: i32,
    width: i32,
    height: i32,
    /// Pixels of symbol content above the top staff line
    above_staff: i32,
    tracknum: usize,
    total_tracks: usize,
    start_time: u32,
    end_time: u32,
    measure_length: u32,
}

impl Staff {
    pub fn new(
        symbols: Vec<MusicSymbol>,
        key: &KeySignature,
        options: &MidiOptions,
        tracknum: usize,
        total_tracks: usize,
        measure_length: u32,
    ) -> Staff {
        let clef = find_clef(&symbols);
        let keys: Vec<AccidSymbol> = key
            .symbol_positions(clef)
            .into_iter()
            .map(|(accid, note)| AccidSymbol::new(accid, note, clef))
            .collect();
        let keysig_width = key_signature_width(key);

        let start_time = symbols.first().map(|s| s.start_time()).unwrap_or(0);
        let end_time = symbols
            .iter()
            .map(|s| s.start_time())
            .max()
            .unwrap_or(start_time);

        let mut staff = Staff {
            symbols,
            lyrics: Vec::new(),
            clef,
            keys,
            show_measures: options.show_measures,
            keysig_width,
            width: 0,
            height: 0,
            above_staff: 0,
            tracknum,
            total_tracks,
            start_time,
            end_time,
            measure_length,
        };
        staff.calculate_width(options.scroll_vert);
        staff.calculate_height();
        staff
    }

    pub fn symbols(&self) -> &[MusicSymbol] {
        &self.symbols
    }

    pub fn symbols_mut(&mut self) -> &mut [MusicSymbol] {
        &mut self.symbols
    }

    pub fn clef(&self) -> Clef {
        self.clef
    }

    pub fn key_symbols(&self) -> &[AccidSymbol] {
        &self.keys
    }

    pub fn lyrics(&self) -> &[LyricSymbol] {
        &self.lyrics
    }

    pub fn tracknum(&self) -> usize {
        self.tracknum
    }

    pub fn total_tracks(&self) -> usize {
        self.total_tracks
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn keysig_width(&self) -> i32 {
        self.keysig_width
    }

    pub fn start_time(&self) -> u32 {
        self.start_time
    }

    pub fn end_time(&self) -> u32 {
        self.end_time
    }

    /// Staffs cover the song back-to-back: a staff ends where the next
    /// one for the same track starts.
    pub fn set_end_time(&mut self, end_time: u32) {
        self.end_time = end_time;
    }

    /// Recompute the width from the current symbol widths.
    pub fn calculate_width(&mut self, scroll_vert: bool) {
        if scroll_vert {
            self.width = PAGE_WIDTH;
            return;
        }
        let total: i32 = self.symbols.iter().map(|s| s.width()).sum();
        self.width = self.keysig_width + total;
    }

    /// The staff height: the five lines plus whatever the symbols (and
    /// lyrics) extend above and below them.
    pub fn calculate_height(&mut self) {
        let mut above = 0;
        let mut below = 0;
        for symbol in &self.symbols {
            above = above.max(symbol.above_staff());
            below = below.max(symbol.below_staff());
        }
        for key in &self.keys {
            above = above.max(key.above_staff());
            below = below.max(key.below_staff());
        }
        if !self.lyrics.is_empty() {
            below += NOTE_HEIGHT * 3 / 2;
        }
        if self.show_measures {
            above += NOTE_HEIGHT * 3 / 2;
        }
        self.above_staff = above;
        self.height = STAFF_HEIGHT + above + below;
    }

    /// Attach the lyric syllables that fall inside this staff's time
    /// range, computing each one's x position from the symbol layout.
    pub fn add_lyrics(&mut self, lyrics: &[LyricSymbol]) {
        let mut placed: Vec<LyricSymbol> = Vec::new();
        for lyric in lyrics {
            if lyric.start_time < self.start_time || lyric.start_time > self.end_time {
                continue;
            }
            let mut x = self.keysig_width;
            for symbol in &self.symbols {
                if symbol.start_time() >= lyric.start_time && symbol.is_chord() {
                    break;
                }
                x += symbol.width();
            }
            let mut placed_lyric = lyric.clone();
            placed_lyric.x = x;
            placed.push(placed_lyric);
        }
        self.lyrics = placed;
        if !self.lyrics.is_empty() {
            self.calculate_height();
        }
    }

    /// Expand the symbols so the staff spans the full page width.  The
    /// same extra is added to each start-time column, so tracks that
    /// break at the same bars stay aligned.
    pub fn full_justify(&mut self) {
        if self.width != PAGE_WIDTH {
            return;
        }

        let mut total_width = self.keysig_width;
        let mut total_symbols = 0;
        let mut i = 0;
        while i < self.symbols.len() {
            let start = self.symbols[i].start_time();
            total_symbols += 1;
            total_width += self.symbols[i].width();
            i += 1;
            while i < self.symbols.len() && self.symbols[i].start_time() == start {
                total_width += self.symbols[i].width();
                i += 1;
            }
        }
        if total_symbols == 0 {
            return;
        }

        let mut extra = (PAGE_WIDTH - total_width - 1) / total_symbols;
        if extra > NOTE_HEIGHT * 2 {
            extra = NOTE_HEIGHT * 2;
        }
        if extra <= 0 {
            return;
        }

        let mut i = 0;
        while i < self.symbols.len() {
            let start = self.symbols[i].start_time();
            let width = self.symbols[i].width();
            self.symbols[i].set_width(width + extra);
            i += 1;
            while i < self.symbols.len() && self.symbols[i].start_time() == start {
                i += 1;
            }
        }
    }
}

/// The clef for a whole staff: the first chord's clef, or treble for a
/// staff with no chords.
fn find_clef(symbols: &[MusicSymbol]) -> Clef {
    symbols
        .iter()
        .find_map(|s| s.as_chord().map(|c| c.clef()))
        .unwrap_or(Clef::Treble)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::symbol::{BarSymbol, RestSymbol};
    use crate::time_signature::NoteDuration;

    fn options() -> MidiOptions {
        MidiOptions::default()
    }

    #[test]
    fn scroll_vert_staff_spans_the_page() {
        let symbols = vec![
            MusicSymbol::Rest(RestSymbol::new(0, NoteDuration::Quarter)),
            MusicSymbol::Bar(BarSymbol::new(1920)),
        ];
        let staff = Staff::new(symbols, &KeySignature::default(), &options(), 0, 1, 1920);
        assert_eq!(staff.width(), PAGE_WIDTH);
        assert!(staff.height() >= STAFF_HEIGHT);
        assert_eq!(staff.start_time(), 0);
        assert_eq!(staff.end_time(), 1920);
    }

    #[test]
    fn full_justify_widens_every_column_equally() {
        let symbols = vec![
            MusicSymbol::Rest(RestSymbol::new(0, NoteDuration::Quarter)),
            MusicSymbol::Rest(RestSymbol::new(480, NoteDuration::Quarter)),
        ];
        let before: Vec<i32> = symbols.iter().map(|s| s.width()).collect();
        let mut staff = Staff::new(symbols, &KeySignature::default(), &options(), 0, 1, 1920);
        staff.full_justify();
        let after: Vec<i32> = staff.symbols().iter().map(|s| s.width()).collect();
        let growth: Vec<i32> = after.iter().zip(&before).map(|(a, b)| a - b).collect();
        assert!(growth[0] > 0);
        assert_eq!(growth[0], growth[1]);
    }
}
