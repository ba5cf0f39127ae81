//! Integration tests for the layout pipeline: chords, rests, bars,
//! beams, staff justification, and cross-staff width alignment.

use sheetlib::sheet::MusicSymbol;
use sheetlib::{
    parse_bytes, Accid, KeySignature, MidiOptions, NoteDuration, SheetMusic, Staff, StemDir,
};

// ═══════════════════════════════════════════════════════════════════════
// In-memory SMF construction
// ═══════════════════════════════════════════════════════════════════════

fn varlen(out: &mut Vec<u8>, mut value: u32) {
    let mut buf = [0u8; 5];
    let mut i = 0;
    loop {
        buf[i] = (value & 0x7F) as u8;
        value >>= 7;
        i += 1;
        if value == 0 {
            break;
        }
    }
    for j in (0..i).rev() {
        let mut b = buf[j];
        if j > 0 {
            b |= 0x80;
        }
        out.push(b);
    }
}

fn track_chunk(events: &[(u32, Vec<u8>)]) -> Vec<u8> {
    let mut data = Vec::new();
    for (delta, bytes) in events {
        varlen(&mut data, *delta);
        data.extend_from_slice(bytes);
    }
    data.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);

    let mut chunk = Vec::new();
    chunk.extend_from_slice(b"MTrk");
    chunk.extend_from_slice(&(data.len() as u32).to_be_bytes());
    chunk.extend_from_slice(&data);
    chunk
}

fn smf(format: u16, quarter: u16, tracks: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"MThd");
    out.extend_from_slice(&6u32.to_be_bytes());
    out.extend_from_slice(&format.to_be_bytes());
    out.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    out.extend_from_slice(&quarter.to_be_bytes());
    for track in tracks {
        out.extend_from_slice(track);
    }
    out
}

/// A track of (start, duration, number, channel) notes as SMF events.
fn note_track(notes: &[(u32, u32, u8)], channel: u8) -> Vec<u8> {
    let mut boundaries: Vec<(u32, Vec<u8>)> = Vec::new();
    for &(start, duration, number) in notes {
        boundaries.push((start, vec![0x90 | channel, number, 64]));
        boundaries.push((start + duration, vec![0x80 | channel, number, 0]));
    }
    boundaries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut events: Vec<(u32, Vec<u8>)> = Vec::new();
    let mut prev = 0;
    for (time, bytes) in boundaries {
        events.push((time - prev, bytes));
        prev = time;
    }
    track_chunk(&events)
}

fn layout(notes: &[(u32, u32, u8)]) -> SheetMusic {
    let file = parse_bytes(&smf(0, 480, &[note_track(notes, 0)])).unwrap();
    let options = MidiOptions::from_file(&file);
    SheetMusic::new(&file, &options)
}

fn chords_of(staff: &Staff) -> Vec<&sheetlib::sheet::ChordSymbol> {
    staff
        .symbols()
        .iter()
        .filter_map(|s| s.as_chord())
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════
// The worked single-note example
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn single_quarter_note_layout() {
    let sheet = layout(&[(0, 480, 60)]);
    assert_eq!(sheet.staffs().len(), 1);

    let staff = &sheet.staffs()[0];
    let chords = chords_of(staff);
    assert_eq!(chords.len(), 1);
    assert_eq!(chords[0].start_time(), 0);
    assert_eq!(chords[0].notes().len(), 1);
    assert_eq!(chords[0].notes()[0].duration, NoteDuration::Quarter);

    // Middle C is below the treble middle line: stem up.
    assert_eq!(chords[0].stem().unwrap().direction(), StemDir::Up);

    let rests = staff
        .symbols()
        .iter()
        .filter(|s| matches!(s, MusicSymbol::Rest(_)))
        .count();
    assert_eq!(rests, 0);

    let bar_times: Vec<u32> = staff
        .symbols()
        .iter()
        .filter(|s| s.is_bar())
        .map(|s| s.start_time())
        .collect();
    assert!(!bar_times.is_empty());
    for time in bar_times {
        assert_eq!(time % sheet.time().measure(), 0);
    }
}

#[test]
fn gap_between_chords_becomes_rests() {
    // A quarter note, a quarter-note gap, another quarter note.
    let sheet = layout(&[(0, 480, 60), (960, 480, 62)]);
    let staff = &sheet.staffs()[0];
    let rests: Vec<&MusicSymbol> = staff
        .symbols()
        .iter()
        .filter(|s| matches!(s, MusicSymbol::Rest(_)))
        .collect();
    assert_eq!(rests.len(), 1);
    assert_eq!(rests[0].start_time(), 480);
}

// ═══════════════════════════════════════════════════════════════════════
// Staff invariants
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn staff_symbols_are_time_ordered_with_bars_on_measures() {
    let notes: Vec<(u32, u32, u8)> = (0..32).map(|i| (i * 480, 480, 60 + (i % 12) as u8)).collect();
    let sheet = layout(&notes);
    assert!(sheet.staffs().len() > 1, "32 measures should span staves");

    let measure = sheet.time().measure();
    for staff in sheet.staffs() {
        for pair in staff.symbols().windows(2) {
            assert!(
                pair[0].start_time() <= pair[1].start_time(),
                "symbol times must be non-decreasing"
            );
        }
        for symbol in staff.symbols() {
            if symbol.is_bar() {
                assert_eq!(symbol.start_time() % measure, 0);
            }
        }
        // Every staff but possibly the last ends at a bar line.
        assert!(staff.width() <= sheetlib::sheet::PAGE_WIDTH);
    }

    // Staffs tile the song: each ends where the next begins.
    for pair in sheet.staffs().windows(2) {
        assert_eq!(pair[0].end_time(), pair[1].start_time());
    }
}

#[test]
fn sixteen_eighths_beam_in_pairs() {
    let notes: Vec<(u32, u32, u8)> = (0..16).map(|i| (i * 240, 240, 72)).collect();
    let sheet = layout(&notes);

    let mut pairs = 0;
    let mut receivers = 0;
    for staff in sheet.staffs() {
        for chord in chords_of(staff) {
            let stem = chord.stem().unwrap();
            assert!(stem.is_beam(), "every eighth should be beamed");
            if stem.pair().is_some() {
                pairs += 1;
                // Pair spacing reflects the aligned widths.
                assert!(stem.pair().unwrap().width > 0);
            }
            if stem.receiver() {
                receivers += 1;
            }
        }
    }
    assert_eq!(pairs, 8);
    assert_eq!(receivers, 8);
}

// ═══════════════════════════════════════════════════════════════════════
// Cross-staff alignment
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn same_start_times_get_equal_widths_across_tracks() {
    // Track 1 has accidentals (wider chords); track 2 plain notes; and
    // each track has an onset the other lacks.
    let tracks = vec![
        note_track(&[(0, 480, 61), (480, 480, 63), (1440, 480, 66)], 0),
        note_track(&[(0, 480, 48), (480, 480, 50), (960, 480, 52)], 1),
    ];
    let file = parse_bytes(&smf(1, 480, &tracks)).unwrap();
    let options = MidiOptions::from_file(&file);
    let sheet = SheetMusic::new(&file, &options);

    // Two tracks, one system: staves interleave track by track.
    assert_eq!(sheet.num_tracks(), 2);
    let staff_a = &sheet.staffs()[0];
    let staff_b = &sheet.staffs()[1];
    assert_ne!(staff_a.tracknum(), staff_b.tracknum());

    let widths_at = |staff: &Staff, start: u32| -> Vec<i32> {
        staff
            .symbols()
            .iter()
            .filter(|s| !s.is_bar() && s.start_time() == start)
            .map(|s| s.width())
            .collect()
    };

    for start in [0u32, 480, 960, 1440] {
        let a: i32 = widths_at(staff_a, start).iter().sum();
        let b: i32 = widths_at(staff_b, start).iter().sum();
        assert_eq!(a, b, "column width mismatch at pulse {start}");
        assert!(a > 0, "both tracks need a column at pulse {start}");
    }

    // The chords themselves align too: equal rendered widths at equal
    // start times.
    for start in [0u32, 480] {
        let chord_width = |staff: &Staff| {
            staff
                .symbols()
                .iter()
                .find(|s| s.start_time() == start && s.is_chord())
                .map(|s| s.width())
        };
        let a = chord_width(staff_a);
        let b = chord_width(staff_b);
        assert_eq!(a, b, "chord width mismatch at pulse {start}");
    }
}

#[test]
fn two_staffs_option_builds_a_grand_staff() {
    let notes: Vec<(u32, u32, u8)> = (0..8)
        .flat_map(|i| [(i * 480, 480, 76u8), (i * 480, 480, 40u8)])
        .collect();
    let file = parse_bytes(&smf(0, 480, &[note_track(&notes, 0)])).unwrap();
    let options = MidiOptions {
        two_staffs: true,
        ..MidiOptions::from_file(&file)
    };
    let sheet = SheetMusic::new(&file, &options);

    assert_eq!(sheet.num_tracks(), 2);
    let first = &sheet.staffs()[0];
    let second = &sheet.staffs()[1];
    assert_eq!(first.clef(), sheetlib::Clef::Treble);
    assert_eq!(second.clef(), sheetlib::Clef::Bass);
}

// ═══════════════════════════════════════════════════════════════════════
// Keys and accidentals
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn c_major_scale_is_guessed_and_unsigned() {
    let notes: Vec<(u32, u32, u8)> = [60u8, 62, 64, 65, 67, 69, 71]
        .iter()
        .enumerate()
        .map(|(i, &n)| (i as u32 * 480, 480, n))
        .collect();
    let sheet = layout(&notes);
    assert_eq!(sheet.main_key(), &KeySignature::new(0, 0));

    let accids: usize = sheet
        .staffs()
        .iter()
        .flat_map(chords_of)
        .map(|c| c.accid_symbols().len())
        .sum();
    assert_eq!(accids, 0, "a C-major scale in C major needs no accidentals");
}

#[test]
fn accidentals_reset_at_the_measure_boundary() {
    // C# at the start of each of two measures: both occurrences carry
    // a sharp, while a repeat within one measure does not.  The key is
    // forced to C major — the guesser would otherwise pick a sharp key
    // that absorbs the C#.
    let file = parse_bytes(&smf(
        0,
        480,
        &[note_track(&[(0, 480, 61), (480, 480, 61), (1920, 480, 61)], 0)],
    ))
    .unwrap();
    let options = MidiOptions {
        key: Some(0),
        ..MidiOptions::from_file(&file)
    };
    let sheet = SheetMusic::new(&file, &options);
    let chords: Vec<_> = sheet.staffs().iter().flat_map(chords_of).collect();
    assert_eq!(chords.len(), 3);
    assert_eq!(chords[0].notes()[0].accid, Accid::Sharp);
    assert_eq!(chords[1].notes()[0].accid, Accid::None);
    assert_eq!(chords[2].notes()[0].accid, Accid::Sharp);
}

// ═══════════════════════════════════════════════════════════════════════
// Serialization for the renderer
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn sheet_serializes_to_json() {
    let sheet = layout(&[(0, 480, 60), (480, 480, 64)]);
    let json = sheetlib::sheet_to_json(&sheet).unwrap();
    assert!(json.contains("\"Chord\""));
    assert!(json.contains("\"Bar\""));
    println!("✓ sheet JSON: {} bytes", json.len());
}
