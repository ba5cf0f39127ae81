//! Integration tests for the MIDI parsing pipeline: header and track
//! decoding, track reconstruction, option transforms, and the
//! serialization round trip.

use pretty_assertions::assert_eq;

use sheetlib::error::MidiError;
use sheetlib::file::MidiFile;
use sheetlib::{parse_bytes, MidiNote, MidiOptions};

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

/// Build one MTrk chunk from (delta, event bytes) pairs, appending the
/// end-of-track marker.
fn track_chunk(events: &[(u32, &[u8])]) -> Vec<u8> {
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

/// Build a complete SMF byte stream.
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

// ═══════════════════════════════════════════════════════════════════════
// Parsing
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn single_note_reconstruction() {
    // NoteOn(ch0, 60, vel 64) at t=0, NoteOff at t=480.
    let track = track_chunk(&[(0, &[0x90, 60, 64]), (480, &[0x80, 60, 0])]);
    let file = parse_bytes(&smf(0, 480, &[track])).unwrap();

    assert_eq!(file.tracks().len(), 1);
    assert_eq!(
        file.tracks()[0].notes,
        vec![MidiNote {
            start_time: 0,
            duration: 480,
            channel: 0,
            number: 60
        }]
    );
    assert_eq!(file.quarter_note(), 480);
    assert_eq!(file.time().numerator(), 4);
    assert_eq!(file.time().denominator(), 4);
    println!("✓ single note: {:?}", file.tracks()[0].notes[0]);
}

#[test]
fn running_status_is_reused() {
    // Three note-ons sharing one status byte, then their note-offs
    // (as zero-velocity note-ons, still under running status).
    let track = track_chunk(&[
        (0, &[0x90, 60, 64]),
        (0, &[64, 64]),
        (0, &[67, 64]),
        (480, &[60, 0]),
        (0, &[64, 0]),
        (0, &[67, 0]),
    ]);
    let file = parse_bytes(&smf(0, 480, &[track])).unwrap();
    let notes = &file.tracks()[0].notes;
    assert_eq!(notes.len(), 3);
    assert!(notes.iter().all(|n| n.duration == 480));
}

#[test]
fn tempo_and_time_signature_meta_events() {
    let track = track_chunk(&[
        (0, &[0xFF, 0x58, 0x04, 3, 2, 24, 8]), // 3/4
        (0, &[0xFF, 0x51, 0x03, 0x0F, 0x42, 0x40]), // 1,000,000 usec
        (0, &[0x90, 60, 64]),
        (480, &[0x80, 60, 0]),
    ]);
    let file = parse_bytes(&smf(0, 480, &[track])).unwrap();
    assert_eq!(file.time().numerator(), 3);
    assert_eq!(file.time().denominator(), 4);
    assert_eq!(file.time().tempo(), 1_000_000);
    assert_eq!(file.time().measure(), 480 * 3);
}

#[test]
fn multi_channel_track_splits_per_channel() {
    let track = track_chunk(&[
        (0, &[0xC1, 32]), // channel 1 plays bass
        (0, &[0x90, 72, 64]),
        (0, &[0x91, 40, 64]),
        (480, &[0x80, 72, 0]),
        (0, &[0x81, 40, 0]),
    ]);
    let file = parse_bytes(&smf(0, 480, &[track])).unwrap();
    assert!(file.track_per_channel());
    assert_eq!(file.tracks().len(), 2);
    assert_eq!(file.tracks()[0].notes[0].channel, 0);
    assert_eq!(file.tracks()[1].notes[0].channel, 1);
    assert_eq!(file.tracks()[1].instrument, 32);
}

#[test]
fn notes_are_sorted_and_non_negative() {
    let track = track_chunk(&[
        (100, &[0x90, 72, 64]),
        (0, &[0x90, 60, 64]),
        (380, &[0x80, 72, 0]),
        (0, &[0x80, 60, 0]),
    ]);
    let file = parse_bytes(&smf(0, 480, &[track])).unwrap();
    let notes = &file.tracks()[0].notes;
    for pair in notes.windows(2) {
        assert!(
            (pair[0].start_time, pair[0].number) <= (pair[1].start_time, pair[1].number)
        );
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Structural errors
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn bad_header_tag_is_invalid_format() {
    let mut data = smf(0, 480, &[track_chunk(&[(0, &[0x90, 60, 64])])]);
    data[0] = b'X';
    match parse_bytes(&data) {
        Err(MidiError::InvalidFormat { offset, .. }) => assert_eq!(offset, 0),
        other => panic!("expected InvalidFormat, got {:?}", other),
    }
}

#[test]
fn bad_track_tag_is_invalid_format() {
    let mut track = track_chunk(&[(0, &[0x90, 60, 64])]);
    track[0] = b'X';
    match parse_bytes(&smf(0, 480, &[track])) {
        Err(MidiError::InvalidFormat { .. }) => {}
        other => panic!("expected InvalidFormat, got {:?}", other),
    }
}

#[test]
fn truncated_track_is_fatal() {
    let mut data = smf(0, 480, &[track_chunk(&[(0, &[0x90, 60, 64]), (480, &[0x80, 60, 0])])]);
    data.truncate(data.len() - 6);
    match parse_bytes(&data) {
        Err(MidiError::TruncatedData { .. }) => {}
        other => panic!("expected TruncatedData, got {:?}", other),
    }
}

#[test]
fn missing_running_status_is_fatal() {
    // A data byte in status position with no prior status byte.
    let track = track_chunk(&[(0, &[60, 64])]);
    match parse_bytes(&smf(0, 480, &[track])) {
        Err(MidiError::MissingRunningStatus { byte: 60, .. }) => {}
        other => panic!("expected MissingRunningStatus, got {:?}", other),
    }
}

#[test]
fn unpaired_note_on_recovers_to_track_end() {
    let track = track_chunk(&[
        (0, &[0x90, 60, 64]),
        (0, &[0x90, 64, 64]), // never released
        (480, &[0x80, 60, 0]),
    ]);
    let file = parse_bytes(&smf(0, 480, &[track])).unwrap();
    let open = file.tracks()[0]
        .notes
        .iter()
        .find(|n| n.number == 64)
        .unwrap();
    assert_eq!(open.duration, 480);
}

// ═══════════════════════════════════════════════════════════════════════
// Round trip
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn serialize_then_reparse_is_identity() {
    let tracks = vec![
        track_chunk(&[
            (0, &[0xFF, 0x58, 0x04, 4, 2, 24, 8]),
            (0, &[0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20]),
        ]),
        track_chunk(&[
            (0, &[0xC0, 25]),
            (0, &[0x90, 60, 64]),
            (240, &[0x80, 60, 0]),
            (0, &[0x90, 62, 80]),
            (240, &[0x80, 62, 0]),
            (480, &[0x90, 64, 96]),
            (960, &[0x80, 64, 0]),
        ]),
    ];
    let original = parse_bytes(&smf(1, 480, &tracks)).unwrap();

    let written = MidiFile::write_events(
        original.events(),
        original.track_mode(),
        original.quarter_note(),
    );
    let reparsed = parse_bytes(&written).unwrap();

    assert_eq!(original.tracks().len(), reparsed.tracks().len());
    for (a, b) in original.tracks().iter().zip(reparsed.tracks()) {
        assert_eq!(a.notes, b.notes);
        assert_eq!(a.instrument, b.instrument);
    }
    assert_eq!(original.time(), reparsed.time());
    println!(
        "✓ round trip: {} bytes in, {} bytes out",
        smf(1, 480, &tracks).len(),
        written.len()
    );
}

#[test]
fn double_round_trip_is_stable() {
    let tracks = vec![track_chunk(&[
        (0, &[0x90, 60, 64]),
        (480, &[0x80, 60, 0]),
    ])];
    let first = parse_bytes(&smf(0, 480, &tracks)).unwrap();
    let bytes1 = MidiFile::write_events(first.events(), first.track_mode(), first.quarter_note());
    let second = parse_bytes(&bytes1).unwrap();
    let bytes2 =
        MidiFile::write_events(second.events(), second.track_mode(), second.quarter_note());
    assert_eq!(bytes1, bytes2);
}

// ═══════════════════════════════════════════════════════════════════════
// Option transforms
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn transforms_never_touch_the_parsed_file() {
    let track = track_chunk(&[(0, &[0x90, 60, 64]), (480, &[0x80, 60, 0])]);
    let file = parse_bytes(&smf(0, 480, &[track])).unwrap();

    let options = MidiOptions {
        transpose: 12,
        shift_time: 960,
        ..MidiOptions::from_file(&file)
    };
    let transformed = file.apply_options(&options);
    assert_eq!(transformed[0].notes[0].number, 72);
    assert_eq!(transformed[0].notes[0].start_time, 960);

    // Re-applying different options starts from the pristine parse.
    let again = file.apply_options(&MidiOptions::from_file(&file));
    assert_eq!(again[0].notes[0].number, 60);
    assert_eq!(again[0].notes[0].start_time, 0);
    assert_eq!(file.tracks()[0].notes[0].number, 60);
}

#[test]
fn muted_track_loses_its_note_events() {
    let tracks = vec![
        track_chunk(&[(0, &[0x90, 60, 64]), (480, &[0x80, 60, 0])]),
        track_chunk(&[(0, &[0x91, 40, 64]), (480, &[0x81, 40, 0])]),
    ];
    let file = parse_bytes(&smf(1, 480, &tracks)).unwrap();

    let mut options = MidiOptions::from_file(&file);
    options.mute[1] = true;
    let lists = file.apply_options_to_events(&options);

    let written = MidiFile::write_events(&lists, file.track_mode(), file.quarter_note());
    let reparsed = parse_bytes(&written).unwrap();
    assert_eq!(reparsed.tracks().len(), 1);
    assert_eq!(reparsed.tracks()[0].notes[0].number, 60);
}

#[test]
fn tempo_override_is_serialized() {
    let track = track_chunk(&[(0, &[0x90, 60, 64]), (480, &[0x80, 60, 0])]);
    let file = parse_bytes(&smf(0, 480, &[track])).unwrap();

    let options = MidiOptions {
        tempo: Some(250_000),
        ..MidiOptions::from_file(&file)
    };
    let written = file.write_with_options(&options);
    let reparsed = parse_bytes(&written).unwrap();
    assert_eq!(reparsed.time().tempo(), 250_000);
}

#[test]
fn combine_to_two_tracks_splits_hands() {
    // One track alternating between a low and a high register.
    let mut events: Vec<(u32, Vec<u8>)> = Vec::new();
    for i in 0..8u32 {
        let high = 72 + (i % 3) as u8;
        let low = 45 + (i % 2) as u8;
        let delta = if i == 0 { 0 } else { 240 };
        events.push((delta, vec![0x90, high, 64]));
        events.push((0, vec![0x90, low, 64]));
        events.push((240, vec![0x80, high, 0]));
        events.push((0, vec![0x80, low, 0]));
    }
    // Durations and rests keep this well-formed; rebuild as slices.
    let event_refs: Vec<(u32, &[u8])> = events
        .iter()
        .map(|(d, b)| (*d, b.as_slice()))
        .collect();
    let track = track_chunk(&event_refs);
    let file = parse_bytes(&smf(0, 480, &[track])).unwrap();

    let options = MidiOptions {
        two_staffs: true,
        ..MidiOptions::from_file(&file)
    };
    let tracks = file.apply_options(&options);
    assert_eq!(tracks.len(), 2);
    assert!(tracks[0].notes.iter().all(|n| n.number >= 72));
    assert!(tracks[1].notes.iter().all(|n| n.number <= 46));
}
