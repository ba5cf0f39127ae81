//! Reconstructed tracks: notes with durations, lyrics, instruments.
//!
//! A track is built once from its raw event list and is read-only
//! afterwards; the option-driven transforms in `file.rs` always clone
//! before changing anything.

use serde::{Deserialize, Serialize};

use crate::event::{
    MidiEvent, EVENT_NOTE_OFF, EVENT_NOTE_ON, EVENT_PROGRAM_CHANGE, META_EVENT_LYRIC,
};

/// A note with a resolved duration, in pulses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiNote {
    /// The start time, in pulses
    pub start_time: u32,
    /// The duration, in pulses
    pub duration: u32,
    /// The channel the note plays on
    pub channel: u8,
    /// The note number, 0 to 127.  Middle C is 60
    pub number: i32,
}

impl MidiNote {
    pub fn end_time(&self) -> u32 {
        self.start_time + self.duration
    }
}

/// A lyric syllable attached to a pulse time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lyric {
    pub start_time: u32,
    pub text: String,
}

/// One track of the MIDI file: its notes in time order, plus the
/// instrument and any lyrics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MidiTrack {
    /// The track number
    pub number: usize,
    /// The notes, ordered by start time, ties broken by note number
    pub notes: Vec<MidiNote>,
    /// The General MIDI instrument id (128 = percussion)
    pub instrument: i32,
    /// The lyrics in this track
    pub lyrics: Vec<Lyric>,
}

impl MidiTrack {
    pub fn new(number: usize) -> MidiTrack {
        MidiTrack {
            number,
            ..MidiTrack::default()
        }
    }

    /// Reconstruct a track from its decoded event list.
    ///
    /// NoteOn events with velocity 0 act as NoteOffs.  A NoteOff closes
    /// the oldest still-open note with the same channel and number, so
    /// overlapping repetitions of one key resolve first-on/first-off.
    /// Notes left open at the end of the track extend to `track_end`.
    pub fn from_events(events: &[MidiEvent], number: usize, track_end: u32) -> MidiTrack {
        let mut track = MidiTrack::new(number);
        for event in events {
            if event.event_flag == EVENT_NOTE_ON && event.velocity > 0 {
                track.notes.push(MidiNote {
                    start_time: event.start_time,
                    duration: 0,
                    channel: event.channel,
                    number: i32::from(event.note_number),
                });
            } else if event.event_flag == EVENT_NOTE_ON && event.velocity == 0 {
                track.note_off(event.channel, i32::from(event.note_number), event.start_time);
            } else if event.event_flag == EVENT_NOTE_OFF {
                track.note_off(event.channel, i32::from(event.note_number), event.start_time);
            } else if event.event_flag == EVENT_PROGRAM_CHANGE {
                track.instrument = i32::from(event.instrument);
            } else if event.metaevent == META_EVENT_LYRIC {
                track.add_lyric(event);
            }
        }
        let open = track.close_open_notes(track_end);
        if open > 0 {
            log::warn!(
                "track {}: {} unpaired note-on event(s) extended to track end",
                number,
                open
            );
        }
        if track.notes.first().map(|n| n.channel) == Some(9) {
            track.instrument = 128; // percussion
        }
        track
    }

    /// Close the oldest open note matching channel and number.
    fn note_off(&mut self, channel: u8, number: i32, end_time: u32) {
        for note in self.notes.iter_mut() {
            if note.channel == channel && note.number == number && note.duration == 0 {
                note.duration = end_time.saturating_sub(note.start_time);
                return;
            }
        }
    }

    /// Give any still-open notes a duration reaching the track end.
    /// Returns how many notes were open.
    fn close_open_notes(&mut self, track_end: u32) -> usize {
        let mut open = 0;
        for note in self.notes.iter_mut() {
            if note.duration == 0 {
                note.duration = track_end.saturating_sub(note.start_time);
                open += 1;
            }
        }
        open
    }

    pub fn add_note(&mut self, note: MidiNote) {
        self.notes.push(note);
    }

    fn add_lyric(&mut self, event: &MidiEvent) {
        let text = String::from_utf8_lossy(&event.metavalue).trim().to_string();
        if !text.is_empty() {
            self.lyrics.push(Lyric {
                start_time: event.start_time,
                text,
            });
        }
    }

    pub fn has_notes(&self) -> bool {
        !self.notes.is_empty()
    }

    /// Sort the notes by start time, ties broken by note number.
    pub fn sort_notes(&mut self) {
        self.notes
            .sort_by_key(|note| (note.start_time, note.number));
    }

    /// The General MIDI name of this track's instrument.
    pub fn instrument_name(&self) -> &'static str {
        if (0..=128).contains(&self.instrument) {
            INSTRUMENT_NAMES[self.instrument as usize]
        } else {
            ""
        }
    }
}

/// The General MIDI instrument names; index 128 is the percussion
/// pseudo-instrument used for channel 9.
pub const INSTRUMENT_NAMES: [&str; 129] = [
    "Acoustic Grand Piano",
    "Bright Acoustic Piano",
    "Electric Grand Piano",
    "Honky-tonk Piano",
    "Electric Piano 1",
    "Electric Piano 2",
    "Harpsichord",
    "Clavinet",
    "Celesta",
    "Glockenspiel",
    "Music Box",
    "Vibraphone",
    "Marimba",
    "Xylophone",
    "Tubular Bells",
    "Dulcimer",
    "Drawbar Organ",
    "Percussive Organ",
    "Rock Organ",
    "Church Organ",
    "Reed Organ",
    "Accordion",
    "Harmonica",
    "Tango Accordion",
    "Acoustic Guitar (nylon)",
    "Acoustic Guitar (steel)",
    "Electric Guitar (jazz)",
    "Electric Guitar (clean)",
    "Electric Guitar (muted)",
    "Overdriven Guitar",
    "Distortion Guitar",
    "Guitar harmonics",
    "Acoustic Bass",
    "Electric Bass (finger)",
    "Electric Bass (pick)",
    "Fretless Bass",
    "Slap Bass 1",
    "Slap Bass 2",
    "Synth Bass 1",
    "Synth Bass 2",
    "Violin",
    "Viola",
    "Cello",
    "Contrabass",
    "Tremolo Strings",
    "Pizzicato Strings",
    "Orchestral Harp",
    "Timpani",
    "String Ensemble 1",
    "String Ensemble 2",
    "SynthStrings 1",
    "SynthStrings 2",
    "Choir Aahs",
    "Voice Oohs",
    "Synth Voice",
    "Orchestra Hit",
    "Trumpet",
    "Trombone",
    "Tuba",
    "Muted Trumpet",
    "French Horn",
    "Brass Section",
    "SynthBrass 1",
    "SynthBrass 2",
    "Soprano Sax",
    "Alto Sax",
    "Tenor Sax",
    "Baritone Sax",
    "Oboe",
    "English Horn",
    "Bassoon",
    "Clarinet",
    "Piccolo",
    "Flute",
    "Recorder",
    "Pan Flute",
    "Blown Bottle",
    "Shakuhachi",
    "Whistle",
    "Ocarina",
    "Lead 1 (square)",
    "Lead 2 (sawtooth)",
    "Lead 3 (calliope)",
    "Lead 4 (chiff)",
    "Lead 5 (charang)",
    "Lead 6 (voice)",
    "Lead 7 (fifths)",
    "Lead 8 (bass + lead)",
    "Pad 1 (new age)",
    "Pad 2 (warm)",
    "Pad 3 (polysynth)",
    "Pad 4 (choir)",
    "Pad 5 (bowed)",
    "Pad 6 (metallic)",
    "Pad 7 (halo)",
    "Pad 8 (sweep)",
    "FX 1 (rain)",
    "FX 2 (soundtrack)",
    "FX 3 (crystal)",
    "FX 4 (atmosphere)",
    "FX 5 (brightness)",
    "FX 6 (goblins)",
    "FX 7 (echoes)",
    "FX 8 (sci-fi)",
    "Sitar",
    "Banjo",
    "Shamisen",
    "Koto",
    "Kalimba",
    "Bag pipe",
    "Fiddle",
    "Shanai",
    "Tinkle Bell",
    "Agogo",
    "Steel Drums",
    "Woodblock",
    "Taiko Drum",
    "Melodic Tom",
    "Synth Drum",
    "Reverse Cymbal",
    "Guitar Fret Noise",
    "Breath Noise",
    "Seashore",
    "Bird Tweet",
    "Telephone Ring",
    "Helicopter",
    "Applause",
    "Gunshot",
    "Percussion",
];
