//! Standard MIDI File parsing and track reconstruction.
//!
//! `MidiFile::parse` turns raw SMF bytes into reconstructed tracks and
//! a time signature.  The original parse result is pristine: every
//! option-driven transform (`apply_options`, `apply_options_to_events`)
//! clones before changing anything, so options can be re-applied any
//! number of times without re-reading the file.

use crate::error::{MidiError, Result};
use crate::event::*;
use crate::options::MidiOptions;
use crate::reader::MidiFileReader;
use crate::time_signature::TimeSignature;
use crate::track::{Lyric, MidiNote, MidiTrack};

/// A parsed MIDI file: raw events per SMF track, plus the reconstructed
/// note tracks.
#[derive(Debug, Clone)]
pub struct MidiFile {
    /// The raw events of each SMF track chunk
    events: Vec<Vec<MidiEvent>>,
    /// The tracks that contain notes
    tracks: Vec<MidiTrack>,
    /// SMF format: 0 (single track), 1 (simultaneous), 2 (independent)
    track_mode: u16,
    /// The file's time signature
    time: TimeSignature,
    /// Pulses per quarter note
    quarter_note: u32,
    /// The total length of the song, in pulses
    total_pulses: u32,
    /// True when a single multi-channel track was split per channel
    track_per_channel: bool,
}

impl MidiFile {
    /// Parse an SMF byte stream.
    pub fn parse(data: &[u8]) -> Result<MidiFile> {
        let mut file = MidiFileReader::new(data);

        let id = file.read_ascii(4)?;
        if id != "MThd" {
            return Err(MidiError::InvalidFormat {
                message: format!("bad MThd header tag {id:?}"),
                offset: file.offset() - 4,
            });
        }
        let header_len = file.read_int()?;
        if header_len < 6 {
            return Err(MidiError::InvalidFormat {
                message: format!("bad MThd header length {header_len}"),
                offset: file.offset() - 4,
            });
        }
        let track_mode = file.read_short()?;
        let num_event_tracks = file.read_short()?;
        let quarter_note = u32::from(file.read_short()?);
        file.skip(header_len as usize - 6)?;

        let mut events: Vec<Vec<MidiEvent>> = Vec::with_capacity(num_event_tracks as usize);
        let mut tracks: Vec<MidiTrack> = Vec::new();
        let mut total_pulses: u32 = 0;

        for tracknum in 0..num_event_tracks as usize {
            let track_events = read_track(&mut file)?;
            let track_end = track_events.iter().map(|e| e.start_time).max().unwrap_or(0);
            total_pulses = total_pulses.max(track_end);

            let track = MidiTrack::from_events(&track_events, tracknum, track_end);
            if track.has_notes() {
                tracks.push(track);
            }
            events.push(track_events);
        }

        // A single track mixing channels is really several instruments.
        let mut track_per_channel = false;
        if tracks.len() == 1 && has_multiple_channels(&tracks[0]) {
            let number = tracks[0].number;
            tracks = split_channels(&tracks[0], &events[number]);
            track_per_channel = true;
        }
        check_start_times(&mut tracks);

        // Time signature and tempo come from the first such meta events.
        let mut tempo = 0u32;
        let mut numer = 0u32;
        let mut denom = 0u32;
        for list in &events {
            for event in list {
                if event.metaevent == META_EVENT_TEMPO && tempo == 0 {
                    tempo = event.tempo;
                }
                if event.metaevent == META_EVENT_TIME_SIGNATURE && numer == 0 {
                    numer = u32::from(event.numerator);
                    denom = u32::from(event.denominator);
                }
            }
        }

        let mut midifile = MidiFile {
            events,
            tracks,
            track_mode,
            // Provisional: carries the tempo for measure-length guessing.
            time: TimeSignature::new(4, 4, quarter_note, tempo),
            quarter_note,
            total_pulses,
            track_per_channel,
        };

        if numer == 0 {
            // No time-signature event: infer the measure length from
            // the note-onset gaps.
            (numer, denom) = midifile.guess_time_signature();
        }
        midifile.time = TimeSignature::new(numer, denom, quarter_note, tempo);
        Ok(midifile)
    }

    pub fn tracks(&self) -> &[MidiTrack] {
        &self.tracks
    }

    pub fn events(&self) -> &[Vec<MidiEvent>] {
        &self.events
    }

    pub fn time(&self) -> &TimeSignature {
        &self.time
    }

    pub fn quarter_note(&self) -> u32 {
        self.quarter_note
    }

    pub fn track_mode(&self) -> u16 {
        self.track_mode
    }

    pub fn track_per_channel(&self) -> bool {
        self.track_per_channel
    }

    /// The total length of the song, in pulses.
    pub fn total_pulses(&self) -> u32 {
        self.total_pulses
    }

    /// The time of the last note-off in the file.
    pub fn end_time(&self) -> u32 {
        self.tracks
            .iter()
            .flat_map(|t| t.notes.iter().map(|n| n.end_time()))
            .max()
            .unwrap_or(self.total_pulses)
    }

    pub fn has_lyrics(&self) -> bool {
        self.tracks.iter().any(|t| !t.lyrics.is_empty())
    }

    /// Candidate measure lengths, guessed from gaps between note
    /// onsets.  A silence of at least 23 ms ends a "phrase"; the pulse
    /// distances from the first note to those phrase starts, rounded to
    /// multiples of 4 and within [half a second, four seconds], are the
    /// candidates.
    pub fn guess_measure_length(&self) -> Vec<u32> {
        let tempo = self.time.tempo().max(1);
        let pulses_per_second = (1_000_000.0 / f64::from(tempo) * f64::from(self.quarter_note)) as u32;
        let min_measure = pulses_per_second / 2;
        let max_measure = pulses_per_second * 4;
        let interval = pulses_per_second * 23 / 1000;

        let first_note = self
            .tracks
            .iter()
            .filter_map(|t| t.notes.first())
            .map(|n| n.start_time)
            .min()
            .unwrap_or(0);

        let mut result: Vec<u32> = Vec::new();
        for track in &self.tracks {
            let mut prev_time = 0u32;
            for note in &track.notes {
                if note.start_time.saturating_sub(prev_time) <= interval {
                    continue;
                }
                prev_time = note.start_time;
                let from_first = (note.start_time.saturating_sub(first_note)) / 4 * 4;
                if from_first < min_measure || from_first > max_measure {
                    continue;
                }
                if !result.contains(&from_first) {
                    result.push(from_first);
                }
            }
        }
        result.sort_unstable();
        result
    }

    /// Pick a time signature when the file has no time-signature event:
    /// the smallest guessed measure length that is a whole number of
    /// quarter notes, else 4/4.
    fn guess_time_signature(&self) -> (u32, u32) {
        let quarter = self.quarter_note.max(1);
        for candidate in self.guess_measure_length() {
            if candidate % quarter == 0 {
                let quarters = candidate / quarter;
                if (1..=12).contains(&quarters) {
                    log::info!("guessed measure length {candidate} pulses ({quarters}/4)");
                    return (quarters, 4);
                }
            }
        }
        log::warn!("could not infer a measure length, falling back to 4/4");
        (4, 4)
    }

    /// Apply the sheet-affecting options, producing fresh tracks for
    /// layout.  The parsed tracks are never modified.
    pub fn apply_options(&self, options: &MidiOptions) -> Vec<MidiTrack> {
        let mut tracks: Vec<MidiTrack> = self
            .tracks
            .iter()
            .enumerate()
            .filter(|(i, _)| options.track_shown(*i))
            .map(|(_, t)| t.clone())
            .collect();

        let time = options.time.clone().unwrap_or_else(|| self.time.clone());

        // Round start times so near-simultaneous notes become chords,
        // and stretch durations toward the next onset: the sheet reads
        // better with fewer slivers of rest.
        if options.combine_interval > 0 {
            round_start_times(&mut tracks, options.combine_interval, &time);
        }
        round_durations(&mut tracks, time.quarter());

        if options.two_staffs {
            tracks = combine_to_two_tracks(tracks, time.measure());
        }
        if options.shift_time != 0 {
            shift_time(&mut tracks, options.shift_time);
        }
        if options.transpose != 0 {
            transpose(&mut tracks, options.transpose);
        }
        check_start_times(&mut tracks);
        tracks
    }

    /// Apply the sound-affecting options to cloned raw event lists, for
    /// playback or re-serialization.
    pub fn apply_options_to_events(&self, options: &MidiOptions) -> Vec<Vec<MidiEvent>> {
        let mut lists = self.events.clone();

        if let Some(tempo) = options.tempo {
            set_tempo(&mut lists, tempo);
        }

        for (index, track) in self.tracks.iter().enumerate() {
            let instrument = (!options.use_default_instruments)
                .then(|| options.instruments.get(index).copied())
                .flatten();
            if self.track_per_channel {
                // Display tracks were split out of one event track:
                // address them by channel instead of track number.
                let Some(channel) = track.notes.first().map(|n| n.channel) else {
                    continue;
                };
                for list in lists.iter_mut() {
                    if options.track_muted(index) {
                        list.retain(|e| {
                            e.channel != channel
                                || (e.event_flag != EVENT_NOTE_ON
                                    && e.event_flag != EVENT_NOTE_OFF)
                        });
                    }
                    if let Some(instrument) = instrument {
                        for event in list.iter_mut() {
                            if event.event_flag == EVENT_PROGRAM_CHANGE && event.channel == channel
                            {
                                event.instrument = instrument as u8 & 0x7F;
                            }
                        }
                    }
                }
            } else {
                let list = &mut lists[track.number];
                if options.track_muted(index) {
                    list.retain(|e| {
                        e.event_flag != EVENT_NOTE_ON && e.event_flag != EVENT_NOTE_OFF
                    });
                }
                if let Some(instrument) = instrument {
                    set_instrument(list, instrument as u8 & 0x7F);
                }
            }
        }

        if options.transpose != 0 {
            for list in &mut lists {
                for event in list.iter_mut() {
                    if event.event_flag == EVENT_NOTE_ON || event.event_flag == EVENT_NOTE_OFF {
                        event.note_number =
                            (i32::from(event.note_number) + options.transpose).clamp(0, 127) as u8;
                    }
                }
            }
        }

        if options.pause_time > 0 {
            for list in &mut lists {
                start_at_pause_time(list, options.pause_time);
            }
        }

        lists
    }

    /// Re-serialize event lists to SMF bytes.  Events keep their fields
    /// verbatim, so writing and re-parsing reconstructs identical
    /// tracks for anything the options did not touch.
    pub fn write_events(lists: &[Vec<MidiEvent>], track_mode: u16, quarter_note: u32) -> Vec<u8> {
        let mut out = Vec::new();

        out.extend_from_slice(b"MThd");
        out.extend_from_slice(&6u32.to_be_bytes());
        out.extend_from_slice(&track_mode.to_be_bytes());
        out.extend_from_slice(&(lists.len() as u16).to_be_bytes());
        out.extend_from_slice(&(quarter_note as u16).to_be_bytes());

        for list in lists {
            let data = encode_track(list);
            out.extend_from_slice(b"MTrk");
            out.extend_from_slice(&(data.len() as u32).to_be_bytes());
            out.extend_from_slice(&data);
        }
        out
    }

    /// Serialize this file's own events, with the given options applied.
    pub fn write_with_options(&self, options: &MidiOptions) -> Vec<u8> {
        let lists = self.apply_options_to_events(options);
        MidiFile::write_events(&lists, self.track_mode, self.quarter_note)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Track chunk decoding
// ═══════════════════════════════════════════════════════════════════════

/// Decode one MTrk chunk into its event list.
fn read_track(file: &mut MidiFileReader) -> Result<Vec<MidiEvent>> {
    let id = file.read_ascii(4)?;
    if id != "MTrk" {
        return Err(MidiError::InvalidFormat {
            message: format!("bad MTrk header tag {id:?}"),
            offset: file.offset() - 4,
        });
    }
    let track_len = file.read_int()? as usize;
    let track_end = file.offset() + track_len;

    let mut events: Vec<MidiEvent> = Vec::new();
    let mut start_time: u32 = 0;
    let mut running_status: u8 = 0;

    while file.offset() < track_end {
        let delta = file.read_varlen()?;
        start_time += delta;
        let event = read_event(file, start_time, delta, running_status)?;

        // Meta and sysex events cancel the running status.
        running_status = match event.event_flag {
            META_EVENT | SYSEX_EVENT_1 | SYSEX_EVENT_2 => 0,
            flag => flag | event.channel,
        };

        let end_of_track = event.metaevent == META_EVENT_END_OF_TRACK;
        events.push(event);
        if end_of_track {
            break;
        }
    }

    if file.offset() < track_end {
        // Padding after the end-of-track marker.
        file.skip(track_end - file.offset())?;
    } else if file.offset() > track_end {
        return Err(MidiError::InvalidFormat {
            message: "track events overrun the declared chunk length".to_string(),
            offset: file.offset(),
        });
    }
    Ok(events)
}

// ═══════════════════════════════════════════════════════════════════════
// Track transforms
// ═══════════════════════════════════════════════════════════════════════

/// Whether a track plays notes on more than one channel.
pub fn has_multiple_channels(track: &MidiTrack) -> bool {
    let Some(first) = track.notes.first() else {
        return false;
    };
    track.notes.iter().any(|n| n.channel != first.channel)
}

/// Split a multi-channel track into one track per channel, carrying the
/// per-channel program-change instruments from the raw events.
pub fn split_channels(origtrack: &MidiTrack, events: &[MidiEvent]) -> Vec<MidiTrack> {
    let mut channel_instruments = [0i32; 16];
    for event in events {
        if event.event_flag == EVENT_PROGRAM_CHANGE {
            channel_instruments[event.channel as usize] = i32::from(event.instrument);
        }
    }
    channel_instruments[9] = 128; // percussion

    let mut result: Vec<MidiTrack> = Vec::new();
    for note in &origtrack.notes {
        let existing = result
            .iter_mut()
            .find(|t| t.notes.first().map(|n| n.channel) == Some(note.channel));
        match existing {
            Some(track) => track.add_note(*note),
            None => {
                let mut track = MidiTrack::new(result.len());
                track.instrument = channel_instruments[note.channel as usize];
                track.add_note(*note);
                result.push(track);
            }
        }
    }
    if let Some(first) = result.first_mut() {
        first.lyrics = origtrack.lyrics.clone();
    }
    result
}

/// Merge all tracks into a single track ordered by start time.
/// Duplicate (start, number) pairs collapse to the longer duration.
pub fn combine_to_single_track(tracks: &[MidiTrack]) -> MidiTrack {
    let mut result = MidiTrack::new(0);
    if let Some(first) = tracks.first() {
        result.instrument = first.instrument;
    }
    for track in tracks {
        for note in &track.notes {
            result.add_note(*note);
        }
        result.lyrics.extend(track.lyrics.iter().cloned());
    }
    result.sort_notes();
    result.lyrics.sort_by_key(|l| l.start_time);

    let mut deduped: Vec<MidiNote> = Vec::with_capacity(result.notes.len());
    for note in result.notes {
        match deduped
            .last_mut()
            .filter(|prev| prev.start_time == note.start_time && prev.number == note.number)
        {
            Some(prev) => prev.duration = prev.duration.max(note.duration),
            None => deduped.push(note),
        }
    }
    result.notes = deduped;
    result
}

/// The highest and lowest note numbers that sound during
/// [start, end) within the measure containing `start`.
fn find_high_low_notes(
    notes: &[MidiNote],
    measure_len: u32,
    start_index: usize,
    start: u32,
    end: u32,
    high: &mut i32,
    low: &mut i32,
) {
    let measure = start / measure_len.max(1);
    let mut i = start_index;
    while i < notes.len() && notes[i].start_time < end {
        let note = &notes[i];
        i += 1;
        if note.end_time() < start {
            continue;
        }
        if note.start_time / measure_len.max(1) != measure {
            continue;
        }
        *high = (*high).max(note.number);
        *low = (*low).min(note.number);
    }
}

/// The highest and lowest note numbers starting exactly at `start`.
fn find_exact_high_low_notes(
    notes: &[MidiNote],
    start_index: usize,
    start: u32,
    high: &mut i32,
    low: &mut i32,
) {
    let mut i = start_index;
    while i < notes.len() && notes[i].start_time < start {
        i += 1;
    }
    while i < notes.len() && notes[i].start_time == start {
        *high = (*high).max(notes[i].number);
        *low = (*low).min(notes[i].number);
        i += 1;
    }
}

/// Split one track into treble and bass tracks, sending each note to
/// the hand it most plausibly belongs to.
///
/// A note more than an octave below the highest simultaneous note (or
/// above the lowest) goes to the nearer extreme; otherwise it follows
/// whichever hand last played nearby, so the split does not flip on
/// every note.
pub fn split_track(track: &MidiTrack, measure_len: u32) -> Vec<MidiTrack> {
    let notes = &track.notes;

    let mut top = MidiTrack::new(0);
    let mut bottom = MidiTrack::new(1);
    top.instrument = track.instrument;
    bottom.instrument = track.instrument;

    // Previous-hand anchors: top of the treble staff, bottom of bass.
    let mut prev_high: i32 = 76;
    let mut prev_low: i32 = 45;
    let mut start_index = 0usize;

    for note in notes {
        let number = note.number;
        let mut high = number;
        let mut low = number;
        let mut high_exact = number;
        let mut low_exact = number;

        while notes[start_index].end_time() < note.start_time {
            start_index += 1;
        }

        find_high_low_notes(
            notes,
            measure_len,
            start_index,
            note.start_time,
            note.end_time(),
            &mut high,
            &mut low,
        );
        find_exact_high_low_notes(notes, start_index, note.start_time, &mut high_exact, &mut low_exact);

        let add_top = if high_exact - number > 12 || number - low_exact > 12 {
            high_exact - number <= number - low_exact
        } else if high - number > 12 || number - low > 12 {
            high - number <= number - low
        } else {
            (number - prev_high).abs() < (number - prev_low).abs()
        };

        if add_top {
            prev_high = number;
            top.add_note(*note);
        } else {
            prev_low = number;
            bottom.add_note(*note);
        }
    }

    top.lyrics = track.lyrics.clone();
    vec![top, bottom]
}

/// Combine the tracks into a two-staff grand staff: merge everything
/// into one track, then split it into treble and bass by pitch.
pub fn combine_to_two_tracks(tracks: Vec<MidiTrack>, measure_len: u32) -> Vec<MidiTrack> {
    if tracks.is_empty() {
        return tracks;
    }
    let single = combine_to_single_track(&tracks);
    let lyrics = single.lyrics.clone();
    let mut result = split_track(&single, measure_len);
    result[0].lyrics = lyrics;
    result[1].lyrics.clear();
    result
}

/// Re-sort every track's notes by (start time, note number).  The
/// transforms keep this ordering themselves; this is the defensive
/// barrier the layout pipeline relies on.
pub fn check_start_times(tracks: &mut [MidiTrack]) {
    for track in tracks {
        track.sort_notes();
    }
}

/// Cluster note onsets that fall within `millisec` of each other so
/// they render as one chord.
pub fn round_start_times(tracks: &mut [MidiTrack], millisec: u32, time: &TimeSignature) {
    let interval = (u64::from(time.quarter()) * u64::from(millisec) * 1000
        / u64::from(time.tempo().max(1))) as u32;

    let mut starts: Vec<u32> = tracks
        .iter()
        .flat_map(|t| t.notes.iter().map(|n| n.start_time))
        .collect();
    starts.sort_unstable();
    starts.dedup();

    // Map each onset to the representative of its cluster: an onset
    // within `interval` of the previous onset's representative joins
    // that cluster.
    let mut representative: Vec<u32> = Vec::with_capacity(starts.len());
    for &start in &starts {
        match representative.last().copied() {
            Some(rep) if start - rep <= interval => representative.push(rep),
            _ => representative.push(start),
        }
    }

    for track in tracks {
        for note in track.notes.iter_mut() {
            if let Ok(index) = starts.binary_search(&note.start_time) {
                let rounded = representative[index];
                note.duration += note.start_time - rounded;
                note.start_time = rounded;
            }
        }
        track.sort_notes();
    }
}

/// Stretch note durations up toward the next onset, so short performed
/// notes render as full symbols rather than note-plus-rest slivers.
/// Equal-duration back-to-back notes are left alone: they may beam.
pub fn round_durations(tracks: &mut [MidiTrack], quarter_note: u32) {
    for track in tracks {
        let notes = &mut track.notes;
        let mut prev: Option<MidiNote> = None;
        for i in 0..notes.len() {
            let note = notes[i];
            let prev_note = prev.unwrap_or(note);

            // The next note with a later start time bounds the stretch.
            let next_start = notes[i + 1..]
                .iter()
                .find(|n| n.start_time > note.start_time)
                .map(|n| n.start_time);
            let Some(next_start) = next_start else {
                continue;
            };
            let max_duration = next_start - note.start_time;

            let mut duration = 0;
            for candidate in [quarter_note, quarter_note / 2, quarter_note / 3, quarter_note / 4] {
                if candidate <= max_duration {
                    duration = candidate;
                    break;
                }
            }
            let mut duration = duration.max(note.duration);

            // Two consecutive equal durations can pair under a beam;
            // keep them as performed.
            if prev_note.start_time + prev_note.duration == note.start_time
                && prev_note.duration == note.duration
            {
                duration = note.duration;
            }
            notes[i].duration = duration;
            if notes
                .get(i + 1)
                .map(|n| n.start_time != note.start_time)
                .unwrap_or(true)
            {
                prev = Some(notes[i]);
            }
        }
    }
}

/// Shift every note's start time by `amount` pulses (clamped at zero).
pub fn shift_time(tracks: &mut [MidiTrack], amount: i32) {
    for track in tracks {
        for note in track.notes.iter_mut() {
            note.start_time = (i64::from(note.start_time) + i64::from(amount)).max(0) as u32;
        }
        for lyric in track.lyrics.iter_mut() {
            lyric.start_time = (i64::from(lyric.start_time) + i64::from(amount)).max(0) as u32;
        }
    }
}

/// Transpose every note by `amount` semitones (clamped to 0..=127).
pub fn transpose(tracks: &mut [MidiTrack], amount: i32) {
    for track in tracks {
        for note in track.notes.iter_mut() {
            note.number = (note.number + amount).clamp(0, 127);
        }
    }
}

/// All lyrics across the given tracks, in time order.
pub fn gather_lyrics(tracks: &[MidiTrack]) -> Vec<Lyric> {
    let mut lyrics: Vec<Lyric> = tracks
        .iter()
        .flat_map(|t| t.lyrics.iter().cloned())
        .collect();
    lyrics.sort_by_key(|l| l.start_time);
    lyrics
}

// ═══════════════════════════════════════════════════════════════════════
// Event-list edits (sound options)
// ═══════════════════════════════════════════════════════════════════════

/// Replace every tempo meta event's value, inserting one at time zero
/// if the list has none.
fn set_tempo(lists: &mut [Vec<MidiEvent>], tempo: u32) {
    let mut found = false;
    for list in lists.iter_mut() {
        for event in list.iter_mut() {
            if event.metaevent == META_EVENT_TEMPO {
                event.tempo = tempo;
                event.metavalue = vec![
                    ((tempo >> 16) & 0xFF) as u8,
                    ((tempo >> 8) & 0xFF) as u8,
                    (tempo & 0xFF) as u8,
                ];
                found = true;
            }
        }
    }
    if !found {
        if let Some(list) = lists.first_mut() {
            list.insert(
                0,
                MidiEvent {
                    event_flag: META_EVENT,
                    metaevent: META_EVENT_TEMPO,
                    tempo,
                    metavalue: vec![
                        ((tempo >> 16) & 0xFF) as u8,
                        ((tempo >> 8) & 0xFF) as u8,
                        (tempo & 0xFF) as u8,
                    ],
                    ..MidiEvent::default()
                },
            );
        }
    }
}

/// Override the program-change instrument, inserting one at time zero
/// if the track never changes program.
fn set_instrument(list: &mut Vec<MidiEvent>, instrument: u8) {
    let channel = list
        .iter()
        .find(|e| e.event_flag == EVENT_NOTE_ON)
        .map(|e| e.channel)
        .unwrap_or(0);
    let mut found = false;
    for event in list.iter_mut() {
        if event.event_flag == EVENT_PROGRAM_CHANGE {
            event.instrument = instrument;
            found = true;
        }
    }
    if !found {
        list.insert(
            0,
            MidiEvent {
                event_flag: EVENT_PROGRAM_CHANGE,
                channel,
                instrument,
                ..MidiEvent::default()
            },
        );
    }
}

/// Drop note events before `pause_time` and re-base the remaining
/// events so playback starts there.
fn start_at_pause_time(list: &mut Vec<MidiEvent>, pause_time: u32) {
    list.retain(|event| {
        event.start_time >= pause_time
            || (event.event_flag != EVENT_NOTE_ON && event.event_flag != EVENT_NOTE_OFF)
    });
    for event in list.iter_mut() {
        event.start_time = event.start_time.saturating_sub(pause_time);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// SMF byte encoding
// ═══════════════════════════════════════════════════════════════════════

/// Encode one track's events as MTrk chunk data (delta-time encoded).
fn encode_track(events: &[MidiEvent]) -> Vec<u8> {
    let mut data = Vec::new();
    let mut last_time: u32 = 0;
    let mut wrote_end = false;

    for event in events {
        let delta = event.start_time.saturating_sub(last_time);
        write_vlq(&mut data, delta);
        last_time = event.start_time;

        match event.event_flag {
            META_EVENT => {
                data.push(META_EVENT);
                data.push(event.metaevent);
                write_vlq(&mut data, event.metavalue.len() as u32);
                data.extend_from_slice(&event.metavalue);
                if event.metaevent == META_EVENT_END_OF_TRACK {
                    wrote_end = true;
                }
            }
            SYSEX_EVENT_1 | SYSEX_EVENT_2 => {
                data.push(event.event_flag);
                write_vlq(&mut data, event.metavalue.len() as u32);
                data.extend_from_slice(&event.metavalue);
            }
            flag => {
                data.push(flag | event.channel);
                match flag {
                    EVENT_NOTE_ON | EVENT_NOTE_OFF => {
                        data.push(event.note_number);
                        data.push(event.velocity);
                    }
                    EVENT_KEY_PRESSURE => {
                        data.push(event.note_number);
                        data.push(event.key_pressure);
                    }
                    EVENT_CONTROL_CHANGE => {
                        data.push(event.control_num);
                        data.push(event.control_value);
                    }
                    EVENT_PROGRAM_CHANGE => {
                        data.push(event.instrument);
                    }
                    EVENT_CHANNEL_PRESSURE => {
                        data.push(event.chan_pressure);
                    }
                    EVENT_PITCH_BEND => {
                        data.extend_from_slice(&event.pitch_bend.to_be_bytes());
                    }
                    _ => {}
                }
            }
        }
    }

    if !wrote_end {
        data.extend_from_slice(&[0x00, META_EVENT, META_EVENT_END_OF_TRACK, 0x00]);
    }
    data
}

/// Write a variable-length quantity.
fn write_vlq(out: &mut Vec<u8>, mut value: u32) {
    if value == 0 {
        out.push(0);
        return;
    }
    let mut buf = [0u8; 5];
    let mut i = 0;
    while value > 0 {
        buf[i] = (value & 0x7F) as u8;
        value >>= 7;
        if i > 0 {
            buf[i] |= 0x80;
        }
        i += 1;
    }
    for j in (0..i).rev() {
        out.push(buf[j]);
    }
}
