//! Raw MIDI events and the single-event decoder.
//!
//! `MidiEvent` is a flat record covering every channel-voice, meta, and
//! sysex event the parser understands.  Events are immutable once
//! decoded; the option transforms clone entire event lists rather than
//! editing them in place.

use crate::error::{MidiError, Result};
use crate::reader::MidiFileReader;

// ── Channel-voice status bytes (channel in the low nibble) ──────────
pub const EVENT_NOTE_OFF: u8 = 0x80;
pub const EVENT_NOTE_ON: u8 = 0x90;
pub const EVENT_KEY_PRESSURE: u8 = 0xA0;
pub const EVENT_CONTROL_CHANGE: u8 = 0xB0;
pub const EVENT_PROGRAM_CHANGE: u8 = 0xC0;
pub const EVENT_CHANNEL_PRESSURE: u8 = 0xD0;
pub const EVENT_PITCH_BEND: u8 = 0xE0;
pub const SYSEX_EVENT_1: u8 = 0xF0;
pub const SYSEX_EVENT_2: u8 = 0xF7;
pub const META_EVENT: u8 = 0xFF;

// ── Meta event sub-types ────────────────────────────────────────────
pub const META_EVENT_SEQUENCE: u8 = 0x0;
pub const META_EVENT_TEXT: u8 = 0x1;
pub const META_EVENT_COPYRIGHT: u8 = 0x2;
pub const META_EVENT_SEQUENCE_NAME: u8 = 0x3;
pub const META_EVENT_INSTRUMENT: u8 = 0x4;
pub const META_EVENT_LYRIC: u8 = 0x5;
pub const META_EVENT_MARKER: u8 = 0x6;
pub const META_EVENT_END_OF_TRACK: u8 = 0x2F;
pub const META_EVENT_TEMPO: u8 = 0x51;
pub const META_EVENT_SMPTE_OFFSET: u8 = 0x54;
pub const META_EVENT_TIME_SIGNATURE: u8 = 0x58;
pub const META_EVENT_KEY_SIGNATURE: u8 = 0x59;

/// One decoded MIDI event.
///
/// The fields populated depend on `event_flag` (and `metaevent` for meta
/// events); unused fields stay zero/empty.  `has_event_flag` records
/// whether the status byte was present in the stream or reused from the
/// running status, which keeps re-serialization byte-faithful.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MidiEvent {
    /// Pulses between the previous event and this one
    pub delta_time: u32,
    /// Absolute time of this event, in pulses
    pub start_time: u32,
    /// False if this event reused the previous event's status byte
    pub has_event_flag: bool,
    /// NoteOn, NoteOff, etc.
    pub event_flag: u8,
    /// The channel this event occurs on
    pub channel: u8,

    pub note_number: u8,
    pub velocity: u8,
    pub instrument: u8,
    pub key_pressure: u8,
    pub chan_pressure: u8,
    pub control_num: u8,
    pub control_value: u8,
    pub pitch_bend: u16,
    /// Numerator, for time-signature meta events
    pub numerator: u8,
    /// Denominator, for time-signature meta events
    pub denominator: u8,
    /// Microseconds per quarter note, for tempo meta events
    pub tempo: u32,
    /// The meta event sub-type, when `event_flag` is `META_EVENT`
    pub metaevent: u8,
    /// Raw payload bytes for meta and sysex events
    pub metavalue: Vec<u8>,
}

/// Decode one event from the stream.
///
/// `running_status` is the status byte of the previous event on this
/// track (0 when no event has been decoded yet).  A data byte in status
/// position reuses it; if there is nothing to reuse the stream is
/// unrecoverable and decoding fails with `MissingRunningStatus`.
pub fn read_event(
    file: &mut MidiFileReader,
    start_time: u32,
    delta_time: u32,
    running_status: u8,
) -> Result<MidiEvent> {
    let mut event = MidiEvent {
        delta_time,
        start_time,
        ..MidiEvent::default()
    };

    let peek = file.peek()?;
    let status = if peek & 0x80 != 0 {
        event.has_event_flag = true;
        file.read_byte()?
    } else if running_status == 0 {
        return Err(MidiError::MissingRunningStatus {
            byte: peek,
            offset: file.offset(),
        });
    } else {
        running_status
    };

    if status < SYSEX_EVENT_1 {
        event.event_flag = status & 0xF0;
        event.channel = status & 0x0F;
    } else {
        event.event_flag = status;
    }

    match event.event_flag {
        EVENT_NOTE_ON => {
            event.note_number = file.read_byte()?;
            event.velocity = file.read_byte()?;
        }
        EVENT_NOTE_OFF => {
            event.note_number = file.read_byte()?;
            event.velocity = file.read_byte()?;
        }
        EVENT_KEY_PRESSURE => {
            event.note_number = file.read_byte()?;
            event.key_pressure = file.read_byte()?;
        }
        EVENT_CONTROL_CHANGE => {
            event.control_num = file.read_byte()?;
            event.control_value = file.read_byte()?;
        }
        EVENT_PROGRAM_CHANGE => {
            event.instrument = file.read_byte()?;
        }
        EVENT_CHANNEL_PRESSURE => {
            event.chan_pressure = file.read_byte()?;
        }
        EVENT_PITCH_BEND => {
            event.pitch_bend = file.read_short()?;
        }
        SYSEX_EVENT_1 | SYSEX_EVENT_2 => {
            let len = file.read_varlen()? as usize;
            event.metavalue = file.read_bytes(len)?.to_vec();
        }
        META_EVENT => {
            event.metaevent = file.read_byte()?;
            let len = file.read_varlen()? as usize;
            event.metavalue = file.read_bytes(len)?.to_vec();
            match event.metaevent {
                META_EVENT_TIME_SIGNATURE if event.metavalue.len() >= 2 => {
                    event.numerator = event.metavalue[0];
                    event.denominator = 2u8.saturating_pow(u32::from(event.metavalue[1]));
                }
                META_EVENT_TEMPO if event.metavalue.len() >= 3 => {
                    event.tempo = (u32::from(event.metavalue[0]) << 16)
                        | (u32::from(event.metavalue[1]) << 8)
                        | u32::from(event.metavalue[2]);
                }
                _ => {}
            }
        }
        unknown => {
            return Err(MidiError::InvalidFormat {
                message: format!("unknown midi event {unknown:#04x}"),
                offset: file.offset(),
            });
        }
    }

    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8], running: u8) -> Result<MidiEvent> {
        let mut reader = MidiFileReader::new(bytes);
        read_event(&mut reader, 0, 0, running)
    }

    #[test]
    fn note_on_with_status() {
        let event = decode(&[0x93, 60, 64], 0).unwrap();
        assert_eq!(event.event_flag, EVENT_NOTE_ON);
        assert_eq!(event.channel, 3);
        assert_eq!(event.note_number, 60);
        assert_eq!(event.velocity, 64);
        assert!(event.has_event_flag);
    }

    #[test]
    fn running_status_reuses_previous_flag() {
        let event = decode(&[62, 80], 0x90).unwrap();
        assert_eq!(event.event_flag, EVENT_NOTE_ON);
        assert_eq!(event.channel, 0);
        assert_eq!(event.note_number, 62);
        assert_eq!(event.velocity, 80);
        assert!(!event.has_event_flag);
    }

    #[test]
    fn data_byte_without_running_status_fails() {
        match decode(&[62, 80], 0) {
            Err(MidiError::MissingRunningStatus { byte, .. }) => assert_eq!(byte, 62),
            other => panic!("expected MissingRunningStatus, got {:?}", other),
        }
    }

    #[test]
    fn tempo_meta_event() {
        // FF 51 03 07 A1 20 = 500000 microseconds per quarter
        let event = decode(&[0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20], 0).unwrap();
        assert_eq!(event.event_flag, META_EVENT);
        assert_eq!(event.metaevent, META_EVENT_TEMPO);
        assert_eq!(event.tempo, 500_000);
    }

    #[test]
    fn time_signature_meta_event() {
        // 6/8: denominator stored as log2
        let event = decode(&[0xFF, 0x58, 0x04, 6, 3, 24, 8], 0).unwrap();
        assert_eq!(event.numerator, 6);
        assert_eq!(event.denominator, 8);
    }

    #[test]
    fn meta_length_overrunning_buffer_is_truncated() {
        match decode(&[0xFF, 0x05, 0x10, b'h', b'i'], 0) {
            Err(MidiError::TruncatedData { .. }) => {}
            other => panic!("expected TruncatedData, got {:?}", other),
        }
    }
}
