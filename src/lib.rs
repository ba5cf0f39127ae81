//! sheetlib — MIDI parser and sheet music layout library.
//!
//! Parses Standard MIDI Files (format 0/1/2) into reconstructed note
//! tracks, and lays the tracks out as sheet music: staves of clefs, key
//! signatures, chords, rests, bar lines, and beams, width-aligned so
//! that simultaneous events line up vertically across staves.  The
//! result is a finished symbol graph; rendering it to pixels is the
//! caller's concern.
//!
//! # Example
//! ```no_run
//! use sheetlib::{parse_file, MidiOptions, SheetMusic};
//!
//! let midifile = parse_file("path/to/song.mid").unwrap();
//! println!("Tracks: {}", midifile.tracks().len());
//! println!("Time: {}", midifile.time());
//!
//! let options = MidiOptions::from_file(&midifile);
//! let sheet = SheetMusic::new(&midifile, &options);
//! println!("Staffs: {}", sheet.staffs().len());
//! ```

pub mod clef;
pub mod error;
pub mod event;
pub mod file;
pub mod key_signature;
pub mod options;
pub mod reader;
pub mod sheet;
pub mod time_signature;
pub mod track;
pub mod white_note;

#[cfg(target_os = "android")]
pub mod android;

use std::path::Path;

pub use clef::{Clef, ClefMeasures};
pub use error::MidiError;
pub use event::MidiEvent;
pub use file::MidiFile;
pub use key_signature::{Accid, AccidState, KeySignature};
pub use options::MidiOptions;
pub use sheet::{ChordSymbol, MusicSymbol, SheetMusic, Staff, Stem, StemDir};
pub use time_signature::{NoteDuration, TimeSignature};
pub use track::{Lyric, MidiNote, MidiTrack};
pub use white_note::WhiteNote;

/// Parse a MIDI file from a file path.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<MidiFile, MidiError> {
    let data = std::fs::read(path)?;
    MidiFile::parse(&data)
}

/// Parse a MIDI file from raw bytes.
pub fn parse_bytes(data: &[u8]) -> Result<MidiFile, MidiError> {
    MidiFile::parse(data)
}

/// Convert a laid-out sheet to a JSON string.
/// Useful for passing the symbol graph across FFI boundaries.
pub fn sheet_to_json(sheet: &SheetMusic) -> Result<String, String> {
    serde_json::to_string_pretty(sheet).map_err(|e| format!("JSON serialization error: {e}"))
}

/// Parse a MIDI file and lay it out under default options, as JSON.
/// Convenience function combining parsing and layout.
pub fn layout_file_to_json<P: AsRef<Path>>(path: P) -> Result<String, String> {
    let midifile = parse_file(path).map_err(|e| e.to_string())?;
    let options = MidiOptions::from_file(&midifile);
    let sheet = SheetMusic::new(&midifile, &options);
    sheet_to_json(&sheet)
}

/// Parse MIDI bytes and lay them out under default options, as JSON.
pub fn layout_bytes_to_json(data: &[u8]) -> Result<String, String> {
    let midifile = parse_bytes(data).map_err(|e| e.to_string())?;
    let options = MidiOptions::from_file(&midifile);
    let sheet = SheetMusic::new(&midifile, &options);
    sheet_to_json(&sheet)
}

// ═══════════════════════════════════════════════════════════════════════
// C FFI — for iOS (static library) and Android (JNI)
// ═══════════════════════════════════════════════════════════════════════

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

/// Parse a MIDI file and return the sheet layout as a JSON C string.
/// The caller must free the returned string with `sheetlib_free_string`.
///
/// # Safety
/// `path` must be a valid null-terminated UTF-8 C string.
#[no_mangle]
pub unsafe extern "C" fn sheetlib_layout_file(path: *const c_char) -> *mut c_char {
    if path.is_null() {
        return std::ptr::null_mut();
    }
    let c_str = unsafe { CStr::from_ptr(path) };
    let path_str = match c_str.to_str() {
        Ok(s) => s,
        Err(_) => return std::ptr::null_mut(),
    };

    match layout_file_to_json(path_str) {
        Ok(json) => CString::new(json).unwrap_or_default().into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Parse MIDI bytes and return the sheet layout as a JSON C string.
/// The caller must free the returned string with `sheetlib_free_string`.
///
/// # Safety
/// `data` must point to `len` valid bytes.
#[no_mangle]
pub unsafe extern "C" fn sheetlib_layout_bytes(data: *const u8, len: usize) -> *mut c_char {
    if data.is_null() || len == 0 {
        return std::ptr::null_mut();
    }
    let bytes = unsafe { std::slice::from_raw_parts(data, len) };

    match layout_bytes_to_json(bytes) {
        Ok(json) => CString::new(json).unwrap_or_default().into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Free a string previously returned by sheetlib functions.
///
/// # Safety
/// `ptr` must be a string previously returned by a sheetlib function,
/// or null.
#[no_mangle]
pub unsafe extern "C" fn sheetlib_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            let _ = CString::from_raw(ptr);
        }
    }
}
