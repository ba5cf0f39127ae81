//! Error taxonomy for MIDI parsing.
//!
//! Structural errors are fatal for the whole file and carry the byte
//! offset where they were detected.  Layout-time anomalies (unpaired
//! notes, measure-length inference failure, rejected beam runs) are not
//! errors: each has a defined fallback and the layout pipeline never
//! fails once parsing has succeeded.

use thiserror::Error;

/// Result alias for parse operations.
pub type Result<T> = std::result::Result<T, MidiError>;

/// Fatal errors raised while decoding a Standard MIDI File.
#[derive(Debug, Error)]
pub enum MidiError {
    /// The buffer ran out before a declared length was satisfied.
    #[error("truncated midi data at offset {offset}")]
    TruncatedData { offset: usize },

    /// A variable-length quantity used more than 4 continuation bytes.
    #[error("malformed variable-length value at offset {offset}")]
    MalformedVarLen { offset: usize },

    /// A data byte appeared in status position with no prior status byte.
    #[error("data byte {byte:#04x} with no running status at offset {offset}")]
    MissingRunningStatus { byte: u8, offset: usize },

    /// A chunk tag or header field did not match the SMF format.
    #[error("invalid midi format at offset {offset}: {message}")]
    InvalidFormat { message: String, offset: usize },

    /// The file could not be read from disk.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl MidiError {
    /// The byte offset where the error was detected, if any.
    pub fn offset(&self) -> Option<usize> {
        match self {
            MidiError::TruncatedData { offset }
            | MidiError::MalformedVarLen { offset }
            | MidiError::MissingRunningStatus { offset, .. }
            | MidiError::InvalidFormat { offset, .. } => Some(*offset),
            MidiError::Io(_) => None,
        }
    }
}
