//! Time signatures and the pulse → note-duration mapping.

use serde::{Deserialize, Serialize};

/// The musical note durations a symbol can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NoteDuration {
    ThirtySecond,
    Sixteenth,
    Triplet,
    Eighth,
    DottedEighth,
    Quarter,
    DottedQuarter,
    Half,
    DottedHalf,
    Whole,
}

impl NoteDuration {
    /// Display name, e.g. for diagnostics and note letters.
    pub fn name(self) -> &'static str {
        match self {
            NoteDuration::ThirtySecond => "ThirtySecond",
            NoteDuration::Sixteenth => "Sixteenth",
            NoteDuration::Triplet => "Triplet",
            NoteDuration::Eighth => "Eighth",
            NoteDuration::DottedEighth => "DottedEighth",
            NoteDuration::Quarter => "Quarter",
            NoteDuration::DottedQuarter => "DottedQuarter",
            NoteDuration::Half => "Half",
            NoteDuration::DottedHalf => "DottedHalf",
            NoteDuration::Whole => "Whole",
        }
    }
}

/// A time signature: how many pulses make a quarter note, a measure,
/// and how fast a quarter note plays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    numerator: u32,
    denominator: u32,
    /// Pulses per quarter note
    quarter: u32,
    /// Pulses per measure
    measure: u32,
    /// Microseconds per quarter note
    tempo: u32,
}

/// Default tempo: 120 beats per minute.
pub const DEFAULT_TEMPO: u32 = 500_000;

impl TimeSignature {
    /// Create a time signature.  Invalid numerators/denominators fall
    /// back to 4/4 so layout can always proceed (logged, not fatal).
    pub fn new(numerator: u32, denominator: u32, quarter: u32, tempo: u32) -> TimeSignature {
        let (numerator, denominator) = if numerator == 0
            || denominator == 0
            || !denominator.is_power_of_two()
            || denominator > 32
        {
            log::warn!(
                "unsupported time signature {}/{}, falling back to 4/4",
                numerator,
                denominator
            );
            (4, 4)
        } else {
            (numerator, denominator)
        };
        let tempo = if tempo == 0 { DEFAULT_TEMPO } else { tempo };
        let measure = numerator * quarter * 4 / denominator;
        TimeSignature {
            numerator,
            denominator,
            quarter,
            measure,
            tempo,
        }
    }

    pub fn numerator(&self) -> u32 {
        self.numerator
    }

    pub fn denominator(&self) -> u32 {
        self.denominator
    }

    /// Pulses per quarter note.
    pub fn quarter(&self) -> u32 {
        self.quarter
    }

    /// Pulses per measure.
    pub fn measure(&self) -> u32 {
        self.measure
    }

    /// Microseconds per quarter note.
    pub fn tempo(&self) -> u32 {
        self.tempo
    }

    /// Which measure (0-based) the given pulse time falls in.
    pub fn get_measure(&self, time: u32) -> u32 {
        time / self.measure
    }

    /// Map a duration in pulses to the closest drawable note duration.
    ///
    /// The thresholds sit just below each exact duration so that notes
    /// shortened by a human performance (or by `round_durations`) still
    /// land on the intended symbol.
    pub fn get_note_duration(&self, pulses: u32) -> NoteDuration {
        let whole = self.quarter * 4;
        if pulses >= 28 * whole / 32 {
            NoteDuration::Whole
        } else if pulses >= 20 * whole / 32 {
            NoteDuration::DottedHalf
        } else if pulses >= 14 * whole / 32 {
            NoteDuration::Half
        } else if pulses >= 10 * whole / 32 {
            NoteDuration::DottedQuarter
        } else if pulses >= 7 * whole / 32 {
            NoteDuration::Quarter
        } else if pulses >= 5 * whole / 32 {
            NoteDuration::DottedEighth
        } else if pulses >= 6 * whole / 64 {
            NoteDuration::Eighth
        } else if pulses >= 5 * whole / 64 {
            NoteDuration::Triplet
        } else if pulses >= 3 * whole / 64 {
            NoteDuration::Sixteenth
        } else {
            NoteDuration::ThirtySecond
        }
    }

    /// The exact pulse length of a note duration.
    pub fn duration_to_time(&self, duration: NoteDuration) -> u32 {
        let eighth = self.quarter / 2;
        let sixteenth = self.quarter / 4;
        match duration {
            NoteDuration::Whole => self.quarter * 4,
            NoteDuration::DottedHalf => self.quarter * 3,
            NoteDuration::Half => self.quarter * 2,
            NoteDuration::DottedQuarter => 3 * eighth,
            NoteDuration::Quarter => self.quarter,
            NoteDuration::DottedEighth => 3 * sixteenth,
            NoteDuration::Eighth => eighth,
            NoteDuration::Triplet => self.quarter / 3,
            NoteDuration::Sixteenth => sixteenth,
            NoteDuration::ThirtySecond => sixteenth / 2,
        }
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        TimeSignature::new(4, 4, 480, DEFAULT_TEMPO)
    }
}

impl std::fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} quarter={} measure={} tempo={}",
            self.numerator, self.denominator, self.quarter, self.measure, self.tempo
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_length_follows_denominator() {
        assert_eq!(TimeSignature::new(4, 4, 480, 500_000).measure(), 1920);
        assert_eq!(TimeSignature::new(3, 4, 480, 500_000).measure(), 1440);
        assert_eq!(TimeSignature::new(6, 8, 480, 500_000).measure(), 1440);
        assert_eq!(TimeSignature::new(2, 2, 480, 500_000).measure(), 1920);
    }

    #[test]
    fn invalid_signature_falls_back_to_common_time() {
        let time = TimeSignature::new(0, 5, 480, 500_000);
        assert_eq!(time.numerator(), 4);
        assert_eq!(time.denominator(), 4);
    }

    #[test]
    fn note_durations_round_trip_through_pulses() {
        let time = TimeSignature::new(4, 4, 480, 500_000);
        for dur in [
            NoteDuration::ThirtySecond,
            NoteDuration::Sixteenth,
            NoteDuration::Triplet,
            NoteDuration::Eighth,
            NoteDuration::DottedEighth,
            NoteDuration::Quarter,
            NoteDuration::DottedQuarter,
            NoteDuration::Half,
            NoteDuration::DottedHalf,
            NoteDuration::Whole,
        ] {
            let pulses = time.duration_to_time(dur);
            assert_eq!(time.get_note_duration(pulses), dur, "duration {:?}", dur);
        }
    }

    #[test]
    fn slightly_short_quarter_still_reads_as_quarter() {
        let time = TimeSignature::new(4, 4, 480, 500_000);
        assert_eq!(time.get_note_duration(460), NoteDuration::Quarter);
    }
}
