//! Pitches, note lengths and the fixed time base everything is played at.

/// Samples per second of every generated buffer (~48KHz).
pub const SAMPLE_RATE: u32 = 48 * 1024;
/// Real time length of one measure.
pub const MEASURE_LENGTH_SEC: u32 = 1;
/// Number of silent samples written after every note.
pub const REST_GAP: usize = 50;

const FREQUENCY_A_HZ: f64 = 440.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pitch {
    Rest,
    A4,
    A4S,
    B4,
    C4,
    C4S,
    D4,
    D4S,
    E4,
    F4,
    F4S,
    G4,
    G4S,
    A5,
}

/// Length of a note as a fraction of one measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Duration {
    Whole,
    Half,
    Quarter,
    Eighth,
}

/// One entry of a melody.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    pub pitch: Pitch,
    pub duration: Duration,
}

impl Pitch {
    /// Every pitch in ordinal order, rest first.
    pub const ALL: [Pitch; 14] = [
        Pitch::Rest,
        Pitch::A4,
        Pitch::A4S,
        Pitch::B4,
        Pitch::C4,
        Pitch::C4S,
        Pitch::D4,
        Pitch::D4S,
        Pitch::E4,
        Pitch::F4,
        Pitch::F4S,
        Pitch::G4,
        Pitch::G4S,
        Pitch::A5,
    ];

    pub const fn ordinal(self) -> usize {
        self as usize
    }

    /// Half steps up from A4, or None for a rest.
    pub const fn half_steps_from_a(self) -> Option<i32> {
        match self {
            Pitch::Rest => None,
            _ => Some(self as i32 - 1),
        }
    }

    /// Frequency in Hz, derived with equal temperament from A4 = 440Hz.
    pub fn frequency(self) -> Option<f64> {
        let steps = self.half_steps_from_a()?;
        Some(FREQUENCY_A_HZ * 2_f64.powf(steps as f64 / 12.0))
    }
}

impl Duration {
    pub const fn fraction(self) -> f64 {
        match self {
            Duration::Whole => 1.0,
            Duration::Half => 0.5,
            Duration::Quarter => 0.25,
            Duration::Eighth => 0.125,
        }
    }

    /// Playback time in milliseconds at the fixed measure length.
    pub fn time_ms(self) -> u32 {
        (self.fraction() * MEASURE_LENGTH_SEC as f64 * 1000.0) as u32
    }
}

impl NoteEvent {
    pub const fn new(pitch: Pitch, duration: Duration) -> Self {
        Self { pitch, duration }
    }
}
