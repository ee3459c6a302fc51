use std::f64::consts::PI;

use super::note::{Pitch, MEASURE_LENGTH_SEC, SAMPLE_RATE};

const MAX_VOLUME: f64 = 127.0;

/// Sine wave at a fixed frequency, quantized to signed 8-bit samples.
#[derive(Clone, Copy, Debug)]
pub struct Tone {
    i: usize,
    tone: f64,
    sample_rate: f64,
    duration: Option<usize>,
}

/// One measure of precomputed samples for every [`Pitch`].
/// Built once before playback and only read afterwards.
pub struct ToneTable {
    samples: Vec<Box<[i8]>>,
}

impl Tone {
    pub fn new(tone: f64, sample_rate: u32) -> Self {
        Self {
            i: 0,
            tone,
            sample_rate: sample_rate as f64,
            duration: None,
        }
    }

    pub fn duration(mut self, duration: usize) -> Self {
        self.duration = Some(duration);
        self
    }
}

impl Iterator for Tone {
    type Item = i8;

    fn next(&mut self) -> Option<Self::Item> {
        match self.duration {
            Some(i) if self.i >= i => return None,
            _ => {}
        }

        let val = (self.i as f64 * self.tone * 2.0 * PI / self.sample_rate).sin();
        self.i += 1;

        Some((val * MAX_VOLUME).round() as i8)
    }
}

impl ToneTable {
    /// Length of every buffer in the table.
    pub const LENGTH: usize = (SAMPLE_RATE * MEASURE_LENGTH_SEC) as usize;

    pub fn new() -> Self {
        Self {
            samples: Pitch::ALL.iter().map(|&x| generate(x)).collect(),
        }
    }

    pub fn sample(&self, pitch: Pitch) -> &[i8] {
        &self.samples[pitch.ordinal()]
    }
}

impl Default for ToneTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Generates one measure of samples for a pitch.
/// Rests are all zeros.
pub fn generate(pitch: Pitch) -> Box<[i8]> {
    match pitch.frequency() {
        Some(freq) => Tone::new(freq, SAMPLE_RATE)
            .duration(ToneTable::LENGTH)
            .collect(),
        None => vec![0; ToneTable::LENGTH].into_boxed_slice(),
    }
}
