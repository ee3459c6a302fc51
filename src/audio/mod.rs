//! Audio utilities.
//! Tone generation, sequencing and device output.

pub mod devices;
pub mod note;
pub mod resample;
pub mod sequence;
pub mod tone;
