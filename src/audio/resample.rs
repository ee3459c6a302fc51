//! Converts the fixed sample rate to whatever the output device runs at.

use anyhow::{Context, Result};
use rubato::{InterpolationParameters, InterpolationType, Resampler, SincFixedIn, WindowFunction};

/// Mono resampler that takes input in any size and emits output in fixed chunks.
/// Samples that don't fill a whole chunk are held until the next push or [`Resample::flush`].
pub struct Resample {
    resampler: SincFixedIn<f32>,
    chunk_size: usize,
    pending: Vec<f32>,
}

impl Resample {
    pub fn new(from: u32, to: u32, chunk_size: usize) -> Result<Self> {
        let parameters = InterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: InterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };

        let ratio = to as f64 / from as f64;
        let resampler = SincFixedIn::new(ratio, 2., parameters, chunk_size, 1)
            .context("Failed to create resampler")?;

        Ok(Self {
            resampler,
            chunk_size,
            pending: Vec::with_capacity(chunk_size),
        })
    }

    /// Adds samples, returning the resampled output of every chunk that was filled.
    pub fn push(&mut self, samples: &[f32]) -> Result<Vec<f32>> {
        self.pending.extend_from_slice(samples);

        let mut out = Vec::new();
        while self.pending.len() >= self.chunk_size {
            let chunk = self.pending.drain(..self.chunk_size).collect::<Vec<_>>();
            out.extend(self.process(chunk)?);
        }

        Ok(out)
    }

    /// Pads the held samples with silence and pushes one extra silent chunk
    /// so the filter delay is emptied too.
    pub fn flush(&mut self) -> Result<Vec<f32>> {
        let mut out = Vec::new();
        if !self.pending.is_empty() {
            let mut chunk = std::mem::take(&mut self.pending);
            chunk.resize(self.chunk_size, 0.0);
            out.extend(self.process(chunk)?);
        }

        out.extend(self.process(vec![0.0; self.chunk_size])?);
        Ok(out)
    }

    fn process(&mut self, chunk: Vec<f32>) -> Result<Vec<f32>> {
        let out = self
            .resampler
            .process(&vec![chunk], None)
            .context("Failed to resample audio")?;
        Ok(out.into_iter().next().unwrap_or_default())
    }
}
