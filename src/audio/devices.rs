//! Contains [`DeviceSink`], the [`Sink`] that plays through a cpal output device.
//! Samples are handed to the audio callback through a bounded queue,
//! so writes block once the device falls behind.

use std::{
    collections::VecDeque,
    error::Error,
    fmt::{self, Display},
    sync::Arc,
    time::Duration,
};

use anyhow::{bail, Result};
use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    Device, FromSample, Host, Sample, SampleFormat, SizedSample, Stream, StreamConfig,
    StreamError, SupportedStreamConfig,
};
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Condvar, Mutex};

use super::{note::SAMPLE_RATE, resample::Resample, sequence::Sink};
use crate::misc::Similarity;

/// Time in seconds of audio that can be queued before writes start blocking.
const BUFFER_SIZE: f32 = 250.0 / 1000.0;
/// Input chunk size used when the device needs resampling.
const RESAMPLE_CHUNK: usize = 1024;
/// How long to wait on the callback before checking for stream errors again.
const POLL: Duration = Duration::from_millis(100);

/// The output device could not be opened or started.
#[derive(Debug)]
pub struct DeviceUnavailable(pub String);

impl Display for DeviceUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Audio output device unavailable: {}", self.0)
    }
}

impl Error for DeviceUnavailable {}

/// Settings used when opening a [`DeviceSink`].
pub struct SinkOptions {
    /// Name of the device to use, or `default`.
    /// Picked by string similarity (dice coefficient) to the available device names.
    pub device: String,
    /// Gain applied to the samples as they are converted for the device.
    pub gain: f32,
}

/// Queue shared between the writer and the audio callback.
struct Shared {
    capacity: usize,
    queue: Mutex<Queue>,
    cond: Condvar,
}

struct Queue {
    samples: VecDeque<f32>,
    /// Number of callbacks that have run so far.
    callbacks: usize,
}

/// Plays samples on an output device.
/// The stream is stopped and released when this is dropped.
pub struct DeviceSink {
    // == Settings ==
    gain: f32,

    // == Systems ==
    shared: Arc<Shared>,
    resample: Option<Resample>,
    errors: Receiver<StreamError>,
    _stream: Stream,
}

impl Shared {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            queue: Mutex::new(Queue {
                samples: VecDeque::new(),
                callbacks: 0,
            }),
            cond: Condvar::new(),
        }
    }

    /// Adds samples to the queue, waiting for the callback to make room when it is full.
    fn push(&self, mut samples: &[f32], errors: &Receiver<StreamError>) -> Result<()> {
        check_errors(errors)?;

        let mut queue = self.queue.lock();
        while !samples.is_empty() {
            let room = self.capacity.saturating_sub(queue.samples.len());
            if room == 0 {
                check_errors(errors)?;
                self.cond.wait_for(&mut queue, POLL);
                continue;
            }

            let take = room.min(samples.len());
            queue.samples.extend(&samples[..take]);
            samples = &samples[take..];
        }

        Ok(())
    }

    /// Called from the audio callback.
    /// Sends the same sample to every channel of a frame, silence once the queue is empty.
    fn fill<T: Sample + FromSample<f32>>(&self, data: &mut [T], channels: usize) {
        let mut queue = self.queue.lock();
        let mut last = 0.0;
        for (i, e) in data.iter_mut().enumerate() {
            if i % channels == 0 {
                last = queue.samples.pop_front().unwrap_or(0.0);
            }

            *e = T::from_sample(last);
        }

        queue.callbacks += 1;
        drop(queue);
        self.cond.notify_all();
    }

    /// Waits for the queue to empty, then for one more callback so the
    /// last samples have been handed to the device.
    fn wait_drained(&self, errors: &Receiver<StreamError>) -> Result<()> {
        let mut queue = self.queue.lock();
        while !queue.samples.is_empty() {
            check_errors(errors)?;
            self.cond.wait_for(&mut queue, POLL);
        }

        let seen = queue.callbacks;
        while queue.callbacks <= seen {
            check_errors(errors)?;
            self.cond.wait_for(&mut queue, POLL);
        }

        Ok(())
    }
}

fn check_errors(errors: &Receiver<StreamError>) -> Result<()> {
    if let Ok(err) = errors.try_recv() {
        bail!("Output stream failed: {err}");
    }

    Ok(())
}

impl DeviceSink {
    pub fn open(options: &SinkOptions) -> Result<Self, DeviceUnavailable> {
        let host = cpal::default_host();
        let device = get_device(&host, &options.device)?;
        let name = device.name().unwrap_or_else(|_| "Unknown".to_owned());
        let config = get_config(&device)?;
        let sample_rate = config.sample_rate().0;

        log::info!(
            "Output hooked into `{name}` ({sample_rate}Hz, {} channels, {:?})",
            config.channels(),
            config.sample_format()
        );

        let resample = match sample_rate {
            SAMPLE_RATE => None,
            _ => {
                log::info!("Resampling from {SAMPLE_RATE}Hz to {sample_rate}Hz");
                Some(
                    Resample::new(SAMPLE_RATE, sample_rate, RESAMPLE_CHUNK)
                        .map_err(|e| DeviceUnavailable(e.to_string()))?,
                )
            }
        };

        let shared = Arc::new(Shared::new((sample_rate as f32 * BUFFER_SIZE) as usize));
        let (tx, errors) = channel::unbounded();

        let c = config.config();
        let s = shared.clone();
        let stream = match config.sample_format() {
            SampleFormat::I8 => build_stream::<i8>(&device, &c, s, tx),
            SampleFormat::I16 => build_stream::<i16>(&device, &c, s, tx),
            SampleFormat::I32 => build_stream::<i32>(&device, &c, s, tx),
            SampleFormat::I64 => build_stream::<i64>(&device, &c, s, tx),
            SampleFormat::U8 => build_stream::<u8>(&device, &c, s, tx),
            SampleFormat::U16 => build_stream::<u16>(&device, &c, s, tx),
            SampleFormat::U32 => build_stream::<u32>(&device, &c, s, tx),
            SampleFormat::U64 => build_stream::<u64>(&device, &c, s, tx),
            SampleFormat::F32 => build_stream::<f32>(&device, &c, s, tx),
            SampleFormat::F64 => build_stream::<f64>(&device, &c, s, tx),
            format => {
                return Err(DeviceUnavailable(format!(
                    "Unsupported sample format {format:?}"
                )))
            }
        }
        .map_err(|e| DeviceUnavailable(e.to_string()))?;

        stream
            .play()
            .map_err(|e| DeviceUnavailable(e.to_string()))?;

        Ok(Self {
            gain: options.gain,
            shared,
            resample,
            errors,
            _stream: stream,
        })
    }
}

impl Sink for DeviceSink {
    fn write(&mut self, samples: &[i8]) -> Result<usize> {
        let gain = self.gain;
        let converted = samples
            .iter()
            .map(|&x| x as f32 / i8::MAX as f32 * gain)
            .collect::<Vec<_>>();

        match &mut self.resample {
            Some(resample) => {
                let out = resample.push(&converted)?;
                self.shared.push(&out, &self.errors)?;
            }
            None => self.shared.push(&converted, &self.errors)?,
        }

        Ok(samples.len())
    }

    fn drain(&mut self) -> Result<()> {
        if let Some(resample) = &mut self.resample {
            let out = resample.flush()?;
            self.shared.push(&out, &self.errors)?;
        }

        self.shared.wait_drained(&self.errors)
    }
}

impl Drop for DeviceSink {
    fn drop(&mut self) {
        log::debug!("Closing output stream");
    }
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    shared: Arc<Shared>,
    errors: Sender<StreamError>,
) -> Result<Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    device.build_output_stream(
        config,
        move |data: &mut [T], _info: &cpal::OutputCallbackInfo| shared.fill(data, channels),
        move |err| {
            log::error!("Output stream error: {err}");
            let _ = errors.send(err);
        },
        None,
    )
}

/// Picks the output device, either the host default or the one with the name
/// most similar to `wanted`.
fn get_device(host: &Host, wanted: &str) -> Result<Device, DeviceUnavailable> {
    let wanted = wanted.to_lowercase();
    if wanted == "default" {
        return host
            .default_output_device()
            .ok_or_else(|| DeviceUnavailable("No default output device".to_owned()));
    }

    let comp_name = |dev: &Device| {
        dev.name()
            .map(|x| x.to_lowercase().similarity(&wanted))
            .unwrap_or(0.0)
    };

    host.output_devices()
        .map_err(|e| DeviceUnavailable(e.to_string()))?
        .map(|x| (comp_name(&x), x))
        .reduce(|a, b| if a.0 > b.0 { a } else { b })
        .map(|x| x.1)
        .ok_or_else(|| DeviceUnavailable("No output device found".to_owned()))
}

/// Every format [`DeviceSink::open`] can build a stream for.
fn is_playable(format: SampleFormat) -> bool {
    use SampleFormat::*;
    matches!(
        format,
        I8 | I16 | I32 | I64 | U8 | U16 | U32 | U64 | F32 | F64
    )
}

/// Uses a config that runs at [`SAMPLE_RATE`] if the device has one,
/// otherwise falls back to its default config.
fn get_config(device: &Device) -> Result<SupportedStreamConfig, DeviceUnavailable> {
    let rate = cpal::SampleRate(SAMPLE_RATE);
    let exact = device.supported_output_configs().ok().and_then(|mut x| {
        x.find(|c| {
            c.min_sample_rate() <= rate
                && c.max_sample_rate() >= rate
                && is_playable(c.sample_format())
        })
    });

    match exact {
        Some(config) => Ok(config.with_sample_rate(rate)),
        None => device
            .default_output_config()
            .map_err(|e| DeviceUnavailable(e.to_string())),
    }
}

/// Names of every output device on the default host.
pub fn list_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    Ok(host
        .output_devices()?
        .map(|x| x.name().unwrap_or_else(|_| "Unknown".to_owned()))
        .collect())
}

#[cfg(test)]
mod test {
    use std::{sync::Arc, thread, time::Duration};

    use cpal::{SampleFormat, StreamError};
    use crossbeam::channel;

    use super::{is_playable, DeviceUnavailable, Shared};

    const SETTLE: Duration = Duration::from_millis(50);

    #[test]
    fn test_device_unavailable_message() {
        let err = DeviceUnavailable("No default output device".to_owned());
        assert_eq!(
            err.to_string(),
            "Audio output device unavailable: No default output device"
        );
    }

    #[test]
    fn test_every_format_playable() {
        for format in [
            SampleFormat::I8,
            SampleFormat::I16,
            SampleFormat::I32,
            SampleFormat::I64,
            SampleFormat::U8,
            SampleFormat::U16,
            SampleFormat::U32,
            SampleFormat::U64,
            SampleFormat::F32,
            SampleFormat::F64,
        ] {
            assert!(is_playable(format), "{format:?}");
        }
    }

    #[test]
    fn test_fill_every_channel() {
        let (_tx, errors) = channel::unbounded();
        let shared = Shared::new(16);
        shared.push(&[0.5, -0.5], &errors).unwrap();

        let mut data = [1.0_f32; 6];
        shared.fill(&mut data, 2);
        assert_eq!(data, [0.5, 0.5, -0.5, -0.5, 0.0, 0.0]);

        shared.push(&[1.0], &errors).unwrap();
        let mut data = [0_i16; 3];
        shared.fill(&mut data, 3);
        assert_eq!(data, [i16::MAX; 3]);
    }

    #[test]
    fn test_push_blocks_when_full() {
        let (_tx, errors) = channel::unbounded();
        let shared = Arc::new(Shared::new(4));
        let input = (0..10).map(|x| x as f32).collect::<Vec<_>>();

        let writer = {
            let (shared, errors, input) = (shared.clone(), errors.clone(), input.clone());
            thread::spawn(move || shared.push(&input, &errors))
        };

        thread::sleep(SETTLE);
        assert!(!writer.is_finished());
        assert_eq!(shared.queue.lock().samples.len(), 4);

        let mut out = Vec::new();
        while out.len() < input.len() {
            // Only read once the writer has refilled, so no silence gets mixed in
            if shared.queue.lock().samples.len() < 2 {
                thread::sleep(Duration::from_millis(1));
                continue;
            }

            let mut data = [0.0_f32; 2];
            shared.fill(&mut data, 1);
            out.extend(data);
        }

        writer.join().unwrap().unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_drain_waits_for_extra_callback() {
        let (_tx, errors) = channel::unbounded();
        let shared = Arc::new(Shared::new(16));
        shared.push(&[0.1, 0.2, 0.3], &errors).unwrap();

        let drain = {
            let shared = shared.clone();
            thread::spawn(move || shared.wait_drained(&errors))
        };

        thread::sleep(SETTLE);
        assert!(!drain.is_finished());

        // Empties the queue, but the device still holds these samples
        shared.fill(&mut [0.0_f32; 4], 1);
        thread::sleep(SETTLE);
        assert!(!drain.is_finished());

        shared.fill(&mut [0.0_f32; 4], 1);
        drain.join().unwrap().unwrap();
    }

    #[test]
    fn test_stream_error_surfaces() {
        let (tx, errors) = channel::unbounded();
        let shared = Shared::new(4);

        tx.send(StreamError::DeviceNotAvailable).unwrap();
        assert!(shared.push(&[0.0], &errors).is_err());

        // Drain of a queue nobody is consuming gives up on the error
        shared.push(&[0.0], &errors).unwrap();
        tx.send(StreamError::DeviceNotAvailable).unwrap();
        assert!(shared.wait_drained(&errors).is_err());
    }
}
