//! Melody sequencer.
//! Writes each note and a short rest to a [`Sink`], in order.

use anyhow::Result;

use super::{
    note::{NoteEvent, Pitch, MEASURE_LENGTH_SEC, REST_GAP, SAMPLE_RATE},
    tone::ToneTable,
};

/// Destination for raw mono 8-bit samples at [`SAMPLE_RATE`].
/// Releasing the sink is left to its `Drop` impl.
pub trait Sink {
    /// Blocks until the samples have been accepted, returning how many were.
    fn write(&mut self, samples: &[i8]) -> Result<usize>;
    /// Blocks until everything written has been played.
    fn drain(&mut self) -> Result<()>;
}

/// Plays every note of the song in order, then drains the sink.
pub fn play_song(sink: &mut impl Sink, tones: &ToneTable, song: &[NoteEvent]) -> Result<()> {
    for note in song {
        play_note(sink, tones, note)?;
    }

    sink.drain()
}

/// Writes one note followed by the gap between notes.
pub fn play_note(sink: &mut impl Sink, tones: &ToneTable, note: &NoteEvent) -> Result<()> {
    let length = note_length(note);
    log::debug!("Playing {:?} for {length} samples", note.pitch);

    sink.write(&tones.sample(note.pitch)[..length])?;
    sink.write(&tones.sample(Pitch::Rest)[..REST_GAP])?;
    Ok(())
}

/// Number of samples a note is played for, never more than one measure.
pub fn note_length(note: &NoteEvent) -> usize {
    let ms = note.duration.time_ms().min(MEASURE_LENGTH_SEC * 1000);
    (SAMPLE_RATE as u64 * ms as u64 / 1000) as usize
}

#[cfg(test)]
mod test {
    use anyhow::Result;

    use super::{note_length, play_song, Sink};
    use crate::audio::{
        note::{Duration, NoteEvent, Pitch, MEASURE_LENGTH_SEC, SAMPLE_RATE},
        tone::ToneTable,
    };

    #[derive(Debug, PartialEq, Eq)]
    enum Call {
        Write(Vec<i8>),
        Drain,
    }

    #[derive(Default)]
    struct RecordingSink {
        calls: Vec<Call>,
    }

    impl Sink for RecordingSink {
        fn write(&mut self, samples: &[i8]) -> Result<usize> {
            self.calls.push(Call::Write(samples.to_vec()));
            Ok(samples.len())
        }

        fn drain(&mut self) -> Result<()> {
            self.calls.push(Call::Drain);
            Ok(())
        }
    }

    #[test]
    fn test_play_song_writes() {
        let tones = ToneTable::new();
        let song = [
            NoteEvent::new(Pitch::A5, Duration::Quarter),
            NoteEvent::new(Pitch::Rest, Duration::Quarter),
            NoteEvent::new(Pitch::A5, Duration::Half),
        ];

        let mut sink = RecordingSink::default();
        play_song(&mut sink, &tones, &song).unwrap();

        let sr = SAMPLE_RATE as usize;
        let a5 = tones.sample(Pitch::A5);
        let expected = vec![
            Call::Write(a5[..sr * 250 / 1000].to_vec()),
            Call::Write(vec![0; 50]),
            Call::Write(vec![0; sr * 250 / 1000]),
            Call::Write(vec![0; 50]),
            Call::Write(a5[..sr * 500 / 1000].to_vec()),
            Call::Write(vec![0; 50]),
            Call::Drain,
        ];

        assert_eq!(sink.calls, expected);
    }

    #[test]
    fn test_empty_song_only_drains() {
        let tones = ToneTable::new();
        let mut sink = RecordingSink::default();
        play_song(&mut sink, &tones, &[]).unwrap();

        assert_eq!(sink.calls, vec![Call::Drain]);
    }

    #[test]
    fn test_note_length_clamped() {
        let max = (SAMPLE_RATE * MEASURE_LENGTH_SEC) as usize;
        for duration in [
            Duration::Whole,
            Duration::Half,
            Duration::Quarter,
            Duration::Eighth,
        ] {
            let length = note_length(&NoteEvent::new(Pitch::A4, duration));
            assert!(length <= max);
        }

        assert_eq!(
            note_length(&NoteEvent::new(Pitch::A4, Duration::Eighth)),
            SAMPLE_RATE as usize * 125 / 1000
        );
    }
}
