//! Mary Had a Little Lamb.

use crate::audio::note::{
    Duration::{self, *},
    NoteEvent,
    Pitch::{self, *},
};

const fn n(pitch: Pitch, duration: Duration) -> NoteEvent {
    NoteEvent::new(pitch, duration)
}

pub const SONG: &[NoteEvent] = &[
    n(A5, Quarter),
    n(G4, Quarter),
    n(F4, Quarter),
    n(G4, Quarter),
    //
    n(A5, Quarter),
    n(A5, Quarter),
    n(A5, Half),
    //
    n(G4, Quarter),
    n(G4, Quarter),
    n(G4, Half),
    //
    n(A5, Quarter),
    n(A5, Quarter),
    n(A5, Half),
    //
    n(A5, Quarter),
    n(G4, Quarter),
    n(F4, Quarter),
    n(G4, Quarter),
    //
    n(A5, Quarter),
    n(A5, Quarter),
    n(A5, Quarter),
    n(A5, Quarter),
    //
    n(G4, Quarter),
    n(G4, Quarter),
    n(A5, Quarter),
    n(G4, Quarter),
    //
    n(F4, Whole),
];
