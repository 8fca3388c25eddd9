//! Audio engine for Platter - decks, crossfader, scratch and master bus
//!
//! This module provides the core audio processing pipeline:
//! - Deck: buffer playback through a 3-band EQ, effects, gain and analyser tap
//! - Effects: per-deck reverb, delay, band-pass filter and flanger
//! - Scratch: velocity-driven rate/offset perturbation per deck
//! - Mixer: crossfader law, master volume and soft clipping
//! - Mic, recorder and broadcast state on the master bus
//! - Session: single owner of all of the above, driven by commands

mod broadcast;
mod buffer;
mod deck;
mod effects;
mod engine;
mod eq;
mod mic;
mod mixer;
mod recorder;
mod scratch;
mod session;
mod source;

pub use broadcast::{
    BroadcastError, BroadcastSettings, BroadcastState, Broadcaster, DEFAULT_MOUNT, DEFAULT_PORT,
};
pub use buffer::AudioBuffer;
pub use deck::{Deck, DeckConfig, DeckId, DeckState, CUE_PREVIEW_SECS, PITCH_RANGE};
pub use effects::{
    BandPass, Delay, DeckEffects, Effect, EffectFlags, EffectKind, Flanger, Reverb,
};
pub use engine::{pump_commands, shared_session, AudioCommand, AudioEngine, AudioEvent, SharedSession};
pub use eq::{DeckEq, EqBand, EqFrequencies, EQ_RANGE_DB};
pub use mic::{create_mic_ring_buffer, MicChannel, MicError, MicInputReader, MicInputWriter};
pub use mixer::{deck_gains, ChannelLevel, CrossfaderCurve, Mixer};
pub use recorder::{
    session_file_name, Recorder, RecorderConfig, RecorderDrain, RecorderError, RecordingFormat,
    RecordingQuality, RecordingSummary,
};
pub use scratch::{ScratchConfig, ScratchSession};
pub use session::{MixerSession, RecordingStatus, SampleClock, SessionConfig, SessionState};
pub use source::PlaybackSource;
