//! Track loading and settings persistence

pub mod config;
pub mod loader;

pub use config::Settings;
pub use loader::{audio_files_in, LoadError, LoadedTrack, TrackLoader, TrackMetadata};
