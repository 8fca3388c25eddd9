//! Audio file loading and decoding

use platter_audio::AudioBuffer;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::{MetadataOptions, StandardTagKey, Tag};
use symphonia::core::probe::Hint;
use thiserror::Error;

/// File extensions offered by the track picker
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "ogg", "aac", "m4a"];

/// Errors that can occur during track loading
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No audio track found in file")]
    NoAudioTrack,
    #[error("File contains no audio")]
    Empty,
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Track metadata
#[derive(Debug, Clone, Default)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration_secs: f64,
    /// Rate of the source file, before resampling
    pub sample_rate: u32,
    pub channels: u16,
}

impl TrackMetadata {
    /// "Artist - Title", or just the title when the artist is unknown
    pub fn display_name(&self) -> String {
        match &self.artist {
            Some(artist) => format!("{} - {}", artist, self.title),
            None => self.title.clone(),
        }
    }

    fn apply_tags(&mut self, tags: &[Tag]) {
        for tag in tags {
            let value = tag.value.to_string();
            if value.trim().is_empty() {
                continue;
            }
            match tag.std_key {
                Some(StandardTagKey::TrackTitle) => self.title = value,
                Some(StandardTagKey::Artist) => self.artist = Some(value),
                Some(StandardTagKey::Album) => self.album = Some(value),
                _ => {}
            }
        }
    }
}

/// A decoded track ready to hand to a deck
pub struct LoadedTrack {
    /// Interleaved stereo at the loader's target rate
    pub buffer: AudioBuffer,
    pub metadata: TrackMetadata,
}

impl LoadedTrack {
    pub fn into_shared(self) -> Arc<AudioBuffer> {
        Arc::new(self.buffer)
    }
}

/// Audio file loader using Symphonia
pub struct TrackLoader {
    target_sample_rate: u32,
}

impl Default for TrackLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackLoader {
    /// Create a new track loader with default 48kHz sample rate
    pub fn new() -> Self {
        Self::with_sample_rate(48000)
    }

    /// Create a new track loader resampling to the engine rate
    pub fn with_sample_rate(target_sample_rate: u32) -> Self {
        Self {
            target_sample_rate: target_sample_rate.max(1),
        }
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    /// Load and decode an audio file
    pub fn load(&self, path: &Path) -> Result<LoadedTrack, LoadError> {
        let file = std::fs::File::open(path)?;
        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Unknown")
            .to_string();
        self.decode(Box::new(file), hint_for(path), title)
    }

    /// Decode an in-memory file; `name` supplies the format hint and fallback title
    pub fn load_bytes(&self, bytes: Vec<u8>, name: &str) -> Result<LoadedTrack, LoadError> {
        let path = Path::new(name);
        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(name)
            .to_string();
        self.decode(Box::new(io::Cursor::new(bytes)), hint_for(path), title)
    }

    fn decode(
        &self,
        source: Box<dyn MediaSource>,
        hint: Hint,
        title: String,
    ) -> Result<LoadedTrack, LoadError> {
        let mss = MediaSourceStream::new(source, Default::default());

        let mut opened = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| LoadError::Decode(e.to_string()))?;

        let mut metadata = TrackMetadata {
            title,
            ..Default::default()
        };
        // Container-level tags (ID3 and friends) come from the container reader
        if let Some(meta) = opened.metadata.get() {
            if let Some(revision) = meta.current() {
                metadata.apply_tags(revision.tags());
            }
        }

        let mut format = opened.format;
        if let Some(revision) = format.metadata().current() {
            metadata.apply_tags(revision.tags());
        }

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(LoadError::NoAudioTrack)?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let source_sample_rate = codec_params.sample_rate.unwrap_or(44100);
        let mut channels = codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(2);

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| LoadError::Decode(e.to_string()))?;

        let mut samples: Vec<f32> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(symphonia::core::errors::Error::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => {
                    tracing::debug!(error = %e, "stopping decode");
                    break;
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(e) => {
                    tracing::debug!(error = %e, "skipping undecodable packet");
                    continue;
                }
            };

            let spec = *decoded.spec();
            channels = spec.channels.count().max(1) as u16;
            let duration = decoded.capacity() as u64;

            let mut sample_buf = SampleBuffer::<f32>::new(duration, spec);
            sample_buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(sample_buf.samples());
        }

        if samples.is_empty() {
            return Err(LoadError::Empty);
        }

        let total_frames = samples.len() / channels.max(1) as usize;
        metadata.duration_secs = total_frames as f64 / source_sample_rate as f64;
        metadata.sample_rate = source_sample_rate;
        metadata.channels = channels;

        let stereo = to_stereo(&samples, channels);
        let stereo = if source_sample_rate != self.target_sample_rate {
            self.resample(&stereo, source_sample_rate)?
        } else {
            stereo
        };

        tracing::info!(
            title = %metadata.title,
            source_rate = source_sample_rate,
            channels,
            duration = metadata.duration_secs,
            "track decoded"
        );

        let buffer = AudioBuffer::new(
            stereo,
            self.target_sample_rate,
            Some(metadata.display_name()),
        );
        Ok(LoadedTrack { buffer, metadata })
    }

    /// Resample interleaved stereo to the target rate
    fn resample(&self, samples: &[f32], source_rate: u32) -> Result<Vec<f32>, LoadError> {
        use rubato::{FftFixedInOut, Resampler};

        const CHANNELS: usize = 2;
        let frames = samples.len() / CHANNELS;

        let mut resampler = FftFixedInOut::<f32>::new(
            source_rate as usize,
            self.target_sample_rate as usize,
            1024,
            CHANNELS,
        )
        .map_err(|e| LoadError::Decode(e.to_string()))?;

        let deinterleaved: Vec<Vec<f32>> = (0..CHANNELS)
            .map(|ch| (0..frames).map(|f| samples[f * CHANNELS + ch]).collect())
            .collect();

        let chunk_size = resampler.input_frames_next();
        let mut output: Vec<Vec<f32>> = vec![Vec::new(); CHANNELS];

        let mut pos = 0;
        while pos + chunk_size <= frames {
            let input_refs: Vec<&[f32]> = deinterleaved
                .iter()
                .map(|ch| &ch[pos..pos + chunk_size])
                .collect();

            let resampled = resampler
                .process(&input_refs, None)
                .map_err(|e| LoadError::Decode(e.to_string()))?;

            for (ch, data) in resampled.into_iter().enumerate() {
                output[ch].extend(data);
            }

            pos += chunk_size;
        }

        // Tail: pad to a full chunk, keep only the proportional output
        if pos < frames {
            let remaining = frames - pos;
            let padded: Vec<Vec<f32>> = deinterleaved
                .iter()
                .map(|ch| {
                    let mut v = ch[pos..].to_vec();
                    v.resize(chunk_size, 0.0);
                    v
                })
                .collect();

            let input_refs: Vec<&[f32]> = padded.iter().map(|v| v.as_slice()).collect();
            let resampled = resampler
                .process(&input_refs, None)
                .map_err(|e| LoadError::Decode(e.to_string()))?;

            let output_frames =
                (remaining * self.target_sample_rate as usize) / source_rate as usize;
            for (ch, data) in resampled.into_iter().enumerate() {
                output[ch].extend(&data[..output_frames.min(data.len())]);
            }
        }

        let output_frames = output[0].len().min(output[1].len());
        let mut interleaved = Vec::with_capacity(output_frames * CHANNELS);
        for frame_idx in 0..output_frames {
            for channel in &output {
                interleaved.push(channel[frame_idx]);
            }
        }

        Ok(interleaved)
    }
}

fn hint_for(path: &Path) -> Hint {
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }
    hint
}

/// Fold any channel layout to interleaved stereo
///
/// Mono is duplicated to both sides; extra channels beyond the first two are
/// dropped.
fn to_stereo(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        2 => samples.to_vec(),
        0 | 1 => samples.iter().flat_map(|&s| [s, s]).collect(),
        n => samples
            .chunks_exact(n as usize)
            .flat_map(|frame| [frame[0], frame[1]])
            .collect(),
    }
}

/// Playable files directly inside `dir`, sorted by name
pub fn audio_files_in(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_supported(path))
        .collect();
    files.sort();
    Ok(files)
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str()))
}
