//! Session recorder - captures the master bus to disk
//!
//! Capture and disk writes are split: the render path pushes into a ring,
//! the command thread drains the ring into the WAV file.

use chrono::{DateTime, Local};
use hound::{SampleFormat, WavSpec, WavWriter};
use parking_lot::Mutex;
use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapCons, HeapProd, HeapRb,
};
use std::fmt;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Recorder errors
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("already recording to {0}")]
    AlreadyRecording(PathBuf),
    #[error("not recording")]
    NotRecording,
    #[error("cannot create recording directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("WAV writer error: {0}")]
    Wav(#[from] hound::Error),
}

/// Container/codec requested for a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingFormat {
    Mp3,
    #[default]
    Wav,
    Webm,
}

impl RecordingFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Webm => "webm",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Wav => "audio/wav",
            Self::Webm => "audio/webm",
        }
    }

    /// Whether this build can encode the format natively
    pub fn is_supported(self) -> bool {
        matches!(self, Self::Wav)
    }
}

impl fmt::Display for RecordingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for RecordingFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mp3" => Ok(Self::Mp3),
            "wav" => Ok(Self::Wav),
            "webm" => Ok(Self::Webm),
            other => Err(format!("unknown recording format '{}'", other)),
        }
    }
}

/// Bitrate preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingQuality {
    Low,
    Medium,
    #[default]
    High,
}

impl RecordingQuality {
    pub fn bitrate_bps(self) -> u32 {
        match self {
            Self::Low => 96_000,
            Self::Medium => 192_000,
            Self::High => 320_000,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for RecordingQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown recording quality '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecorderConfig {
    pub format: RecordingFormat,
    pub quality: RecordingQuality,
}

impl RecorderConfig {
    /// The format actually written, falling back to WAV
    pub fn effective_format(&self) -> RecordingFormat {
        if self.format.is_supported() {
            self.format
        } else {
            RecordingFormat::Wav
        }
    }
}

/// Result of a finished recording
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSummary {
    pub path: PathBuf,
    pub format: RecordingFormat,
    pub duration_secs: f64,
}

/// File name for a recording started at `at`
pub fn session_file_name(at: DateTime<Local>, format: RecordingFormat) -> String {
    format!(
        "Platter_Session_{}.{}",
        at.format("%Y-%m-%d_%H-%M-%S"),
        format.extension()
    )
}

/// Seconds of audio the capture ring holds between drains
const CAPTURE_RING_SECS: usize = 2;

/// Render-side half of a take
struct Capture {
    producer: HeapProd<f32>,
    path: PathBuf,
    frames: u64,
    /// Samples lost to a full ring
    dropped: u64,
}

/// Disk-side half of a take
struct Take {
    writer: WavWriter<BufWriter<File>>,
    consumer: HeapCons<f32>,
    format: RecordingFormat,
}

impl Take {
    /// Write everything queued; returns samples written
    fn drain(&mut self) -> Result<usize, hound::Error> {
        let mut written = 0;
        while let Some(sample) = self.consumer.try_pop() {
            self.writer.write_sample(sample)?;
            written += 1;
        }
        Ok(written)
    }
}

/// Handle that writes captured audio to disk, off the render path
#[derive(Clone)]
pub struct RecorderDrain {
    take: Arc<Mutex<Option<Take>>>,
}

impl RecorderDrain {
    /// Write queued samples of the current take, if any
    pub fn flush(&self) -> Result<usize, RecorderError> {
        match self.take.lock().as_mut() {
            Some(take) => Ok(take.drain()?),
            None => Ok(0),
        }
    }

    /// Samples captured but not yet written
    pub fn pending(&self) -> usize {
        self.take.lock().as_ref().map_or(0, |t| t.consumer.occupied_len())
    }
}

/// Master bus recorder
///
/// The render path only pushes samples into a lock-free ring; the WAV file
/// is written by whoever holds the [`RecorderDrain`].
pub struct Recorder {
    sample_rate: u32,
    capture: Option<Capture>,
    take: Arc<Mutex<Option<Take>>>,
}

impl Recorder {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            capture: None,
            take: Arc::new(Mutex::new(None)),
        }
    }

    pub fn drain_handle(&self) -> RecorderDrain {
        RecorderDrain {
            take: Arc::clone(&self.take),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.capture.is_some()
    }

    /// Seconds captured so far
    pub fn elapsed(&self) -> f64 {
        self.capture
            .as_ref()
            .map_or(0.0, |c| c.frames as f64 / self.sample_rate as f64)
    }

    pub fn path(&self) -> Option<&Path> {
        self.capture.as_ref().map(|c| c.path.as_path())
    }

    /// Start a take in `dir`; returns the file path
    pub fn start(&mut self, dir: &Path, config: RecorderConfig) -> Result<PathBuf, RecorderError> {
        if let Some(capture) = &self.capture {
            return Err(RecorderError::AlreadyRecording(capture.path.clone()));
        }

        let format = config.effective_format();
        if format != config.format {
            tracing::warn!(
                requested = %config.format,
                fallback = %format,
                "recording format not supported, falling back"
            );
        }

        fs::create_dir_all(dir)?;
        let path = dir.join(session_file_name(Local::now(), format));

        let spec = WavSpec {
            channels: 2,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let writer = WavWriter::create(&path, spec)?;
        let capacity = self.sample_rate.max(1) as usize * 2 * CAPTURE_RING_SECS;
        let (producer, consumer) = HeapRb::<f32>::new(capacity).split();

        tracing::info!(
            path = %path.display(),
            bitrate = config.quality.bitrate_bps(),
            "recording started"
        );
        *self.take.lock() = Some(Take {
            writer,
            consumer,
            format,
        });
        self.capture = Some(Capture {
            producer,
            path: path.clone(),
            frames: 0,
            dropped: 0,
        });
        Ok(path)
    }

    /// Queue interleaved stereo samples; never blocks
    pub fn write(&mut self, samples: &[f32]) {
        let Some(capture) = self.capture.as_mut() else {
            return;
        };
        let pushed = capture.producer.push_slice(samples);
        capture.frames += (pushed / 2) as u64;
        capture.dropped += (samples.len() - pushed) as u64;
    }

    /// Flush what is queued and finalize the current take
    pub fn stop(&mut self) -> Result<RecordingSummary, RecorderError> {
        let capture = self.capture.take().ok_or(RecorderError::NotRecording)?;
        let mut take = self.take.lock().take().ok_or(RecorderError::NotRecording)?;
        let duration_secs = capture.frames as f64 / self.sample_rate as f64;
        take.drain()?;
        take.writer.finalize()?;

        if capture.dropped > 0 {
            tracing::warn!(dropped = capture.dropped, "recording ring overflowed");
        }
        tracing::info!(path = %capture.path.display(), duration_secs, "recording saved");
        Ok(RecordingSummary {
            path: capture.path,
            format: take.format,
            duration_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_file_name_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 30).unwrap();
        assert_eq!(
            session_file_name(at, RecordingFormat::Wav),
            "Platter_Session_2024-03-09_07-05-30.wav"
        );
    }

    #[test]
    fn test_unsupported_format_falls_back() {
        let config = RecorderConfig {
            format: RecordingFormat::Mp3,
            quality: RecordingQuality::Low,
        };
        assert_eq!(config.effective_format(), RecordingFormat::Wav);
        assert_eq!(config.quality.bitrate_bps(), 96_000);
        assert_eq!(RecordingFormat::Mp3.mime_type(), "audio/mpeg");
    }

    #[test]
    fn test_record_and_finalize() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = Recorder::new(1000);
        let config = RecorderConfig {
            format: RecordingFormat::Webm,
            quality: RecordingQuality::Medium,
        };

        let path = recorder.start(dir.path(), config).unwrap();
        assert!(recorder.is_recording());
        assert!(matches!(
            recorder.start(dir.path(), config),
            Err(RecorderError::AlreadyRecording(_))
        ));

        let drain = recorder.drain_handle();
        recorder.write(&vec![0.25; 2 * 300]);
        assert_eq!(drain.flush().unwrap(), 600);
        recorder.write(&vec![0.25; 2 * 200]);
        assert!((recorder.elapsed() - 0.5).abs() < 1e-9);

        let summary = recorder.stop().unwrap();
        assert_eq!(summary.path, path);
        assert_eq!(summary.format, RecordingFormat::Wav);
        assert!(path.extension().is_some_and(|e| e == "wav"));

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.len(), 1000);
        assert!(matches!(recorder.stop(), Err(RecorderError::NotRecording)));
        assert_eq!(drain.flush().unwrap(), 0);
    }

    #[test]
    fn test_full_ring_drops_instead_of_blocking() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = Recorder::new(100);
        recorder.start(dir.path(), RecorderConfig::default()).unwrap();

        // Ring holds two seconds; nobody drains for three
        for _ in 0..3 {
            recorder.write(&vec![0.1; 2 * 100]);
        }
        assert!((recorder.elapsed() - 2.0).abs() < 1e-9);

        let summary = recorder.stop().unwrap();
        assert!((summary.duration_secs - 2.0).abs() < 1e-9);
        let reader = hound::WavReader::open(&summary.path).unwrap();
        assert_eq!(reader.len(), 400);
    }

    #[test]
    fn test_parsing() {
        assert_eq!("MP3".parse::<RecordingFormat>(), Ok(RecordingFormat::Mp3));
        assert_eq!("medium".parse::<RecordingQuality>(), Ok(RecordingQuality::Medium));
        assert!("flac".parse::<RecordingFormat>().is_err());
    }
}
