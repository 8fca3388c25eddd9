//! Settings persistence for Platter
//!
//! A commented `key=value` file. Unknown keys are ignored and values that
//! fail to parse or fall out of range keep their defaults.

use platter_audio::{
    BroadcastSettings, CrossfaderCurve, DeckConfig, EqFrequencies, RecorderConfig,
    RecordingFormat, RecordingQuality, ScratchConfig, SessionConfig, DEFAULT_MOUNT, DEFAULT_PORT,
    PITCH_RANGE,
};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_REMOTE_PORT: u16 = 8765;
pub const DEFAULT_THEME: &str = "default";

/// User settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Output rate; `None` uses the device default
    pub sample_rate: Option<u32>,
    /// Output buffer size in frames; `None` uses the device default
    pub buffer_size: Option<u32>,
    pub crossfader_curve: CrossfaderCurve,
    pub pitch_range: f32,
    pub scratch_scale: f64,
    pub scratch_quiescence_ms: u64,
    pub eq_low_freq: f32,
    pub eq_mid_freq: f32,
    pub eq_high_freq: f32,
    pub recording_format: RecordingFormat,
    pub recording_quality: RecordingQuality,
    pub recording_dir: Option<PathBuf>,
    pub broadcast_server: String,
    pub broadcast_port: u32,
    pub broadcast_mount: String,
    /// 0 disables the remote command socket
    pub remote_port: u16,
    pub theme: String,
    pub last_track_folder: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        let eq = EqFrequencies::default();
        let scratch = ScratchConfig::default();
        Self {
            sample_rate: None,
            buffer_size: None,
            crossfader_curve: CrossfaderCurve::default(),
            pitch_range: PITCH_RANGE,
            scratch_scale: scratch.scale,
            scratch_quiescence_ms: (scratch.quiescence * 1000.0).round() as u64,
            eq_low_freq: eq.low,
            eq_mid_freq: eq.mid,
            eq_high_freq: eq.high,
            recording_format: RecordingFormat::default(),
            recording_quality: RecordingQuality::default(),
            recording_dir: None,
            broadcast_server: String::new(),
            broadcast_port: DEFAULT_PORT,
            broadcast_mount: DEFAULT_MOUNT.to_string(),
            remote_port: DEFAULT_REMOTE_PORT,
            theme: DEFAULT_THEME.to_string(),
            last_track_folder: None,
        }
    }
}

impl Settings {
    /// Load settings from the default location
    ///
    /// Returns defaults if the file doesn't exist or can't be read.
    pub fn load() -> Self {
        let path = Self::config_path();
        Self::load_from(&path).unwrap_or_default()
    }

    /// Load settings from a specific path
    pub fn load_from(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Save settings to the default location
    pub fn save(&self) -> io::Result<()> {
        let path = Self::config_path();
        self.save_to(&path)
    }

    /// Save settings to a specific path
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.serialize())
    }

    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("platter")
            .join("config.txt")
    }

    /// Where session recordings go: the configured folder, else `<audio dir>/Platter`
    pub fn recording_dir(&self) -> PathBuf {
        self.recording_dir.clone().unwrap_or_else(|| {
            dirs::audio_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from("."))
                .join("Platter")
        })
    }

    /// Engine configuration at the negotiated device rate
    pub fn to_session_config(&self, sample_rate: u32) -> SessionConfig {
        let scratch = ScratchConfig {
            scale: self.scratch_scale,
            quiescence: self.scratch_quiescence_ms as f64 / 1000.0,
            ..ScratchConfig::default()
        };
        SessionConfig {
            sample_rate,
            crossfader_curve: self.crossfader_curve,
            deck: DeckConfig {
                eq_freqs: EqFrequencies {
                    low: self.eq_low_freq,
                    mid: self.eq_mid_freq,
                    high: self.eq_high_freq,
                },
                scratch,
                pitch_range: self.pitch_range,
            },
            recorder: RecorderConfig {
                format: self.recording_format,
                quality: self.recording_quality,
            },
            recording_dir: self.recording_dir(),
        }
    }

    /// Stream endpoint; the stream key is never persisted
    pub fn broadcast_settings(&self) -> BroadcastSettings {
        BroadcastSettings {
            server: self.broadcast_server.clone(),
            port: self.broadcast_port,
            mount: self.broadcast_mount.clone(),
            stream_key: String::new(),
        }
    }

    /// Parse settings from simple key=value format
    fn parse(content: &str) -> Self {
        let mut settings = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "sample_rate" => {
                    if let Some(rate) = parse_in(key, value, |r: &u32| (8000..=192_000).contains(r))
                    {
                        settings.sample_rate = Some(rate);
                    }
                }
                "buffer_size" => {
                    if let Some(size) = parse_in(key, value, |s: &u32| (16..=8192).contains(s)) {
                        settings.buffer_size = Some(size);
                    }
                }
                "crossfader_curve" => set(&mut settings.crossfader_curve, key, value, |_| true),
                "pitch_range" => set(&mut settings.pitch_range, key, value, |r: &f32| {
                    (1.0..=100.0).contains(r)
                }),
                "scratch_scale" => set(&mut settings.scratch_scale, key, value, |s: &f64| {
                    *s > 0.0 && s.is_finite()
                }),
                "scratch_quiescence_ms" => {
                    set(&mut settings.scratch_quiescence_ms, key, value, |ms: &u64| *ms > 0)
                }
                "eq_low_freq" => set(&mut settings.eq_low_freq, key, value, valid_freq),
                "eq_mid_freq" => set(&mut settings.eq_mid_freq, key, value, valid_freq),
                "eq_high_freq" => set(&mut settings.eq_high_freq, key, value, valid_freq),
                "recording_format" => set(&mut settings.recording_format, key, value, |_| true),
                "recording_quality" => set(&mut settings.recording_quality, key, value, |_| true),
                "recording_dir" => settings.recording_dir = non_empty_path(value),
                "broadcast_server" => settings.broadcast_server = value.to_string(),
                "broadcast_port" => set(&mut settings.broadcast_port, key, value, |p: &u32| {
                    (1..=65535).contains(p)
                }),
                "broadcast_mount" => {
                    if !value.is_empty() {
                        settings.broadcast_mount = value.to_string();
                    }
                }
                "remote_port" => set(&mut settings.remote_port, key, value, |_| true),
                "theme" => {
                    if !value.is_empty() {
                        settings.theme = value.to_string();
                    }
                }
                "last_track_folder" => settings.last_track_folder = non_empty_path(value),
                _ => tracing::debug!(key, "ignoring unknown setting"),
            }
        }

        settings
    }

    /// Serialize settings to simple key=value format
    fn serialize(&self) -> String {
        let mut lines = vec!["# Platter Configuration".to_string()];

        lines.push("# Audio device (omit for device defaults)".to_string());
        if let Some(rate) = self.sample_rate {
            lines.push(format!("sample_rate={}", rate));
        }
        if let Some(size) = self.buffer_size {
            lines.push(format!("buffer_size={}", size));
        }

        lines.push("# Decks and mixer".to_string());
        lines.push(format!("crossfader_curve={}", self.crossfader_curve));
        lines.push(format!("pitch_range={}", self.pitch_range));
        lines.push(format!("scratch_scale={}", self.scratch_scale));
        lines.push(format!("scratch_quiescence_ms={}", self.scratch_quiescence_ms));
        lines.push(format!("eq_low_freq={}", self.eq_low_freq));
        lines.push(format!("eq_mid_freq={}", self.eq_mid_freq));
        lines.push(format!("eq_high_freq={}", self.eq_high_freq));

        lines.push("# Recording".to_string());
        lines.push(format!("recording_format={}", self.recording_format));
        lines.push(format!("recording_quality={}", self.recording_quality.as_str()));
        if let Some(ref dir) = self.recording_dir {
            lines.push(format!("recording_dir={}", dir.display()));
        }

        lines.push("# Broadcast".to_string());
        if !self.broadcast_server.is_empty() {
            lines.push(format!("broadcast_server={}", self.broadcast_server));
        }
        lines.push(format!("broadcast_port={}", self.broadcast_port));
        lines.push(format!("broadcast_mount={}", self.broadcast_mount));

        lines.push("# Interface".to_string());
        lines.push(format!("remote_port={}", self.remote_port));
        lines.push(format!("theme={}", self.theme));
        if let Some(ref folder) = self.last_track_folder {
            lines.push(format!("last_track_folder={}", folder.display()));
        }

        lines.join("\n")
    }
}

fn valid_freq(hz: &f32) -> bool {
    (20.0..=20_000.0).contains(hz)
}

fn non_empty_path(value: &str) -> Option<PathBuf> {
    (!value.is_empty()).then(|| PathBuf::from(value))
}

fn parse_in<T: FromStr>(key: &str, value: &str, valid: impl Fn(&T) -> bool) -> Option<T> {
    match value.parse::<T>() {
        Ok(parsed) if valid(&parsed) => Some(parsed),
        _ => {
            tracing::warn!(key, value, "invalid setting, keeping default");
            None
        }
    }
}

fn set<T: FromStr>(target: &mut T, key: &str, value: &str, valid: impl Fn(&T) -> bool) {
    if let Some(parsed) = parse_in(key, value, valid) {
        *target = parsed;
    }
}
