//! Broadcast state - Icecast-style endpoint settings and on-air flag
//!
//! Only the settings validation and on-air bookkeeping are implemented; the
//! connection itself is logged, no audio leaves the process.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

pub const DEFAULT_PORT: u32 = 8000;
pub const DEFAULT_MOUNT: &str = "/live";

/// Broadcast errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BroadcastError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("invalid server address '{0}'")]
    InvalidServer(String),
    #[error("port {0} is out of range (1-65535)")]
    InvalidPort(u32),
    #[error("already on air")]
    AlreadyLive,
    #[error("not on air")]
    NotLive,
}

fn server_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^(https?://)?([a-zA-Z0-9][-a-zA-Z0-9]*(\.[a-zA-Z0-9][-a-zA-Z0-9]*)+)$")
                .ok()
        })
        .as_ref()
}

/// Endpoint settings for a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastSettings {
    pub server: String,
    pub port: u32,
    pub mount: String,
    pub stream_key: String,
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            server: String::new(),
            port: DEFAULT_PORT,
            mount: DEFAULT_MOUNT.to_string(),
            stream_key: String::new(),
        }
    }
}

impl BroadcastSettings {
    /// Check required fields, server syntax and port range
    pub fn validate(&self) -> Result<(), BroadcastError> {
        let server = self.server.trim();
        if server.is_empty() {
            return Err(BroadcastError::MissingField("server"));
        }
        if self.mount.trim().is_empty() {
            return Err(BroadcastError::MissingField("mount"));
        }
        if !server_pattern().is_some_and(|re| re.is_match(server)) {
            return Err(BroadcastError::InvalidServer(server.to_string()));
        }
        if !(1..=65535).contains(&self.port) {
            return Err(BroadcastError::InvalidPort(self.port));
        }
        Ok(())
    }

    /// Listener URL, e.g. `http://radio.example.com:8000/live`
    pub fn stream_url(&self) -> String {
        let server = self.server.trim();
        let (scheme, host) = match server.split_once("://") {
            Some((scheme, host)) => (scheme, host),
            None => ("http", server),
        };
        let mount = self.mount.trim();
        let slash = if mount.starts_with('/') { "" } else { "/" };
        format!("{}://{}:{}{}{}", scheme, host, self.port, slash, mount)
    }
}

/// On-air state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BroadcastState {
    #[default]
    Offline,
    OnAir {
        url: String,
    },
}

#[derive(Debug, Default)]
pub struct Broadcaster {
    state: BroadcastState,
    settings: BroadcastSettings,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &BroadcastState {
        &self.state
    }

    pub fn is_live(&self) -> bool {
        matches!(self.state, BroadcastState::OnAir { .. })
    }

    pub fn settings(&self) -> &BroadcastSettings {
        &self.settings
    }

    /// Validate and go on air; returns the stream URL
    pub fn start(&mut self, settings: BroadcastSettings) -> Result<String, BroadcastError> {
        if self.is_live() {
            return Err(BroadcastError::AlreadyLive);
        }
        settings.validate()?;

        let url = settings.stream_url();
        tracing::info!(%url, mount = %settings.mount, "connecting to stream server");
        self.settings = settings;
        self.state = BroadcastState::OnAir { url: url.clone() };
        Ok(url)
    }

    pub fn stop(&mut self) -> Result<(), BroadcastError> {
        if !self.is_live() {
            return Err(BroadcastError::NotLive);
        }
        tracing::info!("broadcast stopped");
        self.state = BroadcastState::Offline;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(server: &str, port: u32, mount: &str) -> BroadcastSettings {
        BroadcastSettings {
            server: server.to_string(),
            port,
            mount: mount.to_string(),
            stream_key: "hackme".to_string(),
        }
    }

    #[test]
    fn test_defaults() {
        let s = BroadcastSettings::default();
        assert_eq!(s.port, 8000);
        assert_eq!(s.mount, "/live");
        assert_eq!(s.validate(), Err(BroadcastError::MissingField("server")));
    }

    #[test]
    fn test_server_validation() {
        assert!(settings("radio.example.com", 8000, "/live").validate().is_ok());
        assert!(settings("https://stream.example.org", 443, "/live").validate().is_ok());
        assert_eq!(
            settings("localhost", 8000, "/live").validate(),
            Err(BroadcastError::InvalidServer("localhost".into()))
        );
        assert!(settings("-bad.example.com", 8000, "/live").validate().is_err());
        assert!(settings("ftp://radio.example.com", 8000, "/live").validate().is_err());
    }

    #[test]
    fn test_port_and_mount_validation() {
        assert_eq!(
            settings("radio.example.com", 70000, "/live").validate(),
            Err(BroadcastError::InvalidPort(70000))
        );
        assert_eq!(
            settings("radio.example.com", 0, "/live").validate(),
            Err(BroadcastError::InvalidPort(0))
        );
        assert_eq!(
            settings("radio.example.com", 8000, " ").validate(),
            Err(BroadcastError::MissingField("mount"))
        );
    }

    #[test]
    fn test_stream_url() {
        assert_eq!(
            settings("radio.example.com", 8000, "live").stream_url(),
            "http://radio.example.com:8000/live"
        );
        assert_eq!(
            settings("https://radio.example.com", 443, "/main").stream_url(),
            "https://radio.example.com:443/main"
        );
    }

    #[test]
    fn test_start_stop() {
        let mut b = Broadcaster::new();
        assert_eq!(b.stop(), Err(BroadcastError::NotLive));
        assert!(b.start(settings("localhost", 8000, "/live")).is_err());
        assert!(!b.is_live());

        let url = b.start(settings("radio.example.com", 8000, "/live")).unwrap();
        assert_eq!(url, "http://radio.example.com:8000/live");
        assert!(b.is_live());
        assert_eq!(
            b.start(settings("radio.example.com", 8000, "/live")),
            Err(BroadcastError::AlreadyLive)
        );
        b.stop().unwrap();
        assert_eq!(b.state(), &BroadcastState::Offline);
    }
}
