// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_JPEG_QUALITY, DEFAULT_MAX_SESSIONS, DEFAULT_MAX_VIDEO_BYTES,
    DEFAULT_SESSION_IDLE_TTL_SECS, DEFAULT_VIDEO_CODEC, DEFAULT_VIDEO_CRF,
};
use crate::watermark::FontChain;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
    #[serde(default)]
    pub fonts: FontConfig,
    #[serde(default)]
    pub photo: PhotoConfig,
    #[serde(default)]
    pub video: VideoConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_max_video_bytes() -> u64 {
    DEFAULT_MAX_VIDEO_BYTES
}

/// Size policy applied before any compositor runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Largest accepted video in bytes (default: 50 MiB)
    #[serde(default = "default_max_video_bytes")]
    pub max_video_bytes: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_video_bytes: default_max_video_bytes(),
        }
    }
}

fn default_idle_ttl_seconds() -> u64 {
    DEFAULT_SESSION_IDLE_TTL_SECS
}

fn default_max_entries() -> u64 {
    DEFAULT_MAX_SESSIONS
}

/// Eviction policy for the per-user session store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Evict a user's session after this many idle seconds (default: 1 day)
    #[serde(default = "default_idle_ttl_seconds")]
    pub idle_ttl_seconds: u64,

    /// Maximum number of live sessions (default: 100000)
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_ttl_seconds: default_idle_ttl_seconds(),
            max_entries: default_max_entries(),
        }
    }
}

/// Font files tried in order; empty means the system defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FontConfig {
    #[serde(default)]
    pub candidates: Vec<PathBuf>,
}

impl FontConfig {
    pub fn chain(&self) -> FontChain {
        if self.candidates.is_empty() {
            FontChain::system_default()
        } else {
            FontChain::new(self.candidates.clone())
        }
    }
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoConfig {
    /// JPEG quality 1-100 for watermarked photos (default: 95)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl Default for PhotoConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

fn default_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}

fn default_crf() -> u8 {
    DEFAULT_VIDEO_CRF
}

/// External tools and encoder settings for video jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,

    /// ffmpeg video encoder name (default: libx264)
    #[serde(default = "default_codec")]
    pub codec: String,

    /// Constant rate factor for x264/x265 encoders (default: 23)
    #[serde(default = "default_crf")]
    pub crf: u8,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            codec: default_codec(),
            crf: default_crf(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; RUST_LOG takes precedence (default: info)
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        // First, check that all referenced environment variables exist
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        // An empty document means "all defaults"
        if substituted.trim().is_empty() {
            return Ok(Config::default());
        }

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.limits.max_video_bytes == 0 {
            return Err("limits.max_video_bytes must be greater than 0".to_string());
        }

        if self.sessions.idle_ttl_seconds == 0 {
            return Err("sessions.idle_ttl_seconds must be greater than 0".to_string());
        }

        if self.sessions.max_entries == 0 {
            return Err("sessions.max_entries must be greater than 0".to_string());
        }

        if !(1..=100).contains(&self.photo.jpeg_quality) {
            return Err(format!(
                "photo.jpeg_quality must be between 1 and 100, got {}",
                self.photo.jpeg_quality
            ));
        }

        if self.video.ffmpeg_path.trim().is_empty() {
            return Err("video.ffmpeg_path cannot be empty".to_string());
        }

        if self.video.ffprobe_path.trim().is_empty() {
            return Err("video.ffprobe_path cannot be empty".to_string());
        }

        if self.video.codec.trim().is_empty() {
            return Err("video.codec cannot be empty".to_string());
        }

        if self.video.crf > 51 {
            return Err(format!(
                "video.crf must be between 0 and 51, got {}",
                self.video.crf
            ));
        }

        if self.logging.level.trim().is_empty() {
            return Err("logging.level cannot be empty".to_string());
        }

        Ok(())
    }
}
