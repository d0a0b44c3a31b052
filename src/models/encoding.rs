use serde::{Deserialize, Serialize};
use std::fmt;

/// One selectable encoding offered by the stream source.
///
/// Built once per catalog query at the catalog boundary and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encoding {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub bitrate_kbps: Option<f64>,
    pub has_video: bool,
    pub has_audio: bool,
}

/// Partition class used by the format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingKind {
    Combined,
    VideoOnly,
    AudioOnly,
    /// Neither a video nor an audio track (storyboards, images)
    Unusable,
}

impl fmt::Display for EncodingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingKind::Combined => write!(f, "Video+Audio"),
            EncodingKind::VideoOnly => write!(f, "Video"),
            EncodingKind::AudioOnly => write!(f, "Audio"),
            EncodingKind::Unusable => write!(f, "Other"),
        }
    }
}

impl Encoding {
    /// A muxed encoding carrying both tracks.
    pub fn combined(id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            video_codec: None,
            audio_codec: None,
            bitrate_kbps: None,
            has_video: true,
            has_audio: true,
        }
    }

    pub fn video_only(id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            has_audio: false,
            ..Self::combined(id, width, height)
        }
    }

    pub fn audio_only(id: impl Into<String>, bitrate_kbps: Option<f64>) -> Self {
        Self {
            id: id.into(),
            width: 0,
            height: 0,
            video_codec: None,
            audio_codec: None,
            bitrate_kbps,
            has_video: false,
            has_audio: true,
        }
    }

    pub fn with_video_codec(mut self, codec: impl Into<String>) -> Self {
        self.video_codec = Some(codec.into());
        self
    }

    pub fn with_audio_codec(mut self, codec: impl Into<String>) -> Self {
        self.audio_codec = Some(codec.into());
        self
    }

    pub fn kind(&self) -> EncodingKind {
        match (self.has_video, self.has_audio) {
            (true, true) => EncodingKind::Combined,
            (true, false) => EncodingKind::VideoOnly,
            (false, true) => EncodingKind::AudioOnly,
            (false, false) => EncodingKind::Unusable,
        }
    }

    /// Sort key for video-bearing encodings: height first, then width.
    pub fn resolution_key(&self) -> (u32, u32) {
        (self.height, self.width)
    }

    /// Audio bitrate with a missing value treated as zero.
    pub fn bitrate_or_zero(&self) -> f64 {
        self.bitrate_kbps.unwrap_or(0.0)
    }

    pub fn covers(&self, min_width: f64, min_height: f64) -> bool {
        f64::from(self.width) >= min_width && f64::from(self.height) >= min_height
    }

    /// True if the video codec starts with any of the denied family prefixes.
    pub fn has_denied_codec(&self, denied: &[String]) -> bool {
        match &self.video_codec {
            Some(codec) => denied.iter().any(|family| codec.starts_with(family.as_str())),
            None => false,
        }
    }

    pub fn resolution_label(&self) -> String {
        if self.has_video {
            format!("{}x{}", self.width, self.height)
        } else {
            "audio only".to_string()
        }
    }
}
