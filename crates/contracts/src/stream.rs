//! Stream profiles and delivered frames.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Kind of stream a sensor produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Depth,
    Color,
    Infrared,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Depth => "depth",
            StreamKind::Color => "color",
            StreamKind::Infrared => "infrared",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pixel format of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// 16-bit depth
    Z16,
    Rgb8,
    Bgr8,
    Yuyv,
    /// 8-bit luminance (infrared)
    Y8,
}

/// A concrete streaming configuration offered by a sensor.
///
/// Profiles are supplied by the device; the harness only filters and
/// selects among them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamProfile {
    /// Stream kind
    pub kind: StreamKind,

    /// Pixel format
    pub format: PixelFormat,

    /// Requested frame rate (Hz)
    pub fps: u32,

    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,
}

impl StreamProfile {
    /// Whether this profile has the given kind, format and frame rate
    pub fn matches(&self, kind: StreamKind, format: PixelFormat, fps: u32) -> bool {
        self.kind == kind && self.format == format && self.fps == fps
    }
}

impl fmt::Display for StreamProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:?} {}x{} @ {} Hz",
            self.kind, self.format, self.width, self.height, self.fps
        )
    }
}

/// A delivered frame.
///
/// The harness only reads `frame_number`; the payload is carried so that
/// collaborators can hand over real frame memory without copying.
#[derive(Debug, Clone)]
pub struct FrameEvent {
    /// Device frame counter, expected to increase by one per frame
    pub frame_number: u64,

    /// Device timestamp (milliseconds)
    pub timestamp_ms: f64,

    /// Opaque frame content (zero-copy)
    pub payload: Bytes,
}

impl FrameEvent {
    /// Frame without content, used by simulated devices and tests
    pub fn empty(frame_number: u64, timestamp_ms: f64) -> Self {
        Self {
            frame_number,
            timestamp_ms,
            payload: Bytes::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_matches() {
        let profile = StreamProfile {
            kind: StreamKind::Depth,
            format: PixelFormat::Z16,
            fps: 30,
            width: 848,
            height: 480,
        };

        assert!(profile.matches(StreamKind::Depth, PixelFormat::Z16, 30));
        assert!(!profile.matches(StreamKind::Depth, PixelFormat::Z16, 15));
        assert!(!profile.matches(StreamKind::Color, PixelFormat::Z16, 30));
        assert!(!profile.matches(StreamKind::Depth, PixelFormat::Rgb8, 30));
    }

    #[test]
    fn test_stream_kind_serde_snake_case() {
        let json = serde_json::to_string(&StreamKind::Color).unwrap();
        assert_eq!(json, "\"color\"");
        let format: PixelFormat = serde_json::from_str("\"rgb8\"").unwrap();
        assert_eq!(format, PixelFormat::Rgb8);
    }
}
