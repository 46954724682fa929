//! Track configuration as handed over by the demuxing layer.
//!
//! [`TrackInfo`] is the per-track slice of the user's options: timecode
//! sync, cue strategy, default-track request, compression, and so on.
//! The packetizer consumes it at construction time; nothing here talks
//! to the container format.

use crate::compression::CompressionMethod;

/// Kind of media carried by a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackType {
    Video,
    Audio,
    Subtitle,
    Buttons,
}

/// Cue (index) entry density requested for a track.
///
/// `Sparse` is the audio-only-file strategy: index I-frames, but at most
/// one entry every two seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CueStrategy {
    #[default]
    Unspecified,
    None,
    IFrames,
    All,
    Sparse,
}

/// Tri-state default-track request from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefaultTrackFlag {
    /// Not given; the track competes at type-derived priority.
    #[default]
    Unspecified,
    /// Explicitly requested as the default for its type.
    Yes,
    /// Explicitly excluded from default-track selection.
    No,
}

/// Linear timecode transform applied to every incoming packet.
///
/// `adjusted = raw * numerator / denominator + displacement`, with the
/// correction and append offsets added to `raw` beforehand. Durations
/// are scaled by the same ratio but never displaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimecodeSync {
    pub numerator: i64,
    pub denominator: i64,
    /// Nanoseconds added after scaling.
    pub displacement: i64,
}

impl Default for TimecodeSync {
    fn default() -> Self {
        Self {
            numerator: 1,
            denominator: 1,
            displacement: 0,
        }
    }
}

impl TimecodeSync {
    /// Apply the full transform to a timecode.
    pub fn apply(&self, raw: i64) -> i64 {
        raw * self.numerator / self.denominator + self.displacement
    }

    /// Scale a duration by the sync ratio (no displacement).
    pub fn scale_duration(&self, duration: i64) -> i64 {
        duration * self.numerator / self.denominator
    }

    /// Whether this transform is the identity.
    pub fn is_identity(&self) -> bool {
        self.numerator == self.denominator && self.displacement == 0
    }
}

/// Video pixel cropping, in pixels per edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelCrop {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

/// Per-track options recognized by the packetizer.
#[derive(Debug, Clone)]
pub struct TrackInfo {
    /// Name of the input file, used in every warning and error.
    pub file_name: String,
    /// Track ID within the input file.
    pub id: i64,
    /// Timecode sync transform.
    pub sync: TimecodeSync,
    /// Fixed delay added to every assigned timecode, in nanoseconds.
    pub packet_delay: i64,
    /// Cue entry strategy.
    pub cues: CueStrategy,
    /// Default-track request.
    pub default_track: DefaultTrackFlag,
    /// ISO 639-2 language code.
    pub language: Option<String>,
    /// Human-readable track name.
    pub track_name: Option<String>,
    /// Frame compression method.
    pub compression: CompressionMethod,
    /// Length in bytes of NALU size fields for AVC-in-container tracks.
    pub nalu_size_length: Option<u8>,
    /// Video pixel cropping.
    pub pixel_cropping: Option<PixelCrop>,
    /// Cap on the number of block-addition payloads kept per packet.
    pub max_add_block_ids: Option<usize>,
    /// Default frame duration forced from the command line, nanoseconds.
    pub default_duration: Option<i64>,
    /// External timecode file to drive assignment, if any.
    pub timecode_file: Option<String>,
}

impl TrackInfo {
    /// Config with defaults for everything but the identity.
    pub fn new(file_name: impl Into<String>, id: i64) -> Self {
        Self {
            file_name: file_name.into(),
            id,
            sync: TimecodeSync::default(),
            packet_delay: 0,
            cues: CueStrategy::Unspecified,
            default_track: DefaultTrackFlag::Unspecified,
            language: None,
            track_name: None,
            compression: CompressionMethod::Unspecified,
            nalu_size_length: None,
            pixel_cropping: None,
            max_add_block_ids: None,
            default_duration: None,
            timecode_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_identity_by_default() {
        let sync = TimecodeSync::default();
        assert!(sync.is_identity());
        assert_eq!(sync.apply(12345), 12345);
        assert_eq!(sync.scale_duration(40), 40);
    }

    #[test]
    fn sync_scales_then_displaces() {
        let sync = TimecodeSync {
            numerator: 2,
            denominator: 1,
            displacement: 1000,
        };
        assert_eq!(sync.apply(500), 2000);
        // Durations are scaled but never displaced.
        assert_eq!(sync.scale_duration(500), 1000);
    }

    #[test]
    fn sync_ratio_slowdown() {
        let sync = TimecodeSync {
            numerator: 1,
            denominator: 2,
            displacement: 0,
        };
        assert_eq!(sync.apply(1000), 500);
    }
}
