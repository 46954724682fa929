//! Codec-specific behavior plugged into the generic packetizer.
//!
//! Codecs differ from the generic pipeline in exactly two places: how a
//! raw frame's reference structure is derived from its bitstream, and
//! what to do once the track headers are finalized (e.g. deriving codec
//! private data). Both are captured by the [`CodecHooks`] trait so the
//! packetizer itself stays codec-agnostic.

use crate::packetizer::TrackHeaders;

/// Reference timecodes derived from a frame's bitstream.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameRefs {
    /// Backward reference timecode, if the frame predicts from the past.
    pub bref: Option<i64>,
    /// Forward reference timecode, if the frame predicts from the future.
    pub fref: Option<i64>,
}

/// Per-codec capability hooks.
///
/// The default implementations classify every frame as a keyframe and
/// ignore header finalization — correct for codecs without inter-frame
/// prediction (PCM, text subtitles).
pub trait CodecHooks: Send {
    /// Derive the reference structure of a raw frame.
    fn classify_frame(&mut self, data: &[u8]) -> FrameRefs {
        let _ = data;
        FrameRefs::default()
    }

    /// Called once when the track headers have been finalized, before
    /// the first packet is handed to the writer.
    fn on_headers_finalized(&mut self, headers: &TrackHeaders) {
        let _ = headers;
    }
}

/// Hooks for codecs where every frame stands alone.
#[derive(Debug, Default)]
pub struct PassthroughHooks;

impl CodecHooks for PassthroughHooks {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_classifies_everything_as_key() {
        let mut hooks = PassthroughHooks;
        let refs = hooks.classify_frame(&[0x00, 0x01, 0x02]);
        assert!(refs.bref.is_none());
        assert!(refs.fref.is_none());
    }
}
