//! Per-source-file coordination of packetizers.
//!
//! A [`Reader`] owns the packetizers created for one input file and
//! fans reader-level operations out to them: header finalization, the
//! global timecode offset for appended files, backpressure accounting
//! and end-of-stream flushing. It also keeps the file-wide progress
//! clock every packetizer advances on assignment.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::packetizer::Packetizer;
use crate::session::MuxSession;
use crate::track::TrackType;

/// All packetizers demuxed from one input file.
pub struct Reader {
    file_name: String,
    session: Arc<MuxSession>,
    packetizers: Vec<Packetizer>,
    /// Largest assigned timecode (plus duration) across all tracks of
    /// this file.
    max_timecode_seen: Arc<AtomicI64>,
    /// This file is appended to a predecessor.
    appending: bool,
    /// Additive offset handed to every packetizer (appended files start
    /// where the predecessor ended).
    timecode_offset: i64,
    num_video_tracks: usize,
    num_audio_tracks: usize,
    num_subtitle_tracks: usize,
}

impl Reader {
    pub fn new(session: Arc<MuxSession>, file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            session,
            packetizers: Vec::new(),
            max_timecode_seen: Arc::new(AtomicI64::new(0)),
            appending: false,
            timecode_offset: 0,
            num_video_tracks: 0,
            num_audio_tracks: 0,
            num_subtitle_tracks: 0,
        }
    }

    /// Reader for a file appended after another one.
    pub fn new_appending(session: Arc<MuxSession>, file_name: impl Into<String>) -> Self {
        Self {
            appending: true,
            ..Self::new(session, file_name)
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn session(&self) -> &Arc<MuxSession> {
        &self.session
    }

    pub fn is_appending(&self) -> bool {
        self.appending
    }

    /// Adopt a packetizer for one of this file's tracks, returning its
    /// index. The packetizer's progress clock is rebound to this
    /// reader's file-wide one.
    pub fn add_packetizer(&mut self, mut packetizer: Packetizer) -> usize {
        packetizer.attach_reader_clock(Arc::clone(&self.max_timecode_seen));
        packetizer.set_correction_timecode_offset(self.timecode_offset);
        match packetizer.headers().track_type {
            Some(TrackType::Video) => self.num_video_tracks += 1,
            Some(TrackType::Audio) => self.num_audio_tracks += 1,
            Some(TrackType::Subtitle | TrackType::Buttons) => self.num_subtitle_tracks += 1,
            None => {}
        }
        tracing::debug!(
            file = %self.file_name,
            track = packetizer.track_info().id,
            "track packetizer registered"
        );
        self.packetizers.push(packetizer);
        self.packetizers.len() - 1
    }

    pub fn packetizers(&self) -> &[Packetizer] {
        &self.packetizers
    }

    pub fn packetizer(&self, idx: usize) -> Option<&Packetizer> {
        self.packetizers.get(idx)
    }

    pub fn packetizer_mut(&mut self, idx: usize) -> Option<&mut Packetizer> {
        self.packetizers.get_mut(idx)
    }

    pub fn num_video_tracks(&self) -> usize {
        self.num_video_tracks
    }

    pub fn num_audio_tracks(&self) -> usize {
        self.num_audio_tracks
    }

    pub fn num_subtitle_tracks(&self) -> usize {
        self.num_subtitle_tracks
    }

    /// Shift every track of this file by a fixed offset. Used when this
    /// file is appended: the offset is the predecessor's end timecode.
    ///
    /// The file-wide progress clock starts at the offset too — an
    /// appended file has made that much progress before its first
    /// packet, and a further append chains off this clock.
    pub fn set_timecode_offset(&mut self, offset: i64) {
        self.timecode_offset = offset;
        self.max_timecode_seen.store(offset, Ordering::Relaxed);
        for packetizer in &mut self.packetizers {
            packetizer.set_correction_timecode_offset(offset);
        }
    }

    pub fn timecode_offset(&self) -> i64 {
        self.timecode_offset
    }

    /// Finalize headers on every track.
    pub fn set_headers(&mut self) {
        for packetizer in &mut self.packetizers {
            packetizer.set_headers();
        }
    }

    /// Settle default-track flags once every file has registered.
    pub fn fix_headers(&mut self) {
        for packetizer in &mut self.packetizers {
            packetizer.fix_headers();
        }
    }

    /// End of stream: finalize all queued packets on every track.
    pub fn flush_packetizers(&mut self) {
        for packetizer in &mut self.packetizers {
            packetizer.flush();
        }
    }

    /// Total bytes queued across all tracks, for demux backpressure.
    pub fn get_queued_bytes(&self) -> i64 {
        self.packetizers.iter().map(Packetizer::get_queued_bytes).sum()
    }

    /// File-wide progress clock: the largest assigned end timecode any
    /// of this file's tracks has produced.
    pub fn max_timecode_seen(&self) -> i64 {
        self.max_timecode_seen.load(Ordering::Relaxed)
    }
}
