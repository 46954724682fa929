//! The generic per-track packetizer.
//!
//! A [`Packetizer`] sits between one demuxed track and the muxing
//! writer. Frames enter through [`add_packet`](Packetizer::add_packet)
//! (or [`process_frame`](Packetizer::process_frame) when codec hooks
//! classify the bitstream), are sync-adjusted, repaired for
//! monotonicity, run through the timecode factory, and leave strictly
//! in arrival order through [`get_packet`](Packetizer::get_packet).
//!
//! Timecode handling is the subtle part. Three adjustments stack up, in
//! this order:
//!
//! 1. additive offsets: the correction offset (accumulated monotonicity
//!    repair) and the append offset (shift applied to appended files),
//! 2. the linear sync transform from the track options,
//! 3. the timecode factory, which may replace the result wholesale.
//!
//! Depending on the factory application mode, step 3 may be deferred
//! until enough packets are queued to determine presentation order
//! (B-frames arrive in storage order). Extraction is FIFO regardless:
//! a packet only becomes available once the factory has run for it and
//! for everything queued before it.

use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::compression::{CompressionMethod, Compressor};
use crate::error::{MuxError, Result};
use crate::hooks::{CodecHooks, PassthroughHooks};
use crate::packet::{Packet, SourceId};
use crate::session::{MuxSession, UniqueIdCategory};
use crate::timecode_factory::{
    FactoryOutcome, TimecodeFactory, TimecodeFactoryApplicationMode, parse_timecode_file,
};
use crate::track::{CueStrategy, DefaultTrackFlag, TrackInfo, TrackType};

/// Where a packetizer stands in an append chain handshake.
///
/// Appending file B after file A connects B's packetizer to A's in two
/// phases: the first `connect()` announces the peer (packets are
/// buffered from then on), the second completes the chain and replays
/// the buffer with the append offset applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Unconnected,
    AwaitingPeer,
    Connected,
}

/// Track header fields owned by the packetizer.
///
/// The writer renders these into the output container; the packetizer
/// may revise `min_cache` after rendering (see
/// [`take_header_rerenders`](Packetizer::take_header_rerenders)).
#[derive(Debug, Clone, Default)]
pub struct TrackHeaders {
    /// Track number in the output; 0 until assigned.
    pub serialno: u64,
    /// Collision-free track UID; 0 until assigned.
    pub uid: u32,
    pub track_type: Option<TrackType>,
    /// Minimum number of frames a decoder must cache. Raised to 1 when
    /// the first backward reference shows up, to 2 on the first forward
    /// reference; never lowered.
    pub min_cache: u32,
    pub max_cache: Option<u32>,
    /// Default frame duration in nanoseconds.
    pub default_duration: Option<i64>,
    /// Cap on block-addition payloads per frame.
    pub max_add_block_ids: Option<usize>,
    pub codec_id: String,
    pub codec_private: Option<Vec<u8>>,
    pub compression: CompressionMethod,
    /// Final default-track flag, settled by [`Packetizer::fix_headers`].
    pub default_track_flag: bool,
    /// The source file already flagged this track as its default.
    pub default_track_from_source: bool,
}

/// State machine turning demuxed frames into writer-ready packets.
pub struct Packetizer {
    ti: TrackInfo,
    session: Arc<MuxSession>,
    /// Clock shared with the owning reader; advanced on every
    /// assignment so cross-track progress checks stay cheap.
    reader_max_timecode: Arc<AtomicI64>,

    headers: TrackHeaders,
    headers_set: bool,
    header_rerenders: u32,
    default_duration_forced: bool,
    default_track_warning_printed: bool,

    compressor: Option<Compressor>,
    hooks: Box<dyn CodecHooks>,
    timecode_factory: Option<Box<dyn TimecodeFactory>>,
    factory_mode: TimecodeFactoryApplicationMode,

    packet_queue: VecDeque<Packet>,
    /// Packets buffered while the append handshake is half done.
    deferred_packets: Vec<Packet>,
    /// Index of the first packet the factory has not run for (hint).
    next_unassigned: usize,
    enqueued_bytes: i64,

    /// Timecode/duration of the last packet that passed the
    /// monotonicity check, for computing repairs.
    safety_last_timecode: i64,
    safety_last_duration: i64,
    relaxed_timecode_checking: bool,
    /// Accumulated monotonicity repair, added to every later timecode.
    correction_timecode_offset: i64,
    /// Shift applied to appended files, usually the predecessor's
    /// max_timecode_seen.
    append_timecode_offset: i64,
    max_timecode_seen: i64,

    connection: ConnectionState,
    has_been_flushed: bool,
}

fn queued_size(packet: &Packet) -> i64 {
    (packet.uncompressed_len + packet.data_adds_lengths.iter().sum::<usize>()) as i64
}

impl Packetizer {
    /// Create a packetizer for one track.
    ///
    /// Opens and parses the external timecode file if the track options
    /// name one.
    pub fn new(session: Arc<MuxSession>, ti: TrackInfo) -> Result<Self> {
        let timecode_factory = match &ti.timecode_file {
            Some(path) => {
                let file = BufReader::new(File::open(path)?);
                let parsed = parse_timecode_file(file, path, &ti.file_name, ti.id)?;
                tracing::debug!(
                    file = %ti.file_name,
                    track = ti.id,
                    timecode_file = %path,
                    version = parsed.version,
                    "using external timecode file"
                );
                Some(parsed.factory)
            }
            None => None,
        };

        let mut headers = TrackHeaders {
            compression: ti.compression,
            max_add_block_ids: ti.max_add_block_ids,
            ..TrackHeaders::default()
        };
        let default_duration_forced = ti.default_duration.is_some();
        headers.default_duration = ti.default_duration;

        Ok(Self {
            compressor: Compressor::create(ti.compression),
            ti,
            session,
            reader_max_timecode: Arc::new(AtomicI64::new(0)),
            headers,
            headers_set: false,
            header_rerenders: 0,
            default_duration_forced,
            default_track_warning_printed: false,
            hooks: Box::new(PassthroughHooks),
            timecode_factory,
            factory_mode: TimecodeFactoryApplicationMode::Automatic,
            packet_queue: VecDeque::new(),
            deferred_packets: Vec::new(),
            next_unassigned: 0,
            enqueued_bytes: 0,
            safety_last_timecode: 0,
            safety_last_duration: 0,
            relaxed_timecode_checking: false,
            correction_timecode_offset: 0,
            append_timecode_offset: 0,
            max_timecode_seen: 0,
            connection: ConnectionState::Unconnected,
            has_been_flushed: false,
        })
    }

    /// The track options this packetizer was built from.
    pub fn track_info(&self) -> &TrackInfo {
        &self.ti
    }

    /// Current header fields.
    pub fn headers(&self) -> &TrackHeaders {
        &self.headers
    }

    /// Replace the codec hooks (default: everything is a keyframe).
    pub fn set_hooks(&mut self, hooks: Box<dyn CodecHooks>) {
        self.hooks = hooks;
    }

    /// Install a timecode factory programmatically (an external
    /// timecode file installs one automatically).
    pub fn set_timecode_factory(&mut self, factory: Box<dyn TimecodeFactory>) {
        self.timecode_factory = Some(factory);
    }

    /// Set the track type and resolve the factory application mode.
    ///
    /// `Automatic` resolves per type: video needs full queueing (frames
    /// arrive in storage order), audio gets short queueing, subtitles
    /// and buttons are assigned immediately.
    pub fn set_track_type(&mut self, track_type: TrackType, mode: TimecodeFactoryApplicationMode) {
        self.headers.track_type = Some(track_type);
        self.factory_mode = match mode {
            TimecodeFactoryApplicationMode::Automatic => match track_type {
                TrackType::Video => TimecodeFactoryApplicationMode::FullQueueing,
                TrackType::Audio => TimecodeFactoryApplicationMode::ShortQueueing,
                TrackType::Subtitle | TrackType::Buttons => {
                    TimecodeFactoryApplicationMode::Immediate
                }
            },
            other => other,
        };
        if track_type == TrackType::Audio && self.ti.cues == CueStrategy::Unspecified {
            self.ti.cues = CueStrategy::Sparse;
        }
        if matches!(track_type, TrackType::Subtitle | TrackType::Buttons)
            && let Some(factory) = self.timecode_factory.as_mut()
        {
            // Subtitle durations come from the source, not the list.
            factory.set_preserve_duration(true);
        }
    }

    pub fn set_codec_id(&mut self, codec_id: impl Into<String>) {
        self.headers.codec_id = codec_id.into();
    }

    pub fn set_codec_private(&mut self, data: Vec<u8>) {
        self.headers.codec_private = Some(data);
    }

    /// Propose a default frame duration (from the demuxed headers).
    /// Ignored when the user forced one on the command line.
    pub fn set_track_default_duration(&mut self, duration: i64) {
        if !self.default_duration_forced {
            self.headers.default_duration = Some(duration);
        }
    }

    /// Propose a minimum decoder cache size (from the demuxed headers).
    /// The inferred value from the actual reference structure is never
    /// lowered.
    pub fn set_track_min_cache(&mut self, min_cache: u32) {
        if min_cache > self.headers.min_cache {
            self.headers.min_cache = min_cache;
        }
    }

    pub fn set_track_max_cache(&mut self, max_cache: u32) {
        self.headers.max_cache = Some(max_cache);
    }

    /// Adopt a UID from the source file. Fails if another track already
    /// claimed it; a fresh one is generated in `set_headers` then.
    pub fn set_uid(&mut self, uid: u32) -> bool {
        if self.session.is_unique_u32(uid, UniqueIdCategory::Track) {
            self.session.add_unique_u32(uid, UniqueIdCategory::Track);
            self.headers.uid = uid;
            true
        } else {
            false
        }
    }

    /// Disable the monotonicity safety check (tracks whose source
    /// timecodes are authoritative even when they go backwards).
    pub fn set_relaxed_timecode_checking(&mut self, relaxed: bool) {
        self.relaxed_timecode_checking = relaxed;
    }

    /// Finalize the track headers: assign track number and UID, settle
    /// the default duration and the default-track competition.
    ///
    /// No-op for appended tracks, which inherit the predecessor's
    /// headers through `connect()`.
    pub fn set_headers(&mut self) {
        if self.connection != ConnectionState::Unconnected {
            return;
        }
        if self.headers.serialno == 0 {
            self.headers.serialno = self.session.next_track_number();
        }
        if self.headers.uid == 0 {
            self.headers.uid = self.session.create_unique_u32(UniqueIdCategory::Track);
        }
        if self.headers.compression == CompressionMethod::Unspecified {
            self.headers.compression = CompressionMethod::None;
        }
        if !self.default_duration_forced
            && let Some(factory) = &self.timecode_factory
        {
            let proposal = self.headers.default_duration.unwrap_or(0);
            let duration = factory.get_default_duration(proposal);
            if duration > 0 {
                self.headers.default_duration = Some(duration);
            }
        }

        if let Some(track_type) = self.headers.track_type {
            let mut priority = MuxSession::default_track_priority(self.ti.default_track);
            if self.ti.default_track == DefaultTrackFlag::Unspecified
                && self.headers.default_track_from_source
            {
                priority = crate::session::DEFAULT_TRACK_PRIORITY_FROM_SOURCE;
            }
            let chosen = self
                .session
                .set_as_default_track(track_type, priority, self.headers.serialno);
            if !chosen
                && self.ti.default_track == DefaultTrackFlag::Yes
                && !self.default_track_warning_printed
            {
                tracing::warn!(
                    file = %self.ti.file_name,
                    track = self.ti.id,
                    "another track was already chosen as the default track for this type"
                );
                self.default_track_warning_printed = true;
            }
            self.headers.default_track_flag = chosen;
        }

        self.headers_set = true;
        self.hooks.on_headers_finalized(&self.headers);
    }

    /// Settle the default-track flag after every track has competed.
    pub fn fix_headers(&mut self) {
        if let Some(track_type) = self.headers.track_type {
            self.headers.default_track_flag = self
                .session
                .is_default_track(track_type, self.headers.serialno);
        }
    }

    /// How often the rendered headers became stale (min_cache raised
    /// after rendering). Cleared by the call.
    pub fn take_header_rerenders(&mut self) -> u32 {
        std::mem::take(&mut self.header_rerenders)
    }

    /// Like [`take_header_rerenders`](Self::take_header_rerenders), but
    /// non-consuming.
    pub fn pending_header_rerenders(&self) -> u32 {
        self.header_rerenders
    }

    /// Classify a raw frame through the codec hooks and ingest it.
    pub fn process_frame(&mut self, data: Vec<u8>, timecode: i64, duration: i64) -> Result<()> {
        let refs = self.hooks.classify_frame(&data);
        self.add_packet(Packet::with_refs(
            data, timecode, duration, refs.bref, refs.fref,
        ))
    }

    /// Ingest one packet.
    ///
    /// Compresses the payload if configured, then either buffers it
    /// (append handshake half done) or runs the sync/repair/factory
    /// pipeline and queues it for extraction.
    pub fn add_packet(&mut self, mut packet: Packet) -> Result<()> {
        if let Some(max) = self.ti.max_add_block_ids {
            packet.data_adds.truncate(max);
        }
        packet.uncompressed_len = packet.data.len();
        packet.data_adds_lengths = packet.data_adds.iter().map(Vec::len).collect();

        if let Some(compressor) = &self.compressor {
            packet.data = compressor
                .compress(&packet.data)
                .map_err(|source| self.compression_error(source))?;
            for add in &mut packet.data_adds {
                *add = compressor
                    .compress(add)
                    .map_err(|source| self.compression_error(source))?;
            }
        }

        // A lone forward reference is really a backward one in disguise
        // (sources that only report "references another frame").
        if packet.bref.is_none() && packet.fref.is_some() {
            packet.bref = packet.fref.take();
        }

        packet.source = Some(SourceId {
            file: self.ti.file_name.clone(),
            track: self.ti.id,
        });
        self.enqueued_bytes += queued_size(&packet);

        if self.connection == ConnectionState::AwaitingPeer {
            self.deferred_packets.push(packet);
        } else {
            self.sync_and_enqueue(packet);
        }
        Ok(())
    }

    fn compression_error(&self, source: std::io::Error) -> MuxError {
        MuxError::Compression {
            file: self.ti.file_name.clone(),
            track: self.ti.id,
            source,
        }
    }

    /// Apply offsets, sync, cache inference and monotonicity repair,
    /// then queue the packet and run the factory as far as possible.
    fn sync_and_enqueue(&mut self, mut packet: Packet) {
        let offset = self.correction_timecode_offset + self.append_timecode_offset;
        packet.timecode = self.ti.sync.apply(packet.timecode + offset);
        packet.bref = packet.bref.map(|b| self.ti.sync.apply(b + offset));
        packet.fref = packet.fref.map(|f| self.ti.sync.apply(f + offset));
        packet.duration = self.ti.sync.scale_duration(packet.duration);

        // min_cache follows the reference structure actually seen; once
        // raised it stays raised, and already-rendered headers must be
        // rendered again.
        if packet.fref.is_some() {
            if self.headers.min_cache < 2 {
                self.headers.min_cache = 2;
                if self.headers_set {
                    self.header_rerenders += 1;
                }
            }
        } else if packet.bref.is_some() && self.headers.min_cache < 1 {
            self.headers.min_cache = 1;
            if self.headers_set {
                self.header_rerenders += 1;
            }
        }

        if packet.timecode < 0 {
            tracing::trace!(
                file = %self.ti.file_name,
                track = self.ti.id,
                timecode = packet.timecode,
                "dropping frame with negative timecode"
            );
            self.enqueued_bytes -= queued_size(&packet);
            return;
        }

        if !self.relaxed_timecode_checking
            && packet.timecode < self.safety_last_timecode
            && packet.fref.is_none()
        {
            if self.headers.track_type == Some(TrackType::Audio) {
                let needed =
                    self.safety_last_timecode + self.safety_last_duration - packet.timecode;
                self.correction_timecode_offset += needed;
                packet.timecode += needed;
                packet.bref = packet.bref.map(|b| b + needed);
                packet.fref = packet.fref.map(|f| f + needed);
                tracing::warn!(
                    file = %self.ti.file_name,
                    track = self.ti.id,
                    correction_ms = (needed + 500_000) / 1_000_000,
                    "audio timecode went backwards; shifting this and all later frames"
                );
            } else {
                // Expected for B-frames; anything else is the source
                // container's problem and is passed through untouched.
                tracing::debug!(
                    file = %self.ti.file_name,
                    track = self.ti.id,
                    timecode = packet.timecode,
                    previous = self.safety_last_timecode,
                    "timecode smaller than the previous one"
                );
            }
        }

        self.safety_last_timecode = packet.timecode;
        self.safety_last_duration = packet.duration;
        packet.timecode_before_factory = packet.timecode;
        self.packet_queue.push_back(packet);

        if self.timecode_factory.is_none()
            || self.factory_mode == TimecodeFactoryApplicationMode::Immediate
        {
            let idx = self.packet_queue.len() - 1;
            self.apply_factory_to(idx);
            self.next_unassigned = idx + 1;
        } else {
            self.apply_factory();
        }
    }

    /// Run the factory for one queued packet and finalize it.
    fn apply_factory_to(&mut self, idx: usize) {
        let packet = &mut self.packet_queue[idx];
        let outcome = match self.timecode_factory.as_mut() {
            Some(factory) => factory.get_next(packet),
            None => FactoryOutcome {
                timecode: packet.timecode,
                duration: None,
                gap_following: false,
            },
        };
        if let Some(duration) = outcome.duration {
            packet.duration = duration;
        }
        let assigned = outcome.timecode + self.ti.packet_delay;
        packet.assign(assigned, outcome.gap_following);

        let end = assigned + packet.duration.max(0);
        if end > self.max_timecode_seen {
            self.max_timecode_seen = end;
        }
        self.reader_max_timecode.fetch_max(end, Ordering::Relaxed);
    }

    /// Run the factory for every packet whose run is already bounded.
    fn apply_factory(&mut self) {
        let mut start = self.next_unassigned.min(self.packet_queue.len());
        while start < self.packet_queue.len() && self.packet_queue[start].factory_applied() {
            start += 1;
        }
        if start >= self.packet_queue.len() {
            self.next_unassigned = start;
            return;
        }
        match self.factory_mode {
            TimecodeFactoryApplicationMode::ShortQueueing => {
                self.apply_factory_short_queueing(start)
            }
            TimecodeFactoryApplicationMode::FullQueueing => {
                self.apply_factory_full_queueing(start)
            }
            TimecodeFactoryApplicationMode::Immediate
            | TimecodeFactoryApplicationMode::Automatic => {
                while start < self.packet_queue.len() {
                    self.apply_factory_to(start);
                    start += 1;
                }
                self.next_unassigned = start;
            }
        }
    }

    /// A run ends at the next packet whose pre-factory timecode is not
    /// smaller than the run leader's (audio decoder delay reordering is
    /// shallow, so this bounds runs quickly).
    fn apply_factory_short_queueing(&mut self, mut start: usize) {
        loop {
            let len = self.packet_queue.len();
            let run_timecode = self.packet_queue[start].timecode_before_factory;
            let mut end = start + 1;
            while end < len && self.packet_queue[end].timecode_before_factory < run_timecode {
                end += 1;
            }
            if end >= len && !self.has_been_flushed {
                // The run may still grow; wait for more packets.
                return;
            }
            for idx in start..end {
                self.apply_factory_to(idx);
            }
            self.next_unassigned = end;
            start = end;
            if start >= len {
                return;
            }
        }
    }

    /// A run ends at the next keyframe. Within a run the factory is
    /// consulted in presentation order (pre-factory timecode, original
    /// index as tie-break), so B-frames delivered in storage order get
    /// the right entries from list-driven factories.
    fn apply_factory_full_queueing(&mut self, mut start: usize) {
        loop {
            let len = self.packet_queue.len();
            let mut end = start + 1;
            while end < len && !self.packet_queue[end].is_key_frame() {
                end += 1;
            }
            if end >= len && !self.has_been_flushed {
                return;
            }

            let mut order: Vec<usize> = (start..end).collect();
            let sorted = order.windows(2).all(|w| {
                self.packet_queue[w[0]].timecode_before_factory
                    <= self.packet_queue[w[1]].timecode_before_factory
            });
            if !sorted {
                order.sort_by_key(|&idx| (self.packet_queue[idx].timecode_before_factory, idx));
            }
            for idx in order {
                self.apply_factory_to(idx);
            }
            self.next_unassigned = end;
            start = end;
            if start >= len {
                return;
            }
        }
    }

    /// End of stream: finalize every still-queued packet, even runs
    /// that never got bounded.
    pub fn flush(&mut self) {
        self.has_been_flushed = true;
        self.apply_factory();
    }

    /// Extract the oldest packet, if the factory has run for it.
    /// Extraction order is always arrival order.
    pub fn get_packet(&mut self) -> Option<Packet> {
        if !self.packet_queue.front()?.factory_applied() {
            return None;
        }
        let packet = self.packet_queue.pop_front()?;
        self.enqueued_bytes -= queued_size(&packet);
        self.next_unassigned = self.next_unassigned.saturating_sub(1);
        Some(packet)
    }

    /// Whether [`get_packet`](Self::get_packet) would return a packet.
    pub fn packet_available(&self) -> bool {
        self.packet_queue
            .front()
            .is_some_and(Packet::factory_applied)
    }

    /// Assigned timecode of the oldest extractable packet.
    pub fn get_smallest_timecode(&self) -> Option<i64> {
        self.packet_queue.front().and_then(Packet::assigned_timecode)
    }

    /// Mark the most recently queued packet's duration as mandatory
    /// (the writer must emit it even if it equals the track default).
    pub fn force_duration_on_last_packet(&mut self) {
        match self.packet_queue.back_mut() {
            Some(packet) => packet.duration_mandatory = true,
            None => {
                tracing::debug!(
                    file = %self.ti.file_name,
                    track = self.ti.id,
                    "no packet in the queue to force a duration on"
                );
            }
        }
    }

    /// Bytes currently queued (uncompressed sizes), for backpressure.
    pub fn get_queued_bytes(&self) -> i64 {
        self.enqueued_bytes
    }

    /// Largest assigned timecode plus duration seen so far.
    pub fn max_timecode_seen(&self) -> i64 {
        self.max_timecode_seen
    }

    /// Append-chain handshake state.
    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    /// Connect this packetizer to the predecessor it is appended to.
    ///
    /// Called twice: once when the chain is announced (packets are
    /// deferred from then on) and once when the predecessor has finished
    /// (deferred packets are replayed, shifted by `append_timecode_offset`
    /// or, by default, the predecessor's max timecode).
    pub fn connect(&mut self, src: &Packetizer, append_timecode_offset: Option<i64>) -> Result<()> {
        if self.connection == ConnectionState::Connected {
            return Err(MuxError::AlreadyConnected {
                file: self.ti.file_name.clone(),
                track: self.ti.id,
            });
        }

        self.headers.serialno = src.headers.serialno;
        self.headers.uid = src.headers.uid;
        self.headers.track_type = src.headers.track_type;
        self.headers.default_duration = src.headers.default_duration;
        self.headers.compression = src.headers.compression;
        self.compressor = Compressor::create(src.headers.compression);
        self.correction_timecode_offset = 0;
        self.append_timecode_offset = append_timecode_offset.unwrap_or(src.max_timecode_seen);

        self.connection = match self.connection {
            ConnectionState::Unconnected => ConnectionState::AwaitingPeer,
            ConnectionState::AwaitingPeer | ConnectionState::Connected => {
                ConnectionState::Connected
            }
        };
        tracing::debug!(
            file = %self.ti.file_name,
            track = self.ti.id,
            state = ?self.connection,
            append_offset = self.append_timecode_offset,
            "append chain connect"
        );
        if self.connection == ConnectionState::Connected {
            self.process_deferred_packets();
        }
        Ok(())
    }

    fn process_deferred_packets(&mut self) {
        for packet in std::mem::take(&mut self.deferred_packets) {
            self.sync_and_enqueue(packet);
        }
    }

    pub(crate) fn attach_reader_clock(&mut self, clock: Arc<AtomicI64>) {
        self.reader_max_timecode = clock;
    }

    pub(crate) fn set_correction_timecode_offset(&mut self, offset: i64) {
        self.correction_timecode_offset = offset;
    }
}

impl Drop for Packetizer {
    fn drop(&mut self) {
        if !self.packet_queue.is_empty() {
            tracing::warn!(
                file = %self.ti.file_name,
                track = self.ti.id,
                frames = self.packet_queue.len(),
                "packets remained in the queue and were lost"
            );
        }
    }
}
