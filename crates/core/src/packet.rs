//! The unit of media data flowing through the pipeline.
//!
//! A [`Packet`] is one demuxed frame plus the timing metadata the
//! packetizer needs: the source presentation timecode, optional backward
//! and forward reference timecodes (used to classify the frame as
//! key/predicted/bidirectional), and a duration. The packetizer applies
//! sync transforms and the timecode factory to it; once the factory has
//! run, the packet carries an immutable *assigned* timecode and is ready
//! for extraction by the muxing writer.

/// Identifies the track a packet came from, for log/error attribution.
///
/// This is a value copy, not a reference back into the packetizer —
/// packets outlive their source when handed to the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceId {
    /// Name of the input file the frame was demuxed from.
    pub file: String,
    /// Track ID within that file.
    pub track: i64,
}

/// One media frame with timing metadata.
///
/// Timecodes are nanoseconds, signed 64-bit. `bref`/`fref` are the
/// timecodes of the backward/forward reference frames; `None` means the
/// frame does not reference in that direction. A frame with neither is
/// keyframe-like.
#[derive(Debug)]
pub struct Packet {
    /// Frame payload. Owned by the packet; replaced by the compressed
    /// form if the track has a compressor configured.
    pub data: Vec<u8>,
    /// Block-addition payloads (e.g. alpha planes), same ownership rules.
    pub data_adds: Vec<Vec<u8>>,
    /// Source presentation timecode in nanoseconds. Mutated in place by
    /// the sync transform and monotonicity repair.
    pub timecode: i64,
    /// Frame duration in nanoseconds; 0 = unset.
    pub duration: i64,
    /// The writer must emit this duration even if it matches the track
    /// default (set on the final frame of a stream).
    pub duration_mandatory: bool,
    /// Backward reference timecode.
    pub bref: Option<i64>,
    /// Forward reference timecode.
    pub fref: Option<i64>,
    /// A discontinuity follows this packet (reported by the factory).
    pub gap_following: bool,
    /// Track attribution, filled in during ingestion.
    pub source: Option<SourceId>,

    /// Uncompressed payload size, for backpressure accounting.
    pub(crate) uncompressed_len: usize,
    /// Uncompressed sizes of `data_adds` entries.
    pub(crate) data_adds_lengths: Vec<usize>,
    /// Post-sync timecode snapshotted before factory assignment; the
    /// queueing policies order runs by this value.
    pub(crate) timecode_before_factory: i64,

    assigned_timecode: i64,
    factory_applied: bool,
}

impl Packet {
    /// Create a packet with no reference timecodes (keyframe-like).
    pub fn new(data: Vec<u8>, timecode: i64, duration: i64) -> Self {
        Self::with_refs(data, timecode, duration, None, None)
    }

    /// Create a packet with explicit backward/forward references.
    pub fn with_refs(
        data: Vec<u8>,
        timecode: i64,
        duration: i64,
        bref: Option<i64>,
        fref: Option<i64>,
    ) -> Self {
        Self {
            data,
            data_adds: Vec::new(),
            timecode,
            duration,
            duration_mandatory: false,
            bref,
            fref,
            gap_following: false,
            source: None,
            uncompressed_len: 0,
            data_adds_lengths: Vec::new(),
            timecode_before_factory: 0,
            assigned_timecode: 0,
            factory_applied: false,
        }
    }

    /// Whether this frame references no other frame in either direction.
    pub fn is_key_frame(&self) -> bool {
        self.bref.is_none() && self.fref.is_none()
    }

    /// Whether the timecode factory has run for this packet.
    pub fn factory_applied(&self) -> bool {
        self.factory_applied
    }

    /// The final presentation timecode, available once the factory has run.
    pub fn assigned_timecode(&self) -> Option<i64> {
        self.factory_applied.then_some(self.assigned_timecode)
    }

    /// Uncompressed payload size in bytes.
    pub fn uncompressed_len(&self) -> usize {
        self.uncompressed_len
    }

    /// Record the factory's verdict. May be called at most once.
    pub(crate) fn assign(&mut self, timecode: i64, gap_following: bool) {
        debug_assert!(!self.factory_applied, "timecode assigned twice");
        self.assigned_timecode = timecode;
        self.gap_following = gap_following;
        self.factory_applied = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_packet_is_key_frame() {
        let p = Packet::new(vec![1, 2, 3], 1000, 40);
        assert!(p.is_key_frame());
        assert!(!p.factory_applied());
        assert_eq!(p.assigned_timecode(), None);
    }

    #[test]
    fn refs_make_packet_non_key() {
        let p = Packet::with_refs(vec![], 80, 40, Some(0), Some(120));
        assert!(!p.is_key_frame());
    }

    #[test]
    fn assignment_exposes_timecode() {
        let mut p = Packet::new(vec![], 500, 40);
        p.assign(700, true);
        assert!(p.factory_applied());
        assert_eq!(p.assigned_timecode(), Some(700));
        assert!(p.gap_following);
    }

    #[test]
    #[should_panic(expected = "assigned twice")]
    #[cfg(debug_assertions)]
    fn double_assignment_is_a_bug() {
        let mut p = Packet::new(vec![], 0, 0);
        p.assign(0, false);
        p.assign(1, false);
    }
}
