//! Integration test: a two-file muxing run from demux to drain.
//!
//! Builds a reader with a video and an audio track, drives frames
//! through the factory pipeline, appends a second file through the
//! connect handshake, and drains everything the way a writer would:
//! always the track with the smallest assigned timecode first.

use std::io::Cursor;
use std::sync::Arc;

use trackmux::packet::Packet;
use trackmux::packetizer::Packetizer;
use trackmux::reader::Reader;
use trackmux::session::MuxSession;
use trackmux::timecode_factory::{TimecodeFactoryApplicationMode, parse_timecode_file};
use trackmux::track::{TrackInfo, TrackType};

const FRAME: &[u8] = &[0x42; 64];

fn make_packetizer(
    session: &Arc<MuxSession>,
    file: &str,
    id: i64,
    track_type: TrackType,
) -> Packetizer {
    let mut p = Packetizer::new(Arc::clone(session), TrackInfo::new(file, id))
        .expect("packetizer construction");
    p.set_track_type(track_type, TimecodeFactoryApplicationMode::Automatic);
    p
}

/// Drain every available packet, smallest assigned timecode first, and
/// return (track index, assigned timecode) pairs.
fn drain(reader: &mut Reader) -> Vec<(usize, i64)> {
    let mut out = Vec::new();
    loop {
        let next = (0..reader.packetizers().len())
            .filter_map(|idx| {
                reader
                    .packetizer(idx)
                    .and_then(Packetizer::get_smallest_timecode)
                    .map(|tc| (idx, tc))
            })
            .min_by_key(|&(_, tc)| tc);
        let Some((idx, _)) = next else {
            break;
        };
        let packet = reader
            .packetizer_mut(idx)
            .and_then(Packetizer::get_packet)
            .expect("smallest timecode implies an extractable packet");
        let tc = packet
            .assigned_timecode()
            .expect("extracted packets are always assigned");
        out.push((idx, tc));
    }
    out
}

#[test]
fn two_track_mux_with_external_timecodes_and_append() {
    let session = Arc::new(MuxSession::deterministic());
    let mut reader = Reader::new(Arc::clone(&session), "part1.avi");

    // Video track driven by an external v2 timecode list (25 fps).
    let mut video = make_packetizer(&session, "part1.avi", 0, TrackType::Video);
    let timecodes = "# timecode format v2\n0\n40\n80\n120\n";
    let parsed = parse_timecode_file(Cursor::new(timecodes), "tc.txt", "part1.avi", 0)
        .expect("timecode file parses");
    video.set_timecode_factory(parsed.factory);

    let audio = make_packetizer(&session, "part1.avi", 1, TrackType::Audio);

    let video_idx = reader.add_packetizer(video);
    let audio_idx = reader.add_packetizer(audio);
    reader.set_headers();
    reader.fix_headers();

    {
        let video = reader.packetizer_mut(video_idx).expect("video track");
        // The external list overrides the proposed default duration.
        assert_eq!(video.headers().default_duration, Some(40_000_000));

        // Keyframe, two predicted frames, closing keyframe: full
        // queueing holds the run until the second keyframe arrives.
        video
            .add_packet(Packet::new(FRAME.to_vec(), 0, 0))
            .expect("ingest");
        video
            .add_packet(Packet::with_refs(FRAME.to_vec(), 40_000_000, 0, Some(0), None))
            .expect("ingest");
        assert!(!video.packet_available());
        video
            .add_packet(Packet::with_refs(
                FRAME.to_vec(),
                80_000_000,
                0,
                Some(40_000_000),
                None,
            ))
            .expect("ingest");
        video
            .add_packet(Packet::new(FRAME.to_vec(), 120_000_000, 0))
            .expect("ingest");
        assert!(video.packet_available());
    }
    {
        let audio = reader.packetizer_mut(audio_idx).expect("audio track");
        for frameno in 0..4 {
            audio
                .add_packet(Packet::new(
                    FRAME.to_vec(),
                    frameno * 24_000_000,
                    24_000_000,
                ))
                .expect("ingest");
        }
    }

    assert_eq!(reader.get_queued_bytes(), 8 * FRAME.len() as i64);

    reader.flush_packetizers();
    let drained = drain(&mut reader);

    // Interleaved by assigned timecode; all of it extractable.
    assert_eq!(drained.len(), 8);
    let timecodes: Vec<i64> = drained.iter().map(|&(_, tc)| tc).collect();
    let mut sorted = timecodes.clone();
    sorted.sort_unstable();
    assert_eq!(timecodes, sorted, "drain order follows assigned timecodes");
    assert_eq!(reader.get_queued_bytes(), 0);

    // Video frames got the external list's timecodes.
    let video_timecodes: Vec<i64> = drained
        .iter()
        .filter(|&&(idx, _)| idx == video_idx)
        .map(|&(_, tc)| tc)
        .collect();
    assert_eq!(
        video_timecodes,
        vec![0, 40_000_000, 80_000_000, 120_000_000]
    );

    // Audio progressed to 4 * 24ms, video to 120ms + the 40ms default
    // duration from the list.
    assert_eq!(reader.max_timecode_seen(), 160_000_000);

    // Exactly one default track per type, from the deterministic
    // session's competition.
    {
        let video = reader.packetizer(video_idx).expect("video track");
        let audio = reader.packetizer(audio_idx).expect("audio track");
        assert!(video.headers().default_track_flag);
        assert!(audio.headers().default_track_flag);
        assert_ne!(video.headers().serialno, audio.headers().serialno);
        assert_ne!(video.headers().uid, audio.headers().uid);
    }

    // Append a second file: the audio track connects to its
    // predecessor in two phases and replays deferred packets shifted
    // past the predecessor's end.
    let mut part2 = Reader::new_appending(Arc::clone(&session), "part2.avi");
    let audio2 = make_packetizer(&session, "part2.avi", 1, TrackType::Audio);
    let audio2_idx = part2.add_packetizer(audio2);

    let predecessor_end = {
        let predecessor = reader.packetizer(audio_idx).expect("audio track");
        let appended = part2.packetizer_mut(audio2_idx).expect("appended track");
        appended
            .connect(predecessor, None)
            .expect("first connect announces the peer");
        appended
            .add_packet(Packet::new(FRAME.to_vec(), 0, 24_000_000))
            .expect("ingest while awaiting peer");
        assert!(!appended.packet_available(), "deferred until connected");
        appended
            .connect(predecessor, None)
            .expect("second connect completes the chain");
        predecessor.max_timecode_seen()
    };
    assert_eq!(predecessor_end, 96_000_000);

    let appended = part2.packetizer_mut(audio2_idx).expect("appended track");
    assert_eq!(
        appended.headers().serialno,
        reader.packetizer(audio_idx).expect("audio track").headers().serialno,
        "appended track continues the predecessor's output track"
    );
    let replayed = appended.get_packet().expect("deferred packet replayed");
    assert_eq!(replayed.timecode, predecessor_end);
}
