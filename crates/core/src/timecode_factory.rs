//! Pluggable assignment of final presentation timecodes.
//!
//! A [`TimecodeFactory`] decides the *assigned* timecode of every packet
//! on a track. When no factory is configured the packetizer falls back
//! to identity assignment (assigned = source timecode). Factories can be
//! driven by an external timecode file, of which three formats exist:
//!
//! | Version | Contents | Factory |
//! |---------|----------|---------|
//! | v1      | frame ranges with an FPS each | [`RangeFactory`] |
//! | v2 / v4 | one timecode (ms) per frame; v4 allows unsorted entries | [`ListFactory`] |
//! | v3      | durations (seconds) and explicit gaps | [`DurationFactory`] |
//!
//! Files are sniffed via their mandatory first line,
//! `# timecode format vN`; see [`parse_timecode_file`].

use std::collections::HashMap;
use std::fmt;
use std::io::BufRead;

use crate::error::{MuxError, Result, TimecodeParseErrorKind};
use crate::packet::Packet;

const NS_PER_SECOND: f64 = 1_000_000_000.0;

/// How eagerly the factory is applied to queued packets.
///
/// `Automatic` is resolved once the track type is known: video tracks
/// need full queueing (B-frame reordering), audio gets short queueing,
/// subtitles and buttons are assigned immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimecodeFactoryApplicationMode {
    #[default]
    Automatic,
    Immediate,
    ShortQueueing,
    FullQueueing,
}

/// The factory's verdict for one packet.
#[derive(Debug, Clone, Copy)]
pub struct FactoryOutcome {
    /// Final presentation timecode (before the track's packet delay).
    pub timecode: i64,
    /// Replacement duration; `None` keeps the packet's own duration.
    pub duration: Option<i64>,
    /// A discontinuity precedes/follows this frame.
    pub gap_following: bool,
}

/// Strategy assigning final presentation timecodes.
///
/// Implementations may carry per-track state (a position in an external
/// list) but must not look at any packet other than the one passed in.
pub trait TimecodeFactory: Send {
    /// Compute the assigned timecode for the next packet.
    fn get_next(&mut self, packet: &Packet) -> FactoryOutcome;

    /// Default frame duration for the track headers; factories backed by
    /// a constant-rate file override the caller's proposal.
    fn get_default_duration(&self, proposal: i64) -> i64 {
        proposal
    }

    /// Whether the source list contained gap entries.
    fn contains_gap(&self) -> bool {
        false
    }

    /// When set, keep each packet's own duration rather than the
    /// list-derived one (subtitle-like tracks where durations in the
    /// source are authoritative).
    fn set_preserve_duration(&mut self, preserve: bool) {
        let _ = preserve;
    }
}

/// Result of parsing an external timecode file.
pub struct ParsedTimecodeFile {
    /// Format version from the file's first line (1–4).
    pub version: u32,
    pub factory: Box<dyn TimecodeFactory>,
}

impl fmt::Debug for ParsedTimecodeFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParsedTimecodeFile")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Parse an external timecode file and build the matching factory.
///
/// The first line must be `# timecode format vN`. Blank lines and `#`
/// comments are skipped elsewhere; lines that cannot be parsed are
/// warned about and ignored (matching longstanding muxer behavior),
/// except where the format makes them fatal (v2 ordering).
pub fn parse_timecode_file<R: BufRead>(
    mut input: R,
    file_name: &str,
    source_name: &str,
    track: i64,
) -> Result<ParsedTimecodeFile> {
    let mut first_line = String::new();
    input.read_line(&mut first_line)?;
    let version = sniff_version(&first_line).ok_or_else(|| MuxError::TimecodeFileFormat {
        file: file_name.to_string(),
    })?;

    let mut lines = LineReader::new(input, 1);
    let factory: Box<dyn TimecodeFactory> = match version {
        1 => Box::new(RangeFactory::parse(&mut lines, file_name)?),
        2 | 4 => Box::new(ListFactory::parse(
            &mut lines,
            file_name,
            source_name,
            track,
            version == 4,
        )?),
        3 => Box::new(DurationFactory::parse(&mut lines, file_name)?),
        _ => {
            return Err(MuxError::TimecodeFileFormat {
                file: file_name.to_string(),
            });
        }
    };

    Ok(ParsedTimecodeFile { version, factory })
}

fn sniff_version(line: &str) -> Option<u32> {
    let prefix = "# timecode format v";
    let line = line.trim();
    let head = line.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    line[prefix.len()..].trim().parse().ok()
}

/// Line source that counts lines and skips blanks and `#` comments.
struct LineReader<R> {
    input: R,
    line_no: usize,
}

impl<R: BufRead> LineReader<R> {
    fn new(input: R, lines_consumed: usize) -> Self {
        Self {
            input,
            line_no: lines_consumed,
        }
    }

    /// Next non-blank, non-comment line with its 1-based line number.
    fn next(&mut self) -> Result<Option<(usize, String)>> {
        loop {
            let mut buf = String::new();
            if self.input.read_line(&mut buf)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            let line = buf.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            return Ok(Some((self.line_no, line.to_string())));
        }
    }
}

fn parse_error(file: &str, line: usize, kind: TimecodeParseErrorKind) -> MuxError {
    MuxError::TimecodeFileParse {
        file: file.to_string(),
        line,
        kind,
    }
}

/// Read the mandatory `Assume <fps>` line shared by v1 and v3.
fn read_assume_line<R: BufRead>(lines: &mut LineReader<R>, file_name: &str) -> Result<f64> {
    let Some((line_no, line)) = lines.next()? else {
        return Err(parse_error(
            file_name,
            lines.line_no,
            TimecodeParseErrorKind::MissingAssumeLine,
        ));
    };
    let rest = line
        .get(..7)
        .filter(|head| head.eq_ignore_ascii_case("assume "))
        .map(|_| line[7..].trim())
        .ok_or_else(|| {
            parse_error(file_name, line_no, TimecodeParseErrorKind::MissingAssumeLine)
        })?;
    rest.parse().map_err(|_| {
        parse_error(file_name, line_no, TimecodeParseErrorKind::MissingAssumeLine)
    })
}

// ---------------------------------------------------------------------
// v1: frame ranges

#[derive(Debug, Clone, Copy)]
struct TimecodeRange {
    start_frame: u64,
    end_frame: u64,
    fps: f64,
    base_timecode: f64,
}

/// Factory driven by a v1 file: ranges of frame numbers, each with its
/// own FPS; holes between ranges run at the `Assume` default.
pub struct RangeFactory {
    ranges: Vec<TimecodeRange>,
    current_range: usize,
    frameno: u64,
    default_fps: f64,
}

impl RangeFactory {
    fn parse<R: BufRead>(lines: &mut LineReader<R>, file_name: &str) -> Result<Self> {
        let default_fps = read_assume_line(lines, file_name)?;

        let mut ranges: Vec<TimecodeRange> = Vec::new();
        while let Some((line_no, line)) = lines.next()? {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let parsed = (fields.len() == 3)
                .then(|| {
                    Some(TimecodeRange {
                        start_frame: fields[0].parse().ok()?,
                        end_frame: fields[1].parse().ok()?,
                        fps: fields[2].parse().ok()?,
                        base_timecode: 0.0,
                    })
                })
                .flatten();
            let Some(range) = parsed else {
                tracing::warn!(file = file_name, line = line_no, "unparsable timecode range");
                continue;
            };
            if range.fps <= 0.0 || range.end_frame < range.start_frame {
                tracing::warn!(
                    file = file_name,
                    line = line_no,
                    "inconsistent timecode range (start after end, or FPS not positive)"
                );
                continue;
            }
            ranges.push(range);
        }

        // Fill holes between the given ranges at the default FPS, then
        // cover everything before the first and after the last range.
        ranges.sort_by_key(|r| r.start_frame);
        let mut filled: Vec<TimecodeRange> = Vec::with_capacity(ranges.len() + 2);
        let mut next_frame = 0u64;
        for range in ranges {
            if range.start_frame > next_frame {
                filled.push(TimecodeRange {
                    start_frame: next_frame,
                    end_frame: range.start_frame - 1,
                    fps: default_fps,
                    base_timecode: 0.0,
                });
            }
            next_frame = range.end_frame + 1;
            filled.push(range);
        }
        filled.push(TimecodeRange {
            start_frame: next_frame,
            end_frame: u64::MAX,
            fps: default_fps,
            base_timecode: 0.0,
        });

        for idx in 1..filled.len() {
            let prev = filled[idx - 1];
            filled[idx].base_timecode = prev.base_timecode
                + (prev.end_frame - prev.start_frame + 1) as f64 * NS_PER_SECOND / prev.fps;
        }

        tracing::debug!(
            file = file_name,
            default_fps,
            ranges = filled.len(),
            "timecode file v1 parsed"
        );

        Ok(Self {
            ranges: filled,
            current_range: 0,
            frameno: 0,
            default_fps,
        })
    }

    fn timecode_at(&self, frame: u64) -> i64 {
        let mut range = &self.ranges[self.current_range];
        if frame > range.end_frame && self.current_range < self.ranges.len() - 1 {
            range = &self.ranges[self.current_range + 1];
        }
        (range.base_timecode
            + NS_PER_SECOND * (frame - range.start_frame) as f64 / range.fps) as i64
    }
}

impl TimecodeFactory for RangeFactory {
    fn get_next(&mut self, _packet: &Packet) -> FactoryOutcome {
        let timecode = self.timecode_at(self.frameno);
        let duration = self.timecode_at(self.frameno + 1) - timecode;
        self.frameno += 1;
        if self.frameno > self.ranges[self.current_range].end_frame
            && self.current_range < self.ranges.len() - 1
        {
            self.current_range += 1;
        }
        FactoryOutcome {
            timecode,
            duration: Some(duration),
            gap_following: false,
        }
    }

    fn get_default_duration(&self, proposal: i64) -> i64 {
        if self.default_fps != 0.0 {
            (NS_PER_SECOND / self.default_fps) as i64
        } else {
            proposal
        }
    }
}

// ---------------------------------------------------------------------
// v2/v4: explicit per-frame timecodes

/// Factory driven by a v2/v4 file: one timecode (in milliseconds) per
/// frame. Durations are the deltas between consecutive entries; the most
/// frequent delta becomes the track's default duration (constant frame
/// rate detection). Once the list runs out, remaining packets keep their
/// source timecodes.
pub struct ListFactory {
    file_name: String,
    source_name: String,
    track: i64,
    timecodes: Vec<i64>,
    durations: Vec<i64>,
    frameno: usize,
    default_duration: i64,
    preserve_duration: bool,
    exhausted_warned: bool,
}

impl ListFactory {
    fn parse<R: BufRead>(
        lines: &mut LineReader<R>,
        file_name: &str,
        source_name: &str,
        track: i64,
        allow_unsorted: bool,
    ) -> Result<Self> {
        let mut timecodes: Vec<i64> = Vec::new();
        let mut durations: Vec<i64> = Vec::new();
        let mut delta_counts: HashMap<i64, u64> = HashMap::new();
        let mut previous = f64::MIN;

        while let Some((line_no, line)) = lines.next()? {
            let timecode_ms: f64 = line.parse().map_err(|_| {
                parse_error(file_name, line_no, TimecodeParseErrorKind::InvalidNumber)
            })?;
            if !allow_unsorted && timecode_ms < previous {
                return Err(parse_error(
                    file_name,
                    line_no,
                    TimecodeParseErrorKind::UnsortedTimecodes,
                ));
            }
            previous = timecode_ms;
            timecodes.push((timecode_ms * 1_000_000.0) as i64);
            if timecodes.len() > 1 {
                let delta = timecodes[timecodes.len() - 1] - timecodes[timecodes.len() - 2];
                *delta_counts.entry(delta).or_insert(0) += 1;
                durations.push(delta);
            }
        }
        if timecodes.is_empty() {
            return Err(parse_error(
                file_name,
                lines.line_no,
                TimecodeParseErrorKind::NoEntries,
            ));
        }

        // Constant-frame-rate detection: the most frequent delta also
        // serves as the last frame's duration. Ties break towards the
        // smaller delta so the result is deterministic.
        let default_duration = delta_counts
            .iter()
            .max_by_key(|&(delta, count)| (*count, -*delta))
            .map(|(delta, _)| *delta)
            .unwrap_or(0);
        durations.push(default_duration);

        tracing::debug!(
            file = file_name,
            entries = timecodes.len(),
            default_duration,
            "timecode file v2/v4 parsed"
        );

        Ok(Self {
            file_name: file_name.to_string(),
            source_name: source_name.to_string(),
            track,
            timecodes,
            durations,
            frameno: 0,
            default_duration,
            preserve_duration: false,
            exhausted_warned: false,
        })
    }
}

impl TimecodeFactory for ListFactory {
    fn get_next(&mut self, packet: &Packet) -> FactoryOutcome {
        if self.frameno >= self.timecodes.len() {
            if !self.exhausted_warned {
                tracing::warn!(
                    file = %self.source_name,
                    track = self.track,
                    timecode_file = %self.file_name,
                    entries = self.timecodes.len(),
                    "external timecode list has fewer entries than the track has frames; \
                     keeping source timecodes for the rest"
                );
                self.exhausted_warned = true;
            }
            return FactoryOutcome {
                timecode: packet.timecode,
                duration: None,
                gap_following: false,
            };
        }

        let timecode = self.timecodes[self.frameno];
        let list_duration = self.durations[self.frameno];
        self.frameno += 1;
        let duration = if self.preserve_duration && packet.duration > 0 {
            None
        } else {
            Some(list_duration)
        };
        FactoryOutcome {
            timecode,
            duration,
            gap_following: false,
        }
    }

    fn get_default_duration(&self, proposal: i64) -> i64 {
        if self.default_duration > 0 {
            self.default_duration
        } else {
            proposal
        }
    }

    fn set_preserve_duration(&mut self, preserve: bool) {
        self.preserve_duration = preserve;
    }
}

// ---------------------------------------------------------------------
// v3: durations and gaps

#[derive(Debug, Clone, Copy)]
struct DurationEntry {
    /// Length of this stretch in nanoseconds.
    duration: i64,
    /// FPS within the stretch; 0 keeps each packet's own duration.
    fps: f64,
    is_gap: bool,
}

/// Factory driven by a v3 file: stretches of playback described by a
/// duration and FPS, with explicit `Gap` entries in between.
pub struct DurationFactory {
    entries: Vec<DurationEntry>,
    current: usize,
    current_timecode: i64,
    current_offset: i64,
    has_gap_entries: bool,
}

impl DurationFactory {
    fn parse<R: BufRead>(lines: &mut LineReader<R>, file_name: &str) -> Result<Self> {
        let default_fps = read_assume_line(lines, file_name)?;

        let mut entries: Vec<DurationEntry> = Vec::new();
        let mut has_gap_entries = false;
        while let Some((line_no, line)) = lines.next()? {
            let entry = if line.get(..4).is_some_and(|head| head.eq_ignore_ascii_case("gap,")) {
                line[4..].trim().parse::<f64>().ok().map(|seconds| DurationEntry {
                    duration: (seconds * NS_PER_SECOND) as i64,
                    fps: default_fps,
                    is_gap: true,
                })
            } else {
                let fields: Vec<&str> = line.split(',').map(str::trim).collect();
                let seconds: Option<f64> = fields.first().and_then(|f| f.parse().ok());
                let fps: Option<f64> = match fields.len() {
                    1 => Some(default_fps),
                    2 => fields[1].parse().ok(),
                    _ => None,
                };
                seconds.zip(fps).map(|(seconds, fps)| DurationEntry {
                    duration: (seconds * NS_PER_SECOND) as i64,
                    fps,
                    is_gap: false,
                })
            };
            let Some(entry) = entry else {
                tracing::warn!(file = file_name, line = line_no, "unparsable duration entry");
                continue;
            };
            if entry.fps < 0.0 || entry.duration <= 0 {
                tracing::warn!(
                    file = file_name,
                    line = line_no,
                    "inconsistent duration entry (duration or FPS not positive)"
                );
                continue;
            }
            has_gap_entries |= entry.is_gap;
            entries.push(entry);
        }

        if entries.is_empty() {
            tracing::warn!(file = file_name, "timecode file v3 contains no usable entries");
        }
        // Open-ended terminal stretch at the default FPS.
        entries.push(DurationEntry {
            duration: i64::MAX,
            fps: default_fps,
            is_gap: false,
        });

        tracing::debug!(
            file = file_name,
            default_fps,
            entries = entries.len(),
            "timecode file v3 parsed"
        );

        Ok(Self {
            entries,
            current: 0,
            current_timecode: 0,
            current_offset: 0,
            has_gap_entries,
        })
    }
}

impl TimecodeFactory for DurationFactory {
    fn get_next(&mut self, packet: &Packet) -> FactoryOutcome {
        let mut gap_following = false;
        if self.entries[self.current].is_gap {
            // Skip over the gap (and any empty stretches) in one go.
            let mut idx = self.current;
            while self.entries[idx].is_gap || self.entries[idx].duration == 0 {
                self.current_offset += self.entries[idx].duration;
                idx += 1;
            }
            self.current = idx;
            gap_following = true;
        }

        let timecode = self.current_offset + self.current_timecode;
        let entry = self.entries[self.current];
        let duration = if entry.fps != 0.0 {
            (NS_PER_SECOND / entry.fps) as i64
        } else {
            packet.duration
        };
        self.current_timecode += duration;
        if self.current_timecode >= entry.duration {
            self.current_offset += entry.duration;
            self.current_timecode = 0;
            self.current += 1;
        }

        FactoryOutcome {
            timecode,
            duration: Some(duration),
            gap_following,
        }
    }

    fn contains_gap(&self) -> bool {
        self.has_gap_entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(contents: &str) -> Result<ParsedTimecodeFile> {
        parse_timecode_file(Cursor::new(contents), "tc.txt", "input.avi", 0)
    }

    fn dummy_packet(timecode: i64, duration: i64) -> Packet {
        Packet::new(vec![], timecode, duration)
    }

    // --- format sniffing ---

    #[test]
    fn rejects_missing_format_line() {
        assert!(matches!(
            parse("1000\n2000\n"),
            Err(MuxError::TimecodeFileFormat { .. })
        ));
    }

    #[test]
    fn rejects_unknown_version() {
        assert!(matches!(
            parse("# timecode format v9\n"),
            Err(MuxError::TimecodeFileFormat { .. })
        ));
    }

    #[test]
    fn sniffs_version_case_insensitively() {
        let parsed = parse("# TimeCode Format v2\n0\n40\n80\n").unwrap();
        assert_eq!(parsed.version, 2);
    }

    // --- v1 ---

    #[test]
    fn v1_requires_assume_line() {
        let err = parse("# timecode format v1\n0,100,25\n").unwrap_err();
        assert!(matches!(
            err,
            MuxError::TimecodeFileParse {
                kind: TimecodeParseErrorKind::MissingAssumeLine,
                ..
            }
        ));
    }

    #[test]
    fn v1_ranges_drive_timecodes() {
        // Frames 0-1 at 50 fps (20ms each), everything after at the
        // assumed 25 fps (40ms each).
        let parsed = parse("# timecode format v1\nAssume 25\n0,1,50\n").unwrap();
        let mut factory = parsed.factory;
        let p = dummy_packet(0, 0);

        let first = factory.get_next(&p);
        assert_eq!(first.timecode, 0);
        assert_eq!(first.duration, Some(20_000_000));

        let second = factory.get_next(&p);
        assert_eq!(second.timecode, 20_000_000);
        assert_eq!(second.duration, Some(20_000_000));

        let third = factory.get_next(&p);
        assert_eq!(third.timecode, 40_000_000);
        assert_eq!(third.duration, Some(40_000_000));
    }

    #[test]
    fn v1_default_duration_from_assume_fps() {
        let parsed = parse("# timecode format v1\nAssume 25\n").unwrap();
        assert_eq!(parsed.factory.get_default_duration(-1), 40_000_000);
    }

    // --- v2/v4 ---

    #[test]
    fn v2_assigns_listed_timecodes() {
        let parsed = parse("# timecode format v2\n0\n40\n80\n120\n").unwrap();
        let mut factory = parsed.factory;
        let p = dummy_packet(999, 0);

        let first = factory.get_next(&p);
        assert_eq!(first.timecode, 0);
        assert_eq!(first.duration, Some(40_000_000));
        assert!(!first.gap_following);

        let second = factory.get_next(&p);
        assert_eq!(second.timecode, 40_000_000);
    }

    #[test]
    fn v2_rejects_unsorted() {
        let err = parse("# timecode format v2\n0\n120\n40\n").unwrap_err();
        assert!(matches!(
            err,
            MuxError::TimecodeFileParse {
                kind: TimecodeParseErrorKind::UnsortedTimecodes,
                line: 4,
                ..
            }
        ));
    }

    #[test]
    fn v4_allows_unsorted() {
        let parsed = parse("# timecode format v4\n0\n120\n40\n80\n").unwrap();
        let mut factory = parsed.factory;
        let p = dummy_packet(0, 0);
        assert_eq!(factory.get_next(&p).timecode, 0);
        assert_eq!(factory.get_next(&p).timecode, 120_000_000);
        assert_eq!(factory.get_next(&p).timecode, 40_000_000);
    }

    #[test]
    fn v2_rejects_empty_list() {
        let err = parse("# timecode format v2\n# only comments\n").unwrap_err();
        assert!(matches!(
            err,
            MuxError::TimecodeFileParse {
                kind: TimecodeParseErrorKind::NoEntries,
                ..
            }
        ));
    }

    #[test]
    fn v2_exhaustion_falls_back_to_source_timecodes() {
        let parsed = parse("# timecode format v2\n0\n40\n").unwrap();
        let mut factory = parsed.factory;
        let p = dummy_packet(0, 0);
        factory.get_next(&p);
        factory.get_next(&p);

        let extra = dummy_packet(123_000_000, 0);
        let outcome = factory.get_next(&extra);
        assert_eq!(outcome.timecode, 123_000_000);
        assert_eq!(outcome.duration, None);
    }

    #[test]
    fn v2_detects_constant_frame_rate() {
        let parsed = parse("# timecode format v2\n0\n40\n80\n120\n200\n").unwrap();
        // 40ms deltas dominate; default duration is 40ms regardless of
        // the caller's proposal.
        assert_eq!(parsed.factory.get_default_duration(-1), 40_000_000);
    }

    #[test]
    fn v2_preserve_duration_keeps_packet_duration() {
        let parsed = parse("# timecode format v2\n0\n40\n80\n").unwrap();
        let mut factory = parsed.factory;
        factory.set_preserve_duration(true);

        let with_own = dummy_packet(0, 7_000_000);
        assert_eq!(factory.get_next(&with_own).duration, None);

        // Packets without a duration of their own still take the list's.
        let without = dummy_packet(0, 0);
        assert_eq!(factory.get_next(&without).duration, Some(40_000_000));
    }

    // --- v3 ---

    #[test]
    fn v3_gap_shifts_following_timecodes() {
        // One second at 25 fps, a two second gap, then the terminal
        // stretch at the assumed fps.
        let parsed = parse("# timecode format v3\nAssume 25\n1,25\ngap,2\n").unwrap();
        let mut factory = parsed.factory;
        assert!(factory.contains_gap());

        let p = dummy_packet(0, 0);
        let mut last = FactoryOutcome {
            timecode: 0,
            duration: None,
            gap_following: false,
        };
        // 25 frames of 40ms fill the first stretch.
        for _ in 0..25 {
            last = factory.get_next(&p);
            assert!(!last.gap_following);
        }
        assert_eq!(last.timecode, 960_000_000);

        let after_gap = factory.get_next(&p);
        assert!(after_gap.gap_following);
        assert_eq!(after_gap.timecode, 3_000_000_000);
    }

    #[test]
    fn v3_without_gaps_reports_none() {
        let parsed = parse("# timecode format v3\nAssume 25\n1,25\n").unwrap();
        assert!(!parsed.factory.contains_gap());
    }

    #[test]
    fn v3_zero_fps_keeps_packet_duration() {
        let parsed = parse("# timecode format v3\nAssume 25\n1,0\n").unwrap();
        let mut factory = parsed.factory;
        let p = dummy_packet(0, 15_000_000);
        let outcome = factory.get_next(&p);
        assert_eq!(outcome.duration, Some(15_000_000));
    }
}
