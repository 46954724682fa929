//! Error types for the muxing core.

use std::fmt;

/// Errors that can occur while packetizing and assigning timecodes.
///
/// Variants map to specific failure modes across the stack:
///
/// - **Packet ingestion**: [`Compression`](Self::Compression) — a frame
///   could not be compressed; fatal for the affected run.
/// - **Timecode files**: [`TimecodeFileFormat`](Self::TimecodeFileFormat),
///   [`TimecodeFileParse`](Self::TimecodeFileParse) — malformed external
///   timecode lists.
/// - **Track chaining**: [`AlreadyConnected`](Self::AlreadyConnected) —
///   a third `connect()` call on a track that already has both ends of
///   its append chain. This is a caller bug, not bad user input.
///
/// Every user-actionable variant carries the source file name and track
/// ID so the message can be acted on without further digging.
#[derive(Debug, thiserror::Error)]
pub enum MuxError {
    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Compressing a frame (or one of its additions) failed.
    #[error("'{file}' track {track}: compressing a frame failed: {source}")]
    Compression {
        file: String,
        track: i64,
        #[source]
        source: std::io::Error,
    },

    /// The timecode file's format line is missing or names an unknown version.
    ///
    /// The very first line must look like `# timecode format v1`.
    #[error("the timecode file '{file}' contains an unsupported/unrecognized format line")]
    TimecodeFileFormat { file: String },

    /// A line of the timecode file could not be parsed.
    #[error("the timecode file '{file}' could not be parsed: {kind} (line {line})")]
    TimecodeFileParse {
        file: String,
        line: usize,
        kind: TimecodeParseErrorKind,
    },

    /// `connect()` was called on a packetizer whose append chain is complete.
    #[error("'{file}' track {track}: connect() called on an already fully connected track")]
    AlreadyConnected { file: String, track: i64 },
}

/// Specific kind of timecode file parse failure.
#[derive(Debug)]
pub enum TimecodeParseErrorKind {
    /// No valid `Assume` line with the default frames per second.
    MissingAssumeLine,
    /// A field that should be a number was not one.
    InvalidNumber,
    /// A v2 file contains timecodes that are not in ascending order
    /// (only the v4 variant allows unsorted entries).
    UnsortedTimecodes,
    /// The file contains no usable entries at all.
    NoEntries,
}

impl fmt::Display for TimecodeParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingAssumeLine => {
                write!(
                    f,
                    "no valid 'Assume' line with the default number of frames per second"
                )
            }
            Self::InvalidNumber => write!(f, "not a valid number"),
            Self::UnsortedTimecodes => {
                write!(
                    f,
                    "timecodes are not ordered; use format v4 for unsorted timecodes"
                )
            }
            Self::NoEntries => write!(f, "no valid entries"),
        }
    }
}

/// Convenience alias for `Result<T, MuxError>`.
pub type Result<T> = std::result::Result<T, MuxError>;
