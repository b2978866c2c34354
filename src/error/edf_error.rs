use std::io;

use thiserror::Error;

/// Errors surfaced while reading, writing or editing an EDF file.
///
/// Reads and writes are single-pass streaming operations; none of these
/// errors is retried internally. A failed write leaves the sink in an
/// undefined state, so callers should write to a temporary path and rename
/// on success.
#[derive(Debug, Error)]
pub enum EDFError {
    /// A fixed-width ASCII field or a TAL byte did not follow the format.
    /// Carries the field name and the byte offset at which the field starts.
    #[error("malformed {field} at byte {offset}: {reason}")]
    FormatError {
        field: &'static str,
        offset: u64,
        reason: String,
    },

    /// A data-record carried a start time earlier than the end of the
    /// previous record.
    #[error("data-record {record_index} starts before the end of the previous record")]
    OrderError { record_index: usize },

    /// A data-record left a gap in time although the file is not declared
    /// discontinuous (EDF+D).
    #[error("data-record {record_index} leaves a gap of {gap_seconds} s in a continuous file")]
    ContiguityError {
        record_index: usize,
        gap_seconds: f64,
    },

    /// An annotation is larger than the per-record byte budget of its
    /// annotation signal.
    #[error("annotation of {size} bytes exceeds the {budget} byte record budget of signal '{signal}'")]
    CapacityError {
        signal: String,
        size: usize,
        budget: usize,
    },

    /// Annotations were still pending after the last sample of every
    /// ordinary signal had been written.
    #[error("annotations remain after all signal samples have been written")]
    OverflowError,

    /// Two files with differing signal layouts were appended or merged.
    #[error("signal layouts of the two files do not match")]
    IncompatibleHeader,

    /// An underlying stream failure, propagated unchanged.
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, EDFError>;
