//! The data-record codec.
//!
//! One data-record holds, for every signal in declared order, either a
//! block of 16 bit little-endian samples (ordinary signals) or a block of
//! TAL bytes (annotation signals). The reader decodes one record at a time
//! into the signal list; the writer drains per-signal cursors into one
//! record at a time, deferring annotations that do not fit the remaining
//! space of the current record.

use std::io::{ErrorKind, Read, Write};

use crate::annotation::{Annotation, TAL_TERMINATOR};
use crate::error::edf_error::{EDFError, Result};
use crate::signal::Signal;

/// What decoding one record yielded.
#[derive(Debug)]
pub(crate) struct RecordOutcome {
    /// Onset of the timekeeping TAL of the record's first annotation
    /// signal; `None` when the file has no annotation signals.
    pub recorded_start_time: Option<f64>,
    /// Whether that first TAL carried a description (a defining event).
    pub timekeeping_event: bool,
}

/// What writing one record consumed.
#[derive(Debug)]
pub(crate) struct WriteProgress {
    pub samples: usize,
    pub annotations: usize,
}

/// Fills `buf` completely, or reports a clean end of stream when not even
/// the first byte could be read.
fn fill_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "end of stream inside a data-record",
                )
                .into());
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}

/// Decodes one data-record from `reader` into the signals. `buffer` must be
/// sized to the record's byte length. With `probe_eof` set, a stream that
/// ends cleanly at the record boundary yields `Ok(None)` instead of an
/// error; this is how files with an unpatched record count of -1 are read.
pub(crate) fn read_record<R: Read>(
    reader: &mut R,
    signals: &mut [Signal],
    buffer: &mut [u8],
    probe_eof: bool,
    offset: &mut u64,
) -> Result<Option<RecordOutcome>> {
    if probe_eof {
        if !fill_or_eof(reader, buffer)? {
            return Ok(None);
        }
    } else {
        reader.read_exact(buffer)?;
    }

    let mut cursor = 0usize;
    let mut outcome = RecordOutcome {
        recorded_start_time: None,
        timekeeping_event: false,
    };
    let mut first_annotation_signal = true;

    for signal in signals.iter_mut() {
        let block_len = signal.header().byte_budget();
        let block = &buffer[cursor..cursor + block_len];
        match signal {
            Signal::Standard(standard) => {
                for pair in block.chunks_exact(2) {
                    let raw = i16::from_le_bytes([pair[0], pair[1]]);
                    let physical = standard.to_physical(raw);
                    standard.samples.push(physical);
                }
            }
            Signal::Annotation(annotation_signal) => {
                let mut tal_cursor = 0usize;
                let mut first_tal = true;
                while tal_cursor < block.len() {
                    if block[tal_cursor] == TAL_TERMINATOR {
                        tal_cursor += 1;
                        continue;
                    }
                    let tal_offset = *offset + (cursor + tal_cursor) as u64;
                    let length = block[tal_cursor..]
                        .iter()
                        .position(|b| *b == TAL_TERMINATOR)
                        .ok_or_else(|| EDFError::FormatError {
                            field: "timestamped annotation list",
                            offset: tal_offset,
                            reason: "unterminated TAL at the end of the record".to_string(),
                        })?;
                    let annotation =
                        Annotation::parse(&block[tal_cursor..tal_cursor + length], tal_offset)?;

                    if first_tal && first_annotation_signal {
                        outcome.recorded_start_time = Some(annotation.onset);
                        outcome.timekeeping_event = !annotation.descriptions.is_empty();
                    }
                    first_tal = false;
                    annotation_signal.annotations.push(annotation);
                    tal_cursor += length + 1;
                }

                if first_annotation_signal && outcome.recorded_start_time.is_none() {
                    return Err(EDFError::FormatError {
                        field: "timekeeping annotation",
                        offset: *offset + cursor as u64,
                        reason: "data-record carries no timekeeping annotation list".to_string(),
                    });
                }
                first_annotation_signal = false;
            }
        }
        cursor += block_len;
    }

    *offset += buffer.len() as u64;
    Ok(Some(outcome))
}

/// Encodes one data-record, advancing every signal's cursor. Ordinary
/// signals that run out of samples pad their block with the digital
/// minimum; annotation blocks open with the synthesized timekeeping TAL
/// (first annotation signal only) and then drain pending annotations
/// greedily, padding with zero bytes.
pub(crate) fn write_record<W: Write>(
    writer: &mut W,
    signals: &mut [Signal],
    order: &[usize],
    start_time: f64,
) -> Result<WriteProgress> {
    let mut progress = WriteProgress {
        samples: 0,
        annotations: 0,
    };
    let mut first_annotation_signal = true;

    for &index in order {
        match &mut signals[index] {
            Signal::Standard(standard) => {
                let pad_value = standard
                    .header
                    .digital_minimum
                    .clamp(i16::MIN as i32, i16::MAX as i32) as i16;
                for _ in 0..standard.header.samples_per_record {
                    let raw = if standard.position < standard.samples.len() {
                        let physical = standard.samples[standard.position];
                        standard.position += 1;
                        progress.samples += 1;
                        standard.to_digital(physical)
                    } else {
                        pad_value
                    };
                    writer.write_all(&raw.to_le_bytes())?;
                }
            }
            Signal::Annotation(annotation_signal) => {
                let budget = annotation_signal.header.byte_budget();
                let label = annotation_signal.header.label.clone();
                let mut block: Vec<u8> = Vec::with_capacity(budget);

                if first_annotation_signal {
                    Annotation::timekeeping(start_time).serialize(&mut block);
                    first_annotation_signal = false;
                    if block.len() > budget {
                        return Err(EDFError::CapacityError {
                            signal: label,
                            size: block.len(),
                            budget,
                        });
                    }
                }

                while annotation_signal.cursor < annotation_signal.annotations.len() {
                    let annotation = &annotation_signal.annotations[annotation_signal.cursor];
                    if annotation.is_timekeeping {
                        annotation_signal.cursor += 1;
                        continue;
                    }
                    let size = annotation.encoded_size();
                    if size > budget {
                        return Err(EDFError::CapacityError {
                            signal: label,
                            size,
                            budget,
                        });
                    }
                    if size > budget - block.len() {
                        // fits the budget, but not this record: defer
                        break;
                    }
                    annotation.serialize(&mut block);
                    annotation_signal.cursor += 1;
                    progress.annotations += 1;
                }

                block.resize(budget, TAL_TERMINATOR);
                writer.write_all(&block)?;
            }
        }
    }

    Ok(progress)
}
