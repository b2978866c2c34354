//! The file orchestrator: top level open, save, append and queries.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use chrono::{Duration, NaiveDateTime};
use tracing::warn;

use crate::FileType;
use crate::error::edf_error::{EDFError, Result};
use crate::fields::{DateMode, FixedInt};
use crate::fragment::{DataFragment, FragmentList, TIME_TOLERANCE};
use crate::headers::edf_header::EDFHeader;
use crate::record;
use crate::signal::{AnnotationSignal, Signal};

/// Byte offset of the number-of-data-records field, relative to the start
/// of the header. It is patched in place after all records are streamed.
const RECORD_COUNT_OFFSET: u64 = 236;

/// Samples-per-record of the annotation signal synthesized for EDF+ files
/// that carry none: a byte budget of 16, enough for the timekeeping TAL.
const SYNTHESIZED_ANNOTATION_SAMPLES: usize = 8;

/// An EDF file held in memory: its header, its signals in declared order
/// and the fragment list tying record indices to recording time.
///
/// `EDFFile` is built either by [`EDFFile::read`]/[`EDFFile::open`] or by
/// hand, filling `header` and `signals` and then calling
/// [`EDFFile::write`]/[`EDFFile::save`]. Cloning performs a deep copy of
/// header, signals and fragments.
#[derive(Debug, Clone)]
pub struct EDFFile {
    pub header: EDFHeader,
    pub signals: Vec<Signal>,
    fragments: FragmentList,
}

impl Default for EDFFile {
    fn default() -> Self {
        Self::new()
    }
}

impl EDFFile {
    pub fn new() -> Self {
        let header = EDFHeader::new();
        let fragments = FragmentList::new(header.record_duration);
        Self {
            header,
            signals: Vec::new(),
            fragments,
        }
    }

    /// Opens and fully reads the file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, DateMode::DayFirst)
    }

    /// Opens a file whose start date uses the legacy `MM.dd.yy` layout.
    pub fn open_with<P: AsRef<Path>>(path: P, mode: DateMode) -> Result<Self> {
        let file = File::open(path)?;
        Self::read_with(&mut BufReader::new(file), mode)
    }

    /// Reads a complete EDF file from a byte stream: header, signal
    /// allocation, then every data-record in order.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        Self::read_with(reader, DateMode::DayFirst)
    }

    pub fn read_with<R: Read>(reader: &mut R, mode: DateMode) -> Result<Self> {
        let mut header = EDFHeader::deserialize_with(reader, mode)?;
        let mut signals = header.allocate_signals();
        let mut fragments = FragmentList::new(header.record_duration);

        let has_standard = signals.iter().any(|s| matches!(s, Signal::Standard(_)));
        let has_annotations = signals.iter().any(|s| matches!(s, Signal::Annotation(_)));
        let record_bytes = header.data_record_bytes();
        // a file without record payload has nothing to stream
        let declared_count = match header.record_count {
            _ if record_bytes == 0 => Some(0),
            count => count,
        };
        let probe_eof = declared_count.is_none();

        let mut buffer = vec![0u8; record_bytes];
        let mut offset = header.header_record_size() as u64;
        let mut expected_start = 0.0f64;
        let mut record_index = 0usize;

        loop {
            if let Some(count) = declared_count {
                if record_index >= count {
                    break;
                }
            }

            let outcome =
                match record::read_record(reader, &mut signals, &mut buffer, probe_eof, &mut offset)?
                {
                    Some(outcome) => outcome,
                    None => break,
                };

            let recorded = outcome.recorded_start_time.unwrap_or(expected_start);
            let delta = recorded - expected_start;

            if delta.abs() <= TIME_TOLERANCE {
                if delta.abs() > 1e-9 && header.file_type == FileType::EDFPlusContinuous {
                    warn!(
                        record_index,
                        drift_seconds = delta,
                        "timekeeping annotation drifts from the computed record start"
                    );
                }
            } else if delta < 0.0 {
                return Err(EDFError::OrderError { record_index });
            } else if header.file_type.is_discontinuous() {
                fragments.mark(record_index, recorded);
            } else if has_standard && header.record_duration > 0.0 {
                return Err(EDFError::ContiguityError {
                    record_index,
                    gap_seconds: delta,
                });
            }
            // otherwise: a time reset in an annotations-only file, accepted

            if record_index == 0 && has_annotations && !has_standard && !outcome.timekeeping_event {
                warn!("annotations-only file: the timekeeping annotation carries no defining event");
            }

            expected_start = recorded + header.record_duration;
            record_index += 1;
        }

        header.record_count = Some(record_index);
        fragments.recompute_end_indices(record_index);

        Ok(Self {
            header,
            signals,
            fragments,
        })
    }

    /// Creates the file at `path` and writes the complete recording to it.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Streams header and data-records into `sink`.
    ///
    /// The header goes out with a placeholder record count of zero; records
    /// are then written until every signal has drained, and the real count
    /// is patched in place before the stream position is restored. EDF+
    /// files are given an annotation signal when they have none, so every
    /// record can carry its timekeeping TAL.
    pub fn write<W: Write + Seek>(&mut self, sink: &mut W) -> Result<()> {
        if self.header.file_type.is_edf_plus()
            && !self.signals.iter().any(|s| matches!(s, Signal::Annotation(_)))
        {
            self.signals.push(Signal::Annotation(AnnotationSignal::new(
                SYNTHESIZED_ANNOTATION_SAMPLES,
            )));
        }

        self.fragments.set_record_duration(self.header.record_duration);
        if !self.header.file_type.is_discontinuous() {
            self.fragments.ensure_contiguous()?;
        }

        for signal in &mut self.signals {
            if let Signal::Annotation(annotation_signal) = signal {
                annotation_signal.purge_timekeeping();
            }
            signal.reset_cursor();
        }

        // declared order on disk: ordinary signals first, annotations after
        let mut order = Vec::with_capacity(self.signals.len());
        order.extend(self.standard_indices());
        order.extend(self.annotation_indices());

        let standard_refs = self
            .signals
            .iter()
            .filter_map(Signal::as_standard)
            .collect::<Vec<_>>();
        let annotation_refs = self
            .signals
            .iter()
            .filter_map(Signal::as_annotation)
            .collect::<Vec<_>>();
        self.header
            .update_signal_fields(&standard_refs, &annotation_refs);

        let has_standard = self.signals.iter().any(|s| matches!(s, Signal::Standard(_)));

        let base = sink.stream_position()?;
        self.header.record_count = Some(0);
        self.header.serialize(sink)?;

        let mut record_index = 0usize;
        loop {
            let standard_pending = self
                .signals
                .iter()
                .any(|s| matches!(s, Signal::Standard(_)) && s.has_pending());
            let annotation_pending = self
                .signals
                .iter()
                .any(|s| matches!(s, Signal::Annotation(_)) && s.has_pending());

            if !standard_pending && !annotation_pending {
                break;
            }
            if !standard_pending && has_standard {
                return Err(EDFError::OverflowError);
            }

            let start_time = self.fragments.record_start_time(record_index);
            let progress = record::write_record(sink, &mut self.signals, &order, start_time)?;

            if progress.samples == 0 && progress.annotations == 0 {
                // only the timekeeping TAL fits, so the next pending
                // annotation can never be placed
                return Err(self.stuck_annotation_error());
            }
            record_index += 1;
        }

        self.header.record_count = Some(record_index);
        self.fragments.recompute_end_indices(record_index);

        let end = sink.stream_position()?;
        sink.seek(SeekFrom::Start(base + RECORD_COUNT_OFFSET))?;
        FixedInt::new(8, record_index as i64).write(sink)?;
        sink.seek(SeekFrom::Start(end))?;

        Ok(())
    }

    fn stuck_annotation_error(&self) -> EDFError {
        for signal in &self.signals {
            if let Signal::Annotation(annotation_signal) = signal {
                if let Some(annotation) =
                    annotation_signal.annotations.get(annotation_signal.cursor)
                {
                    return EDFError::CapacityError {
                        signal: annotation_signal.header.label.clone(),
                        size: annotation.encoded_size(),
                        budget: annotation_signal.byte_budget(),
                    };
                }
            }
        }
        EDFError::OverflowError
    }

    /// Appends a compatible recording that starts at or after the end of
    /// this one. A gap promotes the file to EDF+D; `other`'s samples are
    /// concatenated, its annotations merged into the first annotation
    /// signal with their onsets re-based, and its fragments carried over.
    pub fn append(&mut self, other: &EDFFile) -> Result<()> {
        if !self.header.is_compatible_with(&other.header) {
            return Err(EDFError::IncompatibleHeader);
        }

        let own_records = self.header.record_count.unwrap_or(0);
        let offset_seconds = (other.header.start_datetime() - self.header.start_datetime())
            .num_milliseconds() as f64
            / 1e3;

        let end_relative = self.end_time_relative();
        if offset_seconds + TIME_TOLERANCE < end_relative {
            return Err(EDFError::OrderError {
                record_index: own_records,
            });
        }
        if offset_seconds - end_relative > TIME_TOLERANCE {
            self.header.file_type = FileType::EDFPlusDiscontinuous;
        }

        self.fragments.set_record_duration(self.header.record_duration);
        // other's first record may itself start after other's file start
        self.fragments
            .mark(own_records, offset_seconds + other.fragments.record_start_time(0));
        for fragment in other.fragments.as_slice() {
            if fragment.start_record > 0 {
                self.fragments.mark(
                    own_records + fragment.start_record,
                    offset_seconds + fragment.start_time,
                );
            }
        }

        let mut other_standard = other.signals.iter().filter_map(Signal::as_standard);
        for signal in &mut self.signals {
            if let Signal::Standard(mine) = signal {
                let theirs = other_standard.next().ok_or(EDFError::IncompatibleHeader)?;
                mine.samples.extend_from_slice(&theirs.samples);
            }
        }

        let merged = other
            .signals
            .iter()
            .filter_map(Signal::as_annotation)
            .flat_map(|signal| signal.user_annotations())
            .map(|annotation| {
                let mut rebased = annotation.clone();
                rebased.onset += offset_seconds;
                rebased
            })
            .collect::<Vec<_>>();
        if !merged.is_empty() {
            let first_annotation = self.signals.iter_mut().find_map(|s| match s {
                Signal::Annotation(signal) => Some(signal),
                Signal::Standard(_) => None,
            });
            match first_annotation {
                Some(signal) => signal.annotations.extend(merged),
                None => return Err(EDFError::IncompatibleHeader),
            }
        }

        let total = own_records + other.header.record_count.unwrap_or(0);
        self.header.record_count = Some(total);
        self.fragments.recompute_end_indices(total);

        Ok(())
    }

    /// The first ordinary signal with a matching label; asking for the
    /// annotation label yields the first annotation signal instead.
    pub fn get_signal_by_name(&self, label: &str, ignore_case: bool) -> Option<&Signal> {
        let matches = |candidate: &str| {
            if ignore_case {
                candidate.eq_ignore_ascii_case(label)
            } else {
                candidate == label
            }
        };

        self.signals
            .iter()
            .find(|s| matches!(s, Signal::Standard(_)) && matches(s.label()))
            .or_else(|| {
                if matches(crate::headers::signal_header::ANNOTATION_LABEL) {
                    self.signals
                        .iter()
                        .find(|s| matches!(s, Signal::Annotation(_)))
                } else {
                    None
                }
            })
    }

    /// The instant the recording ends: the end of the last fragment, or the
    /// linear record count when no explicit fragments exist.
    pub fn calculate_end_time(&self) -> NaiveDateTime {
        let millis = (self.end_time_relative() * 1e3).round() as i64;
        self.header.start_datetime() + Duration::milliseconds(millis)
    }

    fn end_time_relative(&self) -> f64 {
        self.fragments
            .as_slice()
            .last()
            .map(DataFragment::end_time)
            .unwrap_or_else(|| {
                self.header.record_duration * self.header.record_count.unwrap_or(0) as f64
            })
    }

    /// Declares that the data-record at `record_index` begins at
    /// `start_time` seconds, creating or updating the covering fragment.
    pub fn mark_fragment(&mut self, record_index: usize, start_time: f64) {
        self.fragments.set_record_duration(self.header.record_duration);
        self.fragments.mark(record_index, start_time);
        self.fragments
            .recompute_end_indices(self.header.record_count.unwrap_or(0));
    }

    pub fn fragments(&self) -> &[DataFragment] {
        self.fragments.as_slice()
    }

    /// The fragment covering a data-record, when an explicit one exists.
    pub fn fragment_at(&self, record_index: usize) -> Option<&DataFragment> {
        self.fragments.fragment_at(record_index)
    }

    fn standard_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.signals
            .iter()
            .enumerate()
            .filter(|(_, s)| matches!(s, Signal::Standard(_)))
            .map(|(i, _)| i)
    }

    fn annotation_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.signals
            .iter()
            .enumerate()
            .filter(|(_, s)| matches!(s, Signal::Annotation(_)))
            .map(|(i, _)| i)
    }
}
