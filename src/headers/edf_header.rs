use std::io::{Read, Write};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sha2::{Digest, Sha256};

use crate::FileType;
use crate::error::edf_error::{EDFError, Result};
use crate::fields::{DateMode, FixedFloat, FixedInt, FixedString, StartDateTime};
use crate::headers::patient::PatientId;
use crate::headers::recording::RecordingId;
use crate::headers::signal_header::SignalHeader;
use crate::signal::{AnnotationSignal, Signal, StandardSignal};

/// Byte size of the fixed header prelude.
pub(crate) const PRELUDE_BYTES: usize = 256;
/// Byte size of one signal's share of the header.
pub(crate) const SIGNAL_HEADER_BYTES: usize = 256;

/// The header record of an EDF file: the fixed 256 byte prelude followed by
/// ten per-signal arrays of fixed-width ASCII fields.
#[derive(Debug, Clone, PartialEq)]
pub struct EDFHeader {
    /// The format version, always `"0"`.
    pub version: String,
    pub patient_id: PatientId,
    pub recording_id: RecordingId,
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    pub file_type: FileType,
    /// Number of data-records; `None` maps to the on-disk `-1` of a file
    /// that is still being recorded.
    pub record_count: Option<usize>,
    /// Duration of one data-record in seconds.
    pub record_duration: f64,
    pub signals: Vec<SignalHeader>,
}

impl Default for EDFHeader {
    fn default() -> Self {
        Self {
            version: "0".to_string(),
            patient_id: PatientId::default(),
            recording_id: RecordingId::default(),
            start_date: NaiveDate::from_ymd_opt(1985, 1, 1).unwrap(),
            start_time: NaiveTime::MIN,
            file_type: FileType::default(),
            record_count: None,
            record_duration: 1.0,
            signals: Vec::new(),
        }
    }
}

impl EDFHeader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_patient_id(&mut self, patient_id: PatientId) -> &mut Self {
        self.patient_id = patient_id;
        self
    }

    pub fn with_recording_id(&mut self, recording_id: RecordingId) -> &mut Self {
        self.recording_id = recording_id;
        self
    }

    pub fn with_start_date(&mut self, start_date: NaiveDate) -> &mut Self {
        self.start_date = start_date;
        self
    }

    pub fn with_start_time(&mut self, start_time: NaiveTime) -> &mut Self {
        self.start_time = start_time;
        self
    }

    pub fn with_file_type(&mut self, file_type: FileType) -> &mut Self {
        self.file_type = file_type;
        self
    }

    pub fn with_record_duration(&mut self, record_duration: f64) -> &mut Self {
        self.record_duration = record_duration;
        self
    }

    /// The header size field: one prelude plus one 256 byte block per signal.
    pub fn header_record_size(&self) -> usize {
        PRELUDE_BYTES + self.signals.len() * SIGNAL_HEADER_BYTES
    }

    /// Byte size of one data-record across all signals.
    pub fn data_record_bytes(&self) -> usize {
        self.signals.iter().map(SignalHeader::byte_budget).sum()
    }

    /// The prelude date and time combined. The recording identification
    /// subfields carry the four digit year when present and win over the
    /// window-clipped prelude date.
    pub fn start_datetime(&self) -> NaiveDateTime {
        let date = self.recording_id.startdate().unwrap_or(self.start_date);
        NaiveDateTime::new(date, self.start_time)
    }

    /// Re-synchronizes the per-signal arrays from the signal list before
    /// writing: ordinary signals first, annotation signals after them.
    pub fn update_signal_fields(
        &mut self,
        standard: &[&StandardSignal],
        annotation: &[&AnnotationSignal],
    ) {
        self.signals = standard
            .iter()
            .map(|s| s.header.clone())
            .chain(annotation.iter().map(|a| a.header.clone()))
            .collect();
    }

    /// Builds the in-memory signals declared by this header, dispatching on
    /// the annotation label and preserving the declared order.
    pub fn allocate_signals(&self) -> Vec<Signal> {
        self.signals
            .iter()
            .map(|header| {
                if header.is_annotation() {
                    Signal::Annotation(AnnotationSignal::allocate(header.clone()))
                } else {
                    Signal::Standard(StandardSignal::allocate(
                        header.clone(),
                        self.record_duration,
                        self.record_count,
                    ))
                }
            })
            .collect()
    }

    /// Whether another file may be appended to this one: same number of
    /// signals, same record duration within 0.1 ms, and every per-signal
    /// header field identical by serialized text.
    pub fn is_compatible_with(&self, other: &EDFHeader) -> bool {
        self.signals.len() == other.signals.len()
            && (self.record_duration - other.record_duration).abs() < 1e-4
            && self.signal_layout_digest() == other.signal_layout_digest()
    }

    /// SHA-256 over the serialized per-signal arrays, attribute-major, the
    /// same text `serialize` emits.
    pub(crate) fn signal_layout_digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        for attribute in 0..10 {
            for signal in &self.signals {
                hasher.update(signal.serialized_fields()[attribute].as_bytes());
            }
        }
        hasher.finalize().into()
    }

    /// Writes the prelude and the ten per-signal arrays in one pass. The
    /// header size is recomputed from the signal count.
    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        FixedString::with_value(8, &self.version).write(writer)?;
        FixedString::with_value(80, &self.patient_id.encode()).write(writer)?;
        FixedString::with_value(80, &self.recording_id.encode()).write(writer)?;
        StartDateTime::new(self.start_date, self.start_time).write(writer)?;
        FixedInt::new(8, self.header_record_size() as i64).write(writer)?;
        FixedString::with_value(44, self.file_type.magic()).write(writer)?;
        FixedInt::new(8, self.record_count.map(|c| c as i64).unwrap_or(-1)).write(writer)?;
        FixedFloat::new(self.record_duration).write(writer)?;
        FixedInt::new(4, self.signals.len() as i64).write(writer)?;

        for attribute in 0..10 {
            for signal in &self.signals {
                writer.write_all(signal.serialized_fields()[attribute].as_bytes())?;
            }
        }

        Ok(())
    }

    /// Reads the prelude and the ten per-signal arrays in one forward pass.
    /// Every field that fails to parse is reported as a format error with
    /// its name and starting byte offset.
    pub fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        Self::deserialize_with(reader, DateMode::DayFirst)
    }

    pub fn deserialize_with<R: Read>(reader: &mut R, mode: DateMode) -> Result<Self> {
        let mut offset = 0u64;

        let version = FixedString::read(reader, 8, &mut offset)?.get().to_string();
        let patient_id = PatientId::parse(FixedString::read(reader, 80, &mut offset)?.get());
        let recording_id = RecordingId::parse(FixedString::read(reader, 80, &mut offset)?.get());
        let start = StartDateTime::read(reader, mode, &mut offset)?;
        let header_size_offset = offset;
        let header_bytes =
            FixedInt::read(reader, 8, "number of bytes in header", &mut offset)?.value();
        let reserved = FixedString::read(reader, 44, &mut offset)?;
        let file_type = FileType::from_magic(reserved.get());
        let record_count_raw =
            FixedInt::read(reader, 8, "number of data records", &mut offset)?.value();
        let record_count = usize::try_from(record_count_raw).ok();
        let duration_offset = offset;
        let record_duration =
            FixedFloat::read(reader, "duration of a data record", &mut offset)?.value();
        let signal_count_offset = offset;
        let signal_count = FixedInt::read(reader, 4, "number of signals", &mut offset)?.value();

        if record_duration < 0.0 || !record_duration.is_finite() {
            return Err(EDFError::FormatError {
                field: "duration of a data record",
                offset: duration_offset,
                reason: format!("{} is not a valid duration", record_duration),
            });
        }
        let signal_count = usize::try_from(signal_count).map_err(|_| EDFError::FormatError {
            field: "number of signals",
            offset: signal_count_offset,
            reason: format!("{} is negative", signal_count),
        })?;

        let mut signals = vec![SignalHeader::default(); signal_count];
        for signal in &mut signals {
            signal.label = FixedString::read(reader, 16, &mut offset)?.get().to_string();
        }
        for signal in &mut signals {
            signal.transducer = FixedString::read(reader, 80, &mut offset)?.get().to_string();
        }
        for signal in &mut signals {
            signal.physical_dimension =
                FixedString::read(reader, 8, &mut offset)?.get().to_string();
        }
        for signal in &mut signals {
            signal.physical_minimum =
                FixedFloat::read(reader, "physical minimum", &mut offset)?.value();
        }
        for signal in &mut signals {
            signal.physical_maximum =
                FixedFloat::read(reader, "physical maximum", &mut offset)?.value();
        }
        for signal in &mut signals {
            signal.digital_minimum =
                FixedInt::read(reader, 8, "digital minimum", &mut offset)?.value() as i32;
        }
        for signal in &mut signals {
            signal.digital_maximum =
                FixedInt::read(reader, 8, "digital maximum", &mut offset)?.value() as i32;
        }
        for signal in &mut signals {
            signal.prefilter = FixedString::read(reader, 80, &mut offset)?.get().to_string();
        }
        for (index, signal) in signals.iter_mut().enumerate() {
            let field_offset = offset;
            let count = FixedInt::read(reader, 8, "samples per record", &mut offset)?.value();
            signal.samples_per_record =
                usize::try_from(count).map_err(|_| EDFError::FormatError {
                    field: "samples per record",
                    offset: field_offset,
                    reason: format!("{} is negative for signal {}", count, index),
                })?;
        }
        for signal in &mut signals {
            signal.reserved = FixedString::read(reader, 32, &mut offset)?.get().to_string();
        }

        let header = Self {
            version,
            patient_id,
            recording_id,
            start_date: start.date,
            start_time: start.time,
            file_type,
            record_count,
            record_duration,
            signals,
        };

        if header_bytes != header.header_record_size() as i64 {
            return Err(EDFError::FormatError {
                field: "number of bytes in header",
                offset: header_size_offset,
                reason: format!(
                    "declared {} bytes, {} signals require {}",
                    header_bytes,
                    signal_count,
                    header.header_record_size()
                ),
            });
        }
        header.validate_signal_ranges()?;

        Ok(header)
    }

    /// The calibration invariants of spec'd EDF: every signal needs
    /// `digital_min < digital_max` and `physical_min != physical_max`.
    fn validate_signal_ranges(&self) -> Result<()> {
        let n = self.signals.len();
        for (index, signal) in self.signals.iter().enumerate() {
            if signal.digital_minimum >= signal.digital_maximum {
                return Err(EDFError::FormatError {
                    field: "digital maximum",
                    offset: (PRELUDE_BYTES + 128 * n + 8 * index) as u64,
                    reason: format!(
                        "digital minimum {} is not below digital maximum {} for signal '{}'",
                        signal.digital_minimum, signal.digital_maximum, signal.label
                    ),
                });
            }
            if signal.physical_minimum == signal.physical_maximum {
                return Err(EDFError::FormatError {
                    field: "physical maximum",
                    offset: (PRELUDE_BYTES + 112 * n + 8 * index) as u64,
                    reason: format!(
                        "physical minimum equals physical maximum for signal '{}'",
                        signal.label
                    ),
                });
            }
        }
        Ok(())
    }
}
