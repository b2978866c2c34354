//! The two signal variants of an EDF file.
//!
//! An ordinary (standard) signal carries a sequence of physical-unit
//! samples together with the calibration that maps them onto 16 bit raw
//! values. An annotation signal carries a sequence of annotations and uses
//! its samples-per-record attribute as half of its per-record byte budget.

use crate::annotation::Annotation;
use crate::headers::signal_header::SignalHeader;

/// A signal of an EDF file. The record codec dispatches on the variant to
/// pick the block codec.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Standard(StandardSignal),
    Annotation(AnnotationSignal),
}

impl Signal {
    pub fn header(&self) -> &SignalHeader {
        match self {
            Signal::Standard(signal) => &signal.header,
            Signal::Annotation(signal) => &signal.header,
        }
    }

    pub fn header_mut(&mut self) -> &mut SignalHeader {
        match self {
            Signal::Standard(signal) => &mut signal.header,
            Signal::Annotation(signal) => &mut signal.header,
        }
    }

    pub fn label(&self) -> &str {
        &self.header().label
    }

    pub fn as_standard(&self) -> Option<&StandardSignal> {
        match self {
            Signal::Standard(signal) => Some(signal),
            Signal::Annotation(_) => None,
        }
    }

    pub fn as_annotation(&self) -> Option<&AnnotationSignal> {
        match self {
            Signal::Standard(_) => None,
            Signal::Annotation(signal) => Some(signal),
        }
    }

    /// True when this signal still has samples or annotations that have not
    /// been consumed by the record writer.
    pub(crate) fn has_pending(&self) -> bool {
        match self {
            // a signal without samples per record can never drain
            Signal::Standard(signal) => {
                signal.header.samples_per_record > 0 && signal.position < signal.samples.len()
            }
            Signal::Annotation(signal) => signal.cursor < signal.annotations.len(),
        }
    }

    pub(crate) fn reset_cursor(&mut self) {
        match self {
            Signal::Standard(signal) => signal.position = 0,
            Signal::Annotation(signal) => signal.cursor = 0,
        }
    }
}

/// An ordinary signal holding physical-unit samples.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardSignal {
    pub header: SignalHeader,
    /// Samples in physical units, appended record by record while reading
    /// and consumed from the front while writing.
    pub samples: Vec<f64>,
    /// Sampling frequency in Hz, derived from the samples-per-record count
    /// and the data-record duration. Zero when the duration is zero.
    pub frequency: f64,
    pub(crate) position: usize,
}

impl StandardSignal {
    pub fn new(header: SignalHeader) -> Self {
        Self {
            header,
            samples: Vec::new(),
            frequency: 0.0,
            position: 0,
        }
    }

    /// Allocation used by the reader: derives the sampling frequency and
    /// pre-sizes the sample vector from the expected record count.
    pub(crate) fn allocate(
        header: SignalHeader,
        record_duration: f64,
        record_count: Option<usize>,
    ) -> Self {
        let frequency = if record_duration > 0.0 {
            header.samples_per_record as f64 / record_duration
        } else {
            0.0
        };
        let capacity = record_count
            .unwrap_or(0)
            .saturating_mul(header.samples_per_record);
        Self {
            samples: Vec::with_capacity(capacity),
            frequency,
            header,
            position: 0,
        }
    }

    /// Physical units per digital unit of the affine calibration map.
    pub fn gain(&self) -> f64 {
        (self.header.physical_maximum - self.header.physical_minimum)
            / (self.header.digital_maximum - self.header.digital_minimum) as f64
    }

    /// Digital offset of the affine calibration map.
    pub fn offset(&self) -> f64 {
        self.header.physical_maximum / self.gain() - self.header.digital_maximum as f64
    }

    /// Maps a raw value to physical units. Raw values outside the declared
    /// digital range are extrapolated by the same line.
    pub fn to_physical(&self, raw: i16) -> f64 {
        self.gain() * (self.offset() + raw as f64)
    }

    /// Maps a physical value to the nearest raw value, ties to even,
    /// clipped into the 16 bit range.
    pub fn to_digital(&self, physical: f64) -> i16 {
        let raw = (physical / self.gain() - self.offset()).round_ties_even();
        raw.clamp(i16::MIN as f64, i16::MAX as f64) as i16
    }
}

/// An annotation signal. Its `samples_per_record` attribute declares a byte
/// budget of `2 * samples_per_record` per data-record.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationSignal {
    pub header: SignalHeader,
    /// Annotations in record order. Timekeeping entries read from a file
    /// are kept here with `is_timekeeping` set; writing skips them and
    /// synthesizes fresh ones.
    pub annotations: Vec<Annotation>,
    pub(crate) cursor: usize,
}

impl AnnotationSignal {
    pub fn new(samples_per_record: usize) -> Self {
        Self {
            header: SignalHeader::new_annotation(samples_per_record),
            annotations: Vec::new(),
            cursor: 0,
        }
    }

    pub(crate) fn allocate(header: SignalHeader) -> Self {
        Self {
            header,
            annotations: Vec::new(),
            cursor: 0,
        }
    }

    /// The per-record byte budget of this signal.
    pub fn byte_budget(&self) -> usize {
        self.header.byte_budget()
    }

    /// All annotations that are not timekeeping entries.
    pub fn user_annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter().filter(|a| !a.is_timekeeping)
    }

    pub(crate) fn purge_timekeeping(&mut self) {
        self.annotations.retain(|a| !a.is_timekeeping);
    }
}
