use crate::fields::{FixedFloat, format_float, pad};

/// The label that marks a signal as an annotation signal.
pub const ANNOTATION_LABEL: &str = "EDF Annotations";

/// The ten per-signal attributes of the EDF header. For ordinary signals
/// `samples_per_record` counts 16 bit samples per data-record; for
/// annotation signals it declares half the per-record byte budget.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SignalHeader {
    pub label: String,
    pub transducer: String,
    pub physical_dimension: String,
    pub physical_minimum: f64,
    pub physical_maximum: f64,
    pub digital_minimum: i32,
    pub digital_maximum: i32,
    pub prefilter: String,
    pub samples_per_record: usize,
    pub reserved: String,
}

impl SignalHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// An annotation signal with the digital extremes the EDF+ specification
    /// prescribes and a byte budget of `2 * samples_per_record` per record.
    pub fn new_annotation(samples_per_record: usize) -> Self {
        Self {
            label: ANNOTATION_LABEL.to_string(),
            transducer: String::new(),
            physical_dimension: String::new(),
            physical_minimum: -1.0,
            physical_maximum: 1.0,
            digital_minimum: -32768,
            digital_maximum: 32767,
            prefilter: String::new(),
            samples_per_record,
            reserved: String::new(),
        }
    }

    pub fn with_label(&mut self, label: String) -> &mut Self {
        self.label = label;
        self
    }

    pub fn with_transducer(&mut self, transducer: String) -> &mut Self {
        self.transducer = transducer;
        self
    }

    pub fn with_physical_dimension(&mut self, physical_dimension: String) -> &mut Self {
        self.physical_dimension = physical_dimension;
        self
    }

    pub fn with_physical_range(&mut self, min: f64, max: f64) -> &mut Self {
        self.physical_minimum = min;
        self.physical_maximum = max;
        self
    }

    pub fn with_digital_range(&mut self, min: i32, max: i32) -> &mut Self {
        self.digital_minimum = min;
        self.digital_maximum = max;
        self
    }

    pub fn with_prefilter(&mut self, prefilter: String) -> &mut Self {
        self.prefilter = prefilter;
        self
    }

    pub fn with_samples_per_record(&mut self, samples_per_record: usize) -> &mut Self {
        self.samples_per_record = samples_per_record;
        self
    }

    pub fn is_annotation(&self) -> bool {
        self.label == ANNOTATION_LABEL
    }

    /// The byte size of this signal's block in one data-record.
    pub fn byte_budget(&self) -> usize {
        2 * self.samples_per_record
    }

    /// The ten attributes rendered exactly as they appear in the serialized
    /// header, in array order. Used for writing and for the layout digest
    /// backing header compatibility checks.
    pub(crate) fn serialized_fields(&self) -> [String; 10] {
        [
            pad(&self.label, 16),
            pad(&self.transducer, 80),
            pad(&self.physical_dimension, 8),
            pad(&format_float(self.physical_minimum, FixedFloat::WIDTH), 8),
            pad(&format_float(self.physical_maximum, FixedFloat::WIDTH), 8),
            pad(&self.digital_minimum.to_string(), 8),
            pad(&self.digital_maximum.to_string(), 8),
            pad(&self.prefilter, 80),
            pad(&self.samples_per_record.to_string(), 8),
            pad(&self.reserved, 32),
        ]
    }
}
