/*!
`edfio` is a pure Rust library for reading, writing and editing files in the
European Data Format (EDF) and its extensions EDF+C (continuous) and EDF+D
(discontinuous). It is based on the official specifications published at
[edfplus.info](https://www.edfplus.info/) and works on plain byte streams,
decoding one data-record at a time so that very large recordings can be
processed without excessive memory pressure.

An EDF file consists of a fixed-width ASCII header describing N signals and
their calibration, followed by a sequence of fixed-duration data-records.
Each data-record stores one block of 16 bit little-endian samples per
ordinary signal and one block of timestamped annotation lists (TALs) per
annotation signal.

# Examples

## Create an EDF+ file

The following example creates a continuous EDF+ file with one ECG signal
sampled at 2 Hz and a single annotation, then saves it to `recording.edf`.

```no_run
use chrono::{NaiveDate, NaiveTime};

use edfio::FileType;
use edfio::annotation::Annotation;
use edfio::file::EDFFile;
use edfio::headers::signal_header::SignalHeader;
use edfio::signal::{AnnotationSignal, Signal, StandardSignal};

pub fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut edf = EDFFile::new();

    edf.header
        .with_file_type(FileType::EDFPlusContinuous)
        .with_start_date(NaiveDate::from_ymd_opt(2026, 2, 13).unwrap())
        .with_start_time(NaiveTime::from_hms_opt(17, 30, 0).unwrap())
        .with_record_duration(1.0);

    let mut header = SignalHeader::new();
    header
        .with_label("ECG".to_string())
        .with_transducer("AgAgCl chest electrodes".to_string())
        .with_physical_dimension("mV".to_string())
        .with_physical_range(-5.0, 5.0)
        .with_digital_range(-32768, 32767)
        .with_samples_per_record(2);

    let mut ecg = StandardSignal::new(header);
    ecg.samples = vec![0.0, 1.25, 2.5, 5.0];

    let mut events = AnnotationSignal::new(60);
    events
        .annotations
        .push(Annotation::new(1.0, Some(0.5), "Arousal"));

    edf.signals.push(Signal::Standard(ecg));
    edf.signals.push(Signal::Annotation(events));

    edf.save("recording.edf")?;

    Ok(())
}
```

## Read an EDF+ file

Reading parses the header, decodes every data-record and reconstructs the
fragment list of discontinuous files. Physical samples and annotations are
available on the signals afterwards.

```no_run
use edfio::file::EDFFile;
use edfio::signal::Signal;

pub fn main() -> Result<(), Box<dyn std::error::Error>> {
    let edf = EDFFile::open("recording.edf")?;

    println!("{:#?}", edf.header);
    println!("recording ends at {}", edf.calculate_end_time());

    for signal in &edf.signals {
        match signal {
            Signal::Standard(signal) => {
                println!("{}: {} samples", signal.header.label, signal.samples.len());
            }
            Signal::Annotation(signal) => {
                for annotation in signal.user_annotations() {
                    println!("{:?}", annotation);
                }
            }
        }
    }

    Ok(())
}
```
*/

pub mod annotation;
pub mod error;
pub mod fields;
pub mod file;
pub mod fragment;
pub mod headers;
mod record;
pub mod signal;
mod tests;
mod utils;

pub use annotation::Annotation;
pub use error::edf_error::{EDFError, Result};
pub use fields::DateMode;
pub use file::EDFFile;
pub use fragment::DataFragment;
pub use headers::edf_header::EDFHeader;
pub use headers::patient::{PatientId, Sex};
pub use headers::recording::RecordingId;
pub use headers::signal_header::{ANNOTATION_LABEL, SignalHeader};
pub use signal::{AnnotationSignal, Signal, StandardSignal};

/// The declared variant of an EDF file, carried by the 44 byte reserved
/// field of the header prelude.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// The original EDF specification from 1992. See the official specifications [here](https://www.edfplus.info/specs/edf.html).
    EDF,

    #[default]
    /// A continuous recording following the EDF+ specification from 2003. See the official specifications [here](https://www.edfplus.info/specs/edfplus.html).
    EDFPlusContinuous,

    /// A discontinuous EDF+ recording whose data-records may leave gaps in time.
    EDFPlusDiscontinuous,
}

impl FileType {
    /// The magic string stored in the reserved header field.
    pub fn magic(&self) -> &'static str {
        match self {
            FileType::EDF => "",
            FileType::EDFPlusContinuous => "EDF+C",
            FileType::EDFPlusDiscontinuous => "EDF+D",
        }
    }

    /// Maps the reserved header field back to the declared file type. Unknown
    /// values are treated as plain EDF.
    pub(crate) fn from_magic(reserved: &str) -> Self {
        if reserved.starts_with("EDF+C") {
            FileType::EDFPlusContinuous
        } else if reserved.starts_with("EDF+D") {
            FileType::EDFPlusDiscontinuous
        } else {
            FileType::EDF
        }
    }

    pub fn is_edf_plus(&self) -> bool {
        *self != FileType::EDF
    }

    pub fn is_discontinuous(&self) -> bool {
        *self == FileType::EDFPlusDiscontinuous
    }
}
