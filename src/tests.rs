#[cfg(test)]
mod file_round_trip_tests {
    use chrono::{NaiveDate, NaiveTime};
    use std::io::Cursor;

    use crate::FileType;
    use crate::annotation::Annotation;
    use crate::error::edf_error::EDFError;
    use crate::file::EDFFile;
    use crate::headers::signal_header::SignalHeader;
    use crate::signal::{AnnotationSignal, Signal, StandardSignal};

    fn ecg_header(samples_per_record: usize) -> SignalHeader {
        let mut header = SignalHeader::new();
        header
            .with_label("ECG".to_string())
            .with_transducer("AgAgCl chest electrodes".to_string())
            .with_physical_dimension("mV".to_string())
            .with_physical_range(-5.0, 5.0)
            .with_digital_range(-32768, 32767)
            .with_samples_per_record(samples_per_record);
        header
    }

    fn base_file(file_type: FileType) -> EDFFile {
        let mut edf = EDFFile::new();
        edf.header
            .with_file_type(file_type)
            .with_start_date(NaiveDate::from_ymd_opt(2026, 2, 13).unwrap())
            .with_start_time(NaiveTime::from_hms_opt(17, 30, 0).unwrap())
            .with_record_duration(1.0);
        edf
    }

    fn write_to_bytes(edf: &mut EDFFile) -> Vec<u8> {
        let mut sink = Cursor::new(Vec::new());
        edf.write(&mut sink).unwrap();
        sink.into_inner()
    }

    #[test]
    fn minimal_edf_produces_the_expected_bytes() {
        let mut edf = base_file(FileType::EDF);
        let mut ecg = StandardSignal::new(ecg_header(2));
        ecg.samples = vec![0.0, 5.0];
        edf.signals.push(Signal::Standard(ecg));

        let bytes = write_to_bytes(&mut edf);

        // one prelude, one signal header, one record of two samples
        assert_eq!(bytes.len(), 512 + 4);
        assert_eq!(&bytes[184..192], b"512     ");
        assert_eq!(&bytes[192..236], &[b' '; 44][..]);
        assert_eq!(&bytes[236..244], b"1       ");
        assert_eq!(&bytes[512..], &[0x00, 0x00, 0xFF, 0x7F]);

        let read = EDFFile::read(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(read.header.file_type, FileType::EDF);
        assert_eq!(read.header.record_count, Some(1));
        match &read.signals[0] {
            Signal::Standard(signal) => {
                assert_eq!(signal.samples.len(), 2);
                assert!((signal.samples[0]).abs() <= 5.0 / 32768.0);
                assert!((signal.samples[1] - 5.0).abs() <= 5.0 / 32768.0);
            }
            other => panic!("expected a standard signal, got {other:?}"),
        }
    }

    #[test]
    fn annotations_round_trip_exactly() {
        let mut edf = base_file(FileType::EDFPlusContinuous);
        let mut events = AnnotationSignal::new(24);
        events
            .annotations
            .push(Annotation::new(1.0, Some(0.5), "Arousal"));
        edf.signals.push(Signal::Annotation(events));

        let bytes = write_to_bytes(&mut edf);
        assert_eq!(bytes.len(), 512 + 48);

        // timekeeping TAL first, then the annotation, then zero padding
        assert_eq!(&bytes[512..519], b"+0.0\x14\x14\x00");
        assert_eq!(
            &bytes[519..537],
            b"\x2B\x31\x2E\x30\x15\x30\x2E\x35\x14\x41\x72\x6F\x75\x73\x61\x6C\x14\x00"
        );
        assert!(bytes[537..].iter().all(|b| *b == 0));

        let read = EDFFile::read(&mut Cursor::new(bytes)).unwrap();
        let signal = read.signals[0].as_annotation().unwrap();
        let user = signal.user_annotations().collect::<Vec<_>>();
        assert_eq!(user.len(), 1);
        assert_eq!(user[0].onset, 1.0);
        assert_eq!(user[0].duration, Some(0.5));
        assert_eq!(user[0].descriptions, vec!["Arousal".to_string()]);

        // the timekeeping entry is exposed but flagged
        assert_eq!(signal.annotations.len(), 2);
        assert!(signal.annotations[0].is_timekeeping);
    }

    #[test]
    fn library_files_round_trip_byte_identically() {
        let mut edf = base_file(FileType::EDFPlusContinuous);
        let mut ecg = StandardSignal::new(ecg_header(4));
        ecg.samples = (0..12).map(|i| i as f64 * 0.25 - 1.0).collect();
        edf.signals.push(Signal::Standard(ecg));
        let mut events = AnnotationSignal::new(30);
        events
            .annotations
            .push(Annotation::new(0.25, None, "Eyes closed"));
        events
            .annotations
            .push(Annotation::new(2.5, Some(0.75), "Leg movement"));
        edf.signals.push(Signal::Annotation(events));

        let first = write_to_bytes(&mut edf);
        let mut read = EDFFile::read(&mut Cursor::new(first.clone())).unwrap();
        let second = write_to_bytes(&mut read);
        assert_eq!(first, second);
    }

    #[test]
    fn timekeeping_onsets_follow_the_record_grid() {
        let mut edf = base_file(FileType::EDFPlusContinuous);
        edf.header.with_record_duration(0.5);
        let mut ecg = StandardSignal::new(ecg_header(2));
        ecg.samples = vec![0.0; 6];
        edf.signals.push(Signal::Standard(ecg));
        edf.signals
            .push(Signal::Annotation(AnnotationSignal::new(16)));

        let bytes = write_to_bytes(&mut edf);
        let record_bytes = 4 + 32;
        let starts = (0..3)
            .map(|i| 512 + 256 + i * record_bytes + 4)
            .collect::<Vec<_>>();
        assert_eq!(&bytes[starts[0]..starts[0] + 7], b"+0.0\x14\x14\x00");
        assert_eq!(&bytes[starts[1]..starts[1] + 7], b"+0.5\x14\x14\x00");
        assert_eq!(&bytes[starts[2]..starts[2] + 7], b"+1.0\x14\x14\x00");
    }

    #[test]
    fn edfplus_files_get_an_annotation_signal_synthesized() {
        let mut edf = base_file(FileType::EDFPlusContinuous);
        let mut ecg = StandardSignal::new(ecg_header(2));
        ecg.samples = vec![1.0, 2.0];
        edf.signals.push(Signal::Standard(ecg));

        let bytes = write_to_bytes(&mut edf);
        // two signal headers now: the ECG and the synthesized annotations
        assert_eq!(&bytes[184..192], b"768     ");
        assert_eq!(edf.signals.len(), 2);
        assert_eq!(edf.signals[1].header().byte_budget(), 16);

        let read = EDFFile::read(&mut Cursor::new(bytes)).unwrap();
        assert!(read.signals[1].as_annotation().is_some());
    }

    #[test]
    fn discontinuous_files_reconstruct_their_fragments() {
        let mut edf = base_file(FileType::EDFPlusDiscontinuous);
        let mut ecg = StandardSignal::new(ecg_header(2));
        ecg.samples = vec![0.0, 1.0, 2.0, 3.0];
        edf.signals.push(Signal::Standard(ecg));
        edf.signals
            .push(Signal::Annotation(AnnotationSignal::new(16)));
        edf.header.record_count = Some(2);
        edf.mark_fragment(1, 1.5);

        let bytes = write_to_bytes(&mut edf);
        let read = EDFFile::read(&mut Cursor::new(bytes)).unwrap();

        let fragments = read.fragments();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].start_record, 0);
        assert_eq!(fragments[0].end_record, 0);
        assert_eq!(fragments[0].start_time, 0.0);
        assert_eq!(fragments[1].start_record, 1);
        assert_eq!(fragments[1].end_record, 1);
        assert_eq!(fragments[1].start_time, 1.5);

        // the same structure declared continuous refuses to serialize
        let mut continuous = read.clone();
        continuous.header.with_file_type(FileType::EDFPlusContinuous);
        let err = continuous.write(&mut Cursor::new(Vec::new())).unwrap_err();
        match err {
            EDFError::ContiguityError {
                record_index,
                gap_seconds,
            } => {
                assert_eq!(record_index, 1);
                assert!((gap_seconds - 0.5).abs() < 1e-9);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn contiguity_violations_fail_on_read_too() {
        let mut edf = base_file(FileType::EDFPlusDiscontinuous);
        let mut ecg = StandardSignal::new(ecg_header(2));
        ecg.samples = vec![0.0, 1.0, 2.0, 3.0];
        edf.signals.push(Signal::Standard(ecg));
        edf.signals
            .push(Signal::Annotation(AnnotationSignal::new(16)));
        edf.header.record_count = Some(2);
        edf.mark_fragment(1, 1.5);

        let mut bytes = write_to_bytes(&mut edf);
        // flip the reserved field to EDF+C without touching the records
        bytes[192..197].copy_from_slice(b"EDF+C");
        let err = EDFFile::read(&mut Cursor::new(bytes)).unwrap_err();
        match err {
            EDFError::ContiguityError { record_index, .. } => assert_eq!(record_index, 1),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn records_going_backwards_fail_with_an_order_error() {
        let mut edf = base_file(FileType::EDFPlusDiscontinuous);
        let mut ecg = StandardSignal::new(ecg_header(2));
        ecg.samples = vec![0.0, 1.0, 2.0, 3.0];
        edf.signals.push(Signal::Standard(ecg));
        edf.signals
            .push(Signal::Annotation(AnnotationSignal::new(16)));

        let mut bytes = write_to_bytes(&mut edf);
        // rewrite the second record's timekeeping TAL to an earlier onset
        let second_timekeeping = 512 + 256 + 36 + 4;
        bytes[second_timekeeping..second_timekeeping + 7].copy_from_slice(b"-9.0\x14\x14\x00");
        let err = EDFFile::read(&mut Cursor::new(bytes)).unwrap_err();
        match err {
            EDFError::OrderError { record_index } => assert_eq!(record_index, 1),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn oversized_annotations_are_rejected_with_their_budget() {
        let mut edf = base_file(FileType::EDFPlusContinuous);
        let mut events = AnnotationSignal::new(8);
        events
            .annotations
            .push(Annotation::new(0.0, None, "x".repeat(200)));
        edf.signals.push(Signal::Annotation(events));

        let err = edf.write(&mut Cursor::new(Vec::new())).unwrap_err();
        match err {
            EDFError::CapacityError { size, budget, .. } => {
                assert_eq!(budget, 16);
                assert_eq!(size, 207);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn annotations_that_never_fit_next_to_timekeeping_are_rejected() {
        let mut edf = base_file(FileType::EDFPlusContinuous);
        let mut events = AnnotationSignal::new(8);
        // 14 bytes: within the 16 byte budget, but never fits behind the
        // 7 byte timekeeping TAL
        events
            .annotations
            .push(Annotation::new(0.0, None, "abcdefg"));
        assert_eq!(events.annotations[0].encoded_size(), 14);
        edf.signals.push(Signal::Annotation(events));

        let err = edf.write(&mut Cursor::new(Vec::new())).unwrap_err();
        assert!(matches!(err, EDFError::CapacityError { .. }));
    }

    #[test]
    fn leftover_annotations_overflow_the_record_grid() {
        let mut edf = base_file(FileType::EDFPlusContinuous);
        let mut ecg = StandardSignal::new(ecg_header(2));
        ecg.samples = vec![0.0, 1.0, 2.0, 3.0];
        edf.signals.push(Signal::Standard(ecg));
        let mut events = AnnotationSignal::new(8);
        for i in 0..3 {
            events
                .annotations
                .push(Annotation::new(i as f64, None, "a"));
        }
        edf.signals.push(Signal::Annotation(events));

        // two records drain the samples and one annotation each
        let err = edf.write(&mut Cursor::new(Vec::new())).unwrap_err();
        assert!(matches!(err, EDFError::OverflowError));
    }

    #[test]
    fn deferred_annotations_move_to_the_next_record() {
        let mut edf = base_file(FileType::EDFPlusContinuous);
        let mut ecg = StandardSignal::new(ecg_header(2));
        ecg.samples = vec![0.0, 1.0, 2.0, 3.0];
        edf.signals.push(Signal::Standard(ecg));
        let mut events = AnnotationSignal::new(8);
        events.annotations.push(Annotation::new(0.0, None, "a"));
        events.annotations.push(Annotation::new(0.1, None, "b"));
        edf.signals.push(Signal::Annotation(events));

        let bytes = write_to_bytes(&mut edf);
        let read = EDFFile::read(&mut Cursor::new(bytes)).unwrap();
        let user = read.signals[1]
            .as_annotation()
            .unwrap()
            .user_annotations()
            .cloned()
            .collect::<Vec<_>>();
        assert_eq!(user.len(), 2);
        assert_eq!(user[0].descriptions, vec!["a".to_string()]);
        assert_eq!(user[1].descriptions, vec!["b".to_string()]);
    }

    #[test]
    fn append_with_a_gap_promotes_to_discontinuous() {
        let mut first = base_file(FileType::EDFPlusContinuous);
        let mut ecg = StandardSignal::new(ecg_header(2));
        ecg.samples = (0..20).map(|i| i as f64 * 0.1).collect();
        first.signals.push(Signal::Standard(ecg));
        first
            .signals
            .push(Signal::Annotation(AnnotationSignal::new(16)));
        let first_bytes = write_to_bytes(&mut first);
        let mut first = EDFFile::read(&mut Cursor::new(first_bytes)).unwrap();
        assert_eq!(first.header.record_count, Some(10));

        let mut second = first.clone();
        second
            .header
            .with_start_time(NaiveTime::from_hms_opt(17, 30, 12).unwrap());
        if let Signal::Annotation(events) = &mut second.signals[1] {
            events.annotations.push(Annotation::new(1.0, None, "wake"));
        }

        first.append(&second).unwrap();

        assert_eq!(first.header.file_type, FileType::EDFPlusDiscontinuous);
        assert_eq!(first.header.record_count, Some(20));
        let fragments = first.fragments();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].start_time, 0.0);
        assert_eq!(fragments[0].end_record, 9);
        assert_eq!(fragments[1].start_record, 10);
        assert_eq!(fragments[1].start_time, 12.0);
        assert_eq!(fragments[1].end_record, 19);

        match &first.signals[0] {
            Signal::Standard(signal) => assert_eq!(signal.samples.len(), 40),
            other => panic!("expected a standard signal, got {other:?}"),
        }
        let merged = first.signals[1]
            .as_annotation()
            .unwrap()
            .user_annotations()
            .cloned()
            .collect::<Vec<_>>();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].onset, 13.0);

        let end = first.calculate_end_time();
        assert_eq!(
            end,
            NaiveDate::from_ymd_opt(2026, 2, 13)
                .unwrap()
                .and_hms_opt(17, 30, 22)
                .unwrap()
        );

        // appended recording survives a full write/read cycle
        let bytes = write_to_bytes(&mut first);
        let read = EDFFile::read(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(read.fragments().len(), 2);
        assert_eq!(read.fragments()[1].start_time, 12.0);
    }

    #[test]
    fn append_rejects_mismatched_layouts_and_backwards_starts() {
        let mut first = base_file(FileType::EDFPlusContinuous);
        first
            .signals
            .push(Signal::Standard(StandardSignal::new(ecg_header(2))));
        first
            .signals
            .push(Signal::Annotation(AnnotationSignal::new(16)));
        let bytes = write_to_bytes(&mut first);
        let mut first = EDFFile::read(&mut Cursor::new(bytes)).unwrap();

        let mut relabeled = first.clone();
        relabeled.signals[0].header_mut().label = "EMG".to_string();
        relabeled.header.signals[0].label = "EMG".to_string();
        assert!(matches!(
            first.append(&relabeled),
            Err(EDFError::IncompatibleHeader)
        ));

        let mut earlier = first.clone();
        earlier
            .header
            .with_start_time(NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        first.header.record_count = Some(10);
        assert!(matches!(
            first.append(&earlier),
            Err(EDFError::OrderError { .. })
        ));
    }

    #[test]
    fn signals_are_found_by_label() {
        let mut edf = base_file(FileType::EDFPlusContinuous);
        edf.signals
            .push(Signal::Standard(StandardSignal::new(ecg_header(2))));
        edf.signals
            .push(Signal::Annotation(AnnotationSignal::new(16)));

        assert!(edf.get_signal_by_name("ECG", false).is_some());
        assert!(edf.get_signal_by_name("ecg", false).is_none());
        assert!(edf.get_signal_by_name("ecg", true).is_some());
        assert!(edf.get_signal_by_name("EKG", true).is_none());

        let annotations = edf.get_signal_by_name("EDF Annotations", false).unwrap();
        assert!(annotations.as_annotation().is_some());
    }

    #[test]
    fn interleaved_declared_order_is_preserved_on_read() {
        // the library writes annotation signals last, but files from other
        // producers may interleave them
        let mut header = crate::headers::edf_header::EDFHeader::new();
        header
            .with_file_type(FileType::EDFPlusContinuous)
            .with_start_date(NaiveDate::from_ymd_opt(2026, 2, 13).unwrap())
            .with_start_time(NaiveTime::from_hms_opt(17, 30, 0).unwrap())
            .with_record_duration(1.0);

        let mut eeg = SignalHeader::new();
        eeg.with_label("EEG Fpz-Cz".to_string())
            .with_physical_range(-32768.0, 32767.0)
            .with_digital_range(-32768, 32767)
            .with_samples_per_record(2);
        let mut eeg2 = eeg.clone();
        eeg2.with_label("EEG Pz-Oz".to_string());
        header.signals = vec![eeg, SignalHeader::new_annotation(16), eeg2];
        header.record_count = Some(1);

        let mut bytes = Vec::new();
        header.serialize(&mut bytes).unwrap();
        bytes.extend_from_slice(&[0u8; 4]);
        let mut tal_block = b"+0.0\x14\x14\x00".to_vec();
        tal_block.resize(32, 0);
        bytes.extend_from_slice(&tal_block);
        bytes.extend_from_slice(&1i16.to_le_bytes());
        bytes.extend_from_slice(&2i16.to_le_bytes());

        let read = EDFFile::read(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(read.signals.len(), 3);
        assert_eq!(read.signals[0].label(), "EEG Fpz-Cz");
        assert!(read.signals[1].as_annotation().is_some());
        match &read.signals[2] {
            Signal::Standard(signal) => {
                // gain 1, offset 0: physical equals raw
                assert_eq!(signal.samples, vec![1.0, 2.0]);
            }
            other => panic!("expected a standard signal, got {other:?}"),
        }
    }

    #[test]
    fn annotations_only_time_resets_are_accepted() {
        let mut header = crate::headers::edf_header::EDFHeader::new();
        header
            .with_file_type(FileType::EDFPlusContinuous)
            .with_record_duration(1.0);
        header.signals = vec![SignalHeader::new_annotation(16)];
        header.record_count = Some(2);

        let mut bytes = Vec::new();
        header.serialize(&mut bytes).unwrap();
        for timekeeping in [&b"+0.0\x14\x14\x00"[..], &b"+10.0\x14\x14\x00"[..]] {
            let mut block = timekeeping.to_vec();
            block.resize(32, 0);
            bytes.extend_from_slice(&block);
        }

        let read = EDFFile::read(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(read.header.record_count, Some(2));
        assert!(read.fragments().is_empty());
        let timekeeping = read.signals[0].as_annotation().unwrap();
        assert_eq!(timekeeping.annotations.len(), 2);
        assert!(timekeeping.annotations.iter().all(|a| a.is_timekeeping));
        assert_eq!(timekeeping.annotations[1].onset, 10.0);
    }

    #[test]
    fn only_the_first_annotation_signal_keeps_time() {
        let mut edf = base_file(FileType::EDFPlusContinuous);
        let mut first_events = AnnotationSignal::new(24);
        first_events
            .annotations
            .push(Annotation::new(1.0, None, "a"));
        let mut second_events = AnnotationSignal::new(24);
        second_events
            .annotations
            .push(Annotation::new(2.0, None, "b"));
        edf.signals.push(Signal::Annotation(first_events));
        edf.signals.push(Signal::Annotation(second_events));

        let bytes = write_to_bytes(&mut edf);
        // first block: timekeeping, then "a"
        assert_eq!(&bytes[768..775], b"+0.0\x14\x14\x00");
        assert_eq!(&bytes[775..783], b"+1.0\x14a\x14\x00");
        // second block opens directly with "b"
        assert_eq!(&bytes[816..824], b"+2.0\x14b\x14\x00");

        let read = EDFFile::read(&mut Cursor::new(bytes)).unwrap();
        let first = read.signals[0].as_annotation().unwrap();
        let second = read.signals[1].as_annotation().unwrap();
        assert_eq!(first.user_annotations().count(), 1);
        assert_eq!(second.annotations.len(), 1);
        assert_eq!(second.annotations[0].descriptions, vec!["b".to_string()]);
    }

    #[test]
    fn multi_rate_signals_round_trip() {
        let mut edf = base_file(FileType::EDFPlusContinuous);

        let mut eeg = SignalHeader::new();
        eeg.with_label("EEG Fpz-Cz".to_string())
            .with_physical_dimension("uV".to_string())
            .with_physical_range(-2048.0, 2047.0)
            .with_digital_range(-2048, 2047)
            .with_samples_per_record(100);
        let mut eeg = StandardSignal::new(eeg);
        eeg.samples = (0..200).map(|i| (i % 100) as f64).collect();

        let mut temperature = SignalHeader::new();
        temperature
            .with_label("Temp rectal".to_string())
            .with_physical_dimension("degC".to_string())
            .with_physical_range(34.0, 42.0)
            .with_digital_range(-2048, 2047)
            .with_samples_per_record(1);
        let mut temperature = StandardSignal::new(temperature);
        temperature.samples = vec![36.6, 37.1];

        edf.signals.push(Signal::Standard(eeg));
        edf.signals.push(Signal::Standard(temperature));

        let bytes = write_to_bytes(&mut edf);
        let read = EDFFile::read(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(read.header.record_count, Some(2));

        let eeg = read.signals[0].as_standard().unwrap();
        assert_eq!(eeg.frequency, 100.0);
        assert_eq!(eeg.samples.len(), 200);
        assert_eq!(eeg.samples[7], 7.0);

        let temperature = read.signals[1].as_standard().unwrap();
        assert_eq!(temperature.frequency, 1.0);
        assert_eq!(temperature.samples.len(), 2);
        assert!((temperature.samples[0] - 36.6).abs() < 0.01);
        assert!((temperature.samples[1] - 37.1).abs() < 0.01);
    }

    #[test]
    fn structured_identification_survives_the_orchestrator() {
        use crate::headers::patient::{PatientId, Sex};
        use crate::headers::recording::RecordingId;

        let mut edf = base_file(FileType::EDFPlusContinuous);
        edf.header
            .with_patient_id(PatientId::Structured {
                code: Some("MCH-0234567".to_string()),
                sex: Some(Sex::Female),
                birthdate: Some(NaiveDate::from_ymd_opt(1951, 5, 30).unwrap()),
                name: Some("Haagse Harry".to_string()),
                additional: Vec::new(),
            })
            .with_recording_id(RecordingId::Structured {
                startdate: Some(NaiveDate::from_ymd_opt(2026, 2, 13).unwrap()),
                code: Some("PSG-1234/2026".to_string()),
                technician: Some("NN".to_string()),
                equipment: Some("Telemetry03".to_string()),
                additional: Vec::new(),
            });
        let mut ecg = StandardSignal::new(ecg_header(2));
        ecg.samples = vec![0.0, 1.0];
        edf.signals.push(Signal::Standard(ecg));

        let bytes = write_to_bytes(&mut edf);
        assert_eq!(
            &bytes[8..46],
            b"MCH-0234567 F 30-MAY-1951 Haagse_Harry"
        );

        let read = EDFFile::read(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(read.header.patient_id, edf.header.patient_id);
        assert_eq!(read.header.recording_id, edf.header.recording_id);
        // the recording subfields carry the four digit year authority
        assert_eq!(
            read.header.start_datetime().date(),
            NaiveDate::from_ymd_opt(2026, 2, 13).unwrap()
        );
    }

    #[test]
    fn month_first_dates_are_an_opt_in() {
        use crate::fields::DateMode;

        let mut header = crate::headers::edf_header::EDFHeader::new();
        header.record_count = Some(0);
        let mut bytes = Vec::new();
        header.serialize(&mut bytes).unwrap();
        bytes[168..176].copy_from_slice(b"04.03.99");

        let day_first = EDFFile::read(&mut Cursor::new(bytes.clone())).unwrap();
        assert_eq!(
            day_first.header.start_date,
            NaiveDate::from_ymd_opt(1999, 3, 4).unwrap()
        );

        let month_first =
            EDFFile::read_with(&mut Cursor::new(bytes), DateMode::MonthFirst).unwrap();
        assert_eq!(
            month_first.header.start_date,
            NaiveDate::from_ymd_opt(1999, 4, 3).unwrap()
        );
    }

    #[test]
    fn save_and_open_round_trip_on_disk() {
        let path = std::env::temp_dir().join("edfio_save_open_round_trip.edf");

        let mut edf = base_file(FileType::EDFPlusContinuous);
        let mut ecg = StandardSignal::new(ecg_header(2));
        ecg.samples = vec![0.5, -0.5, 1.5, -1.5];
        edf.signals.push(Signal::Standard(ecg));

        edf.save(&path).unwrap();
        let read = EDFFile::open(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(read.header.record_count, Some(2));
        let signal = read.signals[0].as_standard().unwrap();
        assert_eq!(signal.samples.len(), 4);
        assert!((signal.samples[2] - 1.5).abs() < 5.0 / 32768.0);
    }

    #[test]
    fn fragment_queries_cover_the_record_range() {
        let mut edf = base_file(FileType::EDFPlusDiscontinuous);
        let mut ecg = StandardSignal::new(ecg_header(2));
        ecg.samples = vec![0.0; 12];
        edf.signals.push(Signal::Standard(ecg));
        edf.header.record_count = Some(6);
        edf.mark_fragment(2, 5.0);
        edf.mark_fragment(4, 9.0);

        let fragments = edf.fragments();
        assert_eq!(fragments.len(), 3);
        assert_eq!(
            fragments.iter().map(|f| f.start_record).collect::<Vec<_>>(),
            vec![0, 2, 4]
        );
        assert_eq!(
            fragments.iter().map(|f| f.end_record).collect::<Vec<_>>(),
            vec![1, 3, 5]
        );
        assert_eq!(edf.fragment_at(3).unwrap().start_time, 5.0);
        assert_eq!(edf.fragment_at(5).unwrap().start_time, 9.0);

        let end = edf.calculate_end_time();
        // last fragment: records 4 and 5 starting at 9 s
        assert_eq!(
            end,
            NaiveDate::from_ymd_opt(2026, 2, 13)
                .unwrap()
                .and_hms_opt(17, 30, 11)
                .unwrap()
        );
    }

    #[test]
    fn live_recordings_read_until_the_stream_ends() {
        let mut edf = base_file(FileType::EDFPlusContinuous);
        let mut ecg = StandardSignal::new(ecg_header(2));
        ecg.samples = vec![0.0; 8];
        edf.signals.push(Signal::Standard(ecg));
        edf.signals
            .push(Signal::Annotation(AnnotationSignal::new(16)));

        let mut bytes = write_to_bytes(&mut edf);
        // pretend the recorder never patched the record count
        bytes[236..244].copy_from_slice(b"-1      ");

        let read = EDFFile::read(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(read.header.record_count, Some(4));
        match &read.signals[0] {
            Signal::Standard(signal) => assert_eq!(signal.samples.len(), 8),
            other => panic!("expected a standard signal, got {other:?}"),
        }
    }
}
