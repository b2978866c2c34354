//! The fragment engine that ties data-record indices to recording time.
//!
//! A fragment is a maximal run of contiguous data-records sharing a linear
//! time base. Continuous files consist of one implicit fragment starting at
//! zero; discontinuous (EDF+D) files carry one fragment per run between
//! gaps. Fragments are kept sorted by their starting record index, never
//! overlap, and together cover every data-record of the file.

use crate::error::edf_error::{EDFError, Result};

/// Tolerance in seconds below which two record times are the same instant.
pub(crate) const TIME_TOLERANCE: f64 = 1e-3;

/// A contiguous run of data-records.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFragment {
    /// First data-record of the run, inclusive.
    pub start_record: usize,
    /// Last data-record of the run, inclusive.
    pub end_record: usize,
    /// Start of the run in seconds relative to the start of the file.
    pub start_time: f64,
    /// Duration of one data-record in seconds.
    pub record_duration: f64,
}

impl DataFragment {
    pub fn duration(&self) -> f64 {
        (self.end_record - self.start_record + 1) as f64 * self.record_duration
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration()
    }

    pub fn contains(&self, record_index: usize) -> bool {
        self.start_record <= record_index && record_index <= self.end_record
    }
}

/// The sorted, non-overlapping fragment list of a file. An empty list is
/// one implicit fragment starting at record 0 and time 0.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FragmentList {
    fragments: Vec<DataFragment>,
    record_duration: f64,
}

impl FragmentList {
    pub fn new(record_duration: f64) -> Self {
        Self {
            fragments: Vec::new(),
            record_duration,
        }
    }

    pub fn as_slice(&self) -> &[DataFragment] {
        &self.fragments
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Keeps the record duration of the list and of every fragment in step
    /// with the header.
    pub(crate) fn set_record_duration(&mut self, record_duration: f64) {
        self.record_duration = record_duration;
        for fragment in &mut self.fragments {
            fragment.record_duration = record_duration;
        }
    }

    /// The start time of a data-record in seconds relative to the start of
    /// the file, following the fragment the record falls into.
    pub fn record_start_time(&self, record_index: usize) -> f64 {
        self.fragments
            .iter()
            .rev()
            .find(|f| f.start_record <= record_index)
            .map(|f| f.start_time + (record_index - f.start_record) as f64 * self.record_duration)
            .unwrap_or(record_index as f64 * self.record_duration)
    }

    /// The fragment covering a data-record, when an explicit one exists.
    pub fn fragment_at(&self, record_index: usize) -> Option<&DataFragment> {
        self.fragments.iter().find(|f| f.contains(record_index))
    }

    /// Creates or updates a fragment so that the record at `record_index`
    /// begins at `start_time`. A first mark away from time zero implies an
    /// initial fragment covering the records before it.
    pub fn mark(&mut self, record_index: usize, start_time: f64) {
        if record_index > 0
            && start_time > 0.0
            && !self.fragments.iter().any(|f| f.start_record == 0)
        {
            self.fragments.push(DataFragment {
                start_record: 0,
                end_record: record_index - 1,
                start_time: 0.0,
                record_duration: self.record_duration,
            });
        }

        match self
            .fragments
            .iter_mut()
            .find(|f| f.start_record == record_index)
        {
            Some(fragment) => fragment.start_time = start_time,
            None => self.fragments.push(DataFragment {
                start_record: record_index,
                end_record: record_index,
                start_time,
                record_duration: self.record_duration,
            }),
        }

        self.fragments.sort_by_key(|f| f.start_record);
    }

    /// Recomputes every fragment's inclusive end index: up to its
    /// successor's first record, the last one up to the last record of the
    /// file.
    pub(crate) fn recompute_end_indices(&mut self, record_count: usize) {
        let successors = self
            .fragments
            .iter()
            .skip(1)
            .map(|f| f.start_record)
            .collect::<Vec<_>>();
        for (index, fragment) in self.fragments.iter_mut().enumerate() {
            let end = match successors.get(index) {
                Some(next_start) => next_start.saturating_sub(1),
                None => record_count.saturating_sub(1),
            };
            fragment.end_record = end.max(fragment.start_record);
        }
    }

    /// Verifies that consecutive fragments leave no gap, as EDF and EDF+C
    /// files require. End indices must be current.
    pub(crate) fn ensure_contiguous(&self) -> Result<()> {
        if let Some(first) = self.fragments.first() {
            if first.start_time.abs() > TIME_TOLERANCE {
                return Err(EDFError::ContiguityError {
                    record_index: first.start_record,
                    gap_seconds: first.start_time,
                });
            }
        }
        for pair in self.fragments.windows(2) {
            let expected = pair[0].start_time
                + (pair[1].start_record - pair[0].start_record) as f64 * self.record_duration;
            let gap = pair[1].start_time - expected;
            if gap.abs() > TIME_TOLERANCE {
                return Err(EDFError::ContiguityError {
                    record_index: pair[1].start_record,
                    gap_seconds: gap,
                });
            }
        }
        Ok(())
    }
}
