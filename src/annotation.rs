//! Annotations and the byte-level TAL grammar.
//!
//! Annotation signals store their per-record block as a sequence of
//! timestamped annotation lists (TALs). One TAL carries a signed onset in
//! seconds relative to the start of the file, an optional duration, and a
//! list of UTF-8 descriptions:
//!
//! ```text
//! TAL      := onset [ 0x15 duration ] 0x14 description* 0x14 0x00
//! onset    := ('+' | '-') digits [ '.' digits ]
//! duration := digits [ '.' digits ]
//! ```
//!
//! Descriptions are separated by `0x14`. A TAL without any description is a
//! timekeeping TAL; the first TAL of a record's first annotation signal
//! always carries the record's start time. Zero bytes pad the block up to
//! its fixed byte budget.

use std::borrow::Cow;

use crate::error::edf_error::{EDFError, Result};
use crate::fields::format_seconds;

/// Separates descriptions and closes the onset/duration header.
pub(crate) const ANNOTATION_SEPARATOR: u8 = 0x14;
/// Separates the duration from the onset.
pub(crate) const DURATION_SEPARATOR: u8 = 0x15;
/// Terminates a TAL and pads the rest of a block.
pub(crate) const TAL_TERMINATOR: u8 = 0x00;

/// Marks a linked channel label inside a description.
const CHANNEL_MARKER: &str = "@@";

/// One annotation: an event at `onset` seconds relative to the start of
/// the file, with an optional duration, one or more descriptions and an
/// optional linked channel label.
///
/// Timekeeping annotations are synthesized while writing and exposed with
/// `is_timekeeping` set while reading; they are never written back from
/// user input.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Annotation {
    pub onset: f64,
    pub duration: Option<f64>,
    pub descriptions: Vec<String>,
    pub linked_channel: Option<String>,
    pub is_timekeeping: bool,
}

impl Annotation {
    pub fn new(onset: f64, duration: Option<f64>, description: impl Into<String>) -> Self {
        Self {
            onset,
            duration,
            descriptions: vec![description.into()],
            linked_channel: None,
            is_timekeeping: false,
        }
    }

    pub fn with_descriptions(onset: f64, duration: Option<f64>, descriptions: Vec<String>) -> Self {
        Self {
            onset,
            duration,
            descriptions,
            linked_channel: None,
            is_timekeeping: false,
        }
    }

    pub(crate) fn timekeeping(onset: f64) -> Self {
        Self {
            onset,
            duration: None,
            descriptions: Vec::new(),
            linked_channel: None,
            is_timekeeping: true,
        }
    }

    fn onset_text(&self) -> String {
        let sign = if self.onset >= 0.0 { '+' } else { '-' };
        format!("{}{}", sign, format_seconds(self.onset.abs()))
    }

    /// The exact number of bytes [`Annotation::serialize`] will emit,
    /// including the trailing terminator. Used to decide whether an
    /// annotation fits the remaining space of a record before any byte is
    /// written.
    pub fn encoded_size(&self) -> usize {
        let mut size = self.onset_text().len();
        if let Some(duration) = self.duration {
            size += 1 + format_seconds(duration).len();
        }
        size += 1;
        if self.descriptions.is_empty() {
            // the empty description of a timekeeping TAL
            size += 2;
        } else {
            for description in &self.descriptions {
                size += strip_framing_bytes(description).len() + 1;
                if let Some(channel) = &self.linked_channel {
                    size += CHANNEL_MARKER.len() + strip_framing_bytes(channel).len();
                }
            }
            size += 1;
        }
        size
    }

    pub(crate) fn serialize(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.onset_text().as_bytes());
        if let Some(duration) = self.duration {
            out.push(DURATION_SEPARATOR);
            out.extend_from_slice(format_seconds(duration).as_bytes());
        }
        out.push(ANNOTATION_SEPARATOR);
        for (i, description) in self.descriptions.iter().enumerate() {
            if i > 0 {
                out.push(ANNOTATION_SEPARATOR);
            }
            out.extend_from_slice(strip_framing_bytes(description).as_bytes());
            if let Some(channel) = &self.linked_channel {
                out.extend_from_slice(CHANNEL_MARKER.as_bytes());
                out.extend_from_slice(strip_framing_bytes(channel).as_bytes());
            }
        }
        out.push(ANNOTATION_SEPARATOR);
        out.push(TAL_TERMINATOR);
    }

    /// Parses one TAL from `data`, which holds the bytes up to but not
    /// including the terminating zero byte. `offset` is the position of the
    /// first byte in the stream and is carried into format errors.
    pub(crate) fn parse(data: &[u8], offset: u64) -> Result<Self> {
        if !data.ends_with(&[ANNOTATION_SEPARATOR]) {
            return Err(tal_error(offset, "missing closing delimiter"));
        }
        let body = &data[..data.len() - 1];

        let header_end = body
            .iter()
            .position(|b| *b == ANNOTATION_SEPARATOR)
            .ok_or_else(|| tal_error(offset, "missing onset delimiter"))?;
        let header = std::str::from_utf8(&body[..header_end])
            .map_err(|_| tal_error(offset, "onset and duration are not ASCII"))?;

        let mut header_parts = header.split('\u{15}');
        let onset_text = header_parts.next().unwrap_or_default();
        if !onset_text.starts_with('+') && !onset_text.starts_with('-') {
            return Err(tal_error(offset, "onset carries no sign"));
        }
        let onset = onset_text
            .parse::<f64>()
            .map_err(|e| tal_error(offset, e.to_string()))?;

        let duration = match header_parts.next() {
            Some(text) => {
                let duration = text
                    .parse::<f64>()
                    .map_err(|e| tal_error(offset, e.to_string()))?;
                if duration < 0.0 {
                    return Err(tal_error(offset, "negative duration"));
                }
                Some(duration)
            }
            None => None,
        };
        if header_parts.next().is_some() {
            return Err(tal_error(offset, "more than one duration"));
        }

        let rest = &body[header_end + 1..];
        let mut descriptions = Vec::new();
        let mut linked_channel = None;
        if !rest.is_empty() {
            for chunk in rest.split(|b| *b == ANNOTATION_SEPARATOR) {
                let mut description = String::from_utf8_lossy(chunk).into_owned();
                if let Some(position) = description.find(CHANNEL_MARKER) {
                    let channel = description[position + CHANNEL_MARKER.len()..].to_string();
                    if !channel.is_empty() && channel.is_ascii() {
                        if linked_channel.is_none() {
                            linked_channel = Some(channel);
                        }
                        description.truncate(position);
                    }
                }
                descriptions.push(description);
            }
        }

        let is_timekeeping = descriptions.is_empty();
        Ok(Self {
            onset,
            duration,
            descriptions,
            linked_channel,
            is_timekeeping,
        })
    }
}

/// The delimiter and terminator bytes may not occur inside a description;
/// they would tear the TAL framing apart.
fn strip_framing_bytes(text: &str) -> Cow<'_, str> {
    if text.contains(['\u{14}', '\0']) {
        Cow::Owned(text.replace(['\u{14}', '\0'], ""))
    } else {
        Cow::Borrowed(text)
    }
}

fn tal_error(offset: u64, reason: impl Into<String>) -> EDFError {
    EDFError::FormatError {
        field: "timestamped annotation list",
        offset,
        reason: reason.into(),
    }
}
