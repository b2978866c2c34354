//! Fixed-width ASCII field primitives shared by the header codec.
//!
//! Every header value occupies a fixed number of bytes of printable ASCII,
//! left-justified and padded with spaces. Each primitive knows its byte
//! width, how to render itself into exactly that many bytes and how to
//! parse itself after consuming exactly that many bytes. All numeric
//! parsing and formatting is locale independent: `.` is the only decimal
//! separator and digits are never grouped.

use std::io::{Read, Write};

use chrono::{Datelike, NaiveDate, NaiveTime};

use crate::error::edf_error::{EDFError, Result};

/// Parse mode for the 16 byte start date+time field. Some legacy corpora
/// store the start date as `MM.dd.yy` instead of `dd.MM.yy`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DateMode {
    #[default]
    DayFirst,
    MonthFirst,
}

/// Reads exactly `width` bytes and returns them as a string, mapping each
/// byte to the char with the same code point.
pub(crate) fn read_raw<R: Read>(reader: &mut R, width: usize, offset: &mut u64) -> Result<String> {
    let mut buf = vec![0u8; width];
    reader.read_exact(&mut buf)?;
    *offset += width as u64;
    Ok(buf.iter().map(|c| *c as char).collect())
}

/// Renders a value into exactly `width` bytes: oversized representations
/// are truncated, shorter ones padded with trailing spaces.
pub(crate) fn pad(value: &str, width: usize) -> String {
    let mut out: String = value.chars().take(width).collect();
    while out.len() < width {
        out.push(' ');
    }
    out
}

fn format_error(field: &'static str, offset: u64, reason: impl Into<String>) -> EDFError {
    EDFError::FormatError {
        field,
        offset,
        reason: reason.into(),
    }
}

/// A free ASCII string field. Assignment silently truncates overlong values
/// and drops bytes outside the printable range 32..=126.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FixedString {
    value: String,
    width: usize,
}

impl FixedString {
    pub fn new(width: usize) -> Self {
        Self {
            value: String::new(),
            width,
        }
    }

    pub fn with_value(width: usize, value: &str) -> Self {
        let mut field = Self::new(width);
        field.set(value);
        field
    }

    pub fn set(&mut self, value: &str) {
        self.value = value
            .chars()
            .filter(|c| matches!(*c as u32, 0x20..=0x7E))
            .take(self.width)
            .collect();
    }

    pub fn get(&self) -> &str {
        &self.value
    }

    pub fn byte_width(&self) -> usize {
        self.width
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(pad(&self.value, self.width).as_bytes())?;
        Ok(())
    }

    pub fn read<R: Read>(reader: &mut R, width: usize, offset: &mut u64) -> Result<Self> {
        let raw = read_raw(reader, width, offset)?;
        let mut field = Self::new(width);
        field.set(raw.trim());
        Ok(field)
    }
}

/// A signed decimal integer field without digit grouping.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FixedInt {
    value: i64,
    width: usize,
}

impl FixedInt {
    pub fn new(width: usize, value: i64) -> Self {
        Self { value, width }
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn byte_width(&self) -> usize {
        self.width
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(pad(&self.value.to_string(), self.width).as_bytes())?;
        Ok(())
    }

    pub fn read<R: Read>(
        reader: &mut R,
        width: usize,
        field: &'static str,
        offset: &mut u64,
    ) -> Result<Self> {
        let start = *offset;
        let raw = read_raw(reader, width, offset)?;
        let value = raw
            .trim()
            .parse::<i64>()
            .map_err(|e| format_error(field, start, e.to_string()))?;
        Ok(Self { value, width })
    }
}

/// A decimal floating point field of 8 bytes with `.` as the separator.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct FixedFloat {
    value: f64,
}

impl FixedFloat {
    pub const WIDTH: usize = 8;

    pub fn new(value: f64) -> Self {
        Self { value }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn byte_width(&self) -> usize {
        Self::WIDTH
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let rendered = format_float(self.value, Self::WIDTH);
        writer.write_all(pad(&rendered, Self::WIDTH).as_bytes())?;
        Ok(())
    }

    pub fn read<R: Read>(reader: &mut R, field: &'static str, offset: &mut u64) -> Result<Self> {
        let start = *offset;
        let raw = read_raw(reader, Self::WIDTH, offset)?;
        let value = raw
            .trim()
            .parse::<f64>()
            .map_err(|e| format_error(field, start, e.to_string()))?;
        Ok(Self { value })
    }
}

/// Renders a float into at most `width` characters. Integral values print
/// without a fraction, everything else starts at 8 fractional digits and
/// reduces precision until the representation fits.
pub(crate) fn format_float(value: f64, width: usize) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        let rendered = format!("{}", value as i64);
        if rendered.len() <= width {
            return rendered;
        }
    }
    let mut precision = 8usize;
    loop {
        let mut rendered = format!("{:.*}", precision, value);
        if rendered.contains('.') {
            while rendered.ends_with('0') {
                rendered.pop();
            }
            if rendered.ends_with('.') {
                rendered.pop();
            }
        }
        if rendered.len() <= width || precision == 0 {
            return rendered;
        }
        precision -= 1;
    }
}

/// Renders a TAL onset or duration in seconds: always carries a decimal
/// point, at most 7 fractional digits, trailing zeros trimmed but never
/// past the first fractional digit.
pub(crate) fn format_seconds(value: f64) -> String {
    let mut rendered = format!("{:.7}", value);
    while rendered.ends_with('0') && !rendered.ends_with(".0") {
        rendered.pop();
    }
    rendered
}

/// The 16 byte start date+time field of the header prelude, stored as
/// `dd.MM.yy` followed by `HH.mm.ss`. Years are clipped to the window
/// 1985..=2084; dates outside it are stored as the literal year `yy` and
/// read back as the year 2100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartDateTime {
    pub date: NaiveDate,
    pub time: NaiveTime,
    mode: DateMode,
}

impl StartDateTime {
    pub fn new(date: NaiveDate, time: NaiveTime) -> Self {
        Self {
            date,
            time,
            mode: DateMode::DayFirst,
        }
    }

    pub fn with_mode(mut self, mode: DateMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn byte_width(&self) -> usize {
        16
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(self.format_date().as_bytes())?;
        writer.write_all(self.time.format("%H.%M.%S").to_string().as_bytes())?;
        Ok(())
    }

    fn format_date(&self) -> String {
        let year = if self.date.year() < 1985 || self.date.year() > 2084 {
            "yy".to_string()
        } else {
            format!("{:02}", self.date.year() % 100)
        };
        match self.mode {
            DateMode::DayFirst => {
                format!("{:02}.{:02}.{}", self.date.day(), self.date.month(), year)
            }
            DateMode::MonthFirst => {
                format!("{:02}.{:02}.{}", self.date.month(), self.date.day(), year)
            }
        }
    }

    pub fn read<R: Read>(reader: &mut R, mode: DateMode, offset: &mut u64) -> Result<Self> {
        let date_start = *offset;
        let raw_date = read_raw(reader, 8, offset)?;
        let time_start = *offset;
        let raw_time = read_raw(reader, 8, offset)?;

        let date = Self::parse_date(raw_date.trim(), mode, date_start)?;
        let time = NaiveTime::parse_from_str(raw_time.trim(), "%H.%M.%S")
            .map_err(|e| format_error("start time", time_start, e.to_string()))?;

        Ok(Self { date, time, mode })
    }

    fn parse_date(raw: &str, mode: DateMode, offset: u64) -> Result<NaiveDate> {
        let parts = raw.split('.').collect::<Vec<_>>();
        if parts.len() != 3 {
            return Err(format_error(
                "start date",
                offset,
                "expected three dot separated numbers",
            ));
        }

        let (day_part, month_part) = match mode {
            DateMode::DayFirst => (parts[0], parts[1]),
            DateMode::MonthFirst => (parts[1], parts[0]),
        };

        let year = if parts[2] == "yy" {
            2100
        } else {
            let yy = parts[2]
                .parse::<u8>()
                .map_err(|e| format_error("start date", offset, e.to_string()))?;
            if yy < 85 {
                2000 + yy as i32
            } else if yy < 100 {
                1900 + yy as i32
            } else {
                return Err(format_error("start date", offset, "year out of range"));
            }
        };

        let day = day_part
            .parse::<u32>()
            .map_err(|e| format_error("start date", offset, e.to_string()))?;
        let month = month_part
            .parse::<u32>()
            .map_err(|e| format_error("start date", offset, e.to_string()))?;

        NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| format_error("start date", offset, "no such calendar date"))
    }
}
