use crate::spreadsheet::reference::index_to_reference;
use chrono::NaiveDate;
use chrono::TimeDelta;
use iso8601_duration::Duration as IsoDuration;
use std::borrow::Cow;
use std::fmt::Display;

/// Serial date system of a workbook.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Epoch {
    /// Serial 1 is 1900-01-01, including the Lotus 1-2-3 leap year bug
    Excel1900,
    /// Serial 0 is 1904-01-01
    Excel1904,
}

impl Epoch {
    pub(crate) fn from_1904_flag(is_1904: bool) -> Self {
        if is_1904 { Self::Excel1904 } else { Self::Excel1900 }
    }
}

/// How a cell's stored value must be rendered to text.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// Stored as 1/0
    Boolean,
    Number,
    /// Serial number with a date and time format
    NumberDateTime(Epoch),
    /// Serial number with a date-only format
    NumberDate(Epoch),
    /// Serial fraction of a day with a time-only format
    NumberTime,
    /// ISO 8601 date or date-time string
    IsoDateTime,
    /// ISO 8601 duration string
    IsoDuration,
    /// Literal text, including resolved shared strings
    Text,
    /// Index into the shared string table, resolved before the cell reaches a `Sheet`
    SharedString,
    /// Error literal such as `#DIV/0!`
    Error,
}

impl CellType {
    /// Maps built-in number format ids to the date/time kinds they imply.
    pub(crate) fn parse_builtin_number_format_id(id: &str, epoch: Epoch) -> Option<Self> {
        match id {
            "22" => Some(Self::NumberDateTime(epoch)),
            "14" | "15" | "16" | "17" => Some(Self::NumberDate(epoch)),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(Self::NumberTime),
            _ => None,
        }
    }

    /// Classifies a custom number format code by the date and time tokens outside
    /// of literals, escapes and bracketed sections.
    pub(crate) fn parse_custom_number_format(format: &str, epoch: Epoch) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_bracket = false;
        let mut is_date = false;
        let mut is_time = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' if !is_literal => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_bracket => is_literal = true,

                ']' if is_bracket => is_bracket = false,
                '[' if !is_literal => is_bracket = true,
                _ if is_literal || is_bracket => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time) {
            (true, true) => Self::NumberDateTime(epoch),
            (true, false) => Self::NumberDate(epoch),
            (false, true) => Self::NumberTime,
            (false, false) => Self::Number,
        }
    }
}

/// A single non-empty cell of a sheet.
#[derive(Clone, Debug)]
pub struct Cell {
    /// Row index (0-based)
    pub(crate) row: usize,
    /// Column index (0-based)
    pub(crate) col: usize,
    pub(crate) kind: CellType,
    /// Raw stored value
    pub(crate) value: String,
}

impl Cell {
    /// Creates a plain text cell.
    pub fn text_cell(row: usize, col: usize, text: impl Into<String>) -> Self {
        Self {
            row,
            col,
            kind: CellType::Text,
            value: text.into(),
        }
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn col(&self) -> usize {
        self.col
    }

    /// Returns the Excel-style cell reference (e.g., "A1", "B2").
    pub fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// The rendered text of the cell, as a user would read it in the sheet.
    ///
    /// Values that do not parse under their declared format fall back to the raw
    /// stored value.
    pub fn text(&self) -> Cow<'_, str> {
        let rendered = match self.kind {
            CellType::Boolean => Some(if self.value == "1" { "true" } else { "false" }.to_owned()),
            CellType::NumberDateTime(epoch) => to_datetime_string(&self.value, epoch),
            CellType::NumberDate(epoch) => to_date_string(&self.value, epoch),
            CellType::NumberTime => to_time_string(&self.value),
            CellType::IsoDateTime => Some(self.value.replace('T', " ")),
            CellType::IsoDuration => to_duration_string(&self.value),
            _ => None,
        };
        match rendered {
            Some(text) => Cow::Owned(text),
            None => Cow::Borrowed(&self.value),
        }
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text())
    }
}

const MILLISECONDS_PER_DAY: i64 = 86_400_000;

/// Splits a serial value into whole days and milliseconds into the day.
fn split_serial(value: &str) -> Option<(i64, i64)> {
    let serial = value.trim().parse::<f64>().ok()?;
    if !serial.is_finite() {
        return None;
    }
    let days = serial.trunc() as i64;
    let milliseconds = (serial.fract().abs() * MILLISECONDS_PER_DAY as f64).round() as i64;
    Some((days.checked_add(milliseconds / MILLISECONDS_PER_DAY)?, milliseconds % MILLISECONDS_PER_DAY))
}

fn serial_to_date(days: i64, epoch: Epoch) -> Option<NaiveDate> {
    let offset = match epoch {
        Epoch::Excel1904 => 1462,
        Epoch::Excel1900 if days < 60 => 1,
        Epoch::Excel1900 => 0,
    };
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(TimeDelta::try_days(days.checked_add(offset)?)?)
}

fn format_milliseconds(milliseconds: i64) -> String {
    let (seconds, millis) = (milliseconds / 1_000, milliseconds % 1_000);
    let (hours, minutes, seconds) = (seconds / 3_600, seconds / 60 % 60, seconds % 60);
    if millis > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}

fn to_date_string(value: &str, epoch: Epoch) -> Option<String> {
    let (days, _) = split_serial(value)?;
    Some(serial_to_date(days, epoch)?.format("%Y-%m-%d").to_string())
}

fn to_time_string(value: &str) -> Option<String> {
    let (_, milliseconds) = split_serial(value)?;
    Some(format_milliseconds(milliseconds))
}

fn to_datetime_string(value: &str, epoch: Epoch) -> Option<String> {
    let (days, milliseconds) = split_serial(value)?;
    let date = serial_to_date(days, epoch)?;
    Some(format!("{} {}", date.format("%Y-%m-%d"), format_milliseconds(milliseconds)))
}

fn to_duration_string(value: &str) -> Option<String> {
    let duration = value.parse::<IsoDuration>().ok()?;
    let seconds = (duration.day as f64 * 86_400.0
        + duration.hour as f64 * 3_600.0
        + duration.minute as f64 * 60.0
        + duration.second as f64) as i64;
    Some(format_milliseconds(seconds.checked_mul(1_000)?))
}
