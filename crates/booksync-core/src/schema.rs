//! Column contract between the `bookings` table and the spreadsheet range.
//!
//! Row 1 of the range is always the header produced by [`header_row`]; every
//! data row below it carries the same eleven columns in the same order. Export
//! renders rows with [`render_row`], import reads them back with
//! [`normalize_row`].

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Number, Value};

use crate::error::SyncError;
use crate::models::{Booking, StoredBooking};

/// Column names, in wire order.
pub const BOOKING_COLUMNS: [&str; 11] = [
    "id",
    "guest_name",
    "phone_number",
    "check_in_date",
    "check_out_date",
    "property_id",
    "property_name",
    "source",
    "amount_paid",
    "sync_status",
    "booked_at",
];

pub const COLUMN_COUNT: usize = BOOKING_COLUMNS.len();

pub const DEFAULT_SOURCE: &str = "Direct";
/// `sync_status` written to the database for rows that left it blank.
pub const IMPORT_SYNC_STATUS: &str = "Synced";
/// `sync_status` written to the sheet for records that have none.
pub const EXPORT_SYNC_STATUS: &str = "Not Configured";

const ID: usize = 0;
const GUEST_NAME: usize = 1;
const PHONE_NUMBER: usize = 2;
const CHECK_IN_DATE: usize = 3;
const CHECK_OUT_DATE: usize = 4;
const PROPERTY_ID: usize = 5;
const PROPERTY_NAME: usize = 6;
const SOURCE: usize = 7;
const AMOUNT_PAID: usize = 8;
const SYNC_STATUS: usize = 9;
const BOOKED_AT: usize = 10;

static AMOUNT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?").expect("Invalid regex")
});

/// A single spreadsheet cell as exchanged with the Sheets API.
pub type Cell = Value;
pub type Row = Vec<Cell>;

/// The header row, identical to [`BOOKING_COLUMNS`].
pub fn header_row() -> Row {
    BOOKING_COLUMNS
        .iter()
        .map(|column| Value::String((*column).to_string()))
        .collect()
}

/// Render a database record as a sheet row, filling export defaults.
pub fn render_row(booking: &StoredBooking, now: &str) -> Row {
    let text = |value: &Option<String>| Value::String(value.clone().unwrap_or_default());
    let text_or = |value: &Option<String>, default: &str| {
        Value::String(value.clone().unwrap_or_else(|| default.to_string()))
    };
    let amount = booking
        .amount_paid
        .and_then(Number::from_f64)
        .map_or_else(|| Value::Number(0.into()), Value::Number);

    vec![
        text(&booking.id),
        text(&booking.guest_name),
        text(&booking.phone_number),
        text(&booking.check_in_date),
        text(&booking.check_out_date),
        text(&booking.property_id),
        text(&booking.property_name),
        text_or(&booking.source, DEFAULT_SOURCE),
        amount,
        text_or(&booking.sync_status, EXPORT_SYNC_STATUS),
        text_or(&booking.booked_at, now),
    ]
}

/// What the importer should do with one sheet row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowDecision {
    /// Blank row, or neither id nor guest name present
    Skip,
    Record(Booking),
    Invalid(SyncError),
}

/// Normalize one sheet row into a booking, applying import defaults.
pub fn normalize_row(row: &[Cell], now: &str) -> RowDecision {
    let id = text_at(row, ID);
    let guest_name = text_at(row, GUEST_NAME);

    if id.is_empty() && guest_name.is_empty() {
        return RowDecision::Skip;
    }
    if guest_name.is_empty() {
        return RowDecision::Invalid(SyncError::validation("Guest name is required"));
    }
    if id.is_empty() {
        return RowDecision::Invalid(SyncError::validation("Booking id is required"));
    }

    RowDecision::Record(Booking {
        id,
        guest_name,
        phone_number: text_at(row, PHONE_NUMBER),
        check_in_date: optional_text_at(row, CHECK_IN_DATE),
        check_out_date: optional_text_at(row, CHECK_OUT_DATE),
        property_id: text_at(row, PROPERTY_ID),
        property_name: text_at(row, PROPERTY_NAME),
        source: optional_text_at(row, SOURCE).unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
        amount_paid: amount_at(row, AMOUNT_PAID),
        sync_status: optional_text_at(row, SYNC_STATUS)
            .unwrap_or_else(|| IMPORT_SYNC_STATUS.to_string()),
        booked_at: optional_text_at(row, BOOKED_AT).unwrap_or_else(|| now.to_string()),
    })
}

/// Text form of a loosely typed cell, `None` for null or empty strings.
///
/// Integral numbers render without a fractional part so that an id typed
/// into the sheet as `42` round-trips as `"42"`.
pub fn cell_text(cell: &Cell) -> Option<String> {
    match cell {
        Value::Null => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number_text(number)),
        other => Some(other.to_string()),
    }
}

/// Parse the leading numeric part of `text`, the way a sheet amount is read.
///
/// `"120.50 USD"` yields `120.5`; text without a numeric prefix yields `None`.
pub fn parse_amount(text: &str) -> Option<f64> {
    AMOUNT_PREFIX
        .find(text.trim())
        .and_then(|prefix| prefix.as_str().parse::<f64>().ok())
        .filter(|amount| amount.is_finite())
}

fn text_at(row: &[Cell], index: usize) -> String {
    optional_text_at(row, index).unwrap_or_default()
}

fn optional_text_at(row: &[Cell], index: usize) -> Option<String> {
    let text = row.get(index).and_then(cell_text)?;
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn amount_at(row: &[Cell], index: usize) -> f64 {
    let amount = match row.get(index) {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => parse_amount(text),
        _ => None,
    };
    amount.filter(|amount| amount.is_finite()).unwrap_or(0.0)
}

#[allow(clippy::cast_possible_truncation)]
fn number_text(number: &Number) -> String {
    match number.as_f64() {
        Some(value) if number.is_f64() && value.fract() == 0.0 && value.abs() < 1e15 => {
            format!("{}", value as i64)
        }
        _ => number.to_string(),
    }
}

/// Where the bookings live inside a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLayout {
    sheet_name: String,
}

impl SheetLayout {
    pub fn new(sheet_name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
        }
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// Every column of the contract, all rows (`Bookings!A:K`).
    pub fn clear_range(&self) -> String {
        format!("{}!A:{}", self.quoted_name(), last_column())
    }

    /// Top-left anchor for the header + data block (`Bookings!A1`).
    pub fn write_range(&self) -> String {
        format!("{}!A1", self.quoted_name())
    }

    /// Data rows only, header excluded (`Bookings!A2:K`).
    pub fn read_range(&self) -> String {
        format!("{}!A2:{}", self.quoted_name(), last_column())
    }

    fn quoted_name(&self) -> String {
        if self
            .sheet_name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        {
            self.sheet_name.clone()
        } else {
            format!("'{}'", self.sheet_name)
        }
    }
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self::new("Bookings")
    }
}

fn last_column() -> String {
    column_letter(COLUMN_COUNT - 1)
}

/// A1-notation letter for a zero-based column index.
pub fn column_letter(index: usize) -> String {
    let mut index = index + 1;
    let mut letters = Vec::new();
    while index > 0 {
        let remainder = (index - 1) % 26;
        letters.push(char::from(b'A' + u8::try_from(remainder).unwrap_or(0)));
        index = (index - 1) / 26;
    }
    letters.iter().rev().collect()
}
