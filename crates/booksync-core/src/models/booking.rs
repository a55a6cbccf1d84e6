//! Booking model

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::schema::{cell_text, parse_amount};

/// A booking normalized for the database.
///
/// Field names double as the database column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// Primary key and upsert conflict target
    pub id: String,
    pub guest_name: String,
    pub phone_number: String,
    /// ISO date, `None` when the sheet cell was blank
    pub check_in_date: Option<String>,
    pub check_out_date: Option<String>,
    pub property_id: String,
    pub property_name: String,
    pub source: String,
    pub amount_paid: f64,
    pub sync_status: String,
    /// ISO timestamp
    pub booked_at: String,
}

/// A booking as returned by the database.
///
/// Every column is optional because the host application owns the table and
/// may leave any of them null. Text columns tolerate numeric JSON values and
/// `amount_paid` tolerates numeric strings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StoredBooking {
    #[serde(default, deserialize_with = "loose_text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub guest_name: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub phone_number: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub check_in_date: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub check_out_date: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub property_id: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub property_name: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "loose_amount")]
    pub amount_paid: Option<f64>,
    #[serde(default, deserialize_with = "loose_text")]
    pub sync_status: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub booked_at: Option<String>,
}

impl From<Booking> for StoredBooking {
    fn from(booking: Booking) -> Self {
        let non_empty = |value: String| Some(value).filter(|value| !value.is_empty());
        Self {
            id: non_empty(booking.id),
            guest_name: non_empty(booking.guest_name),
            phone_number: non_empty(booking.phone_number),
            check_in_date: booking.check_in_date,
            check_out_date: booking.check_out_date,
            property_id: non_empty(booking.property_id),
            property_name: non_empty(booking.property_name),
            source: non_empty(booking.source),
            amount_paid: Some(booking.amount_paid),
            sync_status: non_empty(booking.sync_status),
            booked_at: non_empty(booking.booked_at),
        }
    }
}

fn loose_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(cell_text))
}

fn loose_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number.as_f64().filter(|amount| amount.is_finite()),
        Some(Value::String(text)) => parse_amount(&text),
        _ => None,
    })
}
