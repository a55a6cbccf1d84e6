//! In-memory gateways for reconciler and dispatcher tests.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use super::{Reconciler, SyncTarget};
use crate::error::{Result, SyncError};
use crate::gateway::{BookingStore, SelectQuery, SpreadsheetStore};
use crate::locator::SpreadsheetId;
use crate::schema::Row;

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0)
        .single()
        .expect("valid fixed timestamp")
}

pub fn reconciler(
    database: FakeDatabase,
    sheets: FakeSheets,
) -> Reconciler<FakeDatabase, FakeSheets> {
    Reconciler::new(database, sheets, SyncTarget::default()).with_clock(fixed_now)
}

/// A fully populated booking record as the database would return it.
pub fn booking_json(id: &str, guest_name: &str, check_in_date: &str) -> Value {
    json!({
        "id": id,
        "guest_name": guest_name,
        "phone_number": "+91 98450 12345",
        "check_in_date": check_in_date,
        "check_out_date": "2025-09-30",
        "property_id": "villa-7",
        "property_name": "Villa Seven",
        "source": "Airbnb",
        "amount_paid": 250.5,
        "sync_status": "Synced",
        "booked_at": "2025-05-01T08:30:00.000Z",
    })
}

#[derive(Default)]
pub struct FakeDatabase {
    records: Mutex<BTreeMap<String, Value>>,
    select_failure: Mutex<Option<String>>,
    upsert_failures: Mutex<HashMap<String, String>>,
    upsert_calls: Mutex<usize>,
}

impl FakeDatabase {
    pub fn with_rows(rows: Vec<Value>) -> Self {
        let database = Self::default();
        {
            let mut records = database.records.lock().expect("records lock");
            for row in rows {
                let id = row["id"].as_str().unwrap_or_default().to_string();
                records.insert(id, row);
            }
        }
        database
    }

    pub fn fail_selects(&self, message: &str) {
        *self.select_failure.lock().expect("failure lock") = Some(message.to_string());
    }

    pub fn fail_upsert_of(&self, id: &str, message: &str) {
        self.upsert_failures
            .lock()
            .expect("failure lock")
            .insert(id.to_string(), message.to_string());
    }

    /// Stored records, ordered by id.
    pub fn records(&self) -> Vec<Value> {
        self.records
            .lock()
            .expect("records lock")
            .values()
            .cloned()
            .collect()
    }

    pub fn upsert_calls(&self) -> usize {
        *self.upsert_calls.lock().expect("calls lock")
    }
}

impl BookingStore for FakeDatabase {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Value>> {
        if let Some(message) = self.select_failure.lock().expect("failure lock").clone() {
            return Err(SyncError::backend(message));
        }

        let mut rows = self.records();
        if let Some(order) = &query.order {
            rows.sort_by(|left, right| {
                let ordering = compare_nulls_last(&left[&order.column], &right[&order.column]);
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn upsert(&self, _table: &str, record: &Value, conflict_key: &str) -> Result<()> {
        *self.upsert_calls.lock().expect("calls lock") += 1;
        let key = record[conflict_key].as_str().unwrap_or_default().to_string();
        if let Some(message) = self.upsert_failures.lock().expect("failure lock").get(&key) {
            return Err(SyncError::backend(message.clone()));
        }

        let mut records = self.records.lock().expect("records lock");
        match (records.get_mut(&key), record.as_object()) {
            (Some(Value::Object(existing)), Some(update)) => {
                for (column, value) in update {
                    existing.insert(column.clone(), value.clone());
                }
            }
            _ => {
                records.insert(key, record.clone());
            }
        }
        Ok(())
    }
}

fn compare_nulls_last(left: &Value, right: &Value) -> Ordering {
    match (left.as_str(), right.as_str()) {
        (Some(left), Some(right)) => left.cmp(right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Spreadsheet grid per spreadsheet id, anchored at A1.
#[derive(Default)]
pub struct FakeSheets {
    grids: Mutex<HashMap<String, Vec<Row>>>,
    calls: Mutex<Vec<String>>,
    missing: Mutex<HashSet<String>>,
    update_failure: Mutex<Option<String>>,
    auth_failure: Mutex<Option<String>>,
}

impl FakeSheets {
    pub fn seed(&self, spreadsheet: &str, rows: Vec<Row>) {
        self.grids
            .lock()
            .expect("grid lock")
            .insert(spreadsheet.to_string(), rows);
    }

    pub fn rows(&self, spreadsheet: &str) -> Vec<Row> {
        self.grids
            .lock()
            .expect("grid lock")
            .get(spreadsheet)
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn mark_missing(&self, spreadsheet: &str) {
        self.missing
            .lock()
            .expect("missing lock")
            .insert(spreadsheet.to_string());
    }

    pub fn fail_updates(&self, message: &str) {
        *self.update_failure.lock().expect("failure lock") = Some(message.to_string());
    }

    pub fn fail_auth(&self, message: &str) {
        *self.auth_failure.lock().expect("failure lock") = Some(message.to_string());
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("calls lock").push(call);
    }

    fn check(&self, spreadsheet: &SpreadsheetId) -> Result<()> {
        if let Some(message) = self.auth_failure.lock().expect("failure lock").clone() {
            return Err(SyncError::authentication(message));
        }
        if self
            .missing
            .lock()
            .expect("missing lock")
            .contains(spreadsheet.as_str())
        {
            return Err(SyncError::backend("Requested entity was not found. (HTTP 404)"));
        }
        Ok(())
    }
}

impl SpreadsheetStore for FakeSheets {
    async fn values_get(&self, spreadsheet: &SpreadsheetId, range: &str) -> Result<Vec<Row>> {
        self.record(format!("get {range}"));
        self.check(spreadsheet)?;
        Ok(self.rows(spreadsheet.as_str()).into_iter().skip(1).collect())
    }

    async fn values_update(
        &self,
        spreadsheet: &SpreadsheetId,
        range: &str,
        rows: &[Row],
    ) -> Result<()> {
        self.record(format!("update {range}"));
        self.check(spreadsheet)?;
        if let Some(message) = self.update_failure.lock().expect("failure lock").clone() {
            return Err(SyncError::backend(message));
        }
        self.seed(spreadsheet.as_str(), rows.to_vec());
        Ok(())
    }

    async fn values_clear(&self, spreadsheet: &SpreadsheetId, range: &str) -> Result<()> {
        self.record(format!("clear {range}"));
        self.check(spreadsheet)?;
        self.seed(spreadsheet.as_str(), Vec::new());
        Ok(())
    }

    async fn metadata_get(&self, spreadsheet: &SpreadsheetId) -> Result<()> {
        self.record("metadata".to_string());
        self.check(spreadsheet)
    }

    async fn authorize(&self) -> Result<()> {
        self.record("authorize".to_string());
        match self.auth_failure.lock().expect("failure lock").clone() {
            Some(message) => Err(SyncError::authentication(message)),
            None => Ok(()),
        }
    }
}
