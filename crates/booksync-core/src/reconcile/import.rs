use std::fmt;

use serde::Serialize;

use super::{Reconciler, CONFLICT_KEY};
use crate::error::{Result, SyncError};
use crate::gateway::{BookingStore, SpreadsheetStore};
use crate::locator::SpreadsheetId;
use crate::models::Booking;
use crate::schema::{normalize_row, RowDecision};
use crate::util::{iso_timestamp, sanitize};

/// Sheet row number of the first data row (row 1 is the header).
pub const FIRST_DATA_ROW: usize = 2;
/// Failures kept verbatim in a report; the count keeps growing past this.
pub const MAX_REPORTED_FAILURES: usize = 100;

/// A row that could not be imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFailure {
    pub row: usize,
    pub message: String,
}

impl fmt::Display for RowFailure {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "Row {}: {}", self.row, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub success_count: usize,
    pub error_count: usize,
    pub errors: Vec<RowFailure>,
}

impl ImportReport {
    /// Failures rendered as `Row n: message`.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

impl Serialize for ImportReport {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Wire {
            success_count: usize,
            error_count: usize,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            errors: Vec<String>,
        }

        Wire {
            success_count: self.success_count,
            error_count: self.error_count,
            errors: self.error_messages(),
        }
        .serialize(serializer)
    }
}

/// Running totals of an import, folded one row at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportTally {
    succeeded: usize,
    failed: usize,
    failures: Vec<RowFailure>,
}

impl ImportTally {
    /// Fold the outcome of sheet row `row` into the tally.
    #[must_use]
    pub fn record(mut self, row: usize, outcome: Result<()>) -> Self {
        match outcome {
            Ok(()) => self.succeeded += 1,
            Err(error) => {
                self.failed += 1;
                if self.failures.len() < MAX_REPORTED_FAILURES {
                    self.failures.push(RowFailure {
                        row,
                        message: error.to_string(),
                    });
                }
            }
        }
        self
    }

    pub fn into_report(self) -> ImportReport {
        ImportReport {
            success_count: self.succeeded,
            error_count: self.failed,
            errors: self.failures,
        }
    }
}

impl<D: BookingStore, S: SpreadsheetStore> Reconciler<D, S> {
    /// Upsert every data row of the sheet range into the database.
    ///
    /// Rows are processed in order and each one is independent: a row that
    /// fails validation or whose upsert is rejected is recorded and the next
    /// row is attempted. Only a failed read of the range aborts the import.
    pub async fn import(&self, spreadsheet: &SpreadsheetId) -> Result<ImportReport> {
        let range = self.target.layout.read_range();
        let rows = self.sheets.values_get(spreadsheet, &range).await?;
        tracing::info!(
            spreadsheet = %spreadsheet,
            range = %range,
            rows = rows.len(),
            "Read sheet rows"
        );

        let now = iso_timestamp(self.now());
        let mut tally = ImportTally::default();
        for (offset, cells) in rows.iter().enumerate() {
            let row = offset + FIRST_DATA_ROW;
            let outcome = match normalize_row(cells, &now) {
                RowDecision::Skip => {
                    tracing::debug!(row, "Skipping row without id or guest name");
                    continue;
                }
                RowDecision::Invalid(error) => Err(error),
                RowDecision::Record(booking) => self.store(&booking).await,
            };
            if let Err(error) = &outcome {
                tracing::warn!(row, error = %error, "Failed to import row");
            }
            tally = tally.record(row, outcome);
        }

        let report = tally.into_report();
        tracing::info!(
            success_count = report.success_count,
            error_count = report.error_count,
            "Imported bookings from spreadsheet"
        );
        Ok(report)
    }

    async fn store(&self, booking: &Booking) -> Result<()> {
        let record = serde_json::to_value(booking).map_err(|error| {
            SyncError::backend(format!("Database error: {}", sanitize(&error)))
        })?;
        self.database
            .upsert(&self.target.table, &record, CONFLICT_KEY)
            .await
            .map_err(|error| SyncError::backend(format!("Database error: {error}")))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    use super::*;
    use crate::models::StoredBooking;
    use crate::reconcile::fakes::{booking_json, fixed_now, reconciler, FakeDatabase, FakeSheets};
    use crate::schema::header_row;

    fn sheet() -> SpreadsheetId {
        SpreadsheetId::new("sheet-1")
    }

    fn seeded_sheets(rows: Vec<Value>) -> FakeSheets {
        let sheets = FakeSheets::default();
        let grid = std::iter::once(header_row())
            .chain(rows.into_iter().map(|row| match row {
                Value::Array(cells) => cells,
                other => vec![other],
            }))
            .collect();
        sheets.seed("sheet-1", grid);
        sheets
    }

    fn stored(value: &Value) -> StoredBooking {
        serde_json::from_value(value.clone()).unwrap()
    }

    #[test]
    fn tally_counts_every_failure_but_keeps_a_bounded_list() {
        let failure = || Err(SyncError::validation("Guest name is required"));
        let tally = (0..MAX_REPORTED_FAILURES + 5).fold(ImportTally::default(), |tally, index| {
            tally.record(index + FIRST_DATA_ROW, failure())
        });
        let report = tally.record(500, Ok(())).into_report();

        assert_eq!(report.success_count, 1);
        assert_eq!(report.error_count, MAX_REPORTED_FAILURES + 5);
        assert_eq!(report.errors.len(), MAX_REPORTED_FAILURES);
        assert_eq!(report.errors[0].to_string(), "Row 2: Guest name is required");
    }

    #[test]
    fn report_serializes_camel_case_and_omits_empty_errors() {
        let clean = ImportReport {
            success_count: 3,
            ..ImportReport::default()
        };
        assert_eq!(
            serde_json::to_value(&clean).unwrap(),
            json!({"successCount": 3, "errorCount": 0})
        );

        let failed = ImportTally::default()
            .record(3, Err(SyncError::validation("Guest name is required")))
            .into_report();
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({"successCount": 0, "errorCount": 1, "errors": ["Row 3: Guest name is required"]})
        );
    }

    #[tokio::test]
    async fn export_then_import_reproduces_records() {
        let originals = vec![
            booking_json("bk-1", "Asha", "2025-09-01"),
            booking_json("bk-2", "Ravi", "2025-09-10"),
        ];
        let source = reconciler(FakeDatabase::with_rows(originals.clone()), FakeSheets::default());
        source.export(&sheet()).await.unwrap();

        let destination = reconciler(FakeDatabase::default(), seeded_sheets(Vec::new()));
        destination
            .sheets()
            .seed("sheet-1", source.sheets().rows("sheet-1"));
        let report = destination.import(&sheet()).await.unwrap();

        assert_eq!(report.success_count, 2);
        assert_eq!(report.error_count, 0);
        let imported: Vec<StoredBooking> =
            destination.database().records().iter().map(stored).collect();
        let expected: Vec<StoredBooking> = originals.iter().map(stored).collect();
        assert_eq!(imported, expected);
    }

    #[tokio::test]
    async fn sparse_record_round_trips_with_empty_text_not_null() {
        let sparse = json!({
            "id": "bk-3",
            "guest_name": "Lina",
            "check_in_date": null,
            "property_id": null,
            "property_name": null,
        });
        let source = reconciler(FakeDatabase::with_rows(vec![sparse]), FakeSheets::default());
        source.export(&sheet()).await.unwrap();

        let destination = reconciler(FakeDatabase::default(), seeded_sheets(Vec::new()));
        destination
            .sheets()
            .seed("sheet-1", source.sheets().rows("sheet-1"));
        let report = destination.import(&sheet()).await.unwrap();

        assert_eq!(report.success_count, 1);
        let records = destination.database().records();
        assert_eq!(records[0]["phone_number"], json!(""));
        assert_eq!(
            records[0],
            json!({
                "id": "bk-3",
                "guest_name": "Lina",
                "phone_number": "",
                "check_in_date": null,
                "check_out_date": null,
                "property_id": "",
                "property_name": "",
                "source": "Direct",
                "amount_paid": 0.0,
                "sync_status": "Not Configured",
                "booked_at": "2025-06-01T12:00:00.000Z",
            })
        );
    }

    #[tokio::test]
    async fn importing_twice_leaves_same_records() {
        let sheets = seeded_sheets(vec![
            json!(["bk-1", "Asha", "", "2025-09-01", "", "", "", "", "120", "", "2025-05-01"]),
            json!(["bk-2", "Ravi"]),
        ]);
        let reconciler = reconciler(FakeDatabase::default(), sheets);

        reconciler.import(&sheet()).await.unwrap();
        let first = reconciler.database().records();
        reconciler.import(&sheet()).await.unwrap();
        let second = reconciler.database().records();

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        assert_eq!(reconciler.database().upsert_calls(), 4);
    }

    #[tokio::test]
    async fn one_bad_row_does_not_block_the_rest() {
        let sheets = seeded_sheets(vec![
            json!(["bk-1", "Asha"]),
            json!(["bk-2", ""]),
            json!(["bk-3", "Meera"]),
        ]);
        let reconciler = reconciler(FakeDatabase::default(), sheets);

        let report = reconciler.import(&sheet()).await.unwrap();

        assert_eq!(report.success_count, 2);
        assert_eq!(report.error_count, 1);
        assert_eq!(report.error_messages(), vec!["Row 3: Guest name is required"]);
        let ids: Vec<Value> = reconciler
            .database()
            .records()
            .iter()
            .map(|record| record["id"].clone())
            .collect();
        assert_eq!(ids, vec![json!("bk-1"), json!("bk-3")]);
    }

    #[tokio::test]
    async fn rejected_upsert_is_reported_as_database_error() {
        let database = FakeDatabase::default();
        database.fail_upsert_of("bk-2", "duplicate key value violates unique constraint (409)");
        let sheets = seeded_sheets(vec![json!(["bk-1", "Asha"]), json!(["bk-2", "Ravi"])]);
        let reconciler = reconciler(database, sheets);

        let report = reconciler.import(&sheet()).await.unwrap();

        assert_eq!(report.success_count, 1);
        assert_eq!(
            report.error_messages(),
            vec!["Row 3: Database error: duplicate key value violates unique constraint (409)"]
        );
    }

    #[tokio::test]
    async fn blank_rows_are_skipped_without_counting() {
        let sheets = seeded_sheets(vec![
            json!([]),
            json!(["", "", "+1 555", "2025-01-01"]),
            json!(["bk-1", "Asha"]),
        ]);
        let reconciler = reconciler(FakeDatabase::default(), sheets);

        let report = reconciler.import(&sheet()).await.unwrap();

        assert_eq!(report.success_count, 1);
        assert_eq!(report.error_count, 0);
        assert_eq!(reconciler.database().upsert_calls(), 1);
    }

    #[tokio::test]
    async fn empty_sheet_imports_nothing() {
        let reconciler = reconciler(FakeDatabase::default(), seeded_sheets(Vec::new()));

        let report = reconciler.import(&sheet()).await.unwrap();
        assert_eq!(report, ImportReport::default());
        assert_eq!(reconciler.sheets().calls(), vec!["get Bookings!A2:K".to_string()]);
    }

    #[tokio::test]
    async fn amounts_are_coerced_and_defaults_filled() {
        let sheets = seeded_sheets(vec![
            json!(["bk-1", "Asha", "", "", "", "", "", "", "abc"]),
            json!(["bk-2", "Ravi", "", "", "", "", "", "", "12.5 USD"]),
            json!(["bk-3", "Meera", "", "", "", "", "", "", 99]),
        ]);
        let reconciler = reconciler(FakeDatabase::default(), sheets);

        reconciler.import(&sheet()).await.unwrap();

        let records = reconciler.database().records();
        assert_eq!(records[0]["amount_paid"], json!(0.0));
        assert_eq!(records[1]["amount_paid"], json!(12.5));
        assert_eq!(records[2]["amount_paid"], json!(99.0));
        assert_eq!(records[0]["source"], json!("Direct"));
        assert_eq!(records[0]["sync_status"], json!("Synced"));
        assert_eq!(records[0]["check_in_date"], Value::Null);
        assert_eq!(records[0]["booked_at"], json!(iso_timestamp(fixed_now())));
    }

    #[tokio::test]
    async fn unreadable_range_aborts_import() {
        let sheets = FakeSheets::default();
        sheets.mark_missing("sheet-1");
        let reconciler = reconciler(FakeDatabase::default(), sheets);

        let err = reconciler.import(&sheet()).await.unwrap_err();
        assert!(matches!(err, SyncError::Backend(_)));
        assert_eq!(reconciler.database().upsert_calls(), 0);
    }
}
