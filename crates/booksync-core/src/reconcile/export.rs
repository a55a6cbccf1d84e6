use serde::Serialize;

use super::{Reconciler, ORDER_COLUMN};
use crate::error::{Result, SyncError};
use crate::gateway::{BookingStore, SelectQuery, SpreadsheetStore};
use crate::locator::SpreadsheetId;
use crate::models::StoredBooking;
use crate::schema::{header_row, render_row, Row};
use crate::util::{iso_timestamp, sanitize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    /// Data rows written below the header
    pub count: usize,
}

/// Header plus one rendered row per booking, in the given order.
pub fn render_sheet(bookings: &[StoredBooking], now: &str) -> Vec<Row> {
    std::iter::once(header_row())
        .chain(bookings.iter().map(|booking| render_row(booking, now)))
        .collect()
}

impl<D: BookingStore, S: SpreadsheetStore> Reconciler<D, S> {
    /// Overwrite the sheet range with every booking, ordered by check-in.
    ///
    /// The clear and the write are separate remote calls. If the write fails
    /// after the clear succeeded the range is left empty.
    pub async fn export(&self, spreadsheet: &SpreadsheetId) -> Result<ExportReport> {
        let query = SelectQuery::new(&self.target.table, "*").order_by(ORDER_COLUMN, true);
        let bookings = self
            .database
            .select(&query)
            .await?
            .into_iter()
            .map(serde_json::from_value::<StoredBooking>)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|error| {
                SyncError::backend(format!(
                    "Supabase returned an unreadable booking row: {}",
                    sanitize(&error)
                ))
            })?;
        tracing::info!(
            table = %self.target.table,
            count = bookings.len(),
            "Found bookings to export"
        );

        let block = render_sheet(&bookings, &iso_timestamp(self.now()));
        let layout = &self.target.layout;

        self.sheets
            .values_clear(spreadsheet, &layout.clear_range())
            .await?;
        self.sheets
            .values_update(spreadsheet, &layout.write_range(), &block)
            .await?;

        tracing::info!(
            spreadsheet = %spreadsheet,
            sheet = layout.sheet_name(),
            count = bookings.len(),
            "Exported bookings to spreadsheet"
        );
        Ok(ExportReport {
            count: bookings.len(),
        })
    }
}
