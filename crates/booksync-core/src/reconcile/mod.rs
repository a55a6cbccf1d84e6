//! Booking reconciliation between the database and a spreadsheet.
//!
//! A [`Reconciler`] owns one database gateway and one spreadsheet gateway and
//! runs a single operation at a time against them:
//!
//! - [`Reconciler::export`] replaces the sheet range from the database (push)
//! - [`Reconciler::import`] upserts sheet rows into the database (pull)
//! - [`Reconciler::check_connectivity`] probes both backends
//!
//! Remote calls are awaited one after another; there is no fan-out.

mod connectivity;
mod export;
mod import;

#[cfg(test)]
pub(crate) mod fakes;

use chrono::{DateTime, Utc};

pub use connectivity::{BackendStatus, ConnectivityReport};
pub use export::{render_sheet, ExportReport};
pub use import::{ImportReport, ImportTally, RowFailure, FIRST_DATA_ROW, MAX_REPORTED_FAILURES};

use crate::config::{SyncSettings, DEFAULT_BOOKINGS_TABLE};
use crate::gateway::{BookingStore, SpreadsheetStore};
use crate::schema::SheetLayout;

/// Upsert conflict target.
pub const CONFLICT_KEY: &str = "id";
/// Export ordering column.
pub const ORDER_COLUMN: &str = "check_in_date";

/// Which table and which sheet tab a reconciler works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    pub table: String,
    pub layout: SheetLayout,
}

impl SyncTarget {
    pub fn new(table: impl Into<String>, layout: SheetLayout) -> Self {
        Self {
            table: table.into(),
            layout,
        }
    }

    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self::new(
            settings.bookings_table.clone(),
            SheetLayout::new(settings.sheet_name.clone()),
        )
    }
}

impl Default for SyncTarget {
    fn default() -> Self {
        Self::new(DEFAULT_BOOKINGS_TABLE, SheetLayout::default())
    }
}

pub struct Reconciler<D, S> {
    database: D,
    sheets: S,
    target: SyncTarget,
    clock: fn() -> DateTime<Utc>,
}

impl<D: BookingStore, S: SpreadsheetStore> Reconciler<D, S> {
    pub fn new(database: D, sheets: S, target: SyncTarget) -> Self {
        Self {
            database,
            sheets,
            target,
            clock: Utc::now,
        }
    }

    /// Replace the clock used for `booked_at` defaults.
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub const fn target(&self) -> &SyncTarget {
        &self.target
    }

    pub const fn database(&self) -> &D {
        &self.database
    }

    pub const fn sheets(&self) -> &S {
        &self.sheets
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}
