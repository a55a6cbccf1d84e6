//! Seams to the two record stores.
//!
//! The reconciler only talks to these traits; the Supabase and Google Sheets
//! clients implement them for production and tests substitute in-memory fakes.

use std::future::Future;

use serde_json::Value;

use crate::error::Result;
use crate::locator::SpreadsheetId;
use crate::schema::Row;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

/// A read against one database table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    pub table: String,
    /// PostgREST-style column list, e.g. `*` or `id`
    pub columns: String,
    pub order: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl SelectQuery {
    pub fn new(table: impl Into<String>, columns: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: columns.into(),
            order: None,
            limit: None,
        }
    }

    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(OrderBy {
            column: column.into(),
            ascending,
        });
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Relational store holding the `bookings` table.
pub trait BookingStore: Send + Sync {
    /// Every matching row (up to `query.limit`), however many requests it takes.
    fn select(&self, query: &SelectQuery) -> impl Future<Output = Result<Vec<Value>>> + Send;

    /// Insert `record`, or overwrite the row whose `conflict_key` matches.
    fn upsert(
        &self,
        table: &str,
        record: &Value,
        conflict_key: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Spreadsheet values endpoint.
pub trait SpreadsheetStore: Send + Sync {
    fn values_get(
        &self,
        spreadsheet: &SpreadsheetId,
        range: &str,
    ) -> impl Future<Output = Result<Vec<Row>>> + Send;

    fn values_update(
        &self,
        spreadsheet: &SpreadsheetId,
        range: &str,
        rows: &[Row],
    ) -> impl Future<Output = Result<()>> + Send;

    fn values_clear(
        &self,
        spreadsheet: &SpreadsheetId,
        range: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Lightweight read proving the spreadsheet is reachable.
    fn metadata_get(&self, spreadsheet: &SpreadsheetId) -> impl Future<Output = Result<()>> + Send;

    /// Check that credentials are usable without touching a spreadsheet.
    fn authorize(&self) -> impl Future<Output = Result<()>> + Send;
}
