//! booksync-core - Core library for Booksync
//!
//! This crate contains the booking model, the sheet column contract, the
//! Supabase and Google Sheets gateways, and the reconciliation logic shared by
//! the Booksync interfaces (HTTP API, CLI).

pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod locator;
pub mod models;
pub mod reconcile;
pub mod schema;
pub mod sheets;
pub mod supabase;
pub mod util;

pub use config::SyncSettings;
pub use dispatch::{dispatch, Action, ErrorResponse, SyncOutcome, SyncRequest, SyncResponse};
pub use error::{ConfigError, Result, SyncError};
pub use locator::{resolve_locator, SpreadsheetId};
pub use models::{Booking, StoredBooking};
pub use reconcile::{Reconciler, SyncTarget};
pub use sheets::GoogleSheetsClient;
pub use supabase::SupabaseRestClient;

/// Reconciler wired to the production gateways.
pub type LiveReconciler = Reconciler<SupabaseRestClient, GoogleSheetsClient>;

impl LiveReconciler {
    /// Build both gateways from settings.
    ///
    /// Fails only on Supabase problems; a Google credential problem is kept
    /// inside the Sheets client and surfaces from each spreadsheet call.
    pub fn from_settings(settings: &SyncSettings) -> Result<Self> {
        Ok(Self::new(
            SupabaseRestClient::new(&settings.supabase_url, settings.supabase_key.clone())?,
            GoogleSheetsClient::from_settings(settings)?,
            SyncTarget::from_settings(settings),
        ))
    }
}
