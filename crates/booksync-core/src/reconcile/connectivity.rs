use serde::Serialize;

use super::{Reconciler, CONFLICT_KEY};
use crate::error::{Result, SyncError};
use crate::gateway::{BookingStore, SelectQuery, SpreadsheetStore};
use crate::locator::SpreadsheetId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BackendStatus {
    Connected,
    Error,
}

impl BackendStatus {
    const fn of(probe: &Result<()>) -> Self {
        match probe {
            Ok(()) => Self::Connected,
            Err(_) => Self::Error,
        }
    }
}

/// Result of probing both backends. Never an error by itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectivityReport {
    pub database: BackendStatus,
    pub spreadsheet: BackendStatus,
    /// Failure messages of the probes that did not connect
    pub errors: Vec<String>,
}

impl ConnectivityReport {
    fn from_probes(database: Result<()>, spreadsheet: Result<()>) -> Self {
        let errors = [("Supabase", &database), ("Google Sheets", &spreadsheet)]
            .into_iter()
            .filter_map(|(backend, probe)| {
                probe
                    .as_ref()
                    .err()
                    .map(|error: &SyncError| format!("{backend}: {error}"))
            })
            .collect();

        Self {
            database: BackendStatus::of(&database),
            spreadsheet: BackendStatus::of(&spreadsheet),
            errors,
        }
    }

    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Probe failures joined into one line, `None` when both connected.
    pub fn error_message(&self) -> Option<String> {
        (!self.errors.is_empty()).then(|| self.errors.join("; "))
    }
}

impl Serialize for ConnectivityReport {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Wire {
            supabase: BackendStatus,
            google_sheets: BackendStatus,
            #[serde(skip_serializing_if = "Option::is_none")]
            error: Option<String>,
        }

        Wire {
            supabase: self.database,
            google_sheets: self.spreadsheet,
            error: self.error_message(),
        }
        .serialize(serializer)
    }
}

impl<D: BookingStore, S: SpreadsheetStore> Reconciler<D, S> {
    /// Probe the database and the spreadsheet API independently.
    ///
    /// With a spreadsheet the probe reads its metadata; without one it only
    /// proves the credentials can obtain a token.
    pub async fn check_connectivity(
        &self,
        spreadsheet: Option<&SpreadsheetId>,
    ) -> ConnectivityReport {
        let query = SelectQuery::new(&self.target.table, CONFLICT_KEY).limit(1);
        let database = self.database.select(&query).await.map(|_| ());
        let sheets = match spreadsheet {
            Some(spreadsheet) => self.sheets.metadata_get(spreadsheet).await,
            None => self.sheets.authorize().await,
        };

        let report = ConnectivityReport::from_probes(database, sheets);
        if report.success() {
            tracing::info!("Connectivity check passed");
        } else {
            tracing::warn!(errors = ?report.errors, "Connectivity check failed");
        }
        report
    }
}
