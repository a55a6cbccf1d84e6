//! Request dispatch shared by the HTTP and CLI shells.
//!
//! A [`SyncRequest`] names one action and optionally a spreadsheet. The
//! dispatcher validates both, runs the matching reconciler operation and
//! returns a [`SyncOutcome`] that the shells wrap into a [`SyncResponse`] or,
//! on failure, an [`ErrorResponse`].

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::gateway::{BookingStore, SpreadsheetStore};
use crate::locator::{resolve_locator, SpreadsheetId};
use crate::reconcile::{ConnectivityReport, ExportReport, ImportReport, Reconciler};
use crate::util::iso_timestamp;

pub const VALID_ACTIONS: &str = "test, sheets-to-supabase, supabase-to-sheets, full-sync";

const PUSH_CONTEXT: &str = "Push to Sheets";
const PULL_CONTEXT: &str = "Pull from Sheets";
const FULL_SYNC_CONTEXT: &str = "Full sync";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Probe both backends
    Test,
    /// Sheet rows into the database
    Pull,
    /// Database into the sheet
    Push,
    /// Push under the full-sync name
    FullSync,
}

impl Action {
    pub const ALL: [Self; 4] = [Self::Test, Self::Pull, Self::Push, Self::FullSync];

    /// Canonical wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Pull => "sheets-to-supabase",
            Self::Push => "supabase-to-sheets",
            Self::FullSync => "full-sync",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = SyncError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "test" => Ok(Self::Test),
            "pull" | "sheets-to-supabase" => Ok(Self::Pull),
            "push" | "supabase-to-sheets" => Ok(Self::Push),
            "sync" | "full-sync" => Ok(Self::FullSync),
            _ => Err(SyncError::InvalidAction(format!(
                "Invalid action. Valid actions: {VALID_ACTIONS}"
            ))),
        }
    }
}

/// Invocation input, as posted to the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spreadsheet_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spreadsheet_url: Option<String>,
}

impl SyncRequest {
    pub fn new(action: Action) -> Self {
        Self {
            action: Some(action.as_str().to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_spreadsheet_id(mut self, id: impl Into<String>) -> Self {
        self.spreadsheet_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_spreadsheet_url(mut self, url: impl Into<String>) -> Self {
        self.spreadsheet_url = Some(url.into());
        self
    }

    fn parse_action(&self) -> Result<Action> {
        match self.action.as_deref().map(str::trim) {
            None | Some("") => Err(SyncError::InvalidAction(format!(
                "Action is required. Valid actions: {VALID_ACTIONS}"
            ))),
            Some(action) => action.parse(),
        }
    }
}

/// What a successful dispatch produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SyncOutcome {
    Connectivity(ConnectivityReport),
    Pulled(ImportReport),
    Pushed(ExportReport),
    FullSync(ExportReport),
}

impl SyncOutcome {
    /// False only for a connectivity check that found a backend down.
    pub fn succeeded(&self) -> bool {
        match self {
            Self::Connectivity(report) => report.success(),
            Self::Pulled(_) | Self::Pushed(_) | Self::FullSync(_) => true,
        }
    }

    /// Failure text carried as data, set only by a failing connectivity check.
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Connectivity(report) => report.error_message(),
            Self::Pulled(_) | Self::Pushed(_) | Self::FullSync(_) => None,
        }
    }

    pub fn message(&self) -> Option<String> {
        match self {
            Self::Connectivity(report) => report
                .success()
                .then(|| "Both Supabase and Google Sheets connections are working".to_string()),
            Self::Pulled(report) => Some(format!(
                "Pulled {} bookings from Google Sheets. {} errors.",
                report.success_count, report.error_count
            )),
            Self::Pushed(report) => Some(push_message(report)),
            Self::FullSync(report) => {
                Some(format!("Full sync completed: {}", push_message(report)))
            }
        }
    }
}

fn push_message(report: &ExportReport) -> String {
    format!(
        "Successfully pushed {} bookings to Google Sheets",
        report.count
    )
}

/// Success body: `{success, message, ...outcome fields, timestamp}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub outcome: SyncOutcome,
    pub timestamp: String,
}

impl SyncResponse {
    pub fn new(outcome: SyncOutcome) -> Self {
        Self {
            success: outcome.succeeded(),
            message: outcome.message(),
            outcome,
            timestamp: iso_timestamp(Utc::now()),
        }
    }
}

/// Failure body: `{success: false, error, timestamp}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error: impl fmt::Display) -> Self {
        Self {
            success: false,
            error: error.to_string(),
            timestamp: iso_timestamp(Utc::now()),
        }
    }
}

/// Run one request against the reconciler.
///
/// The action is checked before the locator, so an unknown action is reported
/// even when no spreadsheet was given.
pub async fn dispatch<D, S>(
    reconciler: &Reconciler<D, S>,
    request: &SyncRequest,
) -> Result<SyncOutcome>
where
    D: BookingStore,
    S: SpreadsheetStore,
{
    let action = request.parse_action()?;
    let spreadsheet = resolve_locator(
        request.spreadsheet_id.as_deref(),
        request.spreadsheet_url.as_deref(),
    )?;
    tracing::info!(
        action = action.as_str(),
        spreadsheet = spreadsheet.as_ref().map(ToString::to_string),
        "Dispatching sync request"
    );

    match action {
        Action::Test => {
            let report = reconciler.check_connectivity(spreadsheet.as_ref()).await;
            Ok(SyncOutcome::Connectivity(report))
        }
        Action::Pull => reconciler
            .import(&required(spreadsheet)?)
            .await
            .map(SyncOutcome::Pulled)
            .map_err(|error| error.context(PULL_CONTEXT)),
        Action::Push => reconciler
            .export(&required(spreadsheet)?)
            .await
            .map(SyncOutcome::Pushed)
            .map_err(|error| error.context(PUSH_CONTEXT)),
        Action::FullSync => reconciler
            .export(&required(spreadsheet)?)
            .await
            .map(SyncOutcome::FullSync)
            .map_err(|error| error.context(PUSH_CONTEXT).context(FULL_SYNC_CONTEXT)),
    }
}

fn required(spreadsheet: Option<SpreadsheetId>) -> Result<SpreadsheetId> {
    spreadsheet.ok_or(SyncError::MissingLocator)
}
