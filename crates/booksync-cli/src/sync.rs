use std::io::{self, Write};

use booksync_core::{
    dispatch, ErrorResponse, LiveReconciler, SyncRequest, SyncResponse, SyncSettings,
};
use serde::Serialize;

use crate::error::CliError;

/// Run one request and print the JSON response to stdout.
///
/// The failure body is printed too, so scripts can read the error from stdout
/// while the exit status reports the failure.
pub async fn run_sync(request: &SyncRequest) -> Result<(), CliError> {
    let settings = SyncSettings::from_env()?;
    let reconciler = LiveReconciler::from_settings(&settings)?;
    let result = dispatch(&reconciler, request).await;

    let mut stdout = io::stdout().lock();
    match result {
        Ok(outcome) => {
            let response = SyncResponse::new(outcome);
            write_json(&mut stdout, &response)?;
            match response.outcome.error_message() {
                Some(message) if !response.success => Err(CliError::Connectivity(message)),
                _ => Ok(()),
            }
        }
        Err(error) => {
            write_json(&mut stdout, &ErrorResponse::new(&error))?;
            Err(error.into())
        }
    }
}

pub fn write_json(out: &mut impl Write, value: &impl Serialize) -> Result<(), CliError> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
