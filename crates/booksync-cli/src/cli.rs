use booksync_core::{Action, SyncRequest};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "booksync")]
#[command(about = "Reconcile property bookings between Supabase and Google Sheets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub spreadsheet: SpreadsheetArgs,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Check Supabase and Google Sheets connectivity
    Test,
    /// Import sheet rows into Supabase
    #[command(alias = "sheets-to-supabase")]
    Pull,
    /// Overwrite the sheet with every Supabase booking
    #[command(alias = "supabase-to-sheets")]
    Push,
    /// Full sync (same as push)
    #[command(alias = "full-sync")]
    Sync,
}

impl Commands {
    pub const fn action(self) -> Action {
        match self {
            Self::Test => Action::Test,
            Self::Pull => Action::Pull,
            Self::Push => Action::Push,
            Self::Sync => Action::FullSync,
        }
    }
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct SpreadsheetArgs {
    /// Spreadsheet ID
    #[arg(long, global = true, value_name = "ID")]
    pub spreadsheet_id: Option<String>,

    /// Spreadsheet sharing URL (used when no ID is given)
    #[arg(long, global = true, value_name = "URL")]
    pub spreadsheet_url: Option<String>,
}

impl Cli {
    pub fn request(&self) -> SyncRequest {
        SyncRequest {
            action: Some(self.command.action().as_str().to_string()),
            spreadsheet_id: self.spreadsheet.spreadsheet_id.clone(),
            spreadsheet_url: self.spreadsheet.spreadsheet_url.clone(),
        }
    }
}
